// Licensed under the Apache-2.0 license

use core::fmt;

/// The accelerator's transform, word by word.
pub fn expected_word(sent: u32) -> u32 {
    !sent
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerificationRecord {
    pub index: usize,
    pub sent: u32,
    pub received: u32,
    pub expected: u32,
}

impl VerificationRecord {
    pub fn is_mismatch(&self) -> bool {
        self.received != self.expected
    }
}

impl fmt::Display for VerificationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error at index {}: Sent 0x{:08x}, Received 0x{:08x}, Expected 0x{:08x}",
            self.index, self.sent, self.received, self.expected
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub words_checked: usize,
    pub mismatches: Vec<VerificationRecord>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn mismatch_count(&self) -> usize {
        self.mismatches.len()
    }
}

/// Compares the first `length` bytes of `rx` against the transform of `tx`.
///
/// Every word is checked, a mismatch does not stop the scan. Words past the
/// end of either slice are not checked.
pub fn verify(tx: &[u32], rx: &[u32], length: usize) -> VerificationReport {
    let mut report = VerificationReport::default();
    for (index, (&sent, &received)) in tx.iter().zip(rx).take(length / 4).enumerate() {
        report.words_checked += 1;
        let record = VerificationRecord {
            index,
            sent,
            received,
            expected: expected_word(sent),
        };
        if record.is_mismatch() {
            report.mismatches.push(record);
        }
    }
    report
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_record_format() {
        let record = VerificationRecord {
            index: 3,
            sent: 3,
            received: 3,
            expected: 0xffff_fffc,
        };
        assert_eq!(
            record.to_string(),
            "Error at index 3: Sent 0x00000003, Received 0x00000003, Expected 0xfffffffc"
        );
    }

    #[test]
    fn test_verify_counts_every_mismatch() {
        let tx: Vec<u32> = (0..8).collect();
        let mut rx: Vec<u32> = tx.iter().map(|w| !w).collect();
        rx[2] = 0;
        rx[7] = 7;

        let report = verify(&tx, &rx, 32);
        assert_eq!(report.words_checked, 8);
        assert_eq!(
            report.mismatches.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![2, 7]
        );
        assert!(!report.passed());
    }

    #[test]
    fn test_verify_stops_at_shorter_slice() {
        let tx = [0u32; 4];
        let rx = [u32::MAX; 2];
        let report = verify(&tx, &rx, 16);
        assert_eq!(report.words_checked, 2);
        assert!(report.passed());
    }
}
