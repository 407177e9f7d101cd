// Licensed under the Apache-2.0 license

use thiserror::Error;

pub mod emulator;

/// Configures the memory map of the platform hosting the DMA engine.
/// These are the defaults that can be overridden per platform.
#[derive(Clone, Debug)]
pub struct PlatformMemoryMap {
    pub ddr_offset: u32,
    pub ddr_size: u32,

    pub dma_offset: u32,
    pub dma_size: u32,

    /// Data cache line size in bytes. Cache maintenance is line-granular.
    pub cache_line_size: u32,
}

impl PlatformMemoryMap {
    /// Returns true if `[base, base + len)` lies entirely inside DDR.
    pub fn ddr_contains(&self, base: u32, len: usize) -> bool {
        let start = self.ddr_offset as u64;
        let end = start + self.ddr_size as u64;
        let base = base as u64;
        base >= start && base + len as u64 <= end
    }
}

/// Static description of one AXI DMA instance, as produced by the hardware build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxiDmaConfig {
    pub device_id: u32,
    pub base_addr: u32,
    pub has_mm2s: bool,
    pub has_s2mm: bool,
    /// Scatter-gather engine included. Simple transfers are impossible when set.
    pub has_sg: bool,
    pub has_mm2s_dre: bool,
    pub has_s2mm_dre: bool,
    /// Stream data width in bytes.
    pub data_width: u32,
    /// Address width in bits (32 or 64).
    pub addr_width: u32,
    /// Width of the LENGTH registers in bits.
    pub length_width: u32,
}

impl AxiDmaConfig {
    /// Largest transfer a single descriptor can request.
    pub fn max_transfer_len(&self) -> usize {
        (1usize << self.length_width) - 1
    }
}

/// Looks up the engine configuration for `device_id`.
pub fn lookup_config(table: &[AxiDmaConfig], device_id: u32) -> Option<&AxiDmaConfig> {
    table.iter().find(|cfg| cfg.device_id == device_id)
}

/// A contiguous memory span used as a transfer buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferRegion {
    pub base: u32,
    pub len: usize,
}

impl TransferRegion {
    pub fn end(&self) -> u64 {
        self.base as u64 + self.len as u64
    }

    pub fn overlaps(&self, other: &TransferRegion) -> bool {
        (self.base as u64) < other.end() && (other.base as u64) < self.end()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("transfer length must be non-zero")]
    EmptyTransfer,
    #[error("transfer length {0} is not a multiple of the 4-byte word size")]
    LengthNotWordMultiple(usize),
    #[error("{name} buffer base 0x{base:08x} is not aligned to the {line}-byte cache line")]
    Misaligned {
        name: &'static str,
        base: u32,
        line: u32,
    },
    #[error("{name} buffer [0x{base:08x}, +0x{len:x}) is outside DDR")]
    OutsideDdr {
        name: &'static str,
        base: u32,
        len: usize,
    },
    #[error("TX and RX buffers overlap")]
    Overlap,
}

/// Parameters of one accelerator test run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccelTestConfig {
    pub dma_device_id: u32,
    pub tx_base: u32,
    pub rx_base: u32,
    /// Frame length in bytes, identical on both channels.
    pub length: usize,
}

impl AccelTestConfig {
    pub fn tx(&self) -> TransferRegion {
        TransferRegion {
            base: self.tx_base,
            len: self.length,
        }
    }

    pub fn rx(&self) -> TransferRegion {
        TransferRegion {
            base: self.rx_base,
            len: self.length,
        }
    }

    /// Checks the alignment, placement and non-overlap rules the transfer
    /// protocol depends on.
    pub fn validate(&self, map: &PlatformMemoryMap) -> Result<(), ConfigError> {
        if self.length == 0 {
            return Err(ConfigError::EmptyTransfer);
        }
        if self.length % 4 != 0 {
            return Err(ConfigError::LengthNotWordMultiple(self.length));
        }
        for (name, region) in [("TX", self.tx()), ("RX", self.rx())] {
            if region.base % map.cache_line_size != 0 {
                return Err(ConfigError::Misaligned {
                    name,
                    base: region.base,
                    line: map.cache_line_size,
                });
            }
            if !map.ddr_contains(region.base, region.len) {
                return Err(ConfigError::OutsideDdr {
                    name,
                    base: region.base,
                    len: region.len,
                });
            }
        }
        if self.tx().overlaps(&self.rx()) {
            return Err(ConfigError::Overlap);
        }
        Ok(())
    }
}
