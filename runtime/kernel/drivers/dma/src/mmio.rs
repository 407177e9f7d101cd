// Licensed under the Apache-2.0 license.

//! Bus over a memory-mapped register window, e.g. a UIO mapping of the
//! engine on real hardware.

use caliptra_emu_bus::{Bus, BusError};
use caliptra_emu_types::{RvAddr, RvData, RvSize};

pub struct MmioBus {
    ptr: *mut u32,
    base: RvAddr,
    size: u32,
}

impl MmioBus {
    /// Creates a bus that answers `[base, base + size)` from the mapping at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be 4-byte aligned and point to at least `size` bytes of
    /// device registers that stay mapped, and are not accessed through any
    /// other path, for the lifetime of the returned bus.
    pub unsafe fn new(ptr: *mut u32, base: RvAddr, size: u32) -> Self {
        Self { ptr, base, size }
    }

    fn word_index(&self, addr: RvAddr) -> Option<usize> {
        let offset = addr.checked_sub(self.base)?;
        if offset >= self.size {
            return None;
        }
        Some(offset as usize / 4)
    }
}

impl Bus for MmioBus {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        let RvSize::Word = size else {
            return Err(BusError::LoadAccessFault);
        };
        if addr % 4 != 0 {
            return Err(BusError::LoadAddrMisaligned);
        }
        let index = self.word_index(addr).ok_or(BusError::LoadAccessFault)?;
        // SAFETY: index is inside the window guaranteed by `new`.
        Ok(unsafe { self.ptr.add(index).read_volatile() })
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        let RvSize::Word = size else {
            return Err(BusError::StoreAccessFault);
        };
        if addr % 4 != 0 {
            return Err(BusError::StoreAddrMisaligned);
        }
        let index = self.word_index(addr).ok_or(BusError::StoreAccessFault)?;
        // SAFETY: index is inside the window guaranteed by `new`.
        unsafe { self.ptr.add(index).write_volatile(val) };
        Ok(())
    }
}
