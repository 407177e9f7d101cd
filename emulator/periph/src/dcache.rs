/*++

Licensed under the Apache-2.0 license.

File Name:

    dcache.rs

Abstract:

    File contains a write-back, write-allocate data cache in front of DDR.
    Lines are never evicted on their own, so data only moves between the
    cache and DDR through explicit maintenance.

--*/

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use caliptra_emu_bus::{Bus, BusError, Ram};
use caliptra_emu_types::{RvAddr, RvData, RvSize};

struct Line {
    data: Vec<u8>,
    dirty: bool,
}

pub struct DataCache {
    ram: Rc<RefCell<Ram>>,
    ram_base: u32,
    line_size: u32,
    lines: BTreeMap<u32, Line>,
}

impl DataCache {
    /// `line_size` must be a power of two, and the RAM a whole number of lines.
    pub fn new(ram: Rc<RefCell<Ram>>, ram_base: u32, line_size: u32) -> Self {
        Self {
            ram,
            ram_base,
            line_size,
            lines: BTreeMap::new(),
        }
    }

    pub fn line_size(&self) -> u32 {
        self.line_size
    }

    fn line_addr(&self, addr: u32) -> u32 {
        addr & !(self.line_size - 1)
    }

    /// Line addresses overlapping `[base, base + len)`, each flagged when the
    /// range covers only part of it.
    fn lines_in(&self, base: u32, len: usize) -> Vec<(u32, bool)> {
        if len == 0 {
            return vec![];
        }
        let end = base as u64 + len as u64;
        let line_size = self.line_size as u64;
        let mut line = self.line_addr(base) as u64;
        let mut lines = vec![];
        while line < end {
            let partial = line < base as u64 || line + line_size > end;
            lines.push((line as u32, partial));
            line += line_size;
        }
        lines
    }

    fn ram_offset(&self, addr: u32) -> Option<usize> {
        let offset = addr.checked_sub(self.ram_base)? as usize;
        (offset < self.ram.borrow().data().len()).then_some(offset)
    }

    fn line(&mut self, line_addr: u32) -> &mut Line {
        let ram = &self.ram;
        let offset = (line_addr - self.ram_base) as usize;
        let size = self.line_size as usize;
        self.lines.entry(line_addr).or_insert_with(|| Line {
            data: ram.borrow().data()[offset..offset + size].to_vec(),
            dirty: false,
        })
    }

    fn write_back(&self, line_addr: u32, line: &Line) {
        let offset = (line_addr - self.ram_base) as usize;
        self.ram.borrow_mut().data_mut()[offset..offset + line.data.len()]
            .copy_from_slice(&line.data);
    }

    /// Writes dirty lines in the range back to DDR and drops them from the cache.
    pub fn flush_range(&mut self, base: u32, len: usize) {
        for (line_addr, _) in self.lines_in(base, len) {
            if let Some(line) = self.lines.remove(&line_addr) {
                if line.dirty {
                    self.write_back(line_addr, &line);
                }
            }
        }
    }

    /// Drops the lines in the range so the next read comes from DDR.
    ///
    /// Dirty data in lines the range fully covers is discarded. Lines the
    /// range only partly covers are written back first, since they also hold
    /// bytes outside the range.
    pub fn invalidate_range(&mut self, base: u32, len: usize) {
        for (line_addr, partial) in self.lines_in(base, len) {
            if let Some(line) = self.lines.remove(&line_addr) {
                if partial && line.dirty {
                    self.write_back(line_addr, &line);
                }
            }
        }
    }

    pub fn is_cached(&self, addr: u32) -> bool {
        self.lines.contains_key(&self.line_addr(addr))
    }

    pub fn is_dirty(&self, addr: u32) -> bool {
        self.lines
            .get(&self.line_addr(addr))
            .is_some_and(|line| line.dirty)
    }

    pub fn dirty_lines(&self) -> usize {
        self.lines.values().filter(|line| line.dirty).count()
    }
}

fn access_width(size: RvSize) -> Option<u32> {
    match size {
        RvSize::Byte => Some(1),
        RvSize::HalfWord => Some(2),
        RvSize::Word => Some(4),
        _ => None,
    }
}

impl Bus for DataCache {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        let width = access_width(size).ok_or(BusError::LoadAccessFault)?;
        if addr % width != 0 {
            return Err(BusError::LoadAddrMisaligned);
        }
        self.ram_offset(addr).ok_or(BusError::LoadAccessFault)?;

        let line_addr = self.line_addr(addr);
        let at = (addr - line_addr) as usize;
        let line = self.line(line_addr);
        let mut bytes = [0u8; 4];
        bytes[..width as usize].copy_from_slice(&line.data[at..at + width as usize]);
        Ok(u32::from_le_bytes(bytes))
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        let width = access_width(size).ok_or(BusError::StoreAccessFault)?;
        if addr % width != 0 {
            return Err(BusError::StoreAddrMisaligned);
        }
        self.ram_offset(addr).ok_or(BusError::StoreAccessFault)?;

        let line_addr = self.line_addr(addr);
        let at = (addr - line_addr) as usize;
        let line = self.line(line_addr);
        line.data[at..at + width as usize].copy_from_slice(&val.to_le_bytes()[..width as usize]);
        line.dirty = true;
        Ok(())
    }
}
