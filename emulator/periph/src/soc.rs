/*++

Licensed under the Apache-2.0 license.

File Name:

    soc.rs

Abstract:

    File contains the emulated system: DDR behind a data cache, and the AXI
    DMA engine with its accelerator. Every access made through one of the
    ports advances the clock by one tick.

--*/

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::accelerator::StreamTransform;
use crate::axi_dma::{AxiDmaPeriph, StreamChannel};
use crate::dcache::DataCache;
use accel_config::PlatformMemoryMap;
use caliptra_emu_bus::{Bus, BusError, Clock, Ram};
use caliptra_emu_types::{RvAddr, RvData, RvSize};

struct SocInner {
    clock: Clock,
    map: PlatformMemoryMap,
    dma_base: u32,
    dma_size: u32,
    cache: RefCell<DataCache>,
    dma: RefCell<AxiDmaPeriph>,
    dma_claimed: Cell<bool>,
}

impl SocInner {
    fn tick(&self) {
        self.clock
            .increment_and_process_timer_actions(1, &mut *self.dma.borrow_mut());
    }

    fn dma_offset(&self, addr: RvAddr) -> Option<RvAddr> {
        addr.checked_sub(self.dma_base)
            .filter(|offset| *offset < self.dma_size)
    }

    fn in_ddr(&self, addr: RvAddr) -> bool {
        self.map.ddr_contains(addr, 1)
    }
}

pub struct EmulatedSoc {
    inner: Rc<SocInner>,
}

impl EmulatedSoc {
    /// The DMA register window is `[map.dma_offset, map.dma_offset + map.dma_size)`.
    pub fn new(map: &PlatformMemoryMap, accelerator: Box<dyn StreamTransform>) -> Self {
        let clock = Clock::new();
        let ram = Rc::new(RefCell::new(Ram::new(vec![0; map.ddr_size as usize])));
        let cache = DataCache::new(ram.clone(), map.ddr_offset, map.cache_line_size);
        let dma = AxiDmaPeriph::new(&clock, ram, map.ddr_offset, accelerator);
        Self {
            inner: Rc::new(SocInner {
                clock,
                map: map.clone(),
                dma_base: map.dma_offset,
                dma_size: map.dma_size,
                cache: RefCell::new(cache),
                dma: RefCell::new(dma),
                dma_claimed: Cell::new(false),
            }),
        }
    }

    /// The CPU's view: DDR through the data cache, and the DMA registers.
    pub fn cpu_bus(&self) -> CpuBus {
        CpuBus {
            inner: self.inner.clone(),
        }
    }

    /// Cache maintenance operations.
    pub fn cache(&self) -> CachePort {
        CachePort {
            inner: self.inner.clone(),
        }
    }

    /// Exclusive access to the DMA register window. Returns `None` while
    /// another port is alive.
    pub fn take_dma_port(&self) -> Option<DmaPort> {
        if self.inner.dma_claimed.replace(true) {
            return None;
        }
        Some(DmaPort {
            inner: self.inner.clone(),
        })
    }

    pub fn memory_map(&self) -> &PlatformMemoryMap {
        &self.inner.map
    }

    pub fn irq_pending(&self, channel: StreamChannel) -> bool {
        self.inner.dma.borrow().irq_pending(channel)
    }

    pub fn dirty_lines(&self) -> usize {
        self.inner.cache.borrow().dirty_lines()
    }

    pub fn now(&self) -> u64 {
        self.inner.clock.now()
    }

    /// Lets the hardware run for `ticks` without any CPU activity.
    pub fn step(&self, ticks: u64) {
        for _ in 0..ticks {
            self.inner.tick();
        }
    }
}

pub struct CpuBus {
    inner: Rc<SocInner>,
}

impl Bus for CpuBus {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        let result = if self.inner.in_ddr(addr) {
            self.inner.cache.borrow_mut().read(size, addr)
        } else if let Some(offset) = self.inner.dma_offset(addr) {
            self.inner.dma.borrow_mut().read(size, offset)
        } else {
            Err(BusError::LoadAccessFault)
        };
        self.inner.tick();
        result
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        let result = if self.inner.in_ddr(addr) {
            self.inner.cache.borrow_mut().write(size, addr, val)
        } else if let Some(offset) = self.inner.dma_offset(addr) {
            self.inner.dma.borrow_mut().write(size, offset, val)
        } else {
            Err(BusError::StoreAccessFault)
        };
        self.inner.tick();
        result
    }
}

pub struct CachePort {
    inner: Rc<SocInner>,
}

impl CachePort {
    pub fn line_size(&self) -> u32 {
        self.inner.cache.borrow().line_size()
    }

    pub fn flush_range(&mut self, base: u32, len: usize) {
        self.inner.cache.borrow_mut().flush_range(base, len);
        self.inner.tick();
    }

    pub fn invalidate_range(&mut self, base: u32, len: usize) {
        self.inner.cache.borrow_mut().invalidate_range(base, len);
        self.inner.tick();
    }
}

/// Register access to the DMA engine, for the driver that owns it.
pub struct DmaPort {
    inner: Rc<SocInner>,
}

impl Bus for DmaPort {
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        let offset = self
            .inner
            .dma_offset(addr)
            .ok_or(BusError::LoadAccessFault)?;
        let result = self.inner.dma.borrow_mut().read(size, offset);
        self.inner.tick();
        result
    }

    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        let offset = self
            .inner
            .dma_offset(addr)
            .ok_or(BusError::StoreAccessFault)?;
        let result = self.inner.dma.borrow_mut().write(size, offset, val);
        self.inner.tick();
        result
    }
}

impl Drop for DmaPort {
    fn drop(&mut self) {
        self.inner.dma_claimed.set(false);
    }
}
