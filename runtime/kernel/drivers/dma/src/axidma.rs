// Licensed under the Apache-2.0 license

// This is a driver for the AMD LogiCORE IP AXI Direct Memory Access (DMA) core.
// Reference: https://docs.amd.com/r/en-US/pg021_axi_dma
// This driver only supports direct register (simple transfer) mode and
// detects completion by polling.

use crate::hil::{Direction, DmaEngine, DmaError, TransferDescriptor};
use accel_config::AxiDmaConfig;
use caliptra_emu_bus::Bus;
use caliptra_emu_types::{RvAddr, RvSize};
use log::debug;
use registers_axidma::axidma::{bits::*, offsets::*};
use tock_registers::LocalRegisterCopy;

/// Control register reads spent waiting for a reset to self-clear.
const RESET_TIMEOUT_POLLS: u32 = 500;

struct ChannelRegs {
    cr: u32,
    sr: u32,
    addr: u32,
    addr_msb: u32,
    length: u32,
}

const MM2S: ChannelRegs = ChannelRegs {
    cr: MM2S_DMACR,
    sr: MM2S_DMASR,
    addr: MM2S_SA,
    addr_msb: MM2S_SA_MSB,
    length: MM2S_LENGTH,
};

const S2MM: ChannelRegs = ChannelRegs {
    cr: S2MM_DMACR,
    sr: S2MM_DMASR,
    addr: S2MM_DA,
    addr_msb: S2MM_DA_MSB,
    length: S2MM_LENGTH,
};

/// An initialized engine. Owns the bus its registers are reached through.
pub struct AxiDma<B: Bus> {
    bus: B,
    config: AxiDmaConfig,
}

impl<B: Bus> AxiDma<B> {
    /// Binds the driver to the engine described by `config` and resets it.
    pub fn cfg_initialize(bus: B, config: &AxiDmaConfig) -> Result<Self, DmaError> {
        if config.has_sg {
            return Err(DmaError::ScatterGatherUnsupported);
        }
        if !config.has_mm2s && !config.has_s2mm {
            return Err(DmaError::NoChannel(Direction::MemoryToDevice));
        }

        let mut dma = AxiDma {
            bus,
            config: *config,
        };
        dma.reset()?;
        debug!(
            "AXI DMA {} at 0x{:08x} initialized",
            config.device_id, config.base_addr
        );
        Ok(dma)
    }

    fn channel(&self, direction: Direction) -> Result<&'static ChannelRegs, DmaError> {
        match direction {
            Direction::MemoryToDevice if self.config.has_mm2s => Ok(&MM2S),
            Direction::DeviceToMemory if self.config.has_s2mm => Ok(&S2MM),
            _ => Err(DmaError::NoChannel(direction)),
        }
    }

    fn read_reg(&mut self, offset: u32) -> Result<u32, DmaError> {
        let addr: RvAddr = self.config.base_addr + offset;
        self.bus
            .read(RvSize::Word, addr)
            .map_err(|error| DmaError::Bus { addr, error })
    }

    fn write_reg(&mut self, offset: u32, val: u32) -> Result<(), DmaError> {
        let addr: RvAddr = self.config.base_addr + offset;
        self.bus
            .write(RvSize::Word, addr, val)
            .map_err(|error| DmaError::Bus { addr, error })
    }

    fn read_cr(
        &mut self,
        regs: &ChannelRegs,
    ) -> Result<LocalRegisterCopy<u32, DmaCr::Register>, DmaError> {
        Ok(LocalRegisterCopy::new(self.read_reg(regs.cr)?))
    }

    fn read_sr(
        &mut self,
        regs: &ChannelRegs,
    ) -> Result<LocalRegisterCopy<u32, DmaSr::Register>, DmaError> {
        Ok(LocalRegisterCopy::new(self.read_reg(regs.sr)?))
    }

    /// Resets the whole engine. Either channel's reset bit resets both.
    pub fn reset(&mut self) -> Result<(), DmaError> {
        let regs = if self.config.has_mm2s { &MM2S } else { &S2MM };
        self.write_reg(regs.cr, DmaCr::Reset::SET.value)?;
        for _ in 0..RESET_TIMEOUT_POLLS {
            if !self.read_cr(regs)?.is_set(DmaCr::Reset) {
                return Ok(());
            }
        }
        Err(DmaError::ResetTimeout)
    }

    /// Clears the interrupt enables of one channel.
    pub fn intr_disable(&mut self, direction: Direction) -> Result<(), DmaError> {
        let regs = self.channel(direction)?;
        let mut cr = self.read_cr(regs)?;
        cr.modify(DmaCr::IocIrqEn::CLEAR + DmaCr::DlyIrqEn::CLEAR + DmaCr::ErrIrqEn::CLEAR);
        self.write_reg(regs.cr, cr.get())
    }

    /// Returns the enabled interrupt bits of one channel.
    pub fn intr_enabled(&mut self, direction: Direction) -> Result<u32, DmaError> {
        let regs = self.channel(direction)?;
        Ok(self.read_cr(regs)?.get() & IRQ_ALL_MASK)
    }

    /// Programs and starts one single-buffer transfer.
    pub fn simple_transfer(&mut self, descriptor: TransferDescriptor) -> Result<(), DmaError> {
        let direction = descriptor.direction();
        let regs = self.channel(direction)?;

        let max = self.config.max_transfer_len();
        if descriptor.is_empty() || descriptor.len() > max {
            return Err(DmaError::InvalidLength {
                len: descriptor.len(),
                max,
            });
        }

        let has_dre = match direction {
            Direction::MemoryToDevice => self.config.has_mm2s_dre,
            Direction::DeviceToMemory => self.config.has_s2mm_dre,
        };
        let addr = descriptor.addr();
        if !has_dre && addr % self.config.data_width as u64 != 0 {
            return Err(DmaError::Misaligned {
                addr,
                align: self.config.data_width,
            });
        }
        if self.config.addr_width <= 32 && addr > u32::MAX as u64 {
            return Err(DmaError::AddressOutOfRange { addr });
        }

        let sr = self.read_sr(regs)?;
        if sr.get() & DMASR_ERR_MASK != 0 {
            return Err(DmaError::ChannelError {
                direction,
                status: sr.get(),
            });
        }
        if !sr.is_set(DmaSr::Halted) && !sr.is_set(DmaSr::Idle) {
            return Err(DmaError::Busy(direction));
        }

        self.write_reg(regs.addr, addr as u32)?;
        if self.config.addr_width > 32 {
            self.write_reg(regs.addr_msb, (addr >> 32) as u32)?;
        }

        let mut cr = self.read_cr(regs)?;
        cr.modify(DmaCr::Rs::SET);
        self.write_reg(regs.cr, cr.get())?;

        // Writing the length starts the channel.
        self.write_reg(regs.length, descriptor.len() as u32)?;
        debug!(
            "{} transfer of {} bytes at 0x{:x} started",
            direction,
            descriptor.len(),
            addr
        );
        Ok(())
    }

    /// Returns true while the channel has not reported idle.
    pub fn busy(&mut self, direction: Direction) -> Result<bool, DmaError> {
        let regs = self.channel(direction)?;
        let sr = self.read_sr(regs)?;
        if sr.get() & DMASR_ERR_MASK != 0 {
            return Err(DmaError::ChannelError {
                direction,
                status: sr.get(),
            });
        }
        Ok(!sr.is_set(DmaSr::Idle))
    }
}

impl<B: Bus> DmaEngine for AxiDma<B> {
    fn reset(&mut self) -> Result<(), DmaError> {
        AxiDma::reset(self)
    }

    fn disable_interrupts(&mut self, direction: Direction) -> Result<(), DmaError> {
        self.intr_disable(direction)
    }

    fn submit(&mut self, descriptor: TransferDescriptor) -> Result<(), DmaError> {
        self.simple_transfer(descriptor)
    }

    fn busy(&mut self, direction: Direction) -> Result<bool, DmaError> {
        AxiDma::busy(self, direction)
    }
}
