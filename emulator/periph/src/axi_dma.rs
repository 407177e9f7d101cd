/*++

Licensed under the Apache-2.0 license.

File Name:

    axi_dma.rs

Abstract:

    File contains the emulated AXI DMA engine in direct register mode, with a
    stream accelerator looped between its MM2S and S2MM channels.

--*/

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::accelerator::StreamTransform;
use caliptra_emu_bus::{ActionHandle, Bus, BusError, Clock, Ram, ReadWriteRegister, Timer};
use caliptra_emu_types::{RvAddr, RvData, RvSize};
use log::{debug, trace, warn};
use registers_axidma::axidma::bits::{DmaCr, DmaSr, Length, DMASR_ERR_MASK, IRQ_ALL_MASK};
use registers_axidma::axidma::offsets::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamChannel {
    Mm2s,
    S2mm,
}

struct Beat {
    data: u32,
    last: bool,
}

struct Channel {
    control: ReadWriteRegister<u32, DmaCr::Register>,
    status: ReadWriteRegister<u32, DmaSr::Register>,
    addr_lsb: ReadWriteRegister<u32>,
    addr_msb: ReadWriteRegister<u32>,
    length: ReadWriteRegister<u32, Length::Register>,

    // Bytes moved so far in the current transfer.
    cursor: usize,
    active: bool,
    operation_start: Option<ActionHandle>,
}

impl Channel {
    fn new() -> Self {
        Self {
            control: ReadWriteRegister::new(0),
            status: ReadWriteRegister::new(DmaSr::Halted::SET.value),
            addr_lsb: ReadWriteRegister::new(0),
            addr_msb: ReadWriteRegister::new(0),
            length: ReadWriteRegister::new(0),
            cursor: 0,
            active: false,
            operation_start: None,
        }
    }

    fn addr(&self) -> u64 {
        ((self.addr_msb.reg.get() as u64) << 32) | self.addr_lsb.reg.get() as u64
    }

    fn halt(&mut self) {
        self.active = false;
        self.operation_start = None;
        self.status.reg.modify(DmaSr::Halted::SET);
    }
}

pub struct AxiDmaPeriph {
    mm2s: Channel,
    s2mm: Channel,

    ram: Rc<RefCell<Ram>>,
    ram_base: u32,

    accelerator: Box<dyn StreamTransform>,
    stream: VecDeque<Beat>,

    timer: Timer,
    next_step: Option<ActionHandle>,
}

impl AxiDmaPeriph {
    /// Ticks between a LENGTH write and the first beat on that channel.
    pub const IO_START_DELAY: u64 = 200;

    /// Beats each channel may move per tick.
    pub const BEATS_PER_TICK: usize = 4;

    /// Words the stream can hold before MM2S stalls.
    pub const STREAM_FIFO_DEPTH: usize = 16;

    pub fn new(
        clock: &Clock,
        ram: Rc<RefCell<Ram>>,
        ram_base: u32,
        accelerator: Box<dyn StreamTransform>,
    ) -> Self {
        debug!("axi_dma: stream through {}", accelerator.name());
        Self {
            mm2s: Channel::new(),
            s2mm: Channel::new(),
            ram,
            ram_base,
            accelerator,
            stream: VecDeque::new(),
            timer: Timer::new(clock),
            next_step: None,
        }
    }

    /// Level of the channel's interrupt output.
    pub fn irq_pending(&self, channel: StreamChannel) -> bool {
        let channel = self.channel(channel);
        channel.status.reg.get() & channel.control.reg.get() & IRQ_ALL_MASK != 0
    }

    /// Words sitting in the stream between the two channels.
    pub fn stream_occupancy(&self) -> usize {
        self.stream.len()
    }

    fn channel(&self, channel: StreamChannel) -> &Channel {
        match channel {
            StreamChannel::Mm2s => &self.mm2s,
            StreamChannel::S2mm => &self.s2mm,
        }
    }

    fn channel_mut(&mut self, channel: StreamChannel) -> &mut Channel {
        match channel {
            StreamChannel::Mm2s => &mut self.mm2s,
            StreamChannel::S2mm => &mut self.s2mm,
        }
    }

    fn reset(&mut self) {
        self.mm2s = Channel::new();
        self.s2mm = Channel::new();
        self.stream.clear();
        self.next_step = None;
        debug!("axi_dma: reset");
    }

    fn write_control(&mut self, id: StreamChannel, val: RvData) {
        let val = ReadWriteRegister::<u32, DmaCr::Register>::new(val);
        // Reset on either channel resets the whole engine.
        if val.reg.is_set(DmaCr::Reset) {
            self.reset();
            return;
        }

        let channel = self.channel_mut(id);
        channel.control.reg.set(val.reg.get());
        let halted = channel.status.reg.is_set(DmaSr::Halted);
        let errored = channel.status.reg.get() & DMASR_ERR_MASK != 0;
        if val.reg.is_set(DmaCr::Rs) && halted && !errored {
            channel
                .status
                .reg
                .modify(DmaSr::Halted::CLEAR + DmaSr::Idle::SET);
        } else if !val.reg.is_set(DmaCr::Rs) && !halted {
            channel.halt();
        }
    }

    fn write_status(&mut self, id: StreamChannel, val: RvData) {
        let status = &mut self.channel_mut(id).status;
        status.reg.set(status.reg.get() & !(val & IRQ_ALL_MASK));
    }

    fn write_length(&mut self, id: StreamChannel, val: RvData) {
        let val = ReadWriteRegister::<u32, Length::Register>::new(val);
        let length = val.reg.read(Length::Length);

        let channel = self.channel_mut(id);
        if channel.status.reg.is_set(DmaSr::Halted) {
            warn!("axi_dma: {:?} LENGTH written while halted", id);
            return;
        }
        if !channel.status.reg.is_set(DmaSr::Idle) {
            warn!("axi_dma: {:?} LENGTH written while busy", id);
            return;
        }
        if length == 0 {
            return;
        }
        channel.length.reg.set(length);
        channel.cursor = 0;
        channel.status.reg.modify(DmaSr::Idle::CLEAR);

        // Schedule the timer to start the channel after the delay
        let start = self.timer.schedule_poll_in(Self::IO_START_DELAY);
        self.channel_mut(id).operation_start = Some(start);
    }

    fn ram_offset(&self, addr: u64, len: usize) -> Option<usize> {
        let offset = usize::try_from(addr.checked_sub(self.ram_base as u64)?).ok()?;
        if offset + len <= self.ram.borrow().data().len() {
            Some(offset)
        } else {
            None
        }
    }

    fn complete(&mut self, id: StreamChannel) {
        let channel = self.channel_mut(id);
        channel.active = false;
        channel
            .status
            .reg
            .modify(DmaSr::Idle::SET + DmaSr::IocIrq::SET);
        debug!("axi_dma: {:?} transfer of {} bytes done", id, channel.cursor);
    }

    fn fault(&mut self, id: StreamChannel, error: u32) {
        let channel = self.channel_mut(id);
        channel
            .status
            .reg
            .set(channel.status.reg.get() | error | DmaSr::ErrIrq::SET.value);
        channel.halt();
        warn!(
            "axi_dma: {:?} halted on error, status 0x{:08x}",
            id,
            channel.status.reg.get()
        );
    }

    fn step_mm2s(&mut self) -> bool {
        if !self.mm2s.active || self.stream.len() >= Self::STREAM_FIFO_DEPTH {
            return false;
        }
        let len = self.mm2s.length.reg.get() as usize;
        let count = (len - self.mm2s.cursor).min(4);
        let addr = self.mm2s.addr() + self.mm2s.cursor as u64;
        let Some(offset) = self.ram_offset(addr, count) else {
            self.fault(StreamChannel::Mm2s, DmaSr::DmaDecErr::SET.value);
            return false;
        };

        let mut bytes = [0u8; 4];
        bytes[..count].copy_from_slice(&self.ram.borrow().data()[offset..offset + count]);
        self.mm2s.cursor += count;
        let last = self.mm2s.cursor == len;
        let data = self.accelerator.transform(u32::from_le_bytes(bytes));
        self.stream.push_back(Beat { data, last });
        if last {
            self.complete(StreamChannel::Mm2s);
        }
        true
    }

    fn step_s2mm(&mut self) -> bool {
        if !self.s2mm.active {
            return false;
        }
        let Some(beat) = self.stream.pop_front() else {
            return false;
        };
        let len = self.s2mm.length.reg.get() as usize;
        let remaining = len - self.s2mm.cursor;
        if remaining == 0 {
            // The packet is longer than the receive buffer.
            self.fault(StreamChannel::S2mm, DmaSr::DmaIntErr::SET.value);
            return false;
        }
        let count = remaining.min(4);
        let addr = self.s2mm.addr() + self.s2mm.cursor as u64;
        let Some(offset) = self.ram_offset(addr, count) else {
            self.fault(StreamChannel::S2mm, DmaSr::DmaDecErr::SET.value);
            return false;
        };

        self.ram.borrow_mut().data_mut()[offset..offset + count]
            .copy_from_slice(&beat.data.to_le_bytes()[..count]);
        self.s2mm.cursor += count;
        if beat.last {
            // LENGTH reports the bytes actually received.
            self.s2mm.length.reg.set(self.s2mm.cursor as u32);
            self.complete(StreamChannel::S2mm);
        }
        true
    }

    fn step(&mut self) {
        for _ in 0..Self::BEATS_PER_TICK {
            let sent = self.step_mm2s();
            let received = self.step_s2mm();
            if !sent && !received {
                break;
            }
        }
    }
}

impl Bus for AxiDmaPeriph {
    /// Read data of specified size from given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the read
    /// * `addr` - Offset into the register window
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::LoadAccessFault`
    ///   or `BusError::LoadAddrMisaligned`
    fn read(&mut self, size: RvSize, addr: RvAddr) -> Result<RvData, BusError> {
        let RvSize::Word = size else {
            return Err(BusError::LoadAccessFault);
        };
        if addr % 4 != 0 {
            return Err(BusError::LoadAddrMisaligned);
        }
        match addr {
            MM2S_DMACR => Ok(self.mm2s.control.reg.get()),
            MM2S_DMASR => Ok(self.mm2s.status.reg.get()),
            MM2S_SA => Ok(self.mm2s.addr_lsb.reg.get()),
            MM2S_SA_MSB => Ok(self.mm2s.addr_msb.reg.get()),
            MM2S_LENGTH => Ok(self.mm2s.length.reg.get()),
            S2MM_DMACR => Ok(self.s2mm.control.reg.get()),
            S2MM_DMASR => Ok(self.s2mm.status.reg.get()),
            S2MM_DA => Ok(self.s2mm.addr_lsb.reg.get()),
            S2MM_DA_MSB => Ok(self.s2mm.addr_msb.reg.get()),
            S2MM_LENGTH => Ok(self.s2mm.length.reg.get()),
            _ if addr < AXIDMA_WINDOW_SIZE => Ok(0),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    /// Write data of specified size to given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the write
    /// * `addr` - Offset into the register window
    /// * `val` - Data to write
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::StoreAccessFault`
    ///   or `BusError::StoreAddrMisaligned`
    fn write(&mut self, size: RvSize, addr: RvAddr, val: RvData) -> Result<(), BusError> {
        let RvSize::Word = size else {
            return Err(BusError::StoreAccessFault);
        };
        if addr % 4 != 0 {
            return Err(BusError::StoreAddrMisaligned);
        }
        trace!("axi_dma: write 0x{:02x} <- 0x{:08x}", addr, val);
        match addr {
            MM2S_DMACR => self.write_control(StreamChannel::Mm2s, val),
            MM2S_DMASR => self.write_status(StreamChannel::Mm2s, val),
            MM2S_SA => self.mm2s.addr_lsb.reg.set(val),
            MM2S_SA_MSB => self.mm2s.addr_msb.reg.set(val),
            MM2S_LENGTH => self.write_length(StreamChannel::Mm2s, val),
            S2MM_DMACR => self.write_control(StreamChannel::S2mm, val),
            S2MM_DMASR => self.write_status(StreamChannel::S2mm, val),
            S2MM_DA => self.s2mm.addr_lsb.reg.set(val),
            S2MM_DA_MSB => self.s2mm.addr_msb.reg.set(val),
            S2MM_LENGTH => self.write_length(StreamChannel::S2mm, val),
            _ if addr < AXIDMA_WINDOW_SIZE => {}
            _ => return Err(BusError::StoreAccessFault),
        }
        Ok(())
    }

    fn poll(&mut self) {
        if self.timer.fired(&mut self.mm2s.operation_start) {
            self.mm2s.active = true;
        }
        if self.timer.fired(&mut self.s2mm.operation_start) {
            self.s2mm.active = true;
        }
        self.timer.fired(&mut self.next_step);

        if self.mm2s.active || self.s2mm.active {
            self.step();
        }
        if (self.mm2s.active || self.s2mm.active) && self.next_step.is_none() {
            self.next_step = Some(self.timer.schedule_poll_in(1));
        }
    }
}
