// Licensed under the Apache-2.0 license.

//! HIL Interface for a two-channel streaming DMA engine.
use caliptra_emu_bus::BusError;
use core::fmt;
use thiserror::Error;

/// Direction of a single-buffer transfer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Stream to memory (S2MM). The receive side.
    DeviceToMemory,
    /// Memory to stream (MM2S). The send side.
    MemoryToDevice,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::DeviceToMemory => write!(f, "RX"),
            Direction::MemoryToDevice => write!(f, "TX"),
        }
    }
}

/// One directed, single-buffer transfer request.
///
/// Descriptors are immutable and are consumed by the engine they are
/// submitted to.
#[derive(Debug, PartialEq, Eq)]
pub struct TransferDescriptor {
    addr: u64,
    len: usize,
    direction: Direction,
}

impl TransferDescriptor {
    pub fn new(addr: u64, len: usize, direction: Direction) -> Self {
        Self {
            addr,
            len,
            direction,
        }
    }

    pub fn addr(&self) -> u64 {
        self.addr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// This trait provides the interfaces for managing polled DMA transfers.
pub trait DmaEngine {
    /// Reset the engine, leaving both channels halted with interrupts disabled.
    fn reset(&mut self) -> Result<(), DmaError>;

    /// Disable completion, delay and error interrupts on one channel.
    fn disable_interrupts(&mut self, direction: Direction) -> Result<(), DmaError>;

    /// Start a transfer. Returns as soon as the channel has accepted it.
    fn submit(&mut self, descriptor: TransferDescriptor) -> Result<(), DmaError>;

    /// Returns true while the channel is still moving data.
    fn busy(&mut self, direction: Direction) -> Result<bool, DmaError>;
}

/// Represents possible DMA errors.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DmaError {
    #[error("engine has no {0} channel")]
    NoChannel(Direction),
    #[error("transfer length {len} is outside 1..={max}")]
    InvalidLength { len: usize, max: usize },
    #[error("address 0x{addr:x} is not aligned to {align} bytes")]
    Misaligned { addr: u64, align: u32 },
    #[error("address 0x{addr:x} does not fit the engine's address width")]
    AddressOutOfRange { addr: u64 },
    #[error("{0} channel is busy")]
    Busy(Direction),
    #[error("engine reset did not complete")]
    ResetTimeout,
    #[error("engine is built with scatter-gather, simple transfers are unavailable")]
    ScatterGatherUnsupported,
    #[error("{direction} channel halted on error, status 0x{status:08x}")]
    ChannelError { direction: Direction, status: u32 },
    #[error("register access at 0x{addr:08x} failed: {error:?}")]
    Bus { addr: u32, error: BusError },
}
