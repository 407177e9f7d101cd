// Licensed under the Apache-2.0 license

use accel_config::ConfigError;
use caliptra_emu_bus::BusError;
use dma_driver::{Direction, DmaError};
use thiserror::Error;

/// Why the engine refused, or never got, a transfer request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchError {
    #[error("buffer 0x{addr:x} is not aligned to the {line}-byte cache line")]
    NotCacheAligned { addr: u64, line: u32 },
    #[error("length {len} does not match the {frame}-byte frame")]
    FrameMismatch { len: usize, frame: usize },
    #[error("a transfer is already in flight on this channel")]
    InFlight,
    #[error(transparent)]
    Engine(#[from] DmaError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccelTestError {
    #[error("DMA configuration not found for device {0}")]
    ConfigNotFound(u32),
    #[error("DMA initialization failed: {0}")]
    InitFailed(#[source] DmaError),
    #[error("DMA engine is already owned by another handle")]
    EngineClaimed,
    #[error("{direction} launch failed: {source}")]
    LaunchFailed {
        direction: Direction,
        #[source]
        source: LaunchError,
    },
    #[error("TX launched with no RX transfer in flight")]
    OutOfOrderLaunch,
    #[error("transfer still busy after {attempts} status polls")]
    TransferTimeout { attempts: u64 },
    #[error("DMA engine fault: {0}")]
    EngineFault(#[source] DmaError),
    #[error("memory access at 0x{addr:08x} failed: {error:?}")]
    MemoryAccess { addr: u32, error: BusError },
    #[error("invalid test configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}
