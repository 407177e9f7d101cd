/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulated AXI-stream accelerator platform.

--*/

mod accelerator;
mod axi_dma;
mod dcache;
mod soc;

pub use accelerator::{Invert, Passthrough, StreamTransform};
pub use axi_dma::{AxiDmaPeriph, StreamChannel};
pub use dcache::DataCache;
pub use soc::{CachePort, CpuBus, DmaPort, EmulatedSoc};
