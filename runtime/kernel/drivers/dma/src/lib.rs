// Licensed under the Apache-2.0 license.

pub mod axidma;
pub mod hil;
pub mod mmio;

pub use axidma::AxiDma;
pub use hil::{Direction, DmaEngine, DmaError, TransferDescriptor};
pub use mmio::MmioBus;
