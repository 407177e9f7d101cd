// Licensed under the Apache-2.0 license

//! Defaults for the emulated Zynq-style platform.

use crate::{AccelTestConfig, AxiDmaConfig, PlatformMemoryMap};

pub const EMULATOR_MEMORY_MAP: PlatformMemoryMap = PlatformMemoryMap {
    ddr_offset: 0x0000_0000,
    ddr_size: 16 * 1024 * 1024,

    dma_offset: 0x4040_0000,
    dma_size: 0x1_0000,

    cache_line_size: 32,
};

pub const EMULATOR_DMA_CONFIG_TABLE: &[AxiDmaConfig] = &[AxiDmaConfig {
    device_id: 0,
    base_addr: 0x4040_0000,
    has_mm2s: true,
    has_s2mm: true,
    has_sg: false,
    has_mm2s_dre: false,
    has_s2mm_dre: false,
    data_width: 4,
    addr_width: 32,
    length_width: 26,
}];

// Buffers sit high in DDR so they stay clear of program memory.
pub const DEFAULT_TEST_CONFIG: AccelTestConfig = AccelTestConfig {
    dma_device_id: 0,
    tx_base: 0x00a0_0000,
    rx_base: 0x00b0_0000,
    length: 128,
};
