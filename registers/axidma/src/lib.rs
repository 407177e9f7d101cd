// Licensed under the Apache-2.0 license.

//! Register map of the AMD LogiCORE IP AXI Direct Memory Access core
//! (direct register mode).
//! Reference: https://docs.amd.com/r/en-US/pg021_axi_dma

#![cfg_attr(target_arch = "riscv32", no_std)]

pub mod axidma {
    pub mod offsets {
        pub const MM2S_DMACR: u32 = 0x00;
        pub const MM2S_DMASR: u32 = 0x04;
        pub const MM2S_SA: u32 = 0x18;
        pub const MM2S_SA_MSB: u32 = 0x1c;
        pub const MM2S_LENGTH: u32 = 0x28;
        pub const S2MM_DMACR: u32 = 0x30;
        pub const S2MM_DMASR: u32 = 0x34;
        pub const S2MM_DA: u32 = 0x48;
        pub const S2MM_DA_MSB: u32 = 0x4c;
        pub const S2MM_LENGTH: u32 = 0x58;

        /// Size of the register window.
        pub const AXIDMA_WINDOW_SIZE: u32 = 0x1_0000;
    }

    pub mod bits {
        use tock_registers::register_bitfields;

        register_bitfields! {
            u32,
            /// Channel control (MM2S_DMACR / S2MM_DMACR)
            pub DmaCr [
                Rs OFFSET(0) NUMBITS(1) [],
                Reset OFFSET(2) NUMBITS(1) [],
                Keyhole OFFSET(3) NUMBITS(1) [],
                CyclicBd OFFSET(4) NUMBITS(1) [],
                IocIrqEn OFFSET(12) NUMBITS(1) [],
                DlyIrqEn OFFSET(13) NUMBITS(1) [],
                ErrIrqEn OFFSET(14) NUMBITS(1) [],
                IrqThreshold OFFSET(16) NUMBITS(8) [],
                IrqDelay OFFSET(24) NUMBITS(8) [],
            ],
            /// Channel status (MM2S_DMASR / S2MM_DMASR)
            pub DmaSr [
                Halted OFFSET(0) NUMBITS(1) [],
                Idle OFFSET(1) NUMBITS(1) [],
                SgIncld OFFSET(3) NUMBITS(1) [],
                DmaIntErr OFFSET(4) NUMBITS(1) [],
                DmaSlvErr OFFSET(5) NUMBITS(1) [],
                DmaDecErr OFFSET(6) NUMBITS(1) [],
                SgIntErr OFFSET(8) NUMBITS(1) [],
                SgSlvErr OFFSET(9) NUMBITS(1) [],
                SgDecErr OFFSET(10) NUMBITS(1) [],
                IocIrq OFFSET(12) NUMBITS(1) [],
                DlyIrq OFFSET(13) NUMBITS(1) [],
                ErrIrq OFFSET(14) NUMBITS(1) [],
                IrqThresholdSts OFFSET(16) NUMBITS(8) [],
                IrqDelaySts OFFSET(24) NUMBITS(8) [],
            ],
            /// Buffer length (MM2S_LENGTH / S2MM_LENGTH)
            pub Length [
                Length OFFSET(0) NUMBITS(26) [],
            ],
        }

        /// Interrupt enable bits in DMACR and the matching status bits in DMASR.
        pub const IRQ_ALL_MASK: u32 = 0x0000_7000;

        /// DMASR bits that indicate a halted-on-error channel.
        pub const DMASR_ERR_MASK: u32 = 0x0000_0770;
    }
}
