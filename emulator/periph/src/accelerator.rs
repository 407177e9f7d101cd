/*++

Licensed under the Apache-2.0 license.

File Name:

    accelerator.rs

Abstract:

    File contains the stream accelerators that sit between the MM2S and
    S2MM channels of the emulated DMA.

--*/

/// A word-at-a-time transform applied to every beat on the stream.
pub trait StreamTransform {
    fn transform(&mut self, beat: u32) -> u32;

    fn name(&self) -> &'static str;
}

/// Bitwise inverter. Every output word is the complement of its input.
#[derive(Clone, Copy, Debug, Default)]
pub struct Invert;

impl StreamTransform for Invert {
    fn transform(&mut self, beat: u32) -> u32 {
        !beat
    }

    fn name(&self) -> &'static str {
        "invert"
    }
}

/// Loopback with no processing.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl StreamTransform for Passthrough {
    fn transform(&mut self, beat: u32) -> u32 {
        beat
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}
