//! Lossless recompression of baseline 4:2:0 JPEG images.
//!
//! The scan is decoded back to quantized DCT coefficients and re-encoded,
//! either unchanged, with a spatial DC predictor ("PiedPiper") in place of
//! the standard DPCM, or with an adaptive arithmetic coder in place of
//! Huffman coding. Every mode has an exact inverse.

pub mod constants;
pub mod error;
pub mod jpeg1;
pub mod jpeg_marker_code;
pub mod jpeg_stream_reader;
pub mod jpeg_stream_writer;

use constants::MCU_SIZE;

pub use error::JpegppError;
pub use jpeg1::recompressor::{
    ImageSummary, Mode, RecompressOptions, Recompressed, inspect, recompress,
};

/// Geometry of a baseline frame, as carried by SOF0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameInfo {
    pub width: u16,
    pub height: u16,
    pub bits_per_sample: u8,
    pub component_count: u8,
}

impl FrameInfo {
    /// MCUs per row; 4:2:0 MCUs cover 16x16 luma samples.
    pub fn mcus_per_row(&self) -> usize {
        (self.width as usize).div_ceil(MCU_SIZE)
    }

    pub fn mcu_rows(&self) -> usize {
        (self.height as usize).div_ceil(MCU_SIZE)
    }

    pub fn mcu_count(&self) -> usize {
        self.mcus_per_row() * self.mcu_rows()
    }
}
