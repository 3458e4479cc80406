//! JPEG 1 baseline coefficient coding (ISO/IEC 10918-1 / ITU-T T.81)
//!
//! Everything needed to take an interleaved 4:2:0 baseline scan apart and
//! put it back together:
//!
//! - Canonical Huffman tables, built from DHT segments or symbol frequencies.
//! - Byte-stuffed bit reader/writer and block-level symbol walkers.
//! - Zigzag ordering, quantization and DPCM DC prediction.
//! - The spatial DC predictor and its partial inverse DCT.
//! - An adaptive arithmetic backend.

pub mod arithmetic;
pub mod bit_stream;
pub mod component;
pub mod dct;
pub mod huffman;
pub mod predictor;
pub mod quantization;
pub mod recompressor;
pub mod scan_decoder;
pub mod scan_encoder;
pub mod statistics;
pub mod zigzag;
