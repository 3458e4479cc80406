//! Quantization and DC differential coding for JPEG 1.
//!
//! Blocks stay in zigzag order here, matching the order of DQT table entries.

use crate::jpeg1::component::Block;
use crate::jpeg1::dct::BLOCK_DIM;
use crate::jpeg1::zigzag::ZIGZAG_ORDER;

/// A DQT table in zigzag order.
pub type QuantizationTable = [u8; BLOCK_DIM];

/// Standard JPEG luminance quantization table (Quality 50), natural order.
pub const STD_LUMINANCE_QUANT_TABLE: [u8; BLOCK_DIM] = [
    16, 11, 10, 16, 24, 40, 51, 61,
    12, 12, 14, 19, 26, 58, 60, 55,
    14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62,
    18, 22, 37, 56, 68, 109, 103, 77,
    24, 35, 55, 64, 81, 104, 113, 92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Standard JPEG chrominance quantization table (Quality 50), natural order.
pub const STD_CHROMINANCE_QUANT_TABLE: [u8; BLOCK_DIM] = [
    17, 18, 24, 47, 99, 99, 99, 99,
    18, 21, 26, 66, 99, 99, 99, 99,
    24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// Scales a quantization table by a quality factor (1-100).
pub fn get_scaled_quant_table(base_table: &[u8; BLOCK_DIM], quality: u32) -> [u8; BLOCK_DIM] {
    let quality = quality.clamp(1, 100);
    let mut scaled_table = [0u8; BLOCK_DIM];
    let s = if quality < 50 { 5000 / quality } else { 200 - 2 * quality };

    for i in 0..BLOCK_DIM {
        let mut val = (base_table[i] as u32 * s + 50) / 100;
        if val == 0 { val = 1; }
        if val > 255 { val = 255; }
        scaled_table[i] = val as u8;
    }
    scaled_table
}

/// Reorders a natural-order table into DQT (zigzag) order.
pub fn to_zigzag_table(natural: &[u8; BLOCK_DIM]) -> QuantizationTable {
    let mut table = [0u8; BLOCK_DIM];
    for (k, entry) in table.iter_mut().enumerate() {
        *entry = natural[ZIGZAG_ORDER[k]];
    }
    table
}

/// Multiplies every coefficient by its table entry.
pub fn dequantize_block(block: &mut Block, table: &QuantizationTable) {
    for (coefficient, &q) in block.iter_mut().zip(table.iter()) {
        *coefficient *= i32::from(q);
    }
}

/// Divides every coefficient by its table entry, truncating toward zero.
///
/// Table entries are non-zero; the stream reader rejects zero entries.
pub fn quantize_block(block: &mut Block, table: &QuantizationTable) {
    for (coefficient, &q) in block.iter_mut().zip(table.iter()) {
        *coefficient /= i32::from(q);
    }
}

pub fn dequantize_scan(blocks: &mut [Block], table: &QuantizationTable) {
    for block in blocks {
        dequantize_block(block, table);
    }
}

pub fn quantize_scan(blocks: &mut [Block], table: &QuantizationTable) {
    for block in blocks {
        quantize_block(block, table);
    }
}

/// Replaces each DC by its difference to the previous block's DC.
///
/// The first block of the segment is predicted from 0.
pub fn predict_dc(blocks: &mut [Block]) {
    let mut previous = 0;
    for block in blocks {
        let dc = block[0];
        block[0] = dc - previous;
        previous = dc;
    }
}

/// Inverse of [`predict_dc`]: accumulates differences back into absolute DCs.
pub fn depredict_dc(blocks: &mut [Block]) {
    let mut previous = 0;
    for block in blocks {
        block[0] += previous;
        previous = block[0];
    }
}
