//! Canonical Huffman tables for baseline JPEG.
//! Handles DHT tables, the standard Annex K tables and tables built from symbol frequencies.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;

use crate::constants::MAX_HUFFMAN_CODE_LENGTH;
use crate::error::JpegppError;
use crate::jpeg1::component::ComponentClass;

/// Represents a Huffman code with its bit value and length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HuffmanCode {
    pub value: u16,
    pub length: u8,
}

/// Standard JPEG DC luminance Huffman table lengths (Table K.3).
pub const STD_LUMINANCE_DC_LENGTHS: [u8; 16] = [
    0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0
];

/// Standard JPEG DC luminance Huffman table values (Table K.3).
pub const STD_LUMINANCE_DC_VALUES: [u8; 12] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11
];

/// Standard JPEG DC chrominance Huffman table lengths (Table K.4).
pub const STD_CHROMINANCE_DC_LENGTHS: [u8; 16] = [
    0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0
];

pub const STD_CHROMINANCE_DC_VALUES: [u8; 12] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11
];

pub const STD_LUMINANCE_AC_LENGTHS: [u8; 16] = [
    0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 125
];

pub const STD_LUMINANCE_AC_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12,
    0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08,
    0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16,
    0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
    0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59,
    0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79,
    0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98,
    0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7,
    0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6,
    0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5,
    0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4,
    0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2,
    0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea,
    0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

pub const STD_CHROMINANCE_AC_LENGTHS: [u8; 16] = [
    0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 119
];

pub const STD_CHROMINANCE_AC_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21,
    0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91,
    0xa1, 0xb1, 0xc1, 0x09, 0x23, 0x33, 0x52, 0xf0,
    0x15, 0x62, 0x72, 0xd1, 0x0a, 0x16, 0x24, 0x34,
    0xe1, 0x25, 0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26,
    0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38,
    0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58,
    0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78,
    0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8a, 0x92, 0x93, 0x94, 0x95, 0x96,
    0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5,
    0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4,
    0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3,
    0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2,
    0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda,
    0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9,
    0xea, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8,
    0xf9, 0xfa,
];

/// The six Huffman table slots a session can hold.
///
/// `DcA` and `DcB` (DC class, ids 10 and 11) carry the spatially predicted
/// DC residuals for luma and chroma respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableSlot {
    Dc0,
    Dc1,
    DcA,
    DcB,
    Ac0,
    Ac1,
}

impl TableSlot {
    pub const ALL: [TableSlot; 6] = [
        TableSlot::Dc0,
        TableSlot::Dc1,
        TableSlot::DcA,
        TableSlot::DcB,
        TableSlot::Ac0,
        TableSlot::Ac1,
    ];

    pub fn from_class_and_id(class: u8, id: u8) -> Result<Self, JpegppError> {
        match (class, id) {
            (0, 0) => Ok(TableSlot::Dc0),
            (0, 1) => Ok(TableSlot::Dc1),
            (0, 10) => Ok(TableSlot::DcA),
            (0, 11) => Ok(TableSlot::DcB),
            (1, 0) => Ok(TableSlot::Ac0),
            (1, 1) => Ok(TableSlot::Ac1),
            _ => Err(JpegppError::UnsupportedHuffmanTableId { class, id }),
        }
    }

    pub fn dc(class: ComponentClass) -> Self {
        match class {
            ComponentClass::Luma => TableSlot::Dc0,
            ComponentClass::Chroma => TableSlot::Dc1,
        }
    }

    pub fn predictor_dc(class: ComponentClass) -> Self {
        match class {
            ComponentClass::Luma => TableSlot::DcA,
            ComponentClass::Chroma => TableSlot::DcB,
        }
    }

    pub fn ac(class: ComponentClass) -> Self {
        match class {
            ComponentClass::Luma => TableSlot::Ac0,
            ComponentClass::Chroma => TableSlot::Ac1,
        }
    }

    pub fn class(self) -> u8 {
        match self {
            TableSlot::Dc0 | TableSlot::Dc1 | TableSlot::DcA | TableSlot::DcB => 0,
            TableSlot::Ac0 | TableSlot::Ac1 => 1,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            TableSlot::Dc0 | TableSlot::Ac0 => 0,
            TableSlot::Dc1 | TableSlot::Ac1 => 1,
            TableSlot::DcA => 10,
            TableSlot::DcB => 11,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_predictor_slot(self) -> bool {
        matches!(self, TableSlot::DcA | TableSlot::DcB)
    }

    pub fn name(self) -> &'static str {
        match self {
            TableSlot::Dc0 => "DC0",
            TableSlot::Dc1 => "DC1",
            TableSlot::DcA => "DCa",
            TableSlot::DcB => "DCb",
            TableSlot::Ac0 => "AC0",
            TableSlot::Ac1 => "AC1",
        }
    }
}

impl fmt::Display for TableSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position inside the scan: the byte being consumed and how many of its bits are used.
///
/// `offset == 8` means the byte is fully consumed and no next byte was available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitCursor {
    pub current: u8,
    pub offset: u8,
}

impl BitCursor {
    pub fn available_bits(&self) -> u32 {
        8 - u32::from(self.offset)
    }
}

/// Outcome of a symbol lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Symbol { symbol: u8, cursor: BitCursor },
    /// The byte supplier ran out before a code could be completed.
    EndOfScan,
    /// No code of any length matches the upcoming bits.
    NotFound,
}

/// Encapsulates MSB-aligned Huffman table for encoding and decoding.
#[derive(Clone)]
pub struct HuffmanTable {
    codes: [HuffmanCode; 256],
    lengths: [u8; 16],
    values: Vec<u8>,

    // Decoding fields
    min_code: [i32; 16],
    max_code: [i32; 16],
    val_ptr: [i32; 16],
    code_lengths: Vec<u8>,
}

impl fmt::Debug for HuffmanTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuffmanTable")
            .field("lengths", &self.lengths)
            .field("values", &self.values)
            .finish()
    }
}

impl PartialEq for HuffmanTable {
    fn eq(&self, other: &Self) -> bool {
        self.lengths == other.lengths && self.values == other.values
    }
}

impl Eq for HuffmanTable {}

fn mask(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1u32 << bits) - 1 }
}

impl HuffmanTable {
    fn new() -> Self {
        Self {
            codes: [HuffmanCode::default(); 256],
            lengths: [0; 16],
            values: Vec::new(),
            min_code: [0; 16],
            max_code: [-1; 16],
            val_ptr: [0; 16],
            code_lengths: Vec::new(),
        }
    }

    /// Builds a table from JPEG DHT lengths and values.
    pub fn build_from_dht(lengths: &[u8; 16], values: &[u8]) -> Result<Self, JpegppError> {
        let total: usize = lengths.iter().map(|&n| n as usize).sum();
        if total != values.len() {
            return Err(JpegppError::InvalidHuffmanTable(format!(
                "{} code lengths but {} values",
                total,
                values.len()
            )));
        }
        if total == 0 {
            return Err(JpegppError::InvalidHuffmanTable("table has no codes".into()));
        }

        let mut table = Self::new();
        table.lengths.copy_from_slice(lengths);
        table.values = values.to_vec();

        let mut defined = [false; 256];
        let mut code = 0u32;
        let mut val_idx = 0;

        for i in 0..MAX_HUFFMAN_CODE_LENGTH {
            let n_codes = lengths[i] as usize;
            let length = (i + 1) as u32;
            if n_codes == 0 {
                table.max_code[i] = -1;
            } else {
                table.val_ptr[i] = val_idx as i32;
                table.min_code[i] = code as i32;
                for _ in 0..n_codes {
                    if code > mask(length) {
                        return Err(JpegppError::InvalidHuffmanTable(format!(
                            "code {:#x} does not fit in {} bits",
                            code, length
                        )));
                    }
                    let val = values[val_idx] as usize;
                    if defined[val] {
                        return Err(JpegppError::InvalidHuffmanTable(format!(
                            "symbol {:#04x} defined twice",
                            val
                        )));
                    }
                    defined[val] = true;
                    table.codes[val] = HuffmanCode {
                        value: code as u16,
                        length: length as u8,
                    };
                    code += 1;
                    val_idx += 1;
                }
                table.max_code[i] = (code - 1) as i32;
                table.code_lengths.push(length as u8);
            }
            code <<= 1;
        }
        Ok(table)
    }

    /// Builds an optimal length-limited table for the given symbol frequencies.
    ///
    /// Symbols with a zero frequency get no code. A lone symbol gets a 1-bit code.
    pub fn build_from_frequencies(frequencies: &[u32]) -> Result<Self, JpegppError> {
        if frequencies.len() > 256 {
            return Err(JpegppError::InvalidHuffmanTable(format!(
                "{} symbols exceed the byte alphabet",
                frequencies.len()
            )));
        }

        struct Node {
            symbol: Option<u8>,
            children: Option<(usize, usize)>,
        }

        let mut nodes: Vec<Node> = Vec::new();
        let mut heap = BinaryHeap::new();
        for (symbol, &frequency) in frequencies.iter().enumerate() {
            if frequency > 0 {
                heap.push(Reverse((u64::from(frequency), nodes.len())));
                nodes.push(Node {
                    symbol: Some(symbol as u8),
                    children: None,
                });
            }
        }

        match nodes.len() {
            0 => {
                return Err(JpegppError::InvalidHuffmanTable(
                    "no symbol has a non-zero frequency".into(),
                ));
            }
            1 => {
                let mut lengths = [0u8; 16];
                lengths[0] = 1;
                let symbol = nodes[0].symbol.unwrap_or_default();
                return Self::build_from_dht(&lengths, &[symbol]);
            }
            _ => {}
        }

        while heap.len() > 1 {
            let (Some(Reverse((right_freq, right))), Some(Reverse((left_freq, left)))) =
                (heap.pop(), heap.pop())
            else {
                break;
            };
            heap.push(Reverse((left_freq + right_freq, nodes.len())));
            nodes.push(Node {
                symbol: None,
                children: Some((left, right)),
            });
        }

        // Breadth-first walk yields leaves ordered by depth.
        let root = nodes.len() - 1;
        let mut leaves: Vec<(u8, usize)> = Vec::new();
        let mut queue = VecDeque::from([(root, 0usize)]);
        while let Some((index, depth)) = queue.pop_front() {
            let node = &nodes[index];
            match (node.symbol, node.children) {
                (Some(symbol), _) => leaves.push((symbol, depth)),
                (None, Some((left, right))) => {
                    queue.push_back((left, depth + 1));
                    queue.push_back((right, depth + 1));
                }
                (None, None) => {}
            }
        }

        let max_depth = leaves.iter().map(|&(_, depth)| depth).max().unwrap_or(1);
        let mut bits = vec![0i64; max_depth.max(MAX_HUFFMAN_CODE_LENGTH) + 1];
        for &(_, depth) in &leaves {
            bits[depth] += 1;
        }
        limit_code_lengths(&mut bits)?;

        let mut lengths = [0u8; 16];
        for (i, length) in lengths.iter_mut().enumerate() {
            *length = bits[i + 1] as u8;
        }
        let values: Vec<u8> = leaves.iter().map(|&(symbol, _)| symbol).collect();
        Self::build_from_dht(&lengths, &values)
    }

    pub fn standard_luminance_dc() -> Self {
        Self::standard(&STD_LUMINANCE_DC_LENGTHS, &STD_LUMINANCE_DC_VALUES)
    }

    pub fn standard_chrominance_dc() -> Self {
        Self::standard(&STD_CHROMINANCE_DC_LENGTHS, &STD_CHROMINANCE_DC_VALUES)
    }

    /// Returns the standard Luminance AC Huffman table.
    pub fn standard_luminance_ac() -> Self {
        Self::standard(&STD_LUMINANCE_AC_LENGTHS, &STD_LUMINANCE_AC_VALUES)
    }

    pub fn standard_chrominance_ac() -> Self {
        Self::standard(&STD_CHROMINANCE_AC_LENGTHS, &STD_CHROMINANCE_AC_VALUES)
    }

    fn standard(lengths: &[u8; 16], values: &[u8]) -> Self {
        match Self::build_from_dht(lengths, values) {
            Ok(table) => table,
            Err(error) => unreachable!("standard Huffman table rejected: {error}"),
        }
    }

    pub fn lengths(&self) -> &[u8; 16] {
        &self.lengths
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Distinct code lengths in ascending order.
    pub fn code_lengths(&self) -> &[u8] {
        &self.code_lengths
    }

    pub fn contains(&self, symbol: u8) -> bool {
        self.codes[symbol as usize].length > 0
    }

    pub fn find_code(&self, symbol: u8) -> Result<HuffmanCode, JpegppError> {
        let code = self.codes[symbol as usize];
        if code.length == 0 {
            return Err(JpegppError::SymbolNotInTable(symbol));
        }
        Ok(code)
    }

    fn symbol_for(&self, code: u32, length: u32) -> Option<u8> {
        let i = (length - 1) as usize;
        let code = code as i32;
        if self.max_code[i] < 0 || code < self.min_code[i] || code > self.max_code[i] {
            return None;
        }
        let idx = self.val_ptr[i] + (code - self.min_code[i]);
        self.values.get(idx as usize).copied()
    }

    /// Decodes the next symbol starting at `cursor`, pulling further bytes from
    /// `next_byte` only when a candidate length needs them.
    ///
    /// On a match the returned cursor points past the code. When the code ends
    /// on a byte boundary the next byte is prefetched; if none is available the
    /// cursor keeps the old byte with `offset == 8`.
    pub fn find_symbol<F>(&self, cursor: BitCursor, mut next_byte: F) -> Lookup
    where
        F: FnMut() -> Option<u8>,
    {
        let mut current = cursor.current;
        let mut bits = cursor.available_bits();
        let mut value = u32::from(current) & mask(bits);

        for &length in &self.code_lengths {
            let length = u32::from(length);
            while length > bits {
                let Some(byte) = next_byte() else {
                    return Lookup::EndOfScan;
                };
                current = byte;
                bits += 8;
                value = (value << 8) | u32::from(byte);
            }

            let code = value >> (bits - length);
            if let Some(symbol) = self.symbol_for(code, length) {
                let remaining = bits - length;
                let cursor = if remaining == 0 {
                    match next_byte() {
                        Some(byte) => BitCursor { current: byte, offset: 0 },
                        None => BitCursor { current, offset: 8 },
                    }
                } else {
                    BitCursor {
                        current,
                        offset: (8 - remaining) as u8,
                    }
                };
                return Lookup::Symbol { symbol, cursor };
            }
        }
        Lookup::NotFound
    }
}

/// Caps code lengths at 16 bits (T.81 Annex K.2), keeping the code complete.
///
/// `bits[d]` is the number of codes of length `d`.
fn limit_code_lengths(bits: &mut [i64]) -> Result<(), JpegppError> {
    for i in (MAX_HUFFMAN_CODE_LENGTH + 1..bits.len()).rev() {
        while bits[i] > 0 {
            if bits[i] < 2 {
                return Err(JpegppError::InvalidHuffmanTable(format!(
                    "odd number of codes at depth {}",
                    i
                )));
            }
            let mut j = i - 2;
            while j > 0 && bits[j] == 0 {
                j -= 1;
            }
            if j == 0 {
                return Err(JpegppError::InvalidHuffmanTable(
                    "cannot limit code lengths".into(),
                ));
            }
            bits[i] -= 2;
            bits[i - 1] += 1;
            bits[j + 1] += 2;
            bits[j] -= 1;
        }
    }
    Ok(())
}

/// The DC and AC tables used for one scan, indexed by component class.
#[derive(Debug, Clone, Copy)]
pub struct HuffmanTableSet<'t> {
    pub dc: [&'t HuffmanTable; 2],
    pub ac: [&'t HuffmanTable; 2],
}

impl<'t> HuffmanTableSet<'t> {
    pub fn dc(&self, class: ComponentClass) -> &'t HuffmanTable {
        self.dc[class.index()]
    }

    pub fn ac(&self, class: ComponentClass) -> &'t HuffmanTable {
        self.ac[class.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use test_log::test;

    fn all_standard_tables() -> Vec<HuffmanTable> {
        vec![
            HuffmanTable::standard_luminance_dc(),
            HuffmanTable::standard_chrominance_dc(),
            HuffmanTable::standard_luminance_ac(),
            HuffmanTable::standard_chrominance_ac(),
        ]
    }

    /// Packs one code MSB-first into bytes, padding with ones.
    fn pack(code: HuffmanCode) -> Vec<u8> {
        let length = u32::from(code.length);
        let padded = length.div_ceil(8) * 8;
        let word = (u32::from(code.value) << (padded - length)) | mask(padded - length);
        (0..padded / 8)
            .map(|i| (word >> (padded - 8 * (i + 1))) as u8)
            .collect()
    }

    fn assert_codes_decode(table: &HuffmanTable) {
        for &symbol in table.values() {
            let code = table.find_code(symbol).expect("symbol has a code");
            let bytes = pack(code);
            let mut rest = bytes[1..].iter().copied();
            let cursor = BitCursor { current: bytes[0], offset: 0 };
            match table.find_symbol(cursor, || rest.next()) {
                Lookup::Symbol { symbol: found, .. } => assert_eq!(found, symbol),
                other => panic!("Symbol {:#x} not decoded: {:?}", symbol, other),
            }
        }
    }

    fn assert_prefix_free(table: &HuffmanTable) {
        let codes: Vec<HuffmanCode> = table
            .values()
            .iter()
            .map(|&s| table.find_code(s).expect("code"))
            .collect();
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i == j || a.length > b.length {
                    continue;
                }
                let prefix = b.value >> (b.length - a.length);
                assert!(prefix != a.value, "{:?} is a prefix of {:?}", a, b);
            }
        }
    }

    /// Random DHT length counts whose Kraft sum stays at or below 1.
    fn random_lengths(rng: &mut StdRng) -> [u8; 16] {
        loop {
            let mut lengths = [0u8; 16];
            // Kraft budget in units of 2^-16.
            let mut budget = 1u32 << 16;
            for (i, count) in lengths.iter_mut().enumerate() {
                let cost = 1u32 << (15 - i);
                let n = rng.random_range(0..=(budget / cost).min(12));
                budget -= n * cost;
                *count = n as u8;
            }
            if lengths.iter().any(|&n| n > 0) {
                return lengths;
            }
        }
    }

    #[test]
    fn test_find_symbol_inverts_find_code() {
        for table in all_standard_tables() {
            assert_codes_decode(&table);
        }
    }

    #[test]
    fn test_standard_tables_are_prefix_free() {
        for table in all_standard_tables() {
            assert_prefix_free(&table);
        }
    }

    #[test]
    fn test_random_dht_tables() {
        let mut rng = StdRng::seed_from_u64(0x4448_5400);
        let mut alphabet: Vec<u8> = (0..=255).collect();
        for _ in 0..200 {
            let lengths = random_lengths(&mut rng);
            let total: usize = lengths.iter().map(|&n| usize::from(n)).sum();
            alphabet.shuffle(&mut rng);
            let table = HuffmanTable::build_from_dht(&lengths, &alphabet[..total])
                .expect("Kraft sum within 1");
            assert_eq!(table.values().len(), total);
            assert_prefix_free(&table);
            assert_codes_decode(&table);
        }
    }

    #[test]
    fn test_random_frequency_tables() {
        let mut rng = StdRng::seed_from_u64(0x4652_4551);
        for _ in 0..200 {
            let size = rng.random_range(2..=256);
            let mut frequencies: Vec<u32> = (0..size)
                .map(|_| {
                    if rng.random_bool(0.3) {
                        0
                    } else {
                        // Skewed weights force deep trees that need length limiting.
                        rng.random_range(1..=8) << rng.random_range(0..20)
                    }
                })
                .collect();
            if frequencies.iter().all(|&f| f == 0) {
                frequencies[0] = 1;
            }

            let table = HuffmanTable::build_from_frequencies(&frequencies).expect("table");
            for (symbol, &frequency) in frequencies.iter().enumerate() {
                assert_eq!(table.contains(symbol as u8), frequency > 0, "symbol {symbol}");
            }
            let longest = table.code_lengths().iter().copied().max().unwrap_or(0);
            assert!(usize::from(longest) <= MAX_HUFFMAN_CODE_LENGTH);
            assert!(kraft_sum(&table) <= 1.0);
            assert_prefix_free(&table);
            assert_codes_decode(&table);
        }
    }

    #[test]
    fn test_code_lengths_sorted() {
        let table = HuffmanTable::standard_luminance_ac();
        assert_eq!(table.code_lengths(), &[2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 15, 16]);
    }

    #[test]
    fn test_cursor_advances_within_byte() {
        // Luminance DC: category 0 is "00", category 1 is "010".
        let table = HuffmanTable::standard_luminance_dc();
        let cursor = BitCursor { current: 0b0001_0000, offset: 0 };
        let mut supplier = [0xAAu8].into_iter();
        let first = table.find_symbol(cursor, || supplier.next());
        let Lookup::Symbol { symbol, cursor } = first else {
            panic!("expected a symbol, got {:?}", first);
        };
        assert_eq!(symbol, 0);
        assert_eq!(cursor, BitCursor { current: 0b0001_0000, offset: 2 });

        let second = table.find_symbol(cursor, || supplier.next());
        let Lookup::Symbol { symbol, cursor } = second else {
            panic!("expected a symbol, got {:?}", second);
        };
        assert_eq!(symbol, 1);
        assert_eq!(cursor.offset, 5);
    }

    #[test]
    fn test_end_of_scan_when_supplier_exhausted() {
        let table = HuffmanTable::standard_luminance_ac();
        // Fifteen leading ones need a second byte.
        let cursor = BitCursor { current: 0xFF, offset: 0 };
        assert_eq!(table.find_symbol(cursor, || None), Lookup::EndOfScan);

        let drained = BitCursor { current: 0x00, offset: 8 };
        assert_eq!(table.find_symbol(drained, || None), Lookup::EndOfScan);
    }

    #[test]
    fn test_not_found_for_unassigned_code() {
        // Only "0" and "10" are assigned; "11" matches nothing.
        let mut lengths = [0u8; 16];
        lengths[0] = 1;
        lengths[1] = 1;
        let table = HuffmanTable::build_from_dht(&lengths, &[5, 7]).expect("valid table");
        let cursor = BitCursor { current: 0b1100_0000, offset: 0 };
        assert_eq!(table.find_symbol(cursor, || None), Lookup::NotFound);
    }

    #[test]
    fn test_code_ending_on_byte_boundary_prefetches() {
        let mut lengths = [0u8; 16];
        lengths[0] = 1;
        lengths[1] = 1;
        let table = HuffmanTable::build_from_dht(&lengths, &[5, 7]).expect("valid table");

        let cursor = BitCursor { current: 0b0000_0010, offset: 6 };
        let mut next = [0x42u8].into_iter();
        let result = table.find_symbol(cursor, || next.next());
        assert_eq!(
            result,
            Lookup::Symbol { symbol: 7, cursor: BitCursor { current: 0x42, offset: 0 } }
        );

        let result = table.find_symbol(cursor, || None);
        assert_eq!(
            result,
            Lookup::Symbol { symbol: 7, cursor: BitCursor { current: 0b0000_0010, offset: 8 } }
        );
    }

    #[test]
    fn test_reject_overfull_table() {
        let mut lengths = [0u8; 16];
        lengths[0] = 3;
        let result = HuffmanTable::build_from_dht(&lengths, &[1, 2, 3]);
        assert!(matches!(result, Err(JpegppError::InvalidHuffmanTable(_))));
    }

    #[test]
    fn test_reject_value_count_mismatch() {
        let mut lengths = [0u8; 16];
        lengths[1] = 2;
        let result = HuffmanTable::build_from_dht(&lengths, &[1]);
        assert!(matches!(result, Err(JpegppError::InvalidHuffmanTable(_))));
    }

    #[test]
    fn test_missing_symbol() {
        let table = HuffmanTable::standard_luminance_dc();
        assert!(matches!(
            table.find_code(12),
            Err(JpegppError::SymbolNotInTable(12))
        ));
    }

    fn kraft_sum(table: &HuffmanTable) -> f64 {
        table
            .lengths()
            .iter()
            .enumerate()
            .map(|(i, &n)| f64::from(n) / f64::from(1u32 << (i + 1)))
            .sum()
    }

    #[test]
    fn test_frequencies_shorter_codes_for_frequent_symbols() {
        let frequencies = [528u32, 762, 605, 390, 185, 30];
        let table = HuffmanTable::build_from_frequencies(&frequencies).expect("table");
        let length = |s: u8| table.find_code(s).expect("code").length;
        assert!(length(1) <= length(4));
        assert!(length(0) <= length(5));
        assert!(length(2) <= length(5));
        assert!((kraft_sum(&table) - 1.0).abs() < 1e-12);
        assert_eq!(table.values().len(), 6);
    }

    #[test]
    fn test_frequencies_single_symbol() {
        let mut frequencies = [0u32; 12];
        frequencies[4] = 99;
        let table = HuffmanTable::build_from_frequencies(&frequencies).expect("table");
        assert_eq!(table.find_code(4).expect("code"), HuffmanCode { value: 0, length: 1 });
        assert!(!table.contains(3));
    }

    #[test]
    fn test_frequencies_no_symbols() {
        assert!(HuffmanTable::build_from_frequencies(&[0u32; 12]).is_err());
    }

    #[test]
    fn test_frequencies_limited_to_sixteen_bits() {
        // Fibonacci weights produce a maximally skewed tree of depth 29.
        let mut frequencies = [0u32; 30];
        let (mut a, mut b) = (1u32, 1u32);
        for frequency in frequencies.iter_mut() {
            *frequency = a;
            (a, b) = (b, a + b);
        }
        let table = HuffmanTable::build_from_frequencies(&frequencies).expect("table");
        assert_eq!(table.values().len(), 30);
        assert!(table.code_lengths().iter().all(|&l| l as usize <= MAX_HUFFMAN_CODE_LENGTH));
        assert!(kraft_sum(&table) <= 1.0);

        // Every symbol still decodes to itself.
        for symbol in 0..30u8 {
            let code = table.find_code(symbol).expect("code");
            let bytes = pack(code);
            let mut rest = bytes[1..].iter().copied();
            let cursor = BitCursor { current: bytes[0], offset: 0 };
            assert!(matches!(
                table.find_symbol(cursor, || rest.next()),
                Lookup::Symbol { symbol: s, .. } if s == symbol
            ));
        }
    }

    #[test]
    fn test_slot_mapping() {
        for slot in TableSlot::ALL {
            assert_eq!(
                TableSlot::from_class_and_id(slot.class(), slot.id()).expect("slot"),
                slot
            );
        }
        assert!(TableSlot::from_class_and_id(1, 10).is_err());
        assert!(TableSlot::from_class_and_id(0, 2).is_err());
        assert_eq!(TableSlot::DcA.to_string(), "DCa");
    }
}
