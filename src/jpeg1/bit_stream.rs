//! Bit-level access to entropy-coded scan data.
//!
//! Scan bytes are stuffed: every 0xFF data byte is followed by 0x00, so any
//! other byte after 0xFF starts a marker and ends the segment.

use crate::error::JpegppError;
use crate::jpeg1::huffman::{BitCursor, HuffmanTable, Lookup};
use crate::jpeg_marker_code::JPEG_MARKER_START_BYTE;

/// Reads the next destuffed scan byte, or `None` at a marker or the end of data.
///
/// A marker is left unconsumed.
pub fn next_scan_byte(source: &[u8], position: &mut usize) -> Option<u8> {
    let byte = *source.get(*position)?;
    if byte != JPEG_MARKER_START_BYTE {
        *position += 1;
        return Some(byte);
    }
    match source.get(*position + 1) {
        Some(0x00) => {
            *position += 2;
            Some(JPEG_MARKER_START_BYTE)
        }
        _ => None,
    }
}

/// Offset of the first marker in `source`, or its length if none.
pub fn find_marker(source: &[u8]) -> usize {
    let mut position = 0;
    while next_scan_byte(source, &mut position).is_some() {}
    position
}

/// Appends `bytes` to `destination`, inserting 0x00 after every 0xFF.
pub fn write_stuffed(destination: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        destination.push(byte);
        if byte == JPEG_MARKER_START_BYTE {
            destination.push(0x00);
        }
    }
}

/// Computes the magnitude category of an integer (ISO/IEC 10918-1 F.1.2.1).
pub fn category(value: i32) -> u8 {
    (32 - value.unsigned_abs().leading_zeros()) as u8
}

/// Encodes the bits for a given category and value (ISO/IEC 10918-1 F.1.2.1.1).
pub fn encode_value(value: i32, category: u8) -> u32 {
    if category == 0 {
        return 0;
    }
    if value >= 0 {
        value as u32
    } else {
        (value + (1 << category) - 1) as u32
    }
}

/// Decodes the value from bits given its category (ISO/IEC 10918-1 F.1.2.1.1).
pub fn decode_value(bits: u32, category: u8) -> i32 {
    if category == 0 {
        return 0;
    }
    let threshold = 1u32 << (category - 1);
    if bits >= threshold {
        bits as i32
    } else {
        bits as i32 + 1 - (1i32 << category)
    }
}

fn mask(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1u32 << bits) - 1 }
}

/// Reads Huffman symbols and magnitude bits from one entropy-coded segment.
pub struct ScanBitReader<'a> {
    source: &'a [u8],
    position: usize,
    cursor: BitCursor,
}

impl<'a> ScanBitReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        let mut position = 0;
        let cursor = match next_scan_byte(source, &mut position) {
            Some(byte) => BitCursor { current: byte, offset: 0 },
            None => BitCursor { current: 0, offset: 8 },
        };
        Self {
            source,
            position,
            cursor,
        }
    }

    /// Bytes of `source` consumed so far, including the prefetched byte.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn read_symbol(&mut self, table: &HuffmanTable) -> Result<u8, JpegppError> {
        let source = self.source;
        let position = &mut self.position;
        match table.find_symbol(self.cursor, || next_scan_byte(source, position)) {
            Lookup::Symbol { symbol, cursor } => {
                self.cursor = cursor;
                Ok(symbol)
            }
            Lookup::EndOfScan => Err(JpegppError::UnexpectedEndOfScan(self.position)),
            Lookup::NotFound => Err(JpegppError::HuffmanCodeNotFound(self.position)),
        }
    }

    /// Reads `category` magnitude bits and maps them to a signed value.
    pub fn read_value(&mut self, category: u8) -> Result<i32, JpegppError> {
        if category == 0 {
            return Ok(0);
        }
        let length = u32::from(category);
        let mut current = self.cursor.current;
        let mut bits = self.cursor.available_bits();
        let mut value = u32::from(current) & mask(bits);

        while bits < length {
            let byte = next_scan_byte(self.source, &mut self.position)
                .ok_or(JpegppError::UnexpectedEndOfScan(self.position))?;
            current = byte;
            bits += 8;
            value = (value << 8) | u32::from(byte);
        }

        let remaining = bits - length;
        let stored = (value >> remaining) & mask(length);
        self.cursor = if remaining == 0 {
            match next_scan_byte(self.source, &mut self.position) {
                Some(byte) => BitCursor { current: byte, offset: 0 },
                None => BitCursor { current, offset: 8 },
            }
        } else {
            BitCursor {
                current,
                offset: (8 - remaining) as u8,
            }
        };
        Ok(decode_value(stored, category))
    }

    /// Checks that only 1-bit padding remains before the next marker.
    ///
    /// Returns the number of bytes the segment occupied.
    pub fn finish(mut self) -> Result<usize, JpegppError> {
        let padding = self.cursor.available_bits();
        if padding > 0 {
            let expected = mask(padding);
            if u32::from(self.cursor.current) & expected != expected {
                return Err(JpegppError::TrailingScanData(self.position));
            }
            if next_scan_byte(self.source, &mut self.position).is_some() {
                return Err(JpegppError::TrailingScanData(self.position));
            }
        }
        Ok(self.position)
    }
}

/// Packs bits MSB-first into stuffed scan bytes.
pub struct ScanBitWriter {
    destination: Vec<u8>,
    bit_buffer: u32,
    bits_in_buffer: u32,
}

impl Default for ScanBitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanBitWriter {
    pub fn new() -> Self {
        Self {
            destination: Vec::new(),
            bit_buffer: 0,
            bits_in_buffer: 0,
        }
    }

    pub fn write_bits(&mut self, value: u32, length: u8) {
        if length == 0 {
            return;
        }
        let length = u32::from(length);
        debug_assert!(value & !mask(length) == 0, "{value:#x} wider than {length} bits");
        if length > 24 {
            self.write_bits(value >> 16, (length - 16) as u8);
            self.write_bits(value & 0xFFFF, 16);
            return;
        }
        self.bit_buffer = (self.bit_buffer << length) | (value & mask(length));
        self.bits_in_buffer += length;

        while self.bits_in_buffer >= 8 {
            let shift = self.bits_in_buffer - 8;
            let byte = ((self.bit_buffer >> shift) & 0xFF) as u8;
            write_stuffed(&mut self.destination, &[byte]);
            self.bits_in_buffer = shift;
            self.bit_buffer &= mask(shift);
        }
    }

    /// Pads the last partial byte with ones.
    pub fn flush(&mut self) {
        if self.bits_in_buffer > 0 {
            let pad_bits = 8 - self.bits_in_buffer;
            self.write_bits(mask(pad_bits), pad_bits as u8);
        }
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.destination
    }
}
