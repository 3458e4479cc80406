//! Adaptive arithmetic coding for scan coefficients.
//!
//! A 32-bit range coder with carry-less underflow handling, driven by
//! adaptive frequency tables that persist across restart segments.
//! Each segment ends with an explicit end-of-segment DC symbol.

use crate::error::JpegppError;
use crate::jpeg1::bit_stream::next_scan_byte;

const STATE_BITS: u32 = 32;
const FULL_RANGE: u64 = 1 << STATE_BITS;
const HALF_RANGE: u64 = FULL_RANGE >> 1;
const QUARTER_RANGE: u64 = HALF_RANGE >> 1;
const MINIMUM_RANGE: u64 = QUARTER_RANGE + 2;
const MAXIMUM_TOTAL: u64 = MINIMUM_RANGE;
const STATE_MASK: u64 = FULL_RANGE - 1;

/// Offset added to a DC value to form its symbol.
pub const DC_OFFSET: i32 = 2048;
/// DC alphabet: 4096 values plus the end-of-segment symbol.
pub const DC_SYMBOL_COUNT: usize = 4097;
pub const END_OF_SEGMENT: usize = 4096;
/// AC symbol: `(run << 11) | sign << 10 | magnitude`.
pub const AC_SYMBOL_COUNT: usize = 1 << 15;
const AC_SIGN_BIT: u32 = 0x400;
const AC_MAGNITUDE_MASK: u32 = 0x3FF;
const AC_RUN_SHIFT: u32 = 11;

/// Symbol frequencies backed by a Fenwick tree.
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    frequencies: Vec<u32>,
    tree: Vec<u64>,
    total: u64,
}

impl FrequencyTable {
    /// Every symbol starts with frequency 1.
    pub fn flat(symbol_count: usize) -> Self {
        let mut tree = vec![0u64; symbol_count + 1];
        for i in 1..=symbol_count {
            tree[i] += 1;
            let parent = i + (i & i.wrapping_neg());
            if parent <= symbol_count {
                tree[parent] += tree[i];
            }
        }
        Self {
            frequencies: vec![1; symbol_count],
            tree,
            total: symbol_count as u64,
        }
    }

    pub fn symbol_count(&self) -> usize {
        self.frequencies.len()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn get(&self, symbol: usize) -> u32 {
        self.frequencies.get(symbol).copied().unwrap_or(0)
    }

    /// Sum of the frequencies of all symbols below `symbol`.
    pub fn low(&self, symbol: usize) -> u64 {
        let mut sum = 0;
        let mut i = symbol;
        while i > 0 {
            sum += self.tree[i];
            i &= i - 1;
        }
        sum
    }

    pub fn high(&self, symbol: usize) -> u64 {
        self.low(symbol) + u64::from(self.get(symbol))
    }

    pub fn increment(&mut self, symbol: usize) -> Result<(), JpegppError> {
        if symbol >= self.frequencies.len() {
            return Err(JpegppError::ArithmeticSymbolOutOfRange(symbol as u32));
        }
        if self.total + 1 > MAXIMUM_TOTAL {
            return Err(JpegppError::FrequencyTableOverflow(self.total + 1));
        }
        self.frequencies[symbol] += 1;
        self.total += 1;
        let mut i = symbol + 1;
        while i < self.tree.len() {
            self.tree[i] += 1;
            i += i & i.wrapping_neg();
        }
        Ok(())
    }

    /// The symbol whose cumulative range contains `value`.
    pub fn find(&self, value: u64) -> usize {
        let n = self.frequencies.len();
        let mut position = 0;
        let mut remaining = value;
        let mut step = if n == 0 { 0 } else { 1usize << (usize::BITS - 1 - n.leading_zeros()) };
        while step > 0 {
            let next = position + step;
            if next <= n && self.tree[next] <= remaining {
                position = next;
                remaining -= self.tree[next];
            }
            step >>= 1;
        }
        position
    }
}

/// DC and AC frequency tables shared by every segment of a session.
#[derive(Debug, Clone)]
pub struct AdaptiveModel {
    pub dc: FrequencyTable,
    pub ac: FrequencyTable,
}

impl Default for AdaptiveModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveModel {
    pub fn new() -> Self {
        Self {
            dc: FrequencyTable::flat(DC_SYMBOL_COUNT),
            ac: FrequencyTable::flat(AC_SYMBOL_COUNT),
        }
    }
}

pub fn dc_symbol(value: i32) -> Result<usize, JpegppError> {
    let symbol = value + DC_OFFSET;
    if !(0..END_OF_SEGMENT as i32).contains(&symbol) {
        return Err(JpegppError::ValueOutOfRange { value, max_category: 11 });
    }
    Ok(symbol as usize)
}

pub fn dc_value(symbol: usize) -> i32 {
    symbol as i32 - DC_OFFSET
}

pub fn ac_symbol(run: u8, value: i32) -> Result<usize, JpegppError> {
    let magnitude = value.unsigned_abs();
    if magnitude > AC_MAGNITUDE_MASK {
        return Err(JpegppError::ValueOutOfRange { value, max_category: 10 });
    }
    if run > 15 {
        return Err(JpegppError::InvalidRunLength(usize::from(run)));
    }
    let sign = if value < 0 { AC_SIGN_BIT } else { 0 };
    Ok(((u32::from(run) << AC_RUN_SHIFT) | sign | magnitude) as usize)
}

pub fn ac_run_value(symbol: usize) -> (u8, i32) {
    let symbol = symbol as u32;
    let run = ((symbol >> AC_RUN_SHIFT) & 0x0F) as u8;
    let magnitude = (symbol & AC_MAGNITUDE_MASK) as i32;
    let value = if symbol & AC_SIGN_BIT != 0 { -magnitude } else { magnitude };
    (run, value)
}

/// Narrows `[low, high]` to the sub-range of `symbol`.
fn narrow(
    low: u64,
    high: u64,
    table: &FrequencyTable,
    symbol: usize,
) -> Result<(u64, u64), JpegppError> {
    let total = table.total();
    if total > MAXIMUM_TOTAL {
        return Err(JpegppError::FrequencyTableOverflow(total));
    }
    let symbol_low = table.low(symbol);
    let symbol_high = table.high(symbol);
    if symbol_low == symbol_high {
        return Err(JpegppError::ArithmeticSymbolOutOfRange(symbol as u32));
    }
    let range = high - low + 1;
    let new_low = low + symbol_low * range / total;
    let new_high = low + symbol_high * range / total - 1;
    Ok((new_low, new_high))
}

/// Collects bits MSB-first, zero-padding the last byte.
#[derive(Debug, Default)]
struct BitPacker {
    bytes: Vec<u8>,
    current: u8,
    bits: u8,
}

impl BitPacker {
    fn write_bit(&mut self, bit: u8) {
        self.current = (self.current << 1) | (bit & 1);
        self.bits += 1;
        if self.bits == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.bits = 0;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.bytes.push(self.current << (8 - self.bits));
        }
        self.bytes
    }
}

pub struct ArithmeticEncoder {
    low: u64,
    high: u64,
    underflow: u32,
    output: BitPacker,
}

impl Default for ArithmeticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArithmeticEncoder {
    pub fn new() -> Self {
        Self {
            low: 0,
            high: STATE_MASK,
            underflow: 0,
            output: BitPacker::default(),
        }
    }

    pub fn write(&mut self, table: &FrequencyTable, symbol: usize) -> Result<(), JpegppError> {
        (self.low, self.high) = narrow(self.low, self.high, table, symbol)?;

        while (self.low ^ self.high) & HALF_RANGE == 0 {
            let bit = (self.low >> (STATE_BITS - 1)) as u8;
            self.output.write_bit(bit);
            for _ in 0..self.underflow {
                self.output.write_bit(bit ^ 1);
            }
            self.underflow = 0;
            self.low = (self.low << 1) & STATE_MASK;
            self.high = ((self.high << 1) & STATE_MASK) | 1;
        }
        while self.low & !self.high & QUARTER_RANGE != 0 {
            self.underflow += 1;
            self.low = (self.low << 1) ^ HALF_RANGE;
            self.high = ((self.high ^ HALF_RANGE) << 1) | HALF_RANGE | 1;
        }
        Ok(())
    }

    /// Flushes the final bit; the decoder reads zeros past the end.
    pub fn finish(mut self) -> Vec<u8> {
        self.output.write_bit(1);
        self.output.finish()
    }
}

/// Reads destuffed scan bits, yielding zeros at a marker or the end of data.
struct ScanBits<'a> {
    source: &'a [u8],
    position: usize,
    current: u8,
    bits: u8,
}

impl<'a> ScanBits<'a> {
    fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            current: 0,
            bits: 0,
        }
    }

    fn read_bit(&mut self) -> u64 {
        if self.bits == 0 {
            self.current = next_scan_byte(self.source, &mut self.position).unwrap_or(0);
            self.bits = 8;
        }
        self.bits -= 1;
        u64::from((self.current >> self.bits) & 1)
    }
}

pub struct ArithmeticDecoder<'a> {
    low: u64,
    high: u64,
    code: u64,
    input: ScanBits<'a>,
}

impl<'a> ArithmeticDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        let mut input = ScanBits::new(source);
        let mut code = 0;
        for _ in 0..STATE_BITS {
            code = (code << 1) | input.read_bit();
        }
        Self {
            low: 0,
            high: STATE_MASK,
            code,
            input,
        }
    }

    pub fn read(&mut self, table: &FrequencyTable) -> Result<usize, JpegppError> {
        let total = table.total();
        if total > MAXIMUM_TOTAL {
            return Err(JpegppError::FrequencyTableOverflow(total));
        }
        let range = self.high - self.low + 1;
        let offset = self.code.wrapping_sub(self.low) & STATE_MASK;
        let value = ((offset + 1) * total - 1) / range;
        if value >= total {
            return Err(JpegppError::ArithmeticSymbolOutOfRange(value as u32));
        }
        let symbol = table.find(value);

        (self.low, self.high) = narrow(self.low, self.high, table, symbol)?;

        while (self.low ^ self.high) & HALF_RANGE == 0 {
            self.code = ((self.code << 1) & STATE_MASK) | self.input.read_bit();
            self.low = (self.low << 1) & STATE_MASK;
            self.high = ((self.high << 1) & STATE_MASK) | 1;
        }
        while self.low & !self.high & QUARTER_RANGE != 0 {
            self.code = (self.code & HALF_RANGE)
                | ((self.code << 1) & (STATE_MASK >> 1))
                | self.input.read_bit();
            self.low = (self.low << 1) ^ HALF_RANGE;
            self.high = ((self.high ^ HALF_RANGE) << 1) | HALF_RANGE | 1;
        }
        Ok(symbol)
    }
}
