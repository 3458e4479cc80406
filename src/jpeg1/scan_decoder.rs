//! Scan decoding: walks MCUs and blocks, delegating symbols to an entropy backend.

use tracing::trace;

use crate::constants::{MAX_AC_CATEGORY, MAX_DC_CATEGORY, MAX_ZERO_RUN};
use crate::error::JpegppError;
use crate::jpeg1::arithmetic::{
    AdaptiveModel, ArithmeticDecoder, END_OF_SEGMENT, ac_run_value, dc_value,
};
use crate::jpeg1::bit_stream::{ScanBitReader, find_marker};
use crate::jpeg1::component::{Block, ComponentClass, ComponentScans, MCU_LAYOUT};
use crate::jpeg1::huffman::HuffmanTableSet;

/// Source of DC and AC symbols for one entropy-coded segment.
pub trait EntropyDecoder {
    fn read_dc(&mut self, class: ComponentClass) -> Result<i32, JpegppError>;

    /// Returns `(run, value)`; `(0, 0)` is end-of-block and `(15, 0)` a run of sixteen zeros.
    fn read_ac(&mut self, class: ComponentClass) -> Result<(u8, i32), JpegppError>;

    /// Validates the segment trailer and returns the number of bytes consumed.
    fn finish(self) -> Result<usize, JpegppError>;
}

pub struct HuffmanScanDecoder<'a, 't> {
    reader: ScanBitReader<'a>,
    tables: HuffmanTableSet<'t>,
}

impl<'a, 't> HuffmanScanDecoder<'a, 't> {
    pub fn new(source: &'a [u8], tables: HuffmanTableSet<'t>) -> Self {
        Self {
            reader: ScanBitReader::new(source),
            tables,
        }
    }
}

impl EntropyDecoder for HuffmanScanDecoder<'_, '_> {
    fn read_dc(&mut self, class: ComponentClass) -> Result<i32, JpegppError> {
        let category = self.reader.read_symbol(self.tables.dc(class))?;
        if category > MAX_DC_CATEGORY {
            return Err(JpegppError::HuffmanCodeNotFound(self.reader.position()));
        }
        self.reader.read_value(category)
    }

    fn read_ac(&mut self, class: ComponentClass) -> Result<(u8, i32), JpegppError> {
        let symbol = self.reader.read_symbol(self.tables.ac(class))?;
        let run = symbol >> 4;
        let category = symbol & 0x0F;
        if category > MAX_AC_CATEGORY {
            return Err(JpegppError::HuffmanCodeNotFound(self.reader.position()));
        }
        Ok((run, self.reader.read_value(category)?))
    }

    fn finish(self) -> Result<usize, JpegppError> {
        self.reader.finish()
    }
}

/// Decodes one segment coded with the adaptive arithmetic backend.
///
/// The segment extends to the next marker; the model carries over between segments.
pub struct ArithmeticScanDecoder<'a, 'm> {
    decoder: ArithmeticDecoder<'a>,
    model: &'m mut AdaptiveModel,
    length: usize,
}

impl<'a, 'm> ArithmeticScanDecoder<'a, 'm> {
    pub fn new(source: &'a [u8], model: &'m mut AdaptiveModel) -> Self {
        let length = find_marker(source);
        Self {
            decoder: ArithmeticDecoder::new(&source[..length]),
            model,
            length,
        }
    }
}

impl EntropyDecoder for ArithmeticScanDecoder<'_, '_> {
    fn read_dc(&mut self, _class: ComponentClass) -> Result<i32, JpegppError> {
        let symbol = self.decoder.read(&self.model.dc)?;
        if symbol == END_OF_SEGMENT {
            return Err(JpegppError::UnexpectedEndOfScan(self.length));
        }
        self.model.dc.increment(symbol)?;
        Ok(dc_value(symbol))
    }

    fn read_ac(&mut self, _class: ComponentClass) -> Result<(u8, i32), JpegppError> {
        let symbol = self.decoder.read(&self.model.ac)?;
        self.model.ac.increment(symbol)?;
        Ok(ac_run_value(symbol))
    }

    fn finish(mut self) -> Result<usize, JpegppError> {
        let symbol = self.decoder.read(&self.model.dc)?;
        if symbol != END_OF_SEGMENT {
            return Err(JpegppError::TrailingScanData(self.length));
        }
        Ok(self.length)
    }
}

/// Reads `mcu_count` MCUs of 4:2:0 blocks.
pub fn read_scan<D: EntropyDecoder>(
    decoder: &mut D,
    mcu_count: usize,
) -> Result<ComponentScans, JpegppError> {
    let mut scans = ComponentScans::with_capacity(mcu_count);
    for _ in 0..mcu_count {
        for component in MCU_LAYOUT {
            let block = read_block(decoder, component.class())?;
            scans.component_mut(component).push(block);
        }
    }
    trace!(mcu_count, "scan segment decoded");
    Ok(scans)
}

/// Reads one block: a DC value, then (run, value) pairs up to end-of-block or position 63.
pub fn read_block<D: EntropyDecoder>(
    decoder: &mut D,
    class: ComponentClass,
) -> Result<Block, JpegppError> {
    let mut block = [0i32; 64];
    block[0] = decoder.read_dc(class)?;

    let mut position = 1;
    while position < 64 {
        let (run, value) = decoder.read_ac(class)?;
        if value == 0 {
            match run {
                0 => break,
                MAX_ZERO_RUN => {}
                _ => return Err(JpegppError::InvalidRunLength(position)),
            }
        }
        position += usize::from(run);
        if position >= 64 {
            return Err(JpegppError::InvalidRunLength(position));
        }
        block[position] = value;
        position += 1;
    }
    Ok(block)
}
