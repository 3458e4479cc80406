//! Scan encoding: walks MCUs and blocks, delegating symbols to an entropy backend.

use crate::constants::{END_OF_BLOCK, MAX_AC_CATEGORY, MAX_DC_CATEGORY, MAX_ZERO_RUN};
use crate::error::JpegppError;
use crate::jpeg1::arithmetic::{
    AdaptiveModel, ArithmeticEncoder, END_OF_SEGMENT, ac_symbol, dc_symbol,
};
use crate::jpeg1::bit_stream::{ScanBitWriter, category, encode_value, write_stuffed};
use crate::jpeg1::component::{Block, ComponentClass, ComponentScans};
use crate::jpeg1::huffman::HuffmanTableSet;
use crate::jpeg1::statistics::{CoefficientKind, SymbolEvent, SymbolObserver};

/// Sink for DC and AC symbols of one entropy-coded segment.
pub trait EntropyEncoder {
    fn write_dc(&mut self, class: ComponentClass, value: i32) -> Result<(), JpegppError>;

    fn write_ac(&mut self, class: ComponentClass, run: u8, value: i32) -> Result<(), JpegppError>;

    /// Terminates the segment and returns its stuffed bytes.
    fn finish(self) -> Result<Vec<u8>, JpegppError>;
}

pub struct HuffmanScanEncoder<'t> {
    writer: ScanBitWriter,
    tables: HuffmanTableSet<'t>,
}

impl<'t> HuffmanScanEncoder<'t> {
    pub fn new(tables: HuffmanTableSet<'t>) -> Self {
        Self {
            writer: ScanBitWriter::new(),
            tables,
        }
    }

    /// Flushes with 1-bit padding and returns the stuffed segment.
    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_bytes()
    }
}

impl EntropyEncoder for HuffmanScanEncoder<'_> {
    fn write_dc(&mut self, class: ComponentClass, value: i32) -> Result<(), JpegppError> {
        let category = category(value);
        if category > MAX_DC_CATEGORY {
            return Err(JpegppError::ValueOutOfRange { value, max_category: MAX_DC_CATEGORY });
        }
        let code = self.tables.dc(class).find_code(category)?;
        let bits = (u32::from(code.value) << category) | encode_value(value, category);
        self.writer.write_bits(bits, code.length + category);
        Ok(())
    }

    fn write_ac(&mut self, class: ComponentClass, run: u8, value: i32) -> Result<(), JpegppError> {
        let category = category(value);
        if category > MAX_AC_CATEGORY {
            return Err(JpegppError::ValueOutOfRange { value, max_category: MAX_AC_CATEGORY });
        }
        let code = self.tables.ac(class).find_code((run << 4) | category)?;
        let bits = (u32::from(code.value) << category) | encode_value(value, category);
        self.writer.write_bits(bits, code.length + category);
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, JpegppError> {
        Ok(self.into_bytes())
    }
}

/// Encodes one segment with the adaptive arithmetic backend, closing it with
/// the end-of-segment symbol.
pub struct ArithmeticScanEncoder<'m> {
    encoder: ArithmeticEncoder,
    model: &'m mut AdaptiveModel,
}

impl<'m> ArithmeticScanEncoder<'m> {
    pub fn new(model: &'m mut AdaptiveModel) -> Self {
        Self {
            encoder: ArithmeticEncoder::new(),
            model,
        }
    }
}

impl EntropyEncoder for ArithmeticScanEncoder<'_> {
    fn write_dc(&mut self, _class: ComponentClass, value: i32) -> Result<(), JpegppError> {
        let symbol = dc_symbol(value)?;
        self.encoder.write(&self.model.dc, symbol)?;
        self.model.dc.increment(symbol)
    }

    fn write_ac(&mut self, _class: ComponentClass, run: u8, value: i32) -> Result<(), JpegppError> {
        let symbol = ac_symbol(run, value)?;
        self.encoder.write(&self.model.ac, symbol)?;
        self.model.ac.increment(symbol)
    }

    fn finish(mut self) -> Result<Vec<u8>, JpegppError> {
        self.encoder.write(&self.model.dc, END_OF_SEGMENT)?;
        let raw = self.encoder.finish();
        let mut bytes = Vec::with_capacity(raw.len() + raw.len() / 64);
        write_stuffed(&mut bytes, &raw);
        Ok(bytes)
    }
}

/// Checks Huffman value ranges but produces no output.
#[derive(Debug, Default)]
pub struct DiscardingEncoder;

impl EntropyEncoder for DiscardingEncoder {
    fn write_dc(&mut self, _class: ComponentClass, value: i32) -> Result<(), JpegppError> {
        if category(value) > MAX_DC_CATEGORY {
            return Err(JpegppError::ValueOutOfRange { value, max_category: MAX_DC_CATEGORY });
        }
        Ok(())
    }

    fn write_ac(
        &mut self,
        _class: ComponentClass,
        _run: u8,
        value: i32,
    ) -> Result<(), JpegppError> {
        if category(value) > MAX_AC_CATEGORY {
            return Err(JpegppError::ValueOutOfRange { value, max_category: MAX_AC_CATEGORY });
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, JpegppError> {
        Ok(Vec::new())
    }
}

/// Writes a segment's MCUs: four luma blocks, then Cb and Cr.
pub fn write_scan<E: EntropyEncoder>(
    encoder: &mut E,
    scans: &ComponentScans,
    mut observer: Option<&mut (dyn SymbolObserver + '_)>,
) -> Result<(), JpegppError> {
    if !scans.is_consistent() {
        return Err(JpegppError::UnsupportedScan(format!(
            "{} luma blocks for {} chroma pairs",
            scans.y.len(),
            scans.cb.len()
        )));
    }
    for (mcu, luma) in scans.y.chunks_exact(4).enumerate() {
        for block in luma {
            write_block(encoder, ComponentClass::Luma, block, observer.as_deref_mut())?;
        }
        write_block(encoder, ComponentClass::Chroma, &scans.cb[mcu], observer.as_deref_mut())?;
        write_block(encoder, ComponentClass::Chroma, &scans.cr[mcu], observer.as_deref_mut())?;
    }
    Ok(())
}

/// Writes one block; end-of-block is emitted only when the block ends in zeros.
pub fn write_block<E: EntropyEncoder>(
    encoder: &mut E,
    class: ComponentClass,
    block: &Block,
    mut observer: Option<&mut (dyn SymbolObserver + '_)>,
) -> Result<(), JpegppError> {
    let mut emit = |kind: CoefficientKind, run: u8, value: i32| {
        if let Some(observer) = observer.as_deref_mut() {
            observer.observe(&SymbolEvent { kind, class, run, value });
        }
    };

    encoder.write_dc(class, block[0])?;
    emit(CoefficientKind::Dc, 0, block[0]);

    let mut last = 0;
    for i in 1..64 {
        if block[i] == 0 {
            continue;
        }
        let mut zeros = i - last - 1;
        while zeros > usize::from(MAX_ZERO_RUN) {
            encoder.write_ac(class, MAX_ZERO_RUN, 0)?;
            emit(CoefficientKind::Ac, MAX_ZERO_RUN, 0);
            zeros -= usize::from(MAX_ZERO_RUN) + 1;
        }
        encoder.write_ac(class, zeros as u8, block[i])?;
        emit(CoefficientKind::Ac, zeros as u8, block[i]);
        last = i;
    }
    if last < 63 {
        encoder.write_ac(class, END_OF_BLOCK, 0)?;
        emit(CoefficientKind::Ac, END_OF_BLOCK, 0);
    }
    Ok(())
}
