//! Recompression session: parses a baseline 4:2:0 JPEG, decodes every restart
//! segment back to quantized coefficients and re-encodes them with the
//! predictor and entropy backend selected by [`Mode`].
//!
//! Header segments are echoed field by field. When the output uses the
//! spatial DC predictor, a first pass over the image gathers residual
//! statistics so the DCa/DCb Huffman tables can be written before the scan.

use std::fmt;

use tracing::{debug, info};

use crate::FrameInfo;
use crate::error::JpegppError;
use crate::jpeg1::arithmetic::AdaptiveModel;
use crate::jpeg1::component::{Block, Component, ComponentClass, ComponentScans};
use crate::jpeg1::huffman::{HuffmanTable, HuffmanTableSet, TableSlot};
use crate::jpeg1::predictor::{BlockHistory, BlockLayout, SpatialPredictor};
use crate::jpeg1::quantization::{
    QuantizationTable, depredict_dc, dequantize_scan, predict_dc, quantize_scan,
};
use crate::jpeg1::scan_decoder::{
    ArithmeticScanDecoder, EntropyDecoder, HuffmanScanDecoder, read_scan,
};
use crate::jpeg1::scan_encoder::{
    ArithmeticScanEncoder, DiscardingEncoder, EntropyEncoder, HuffmanScanEncoder, write_scan,
};
use crate::jpeg1::statistics::{CoefficientKind, SymbolObserver, SymbolStatistics};
use crate::jpeg_marker_code::{JPEG_RESTART_MARKER_RANGE, JpegMarkerCode};
use crate::jpeg_stream_reader::{HeaderSegment, JpegStreamReader, ScanHeader};
use crate::jpeg_stream_writer::JpegStreamWriter;

/// How DC coefficients are predicted inside a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcPrediction {
    /// Standard baseline DPCM: each DC is coded relative to the previous block.
    Differential,
    /// Estimated from the left and upper neighbours' edges.
    Spatial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyBackend {
    Huffman,
    Arithmetic,
}

/// Predictor and entropy backend of one side of the recompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodingStrategy {
    pub prediction: DcPrediction,
    pub backend: EntropyBackend,
}

impl CodingStrategy {
    pub const BASELINE: Self = Self {
        prediction: DcPrediction::Differential,
        backend: EntropyBackend::Huffman,
    };
    pub const SPATIAL: Self = Self {
        prediction: DcPrediction::Spatial,
        backend: EntropyBackend::Huffman,
    };
    pub const ARITHMETIC: Self = Self {
        prediction: DcPrediction::Differential,
        backend: EntropyBackend::Arithmetic,
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Baseline in, baseline out.
    #[default]
    Passthrough,
    PiedPiperEncode,
    PiedPiperDecode,
    ArithmeticEncode,
    ArithmeticDecode,
}

impl Mode {
    pub fn input(self) -> CodingStrategy {
        match self {
            Mode::PiedPiperDecode => CodingStrategy::SPATIAL,
            Mode::ArithmeticDecode => CodingStrategy::ARITHMETIC,
            Mode::Passthrough | Mode::PiedPiperEncode | Mode::ArithmeticEncode => {
                CodingStrategy::BASELINE
            }
        }
    }

    pub fn output(self) -> CodingStrategy {
        match self {
            Mode::PiedPiperEncode => CodingStrategy::SPATIAL,
            Mode::ArithmeticEncode => CodingStrategy::ARITHMETIC,
            Mode::Passthrough | Mode::PiedPiperDecode | Mode::ArithmeticDecode => {
                CodingStrategy::BASELINE
            }
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Passthrough => "passthrough",
            Mode::PiedPiperEncode => "PiedPiper encode",
            Mode::PiedPiperDecode => "PiedPiper decode",
            Mode::ArithmeticEncode => "arithmetic encode",
            Mode::ArithmeticDecode => "arithmetic decode",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecompressOptions {
    pub mode: Mode,
    /// Record every symbol written to the output scan.
    pub collect_statistics: bool,
}

#[derive(Debug, Clone)]
pub struct Recompressed {
    pub data: Vec<u8>,
    pub bytes_read: usize,
    pub bytes_written: usize,
    pub statistics: Option<SymbolStatistics>,
}

/// Header-level description of an image, without decoding the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    pub frame: FrameInfo,
    pub restart_interval: u16,
    pub quantization_tables: Vec<u8>,
    pub huffman_tables: Vec<TableSlot>,
    /// APPn and COM markers with their payload sizes.
    pub passthrough_segments: Vec<(JpegMarkerCode, usize)>,
    /// Offset of the first entropy-coded byte.
    pub scan_offset: usize,
}

/// Re-encodes `source` as selected by `options.mode`.
///
/// Any structural or entropy error aborts the whole run; no partial output is
/// returned.
pub fn recompress(source: &[u8], options: &RecompressOptions) -> Result<Recompressed, JpegppError> {
    let mode = options.mode;
    info!(%mode, size = source.len(), "recompressing");

    let predictor_tables = if mode.output().prediction == DcPrediction::Spatial {
        let mut survey = SymbolStatistics::new();
        let observer: &mut dyn SymbolObserver = &mut survey;
        Session::new(source, mode).run(OutputTables::Survey, Some(observer))?;
        Some(predictor_tables(&survey)?)
    } else {
        None
    };

    let tables = match &predictor_tables {
        Some(tables) => OutputTables::Predictor(tables),
        None => OutputTables::Stream,
    };
    let mut statistics = options.collect_statistics.then(SymbolStatistics::new);
    let (data, bytes_read) = Session::new(source, mode).run(
        tables,
        statistics.as_mut().map(|s| s as &mut dyn SymbolObserver),
    )?;

    info!(bytes_read, bytes_written = data.len(), "recompression finished");
    Ok(Recompressed {
        bytes_written: data.len(),
        data,
        bytes_read,
        statistics,
    })
}

/// Reads the header segments up to the start of scan.
pub fn inspect(source: &[u8]) -> Result<ImageSummary, JpegppError> {
    let mut reader = JpegStreamReader::new(source);
    reader.read_start_of_image()?;

    let mut quantization_tables = Vec::new();
    let mut huffman_tables = Vec::new();
    let mut passthrough_segments = Vec::new();
    loop {
        match reader.read_header_segment()? {
            HeaderSegment::Passthrough { marker, payload } => {
                passthrough_segments.push((marker, payload.len()))
            }
            HeaderSegment::QuantizationTables(tables) => {
                quantization_tables.extend(tables.iter().map(|(id, _)| *id))
            }
            HeaderSegment::HuffmanTables(tables) => {
                huffman_tables.extend(tables.iter().map(|(slot, _)| *slot))
            }
            HeaderSegment::Frame(_) | HeaderSegment::RestartInterval(_) => {}
            HeaderSegment::StartOfScan(_) => break,
        }
    }

    Ok(ImageSummary {
        frame: reader
            .frame_info()
            .ok_or(JpegppError::MissingTable("SOF0 frame header"))?,
        restart_interval: reader.restart_interval(),
        quantization_tables,
        huffman_tables,
        passthrough_segments,
        scan_offset: reader.position(),
    })
}

/// Builds the DCa/DCb tables from the DC residual histograms of a survey pass.
fn predictor_tables(survey: &SymbolStatistics) -> Result<[HuffmanTable; 2], JpegppError> {
    let build = |class| {
        HuffmanTable::build_from_frequencies(&survey.symbol_frequencies(CoefficientKind::Dc, class))
    };
    Ok([build(ComponentClass::Luma)?, build(ComponentClass::Chroma)?])
}

/// DC tables the output scan is coded with.
#[derive(Clone, Copy)]
enum OutputTables<'p> {
    /// The DC0/DC1 tables found in the input.
    Stream,
    /// Freshly built DCa/DCb tables.
    Predictor(&'p [HuffmanTable; 2]),
    /// No output; symbols only go to the observer.
    Survey,
}

/// Owned copies of the four tables one scan is coded with.
struct CodingTables {
    dc: [HuffmanTable; 2],
    ac: [HuffmanTable; 2],
}

impl CodingTables {
    fn from_reader(reader: &JpegStreamReader<'_>, dc: [TableSlot; 2]) -> Result<Self, JpegppError> {
        let table = |slot: TableSlot| {
            reader
                .huffman_table(slot)
                .cloned()
                .ok_or(JpegppError::MissingTable(slot.name()))
        };
        Ok(Self {
            dc: [table(dc[0])?, table(dc[1])?],
            ac: [
                table(TableSlot::ac(ComponentClass::Luma))?,
                table(TableSlot::ac(ComponentClass::Chroma))?,
            ],
        })
    }

    fn set(&self) -> HuffmanTableSet<'_> {
        HuffmanTableSet {
            dc: [&self.dc[0], &self.dc[1]],
            ac: [&self.ac[0], &self.ac[1]],
        }
    }
}

fn dc_slots(prediction: DcPrediction) -> [TableSlot; 2] {
    let slot = match prediction {
        DcPrediction::Differential => TableSlot::dc,
        DcPrediction::Spatial => TableSlot::predictor_dc,
    };
    [slot(ComponentClass::Luma), slot(ComponentClass::Chroma)]
}

enum InputCoder {
    Huffman(CodingTables),
    Arithmetic(AdaptiveModel),
}

enum OutputCoder {
    Huffman(CodingTables),
    Arithmetic(AdaptiveModel),
    Discard,
}

/// Spatial predictor state of one side: finished blocks per component.
struct SpatialState {
    layout: BlockLayout,
    history: [BlockHistory; 3],
}

impl SpatialState {
    fn new(frame: &FrameInfo) -> Self {
        Self {
            layout: BlockLayout::new(frame.mcus_per_row()),
            history: Default::default(),
        }
    }
}

struct Session<'a> {
    reader: JpegStreamReader<'a>,
    writer: JpegStreamWriter,
    mode: Mode,
    predictor: SpatialPredictor,
}

impl<'a> Session<'a> {
    fn new(source: &'a [u8], mode: Mode) -> Self {
        Self {
            reader: JpegStreamReader::new(source),
            writer: JpegStreamWriter::with_capacity(source.len()),
            mode,
            predictor: SpatialPredictor::new(),
        }
    }

    /// Runs the session and returns the output stream and the number of input bytes consumed.
    fn run(
        mut self,
        tables: OutputTables<'_>,
        mut observer: Option<&mut (dyn SymbolObserver + '_)>,
    ) -> Result<(Vec<u8>, usize), JpegppError> {
        self.reader.read_start_of_image()?;
        self.writer.write_start_of_image();
        let scan_header = self.copy_header()?;

        let frame = self
            .reader
            .frame_info()
            .ok_or(JpegppError::MissingTable("SOF0 frame header"))?;
        let quantization = [self.quantization_table(0)?, self.quantization_table(1)?];

        let input = self.mode.input();
        let output = self.mode.output();
        let mut input_coder = match input.backend {
            EntropyBackend::Huffman => InputCoder::Huffman(CodingTables::from_reader(
                &self.reader,
                dc_slots(input.prediction),
            )?),
            EntropyBackend::Arithmetic => InputCoder::Arithmetic(AdaptiveModel::new()),
        };
        let mut output_coder = match (output.backend, tables) {
            (_, OutputTables::Survey) => OutputCoder::Discard,
            (EntropyBackend::Arithmetic, _) => OutputCoder::Arithmetic(AdaptiveModel::new()),
            (EntropyBackend::Huffman, OutputTables::Predictor(predictor)) => {
                let mut coding =
                    CodingTables::from_reader(&self.reader, dc_slots(DcPrediction::Differential))?;
                coding.dc = predictor.clone();
                let [luma, chroma] = dc_slots(DcPrediction::Spatial);
                self.writer.write_dht(&[(luma, &predictor[0]), (chroma, &predictor[1])]);
                OutputCoder::Huffman(coding)
            }
            (EntropyBackend::Huffman, OutputTables::Stream) => OutputCoder::Huffman(
                CodingTables::from_reader(&self.reader, dc_slots(output.prediction))?,
            ),
        };
        self.writer.write_sos_segment(&scan_header);

        let mut input_spatial = SpatialState::new(&frame);
        let mut output_spatial = SpatialState::new(&frame);

        let mcu_total = frame.mcu_count();
        let interval = match self.reader.restart_interval() {
            0 => mcu_total,
            interval => interval as usize,
        };
        info!(mcu_total, interval, "scan");

        let mut first_mcu = 0;
        let mut segment = 0;
        while first_mcu < mcu_total {
            if segment > 0 {
                self.read_restart_marker(segment - 1)?;
                self.writer.write_restart_marker(segment - 1);
            }
            let mcu_count = interval.min(mcu_total - first_mcu);
            let data = self.reader.remaining_data();
            let (mut scans, consumed) = match &mut input_coder {
                InputCoder::Huffman(tables) => {
                    decode_segment(HuffmanScanDecoder::new(data, tables.set()), mcu_count)?
                }
                InputCoder::Arithmetic(model) => {
                    decode_segment(ArithmeticScanDecoder::new(data, model), mcu_count)?
                }
            };
            self.reader.advance(consumed);

            for component in Component::ALL {
                let table = &quantization[component.class().index()];
                let blocks = scans.component_mut(component);
                let first_index = ComponentScans::first_block_index(component, first_mcu);

                match input.prediction {
                    DcPrediction::Differential => depredict_dc(blocks),
                    DcPrediction::Spatial => self.reconstruct(
                        &mut input_spatial,
                        component,
                        blocks,
                        first_index,
                        table,
                    ),
                }
                dequantize_scan(blocks, table);
                quantize_scan(blocks, table);
                match output.prediction {
                    DcPrediction::Differential => predict_dc(blocks),
                    DcPrediction::Spatial => {
                        self.predict(&mut output_spatial, component, blocks, first_index, table)
                    }
                }
            }

            let bytes = match &mut output_coder {
                OutputCoder::Huffman(tables) => encode_segment(
                    HuffmanScanEncoder::new(tables.set()),
                    &scans,
                    observer.as_deref_mut(),
                )?,
                OutputCoder::Arithmetic(model) => encode_segment(
                    ArithmeticScanEncoder::new(model),
                    &scans,
                    observer.as_deref_mut(),
                )?,
                OutputCoder::Discard => {
                    encode_segment(DiscardingEncoder, &scans, observer.as_deref_mut())?
                }
            };
            debug!(segment, mcu_count, read = consumed, written = bytes.len(), "segment");
            self.writer.write_bytes(&bytes);

            first_mcu += mcu_count;
            segment += 1;
        }

        self.reader.read_end_of_image()?;
        self.writer.write_end_of_image();
        Ok((self.writer.into_inner(), self.reader.position()))
    }

    /// Echoes header segments up to SOS and returns the scan header.
    ///
    /// Predictor tables from the input are never echoed; they are rebuilt
    /// when the output needs them.
    fn copy_header(&mut self) -> Result<ScanHeader, JpegppError> {
        loop {
            match self.reader.read_header_segment()? {
                HeaderSegment::Passthrough { marker, payload } => {
                    info!(?marker, length = payload.len(), "application segment");
                    self.writer.write_segment(marker, payload);
                }
                HeaderSegment::QuantizationTables(tables) => {
                    info!(count = tables.len(), "quantization tables");
                    self.writer.write_dqt(&tables);
                }
                HeaderSegment::Frame(frame) => {
                    info!(width = frame.width, height = frame.height, "image size");
                    self.writer.write_sof0_segment(&frame);
                }
                HeaderSegment::HuffmanTables(tables) => {
                    let kept: Vec<(TableSlot, &HuffmanTable)> = tables
                        .iter()
                        .filter(|(slot, _)| !slot.is_predictor_slot())
                        .map(|(slot, table)| (*slot, table))
                        .collect();
                    info!(count = tables.len(), kept = kept.len(), "Huffman tables");
                    if !kept.is_empty() {
                        self.writer.write_dht(&kept);
                    }
                }
                HeaderSegment::RestartInterval(interval) => {
                    info!(interval, "restart interval");
                    self.writer.write_dri(interval);
                }
                HeaderSegment::StartOfScan(header) => return Ok(header),
            }
        }
    }

    fn quantization_table(&self, id: usize) -> Result<QuantizationTable, JpegppError> {
        self.reader
            .quantization_table(id)
            .copied()
            .ok_or(JpegppError::MissingTable(if id == 0 {
                "quantization table 0"
            } else {
                "quantization table 1"
            }))
    }

    /// Consumes the RSTn marker closing restart interval `index`.
    fn read_restart_marker(&mut self, index: usize) -> Result<(), JpegppError> {
        let expected = (index % JPEG_RESTART_MARKER_RANGE as usize) as u8;
        let marker = self.reader.read_marker()?;
        match marker.restart_index() {
            Some(found) if found == expected => Ok(()),
            Some(found) => Err(JpegppError::RestartMarkerMismatch { expected, found }),
            None => Err(JpegppError::UnexpectedMarker {
                marker,
                context: "between restart intervals",
            }),
        }
    }

    fn reconstruct(
        &self,
        state: &mut SpatialState,
        component: Component,
        blocks: &mut [Block],
        first_index: usize,
        table: &QuantizationTable,
    ) {
        let class = component.class();
        let history = &mut state.history[component.index()];
        self.predictor
            .reconstruct_segment(blocks, first_index, class, &state.layout, history, table);
        history.extend(blocks);
        history.discard_before(state.layout.reach(class, first_index + blocks.len()));
    }

    fn predict(
        &self,
        state: &mut SpatialState,
        component: Component,
        blocks: &mut [Block],
        first_index: usize,
        table: &QuantizationTable,
    ) {
        let class = component.class();
        let history = &mut state.history[component.index()];
        history.extend(blocks);
        self.predictor
            .predict_segment(blocks, first_index, class, &state.layout, history, table);
        history.discard_before(state.layout.reach(class, first_index + blocks.len()));
    }
}

fn decode_segment<D: EntropyDecoder>(
    mut decoder: D,
    mcu_count: usize,
) -> Result<(ComponentScans, usize), JpegppError> {
    let scans = read_scan(&mut decoder, mcu_count)?;
    Ok((scans, decoder.finish()?))
}

fn encode_segment<E: EntropyEncoder>(
    mut encoder: E,
    scans: &ComponentScans,
    observer: Option<&mut (dyn SymbolObserver + '_)>,
) -> Result<Vec<u8>, JpegppError> {
    write_scan(&mut encoder, scans, observer)?;
    encoder.finish()
}
