//! JPEG codestream reader for the baseline 4:2:0 profile.
//!
//! Recognized header segments are decoded and validated; APPn and COM
//! segments are handed back as raw payloads so they can be copied unchanged.

use tracing::debug;

use crate::FrameInfo;
use crate::constants::{
    BITS_PER_SAMPLE, COMPONENT_COUNT, DQT_DOUBLE_TABLE_LENGTH, DQT_SINGLE_TABLE_LENGTH,
    DRI_SEGMENT_LENGTH, SEGMENT_LENGTH_SIZE, SOF0_CB_COMPONENT, SOF0_CR_COMPONENT,
    SOF0_LUMA_COMPONENT, SOS_CB_SELECTOR, SOS_CR_SELECTOR, SOS_LUMA_SELECTOR,
};
use crate::error::JpegppError;
use crate::jpeg1::huffman::{HuffmanTable, TableSlot};
use crate::jpeg1::quantization::QuantizationTable;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};

/// Size of one table entry inside a DQT segment: the id byte plus 64 values.
const DQT_ENTRY_SIZE: usize = 65;

/// The three bytes following the component selectors of an SOS segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanHeader {
    pub spectral_selection_start: u8,
    pub spectral_selection_end: u8,
    pub successive_approximation: u8,
}

/// One header segment, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderSegment<'a> {
    /// APPn or COM, without its length field.
    Passthrough {
        marker: JpegMarkerCode,
        payload: &'a [u8],
    },
    /// Table ids and zigzag-ordered values, grouped as in the segment.
    QuantizationTables(Vec<(u8, QuantizationTable)>),
    Frame(FrameInfo),
    /// Huffman tables, grouped as in the segment.
    HuffmanTables(Vec<(TableSlot, HuffmanTable)>),
    RestartInterval(u16),
    StartOfScan(ScanHeader),
}

pub struct JpegStreamReader<'a> {
    source: &'a [u8],
    position: usize,
    frame_info: Option<FrameInfo>,
    quantization_tables: [Option<QuantizationTable>; 2],
    huffman_tables: [Option<HuffmanTable>; 6],
    restart_interval: u16,
}

impl<'a> JpegStreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            frame_info: None,
            quantization_tables: [None; 2],
            huffman_tables: [const { None }; 6],
            restart_interval: 0,
        }
    }

    pub fn frame_info(&self) -> Option<FrameInfo> {
        self.frame_info
    }

    pub fn restart_interval(&self) -> u16 {
        self.restart_interval
    }

    pub fn quantization_table(&self, id: usize) -> Option<&QuantizationTable> {
        self.quantization_tables.get(id).and_then(Option::as_ref)
    }

    pub fn huffman_table(&self, slot: TableSlot) -> Option<&HuffmanTable> {
        self.huffman_tables[slot.index()].as_ref()
    }

    pub fn remaining_data(&self) -> &'a [u8] {
        &self.source[self.position..]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn advance(&mut self, count: usize) {
        self.position = (self.position + count).min(self.source.len());
    }

    pub fn read_u8(&mut self) -> Result<u8, JpegppError> {
        let value = *self
            .source
            .get(self.position)
            .ok_or(JpegppError::UnexpectedEndOfData(self.position))?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, JpegppError> {
        let high = self.read_u8()? as u16;
        let low = self.read_u8()? as u16;
        Ok((high << 8) | low)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], JpegppError> {
        let end = self.position + count;
        let bytes = self
            .source
            .get(self.position..end)
            .ok_or(JpegppError::UnexpectedEndOfData(self.source.len()))?;
        self.position = end;
        Ok(bytes)
    }

    /// Returns the marker at the current position without consuming it.
    pub fn peek_marker(&self) -> Result<JpegMarkerCode, JpegppError> {
        match self.source.get(self.position..self.position + 2) {
            Some(&[JPEG_MARKER_START_BYTE, code]) => Ok(JpegMarkerCode::try_from(code)?),
            Some(_) => Err(JpegppError::JpegMarkerStartByteNotFound(self.position)),
            None => Err(JpegppError::UnexpectedEndOfData(self.position)),
        }
    }

    pub fn read_marker(&mut self) -> Result<JpegMarkerCode, JpegppError> {
        let marker = self.peek_marker()?;
        self.position += 2;
        Ok(marker)
    }

    pub fn read_start_of_image(&mut self) -> Result<(), JpegppError> {
        match self.read_marker() {
            Ok(JpegMarkerCode::StartOfImage) => Ok(()),
            _ => Err(JpegppError::StartOfImageMarkerNotFound),
        }
    }

    pub fn read_end_of_image(&mut self) -> Result<(), JpegppError> {
        match self.read_marker() {
            Ok(JpegMarkerCode::EndOfImage) => Ok(()),
            Ok(JpegMarkerCode::StartOfScan) => Err(JpegppError::UnsupportedScan(
                "only a single interleaved scan is supported".to_string(),
            )),
            Ok(marker) => Err(JpegppError::UnexpectedMarker {
                marker,
                context: "after the scan",
            }),
            Err(JpegppError::UnexpectedEndOfData(_)) => Err(JpegppError::EndOfImageMarkerNotFound),
            Err(error) => Err(error),
        }
    }

    /// Reads the next header segment, stopping after SOS.
    pub fn read_header_segment(&mut self) -> Result<HeaderSegment<'a>, JpegppError> {
        let marker = self.read_marker()?;
        match marker {
            JpegMarkerCode::DefineQuantizationTable => {
                Ok(HeaderSegment::QuantizationTables(self.read_dqt_segment()?))
            }
            JpegMarkerCode::StartOfFrameBaseline => {
                Ok(HeaderSegment::Frame(self.read_sof0_segment()?))
            }
            JpegMarkerCode::DefineHuffmanTable => {
                Ok(HeaderSegment::HuffmanTables(self.read_dht_segment()?))
            }
            JpegMarkerCode::DefineRestartInterval => {
                Ok(HeaderSegment::RestartInterval(self.read_dri_segment()?))
            }
            JpegMarkerCode::StartOfScan => Ok(HeaderSegment::StartOfScan(self.read_sos_segment()?)),
            marker if marker.is_passthrough_segment() => Ok(HeaderSegment::Passthrough {
                marker,
                payload: self.read_passthrough_segment()?,
            }),
            JpegMarkerCode::StartOfFrameExtended
            | JpegMarkerCode::StartOfFrameProgressive
            | JpegMarkerCode::StartOfFrameLossless
            | JpegMarkerCode::StartOfFrameArithmetic => Err(JpegppError::UnsupportedFrame(format!(
                "{marker:?} is not a baseline frame"
            ))),
            marker => Err(JpegppError::UnexpectedMarker {
                marker,
                context: "in the header",
            }),
        }
    }

    fn read_segment_length(&mut self, segment: &'static str) -> Result<usize, JpegppError> {
        let size = self.read_u16()?;
        if (size as usize) < SEGMENT_LENGTH_SIZE {
            return Err(JpegppError::InvalidMarkerSegmentSize { segment, size });
        }
        Ok(size as usize - SEGMENT_LENGTH_SIZE)
    }

    pub fn read_passthrough_segment(&mut self) -> Result<&'a [u8], JpegppError> {
        let length = self.read_segment_length("application data")?;
        let payload = self.read_bytes(length)?;
        debug!(
            length = length + SEGMENT_LENGTH_SIZE,
            position = self.position,
            "passthrough segment"
        );
        Ok(payload)
    }

    pub fn read_dqt_segment(&mut self) -> Result<Vec<(u8, QuantizationTable)>, JpegppError> {
        let size = self.read_u16()?;
        if size != DQT_SINGLE_TABLE_LENGTH && size != DQT_DOUBLE_TABLE_LENGTH {
            return Err(JpegppError::InvalidMarkerSegmentSize {
                segment: "DQT",
                size,
            });
        }

        let count = (size as usize - SEGMENT_LENGTH_SIZE) / DQT_ENTRY_SIZE;
        let mut tables = Vec::with_capacity(count);
        for _ in 0..count {
            let pq_tq = self.read_u8()?;
            let precision = pq_tq >> 4;
            let id = pq_tq & 0x0F;
            if precision != 0 {
                return Err(JpegppError::InvalidQuantizationTable(format!(
                    "precision {precision} is not 8-bit"
                )));
            }
            let mut table = [0u8; 64];
            table.copy_from_slice(self.read_bytes(64)?);
            if let Some(zero) = table.iter().position(|&q| q == 0) {
                return Err(JpegppError::InvalidQuantizationTable(format!(
                    "table {id} has a zero entry at {zero}"
                )));
            }
            // Only the low bit selects the table; the id is echoed as written.
            self.quantization_tables[usize::from(id & 0x01)] = Some(table);
            debug!(id, position = self.position, "quantization table");
            tables.push((id, table));
        }
        Ok(tables)
    }

    pub fn read_sof0_segment(&mut self) -> Result<FrameInfo, JpegppError> {
        let length = self.read_segment_length("SOF0")?;
        let bits_per_sample = self.read_u8()?;
        let height = self.read_u16()?;
        let width = self.read_u16()?;
        let component_count = self.read_u8()?;

        if bits_per_sample != BITS_PER_SAMPLE {
            return Err(JpegppError::UnsupportedFrame(format!(
                "{bits_per_sample} bits per sample"
            )));
        }
        if component_count != COMPONENT_COUNT {
            return Err(JpegppError::UnsupportedFrame(format!(
                "{component_count} components"
            )));
        }
        if length != 6 + 3 * COMPONENT_COUNT as usize {
            return Err(JpegppError::InvalidMarkerSegmentSize {
                segment: "SOF0",
                size: (length + SEGMENT_LENGTH_SIZE) as u16,
            });
        }
        if width == 0 || height == 0 {
            return Err(JpegppError::UnsupportedFrame(format!(
                "image size {width}x{height}"
            )));
        }

        let expected = [SOF0_LUMA_COMPONENT, SOF0_CB_COMPONENT, SOF0_CR_COMPONENT];
        for expected in expected {
            let bytes = self.read_bytes(3)?;
            let component = u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]);
            if component != expected {
                return Err(JpegppError::UnsupportedFrame(format!(
                    "component {component:06X}, expected {expected:06X} (4:2:0 YCbCr)"
                )));
            }
        }

        let frame_info = FrameInfo {
            width,
            height,
            bits_per_sample,
            component_count,
        };
        debug!(width, height, position = self.position, "start of frame");
        self.frame_info = Some(frame_info);
        Ok(frame_info)
    }

    pub fn read_dht_segment(&mut self) -> Result<Vec<(TableSlot, HuffmanTable)>, JpegppError> {
        let size = self.read_u16()?;
        let mut remaining = (size as usize)
            .checked_sub(SEGMENT_LENGTH_SIZE)
            .ok_or(JpegppError::InvalidMarkerSegmentSize {
                segment: "DHT",
                size,
            })?;

        let mut tables = Vec::new();
        while remaining > 0 {
            if remaining < 17 {
                return Err(JpegppError::InvalidMarkerSegmentSize {
                    segment: "DHT",
                    size,
                });
            }
            let tc_th = self.read_u8()?;
            let slot = TableSlot::from_class_and_id(tc_th >> 4, tc_th & 0x0F)?;

            let mut lengths = [0u8; 16];
            lengths.copy_from_slice(self.read_bytes(16)?);
            let count: usize = lengths.iter().map(|&n| n as usize).sum();
            remaining -= 17;
            if remaining < count {
                return Err(JpegppError::InvalidMarkerSegmentSize {
                    segment: "DHT",
                    size,
                });
            }
            let values = self.read_bytes(count)?;
            remaining -= count;

            let table = HuffmanTable::build_from_dht(&lengths, values)?;
            debug!(%slot, symbols = count, position = self.position, "Huffman table");
            self.huffman_tables[slot.index()] = Some(table.clone());
            tables.push((slot, table));
        }
        Ok(tables)
    }

    pub fn read_dri_segment(&mut self) -> Result<u16, JpegppError> {
        let size = self.read_u16()?;
        if size != DRI_SEGMENT_LENGTH {
            return Err(JpegppError::InvalidMarkerSegmentSize {
                segment: "DRI",
                size,
            });
        }
        self.restart_interval = self.read_u16()?;
        debug!(interval = self.restart_interval, "restart interval");
        Ok(self.restart_interval)
    }

    pub fn read_sos_segment(&mut self) -> Result<ScanHeader, JpegppError> {
        let length = self.read_segment_length("SOS")?;
        let component_count = self.read_u8()?;
        if component_count != COMPONENT_COUNT {
            return Err(JpegppError::UnsupportedScan(format!(
                "{component_count} components in scan"
            )));
        }
        if length != 4 + 2 * COMPONENT_COUNT as usize {
            return Err(JpegppError::InvalidMarkerSegmentSize {
                segment: "SOS",
                size: (length + SEGMENT_LENGTH_SIZE) as u16,
            });
        }

        for expected in [SOS_LUMA_SELECTOR, SOS_CB_SELECTOR, SOS_CR_SELECTOR] {
            let selector = self.read_u16()?;
            if selector != expected {
                return Err(JpegppError::UnsupportedScan(format!(
                    "component selector {selector:04X}, expected {expected:04X}"
                )));
            }
        }

        let header = ScanHeader {
            spectral_selection_start: self.read_u8()?,
            spectral_selection_end: self.read_u8()?,
            successive_approximation: self.read_u8()?,
        };
        debug!(position = self.position, "start of scan");
        Ok(header)
    }
}
