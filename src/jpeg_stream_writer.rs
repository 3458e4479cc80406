//! JPEG codestream writer.
//!
//! Emits markers and header segments into an owned buffer; entropy-coded
//! segments arrive already stuffed and are appended as is.

use crate::FrameInfo;
use crate::constants::{
    COMPONENT_COUNT, DRI_SEGMENT_LENGTH, SEGMENT_LENGTH_SIZE, SOF0_CB_COMPONENT,
    SOF0_CR_COMPONENT, SOF0_LUMA_COMPONENT, SOS_CB_SELECTOR, SOS_CR_SELECTOR, SOS_LUMA_SELECTOR,
};
use crate::jpeg1::huffman::{HuffmanTable, TableSlot};
use crate::jpeg1::quantization::QuantizationTable;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::jpeg_stream_reader::ScanHeader;

#[derive(Debug, Default)]
pub struct JpegStreamWriter {
    destination: Vec<u8>,
}

impl JpegStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            destination: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destination.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.destination
    }

    pub fn write_byte(&mut self, value: u8) {
        self.destination.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.destination.extend_from_slice(bytes);
    }

    pub fn write_marker(&mut self, marker: JpegMarkerCode) {
        self.write_byte(JPEG_MARKER_START_BYTE);
        self.write_byte(marker as u8);
    }

    pub fn write_start_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::StartOfImage)
    }

    pub fn write_end_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::EndOfImage)
    }

    fn write_segment_header(&mut self, marker: JpegMarkerCode, payload_length: usize) {
        self.write_marker(marker);
        self.write_u16((payload_length + SEGMENT_LENGTH_SIZE) as u16);
    }

    /// Writes an APPn or COM segment around `payload`.
    pub fn write_segment(&mut self, marker: JpegMarkerCode, payload: &[u8]) {
        self.write_segment_header(marker, payload.len());
        self.write_bytes(payload);
    }

    /// Writes one DQT segment holding every table in `tables`.
    pub fn write_dqt(&mut self, tables: &[(u8, QuantizationTable)]) {
        self.write_segment_header(JpegMarkerCode::DefineQuantizationTable, tables.len() * 65);
        for (id, table) in tables {
            self.write_byte(id & 0x0F); // Precision 0 (8-bit), ID
            self.write_bytes(table);
        }
    }

    /// Writes one DHT segment holding every table in `tables`.
    pub fn write_dht(&mut self, tables: &[(TableSlot, &HuffmanTable)]) {
        let length: usize = tables.iter().map(|(_, table)| 17 + table.values().len()).sum();
        self.write_segment_header(JpegMarkerCode::DefineHuffmanTable, length);
        for (slot, table) in tables {
            self.write_byte((slot.class() << 4) | slot.id());
            self.write_bytes(table.lengths());
            self.write_bytes(table.values());
        }
    }

    pub fn write_sof0_segment(&mut self, frame_info: &FrameInfo) {
        self.write_segment_header(
            JpegMarkerCode::StartOfFrameBaseline,
            6 + 3 * COMPONENT_COUNT as usize,
        );
        self.write_byte(frame_info.bits_per_sample);
        self.write_u16(frame_info.height);
        self.write_u16(frame_info.width);
        self.write_byte(COMPONENT_COUNT);
        for component in [SOF0_LUMA_COMPONENT, SOF0_CB_COMPONENT, SOF0_CR_COMPONENT] {
            self.write_bytes(&component.to_be_bytes()[1..]);
        }
    }

    pub fn write_dri(&mut self, restart_interval: u16) {
        self.write_marker(JpegMarkerCode::DefineRestartInterval);
        self.write_u16(DRI_SEGMENT_LENGTH);
        self.write_u16(restart_interval);
    }

    pub fn write_sos_segment(&mut self, header: &ScanHeader) {
        self.write_segment_header(JpegMarkerCode::StartOfScan, 4 + 2 * COMPONENT_COUNT as usize);
        self.write_byte(COMPONENT_COUNT);
        for selector in [SOS_LUMA_SELECTOR, SOS_CB_SELECTOR, SOS_CR_SELECTOR] {
            self.write_u16(selector);
        }
        self.write_byte(header.spectral_selection_start);
        self.write_byte(header.spectral_selection_end);
        self.write_byte(header.successive_approximation);
    }

    /// Writes RSTn for the `index`-th restart (modulo 8).
    pub fn write_restart_marker(&mut self, index: usize) {
        self.write_marker(JpegMarkerCode::restart(index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg_stream_reader::{HeaderSegment, JpegStreamReader};
    use test_log::test;

    #[test]
    fn test_markers() {
        let mut writer = JpegStreamWriter::new();
        assert!(writer.is_empty());
        writer.write_start_of_image();
        writer.write_restart_marker(9);
        writer.write_end_of_image();
        assert_eq!(writer.into_inner(), vec![0xFF, 0xD8, 0xFF, 0xD1, 0xFF, 0xD9]);
    }

    #[test]
    fn test_sof0_sos_layout() {
        let frame = FrameInfo {
            width: 0x0140,
            height: 0x00F0,
            bits_per_sample: 8,
            component_count: 3,
        };
        let mut writer = JpegStreamWriter::new();
        writer.write_sof0_segment(&frame);
        writer.write_sos_segment(&ScanHeader {
            spectral_selection_start: 0,
            spectral_selection_end: 63,
            successive_approximation: 0,
        });
        assert_eq!(
            writer.into_inner(),
            vec![
                0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0xF0, 0x01, 0x40, 0x03, 0x01, 0x22, 0x00, 0x02,
                0x11, 0x01, 0x03, 0x11, 0x01, //
                0xFF, 0xDA, 0x00, 0x0C, 0x03, 0x01, 0x00, 0x02, 0x11, 0x03, 0x11, 0x00, 0x3F, 0x00,
            ]
        );
    }

    #[test]
    fn test_header_segments_read_back() {
        let luma = HuffmanTable::standard_luminance_dc();
        let chroma = HuffmanTable::standard_chrominance_ac();
        let quantization = [(0u8, [3u8; 64]), (1u8, [5u8; 64])];

        let mut writer = JpegStreamWriter::new();
        writer.write_dqt(&quantization);
        writer.write_dht(&[(TableSlot::DcB, &luma), (TableSlot::Ac1, &chroma)]);
        writer.write_dri(4);
        writer.write_segment(JpegMarkerCode::Comment, b"note");
        let bytes = writer.into_inner();

        let mut reader = JpegStreamReader::new(&bytes);
        assert_eq!(
            reader.read_header_segment().expect("DQT"),
            HeaderSegment::QuantizationTables(quantization.to_vec())
        );
        assert_eq!(
            reader.read_header_segment().expect("DHT"),
            HeaderSegment::HuffmanTables(vec![(TableSlot::DcB, luma), (TableSlot::Ac1, chroma)])
        );
        assert_eq!(reader.read_header_segment().expect("DRI"), HeaderSegment::RestartInterval(4));
        assert_eq!(
            reader.read_header_segment().expect("COM"),
            HeaderSegment::Passthrough {
                marker: JpegMarkerCode::Comment,
                payload: b"note",
            }
        );
        assert!(reader.remaining_data().is_empty());
    }
}
