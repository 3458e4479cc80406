//! In-memory baseline 4:2:0 JPEG files built from smooth synthetic images.

use jpegpp_rs::FrameInfo;
use jpegpp_rs::constants::SPECTRAL_SELECTION_END;
use jpegpp_rs::jpeg1::component::{Block, ComponentScans};
use jpegpp_rs::jpeg1::dct::fdct_8x8;
use jpegpp_rs::jpeg1::huffman::{HuffmanTable, HuffmanTableSet, TableSlot};
use jpegpp_rs::jpeg1::quantization::{
    STD_CHROMINANCE_QUANT_TABLE, STD_LUMINANCE_QUANT_TABLE, get_scaled_quant_table, predict_dc,
    to_zigzag_table,
};
use jpegpp_rs::jpeg1::scan_encoder::{EntropyEncoder, HuffmanScanEncoder, write_scan};
use jpegpp_rs::jpeg1::zigzag::to_zigzag;
use jpegpp_rs::jpeg_marker_code::JpegMarkerCode;
use jpegpp_rs::jpeg_stream_reader::ScanHeader;
use jpegpp_rs::jpeg_stream_writer::JpegStreamWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy)]
pub struct SyntheticOptions {
    pub width: u16,
    pub height: u16,
    pub restart_interval: u16,
    pub quality: u32,
    pub seed: u64,
    /// Adds a JFIF APP0 and a COM segment.
    pub metadata: bool,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            width: 48,
            height: 32,
            restart_interval: 0,
            quality: 75,
            seed: 1,
            metadata: true,
        }
    }
}

pub struct SyntheticJpeg {
    pub data: Vec<u8>,
    pub frame: FrameInfo,
    /// Absolute quantized coefficients of the whole image.
    pub blocks: ComponentScans,
}

fn sample(plane: usize, x: usize, y: usize, noise: f32) -> f32 {
    let (x, y) = (x as f32, y as f32);
    let value = match plane {
        0 => 128.0 + 70.0 * (x / 11.0).sin() + 35.0 * (y / 7.0).cos() + 0.8 * x - 0.5 * y,
        1 => 120.0 + 30.0 * ((x + y) / 9.0).sin(),
        _ => 136.0 - 25.0 * (x / 6.0).cos() + 0.6 * y,
    };
    (value + noise).clamp(0.0, 255.0)
}

fn encode_block(
    rng: &mut StdRng,
    plane: usize,
    origin_x: usize,
    origin_y: usize,
    natural_table: &[u8; 64],
) -> Block {
    let mut samples = [0f32; 64];
    for row in 0..8 {
        for column in 0..8 {
            let noise = rng.random_range(-6.0..6.0);
            let value = sample(plane, origin_x + column, origin_y + row, noise);
            samples[row * 8 + column] = value - 128.0;
        }
    }
    let mut coefficients = [0f32; 64];
    fdct_8x8(&samples, &mut coefficients);

    let mut natural = [0i32; 64];
    for (i, value) in natural.iter_mut().enumerate() {
        *value = (coefficients[i] / f32::from(natural_table[i])).round() as i32;
    }
    to_zigzag(&natural)
}

pub fn standard_tables() -> [HuffmanTable; 4] {
    [
        HuffmanTable::standard_luminance_dc(),
        HuffmanTable::standard_chrominance_dc(),
        HuffmanTable::standard_luminance_ac(),
        HuffmanTable::standard_chrominance_ac(),
    ]
}

fn slice_segment(blocks: &ComponentScans, first_mcu: usize, mcu_count: usize) -> ComponentScans {
    ComponentScans {
        y: blocks.y[first_mcu * 4..(first_mcu + mcu_count) * 4].to_vec(),
        cb: blocks.cb[first_mcu..first_mcu + mcu_count].to_vec(),
        cr: blocks.cr[first_mcu..first_mcu + mcu_count].to_vec(),
    }
}

pub fn build(options: SyntheticOptions) -> SyntheticJpeg {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let frame = FrameInfo {
        width: options.width,
        height: options.height,
        bits_per_sample: 8,
        component_count: 3,
    };
    let luma_table = get_scaled_quant_table(&STD_LUMINANCE_QUANT_TABLE, options.quality);
    let chroma_table = get_scaled_quant_table(&STD_CHROMINANCE_QUANT_TABLE, options.quality);

    let mut blocks = ComponentScans::with_capacity(frame.mcu_count());
    for mcu_row in 0..frame.mcu_rows() {
        for mcu_column in 0..frame.mcus_per_row() {
            for (dx, dy) in [(0, 0), (8, 0), (0, 8), (8, 8)] {
                let (x, y) = (mcu_column * 16 + dx, mcu_row * 16 + dy);
                blocks.y.push(encode_block(&mut rng, 0, x, y, &luma_table));
            }
            blocks.cb.push(encode_block(&mut rng, 1, mcu_column * 8, mcu_row * 8, &chroma_table));
            blocks.cr.push(encode_block(&mut rng, 2, mcu_column * 8, mcu_row * 8, &chroma_table));
        }
    }

    let tables = standard_tables();
    let set = HuffmanTableSet {
        dc: [&tables[0], &tables[1]],
        ac: [&tables[2], &tables[3]],
    };

    let mut writer = JpegStreamWriter::new();
    writer.write_start_of_image();
    if options.metadata {
        writer.write_segment(
            JpegMarkerCode::ApplicationData0,
            &[b'J', b'F', b'I', b'F', 0, 1, 1, 0, 0, 1, 0, 1, 0, 0],
        );
    }
    writer.write_dqt(&[(0, to_zigzag_table(&luma_table)), (1, to_zigzag_table(&chroma_table))]);
    writer.write_sof0_segment(&frame);
    writer.write_dht(&[
        (TableSlot::Dc0, &tables[0]),
        (TableSlot::Ac0, &tables[2]),
        (TableSlot::Dc1, &tables[1]),
        (TableSlot::Ac1, &tables[3]),
    ]);
    if options.restart_interval > 0 {
        writer.write_dri(options.restart_interval);
    }
    if options.metadata {
        writer.write_segment(JpegMarkerCode::Comment, b"synthetic");
    }
    writer.write_sos_segment(&ScanHeader {
        spectral_selection_start: 0,
        spectral_selection_end: SPECTRAL_SELECTION_END,
        successive_approximation: 0,
    });

    let total = frame.mcu_count();
    let interval = match options.restart_interval {
        0 => total,
        interval => interval as usize,
    };
    let mut first_mcu = 0;
    let mut segment = 0;
    while first_mcu < total {
        if segment > 0 {
            writer.write_restart_marker(segment - 1);
        }
        let count = interval.min(total - first_mcu);
        let mut scans = slice_segment(&blocks, first_mcu, count);
        predict_dc(&mut scans.y);
        predict_dc(&mut scans.cb);
        predict_dc(&mut scans.cr);

        let mut encoder = HuffmanScanEncoder::new(set);
        write_scan(&mut encoder, &scans, None).expect("synthetic scan fits the standard tables");
        writer.write_bytes(&encoder.finish().expect("Huffman segment"));

        first_mcu += count;
        segment += 1;
    }
    writer.write_end_of_image();

    SyntheticJpeg {
        data: writer.into_inner(),
        frame,
        blocks,
    }
}

/// Offset of the first `0xFF code` pair at or after `from`.
pub fn find_marker(data: &[u8], code: u8, from: usize) -> Option<usize> {
    data[from..]
        .windows(2)
        .position(|pair| pair == [0xFF, code])
        .map(|offset| from + offset)
}
