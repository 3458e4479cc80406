mod support;

use jpegpp_rs::jpeg1::component::ComponentClass;
use jpegpp_rs::jpeg1::huffman::TableSlot;
use jpegpp_rs::jpeg1::statistics::CoefficientKind;
use jpegpp_rs::jpeg_marker_code::JpegMarkerCode;
use jpegpp_rs::{JpegppError, Mode, RecompressOptions, inspect, recompress};
use support::synthetic::{SyntheticOptions, build, find_marker};
use test_log::test;

fn run(data: &[u8], mode: Mode) -> Result<Vec<u8>, JpegppError> {
    let options = RecompressOptions {
        mode,
        collect_statistics: false,
    };
    Ok(recompress(data, &options)?.data)
}

fn round_trip(data: &[u8], encode: Mode, decode: Mode) -> Vec<u8> {
    let encoded = run(data, encode).expect("encode");
    run(&encoded, decode).expect("decode")
}

fn variants() -> Vec<SyntheticOptions> {
    let base = SyntheticOptions::default();
    vec![
        base,
        SyntheticOptions { width: 16, height: 16, ..base },
        SyntheticOptions { width: 40, height: 24, seed: 2, metadata: false, ..base },
        SyntheticOptions { width: 64, height: 48, restart_interval: 4, seed: 3, ..base },
        SyntheticOptions {
            width: 48,
            height: 48,
            restart_interval: 1,
            quality: 90,
            seed: 4,
            ..base
        },
        SyntheticOptions {
            width: 80,
            height: 32,
            restart_interval: 3,
            quality: 50,
            seed: 5,
            ..base
        },
    ]
}

#[test]
fn test_passthrough_is_byte_exact() {
    for options in variants() {
        let image = build(options);
        let output = recompress(&image.data, &RecompressOptions::default()).expect("passthrough");
        assert_eq!(output.data, image.data, "{options:?}");
        assert_eq!(output.bytes_read, image.data.len());
        assert_eq!(output.bytes_written, image.data.len());
    }
}

#[test]
fn test_passthrough_is_a_fixed_point_on_a_single_mcu() {
    let image = build(SyntheticOptions { width: 16, height: 16, ..Default::default() });
    let once = run(&image.data, Mode::Passthrough).expect("first pass");
    let twice = run(&once, Mode::Passthrough).expect("second pass");
    assert_eq!(once, image.data);
    assert_eq!(twice, once);
}

#[test]
fn test_pied_piper_round_trip() {
    for options in variants() {
        let image = build(options);
        let restored = round_trip(&image.data, Mode::PiedPiperEncode, Mode::PiedPiperDecode);
        assert_eq!(restored, image.data, "{options:?}");
    }
}

#[test]
fn test_arithmetic_round_trip() {
    for options in variants() {
        let image = build(options);
        let restored = round_trip(&image.data, Mode::ArithmeticEncode, Mode::ArithmeticDecode);
        assert_eq!(restored, image.data, "{options:?}");
    }
}

#[test]
fn test_pied_piper_writes_predictor_tables() {
    let image = build(SyntheticOptions { restart_interval: 2, ..Default::default() });
    let encoded = run(&image.data, Mode::PiedPiperEncode).expect("encode");

    let summary = inspect(&encoded).expect("summary");
    assert!(summary.huffman_tables.contains(&TableSlot::DcA));
    assert!(summary.huffman_tables.contains(&TableSlot::DcB));
    assert_eq!(summary.restart_interval, 2);

    let decoded = run(&encoded, Mode::PiedPiperDecode).expect("decode");
    let summary = inspect(&decoded).expect("summary");
    assert!(!summary.huffman_tables.iter().any(|slot| slot.is_predictor_slot()));
}

#[test]
fn test_pied_piper_encode_is_deterministic() {
    let image = build(SyntheticOptions { width: 64, height: 64, seed: 9, ..Default::default() });
    let first = run(&image.data, Mode::PiedPiperEncode).expect("encode");
    let second = run(&image.data, Mode::PiedPiperEncode).expect("encode");
    assert_eq!(first, second);
}

#[test]
fn test_statistics_count_every_symbol() {
    let image = build(SyntheticOptions::default());
    let options = RecompressOptions {
        mode: Mode::Passthrough,
        collect_statistics: true,
    };
    let output = recompress(&image.data, &options).expect("recompress");
    let statistics = output.statistics.expect("statistics requested");

    let mcus = image.frame.mcu_count() as u64;
    assert_eq!(statistics.symbol_count(CoefficientKind::Dc, ComponentClass::Luma), 4 * mcus);
    assert_eq!(statistics.symbol_count(CoefficientKind::Dc, ComponentClass::Chroma), 2 * mcus);
    assert!(statistics.symbol_count(CoefficientKind::Ac, ComponentClass::Luma) > 0);
    assert!(statistics.value_entropy(CoefficientKind::Dc, ComponentClass::Luma) > 0.0);

    let without = recompress(&image.data, &RecompressOptions::default()).expect("recompress");
    assert!(without.statistics.is_none());
}

#[test]
fn test_inspect_summary() {
    let image = build(SyntheticOptions {
        width: 40,
        height: 24,
        restart_interval: 5,
        ..Default::default()
    });
    let summary = inspect(&image.data).expect("summary");
    assert_eq!(summary.frame, image.frame);
    assert_eq!(summary.frame.mcu_count(), 6);
    assert_eq!(summary.restart_interval, 5);
    assert_eq!(summary.quantization_tables, vec![0, 1]);
    assert_eq!(
        summary.huffman_tables,
        vec![TableSlot::Dc0, TableSlot::Ac0, TableSlot::Dc1, TableSlot::Ac1]
    );
    assert_eq!(
        summary.passthrough_segments,
        vec![(JpegMarkerCode::ApplicationData0, 14), (JpegMarkerCode::Comment, 9)]
    );
    assert!(summary.scan_offset < image.data.len());
}

#[test]
fn test_missing_start_of_image() {
    let image = build(SyntheticOptions::default());
    let result = run(&image.data[2..], Mode::Passthrough);
    assert!(matches!(result, Err(JpegppError::StartOfImageMarkerNotFound)));
}

#[test]
fn test_non_420_sampling_is_rejected() {
    let mut data = build(SyntheticOptions::default()).data;
    let sof0 = find_marker(&data, 0xC0, 0).expect("SOF0");
    // Luma sampling factors: marker(2) + length(2) + precision(1) + size(4) + count(1) + id(1).
    assert_eq!(data[sof0 + 11], 0x22);
    data[sof0 + 11] = 0x11;
    assert!(matches!(run(&data, Mode::Passthrough), Err(JpegppError::UnsupportedFrame(_))));
}

#[test]
fn test_restart_markers_out_of_order() {
    let mut data = build(SyntheticOptions { restart_interval: 2, ..Default::default() }).data;
    let scan = find_marker(&data, 0xDA, 0).expect("SOS");
    let rst1 = find_marker(&data, 0xD1, scan).expect("RST1");
    data[rst1 + 1] = 0xD5;
    assert!(matches!(
        run(&data, Mode::Passthrough),
        Err(JpegppError::RestartMarkerMismatch { expected: 1, found: 5 })
    ));
}

#[test]
fn test_second_scan_is_rejected() {
    let mut data = build(SyntheticOptions::default()).data;
    let sos = find_marker(&data, 0xDA, 0).expect("SOS");
    let header = data[sos..sos + 14].to_vec();
    let eoi = data.len() - 2;
    data.splice(eoi..eoi, header);
    assert!(matches!(run(&data, Mode::Passthrough), Err(JpegppError::UnsupportedScan(_))));
}

#[test]
fn test_truncated_scan_is_rejected() {
    let data = build(SyntheticOptions::default()).data;
    let truncated = &data[..data.len() - 12];
    assert!(run(truncated, Mode::Passthrough).is_err());
}

#[test]
fn test_missing_end_of_image() {
    let data = build(SyntheticOptions::default()).data;
    let result = run(&data[..data.len() - 2], Mode::Passthrough);
    assert!(matches!(result, Err(JpegppError::EndOfImageMarkerNotFound)));
}

#[test]
fn test_baseline_input_cannot_be_pied_piper_decoded() {
    let data = build(SyntheticOptions::default()).data;
    assert!(matches!(
        run(&data, Mode::PiedPiperDecode),
        Err(JpegppError::MissingTable("DCa"))
    ));
}
