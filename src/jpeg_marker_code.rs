use num_enum::TryFromPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// SOF0: Marks the start of a baseline DCT frame.
    StartOfFrameBaseline = 0xC0,
    /// SOF1: Marks the start of an extended sequential DCT frame.
    StartOfFrameExtended = 0xC1,
    /// SOF2: Marks the start of a progressive DCT frame.
    StartOfFrameProgressive = 0xC2,
    /// SOF3: Marks the start of a lossless frame.
    StartOfFrameLossless = 0xC3,

    /// DHT: Defines one or more Huffman tables.
    DefineHuffmanTable = 0xC4,

    /// SOF9: Marks the start of an extended sequential arithmetic-coded frame.
    StartOfFrameArithmetic = 0xC9,

    /// RST0..RST7: Restart markers between entropy-coded segments.
    Restart0 = 0xD0,
    Restart1 = 0xD1,
    Restart2 = 0xD2,
    Restart3 = 0xD3,
    Restart4 = 0xD4,
    Restart5 = 0xD5,
    Restart6 = 0xD6,
    Restart7 = 0xD7,

    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,

    /// EOI: Marks the end of an image.
    EndOfImage = 0xD9,

    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,

    /// DQT: Defines one or more quantization tables.
    DefineQuantizationTable = 0xDB,

    /// DNL: Defines the number of lines in a scan.
    DefineNumberOfLines = 0xDC,

    /// DRI: Defines the restart interval used in succeeding scans.
    DefineRestartInterval = 0xDD,

    /// APP0: Application data 0: used for JFIF header.
    ApplicationData0 = 0xE0,
    /// APP1: Application data 1: used for EXIF or XMP header.
    ApplicationData1 = 0xE1,
    /// APP2: Application data 2: used for ICC profile.
    ApplicationData2 = 0xE2,
    /// APP3: Application data 3: used for meta info
    ApplicationData3 = 0xE3,
    /// APP4: Application data 4.
    ApplicationData4 = 0xE4,
    /// APP5: Application data 5.
    ApplicationData5 = 0xE5,
    /// APP6: Application data 6.
    ApplicationData6 = 0xE6,
    /// APP7: Application data 7.
    ApplicationData7 = 0xE7,
    /// APP8: Application data 8.
    ApplicationData8 = 0xE8,
    /// APP9: Application data 9.
    ApplicationData9 = 0xE9,
    /// APP10: Application data 10.
    ApplicationData10 = 0xEA,
    /// APP11: Application data 11.
    ApplicationData11 = 0xEB,
    /// APP12: Application data 12: used for Picture info.
    ApplicationData12 = 0xEC,
    /// APP13: Application data 13: used by PhotoShop IRB
    ApplicationData13 = 0xED,
    /// APP14: Application data 14: used by Adobe
    ApplicationData14 = 0xEE,
    /// APP15: Application data 15.
    ApplicationData15 = 0xEF,

    /// COM: Comment block.
    Comment = 0xFE,
}

impl JpegMarkerCode {
    /// APPn and COM segments, copied through unchanged.
    pub fn is_passthrough_segment(self) -> bool {
        let code = self as u8;
        (0xE0..=0xEF).contains(&code) || self == JpegMarkerCode::Comment
    }

    /// Returns `n` for an RSTn marker.
    pub fn restart_index(self) -> Option<u8> {
        let code = self as u8;
        (JPEG_RESTART_MARKER_BASE..JPEG_RESTART_MARKER_BASE + JPEG_RESTART_MARKER_RANGE)
            .contains(&code)
            .then(|| code - JPEG_RESTART_MARKER_BASE)
    }

    /// The RSTn marker for the `index`-th restart, modulo 8.
    pub fn restart(index: usize) -> Self {
        match index % JPEG_RESTART_MARKER_RANGE as usize {
            0 => JpegMarkerCode::Restart0,
            1 => JpegMarkerCode::Restart1,
            2 => JpegMarkerCode::Restart2,
            3 => JpegMarkerCode::Restart3,
            4 => JpegMarkerCode::Restart4,
            5 => JpegMarkerCode::Restart5,
            6 => JpegMarkerCode::Restart6,
            _ => JpegMarkerCode::Restart7,
        }
    }
}

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
pub const JPEG_RESTART_MARKER_BASE: u8 = 0xD0;
pub const JPEG_RESTART_MARKER_RANGE: u8 = 8;
