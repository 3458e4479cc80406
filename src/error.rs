use crate::jpeg_marker_code::JpegMarkerCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JpegppError {
    #[error("Start of image marker not found")]
    StartOfImageMarkerNotFound,
    #[error("End of image marker not found")]
    EndOfImageMarkerNotFound,
    #[error("JPEG marker start byte not found at offset {0}")]
    JpegMarkerStartByteNotFound(usize),
    #[error("Unknown JPEG marker 0xFF{0:02X}")]
    UnknownJpegMarker(u8),
    #[error("Unexpected {marker:?} marker {context}")]
    UnexpectedMarker {
        marker: JpegMarkerCode,
        context: &'static str,
    },
    #[error("Invalid {segment} marker segment size {size}")]
    InvalidMarkerSegmentSize { segment: &'static str, size: u16 },
    #[error("Unexpected end of data at offset {0}")]
    UnexpectedEndOfData(usize),
    #[error("Unsupported frame: {0}")]
    UnsupportedFrame(String),
    #[error("Unsupported scan: {0}")]
    UnsupportedScan(String),
    #[error("Invalid quantization table: {0}")]
    InvalidQuantizationTable(String),
    #[error("Invalid Huffman table: {0}")]
    InvalidHuffmanTable(String),
    #[error("Huffman table class {class} id {id} not supported")]
    UnsupportedHuffmanTableId { class: u8, id: u8 },
    #[error("Missing {0}")]
    MissingTable(&'static str),
    #[error("Expected restart marker RST{expected}, found RST{found}")]
    RestartMarkerMismatch { expected: u8, found: u8 },
    #[error("No Huffman code matches the scan data at offset {0}")]
    HuffmanCodeNotFound(usize),
    #[error("Scan data ended inside a code at offset {0}")]
    UnexpectedEndOfScan(usize),
    #[error("Unconsumed scan data at offset {0}")]
    TrailingScanData(usize),
    #[error("Symbol {0:#04x} has no code in the Huffman table")]
    SymbolNotInTable(u8),
    #[error("Value {value} exceeds magnitude category {max_category}")]
    ValueOutOfRange { value: i32, max_category: u8 },
    #[error("Invalid run length at coefficient {0}")]
    InvalidRunLength(usize),
    #[error("Arithmetic symbol {0} out of range")]
    ArithmeticSymbolOutOfRange(u32),
    #[error("Arithmetic frequency table total {0} is too large")]
    FrequencyTableOverflow(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<num_enum::TryFromPrimitiveError<JpegMarkerCode>> for JpegppError {
    fn from(error: num_enum::TryFromPrimitiveError<JpegMarkerCode>) -> Self {
        JpegppError::UnknownJpegMarker(error.number)
    }
}
