pub const SEGMENT_LENGTH_SIZE: usize = 2;

/// Baseline frames carry exactly three components (Y, Cb, Cr).
pub const COMPONENT_COUNT: u8 = 3;
pub const BITS_PER_SAMPLE: u8 = 8;

/// SOF0 component triples (id, sampling factors, quantization table) for 4:2:0.
pub const SOF0_LUMA_COMPONENT: u32 = 0x01_22_00;
pub const SOF0_CB_COMPONENT: u32 = 0x02_11_01;
pub const SOF0_CR_COMPONENT: u32 = 0x03_11_01;

/// SOS component selector pairs (id, DC/AC table ids).
pub const SOS_LUMA_SELECTOR: u16 = 0x01_00;
pub const SOS_CB_SELECTOR: u16 = 0x02_11;
pub const SOS_CR_SELECTOR: u16 = 0x03_11;

pub const SPECTRAL_SELECTION_END: u8 = 63;

pub const DQT_SINGLE_TABLE_LENGTH: u16 = 67;
pub const DQT_DOUBLE_TABLE_LENGTH: u16 = 132;
pub const DRI_SEGMENT_LENGTH: u16 = 4;

pub const MCU_SIZE: usize = 16;
pub const LUMA_BLOCKS_PER_MCU: usize = 4;

pub const MAX_HUFFMAN_CODE_LENGTH: usize = 16;
pub const MAX_DC_CATEGORY: u8 = 11;
pub const MAX_AC_CATEGORY: u8 = 10;

pub const END_OF_BLOCK: u8 = 0x00;
pub const MAX_ZERO_RUN: u8 = 15;
