//! Block containers for the interleaved 4:2:0 scan.

use crate::constants::LUMA_BLOCKS_PER_MCU;

/// 64 quantized coefficients in zigzag order.
pub type Block = [i32; 64];

/// Selects the Huffman slots and quantization table of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentClass {
    Luma,
    Chroma,
}

impl ComponentClass {
    pub fn index(self) -> usize {
        match self {
            ComponentClass::Luma => 0,
            ComponentClass::Chroma => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Y,
    Cb,
    Cr,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Y, Component::Cb, Component::Cr];

    pub fn class(self) -> ComponentClass {
        match self {
            Component::Y => ComponentClass::Luma,
            Component::Cb | Component::Cr => ComponentClass::Chroma,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Block order inside one MCU: TL, TR, BL, BR luma, then Cb and Cr.
pub const MCU_LAYOUT: [Component; 6] = [
    Component::Y,
    Component::Y,
    Component::Y,
    Component::Y,
    Component::Cb,
    Component::Cr,
];

/// The blocks of one restart segment, split by component.
///
/// `y` holds four blocks per MCU, `cb` and `cr` one each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentScans {
    pub y: Vec<Block>,
    pub cb: Vec<Block>,
    pub cr: Vec<Block>,
}

impl ComponentScans {
    pub fn with_capacity(mcu_count: usize) -> Self {
        Self {
            y: Vec::with_capacity(mcu_count * LUMA_BLOCKS_PER_MCU),
            cb: Vec::with_capacity(mcu_count),
            cr: Vec::with_capacity(mcu_count),
        }
    }

    pub fn component_mut(&mut self, component: Component) -> &mut Vec<Block> {
        match component {
            Component::Y => &mut self.y,
            Component::Cb => &mut self.cb,
            Component::Cr => &mut self.cr,
        }
    }

    pub fn mcu_count(&self) -> usize {
        self.cb.len()
    }

    pub fn is_consistent(&self) -> bool {
        self.y.len() == self.cb.len() * LUMA_BLOCKS_PER_MCU && self.cb.len() == self.cr.len()
    }

    /// Global index of the first block of `component` in a segment starting at `first_mcu`.
    pub fn first_block_index(component: Component, first_mcu: usize) -> usize {
        match component {
            Component::Y => first_mcu * LUMA_BLOCKS_PER_MCU,
            Component::Cb | Component::Cr => first_mcu,
        }
    }
}
