//! Spatial DC prediction.
//!
//! A block's DC is estimated from its already-coded left and upper
//! neighbours: the AC-only boundary of the current block is compared with the
//! facing boundary of each neighbour, and the step between them is folded into
//! the neighbour's DC. The per-sample estimates are trimmed and averaged.

use crate::constants::LUMA_BLOCKS_PER_MCU;
use crate::jpeg1::component::{Block, ComponentClass};
use crate::jpeg1::dct::{BLOCK_SIZE, Edge, EdgeBasis};
use crate::jpeg1::quantization::{QuantizationTable, dequantize_block};
use crate::jpeg1::zigzag::to_natural;

/// Estimates dropped from each end, per contributing edge.
const TRIM_PER_EDGE: usize = 3;

/// A DC step of 1 moves every reconstructed sample by 1/8.
const DC_SCALE: f64 = BLOCK_SIZE as f64;

/// Dequantized DC range of 8-bit level-shifted samples.
const MIN_DC_ESTIMATE: f64 = -1024.0;
const MAX_DC_ESTIMATE: f64 = 1016.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub left: Option<usize>,
    pub above: Option<usize>,
}

/// Maps global block indices to their left and upper neighbours.
///
/// Luma blocks are numbered `mcu * 4 + s` with `s` in TL, TR, BL, BR order.
/// Chroma blocks are numbered by MCU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    mcus_per_row: usize,
}

impl BlockLayout {
    pub fn new(mcus_per_row: usize) -> Self {
        Self {
            mcus_per_row: mcus_per_row.max(1),
        }
    }

    pub fn mcus_per_row(&self) -> usize {
        self.mcus_per_row
    }

    pub fn neighbors(&self, class: ComponentClass, index: usize) -> Neighbors {
        match class {
            ComponentClass::Luma => self.luma_neighbors(index),
            ComponentClass::Chroma => self.chroma_neighbors(index),
        }
    }

    fn luma_neighbors(&self, index: usize) -> Neighbors {
        let width = self.mcus_per_row;
        let mcu = index / LUMA_BLOCKS_PER_MCU;
        let sub = index % LUMA_BLOCKS_PER_MCU;
        let has_left_mcu = mcu % width > 0;
        let has_upper_mcu = mcu >= width;

        let left = match sub {
            1 | 3 => Some(index - 1),
            0 if has_left_mcu => Some((mcu - 1) * LUMA_BLOCKS_PER_MCU + 1),
            2 if has_left_mcu => Some((mcu - 1) * LUMA_BLOCKS_PER_MCU + 3),
            _ => None,
        };
        let above = match sub {
            2 | 3 => Some(index - 2),
            0 if has_upper_mcu => Some((mcu - width) * LUMA_BLOCKS_PER_MCU + 2),
            1 if has_upper_mcu => Some((mcu - width) * LUMA_BLOCKS_PER_MCU + 3),
            _ => None,
        };
        Neighbors { left, above }
    }

    fn chroma_neighbors(&self, index: usize) -> Neighbors {
        let width = self.mcus_per_row;
        Neighbors {
            left: (index % width > 0).then(|| index - 1),
            above: (index >= width).then(|| index - width),
        }
    }

    /// Lowest global index a segment starting at `first_index` can reference.
    pub fn reach(&self, class: ComponentClass, first_index: usize) -> usize {
        let span = match class {
            ComponentClass::Luma => self.mcus_per_row * LUMA_BLOCKS_PER_MCU,
            ComponentClass::Chroma => self.mcus_per_row,
        };
        first_index.saturating_sub(span)
    }
}

/// Final quantized blocks of earlier segments, kept for cross-segment neighbours.
#[derive(Debug, Clone, Default)]
pub struct BlockHistory {
    base: usize,
    blocks: Vec<Block>,
}

impl BlockHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        index
            .checked_sub(self.base)
            .and_then(|offset| self.blocks.get(offset))
    }

    /// Global index one past the last stored block.
    pub fn end(&self) -> usize {
        self.base + self.blocks.len()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn extend(&mut self, blocks: &[Block]) {
        self.blocks.extend_from_slice(blocks);
    }

    /// Drops blocks with a global index below `index`.
    pub fn discard_before(&mut self, index: usize) {
        if index <= self.base {
            return;
        }
        let count = (index - self.base).min(self.blocks.len());
        self.blocks.drain(..count);
        self.base += count;
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpatialPredictor {
    basis: EdgeBasis,
}

impl SpatialPredictor {
    pub fn new() -> Self {
        Self {
            basis: EdgeBasis::new(),
        }
    }

    /// Predicts the quantized DC of `block` from its neighbours.
    ///
    /// Only the AC coefficients of `block` are read. Neighbours must hold
    /// absolute quantized DCs. Returns 0 when there is no neighbour. The
    /// estimate is clamped to the 8-bit DC range, so residuals of 8-bit
    /// content stay within the baseline DC category limit.
    pub fn predict(
        &self,
        block: &Block,
        left: Option<&Block>,
        above: Option<&Block>,
        table: &QuantizationTable,
    ) -> i32 {
        if left.is_none() && above.is_none() {
            return 0;
        }

        let (current, _) = dequantize_natural(block, table);
        let mut estimates = Vec::with_capacity(2 * BLOCK_SIZE);
        let mut edges = 0;

        if let Some(left) = left {
            let (neighbor, neighbor_dc) = dequantize_natural(left, table);
            let inner = self.basis.edge(&current, Edge::Left);
            let outer = self.basis.edge(&neighbor, Edge::Right);
            push_estimates(&mut estimates, neighbor_dc, &inner, &outer);
            edges += 1;
        }
        if let Some(above) = above {
            let (neighbor, neighbor_dc) = dequantize_natural(above, table);
            let inner = self.basis.edge(&current, Edge::Top);
            let outer = self.basis.edge(&neighbor, Edge::Bottom);
            push_estimates(&mut estimates, neighbor_dc, &inner, &outer);
            edges += 1;
        }

        let estimate = trimmed_mean(&mut estimates, TRIM_PER_EDGE * edges)
            .clamp(MIN_DC_ESTIMATE, MAX_DC_ESTIMATE);
        (estimate / f64::from(table[0])).round() as i32
    }

    /// Replaces every DC in the segment by its prediction residual.
    ///
    /// `blocks[0]` has global index `first_index`. Blocks are visited last to
    /// first so each prediction still sees absolute neighbours; neighbours
    /// before the segment come from `history`.
    pub fn predict_segment(
        &self,
        blocks: &mut [Block],
        first_index: usize,
        class: ComponentClass,
        layout: &BlockLayout,
        history: &BlockHistory,
        table: &QuantizationTable,
    ) {
        for local in (0..blocks.len()).rev() {
            let prediction =
                self.predict_at(blocks, local, first_index, class, layout, history, table);
            blocks[local][0] -= prediction;
        }
    }

    /// Inverse of [`SpatialPredictor::predict_segment`], visiting blocks first to last.
    pub fn reconstruct_segment(
        &self,
        blocks: &mut [Block],
        first_index: usize,
        class: ComponentClass,
        layout: &BlockLayout,
        history: &BlockHistory,
        table: &QuantizationTable,
    ) {
        for local in 0..blocks.len() {
            let prediction =
                self.predict_at(blocks, local, first_index, class, layout, history, table);
            blocks[local][0] += prediction;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn predict_at(
        &self,
        blocks: &[Block],
        local: usize,
        first_index: usize,
        class: ComponentClass,
        layout: &BlockLayout,
        history: &BlockHistory,
        table: &QuantizationTable,
    ) -> i32 {
        let (earlier, rest) = blocks.split_at(local);
        let lookup = |index: usize| {
            if index >= first_index {
                earlier.get(index - first_index)
            } else {
                history.get(index)
            }
        };
        let neighbors = layout.neighbors(class, first_index + local);
        self.predict(
            &rest[0],
            neighbors.left.and_then(lookup),
            neighbors.above.and_then(lookup),
            table,
        )
    }
}

/// Dequantizes into natural order with the DC cleared; returns the DC separately.
fn dequantize_natural(block: &Block, table: &QuantizationTable) -> ([f64; 64], f64) {
    let mut dequantized = *block;
    dequantize_block(&mut dequantized, table);
    let dc = f64::from(dequantized[0]);
    dequantized[0] = 0;
    (to_natural(&dequantized).map(f64::from), dc)
}

fn push_estimates(estimates: &mut Vec<f64>, neighbor_dc: f64, inner: &[f64; 8], outer: &[f64; 8]) {
    for (a, b) in inner.iter().zip(outer.iter()) {
        estimates.push(neighbor_dc - DC_SCALE * (a - b));
    }
}

/// Mean of `samples` after dropping the `trim` lowest and `trim` highest values.
pub fn trimmed_mean(samples: &mut [f64], trim: usize) -> f64 {
    samples.sort_by(f64::total_cmp);
    let kept = if samples.len() > 2 * trim {
        &samples[trim..samples.len() - trim]
    } else {
        &samples[..]
    };
    if kept.is_empty() {
        return 0.0;
    }
    kept.iter().sum::<f64>() / kept.len() as f64
}
