//! Discrete Cosine Transform (DCT) for 8x8 blocks.
//!
//! Besides the full transforms, [`EdgeBasis`] evaluates the inverse DCT along
//! a single boundary row or column, which is all the spatial DC predictor needs.

use std::f32::consts::PI;

pub const BLOCK_SIZE: usize = 8;
pub const BLOCK_DIM: usize = BLOCK_SIZE * BLOCK_SIZE;

pub fn fdct_8x8(input: &[f32; 64], output: &mut [f32; 64]) {
    for u in 0..8 {
        for v in 0..8 {
            let mut sum = 0.0f32;
            for x in 0..8 {
                for y in 0..8 {
                    let cos_x = (((2 * x + 1) * u) as f32 * PI) / 16.0;
                    let cos_y = (((2 * y + 1) * v) as f32 * PI) / 16.0;
                    sum += input[x * 8 + y] * cos_x.cos() * cos_y.cos();
                }
            }
            let cu = if u == 0 { 1.0 / 2.0f32.sqrt() } else { 1.0 };
            let cv = if v == 0 { 1.0 / 2.0f32.sqrt() } else { 1.0 };
            output[u * 8 + v] = 0.25 * cu * cv * sum;
        }
    }
}

pub fn idct_8x8_baseline(input: &[f32; 64], output: &mut [f32; 64]) {
    for x in 0..8 {
        for y in 0..8 {
            let mut sum = 0.0f32;
            for u in 0..8 {
                for v in 0..8 {
                    let cu = if u == 0 { 1.0 / 2.0f32.sqrt() } else { 1.0 };
                    let cv = if v == 0 { 1.0 / 2.0f32.sqrt() } else { 1.0 };
                    let cos_x = (((2 * x + 1) * u) as f32 * PI) / 16.0;
                    let cos_y = (((2 * y + 1) * v) as f32 * PI) / 16.0;
                    sum += cu * cv * input[u * 8 + v] * cos_x.cos() * cos_y.cos();
                }
            }
            output[x * 8 + y] = 0.25 * sum;
        }
    }
}

/// Which boundary line of a block to reconstruct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Column 0.
    Left,
    /// Column 7.
    Right,
    /// Row 0.
    Top,
    /// Row 7.
    Bottom,
}

/// Precomputed `C(f) * cos((2s + 1) f pi / 16)` for sample `s` and frequency `f`.
#[derive(Debug, Clone)]
pub struct EdgeBasis {
    basis: [[f64; 8]; 8],
}

impl Default for EdgeBasis {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeBasis {
    pub fn new() -> Self {
        let mut basis = [[0.0f64; 8]; 8];
        for (sample, row) in basis.iter_mut().enumerate() {
            for (frequency, value) in row.iter_mut().enumerate() {
                let c = if frequency == 0 { std::f64::consts::FRAC_1_SQRT_2 } else { 1.0 };
                let angle = ((2 * sample + 1) * frequency) as f64 * std::f64::consts::PI / 16.0;
                *value = c * angle.cos();
            }
        }
        Self { basis }
    }

    /// Inverse DCT of `coefficients` (natural order, row-major by vertical
    /// frequency) evaluated along one edge of the block.
    pub fn edge(&self, coefficients: &[f64; 64], edge: Edge) -> [f64; 8] {
        match edge {
            Edge::Left => self.column(coefficients, 0),
            Edge::Right => self.column(coefficients, 7),
            Edge::Top => self.row(coefficients, 0),
            Edge::Bottom => self.row(coefficients, 7),
        }
    }

    fn column(&self, coefficients: &[f64; 64], x: usize) -> [f64; 8] {
        let mut horizontal = [0.0f64; 8];
        for (v, sum) in horizontal.iter_mut().enumerate() {
            *sum = (0..8).map(|u| self.basis[x][u] * coefficients[v * 8 + u]).sum();
        }
        let mut samples = [0.0f64; 8];
        for (y, sample) in samples.iter_mut().enumerate() {
            *sample = 0.25 * (0..8).map(|v| self.basis[y][v] * horizontal[v]).sum::<f64>();
        }
        samples
    }

    fn row(&self, coefficients: &[f64; 64], y: usize) -> [f64; 8] {
        let mut vertical = [0.0f64; 8];
        for (u, sum) in vertical.iter_mut().enumerate() {
            *sum = (0..8).map(|v| self.basis[y][v] * coefficients[v * 8 + u]).sum();
        }
        let mut samples = [0.0f64; 8];
        for (x, sample) in samples.iter_mut().enumerate() {
            *sample = 0.25 * (0..8).map(|u| self.basis[x][u] * vertical[u]).sum::<f64>();
        }
        samples
    }
}

/// 8x8 sample block from the JPEG literature, before level shifting.
#[cfg(test)]
pub(crate) const TEXTBOOK_BLOCK: [[i32; 8]; 8] = [
    [139, 144, 149, 153, 155, 155, 155, 155],
    [144, 151, 153, 156, 159, 156, 156, 156],
    [150, 155, 160, 163, 158, 156, 156, 156],
    [159, 161, 162, 160, 160, 159, 159, 159],
    [159, 160, 161, 162, 162, 155, 155, 155],
    [161, 161, 161, 161, 160, 157, 157, 157],
    [162, 162, 161, 163, 162, 157, 157, 157],
    [162, 162, 161, 161, 163, 158, 158, 158],
];
