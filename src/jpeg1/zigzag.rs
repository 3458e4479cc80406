//! Zigzag scan order for 8x8 blocks.

use crate::jpeg1::component::Block;

/// Natural (row-major) index of each zigzag position.
pub const ZIGZAG_ORDER: [usize; 64] = [
    0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

pub fn to_natural(zigzag: &Block) -> Block {
    let mut natural = [0i32; 64];
    for (k, &value) in zigzag.iter().enumerate() {
        natural[ZIGZAG_ORDER[k]] = value;
    }
    natural
}

pub fn to_zigzag(natural: &Block) -> Block {
    let mut zigzag = [0i32; 64];
    for (k, value) in zigzag.iter_mut().enumerate() {
        *value = natural[ZIGZAG_ORDER[k]];
    }
    zigzag
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_zigzag_is_permutation() {
        let mut seen = [false; 64];
        for &index in &ZIGZAG_ORDER {
            assert!(!seen[index], "Duplicate natural index {}", index);
            seen[index] = true;
        }
    }

    #[test]
    fn test_zigzag_walks_anti_diagonals() {
        // (row, column) of consecutive positions differ by one step
        for k in 1..64 {
            let (r0, c0) = (ZIGZAG_ORDER[k - 1] / 8, ZIGZAG_ORDER[k - 1] % 8);
            let (r1, c1) = (ZIGZAG_ORDER[k] / 8, ZIGZAG_ORDER[k] % 8);
            assert!(r0.abs_diff(r1) <= 1 && c0.abs_diff(c1) <= 1, "Jump at {}", k);
        }
        assert_eq!(ZIGZAG_ORDER[63], 63);
    }

    #[test]
    fn test_natural_zigzag_inverse() {
        let mut block = [0i32; 64];
        for (i, v) in block.iter_mut().enumerate() {
            *v = i as i32 * 3 - 90;
        }
        assert_eq!(to_zigzag(&to_natural(&block)), block);
        assert_eq!(to_natural(&block)[8], block[2]);
    }
}
