//! Morphological thinning of binary masks.
//!
//! Zhang-Suen style two-subpass thinning with an iteration cap. The
//! edge detector runs at most two iterations: enough to reduce the
//! rasterized boundary candidates to a 1-pixel-wide skeleton without
//! eating into legitimate thin structures.

use ndarray::Array2;

/// Value of pixel `(row, col)` treating out-of-bounds as background.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn at(mask: &Array2<u8>, row: isize, col: isize) -> u8 {
    let (rows, cols) = mask.dim();
    if row < 0 || col < 0 || row >= rows as isize || col >= cols as isize {
        return 0;
    }
    u8::from(mask[[row as usize, col as usize]] != 0)
}

/// The 8 neighbors in Zhang-Suen order p2..p9, clockwise from north.
fn ring(mask: &Array2<u8>, row: isize, col: isize) -> [u8; 8] {
    [
        at(mask, row - 1, col),     // p2 N
        at(mask, row - 1, col + 1), // p3 NE
        at(mask, row, col + 1),     // p4 E
        at(mask, row + 1, col + 1), // p5 SE
        at(mask, row + 1, col),     // p6 S
        at(mask, row + 1, col - 1), // p7 SW
        at(mask, row, col - 1),     // p8 W
        at(mask, row - 1, col - 1), // p9 NW
    ]
}

/// Number of 0 -> 1 transitions walking the ring once.
fn transitions(ring: &[u8; 8]) -> u8 {
    let mut count = 0;
    for k in 0..8 {
        if ring[k] == 0 && ring[(k + 1) % 8] == 1 {
            count += 1;
        }
    }
    count
}

/// Thin a binary mask (nonzero = foreground) toward a 1-pixel skeleton.
///
/// Runs at most `max_iter` full iterations (each iteration is the two
/// Zhang-Suen subpasses) and stops early once a pass removes nothing.
#[must_use = "returns the thinned mask"]
pub fn thin(mask: &Array2<u8>, max_iter: usize) -> Array2<u8> {
    let mut current = mask.mapv(|v| u8::from(v != 0));
    let (rows, cols) = current.dim();

    for _ in 0..max_iter {
        let mut changed = false;
        for subpass in 0..2 {
            let mut removals: Vec<(usize, usize)> = Vec::new();
            for i in 0..rows {
                for j in 0..cols {
                    if current[[i, j]] == 0 {
                        continue;
                    }
                    #[allow(clippy::cast_possible_wrap)]
                    let (ri, ci) = (i as isize, j as isize);
                    let ring = ring(&current, ri, ci);
                    let neighbors: u8 = ring.iter().sum();
                    if !(2..=6).contains(&neighbors) || transitions(&ring) != 1 {
                        continue;
                    }
                    let [p2, _, p4, _, p6, _, p8, _] = ring;
                    let remove = if subpass == 0 {
                        p2 * p4 * p6 == 0 && p4 * p6 * p8 == 0
                    } else {
                        p2 * p4 * p8 == 0 && p2 * p6 * p8 == 0
                    };
                    if remove {
                        removals.push((i, j));
                    }
                }
            }
            if !removals.is_empty() {
                changed = true;
            }
            for (i, j) in removals {
                current[[i, j]] = 0;
            }
        }
        if !changed {
            break;
        }
    }

    current
}
