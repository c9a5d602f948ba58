use std::collections::BTreeSet;

/// Outcome of collapsing one row or column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collapse {
    pub line: Vec<u32>,
    pub gain: u32,
    /// Output indices that hold a freshly merged tile.
    pub merged: BTreeSet<usize>,
}

impl Collapse {
    pub fn changed(&self, input: &[u32]) -> bool {
        self.line != input
    }
}

/// Value of two equal tiles merged, or `None` when it would not fit in a `u32`.
pub fn merged_value(tile: u32) -> Option<u32> {
    tile.checked_mul(2)
}

/// Slide a line toward its leading edge, merging equal neighbours once.
///
/// The leading edge is index 0, or the last index when `reversed`. A merged
/// tile is never compared again in the same pass, so `[2,2,2,2]` becomes
/// `[4,4,0,0]` and not `[8,0,0,0]`. A pair whose merge would overflow stays
/// as two tiles.
pub fn collapse(line: &[u32], reversed: bool) -> Collapse {
    let len = line.len();
    let mut tiles: Vec<u32> = line.iter().copied().filter(|&v| v != 0).collect();
    if reversed {
        tiles.reverse();
    }

    let mut out = Vec::with_capacity(len);
    let mut merged = BTreeSet::new();
    let mut gain: u32 = 0;
    let mut i = 0;
    while i < tiles.len() {
        let pair = (i + 1 < tiles.len() && tiles[i] == tiles[i + 1])
            .then(|| merged_value(tiles[i]))
            .flatten();
        if let Some(value) = pair {
            merged.insert(out.len());
            out.push(value);
            gain = gain.saturating_add(value);
            i += 2;
        } else {
            out.push(tiles[i]);
            i += 1;
        }
    }
    out.resize(len, 0);

    if reversed {
        out.reverse();
        merged = merged.into_iter().map(|idx| len - 1 - idx).collect();
    }

    Collapse {
        line: out,
        gain,
        merged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(indices: &[usize]) -> BTreeSet<usize> {
        indices.iter().copied().collect()
    }

    #[test]
    fn empty_line_stays_empty() {
        let c = collapse(&[0, 0, 0, 0], false);
        assert_eq!(c.line, vec![0, 0, 0, 0]);
        assert_eq!(c.gain, 0);
        assert!(c.merged.is_empty());
        assert!(!c.changed(&[0, 0, 0, 0]));
    }

    #[test]
    fn single_tile_slides_without_merging() {
        let c = collapse(&[0, 0, 8, 0], false);
        assert_eq!(c.line, vec![8, 0, 0, 0]);
        assert_eq!(c.gain, 0);
        assert!(c.merged.is_empty());

        let still = collapse(&[8, 0, 0, 0], false);
        assert!(!still.changed(&[8, 0, 0, 0]));
    }

    #[test]
    fn each_tile_merges_at_most_once() {
        let c = collapse(&[2, 2, 2, 2], false);
        assert_eq!(c.line, vec![4, 4, 0, 0]);
        assert_eq!(c.gain, 8);
        assert_eq!(c.merged, set(&[0, 1]));
    }

    #[test]
    fn gap_between_equal_tiles_is_compressed_first() {
        let c = collapse(&[2, 0, 2, 4], false);
        assert_eq!(c.line, vec![4, 4, 0, 0]);
        assert_eq!(c.gain, 4);
        assert_eq!(c.merged, set(&[0]));
    }

    #[test]
    fn merged_tile_is_not_rechecked_against_next() {
        let c = collapse(&[4, 4, 8, 0], false);
        assert_eq!(c.line, vec![8, 8, 0, 0]);
        assert_eq!(c.gain, 8);
    }

    #[test]
    fn reversed_merges_from_trailing_edge() {
        let c = collapse(&[2, 2, 2, 0], true);
        assert_eq!(c.line, vec![0, 0, 2, 4]);
        assert_eq!(c.gain, 4);
        assert_eq!(c.merged, set(&[3]));

        let full = collapse(&[2, 2, 2, 2], true);
        assert_eq!(full.line, vec![0, 0, 4, 4]);
        assert_eq!(full.merged, set(&[2, 3]));
    }

    #[test]
    fn unmerged_values_are_conserved() {
        let input = [16, 8, 8, 2, 0, 2];
        let c = collapse(&input, false);
        assert_eq!(c.line, vec![16, 16, 4, 0, 0, 0]);
        assert_eq!(c.gain, 20);

        let input_sum: u32 = input.iter().sum();
        let output_sum: u32 = c.line.iter().sum();
        assert_eq!(input_sum, output_sum);

        let unmerged_out: u32 = c
            .line
            .iter()
            .enumerate()
            .filter(|(i, _)| !c.merged.contains(i))
            .map(|(_, v)| v)
            .sum();
        assert_eq!(unmerged_out, 16);
    }

    #[test]
    fn largest_tiles_do_not_merge() {
        let top = 1 << 31;
        let c = collapse(&[0, top, top, 0], false);
        assert_eq!(c.line, vec![top, top, 0, 0]);
        assert_eq!(c.gain, 0);
        assert!(c.merged.is_empty());
        assert_eq!(merged_value(top), None);
        assert_eq!(merged_value(1 << 30), Some(top));
    }

    #[test]
    fn deterministic_for_identical_input() {
        let input = [4, 0, 4, 4, 2, 2];
        assert_eq!(collapse(&input, true), collapse(&input, true));
    }
}
