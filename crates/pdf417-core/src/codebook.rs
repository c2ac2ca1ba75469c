//! Codeword symbol tables and bar-pattern lookup.
//!
//! Every PDF417 codeword is 17 modules wide: 4 bars and 4 spaces, each 1 to 6
//! modules, starting with a bar. Rows cycle through three codebooks
//! (clusters 0, 3 and 6, identified by the bucket number of the run
//! lengths); each cluster assigns the values `0..=928`.
//!
//! The cluster tables here are generated rather than transcribed: per
//! cluster, all width compositions are enumerated in lexicographic order and
//! the first 929 become the codeword values. The mapping is deterministic
//! and shared with the synthetic encoder, so decoding is exactly inverse to
//! rendering. Interoperating with symbols printed by other software would
//! require substituting the published standard's tables in
//! [`Codebook::generate`].
//!
//! Lookup mirrors the two-stage dictionary search used elsewhere in this
//! codebase family: exact hash lookup on the resampled pattern first, then a
//! linear closest-match scan over run-length ratios.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::codeword::{bucket_of, ModuleBitCount, BARS_IN_MODULE, MODULES_IN_CODEWORD};

/// Number of codeword values per cluster.
pub const NUMBER_OF_CODEWORDS: usize = 929;

/// Largest value the Symbol Length Descriptor may take.
pub const MAX_CODEWORDS_IN_BARCODE: i32 = 928;

pub const MIN_ROWS_IN_BARCODE: i32 = 3;
pub const MAX_ROWS_IN_BARCODE: i32 = 90;
pub const MIN_COLUMNS_IN_BARCODE: i32 = 1;
pub const MAX_COLUMNS_IN_BARCODE: i32 = 30;

/// The three clusters used by consecutive barcode rows.
pub const CLUSTERS: [i32; 3] = [0, 3, 6];

const MIN_MODULE_WIDTH: i32 = 1;
const MAX_MODULE_WIDTH: i32 = 6;

/// Shared symbol tables, built on first use.
pub static CODEBOOK: LazyLock<Codebook> = LazyLock::new(Codebook::generate);

/// Symbol tables for all three clusters plus the reverse lookup structures.
pub struct Codebook {
    /// `patterns[cluster / 3][value]` is the 17-bit bar pattern.
    patterns: [Vec<u32>; 3],
    /// Exact pattern to codeword value, across all clusters.
    codeword_by_pattern: HashMap<u32, u16>,
    /// `(pattern, normalized run widths)` for the closest-match fallback.
    ratios: Vec<(u32, [f32; BARS_IN_MODULE])>,
}

impl Codebook {
    fn generate() -> Self {
        let mut patterns = [Vec::new(), Vec::new(), Vec::new()];
        let mut codeword_by_pattern = HashMap::with_capacity(3 * NUMBER_OF_CODEWORDS);
        let mut ratios = Vec::with_capacity(3 * NUMBER_OF_CODEWORDS);

        for (cluster_index, &cluster) in CLUSTERS.iter().enumerate() {
            let table: &mut Vec<u32> = &mut patterns[cluster_index];
            enumerate_cluster(cluster, &mut |widths| {
                if table.len() >= NUMBER_OF_CODEWORDS {
                    return;
                }
                let value = table.len() as u16;
                let pattern = pattern_of_bit_counts(widths);
                table.push(pattern);
                codeword_by_pattern.insert(pattern, value);
                let mut r = [0f32; BARS_IN_MODULE];
                for (slot, &w) in r.iter_mut().zip(widths.iter()) {
                    *slot = w as f32 / MODULES_IN_CODEWORD as f32;
                }
                ratios.push((pattern, r));
            });
            debug_assert_eq!(patterns[cluster_index].len(), NUMBER_OF_CODEWORDS);
        }

        Self {
            patterns,
            codeword_by_pattern,
            ratios,
        }
    }

    /// Bar pattern of `value` in the given cluster (0, 3 or 6).
    #[must_use]
    pub fn pattern(&self, cluster: i32, value: u16) -> Option<u32> {
        if !CLUSTERS.contains(&cluster) {
            return None;
        }
        self.patterns[(cluster / 3) as usize]
            .get(usize::from(value))
            .copied()
    }

    /// Codeword value of an exact 17-bit pattern, any cluster.
    #[must_use]
    pub fn codeword(&self, pattern: u32) -> Option<u16> {
        self.codeword_by_pattern.get(&(pattern & 0x3FFFF)).copied()
    }

    /// Map 8 pixel-run widths to a canonical 17-bit symbol pattern.
    ///
    /// The runs are resampled to 17 modules and looked up exactly; when that
    /// misses (single-pixel bar-width errors, skew) the table entry with the
    /// smallest squared run-ratio error is taken instead.
    #[must_use]
    pub fn decoded_value(&self, module_bit_count: &ModuleBitCount) -> Option<u32> {
        let sampled = sample_bit_counts(module_bit_count);
        let pattern = pattern_of_bit_counts(&sampled);
        if self.codeword(pattern).is_some() {
            return Some(pattern);
        }
        self.closest_decoded_value(module_bit_count)
    }

    fn closest_decoded_value(&self, module_bit_count: &ModuleBitCount) -> Option<u32> {
        let sum: i32 = module_bit_count.iter().sum();
        if sum < 1 {
            return None;
        }
        let mut observed = [0f32; BARS_IN_MODULE];
        for (slot, &count) in observed.iter_mut().zip(module_bit_count.iter()) {
            *slot = count as f32 / sum as f32;
        }
        let mut best_match = None;
        let mut best_error = f32::MAX;
        for &(pattern, ref ratios) in &self.ratios {
            let mut error = 0f32;
            for (&a, &b) in ratios.iter().zip(observed.iter()) {
                let diff = a - b;
                error += diff * diff;
                if error >= best_error {
                    break;
                }
            }
            if error < best_error {
                best_error = error;
                best_match = Some(pattern);
            }
        }
        best_match
    }
}

/// Resample 8 pixel-run widths into 8 module counts summing to 17 by reading
/// the run covering each of 17 evenly spaced sample points.
#[must_use]
pub fn sample_bit_counts(module_bit_count: &ModuleBitCount) -> ModuleBitCount {
    let sum: i32 = module_bit_count.iter().sum();
    let mut result = [0i32; BARS_IN_MODULE];
    let mut bit_count_index = 0usize;
    let mut sum_previous_bits = 0i32;
    for i in 0..MODULES_IN_CODEWORD {
        let sample_index = sum / (2 * MODULES_IN_CODEWORD) + (i * sum) / MODULES_IN_CODEWORD;
        if bit_count_index < BARS_IN_MODULE - 1
            && sum_previous_bits + module_bit_count[bit_count_index] <= sample_index
        {
            sum_previous_bits += module_bit_count[bit_count_index];
            bit_count_index += 1;
        }
        result[bit_count_index] += 1;
    }
    result
}

/// Build the 17-bit pattern of a module count sequence, bars (even indices)
/// as set bits, most significant module first.
#[must_use]
pub fn pattern_of_bit_counts(counts: &ModuleBitCount) -> u32 {
    let mut result = 0u32;
    for (i, &count) in counts.iter().enumerate() {
        for _ in 0..count {
            result = (result << 1) | u32::from(i % 2 == 0);
        }
    }
    result
}

/// Enumerate, in lexicographic width order, every 4-bar/4-space composition
/// of 17 modules with run widths 1..=6 whose bucket matches `cluster`.
fn enumerate_cluster(cluster: i32, visit: &mut dyn FnMut(&ModuleBitCount)) {
    fn recurse(
        depth: usize,
        remaining: i32,
        widths: &mut ModuleBitCount,
        cluster: i32,
        visit: &mut dyn FnMut(&ModuleBitCount),
    ) {
        if depth == BARS_IN_MODULE - 1 {
            if (MIN_MODULE_WIDTH..=MAX_MODULE_WIDTH).contains(&remaining) {
                widths[depth] = remaining;
                if bucket_of(widths) == cluster {
                    visit(widths);
                }
            }
            return;
        }
        let slots_after = (BARS_IN_MODULE - 1 - depth) as i32;
        let upper = MAX_MODULE_WIDTH.min(remaining - slots_after * MIN_MODULE_WIDTH);
        for width in MIN_MODULE_WIDTH..=upper {
            widths[depth] = width;
            recurse(depth + 1, remaining - width, widths, cluster, visit);
        }
    }
    let mut widths = [0i32; BARS_IN_MODULE];
    recurse(0, MODULES_IN_CODEWORD, &mut widths, cluster, visit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codeword::{bit_count_of_pattern, bucket_of_pattern};
    use proptest::prelude::*;

    #[test]
    fn test_each_cluster_has_enough_symbols() {
        for &cluster in &CLUSTERS {
            let mut count = 0usize;
            enumerate_cluster(cluster, &mut |_| count += 1);
            assert!(
                count >= NUMBER_OF_CODEWORDS,
                "cluster {} has only {} candidate symbols",
                cluster,
                count
            );
        }
    }

    #[test]
    fn test_pattern_lookup_round_trip() {
        for &cluster in &CLUSTERS {
            for value in [0u16, 1, 17, 450, 899, 928] {
                let pattern = CODEBOOK.pattern(cluster, value).unwrap();
                assert_eq!(CODEBOOK.codeword(pattern), Some(value));
                assert_eq!(bucket_of_pattern(pattern), cluster);
            }
        }
    }

    #[test]
    fn test_exact_decode_of_scaled_runs() {
        let pattern = CODEBOOK.pattern(3, 207).unwrap();
        let mut runs = bit_count_of_pattern(pattern);
        for r in &mut runs {
            *r *= 4; // 4 pixels per module
        }
        assert_eq!(CODEBOOK.decoded_value(&runs), Some(pattern));
    }

    #[test]
    fn test_closest_match_absorbs_single_pixel_error() {
        let pattern = CODEBOOK.pattern(6, 512).unwrap();
        let mut runs = bit_count_of_pattern(pattern);
        for r in &mut runs {
            *r *= 5;
        }
        // one pixel migrates across a bar/space boundary
        runs[3] += 1;
        runs[4] -= 1;
        assert_eq!(CODEBOOK.decoded_value(&runs), Some(pattern));
    }

    proptest! {
        // bucket is a deterministic function of the codeword value
        #[test]
        fn prop_bucket_matches_cluster(cluster_index in 0usize..3, value in 0u16..929) {
            let cluster = CLUSTERS[cluster_index];
            let pattern = CODEBOOK.pattern(cluster, value).unwrap();
            prop_assert_eq!(bucket_of_pattern(pattern), cluster);
            let counts = bit_count_of_pattern(pattern);
            prop_assert_eq!(counts.iter().sum::<i32>(), MODULES_IN_CODEWORD);
        }

        // resampling scaled runs is lossless
        #[test]
        fn prop_scaled_runs_resample_exactly(
            cluster_index in 0usize..3,
            value in 0u16..929,
            scale in 1i32..8,
        ) {
            let cluster = CLUSTERS[cluster_index];
            let pattern = CODEBOOK.pattern(cluster, value).unwrap();
            let mut runs = bit_count_of_pattern(pattern);
            for r in &mut runs {
                *r *= scale;
            }
            prop_assert_eq!(sample_bit_counts(&runs), bit_count_of_pattern(pattern));
        }
    }
}
