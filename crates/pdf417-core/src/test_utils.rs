//! Synthetic PDF417 symbols for tests and benches.
//!
//! Builds a codeword stream from a text payload (Text compaction plus the
//! Reed–Solomon parity for the requested level), renders it into a
//! byte-per-pixel bit grid with start/stop patterns and both row-indicator
//! columns, and reports the ground-truth corner points a finder would hand
//! to the decoder.

use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

use crate::codebook::CODEBOOK;
use crate::ecc;
use crate::image::{CornerPoints, Point};

/// Start pattern run lengths (17 modules).
pub const START_PATTERN: [i32; 8] = [8, 1, 1, 1, 1, 1, 1, 3];

/// Stop pattern run lengths (18 modules).
pub const STOP_PATTERN: [i32; 9] = [7, 1, 1, 3, 1, 1, 1, 2, 1];

#[derive(Clone, Copy, PartialEq)]
enum Submode {
    Alpha,
    Lower,
    Mixed,
}

const MIXED_CHARS: &[u8; 15] = b"&\r\t,:#-.$/+%*=^";
const PUNCT_CHARS: &[u8; 29] = b";<>@[\\]_`~!\r\t,:\n-.$/\"|*()?{}'";

/// Encode `text` with Text compaction. Handles the submode tables the
/// decoder understands; punctuation goes through single-value shifts.
pub fn encode_text(text: &str) -> Vec<i32> {
    assert!(text.is_ascii(), "text compaction covers ASCII payloads");
    let mut values: Vec<i32> = Vec::new();
    let mut submode = Submode::Alpha;
    for &byte in text.as_bytes() {
        match byte {
            b'A'..=b'Z' => {
                match submode {
                    Submode::Alpha => {}
                    Submode::Lower => values.push(27), // one-character shift
                    Submode::Mixed => {
                        values.push(28);
                        submode = Submode::Alpha;
                    }
                }
                values.push(i32::from(byte - b'A'));
            }
            b'a'..=b'z' => {
                if submode != Submode::Lower {
                    values.push(27);
                    submode = Submode::Lower;
                }
                values.push(i32::from(byte - b'a'));
            }
            b'0'..=b'9' => {
                if submode != Submode::Mixed {
                    values.push(28);
                    submode = Submode::Mixed;
                }
                values.push(i32::from(byte - b'0'));
            }
            b' ' => values.push(26),
            _ => {
                if let Some(index) = MIXED_CHARS.iter().position(|&c| c == byte) {
                    if submode != Submode::Mixed {
                        values.push(28);
                        submode = Submode::Mixed;
                    }
                    values.push(index as i32 + 10);
                } else if let Some(index) = PUNCT_CHARS.iter().position(|&c| c == byte) {
                    values.push(29); // punctuation shift
                    values.push(index as i32);
                } else {
                    panic!("character {:?} is not text-compactable", char::from(byte));
                }
            }
        }
    }
    if values.len() % 2 != 0 {
        values.push(29); // dangling shift as padding
    }
    values
        .chunks(2)
        .map(|pair| pair[0] * 30 + pair[1])
        .collect()
}

/// Assemble the full codeword stream for a symbol of the given column count
/// and EC level: Symbol Length Descriptor, data, padding, parity. Returns
/// the stream and the row count it implies.
pub fn build_symbol_codewords(text: &str, columns: usize, ec_level: u32) -> (Vec<i32>, usize) {
    let data = encode_text(text);
    let ec_count = 1usize << (ec_level + 1);
    let min_total = 1 + data.len() + ec_count;
    let rows = min_total.div_ceil(columns).max(3);
    assert!(rows <= 90, "payload does not fit the symbol");
    let pad = rows * columns - min_total;

    let mut codewords = Vec::with_capacity(rows * columns);
    codewords.push((1 + data.len() + pad) as i32);
    codewords.extend_from_slice(&data);
    codewords.extend(std::iter::repeat(900).take(pad));
    let parity = ecc::generate_ec(&codewords, ec_count);
    codewords.extend(parity);
    (codewords, rows)
}

/// A rendered synthetic symbol.
pub struct SyntheticSymbol {
    /// Byte-per-pixel grid, non-zero = black module.
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    /// Corner points of the codeword area, as a finder would report them.
    pub corners: CornerPoints,
    /// Codeword width in pixels, for the decoder's width bounds.
    pub codeword_width: i32,
}

/// Render a codeword stream into a bit grid.
pub fn render_symbol(
    codewords: &[i32],
    rows: usize,
    columns: usize,
    ec_level: u32,
    module_width: usize,
    row_height: usize,
    margin: usize,
) -> SyntheticSymbol {
    assert_eq!(codewords.len(), rows * columns);
    let modules_per_row = 17 + 17 + columns * 17 + 17 + 18;
    let width = modules_per_row * module_width + 2 * margin;
    let height = rows * row_height + 2 * margin;
    let mut data = vec![0u8; width * height];

    let rows_value = (rows as i32 - 1) / 3;
    let columns_value = columns as i32 - 1;
    let level_value = ec_level as i32 * 3 + (rows as i32 - 1) % 3;

    for row in 0..rows {
        let cluster_index = (row % 3) as i32;
        let cluster = cluster_index * 3;
        let left_value = match cluster_index {
            0 => rows_value,
            1 => level_value,
            _ => columns_value,
        };
        let right_value = match cluster_index {
            0 => columns_value,
            1 => rows_value,
            _ => level_value,
        };
        let band_value = (row as i32 / 3) * 30;

        let mut modules: Vec<bool> = Vec::with_capacity(modules_per_row);
        push_runs(&mut modules, &START_PATTERN);
        push_pattern(&mut modules, cluster, band_value + left_value);
        for column in 0..columns {
            push_pattern(&mut modules, cluster, codewords[row * columns + column]);
        }
        push_pattern(&mut modules, cluster, band_value + right_value);
        push_runs(&mut modules, &STOP_PATTERN);

        for (module, &black) in modules.iter().enumerate() {
            if !black {
                continue;
            }
            let x0 = margin + module * module_width;
            let y0 = margin + row * row_height;
            for y in y0..y0 + row_height {
                for x in x0..x0 + module_width {
                    data[y * width + x] = 1;
                }
            }
        }
    }

    // corner points bracket the codeword area: from the left indicator's
    // first module to the right indicator's last
    let left_x = (margin + 17 * module_width) as f64;
    let right_x = (margin + (17 + 17 + columns * 17 + 17) * module_width - 1) as f64;
    let top_y = margin as f64;
    let bottom_y = (margin + rows * row_height - 1) as f64;
    let corners = CornerPoints {
        top_left: Some(Point::new(left_x, top_y)),
        bottom_left: Some(Point::new(left_x, bottom_y)),
        top_right: Some(Point::new(right_x, top_y)),
        bottom_right: Some(Point::new(right_x, bottom_y)),
    };

    SyntheticSymbol {
        data,
        width,
        height,
        corners,
        codeword_width: 17 * module_width as i32,
    }
}

/// Encode and render `text` in one step.
pub fn generate_symbol(
    text: &str,
    columns: usize,
    ec_level: u32,
    module_width: usize,
    row_height: usize,
) -> SyntheticSymbol {
    let (codewords, rows) = build_symbol_codewords(text, columns, ec_level);
    render_symbol(
        &codewords,
        rows,
        columns,
        ec_level,
        module_width,
        row_height,
        4 * module_width,
    )
}

/// Flip pixels independently with probability `p`.
pub fn apply_noise<R: Rng>(symbol: &mut SyntheticSymbol, rng: &mut R, p: f64) {
    let flips = Bernoulli::new(p).expect("probability in [0, 1]");
    for pixel in &mut symbol.data {
        if flips.sample(rng) {
            *pixel ^= 1;
        }
    }
}

/// Flip exactly `count` pixels at random positions.
pub fn flip_pixels<R: Rng>(symbol: &mut SyntheticSymbol, rng: &mut R, count: usize) {
    for _ in 0..count {
        let index = rng.gen_range(0..symbol.data.len());
        symbol.data[index] ^= 1;
    }
}

/// Paint one interior codeword cell white in every image row, turning it
/// into an erasure.
pub fn blank_cell(symbol: &mut SyntheticSymbol, rows: usize, columns: usize, cell_index: usize) {
    let module_width = symbol.codeword_width as usize / 17;
    let margin = 4 * module_width;
    let row_height = (symbol.height - 2 * margin) / rows;
    let row = cell_index / columns;
    let column = cell_index % columns;
    let x0 = margin + (17 + 17 + column * 17) * module_width;
    let y0 = margin + row * row_height;
    for y in y0..y0 + row_height {
        for x in x0..x0 + 17 * module_width {
            symbol.data[y * symbol.width + x] = 0;
        }
    }
}

fn push_runs(modules: &mut Vec<bool>, runs: &[i32]) {
    for (i, &run) in runs.iter().enumerate() {
        for _ in 0..run {
            modules.push(i % 2 == 0);
        }
    }
}

fn push_pattern(modules: &mut Vec<bool>, cluster: i32, value: i32) {
    let pattern = CODEBOOK
        .pattern(cluster, value as u16)
        .expect("codeword value in range");
    for bit in (0..17).rev() {
        modules.push((pattern >> bit) & 1 == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream;

    #[test]
    fn test_encode_text_round_trips_through_parser() {
        for payload in ["AB", "Test", "HELLO WORLD 123", "a1B2!?"] {
            let data = encode_text(payload);
            let mut codewords = vec![data.len() as i32 + 1];
            codewords.extend(&data);
            let result = bitstream::decode(&codewords, 0, None).unwrap();
            assert_eq!(result.text, payload, "payload {:?}", payload);
        }
    }

    #[test]
    fn test_build_symbol_dimensions() {
        let (codewords, rows) = build_symbol_codewords("AB", 2, 1);
        assert_eq!(rows, 3);
        assert_eq!(codewords.len(), 6);
        assert_eq!(codewords[0], 2); // descriptor + one data codeword
    }

    #[test]
    fn test_render_dimensions() {
        let symbol = generate_symbol("AB", 2, 1, 3, 8);
        assert_eq!(symbol.data.len(), symbol.width * symbol.height);
        assert_eq!(symbol.codeword_width, 51);
        // quiet margin stays white
        assert!(symbol.data[..symbol.width].iter().all(|&p| p == 0));
    }
}
