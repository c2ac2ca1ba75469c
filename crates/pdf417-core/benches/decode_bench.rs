use divan::bench;
use pdf417_core::test_utils;
use pdf417_core::{BitMatrix, DecodeOptions, ScanningDecoder};

fn main() {
    divan::main();
}

#[bench]
fn bench_decode_small_symbol(bencher: divan::Bencher) {
    let symbol = test_utils::generate_symbol("HELLO WORLD", 2, 2, 3, 9);
    let options = DecodeOptions::new(symbol.codeword_width, symbol.codeword_width);
    let mut decoder = ScanningDecoder::new();

    bencher.bench_local(move || {
        let image =
            BitMatrix::new(&symbol.data, symbol.width, symbol.height, symbol.width).unwrap();
        let result = decoder.decode(&image, &symbol.corners, &options).unwrap();
        divan::black_box(result);
    });
}

#[bench]
fn bench_decode_dense_symbol(bencher: divan::Bencher) {
    let symbol = test_utils::generate_symbol(
        "A payload large enough to spread over many rows and columns, 0123456789.",
        4,
        4,
        3,
        9,
    );
    let options = DecodeOptions::new(symbol.codeword_width, symbol.codeword_width);
    let mut decoder = ScanningDecoder::new();

    bencher.bench_local(move || {
        let image =
            BitMatrix::new(&symbol.data, symbol.width, symbol.height, symbol.width).unwrap();
        let result = decoder.decode(&image, &symbol.corners, &options).unwrap();
        divan::black_box(result);
    });
}

#[bench]
fn bench_codebook_closest_match(bencher: divan::Bencher) {
    use pdf417_core::codebook::CODEBOOK;
    use pdf417_core::codeword::bit_count_of_pattern;

    let pattern = CODEBOOK.pattern(3, 417).unwrap();
    let mut runs = bit_count_of_pattern(pattern);
    for r in &mut runs {
        *r *= 5;
    }
    runs[1] += 1;
    runs[2] -= 1;

    bencher.bench_local(move || {
        divan::black_box(CODEBOOK.decoded_value(&runs));
    });
}
