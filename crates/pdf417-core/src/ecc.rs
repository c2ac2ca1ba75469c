//! Reed–Solomon error correction over the prime field GF(929).
//!
//! The decoder computes syndromes on the received codeword polynomial,
//! recovers the error locator with the extended Euclidean algorithm, finds
//! its roots exhaustively (the field has only 928 candidates) and repairs
//! the affected positions with Forney magnitudes. Erasure positions are not
//! folded into the locator; the caller bounds their count up front and they
//! are repaired like ordinary errors, but they are excluded from the
//! corrected-error count the decoder reports.
//!
//! `generate_ec` is the matching encoder, used by the synthetic test path.

use std::sync::LazyLock;

/// Field size. 929 is prime, so arithmetic is plain modular arithmetic.
pub const MODULUS: i32 = 929;

/// 3 generates the multiplicative group of GF(929).
const GENERATOR: i32 = 3;

static FIELD: LazyLock<Field> = LazyLock::new(Field::new);

struct Field {
    exp: [i32; MODULUS as usize],
    log: [i32; MODULUS as usize],
}

impl Field {
    fn new() -> Self {
        let mut exp = [0i32; MODULUS as usize];
        let mut log = [0i32; MODULUS as usize];
        let mut x = 1i32;
        for slot in exp.iter_mut() {
            *slot = x;
            x = (x * GENERATOR) % MODULUS;
        }
        for (i, &value) in exp.iter().enumerate().take(MODULUS as usize - 1) {
            log[value as usize] = i as i32;
        }
        Self { exp, log }
    }

    #[inline]
    fn add(&self, a: i32, b: i32) -> i32 {
        (a + b) % MODULUS
    }

    #[inline]
    fn subtract(&self, a: i32, b: i32) -> i32 {
        (MODULUS + a - b) % MODULUS
    }

    #[inline]
    fn multiply(&self, a: i32, b: i32) -> i32 {
        (a * b) % MODULUS
    }

    #[inline]
    fn exp(&self, a: i32) -> i32 {
        self.exp[a as usize % (MODULUS as usize - 1)]
    }

    #[inline]
    fn log(&self, a: i32) -> i32 {
        assert!(a != 0, "log of zero");
        self.log[a as usize]
    }

    #[inline]
    fn inverse(&self, a: i32) -> i32 {
        self.exp[(MODULUS - 1 - self.log(a)) as usize]
    }
}

/// Polynomial over GF(929), coefficients stored highest degree first.
#[derive(Clone, Debug)]
struct Poly {
    coefficients: Vec<i32>,
}

impl Poly {
    fn new(coefficients: Vec<i32>) -> Self {
        let first_non_zero = coefficients.iter().position(|&c| c != 0);
        match first_non_zero {
            None => Self {
                coefficients: vec![0],
            },
            Some(i) => Self {
                coefficients: coefficients[i..].to_vec(),
            },
        }
    }

    fn zero() -> Self {
        Self {
            coefficients: vec![0],
        }
    }

    fn one() -> Self {
        Self {
            coefficients: vec![1],
        }
    }

    fn monomial(degree: usize, coefficient: i32) -> Self {
        if coefficient == 0 {
            return Self::zero();
        }
        let mut coefficients = vec![0; degree + 1];
        coefficients[0] = coefficient;
        Self { coefficients }
    }

    fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    fn is_zero(&self) -> bool {
        self.coefficients[0] == 0
    }

    fn coefficient(&self, degree: usize) -> i32 {
        self.coefficients[self.coefficients.len() - 1 - degree]
    }

    fn evaluate_at(&self, a: i32) -> i32 {
        let field = &*FIELD;
        if a == 0 {
            return self.coefficient(0);
        }
        let mut result = 0i32;
        for &coefficient in &self.coefficients {
            result = field.add(field.multiply(a, result), coefficient);
        }
        result
    }

    fn add(&self, other: &Poly) -> Poly {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let (smaller, larger) = if self.coefficients.len() <= other.coefficients.len() {
            (&self.coefficients, &other.coefficients)
        } else {
            (&other.coefficients, &self.coefficients)
        };
        let mut sum = larger.clone();
        let offset = larger.len() - smaller.len();
        for (i, &c) in smaller.iter().enumerate() {
            sum[offset + i] = FIELD.add(sum[offset + i], c);
        }
        Poly::new(sum)
    }

    fn subtract(&self, other: &Poly) -> Poly {
        if other.is_zero() {
            return self.clone();
        }
        self.add(&other.negative())
    }

    fn multiply(&self, other: &Poly) -> Poly {
        if self.is_zero() || other.is_zero() {
            return Poly::zero();
        }
        let field = &*FIELD;
        let mut product = vec![0i32; self.coefficients.len() + other.coefficients.len() - 1];
        for (i, &a) in self.coefficients.iter().enumerate() {
            for (j, &b) in other.coefficients.iter().enumerate() {
                product[i + j] = field.add(product[i + j], field.multiply(a, b));
            }
        }
        Poly::new(product)
    }

    fn multiply_scalar(&self, scalar: i32) -> Poly {
        if scalar == 0 {
            return Poly::zero();
        }
        Poly::new(
            self.coefficients
                .iter()
                .map(|&c| FIELD.multiply(c, scalar))
                .collect(),
        )
    }

    fn multiply_by_monomial(&self, degree: usize, coefficient: i32) -> Poly {
        if coefficient == 0 {
            return Poly::zero();
        }
        let field = &*FIELD;
        let mut product: Vec<i32> = self
            .coefficients
            .iter()
            .map(|&c| field.multiply(c, coefficient))
            .collect();
        product.extend(std::iter::repeat(0).take(degree));
        Poly::new(product)
    }

    fn negative(&self) -> Poly {
        Poly::new(
            self.coefficients
                .iter()
                .map(|&c| FIELD.subtract(0, c))
                .collect(),
        )
    }
}

/// Correct `received` in place given `num_ec_codewords` parity symbols.
///
/// Returns the number of corrected positions that were *not* known erasures,
/// or `None` when the correction does not converge.
pub fn decode(received: &mut [i32], num_ec_codewords: usize, erasures: &[usize]) -> Option<usize> {
    let field = &*FIELD;
    let poly = Poly::new(received.to_vec());
    let mut syndromes = vec![0i32; num_ec_codewords];
    let mut any_error = false;
    for i in (1..=num_ec_codewords).rev() {
        let eval = poly.evaluate_at(field.exp(i as i32));
        syndromes[num_ec_codewords - i] = eval;
        if eval != 0 {
            any_error = true;
        }
    }
    if !any_error {
        return Some(0);
    }

    let syndrome = Poly::new(syndromes);
    let (sigma, omega) =
        run_euclidean_algorithm(Poly::monomial(num_ec_codewords, 1), syndrome, num_ec_codewords)?;
    let error_locations = find_error_locations(&sigma)?;
    let error_magnitudes = find_error_magnitudes(&omega, &sigma, &error_locations);

    let mut corrected_errors = 0usize;
    for (&location, &magnitude) in error_locations.iter().zip(error_magnitudes.iter()) {
        let position = received.len() as i32 - 1 - field.log(location);
        if position < 0 {
            return None;
        }
        let position = position as usize;
        received[position] = field.subtract(received[position], magnitude);
        if !erasures.contains(&position) {
            corrected_errors += 1;
        }
    }
    Some(corrected_errors)
}

fn run_euclidean_algorithm(a: Poly, b: Poly, r_degree: usize) -> Option<(Poly, Poly)> {
    let field = &*FIELD;
    let (mut r_last, mut r) = if a.degree() < b.degree() { (b, a) } else { (a, b) };
    let mut t_last = Poly::zero();
    let mut t = Poly::one();

    // Run Euclidean algorithm until r and t represent the error locator and
    // evaluator with degree below half the parity count.
    while r.degree() >= r_degree / 2 {
        let r_last_last = std::mem::replace(&mut r_last, r);
        let t_last_last = std::mem::replace(&mut t_last, t);
        if r_last.is_zero() {
            // Euclidean algorithm already terminated
            return None;
        }
        r = r_last_last;
        let mut q = Poly::zero();
        let denominator_leading_term = r_last.coefficient(r_last.degree());
        let dlt_inverse = field.inverse(denominator_leading_term);
        while r.degree() >= r_last.degree() && !r.is_zero() {
            let degree_diff = r.degree() - r_last.degree();
            let scale = field.multiply(r.coefficient(r.degree()), dlt_inverse);
            q = q.add(&Poly::monomial(degree_diff, scale));
            r = r.subtract(&r_last.multiply_by_monomial(degree_diff, scale));
        }
        t = q.multiply(&t_last).subtract(&t_last_last).negative();
    }

    let sigma_tilde_at_zero = t.coefficient(0);
    if sigma_tilde_at_zero == 0 {
        return None;
    }
    let inverse = field.inverse(sigma_tilde_at_zero);
    Some((t.multiply_scalar(inverse), r.multiply_scalar(inverse)))
}

fn find_error_locations(error_locator: &Poly) -> Option<Vec<i32>> {
    let field = &*FIELD;
    let num_errors = error_locator.degree();
    let mut result = Vec::with_capacity(num_errors);
    for i in 1..MODULUS {
        if result.len() >= num_errors {
            break;
        }
        if error_locator.evaluate_at(i) == 0 {
            result.push(field.inverse(i));
        }
    }
    if result.len() != num_errors {
        return None;
    }
    Some(result)
}

fn find_error_magnitudes(
    error_evaluator: &Poly,
    error_locator: &Poly,
    error_locations: &[i32],
) -> Vec<i32> {
    let field = &*FIELD;
    let degree = error_locator.degree();
    if degree < 1 {
        return Vec::new();
    }
    let mut derivative_coefficients = vec![0i32; degree];
    for i in 1..=degree {
        derivative_coefficients[degree - i] =
            field.multiply(i as i32 % MODULUS, error_locator.coefficient(i));
    }
    let formal_derivative = Poly::new(derivative_coefficients);

    error_locations
        .iter()
        .map(|&location| {
            let xi_inverse = field.inverse(location);
            let numerator = field.subtract(0, error_evaluator.evaluate_at(xi_inverse));
            let denominator = field.inverse(formal_derivative.evaluate_at(xi_inverse));
            field.multiply(numerator, denominator)
        })
        .collect()
}

/// Compute `ec_count` parity codewords for `codewords`, to be appended after
/// the data so the full stream evaluates to zero at the first `ec_count`
/// powers of the generator.
pub fn generate_ec(codewords: &[i32], ec_count: usize) -> Vec<i32> {
    let field = &*FIELD;

    // generator polynomial: product of (x - 3^i) for i in 1..=ec_count
    let mut generator = vec![1i32];
    for i in 1..=ec_count {
        let root = field.exp(i as i32);
        let mut next = vec![0i32; generator.len() + 1];
        for (j, slot) in next.iter_mut().enumerate() {
            let from_x = if j < generator.len() { generator[j] } else { 0 };
            let from_root = if j > 0 {
                field.multiply(root, generator[j - 1])
            } else {
                0
            };
            *slot = field.subtract(from_x, from_root);
        }
        generator = next;
    }

    // remainder of data(x) * x^ec_count divided by the (monic) generator
    let mut work: Vec<i32> = codewords.to_vec();
    work.extend(std::iter::repeat(0).take(ec_count));
    for i in 0..codewords.len() {
        let factor = work[i];
        if factor == 0 {
            continue;
        }
        for (j, &g) in generator.iter().enumerate() {
            work[i + j] = field.subtract(work[i + j], field.multiply(factor, g));
        }
    }
    work[codewords.len()..]
        .iter()
        .map(|&r| field.subtract(0, r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(data: &[i32], ec_count: usize) -> Vec<i32> {
        let mut full = data.to_vec();
        full.extend(generate_ec(data, ec_count));
        full
    }

    #[test]
    fn test_clean_stream_has_no_errors() {
        let mut full = encoded(&[4, 1, 900, 900], 4);
        assert_eq!(decode(&mut full, 4, &[]), Some(0));
        assert_eq!(&full[..4], &[4, 1, 900, 900]);
    }

    #[test]
    fn test_corrects_two_errors() {
        let data = [8, 27, 901, 344, 13, 900];
        let mut full = encoded(&data, 8);
        full[1] = 555;
        full[4] = 2;
        assert_eq!(decode(&mut full, 8, &[]), Some(2));
        assert_eq!(&full[..6], &data);
    }

    #[test]
    fn test_erasures_not_counted_as_errors() {
        let data = [4, 1, 900, 900];
        let mut full = encoded(&data, 4);
        full[2] = 0;
        assert_eq!(decode(&mut full, 4, &[2]), Some(0));
        assert_eq!(&full[..4], &data);
    }

    #[test]
    fn test_too_many_errors_fail() {
        let data = [4, 1, 900, 900];
        let mut full = encoded(&data, 2);
        full[0] = 100;
        full[1] = 200;
        full[2] = 300;
        // 3 errors with 2 parity symbols cannot converge to the original;
        // either the algorithm fails or it "corrects" into some other valid
        // stream, which the caller's length descriptor check rejects.
        if let Some(_corrected) = decode(&mut full, 2, &[]) {
            assert_ne!(&full[..4], &data);
        }
    }

    #[test]
    fn test_generator_polynomial_degree() {
        assert_eq!(generate_ec(&[1], 64).len(), 64);
    }
}
