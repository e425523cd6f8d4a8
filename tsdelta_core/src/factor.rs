//! Common-factor (GCD) engine.
//!
//! Every typed factor computation reduces to these functions once its values
//! are lifted onto unsigned magnitudes: integers by absolute value, floats by
//! bit pattern, decimals by mantissa at a common scale, time values by ticks.

/// Euclid's algorithm. `gcd(0, 0) == 0`.
pub fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Greatest common divisor of a sequence of magnitudes.
///
/// Leading zeros are skipped and the first non-zero value seeds the factor.
/// Values already divisible by the running factor, and repeats of the previous
/// value, cost no GCD step; the scan stops as soon as the factor reaches 1.
/// An empty or all-zero sequence yields 1.
pub fn common_factor<I>(values: I) -> u128
where
    I: IntoIterator<Item = u128>,
{
    let mut iter = values.into_iter();
    let mut factor = match iter.by_ref().find(|&v| v != 0) {
        Some(v) => v,
        None => return 1,
    };
    let mut previous = factor;
    for v in iter {
        if factor == 1 {
            break;
        }
        if v != previous && v % factor != 0 {
            factor = gcd(factor, v);
        }
        previous = v;
    }
    factor
}
