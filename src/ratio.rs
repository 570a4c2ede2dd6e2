// Part of ethercat-pdomap. Copyright 2018-2024 by the authors.
// This work is dual-licensed under Apache 2.0 and MIT terms.

//! Ratio-valued modparams such as `encoderRatio` or `feedRatio`.
//!
//! A ratio is written either as `<num>/<den>` (or `<num>:<den>`), or as a
//! decimal number which is replaced by its best rational approximation.

use crate::types::{Error, Result};
use num_traits::ToPrimitive;

/// Default bound on the denominator of approximated ratios.
pub const DEFAULT_MAX_DENOMINATOR: u32 = 1 << 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    pub numerator: i32,
    pub denominator: u32,
}

impl Ratio {
    pub fn as_f64(&self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

/// Parses `text` into a ratio; decimals get a denominator of at most `max_denominator`.
pub fn decode_ratio(text: &str, max_denominator: u32) -> Result<Ratio> {
    let text = text.trim();
    let invalid = || Error::InvalidRatio(text.to_string());

    let ratio = if let Some(pos) = text.find(&['/', ':'][..]) {
        let numerator = text[..pos].trim().parse::<i32>().map_err(|_| invalid())?;
        let denominator = text[pos + 1..].trim().parse::<u32>().map_err(|_| invalid())?;
        Ratio {
            numerator,
            denominator,
        }
    } else {
        let x = text.parse::<f64>().map_err(|_| invalid())?;
        if !x.is_finite() || max_denominator == 0 {
            return Err(invalid());
        }
        let (n, d) = approximate(x.abs(), i64::from(max_denominator));
        if d == 0 {
            return Err(invalid());
        }
        let n = if x < 0.0 { -n } else { n };
        Ratio {
            numerator: n.to_i32().ok_or_else(invalid)?,
            denominator: d.to_u32().ok_or_else(invalid)?,
        }
    };

    if ratio.numerator == 0 || ratio.denominator == 0 {
        log::warn!("ratio {:?} has a zero part, this is probably a configuration error", text);
    }
    Ok(ratio)
}

/// Best rational approximation of `x >= 0` by its continued fraction
/// convergents, with the denominator bounded by `max_denominator`.
fn approximate(mut x: f64, max_denominator: i64) -> (i64, i64) {
    // [[m00, m01], [m10, m11]], the last two convergents.
    let (mut m00, mut m01, mut m10, mut m11) = (1i64, 0i64, 0i64, 1i64);
    loop {
        let ai = match x.to_i64() {
            Some(ai) => ai,
            None => break,
        };
        let den = match m10.checked_mul(ai).and_then(|v| v.checked_add(m11)) {
            Some(den) if den <= max_denominator => den,
            _ => break,
        };
        let num = match m00.checked_mul(ai).and_then(|v| v.checked_add(m01)) {
            Some(num) => num,
            None => break,
        };
        m01 = m00;
        m00 = num;
        m11 = m10;
        m10 = den;
        if x == ai as f64 {
            break;
        }
        x = 1.0 / (x - ai as f64);
        if x > f64::from(i32::MAX) {
            break;
        }
    }
    (m00, m10)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(text: &str, max: u32) -> (i32, u32) {
        let r = decode_ratio(text, max).unwrap();
        (r.numerator, r.denominator)
    }

    #[test]
    fn explicit_ratios_are_verbatim() {
        let max = DEFAULT_MAX_DENOMINATOR;
        assert_eq!(ratio("1/2", max), (1, 2));
        assert_eq!(ratio("3:4", max), (3, 4));
        assert_eq!(ratio("3:2", max), (3, 2));
        assert_eq!(ratio("86400/3600", max), (86400, 3600));
        assert_eq!(ratio("-10:3", max), (-10, 3));
        for max in &[3, 4, 1000, u32::MAX] {
            assert_eq!(ratio("4000/3", *max), (4000, 3));
        }
    }

    #[test]
    fn zero_parts_are_returned() {
        let _ = env_logger::builder().is_test(true).try_init();
        assert_eq!(ratio("0/5", 100), (0, 5));
        assert_eq!(ratio("5:0", 100), (5, 0));
    }

    #[test]
    fn decimals() {
        let max = DEFAULT_MAX_DENOMINATOR;
        assert_eq!(ratio("3", max), (3, 1));
        assert_eq!(ratio("5.2", max), (26, 5));
        assert_eq!(ratio("3355443.2", max), (16_777_216, 5));
        assert_eq!(ratio("0.25", 1000), (1, 4));
        assert_eq!(ratio("0.1", 1000), (1, 10));
        assert_eq!(ratio("-1.5", 100), (-3, 2));
        assert_eq!(ratio("2.5", 1), (2, 1));
    }

    #[test]
    fn pi_convergents() {
        let pi = std::f64::consts::PI.to_string();
        assert_eq!(ratio(&pi, 1000), (355, 113));
        assert_eq!(ratio(&pi, 100), (22, 7));
        assert_eq!(ratio("3.14159265", 1000), (355, 113));
        let r = decode_ratio(&pi, 1000).unwrap();
        assert!((r.as_f64() - std::f64::consts::PI).abs() < 3e-7);
    }

    #[test]
    fn exact_rationals_round_trip() {
        for &(n, d) in &[(1, 3), (7, 8), (22, 7), (123, 457), (-5, 16)] {
            let x = f64::from(n) / f64::from(d);
            let r = decode_ratio(&x.to_string(), 1000).unwrap();
            assert_eq!((r.numerator, r.denominator), (n, d as u32));
        }
    }

    #[test]
    fn garbage_is_rejected() {
        for text in &["", "abc", "1/x", "1/-2", "nan", "inf", "1e30"] {
            assert!(
                matches!(decode_ratio(text, 1000), Err(Error::InvalidRatio(_))),
                "{}",
                text
            );
        }
    }
}
