use lazy_static::lazy_static;
use regex::Regex;

const FLOAT_TO_INT_MAX: f64 = 9007199254740991_f64;

lazy_static! {
    static ref LEADING_FLOAT_REGEX: Regex =
        Regex::new(r"^[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap();
    static ref LEADING_INT_REGEX: Regex = Regex::new(r"^[+-]?\d+").unwrap();
}

/// Converts a float to an integer, truncating toward zero. Floats with magnitude greater than
/// 2**53 - 1 are refused, since 64-bit floats no longer retain integer precision past that.
pub(crate) fn f64_to_i64_safe(f: f64) -> Option<i64> {
    if f.abs() <= FLOAT_TO_INT_MAX {
        Some(f as i64)
    } else {
        None
    }
}

/// Parses the longest numeric prefix of `s` once leading whitespace is skipped, so that
/// `"\n1.000001 "` reads as `1.000001` and `"12px"` as `12`. Strings without a numeric prefix
/// yield None.
pub(crate) fn parse_float_lenient(s: &str) -> Option<f64> {
    let prefix = LEADING_FLOAT_REGEX.find(s.trim_start())?.as_str();
    match prefix.trim_start_matches(['+', '-']) {
        "Infinity" if prefix.starts_with('-') => Some(f64::NEG_INFINITY),
        "Infinity" => Some(f64::INFINITY),
        _ => prefix.parse().ok(),
    }
}

/// Like [parse_float_lenient] but only the leading integer digits are taken, so
/// `"1700000000.75"` reads as `1700000000`.
pub(crate) fn parse_int_lenient(s: &str) -> Option<f64> {
    LEADING_INT_REGEX
        .find(s.trim_start())
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectral::prelude::*;
    use test_case::test_case;

    #[test_case("1", Some(1.0) ; "integer")]
    #[test_case("1.e0", Some(1.0) ; "trailing dot with exponent")]
    #[test_case("10e-1", Some(1.0) ; "negative exponent")]
    #[test_case("\n1.000001 ", Some(1.000001) ; "surrounding whitespace")]
    #[test_case("  -2.5abc", Some(-2.5) ; "trailing garbage")]
    #[test_case(".5", Some(0.5) ; "leading dot")]
    #[test_case("3e", Some(3.0) ; "dangling exponent")]
    #[test_case("-Infinity", Some(f64::NEG_INFINITY) ; "negative infinity")]
    #[test_case("foo", None ; "not a float")]
    #[test_case("", None ; "empty")]
    #[test_case("   ", None ; "blank")]
    fn lenient_float(input: &str, expected: Option<f64>) {
        assert_that!(parse_float_lenient(input)).is_equal_to(expected);
    }

    #[test_case("1700000000", Some(1700000000.0) ; "whole seconds")]
    #[test_case("1700000000.75", Some(1700000000.0) ; "fraction dropped")]
    #[test_case(" -12", Some(-12.0) ; "negative with whitespace")]
    #[test_case("1e3", Some(1.0) ; "exponent ignored")]
    #[test_case("foo", None ; "not an int")]
    fn lenient_int(input: &str, expected: Option<f64>) {
        assert_that!(parse_int_lenient(input)).is_equal_to(expected);
    }

    #[test]
    fn float_bounds() {
        assert_that!(f64_to_i64_safe(9007199254740991.0)).contains_value(9007199254740991);
        assert_that!(f64_to_i64_safe(9007199254740992.0)).is_none();
        assert_that!(f64_to_i64_safe(-1.99)).contains_value(-1);
    }
}
