//! Price text to whole-peso integer.

use canasta_core::PriceFormat;

/// Normalizes a scraped price string.
///
/// With [`PriceFormat::Digits`] every non-digit is dropped, so `"$ 1.990"`
/// becomes `1990`. With [`PriceFormat::Decimal`] the text is read as a
/// machine number (`"1990.0"`, `"1.99e3"`) and its integer part kept; a
/// negative, zero or non-finite value yields `0`.
///
/// `digit_limit` keeps only the first N digits before parsing. On sites that
/// render thousands separators this turns `"$ 12.990"` into `1299`; the
/// limit exists to match prices already exported with it.
///
/// No digits, or a value that does not fit in `u64`, yields `0`.
#[must_use]
pub fn normalize_price(raw: &str, format: PriceFormat, digit_limit: Option<usize>) -> u64 {
    let digits: String = match format {
        PriceFormat::Digits => raw.chars().filter(char::is_ascii_digit).collect(),
        PriceFormat::Decimal => match decimal_whole_part(raw) {
            Some(whole) => whole.to_string(),
            None => return 0,
        },
    };

    let digits = match digit_limit {
        Some(limit) => &digits[..digits.len().min(limit)],
        None => digits.as_str(),
    };

    digits.parse().unwrap_or(0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn decimal_whole_part(raw: &str) -> Option<u64> {
    let value: f64 = raw.trim().replace(',', ".").parse().ok()?;
    if !value.is_finite() || value <= 0.0 || value >= u64::MAX as f64 {
        return None;
    }
    Some(value.trunc() as u64)
}
