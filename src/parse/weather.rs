// src/parse/weather.rs
use std::str::FromStr;

use once_cell::sync::OnceCell;
use regex::Regex;
use rust_decimal::Decimal;

use crate::parse::xml::descendants;

/// Why no temperature came out of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherSkip {
    Malformed(String),
    MissingField,
    NonNumeric(String),
    OutOfRange(Decimal),
}

impl std::fmt::Display for WeatherSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherSkip::Malformed(e) => write!(f, "malformed xml: {e}"),
            WeatherSkip::MissingField => f.write_str("no temperature_string element"),
            WeatherSkip::NonNumeric(s) => write!(f, "no leading number in {s:?}"),
            WeatherSkip::OutOfRange(v) => write!(f, "{v} F cannot be converted"),
        }
    }
}

/// Read `temperature_string` (e.g. `"75.0 F (23.9 C)"`) and return degrees
/// Celsius rounded to one decimal place.
pub fn temperature_celsius(xml: &str) -> Result<Decimal, WeatherSkip> {
    let found = descendants(xml, "temperature_string")
        .map_err(|e| WeatherSkip::Malformed(e.to_string()))?;
    let text = found
        .into_iter()
        .next()
        .map(|el| el.text)
        .filter(|s| !s.trim().is_empty())
        .ok_or(WeatherSkip::MissingField)?;

    let fahrenheit =
        leading_number(&text).ok_or_else(|| WeatherSkip::NonNumeric(text.clone()))?;
    fahrenheit_to_celsius(fahrenheit).ok_or(WeatherSkip::OutOfRange(fahrenheit))
}

/// `(f - 32) * 5 / 9`, one decimal place. `None` when the reading is too
/// large for the arithmetic.
pub fn fahrenheit_to_celsius(f: Decimal) -> Option<Decimal> {
    f.checked_sub(Decimal::from(32))?
        .checked_mul(Decimal::from(5))?
        .checked_div(Decimal::from(9))
        .map(|c| c.round_dp(1))
}

/// The numeric token at the start of `s`, ignoring whatever follows it.
pub fn leading_number(s: &str) -> Option<Decimal> {
    static RE_LEADING: OnceCell<Regex> = OnceCell::new();
    let re = RE_LEADING
        .get_or_init(|| Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap());
    let token = re.captures(s)?.get(1)?.as_str();
    Decimal::from_str(token)
        .or_else(|_| Decimal::from_scientific(token))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_number_ignores_suffix() {
        assert_eq!(leading_number("75.0 F (23.9 C)"), Some(Decimal::new(750, 1)));
        assert_eq!(leading_number("-4 F"), Some(Decimal::from(-4)));
        assert_eq!(leading_number("  12.5F"), Some(Decimal::new(125, 1)));
        assert_eq!(leading_number("NA"), None);
        assert_eq!(leading_number(""), None);
    }

    #[test]
    fn conversion_rounds_to_one_place() {
        assert_eq!(fahrenheit_to_celsius(Decimal::from(32)), Some(Decimal::ZERO));
        assert_eq!(fahrenheit_to_celsius(Decimal::from(212)), Some(Decimal::from(100)));
        assert_eq!(
            fahrenheit_to_celsius(Decimal::new(750, 1)),
            Some(Decimal::new(239, 1))
        );
    }

    #[test]
    fn extreme_readings_do_not_overflow() {
        assert_eq!(fahrenheit_to_celsius(Decimal::MAX), None);
        assert_eq!(fahrenheit_to_celsius(Decimal::MIN), None);
    }

    #[test]
    fn missing_field_is_reported() {
        let xml = "<current_observation><temp_f>75.0</temp_f></current_observation>";
        assert_eq!(temperature_celsius(xml), Err(WeatherSkip::MissingField));
    }
}
