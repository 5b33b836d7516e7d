use std::fmt;

/// Money is represented as integer cents to avoid floating-point drift.
/// 1 rupee = 100 paise, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Format cents as a human-readable amount string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, input) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    let (units_str, decimal_str) = input.split_once('.').unwrap_or((input, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (units_str.is_empty() && decimal_str.is_empty())
        || !all_digits(units_str)
        || !all_digits(decimal_str)
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?
    };

    // Pad or truncate the fractional part to two digits
    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => {
            decimal_str
                .parse::<i64>()
                .map_err(|_| ParseCentsError::InvalidFormat)?
                * 10
        }
        _ => decimal_str[..2]
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::OutOfRange)?;
    Ok(if negative { -cents } else { cents })
}

/// Convert a JSON-style decimal number into cents, rounding half away from zero.
pub fn decimal_to_cents(value: f64) -> Result<Cents, ParseCentsError> {
    if !value.is_finite() {
        return Err(ParseCentsError::InvalidFormat);
    }
    let scaled = (value * 100.0).round();
    if scaled.abs() > i64::MAX as f64 {
        return Err(ParseCentsError::OutOfRange);
    }
    Ok(scaled as Cents)
}

pub fn cents_to_decimal(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    OutOfRange,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::OutOfRange => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Serde adapter: amounts travel as decimal numbers on the wire and live as
/// cents in memory. Accepts numbers, numeric strings and `null` (zero).
pub mod amount {
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    use super::{cents_to_decimal, decimal_to_cents, parse_cents, Cents};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Int(i64),
        Float(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(cents_to_decimal(*cents))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        match Option::<RawAmount>::deserialize(deserializer)? {
            None => Ok(0),
            Some(RawAmount::Int(units)) => units
                .checked_mul(100)
                .ok_or_else(|| de::Error::custom("amount out of range")),
            Some(RawAmount::Float(value)) => decimal_to_cents(value).map_err(de::Error::custom),
            Some(RawAmount::Text(text)) if text.trim().is_empty() => Ok(0),
            Some(RawAmount::Text(text)) => parse_cents(&text).map_err(de::Error::custom),
        }
    }

    /// Same as the parent module, for optional fields in partial updates.
    pub mod option {
        use serde::de::Deserializer;
        use serde::{Deserialize, Serializer};

        use super::super::Cents;

        pub fn serialize<S: Serializer>(
            cents: &Option<Cents>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match cents {
                Some(c) => super::serialize(c, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Cents>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(deserialize_with = "super::deserialize")] Cents);

            Wrapper::deserialize(deserializer).map(|w| Some(w.0))
        }
    }
}
