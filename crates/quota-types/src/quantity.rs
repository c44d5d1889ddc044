//! Resource quantities
//!
//! Usage and limits travel as Kubernetes-style quantity strings such as
//! `"500m"`, `"2Gi"` or `"1e3"`. A [`Quantity`] keeps the original text for
//! status output and the parsed value for percentage math.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A parsed resource quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuantityRepr", into = "String")]
pub struct Quantity {
    text: String,
    value: f64,
}

/// Wire form: either a quantity string or a bare number
#[derive(Deserialize)]
#[serde(untagged)]
enum QuantityRepr {
    Text(String),
    Number(f64),
}

impl TryFrom<QuantityRepr> for Quantity {
    type Error = ConfigError;

    fn try_from(repr: QuantityRepr) -> Result<Self, Self::Error> {
        match repr {
            QuantityRepr::Text(text) => text.parse(),
            QuantityRepr::Number(value) if value.is_finite() => Ok(Self::from_value(value)),
            QuantityRepr::Number(value) => Err(ConfigError::InvalidQuantity(value.to_string())),
        }
    }
}

impl From<Quantity> for String {
    fn from(quantity: Quantity) -> Self {
        quantity.text
    }
}

impl Quantity {
    /// Build a quantity from a plain numeric value
    pub fn from_value(value: f64) -> Self {
        Self {
            text: format_value(value),
            value,
        }
    }

    /// Numeric value in base units
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Original textual form
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Percentage of `limit` this quantity represents, rounded to the
    /// nearest integer. `None` when the limit is zero or negative.
    pub fn percent_of(&self, limit: &Quantity) -> Option<u32> {
        if !(limit.value > 0.0) || !self.value.is_finite() {
            return None;
        }
        let percent = (self.value / limit.value * 100.0).round();
        if percent <= 0.0 {
            Some(0)
        } else if percent >= u32::MAX as f64 {
            Some(u32::MAX)
        } else {
            Some(percent as u32)
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Quantity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || ConfigError::InvalidQuantity(s.to_string());

        let split = text
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '+' || *c == '-'))))
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        let (number, suffix) = text.split_at(split);
        if number.is_empty() || number == "+" || number == "-" {
            return Err(invalid());
        }
        let base: f64 = number.parse().map_err(|_| invalid())?;

        let multiplier = match suffix {
            "" => 1.0,
            "n" => 1e-9,
            "u" => 1e-6,
            "m" => 1e-3,
            "k" => 1e3,
            "M" => 1e6,
            "G" => 1e9,
            "T" => 1e12,
            "P" => 1e15,
            "E" => 1e18,
            "Ki" => 1024.0,
            "Mi" => 1024.0_f64.powi(2),
            "Gi" => 1024.0_f64.powi(3),
            "Ti" => 1024.0_f64.powi(4),
            "Pi" => 1024.0_f64.powi(5),
            "Ei" => 1024.0_f64.powi(6),
            exp if exp.starts_with(['e', 'E']) => {
                let power: i32 = exp[1..].parse().map_err(|_| invalid())?;
                10f64.powi(power)
            }
            _ => return Err(invalid()),
        };

        // Values must stay finite for percentage math
        let value = base * multiplier;
        if !value.is_finite() {
            return Err(invalid());
        }

        Ok(Self {
            text: text.to_string(),
            value,
        })
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(q("10").value(), 10.0);
        assert_eq!(q("500m").value(), 0.5);
        assert_eq!(q("2k").value(), 2000.0);
        assert_eq!(q("1Ki").value(), 1024.0);
        assert_eq!(q("2Gi").value(), 2.0 * 1024.0 * 1024.0 * 1024.0);
        assert_eq!(q("1.5").value(), 1.5);
        assert_eq!(q("1e3").value(), 1000.0);
        assert_eq!(q("1E").value(), 1e18);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Quantity>().is_err());
        assert!("abc".parse::<Quantity>().is_err());
        assert!("10Xi".parse::<Quantity>().is_err());
        assert!("1e".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!("1e400".parse::<Quantity>().is_err());
        assert!("9".repeat(400).parse::<Quantity>().is_err());
        assert!("1e300Ei".parse::<Quantity>().is_err());
        assert!("1e300".parse::<Quantity>().is_ok());

        let huge: Result<Quantity, _> = serde_json::from_str(&"9".repeat(400));
        assert!(huge.is_err());
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(q("850m").percent_of(&q("1")), Some(85));
        assert_eq!(q("3Gi").percent_of(&q("4Gi")), Some(75));
        assert_eq!(q("2").percent_of(&q("3")), Some(67));
        assert_eq!(q("12").percent_of(&q("10")), Some(120));
        assert_eq!(q("1").percent_of(&q("0")), None);
    }

    #[test]
    fn test_serde_accepts_numbers_and_strings() {
        let from_str: Quantity = serde_json::from_str("\"750m\"").unwrap();
        assert_eq!(from_str.as_str(), "750m");

        let from_num: Quantity = serde_json::from_str("42").unwrap();
        assert_eq!(from_num.value(), 42.0);
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"42\"");

        assert!(serde_json::from_str::<Quantity>("\"bogus\"").is_err());
    }
}
