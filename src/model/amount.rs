//! Amount type for handling monetary values with optional currency symbols.
//!
//! This module provides the `Amount` type which wraps `Decimal` and handles
//! parsing values that may or may not include a currency symbol and commas.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use tracing::warn;

/// Currency symbols that may lead an amount, e.g. `₹1,200.00` or `-$5.00`.
const SYMBOLS: &[char] = &['₹', '$', '€', '£'];

/// The symbol used when an amount is created from a bare `Decimal`.
pub const DEFAULT_SYMBOL: char = '₹';

/// The largest amount that can be stored for an expense, budget or pact: one trillion.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Represents how amounts were (or should be) formatted.
///
/// # Examples
///  - `AmountFormat{ symbol: Some('₹'), commas: true }` -> `-₹60,000.00`
///  - `AmountFormat{ symbol: None, commas: true }` -> `-60,000.00`
///  - `AmountFormat{ symbol: None, commas: false }` -> `-60000.00`
///  - `AmountFormat{ symbol: Some('$'), commas: false }` -> `-$60000.00`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmountFormat {
    /// The currency symbol present in the formatting, if any.
    symbol: Option<char>,
    /// Whether commas are present as thousands separators in the formatting.
    commas: bool,
}

impl Default for AmountFormat {
    fn default() -> Self {
        DEFAULT_FORMAT
    }
}

/// The default format has a rupee sign and commas: e.g. `-₹60,000.00`.
const DEFAULT_FORMAT: AmountFormat = AmountFormat {
    symbol: Some(DEFAULT_SYMBOL),
    commas: true,
};

/// Represents a money amount.
///
/// This type wraps `Decimal` and provides custom serialization/deserialization
/// to handle amounts that may be formatted with or without currency symbols or commas.
///
/// Formatting is considered significant for the purposes of equality, so for numeric comparisons,
/// you should access the `Decimal` value and use that.
///
/// # Examples
///
/// Parsing with a currency symbol:
/// ```
/// # use trip_pact::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("₹50.00").unwrap();
/// assert_eq!(amount.to_string(), "₹50.00");
/// ```
///
/// Parsing without a currency symbol:
/// ```
/// # use trip_pact::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("50.00").unwrap();
/// assert_eq!(amount.to_string(), "50.00");
/// ```
///
/// Value equivalency, but not absolute equivalency
/// ```
/// # use trip_pact::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("5000.00").unwrap();
/// let b = Amount::from_str("₹5,000.00").unwrap();
/// assert_ne!(a, b);
/// assert_eq!(a.value(), b.value());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    /// The parsed numerical value.
    value: Decimal,
    /// The way the numerical value was parsed from, or should be written to, a `String`.
    format: AmountFormat,
}

impl Amount {
    /// Creates a new Amount from a Decimal value with default `String` formatting.
    pub const fn new(value: Decimal) -> Self {
        Self {
            value,
            format: DEFAULT_FORMAT,
        }
    }

    /// Creates a new Amount that will be displayed with `symbol` and commas.
    pub const fn with_symbol(value: Decimal, symbol: char) -> Self {
        Self {
            value,
            format: AmountFormat {
                symbol: Some(symbol),
                commas: true,
            },
        }
    }

    /// Parses `s`, treating anything that is not a number as zero. Used for stored records, which
    /// may hold values that never went through validation.
    pub fn parse_lenient(s: &str) -> Self {
        match Amount::from_str(s) {
            Ok(amount) => amount,
            Err(e) => {
                warn!("Treating malformed amount '{s}' as zero: {e}");
                Amount::default()
            }
        }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value().is_zero()
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.value().is_sign_positive()
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.value().is_sign_negative()
    }

    /// Returns true if the magnitude of the amount is above `MAX_AMOUNT`.
    pub fn exceeds_limit(&self) -> bool {
        self.value().abs() > MAX_AMOUNT
    }
}

/// An error that can occur when parsing strings into `Decimal` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        // Handle empty string
        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        // Remove the currency symbol if present, it may come before or after a minus sign
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (symbol, digits) = match unsigned.strip_prefix(SYMBOLS) {
            Some(rest) => (unsigned.chars().next(), rest),
            None => (None, unsigned),
        };

        // Remove commas (thousand separators)
        let without_commas = digits.replace(',', "");
        let commas = without_commas.len() < digits.len();

        let number = if negative {
            format!("-{without_commas}")
        } else {
            without_commas
        };

        let value = Decimal::from_str(&number).map_err(AmountError)?;
        Ok(Amount {
            value,
            format: AmountFormat { symbol, commas },
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, num) = if self.is_negative() {
            (String::from("-"), self.value().abs())
        } else {
            (String::new(), self.value())
        };

        let symbol = self.format.symbol.map(String::from).unwrap_or_default();

        if self.format.commas {
            write!(
                f,
                "{sign}{symbol}{}",
                format_num::format_num!(",.2", num.to_f64().unwrap_or_default())
            )
        } else {
            write!(f, "{sign}{symbol}{num}")
        }
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
