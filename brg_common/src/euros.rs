use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

pub const CURRENCY_CODE: &str = "EUR";
pub const CURRENCY_CODE_LOWER: &str = "eur";

//--------------------------------------       Euros        -----------------------------------------------------------
/// A whole-euro amount, as stored in the orders and payments tables.
///
/// Payment providers deal in minor units (cents); the store keeps whole euros, so conversions round to the nearest
/// euro, matching the rounding the storefront applies when it quotes prices.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Euros(i64);

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in euros: {0}")]
pub struct EurosConversionError(String);

impl Euros {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Convert an amount in minor units (cents) to whole euros, rounding to the nearest euro.
    pub fn from_cents(cents: i64) -> Self {
        Self((cents as f64 / 100.0).round() as i64)
    }

    /// The amount in minor units (cents), as payment providers expect it.
    pub fn to_cents(&self) -> i64 {
        self.0 * 100
    }
}

impl From<i64> for Euros {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Euros {
    type Error = EurosConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(EurosConversionError(format!("Value {value} is too large to convert to Euros")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Add for Euros {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Euros {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Euros {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl Display for Euros {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}€", self.0)
    }
}
