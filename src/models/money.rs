//! Money type for representing currency amounts
//!
//! Internally stores amounts as a signed count of 10⁻⁴ currency units in an
//! i64, so every stored or summed value is an exact multiple of 0.0001 and no
//! floating point is involved. Provides exact arithmetic, rational
//! multiplication for proration, and formatting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Number of internal units per whole currency unit (4 fractional digits)
const SCALE: i64 = 10_000;

/// A monetary amount with 4 fractional decimal digits
///
/// Arithmetic whose true result needs more than 4 fractional digits rounds
/// half-away-from-zero. Proration helpers distribute any remainder onto the
/// final share so a set of shares always sums exactly to the dividend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a Money amount from raw 10⁻⁴ units
    ///
    /// # Examples
    /// ```
    /// use paycycle::models::Money;
    /// let amount = Money::from_raw(105_000); // $10.50
    /// ```
    pub const fn from_raw(units: i64) -> Self {
        Self(units)
    }

    /// Create a Money amount from whole cents
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents * 100)
    }

    /// Create a Money amount from whole currency units
    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars * SCALE)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in raw 10⁻⁴ units
    pub const fn raw(&self) -> i64 {
        self.0
    }

    /// Get the whole currency-unit portion (truncated toward zero)
    pub const fn dollars(&self) -> i64 {
        self.0 / SCALE
    }

    /// Get the fractional portion in 10⁻⁴ units (0-9999)
    pub const fn frac_part(&self) -> i64 {
        (self.0 % SCALE).abs()
    }

    /// Check if the amount is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is positive
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Check if the amount is negative
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Get the absolute value
    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Multiply by the rational `num / den`, rounding half-away-from-zero
    /// to 4 fractional digits
    ///
    /// Intermediate math runs in i128, so proration of any realistic amount
    /// cannot overflow. `den` must be nonzero.
    pub fn mul_rational(self, num: i64, den: i64) -> Self {
        assert!(den != 0, "mul_rational denominator must be nonzero");
        let prod = self.0 as i128 * num as i128;
        let den = den as i128;
        let mut quot = prod / den;
        let rem = prod % den;
        if rem != 0 && rem.abs() * 2 >= den.abs() {
            // Round the half step away from zero, in the direction of the
            // true quotient's sign.
            quot += if (prod < 0) == (den < 0) { 1 } else { -1 };
        }
        Self(quot as i64)
    }

    /// Split into weighted shares that sum exactly to `self`
    ///
    /// Each share except the last is `self * weight / total_weight` rounded
    /// half-away-from-zero; the final share absorbs whatever remainder is
    /// left so the shares always balance. The weight total must be nonzero.
    pub fn split_weighted(self, weights: &[u32]) -> Vec<Money> {
        if weights.is_empty() {
            return Vec::new();
        }
        let total_weight: i64 = weights.iter().map(|w| i64::from(*w)).sum();
        assert!(total_weight > 0, "split_weighted needs a positive weight total");

        let mut shares = Vec::with_capacity(weights.len());
        let mut allocated = Money::zero();
        for weight in &weights[..weights.len() - 1] {
            let share = self.mul_rational(i64::from(*weight), total_weight);
            allocated += share;
            shares.push(share);
        }
        shares.push(self - allocated);
        shares
    }

    /// Split into `parts` equal shares, remainder on the last share
    pub fn split_even(self, parts: usize) -> Vec<Money> {
        self.split_weighted(&vec![1; parts])
    }

    /// Parse a money amount from a string
    ///
    /// Accepts formats: "10.50", "-10.50", "$10.50", "10", "0.0125".
    /// At most 4 fractional digits are accepted; more is an error rather
    /// than a silent truncation.
    pub fn parse(s: &str) -> Result<Self, MoneyParseError> {
        let s = s.trim();

        let (negative, s) = if let Some(stripped) = s.strip_prefix('-') {
            (true, stripped)
        } else {
            (false, s)
        };

        let s = s.strip_prefix('$').unwrap_or(s);
        if s.is_empty() {
            return Err(MoneyParseError::InvalidFormat(s.to_string()));
        }

        let units = if let Some((whole, frac)) = s.split_once('.') {
            if frac.len() > 4 {
                return Err(MoneyParseError::TooPrecise(s.to_string()));
            }
            let whole: i64 = if whole.is_empty() {
                0
            } else {
                whole
                    .parse()
                    .map_err(|_| MoneyParseError::InvalidFormat(s.to_string()))?
            };
            let mut padded = frac.to_string();
            while padded.len() < 4 {
                padded.push('0');
            }
            let frac: i64 = padded
                .parse()
                .map_err(|_| MoneyParseError::InvalidFormat(s.to_string()))?;
            whole * SCALE + frac
        } else {
            // Integer format - whole currency units
            s.parse::<i64>()
                .map_err(|_| MoneyParseError::InvalidFormat(s.to_string()))?
                * SCALE
        };

        Ok(Self(if negative { -units } else { units }))
    }

    /// Format with a currency symbol
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        if self.0 % 100 == 0 {
            format!("{}{}{}.{:02}", sign, symbol, self.dollars().abs(), self.frac_part() / 100)
        } else {
            format!("{}{}{}.{:04}", sign, symbol, self.dollars().abs(), self.frac_part())
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_with_symbol("$"))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Error type for money parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    InvalidFormat(String),
    TooPrecise(String),
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyParseError::InvalidFormat(s) => write!(f, "Invalid money format: {}", s),
            MoneyParseError::TooPrecise(s) => {
                write!(f, "More than 4 fractional digits: {}", s)
            }
        }
    }
}

impl std::error::Error for MoneyParseError {}
