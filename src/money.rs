use std::{fmt, str::FromStr};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::{EscrowError, Result};

/// Number of fractional digits carried by [`MonetaryAmount`].
pub const DECIMALS: u32 = 6;

/// Minor units per whole unit of the settlement asset.
pub const UNIT: u64 = 10u64.pow(DECIMALS);

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Non-negative fixed-point amount, stored as an integer count of minor units
/// (10^-6 of the settlement asset). All arithmetic is checked.
#[derive(
    BorshSerialize,
    BorshDeserialize,
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub struct MonetaryAmount(u64);

impl MonetaryAmount {
    pub const ZERO: MonetaryAmount = MonetaryAmount(0);

    pub const fn from_minor(units: u64) -> Self {
        MonetaryAmount(units)
    }

    pub fn from_major(whole: u64) -> Result<Self> {
        whole
            .checked_mul(UNIT)
            .map(MonetaryAmount)
            .ok_or(EscrowError::ArithmeticOverflow)
    }

    pub const fn minor_units(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: MonetaryAmount) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(MonetaryAmount)
            .ok_or(EscrowError::ArithmeticOverflow)
    }

    pub fn checked_sub(self, other: MonetaryAmount) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(MonetaryAmount)
            .ok_or(EscrowError::ArithmeticOverflow)
    }

    /// `self * numerator / denominator`, rounded down, computed in 128 bits.
    pub fn mul_div_floor(self, numerator: u128, denominator: u128) -> Result<Self> {
        if denominator == 0 {
            return Err(EscrowError::ArithmeticOverflow);
        }
        let scaled = u128::from(self.0)
            .checked_mul(numerator)
            .ok_or(EscrowError::ArithmeticOverflow)?
            / denominator;
        u64::try_from(scaled)
            .map(MonetaryAmount)
            .map_err(|_| EscrowError::ArithmeticOverflow)
    }

    /// Basis-point share of this amount, rounded down.
    pub fn bps(self, bps: u16) -> Result<Self> {
        self.mul_div_floor(u128::from(bps), u128::from(BPS_DENOMINATOR))
    }
}

impl fmt::Display for MonetaryAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        let digits = format!("{:0width$}", frac, width = DECIMALS as usize);
        let trimmed = digits.trim_end_matches('0');
        // Always show cents.
        let shown = if trimmed.len() < 2 { &digits[..2] } else { trimmed };
        write!(f, "{}.{}", whole, shown)
    }
}

impl FromStr for MonetaryAmount {
    type Err = EscrowError;

    /// Parses a plain decimal such as `"1500"` or `"1500.25"`. More than
    /// [`DECIMALS`] fractional digits is rejected rather than rounded.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = EscrowError::ValidationError("malformed monetary amount");
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || frac.len() > DECIMALS as usize {
            return Err(invalid);
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid);
        }
        let whole: u64 = whole.parse().map_err(|_| EscrowError::ArithmeticOverflow)?;
        let frac_units: u64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
            padded.parse().map_err(|_| invalid)?
        };
        MonetaryAmount::from_major(whole)?.checked_add(MonetaryAmount(frac_units))
    }
}
