use solana_program::clock::UnixTimestamp;

use crate::{
    error::{EscrowError, Result},
    money::{MonetaryAmount, BPS_DENOMINATOR},
};

pub const SECONDS_PER_DAY: i64 = 86_400;
pub const DAYS_PER_YEAR: u64 = 365;

/// `principal * annual_rate / 365 * elapsed_days`, rate in basis points,
/// rounded down once at the end.
pub fn simple_interest(
    principal: MonetaryAmount,
    annual_rate_bps: u32,
    elapsed_days: u64,
) -> Result<MonetaryAmount> {
    let numerator = u128::from(annual_rate_bps)
        .checked_mul(u128::from(elapsed_days))
        .ok_or(EscrowError::ArithmeticOverflow)?;
    principal.mul_div_floor(
        numerator,
        u128::from(BPS_DENOMINATOR) * u128::from(DAYS_PER_YEAR),
    )
}

/// Whole days between two timestamps. A negative span is a clock rollback.
pub fn elapsed_days(from: UnixTimestamp, to: UnixTimestamp) -> Result<u64> {
    if to < from {
        return Err(EscrowError::ClockRollback { last: from, now: to });
    }
    Ok(((to - from) / SECONDS_PER_DAY) as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accrual {
    pub total_days: u64,
    pub increment: MonetaryAmount,
}

#[derive(Debug, Clone, Copy)]
pub struct YieldAccrualModel {
    annual_rate_bps: u32,
}

impl YieldAccrualModel {
    pub fn new(annual_rate_bps: u32) -> Self {
        YieldAccrualModel { annual_rate_bps }
    }

    pub fn accrued(&self, principal: MonetaryAmount, elapsed_days: u64) -> Result<MonetaryAmount> {
        simple_interest(principal, self.annual_rate_bps, elapsed_days)
    }

    /// Advances accrual from `accrued_days` (counted from `anchor`) up to
    /// `min(now, horizon)`. The increment is taken as the difference of the
    /// cumulative totals, so small ticks do not lose rounding remainders.
    pub fn advance(
        &self,
        principal: MonetaryAmount,
        anchor: UnixTimestamp,
        accrued_days: u64,
        last_accrual: Option<UnixTimestamp>,
        now: UnixTimestamp,
        horizon: UnixTimestamp,
    ) -> Result<Accrual> {
        if let Some(last) = last_accrual {
            if now < last {
                return Err(EscrowError::ClockRollback { last, now });
            }
        }
        let until = now.min(horizon);
        let total_days = if until <= anchor {
            0
        } else {
            elapsed_days(anchor, until)?
        };
        if total_days <= accrued_days {
            return Ok(Accrual {
                total_days: accrued_days,
                increment: MonetaryAmount::ZERO,
            });
        }
        let before = self.accrued(principal, accrued_days)?;
        let after = self.accrued(principal, total_days)?;
        Ok(Accrual {
            total_days,
            increment: after.checked_sub(before)?,
        })
    }
}
