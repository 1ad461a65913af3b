use chrono::{DateTime, Datelike, NaiveDate};
use solana_program::clock::UnixTimestamp;

use crate::{
    config::RentWindowPolicy,
    error::{EscrowError, Result},
    state::{AgreementId, RentCycle},
};

fn date_of(timestamp: UnixTimestamp) -> Result<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.date_naive())
        .ok_or(EscrowError::ValidationError("timestamp out of range"))
}

fn cycle_of(date: NaiveDate) -> Result<RentCycle> {
    let year = u32::try_from(date.year())
        .map_err(|_| EscrowError::ValidationError("date before year 0"))?;
    Ok(year * 12 + date.month0())
}

/// Cycle of the first due date on or after `start`.
pub fn first_cycle(start: UnixTimestamp, payment_day: u8) -> Result<RentCycle> {
    let date = date_of(start)?;
    let cycle = cycle_of(date)?;
    Ok(if date.day() <= u32::from(payment_day) {
        cycle
    } else {
        cycle + 1
    })
}

/// Cycle of the last due date on or before `end`.
pub fn last_cycle(end: UnixTimestamp, payment_day: u8) -> Result<RentCycle> {
    let date = date_of(end)?;
    let cycle = cycle_of(date)?;
    if date.day() >= u32::from(payment_day) {
        Ok(cycle)
    } else {
        cycle
            .checked_sub(1)
            .ok_or(EscrowError::ValidationError("end date before first cycle"))
    }
}

/// Assigns a payment made at `now` to a rent cycle.
///
/// Payment up to `payment_day + grace_days` settles the current month. After
/// that it either settles the current month late (when the policy allows it)
/// or, if the current month is already settled, pays the next cycle early.
/// Before the first due date only the first cycle can be paid, and only from
/// the month preceding it.
pub struct RentSchedule {
    pub id: AgreementId,
    pub start_date: UnixTimestamp,
    pub end_date: UnixTimestamp,
    pub payment_day: u8,
    pub last_paid_cycle: Option<RentCycle>,
}

impl RentSchedule {
    pub fn cycle_for_payment(
        &self,
        now: UnixTimestamp,
        policy: &RentWindowPolicy,
    ) -> Result<RentCycle> {
        let today = date_of(now)?;
        let current = cycle_of(today)?;
        let first = first_cycle(self.start_date, self.payment_day)?;
        let current_settled = self.last_paid_cycle.map_or(false, |paid| paid >= current);
        let deadline = u32::from(self.payment_day) + u32::from(policy.grace_days);

        let candidate = if current < first {
            // Only the cycle right after the current month may be paid ahead.
            if first > current + 1 {
                return Err(EscrowError::OutOfWindow {
                    id: self.id,
                    reason: "agreement term has not started",
                });
            }
            first
        } else if today.day() <= deadline {
            current
        } else if current_settled {
            current + 1
        } else if policy.allow_late_payment {
            current
        } else {
            return Err(EscrowError::OutOfWindow {
                id: self.id,
                reason: "payment is late for the current cycle",
            });
        };

        if candidate > last_cycle(self.end_date, self.payment_day)? {
            return Err(EscrowError::OutOfWindow {
                id: self.id,
                reason: "agreement term has ended",
            });
        }
        Ok(candidate)
    }
}

#[cfg(test)]
pub(crate) fn timestamp(year: i32, month: u32, day: u32) -> UnixTimestamp {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp()
}
