//! Closed-form time-value-of-money formulas.
//!
//! Stateless functions evaluated in `Decimal`. Every formula has an explicit
//! policy for degenerate inputs (zero horizon, no shortfall, zero rate) and
//! rounds to cents only on the way out.

use rust_decimal::prelude::*;
use rust_decimal::MathematicalOps;

use crate::error::{EngineError, Result};

pub const MONTHS_PER_YEAR: u32 = 12;

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// `(1 + rate)^periods`, or `None` when the power does not fit in a `Decimal`.
fn growth_factor(rate: Decimal, periods: i64) -> Result<Option<Decimal>> {
    let base = Decimal::ONE + rate;
    if base <= Decimal::ZERO {
        return Err(EngineError::InvalidArgument(format!(
            "rate must be greater than -1, got {rate}"
        )));
    }
    Ok(base.checked_powi(periods))
}

fn period_terms(annual_rate: Decimal, years: i32, periods_per_year: u32) -> Result<(Decimal, i64)> {
    if periods_per_year == 0 {
        return Err(EngineError::InvalidArgument(
            "periods_per_year must be at least 1".to_string(),
        ));
    }
    let rate = annual_rate / Decimal::from(periods_per_year);
    let periods = i64::from(years) * i64::from(periods_per_year);
    Ok((rate, periods))
}

/// PV = FV / (1 + r)^n. A goal that is already due needs its full amount.
///
/// A discount factor too large for `Decimal` gives a present value of zero;
/// one that rounds to zero (deeply negative rates) has no finite present
/// value and is an `Overflow`.
pub fn present_value(future_value: Decimal, annual_rate: Decimal, years: i32) -> Result<Decimal> {
    if years <= 0 {
        return Ok(future_value);
    }
    match growth_factor(annual_rate, i64::from(years))? {
        // The discount factor is beyond Decimal range; today's value rounds to nothing.
        None => Ok(Decimal::ZERO),
        Some(factor) if factor.is_zero() => Err(EngineError::Overflow(format!(
            "discount factor underflowed for rate {annual_rate} over {years} years"
        ))),
        Some(factor) => future_value
            .checked_div(factor)
            .map(round_cents)
            .ok_or_else(|| EngineError::Overflow("present value division".to_string())),
    }
}

/// FV = PV * (1 + r)^n, same zero-year policy as [`present_value`].
pub fn future_value(present_value: Decimal, annual_rate: Decimal, years: i32) -> Result<Decimal> {
    if years <= 0 {
        return Ok(present_value);
    }
    let factor = growth_factor(annual_rate, i64::from(years))?.ok_or_else(|| {
        EngineError::Overflow(format!("growth factor for rate {annual_rate} over {years} years"))
    })?;
    present_value
        .checked_mul(factor)
        .map(round_cents)
        .ok_or_else(|| EngineError::Overflow("future value multiplication".to_string()))
}

/// Periodic payment that grows to `shortfall` as an annuity:
/// `P = S * r / ((1 + r)^n - 1)` with `r` the per-period rate.
///
/// At a zero per-period rate the payment is the limit `S / n` rather than
/// zero, so a zero-return goal still reports the contribution it needs.
pub fn required_periodic_contribution(
    shortfall: Decimal,
    annual_rate: Decimal,
    years: i32,
    periods_per_year: u32,
) -> Result<Decimal> {
    if years <= 0 || shortfall <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let (rate, periods) = period_terms(annual_rate, years, periods_per_year)?;
    let straight_line = || round_cents(shortfall / Decimal::from(periods));

    if rate.is_zero() {
        return Ok(straight_line());
    }

    let factor = match growth_factor(rate, periods)? {
        Some(factor) => factor,
        // Compounding dwarfs the shortfall; the payment rounds to zero.
        None => return Ok(Decimal::ZERO),
    };
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Ok(straight_line());
    }

    let payment = shortfall
        .checked_mul(rate)
        .and_then(|numerator| numerator.checked_div(denominator))
        .ok_or_else(|| EngineError::Overflow("annuity payment".to_string()))?;
    Ok(round_cents(payment).max(Decimal::ZERO))
}

/// Monthly form of [`required_periodic_contribution`].
pub fn required_monthly_contribution(
    shortfall: Decimal,
    annual_rate: Decimal,
    years: i32,
) -> Result<Decimal> {
    required_periodic_contribution(shortfall, annual_rate, years, MONTHS_PER_YEAR)
}

/// Future value of equal contributions paid at the start of each period
/// before that period's growth: `FV = C * ((1 + r)^n - 1) / r * (1 + r)`.
pub fn future_value_of_contributions(
    periodic_amount: Decimal,
    annual_rate: Decimal,
    years: i32,
    periods_per_year: u32,
) -> Result<Decimal> {
    if years <= 0 {
        return Ok(Decimal::ZERO);
    }
    let (rate, periods) = period_terms(annual_rate, years, periods_per_year)?;
    if rate.is_zero() {
        return periodic_amount
            .checked_mul(Decimal::from(periods))
            .map(round_cents)
            .ok_or_else(|| EngineError::Overflow("straight-line contributions".to_string()));
    }

    let factor = growth_factor(rate, periods)?.ok_or_else(|| {
        EngineError::Overflow(format!("growth factor for rate {rate} over {periods} periods"))
    })?;
    (factor - Decimal::ONE)
        .checked_div(rate)
        .and_then(|annuity| annuity.checked_mul(Decimal::ONE + rate))
        .and_then(|annuity| annuity.checked_mul(periodic_amount))
        .map(round_cents)
        .ok_or_else(|| EngineError::Overflow("annuity future value".to_string()))
}

/// CoastFIRE number: what must be invested today so that, with no further
/// contributions, the pot grows to `target_amount` by retirement.
pub fn coast_fire_number(
    target_amount: Decimal,
    current_age: u32,
    retirement_age: u32,
    annual_rate: Decimal,
) -> Result<Decimal> {
    let years = i64::from(retirement_age) - i64::from(current_age);
    let years = i32::try_from(years).map_err(|_| {
        EngineError::InvalidArgument(format!(
            "age span {current_age}..{retirement_age} is out of range"
        ))
    })?;
    present_value(target_amount, annual_rate, years)
}
