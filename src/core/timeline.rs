use chrono::{Datelike, Days, NaiveDate, Weekday};
use rust_decimal::Decimal;
use tracing::debug;

use super::types::{
    Channel, ChannelConfig, ChannelTimeline, DeadlineRule, Latency, PaymentComparison,
    Recommendation,
};
use crate::error::{CalcError, Result};

const DAYS_PER_YEAR: i64 = 365;

pub fn default_min_saving() -> Decimal {
    Decimal::TEN
}

/// Interest accrues daily on the outstanding balance until the payment is
/// credited.
pub fn compare(
    channel_a: &ChannelConfig,
    channel_b: &ChannelConfig,
    amount: Decimal,
    rate: Decimal,
    reference_date: NaiveDate,
    min_saving: Decimal,
) -> Result<PaymentComparison> {
    if amount < Decimal::ZERO {
        return Err(CalcError::InvalidInput(format!(
            "payment amount must be >= 0, got {amount}"
        )));
    }
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(CalcError::InvalidInput(format!(
            "interest rate must be between 0 and 1, got {rate}"
        )));
    }
    if min_saving < Decimal::ZERO {
        return Err(CalcError::InvalidInput(format!(
            "minimum saving must be >= 0, got {min_saving}"
        )));
    }

    let timeline_a = channel_timeline(channel_a, amount, rate, reference_date)?;
    let timeline_b = channel_timeline(channel_b, amount, rate, reference_date)?;

    let days_between = (timeline_b.credited_date - timeline_a.credited_date)
        .num_days()
        .abs();
    let interest_cost_delta = accrued_interest(amount, rate, days_between)?;
    let faster_channel = match timeline_a.credited_date.cmp(&timeline_b.credited_date) {
        std::cmp::Ordering::Less => Some(Channel::A),
        std::cmp::Ordering::Greater => Some(Channel::B),
        std::cmp::Ordering::Equal => None,
    };
    let recommendation = match faster_channel {
        Some(Channel::A) if interest_cost_delta > min_saving => Recommendation::PreferChannelA,
        Some(Channel::B) if interest_cost_delta > min_saving => Recommendation::PreferChannelB,
        _ => Recommendation::EitherAcceptable,
    };

    debug!(
        %reference_date,
        credited_a = %timeline_a.credited_date,
        credited_b = %timeline_b.credited_date,
        %interest_cost_delta,
        ?recommendation,
        "compared payment channels"
    );

    Ok(PaymentComparison {
        reference_date,
        channel_a: timeline_a,
        channel_b: timeline_b,
        days_between,
        interest_cost_delta,
        faster_channel,
        min_saving,
        recommendation,
    })
}

fn channel_timeline(
    config: &ChannelConfig,
    amount: Decimal,
    rate: Decimal,
    reference_date: NaiveDate,
) -> Result<ChannelTimeline> {
    let payment_date = payment_date(config.deadline, reference_date)?;
    let credited_date = credited_date(payment_date, config.latency)?;
    let days_until_credited = (credited_date - reference_date).num_days();
    Ok(ChannelTimeline {
        payment_date,
        credited_date,
        days_until_credited,
        interest_cost: accrued_interest(amount, rate, days_until_credited)?,
    })
}

fn accrued_interest(amount: Decimal, rate: Decimal, days: i64) -> Result<Decimal> {
    amount
        .checked_mul(rate)
        .and_then(|annual| annual.checked_mul(Decimal::from(days)))
        .and_then(|total| total.checked_div(Decimal::from(DAYS_PER_YEAR)))
        .ok_or_else(|| {
            CalcError::InvalidInput(format!("interest on {amount} is out of range"))
        })
}

/// Earliest date a payment can be made on or after `reference_date`. An
/// annual deadline already passed this calendar year rolls to next year.
pub fn payment_date(rule: DeadlineRule, reference_date: NaiveDate) -> Result<NaiveDate> {
    match rule {
        DeadlineRule::Anytime => Ok(reference_date),
        DeadlineRule::AnnualDate { month, day } => {
            let this_year = annual_date(reference_date.year(), month, day)?;
            if this_year >= reference_date {
                Ok(this_year)
            } else {
                annual_date(reference_date.year() + 1, month, day)
            }
        }
    }
}

fn annual_date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        CalcError::InvalidInput(format!("no date {day}/{month} in {year}"))
    })
}

pub fn credited_date(payment_date: NaiveDate, latency: Latency) -> Result<NaiveDate> {
    let out_of_range = || CalcError::InvalidInput("credited date is out of range".to_string());
    match latency {
        Latency::WorkingDays(n) => add_working_days(payment_date, n),
        Latency::CalendarDays(n) => payment_date
            .checked_add_days(Days::new(u64::from(n)))
            .ok_or_else(out_of_range),
        Latency::Weeks(n) => payment_date
            .checked_add_days(Days::new(u64::from(n) * 7))
            .ok_or_else(out_of_range),
    }
}

/// Adds Monday-to-Friday days. Bank holidays are not skipped.
pub fn add_working_days(start: NaiveDate, working_days: u32) -> Result<NaiveDate> {
    let mut date = start;
    let mut remaining = working_days;
    while remaining > 0 {
        date = date
            .succ_opt()
            .ok_or_else(|| CalcError::InvalidInput("date is out of range".to_string()))?;
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    Ok(date)
}
