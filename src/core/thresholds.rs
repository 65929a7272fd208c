use rust_decimal::Decimal;
use tracing::debug;

use super::plans::official_threshold;
use super::types::{LoanPlan, PayPeriod, PeriodThreshold, TaxYear, round_pounds};
use crate::error::{CalcError, Result};

/// HMRC publishes some period thresholds that are not the rounded quotient of
/// the annual figure; those take precedence and the gap is reported as
/// `rounding_difference`.
pub fn period_threshold(
    plan: &LoanPlan,
    period: PayPeriod,
    tax_year: TaxYear,
) -> Result<PeriodThreshold> {
    let periods_per_year = period.periods_per_year();
    let calculated = match period {
        PayPeriod::Annually => plan.annual_threshold,
        _ => round_pounds(plan.annual_threshold / Decimal::from(periods_per_year)),
    };
    let official = official_threshold(tax_year, plan.id, period);
    let threshold = official.unwrap_or(calculated);

    if threshold <= Decimal::ZERO {
        return Err(CalcError::InvalidInput(format!(
            "{} {} threshold must be > 0 in {tax_year}",
            plan.id, period
        )));
    }

    let rounding_difference = official.map_or(Decimal::ZERO, |o| o - calculated);
    if !rounding_difference.is_zero() {
        debug!(
            plan = %plan.id,
            period = %period,
            %calculated,
            %threshold,
            "official period threshold overrides calculated value"
        );
    }

    Ok(PeriodThreshold {
        plan: plan.id,
        period,
        periods_per_year,
        annual_threshold: plan.annual_threshold,
        calculated,
        official,
        threshold,
        rounding_difference,
    })
}

pub fn threshold_table(plan: &LoanPlan, tax_year: TaxYear) -> Result<Vec<PeriodThreshold>> {
    PayPeriod::ALL
        .into_iter()
        .map(|period| period_threshold(plan, period, tax_year))
        .collect()
}

pub fn parse_period(key: &str) -> Result<PayPeriod> {
    key.parse()
}
