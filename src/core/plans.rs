use rust_decimal::Decimal;

use super::types::{LoanPlan, PayPeriod, PlanId, TaxYear};
use crate::error::{CalcError, Result};

pub const DEFAULT_TAX_YEAR: TaxYear = TaxYear::new(2025);

const SUPPORTED_START_YEARS: [i32; 2] = [2024, 2025];

pub fn supported_tax_years() -> Vec<TaxYear> {
    SUPPORTED_START_YEARS.into_iter().map(TaxYear::new).collect()
}

pub fn plan(tax_year: TaxYear, id: PlanId) -> Result<LoanPlan> {
    let threshold = annual_threshold(tax_year, id)
        .ok_or_else(|| CalcError::UnknownTaxYear(tax_year.to_string()))?;
    let (name, rate_pct, write_off_years) = match id {
        PlanId::Plan1 => ("Plan 1", 9, 25),
        PlanId::Plan2 => ("Plan 2", 9, 30),
        PlanId::Plan4 => ("Plan 4 (Scotland)", 9, 30),
        PlanId::Plan5 => ("Plan 5", 9, 40),
        PlanId::Postgraduate => ("Postgraduate Loan", 6, 30),
    };
    Ok(LoanPlan {
        id,
        name,
        annual_threshold: Decimal::from(threshold),
        rate: Decimal::new(rate_pct, 2),
        write_off_years,
    })
}

pub fn get_plan(id: PlanId) -> Result<LoanPlan> {
    plan(DEFAULT_TAX_YEAR, id)
}

pub fn parse_plan(key: &str) -> Result<PlanId> {
    key.parse()
}

pub fn lookup_plan(key: &str, tax_year: TaxYear) -> Result<LoanPlan> {
    plan(tax_year, parse_plan(key)?)
}

pub fn rate_table(tax_year: TaxYear) -> Result<Vec<LoanPlan>> {
    PlanId::ALL.into_iter().map(|id| plan(tax_year, id)).collect()
}

fn annual_threshold(tax_year: TaxYear, id: PlanId) -> Option<i64> {
    let threshold = match tax_year.start_year() {
        2024 => match id {
            PlanId::Plan1 => 24_990,
            PlanId::Plan2 => 27_295,
            PlanId::Plan4 => 31_395,
            PlanId::Plan5 => 25_000,
            PlanId::Postgraduate => 21_000,
        },
        2025 => match id {
            PlanId::Plan1 => 26_065,
            PlanId::Plan2 => 28_470,
            PlanId::Plan4 => 32_745,
            PlanId::Plan5 => 25_000,
            PlanId::Postgraduate => 21_000,
        },
        _ => return None,
    };
    Some(threshold)
}

/// Period thresholds as published by HMRC where they differ from a rounded
/// quotient of the annual figure.
pub fn official_threshold(tax_year: TaxYear, id: PlanId, period: PayPeriod) -> Option<Decimal> {
    use PayPeriod::{FourWeekly, Monthly, Weekly};
    use PlanId::{Plan1, Plan2, Plan4, Plan5, Postgraduate};

    let official = match (tax_year.start_year(), id, period) {
        (2024, Plan1, Weekly) => 480,
        (2024, Plan1, Monthly) => 2_082,
        (2024, Plan2, Weekly) => 524,
        (2024, Plan2, Monthly) => 2_274,
        (2024, Plan2, FourWeekly) => 2_099,
        (2024, Plan4, Weekly) => 603,
        (2024, Plan5, Weekly) => 480,
        (2024, Postgraduate, Weekly) => 403,
        (2025, Plan2, Weekly) => 547,
        (2025, Plan2, Monthly) => 2_372,
        (2025, Plan4, Weekly) => 629,
        (2025, Plan4, Monthly) => 2_728,
        (2025, Plan5, Weekly) => 480,
        (2025, Postgraduate, Weekly) => 403,
        _ => return None,
    };
    Some(Decimal::from(official))
}
