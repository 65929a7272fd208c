use rust_decimal::Decimal;
use tracing::debug;

use super::plans::plan;
use super::repayment::repayment;
use super::types::{InflationProjection, InflationYear, PlanId, TaxYear};
use crate::error::{CalcError, Result};

/// Salary growth applies from year 2, the inflation deflator from year 1.
pub fn project(
    initial_salary: Decimal,
    salary_growth_rate: Decimal,
    inflation_rate: Decimal,
    years: u32,
    plan_id: PlanId,
    tax_year: TaxYear,
) -> Result<InflationProjection> {
    let loan = plan(tax_year, plan_id)?;
    if years == 0 {
        return Err(CalcError::InvalidInput(
            "projection must cover at least one year".to_string(),
        ));
    }
    if years > loan.write_off_years {
        return Err(CalcError::HorizonExceeded {
            requested: years,
            write_off_years: loan.write_off_years,
        });
    }
    if initial_salary < Decimal::ZERO {
        return Err(CalcError::InvalidInput(format!(
            "salary must be >= 0, got {initial_salary}"
        )));
    }
    for (name, rate) in [
        ("salary growth rate", salary_growth_rate),
        ("inflation rate", inflation_rate),
    ] {
        if rate <= Decimal::NEGATIVE_ONE || rate > Decimal::ONE {
            return Err(CalcError::InvalidInput(format!(
                "{name} must be > -1 and <= 1, got {rate}"
            )));
        }
    }

    let growth = Decimal::ONE + salary_growth_rate;
    let deflation = Decimal::ONE + inflation_rate;
    let overflow = || CalcError::InvalidInput("projection is out of range".to_string());

    let mut salary = initial_salary;
    let mut factor = Decimal::ONE;
    let mut cumulative_nominal = Decimal::ZERO;
    let mut cumulative_real = Decimal::ZERO;
    let mut records = Vec::with_capacity(years as usize);

    for year in 1..=years {
        if year > 1 {
            salary = salary.checked_mul(growth).ok_or_else(overflow)?;
        }
        let nominal_repayment = repayment(salary, loan.annual_threshold, loan.rate)?;
        factor = factor.checked_div(deflation).ok_or_else(overflow)?;
        let real_repayment = nominal_repayment.checked_mul(factor).ok_or_else(overflow)?;
        cumulative_nominal = cumulative_nominal
            .checked_add(nominal_repayment)
            .ok_or_else(overflow)?;
        cumulative_real = cumulative_real
            .checked_add(real_repayment)
            .ok_or_else(overflow)?;

        let real_value_percentage = if nominal_repayment.is_zero() {
            Decimal::ONE_HUNDRED
        } else {
            (real_repayment / nominal_repayment)
                .checked_mul(Decimal::ONE_HUNDRED)
                .ok_or_else(overflow)?
        };

        records.push(InflationYear {
            year,
            salary,
            nominal_repayment,
            real_repayment,
            cumulative_nominal,
            cumulative_real,
            purchasing_power_loss: nominal_repayment - real_repayment,
            real_value_percentage,
        });
    }

    debug!(
        plan = %plan_id,
        years,
        %cumulative_nominal,
        %cumulative_real,
        "projected repayments against inflation"
    );

    Ok(InflationProjection {
        plan: plan_id,
        years: records,
        total_nominal: cumulative_nominal,
        total_real: cumulative_real,
        total_purchasing_power_loss: cumulative_nominal - cumulative_real,
    })
}
