use rust_decimal::Decimal;
use tracing::debug;

use super::repayment::{annual_terms, repayment};
use super::types::{
    DocumentType, IncomeKind, IncomeSource, LoanTerms, PlanId, ReconciliationResult,
    ReconciliationStatus, RecommendedAction, Scenario, TaxYear,
};
use crate::error::{CalcError, Result};

const CORRECT_TOLERANCE: Decimal = Decimal::ONE;

pub fn reconcile(
    sources: &[IncomeSource],
    plan_id: PlanId,
    has_postgraduate: bool,
    tax_year: TaxYear,
) -> Result<ReconciliationResult> {
    validate_sources(sources)?;
    let (undergraduate, postgraduate) = annual_terms(plan_id, has_postgraduate, tax_year)?;

    let annual_amounts = sources
        .iter()
        .map(IncomeSource::annual_amount)
        .collect::<Result<Vec<_>>>()?;
    let total_income = checked_total(annual_amounts.iter().copied(), "total income")?;
    let correct_undergraduate_liability = liability(total_income, undergraduate)?;
    let correct_postgraduate_liability = liability(total_income, postgraduate)?;
    let total_correct_liability = checked_total(
        [correct_undergraduate_liability, correct_postgraduate_liability],
        "total liability",
    )?;

    let deductions = sources
        .iter()
        .map(IncomeSource::total_deducted)
        .collect::<Result<Vec<_>>>()?;
    let total_paye_deductions = checked_total(deductions, "total deductions")?;
    let difference = total_paye_deductions - total_correct_liability;
    let status = classify(difference);

    let (refund_amount, balancing_payment_due, recommended_action) = match status {
        ReconciliationStatus::Overpaid => {
            (difference, Decimal::ZERO, RecommendedAction::ClaimRefund)
        }
        ReconciliationStatus::Underpaid => (
            Decimal::ZERO,
            -difference,
            RecommendedAction::MakeBalancingPayment,
        ),
        ReconciliationStatus::Correct => {
            (Decimal::ZERO, Decimal::ZERO, RecommendedAction::NoAction)
        }
    };

    let scenarios = detect_scenarios(
        sources,
        &annual_amounts,
        undergraduate.or(postgraduate),
        correct_postgraduate_liability,
        tax_year,
    )?;

    debug!(
        %tax_year,
        plan = %plan_id,
        %total_income,
        %total_correct_liability,
        %total_paye_deductions,
        ?status,
        "reconciled student loan deductions"
    );

    Ok(ReconciliationResult {
        tax_year,
        total_income,
        undergraduate_threshold: undergraduate.map(|t| t.threshold),
        postgraduate_threshold: postgraduate.map(|t| t.threshold),
        correct_undergraduate_liability,
        correct_postgraduate_liability,
        total_correct_liability,
        total_paye_deductions,
        difference,
        status,
        refund_amount,
        balancing_payment_due,
        recommended_action,
        scenarios,
    })
}

pub fn classify(difference: Decimal) -> ReconciliationStatus {
    if difference.abs() < CORRECT_TOLERANCE {
        ReconciliationStatus::Correct
    } else if difference > Decimal::ZERO {
        ReconciliationStatus::Overpaid
    } else {
        ReconciliationStatus::Underpaid
    }
}

fn checked_total(values: impl IntoIterator<Item = Decimal>, what: &str) -> Result<Decimal> {
    values.into_iter().try_fold(Decimal::ZERO, |total, value| {
        total
            .checked_add(value)
            .ok_or_else(|| CalcError::InvalidIncome(format!("{what} is out of range")))
    })
}

fn liability(total_income: Decimal, terms: Option<LoanTerms>) -> Result<Decimal> {
    match terms {
        Some(t) => repayment(total_income, t.threshold, t.rate),
        None => Ok(Decimal::ZERO),
    }
}

fn validate_sources(sources: &[IncomeSource]) -> Result<()> {
    for (index, source) in sources.iter().enumerate() {
        let name = if source.label.is_empty() {
            format!("income source {}", index + 1)
        } else {
            source.label.clone()
        };
        if source.amount < Decimal::ZERO {
            return Err(CalcError::InvalidIncome(format!(
                "{name}: amount must be >= 0"
            )));
        }
        if source.undergraduate_deducted < Decimal::ZERO
            || source.postgraduate_deducted < Decimal::ZERO
        {
            return Err(CalcError::InvalidIncome(format!(
                "{name}: deductions must be >= 0"
            )));
        }
        if let (Some(start), Some(end)) = (source.employment_start, source.employment_end)
            && end < start
        {
            return Err(CalcError::InvalidInput(format!(
                "{name}: employment end date is before its start date"
            )));
        }
    }
    Ok(())
}

// Advisory only, never fed back into the liability figures.
fn detect_scenarios(
    sources: &[IncomeSource],
    annual_amounts: &[Decimal],
    primary: Option<LoanTerms>,
    postgraduate_liability: Decimal,
    tax_year: TaxYear,
) -> Result<Vec<Scenario>> {
    let mut scenarios = Vec::new();
    let employments: Vec<(&IncomeSource, Decimal)> = sources
        .iter()
        .zip(annual_amounts.iter().copied())
        .filter(|(s, _)| s.kind == IncomeKind::Employment)
        .collect();

    if let Some(terms) = primary
        && multiple_jobs_combined_above(&employments, terms.threshold)?
    {
        scenarios.push(Scenario::MultipleJobsCombinedAboveThreshold);
    }
    if employments.iter().any(|(s, _)| is_part_year(s, tax_year)) {
        scenarios.push(Scenario::PartYearEmployment);
    }
    if sources
        .iter()
        .any(|s| s.kind == IncomeKind::Other && s.amount > Decimal::ZERO)
    {
        scenarios.push(Scenario::OtherIncomeIncluded);
    }
    let nothing_deducted = sources.iter().all(|s| s.postgraduate_deducted.is_zero());
    if postgraduate_liability > Decimal::ZERO && nothing_deducted {
        scenarios.push(Scenario::PostgraduateNotDeducted);
    }
    Ok(scenarios)
}

fn multiple_jobs_combined_above(
    employments: &[(&IncomeSource, Decimal)],
    threshold: Decimal,
) -> Result<bool> {
    if employments.len() < 2 {
        return Ok(false);
    }
    let each_below = employments.iter().all(|(_, amount)| *amount <= threshold);
    let combined = checked_total(
        employments.iter().map(|(_, amount)| *amount),
        "combined employment income",
    )?;
    Ok(each_below && combined > threshold)
}

fn is_part_year(source: &IncomeSource, tax_year: TaxYear) -> bool {
    source.document == Some(DocumentType::P45)
        || source
            .employment_start
            .is_some_and(|start| start > tax_year.start_date())
        || source
            .employment_end
            .is_some_and(|end| end < tax_year.end_date())
}
