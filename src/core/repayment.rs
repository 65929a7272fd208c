use rust_decimal::Decimal;

use super::plans::plan;
use super::thresholds::period_threshold;
use super::types::{LoanTerms, PayPeriod, PlanId, RepaymentBreakdown, TaxYear};
use crate::error::{CalcError, Result};

pub fn repayment(gross_pay: Decimal, threshold: Decimal, rate: Decimal) -> Result<Decimal> {
    if gross_pay < Decimal::ZERO {
        return Err(CalcError::InvalidInput(format!(
            "gross pay must be >= 0, got {gross_pay}"
        )));
    }
    validate_terms(LoanTerms { threshold, rate })?;
    Ok((gross_pay - threshold).max(Decimal::ZERO) * rate)
}

fn validate_terms(terms: LoanTerms) -> Result<()> {
    if terms.threshold < Decimal::ZERO {
        return Err(CalcError::InvalidInput(format!(
            "threshold must be >= 0, got {}",
            terms.threshold
        )));
    }
    if terms.rate < Decimal::ZERO || terms.rate > Decimal::ONE {
        return Err(CalcError::InvalidInput(format!(
            "repayment rate must be between 0 and 1, got {}",
            terms.rate
        )));
    }
    Ok(())
}

pub fn combined_repayment(
    gross_pay: Decimal,
    undergraduate: Option<LoanTerms>,
    postgraduate: Option<LoanTerms>,
) -> Result<RepaymentBreakdown> {
    let liability = |terms: Option<LoanTerms>| -> Result<Decimal> {
        match terms {
            Some(t) => repayment(gross_pay, t.threshold, t.rate),
            None => Ok(Decimal::ZERO),
        }
    };
    let undergraduate = liability(undergraduate)?;
    let postgraduate = liability(postgraduate)?;
    let total = undergraduate.checked_add(postgraduate).ok_or_else(|| {
        CalcError::InvalidInput(format!("gross pay {gross_pay} is out of range"))
    })?;
    Ok(RepaymentBreakdown {
        undergraduate,
        postgraduate,
        total,
    })
}

/// Annual terms for a borrower. `PlanId::Postgraduate` as the main plan means
/// the borrower only holds a postgraduate loan.
pub fn annual_terms(
    plan_id: PlanId,
    has_postgraduate: bool,
    tax_year: TaxYear,
) -> Result<(Option<LoanTerms>, Option<LoanTerms>)> {
    let postgraduate = if has_postgraduate || plan_id.is_postgraduate() {
        Some(plan(tax_year, PlanId::Postgraduate)?.terms())
    } else {
        None
    };
    let undergraduate = if plan_id.is_postgraduate() {
        None
    } else {
        Some(plan(tax_year, plan_id)?.terms())
    };
    Ok((undergraduate, postgraduate))
}

pub fn period_terms(
    plan_id: PlanId,
    has_postgraduate: bool,
    period: PayPeriod,
    tax_year: TaxYear,
) -> Result<(Option<LoanTerms>, Option<LoanTerms>)> {
    let to_period = |id: PlanId| -> Result<LoanTerms> {
        let loan = plan(tax_year, id)?;
        let threshold = period_threshold(&loan, period, tax_year)?;
        Ok(LoanTerms {
            threshold: threshold.threshold,
            rate: loan.rate,
        })
    };
    let (undergraduate, postgraduate) = annual_terms(plan_id, has_postgraduate, tax_year)?;
    Ok((
        undergraduate.map(|_| to_period(plan_id)).transpose()?,
        postgraduate
            .map(|_| to_period(PlanId::Postgraduate))
            .transpose()?,
    ))
}

pub fn annual_repayment(
    gross_pay: Decimal,
    plan_id: PlanId,
    has_postgraduate: bool,
    tax_year: TaxYear,
) -> Result<RepaymentBreakdown> {
    let (undergraduate, postgraduate) = annual_terms(plan_id, has_postgraduate, tax_year)?;
    combined_repayment(gross_pay, undergraduate, postgraduate)
}

pub fn period_repayment(
    gross_pay: Decimal,
    plan_id: PlanId,
    has_postgraduate: bool,
    period: PayPeriod,
    tax_year: TaxYear,
) -> Result<RepaymentBreakdown> {
    let (undergraduate, postgraduate) =
        period_terms(plan_id, has_postgraduate, period, tax_year)?;
    combined_repayment(gross_pay, undergraduate, postgraduate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
    use rust_decimal_macros::dec;

    #[test]
    fn plan_two_35k_owes_693_45() {
        let owed = repayment(dec!(35000), dec!(27295), dec!(0.09)).expect("valid input");
        assert_eq!(owed, dec!(693.45));

        let breakdown = annual_repayment(dec!(35000), PlanId::Plan2, false, TaxYear::new(2024))
            .expect("valid input");
        assert_eq!(breakdown.total, dec!(693.45));
        assert_eq!(breakdown.postgraduate, Decimal::ZERO);
    }

    #[test]
    fn pay_below_threshold_owes_nothing() {
        let owed = repayment(dec!(20000), dec!(27295), dec!(0.09)).expect("valid input");
        assert_eq!(owed, Decimal::ZERO);
    }

    #[test]
    fn undergraduate_and_postgraduate_are_thresholded_separately() {
        // UG: (35,000 - 27,295) * 9% = 693.45; PG: (35,000 - 21,000) * 6% = 840
        let breakdown = annual_repayment(dec!(35000), PlanId::Plan2, true, TaxYear::new(2024))
            .expect("valid input");
        assert_eq!(breakdown.undergraduate, dec!(693.45));
        assert_eq!(breakdown.postgraduate, dec!(840));
        assert_eq!(breakdown.total, dec!(1533.45));
    }

    #[test]
    fn postgraduate_only_borrower_has_no_undergraduate_liability() {
        let breakdown =
            annual_repayment(dec!(30000), PlanId::Postgraduate, false, TaxYear::new(2024))
                .expect("valid input");
        assert_eq!(breakdown.undergraduate, Decimal::ZERO);
        assert_eq!(breakdown.postgraduate, dec!(540));
    }

    #[test]
    fn monthly_payslip_uses_official_period_threshold() {
        // 3,000 - 2,274 = 726 * 9% = 65.34
        let breakdown = period_repayment(
            dec!(3000),
            PlanId::Plan2,
            false,
            PayPeriod::Monthly,
            TaxYear::new(2024),
        )
        .expect("valid input");
        assert_eq!(breakdown.total, dec!(65.34));
    }

    #[test]
    fn intermediate_values_are_not_rounded() {
        let owed = repayment(dec!(27300.55), dec!(27295), dec!(0.09)).expect("valid input");
        assert_eq!(owed, dec!(0.4995));
        assert_eq!(crate::core::types::round_pence(owed), dec!(0.50));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(matches!(
            repayment(dec!(-1), dec!(27295), dec!(0.09)),
            Err(CalcError::InvalidInput(_))
        ));
        assert!(matches!(
            repayment(dec!(30000), dec!(27295), dec!(-0.09)),
            Err(CalcError::InvalidInput(_))
        ));
        assert!(matches!(
            repayment(dec!(30000), dec!(-5), dec!(0.09)),
            Err(CalcError::InvalidInput(_))
        ));
        assert!(matches!(
            repayment(dec!(30000), dec!(27295), dec!(1.5)),
            Err(CalcError::InvalidInput(_))
        ));
    }

    #[test]
    fn combined_total_out_of_range_is_an_error() {
        let full = LoanTerms {
            threshold: Decimal::ZERO,
            rate: Decimal::ONE,
        };
        let err = combined_repayment(Decimal::MAX, Some(full), Some(full))
            .expect_err("sum of both loans overflows");
        assert!(matches!(err, CalcError::InvalidInput(_)));
    }

    proptest! {
        #[test]
        fn prop_repayment_is_zero_at_or_below_threshold(
            threshold in 0u32..100_000,
            below in 0u32..100_000,
            rate_bp in 0u32..10_001
        ) {
            let threshold = Decimal::from(threshold);
            let pay = (threshold - Decimal::from(below)).max(Decimal::ZERO);
            let rate = Decimal::new(rate_bp as i64, 4);
            prop_assert_eq!(repayment(pay, threshold, rate).expect("valid"), Decimal::ZERO);
        }

        #[test]
        fn prop_repayment_above_threshold_is_linear_and_monotonic(
            threshold in 0u32..100_000,
            above_pence in 1u64..10_000_000,
            step_pence in 1u64..100_000,
            rate_bp in 1u32..10_001
        ) {
            let threshold = Decimal::from(threshold);
            let pay = threshold + Decimal::new(above_pence as i64, 2);
            let rate = Decimal::new(rate_bp as i64, 4);
            let owed = repayment(pay, threshold, rate).expect("valid");
            prop_assert_eq!(owed, (pay - threshold) * rate);

            let higher = repayment(pay + Decimal::new(step_pence as i64, 2), threshold, rate)
                .expect("valid");
            prop_assert!(higher > owed);
        }

        #[test]
        fn prop_combined_total_is_sum_of_parts(
            pay in 0u32..200_000,
            ug_threshold in 0u32..40_000,
            pg_threshold in 0u32..40_000
        ) {
            let ug = LoanTerms { threshold: Decimal::from(ug_threshold), rate: dec!(0.09) };
            let pg = LoanTerms { threshold: Decimal::from(pg_threshold), rate: dec!(0.06) };
            let breakdown = combined_repayment(Decimal::from(pay), Some(ug), Some(pg))
                .expect("valid");
            prop_assert_eq!(breakdown.total, breakdown.undergraduate + breakdown.postgraduate);
            prop_assert_eq!(
                breakdown.undergraduate,
                repayment(Decimal::from(pay), ug.threshold, ug.rate).expect("valid")
            );
        }
    }
}
