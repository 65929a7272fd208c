use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::CalcError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlanId {
    Plan1,
    Plan2,
    Plan4,
    Plan5,
    Postgraduate,
}

impl PlanId {
    pub const ALL: [PlanId; 5] = [
        PlanId::Plan1,
        PlanId::Plan2,
        PlanId::Plan4,
        PlanId::Plan5,
        PlanId::Postgraduate,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PlanId::Plan1 => "PLAN_1",
            PlanId::Plan2 => "PLAN_2",
            PlanId::Plan4 => "PLAN_4",
            PlanId::Plan5 => "PLAN_5",
            PlanId::Postgraduate => "POSTGRADUATE",
        }
    }

    pub fn is_postgraduate(self) -> bool {
        self == PlanId::Postgraduate
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PlanId {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_key(s);
        PlanId::ALL
            .into_iter()
            .find(|plan| plan.key() == key)
            .ok_or_else(|| CalcError::UnknownPlan(s.to_string()))
    }
}

impl TryFrom<String> for PlanId {
    type Error = CalcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlanId> for String {
    fn from(value: PlanId) -> Self {
        value.key().to_string()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PayPeriod {
    Weekly,
    Fortnightly,
    FourWeekly,
    Monthly,
    Quarterly,
    SemiAnnually,
    Annually,
}

impl PayPeriod {
    pub const ALL: [PayPeriod; 7] = [
        PayPeriod::Weekly,
        PayPeriod::Fortnightly,
        PayPeriod::FourWeekly,
        PayPeriod::Monthly,
        PayPeriod::Quarterly,
        PayPeriod::SemiAnnually,
        PayPeriod::Annually,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PayPeriod::Weekly => "WEEKLY",
            PayPeriod::Fortnightly => "FORTNIGHTLY",
            PayPeriod::FourWeekly => "FOUR_WEEKLY",
            PayPeriod::Monthly => "MONTHLY",
            PayPeriod::Quarterly => "QUARTERLY",
            PayPeriod::SemiAnnually => "SEMI_ANNUALLY",
            PayPeriod::Annually => "ANNUALLY",
        }
    }

    pub fn periods_per_year(self) -> u32 {
        match self {
            PayPeriod::Weekly => 52,
            PayPeriod::Fortnightly => 26,
            PayPeriod::FourWeekly => 13,
            PayPeriod::Monthly => 12,
            PayPeriod::Quarterly => 4,
            PayPeriod::SemiAnnually => 2,
            PayPeriod::Annually => 1,
        }
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PayPeriod {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_key(s);
        PayPeriod::ALL
            .into_iter()
            .find(|period| period.key() == key)
            .ok_or_else(|| CalcError::UnknownPeriod(s.to_string()))
    }
}

impl TryFrom<String> for PayPeriod {
    type Error = CalcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PayPeriod> for String {
    fn from(value: PayPeriod) -> Self {
        value.key().to_string()
    }
}

fn normalize_key(s: &str) -> String {
    s.trim().replace('-', "_").to_ascii_uppercase()
}

/// UK tax year running 6 April to 5 April, keyed as `"YYYY/YY"`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxYear {
    start_year: i32,
}

impl TaxYear {
    pub const fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    pub fn start_year(self) -> i32 {
        self.start_year
    }

    pub fn start_date(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year, 4, 6).unwrap_or(NaiveDate::MIN)
    }

    pub fn end_date(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year + 1, 4, 5).unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }
}

impl fmt::Display for TaxYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }
}

impl FromStr for TaxYear {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CalcError::InvalidInput(format!("tax year must look like 2025/26, got {s:?}"));
        let (start, suffix) = s.trim().split_once('/').ok_or_else(invalid)?;
        let digits = |part: &str, len: usize| {
            part.len() == len && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !digits(start, 4) || !digits(suffix, 2) {
            return Err(invalid());
        }
        let start_year: i32 = start.parse().map_err(|_| invalid())?;
        let suffix: i32 = suffix.parse().map_err(|_| invalid())?;
        if (start_year + 1).rem_euclid(100) != suffix {
            return Err(invalid());
        }
        Ok(TaxYear { start_year })
    }
}

impl TryFrom<String> for TaxYear {
    type Error = CalcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaxYear> for String {
    fn from(value: TaxYear) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPlan {
    pub id: PlanId,
    pub name: &'static str,
    pub annual_threshold: Decimal,
    pub rate: Decimal,
    pub write_off_years: u32,
}

impl LoanPlan {
    pub fn terms(&self) -> LoanTerms {
        LoanTerms {
            threshold: self.annual_threshold,
            rate: self.rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanTerms {
    pub threshold: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodThreshold {
    pub plan: PlanId,
    pub period: PayPeriod,
    pub periods_per_year: u32,
    pub annual_threshold: Decimal,
    pub calculated: Decimal,
    pub official: Option<Decimal>,
    pub threshold: Decimal,
    pub rounding_difference: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentBreakdown {
    pub undergraduate: Decimal,
    pub postgraduate: Decimal,
    pub total: Decimal,
}

impl RepaymentBreakdown {
    pub fn rounded(&self) -> Self {
        Self {
            undergraduate: round_pence(self.undergraduate),
            postgraduate: round_pence(self.postgraduate),
            total: round_pence(self.total),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IncomeKind {
    #[default]
    Employment,
    Other,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    /// End-of-year certificate covering the whole tax year.
    P60,
    /// Leaving certificate covering part of the tax year.
    P45,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncomeSource {
    pub label: String,
    pub kind: IncomeKind,
    pub amount: Decimal,
    pub pay_period: Option<PayPeriod>,
    pub undergraduate_deducted: Decimal,
    pub postgraduate_deducted: Decimal,
    pub document: Option<DocumentType>,
    pub employment_start: Option<NaiveDate>,
    pub employment_end: Option<NaiveDate>,
}

impl IncomeSource {
    pub fn annual_amount(&self) -> Result<Decimal, CalcError> {
        match self.pay_period {
            Some(period) => self
                .amount
                .checked_mul(Decimal::from(period.periods_per_year()))
                .ok_or_else(|| {
                    CalcError::InvalidIncome(format!(
                        "{}: annual amount is out of range",
                        self.display_label()
                    ))
                }),
            None => Ok(self.amount),
        }
    }

    pub fn total_deducted(&self) -> Result<Decimal, CalcError> {
        self.undergraduate_deducted
            .checked_add(self.postgraduate_deducted)
            .ok_or_else(|| {
                CalcError::InvalidIncome(format!(
                    "{}: deductions are out of range",
                    self.display_label()
                ))
            })
    }

    fn display_label(&self) -> &str {
        if self.label.is_empty() {
            "income source"
        } else {
            &self.label
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    Overpaid,
    Underpaid,
    Correct,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecommendedAction {
    ClaimRefund,
    MakeBalancingPayment,
    NoAction,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Scenario {
    MultipleJobsCombinedAboveThreshold,
    PartYearEmployment,
    OtherIncomeIncluded,
    PostgraduateNotDeducted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub tax_year: TaxYear,
    pub total_income: Decimal,
    pub undergraduate_threshold: Option<Decimal>,
    pub postgraduate_threshold: Option<Decimal>,
    pub correct_undergraduate_liability: Decimal,
    pub correct_postgraduate_liability: Decimal,
    pub total_correct_liability: Decimal,
    pub total_paye_deductions: Decimal,
    pub difference: Decimal,
    pub status: ReconciliationStatus,
    pub refund_amount: Decimal,
    pub balancing_payment_due: Decimal,
    pub recommended_action: RecommendedAction,
    pub scenarios: Vec<Scenario>,
}

impl ReconciliationResult {
    pub fn rounded(&self) -> Self {
        Self {
            total_income: round_pence(self.total_income),
            correct_undergraduate_liability: round_pence(self.correct_undergraduate_liability),
            correct_postgraduate_liability: round_pence(self.correct_postgraduate_liability),
            total_correct_liability: round_pence(self.total_correct_liability),
            total_paye_deductions: round_pence(self.total_paye_deductions),
            difference: round_pence(self.difference),
            refund_amount: round_pence(self.refund_amount),
            balancing_payment_due: round_pence(self.balancing_payment_due),
            scenarios: self.scenarios.clone(),
            ..*self
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "amount", rename_all = "camelCase")]
pub enum Latency {
    WorkingDays(u32),
    CalendarDays(u32),
    Weeks(u32),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DeadlineRule {
    Anytime,
    AnnualDate { month: u32, day: u32 },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    pub latency: Latency,
    pub deadline: DeadlineRule,
}

impl ChannelConfig {
    /// Voluntary payment made straight to the Student Loans Company.
    pub fn slc_direct() -> Self {
        Self {
            latency: Latency::WorkingDays(5),
            deadline: DeadlineRule::Anytime,
        }
    }

    /// Balancing payment through Self Assessment, due 31 January and
    /// passed on by HMRC a few weeks later.
    pub fn self_assessment() -> Self {
        Self {
            latency: Latency::Weeks(3),
            deadline: DeadlineRule::AnnualDate { month: 1, day: 31 },
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    A,
    B,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Recommendation {
    PreferChannelA,
    PreferChannelB,
    EitherAcceptable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTimeline {
    pub payment_date: NaiveDate,
    pub credited_date: NaiveDate,
    pub days_until_credited: i64,
    pub interest_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentComparison {
    pub reference_date: NaiveDate,
    pub channel_a: ChannelTimeline,
    pub channel_b: ChannelTimeline,
    pub days_between: i64,
    pub interest_cost_delta: Decimal,
    pub faster_channel: Option<Channel>,
    pub min_saving: Decimal,
    pub recommendation: Recommendation,
}

impl PaymentComparison {
    pub fn rounded(&self) -> Self {
        let round_timeline = |t: &ChannelTimeline| ChannelTimeline {
            interest_cost: round_pence(t.interest_cost),
            ..t.clone()
        };
        Self {
            channel_a: round_timeline(&self.channel_a),
            channel_b: round_timeline(&self.channel_b),
            interest_cost_delta: round_pence(self.interest_cost_delta),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InflationYear {
    pub year: u32,
    pub salary: Decimal,
    pub nominal_repayment: Decimal,
    pub real_repayment: Decimal,
    pub cumulative_nominal: Decimal,
    pub cumulative_real: Decimal,
    pub purchasing_power_loss: Decimal,
    pub real_value_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InflationProjection {
    pub plan: PlanId,
    pub years: Vec<InflationYear>,
    pub total_nominal: Decimal,
    pub total_real: Decimal,
    pub total_purchasing_power_loss: Decimal,
}

impl InflationProjection {
    pub fn rounded(&self) -> Self {
        Self {
            plan: self.plan,
            years: self
                .years
                .iter()
                .map(|y| InflationYear {
                    year: y.year,
                    salary: round_pence(y.salary),
                    nominal_repayment: round_pence(y.nominal_repayment),
                    real_repayment: round_pence(y.real_repayment),
                    cumulative_nominal: round_pence(y.cumulative_nominal),
                    cumulative_real: round_pence(y.cumulative_real),
                    purchasing_power_loss: round_pence(y.purchasing_power_loss),
                    real_value_percentage: round_pence(y.real_value_percentage),
                })
                .collect(),
            total_nominal: round_pence(self.total_nominal),
            total_real: round_pence(self.total_real),
            total_purchasing_power_loss: round_pence(self.total_purchasing_power_loss),
        }
    }
}

pub fn round_pence(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_pounds(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}
