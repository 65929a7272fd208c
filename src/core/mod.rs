mod inflation;
mod plans;
mod reconcile;
mod repayment;
mod thresholds;
mod timeline;
mod types;

pub use inflation::project;
pub use plans::{
    DEFAULT_TAX_YEAR, get_plan, lookup_plan, official_threshold, parse_plan, plan, rate_table,
    supported_tax_years,
};
pub use reconcile::{classify, reconcile};
pub use repayment::{
    annual_repayment, annual_terms, combined_repayment, period_repayment, period_terms, repayment,
};
pub use thresholds::{parse_period, period_threshold, threshold_table};
pub use timeline::{add_working_days, compare, credited_date, default_min_saving, payment_date};
pub use types::{
    Channel, ChannelConfig, ChannelTimeline, DeadlineRule, DocumentType, IncomeKind,
    IncomeSource, InflationProjection, InflationYear, Latency, LoanPlan, LoanTerms, PayPeriod,
    PaymentComparison, PeriodThreshold, PlanId, Recommendation, ReconciliationResult,
    ReconciliationStatus, RecommendedAction, RepaymentBreakdown, Scenario, TaxYear, round_pence,
    round_pounds,
};
