use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{AppConfig, CalcDefaults};
use crate::core::{
    ChannelConfig, IncomeSource, InflationProjection, LoanPlan, PayPeriod, PaymentComparison,
    PeriodThreshold, PlanId, ReconciliationResult, RepaymentBreakdown, TaxYear, annual_repayment,
    compare, period_repayment, plan, project, rate_table, reconcile, threshold_table,
};

type SharedDefaults = Arc<CalcDefaults>;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TaxYearQuery {
    tax_year: Option<TaxYear>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ThresholdsQuery {
    plan: Option<PlanId>,
    tax_year: Option<TaxYear>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RepaymentPayload {
    gross_pay: Option<Decimal>,
    plan: Option<PlanId>,
    has_postgraduate: Option<bool>,
    period: Option<PayPeriod>,
    tax_year: Option<TaxYear>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ReconcilePayload {
    plan: Option<PlanId>,
    has_postgraduate: Option<bool>,
    tax_year: Option<TaxYear>,
    income_sources: Vec<IncomeSource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    amount: Option<Decimal>,
    interest_rate: Option<Decimal>,
    reference_date: Option<NaiveDate>,
    channel_a: Option<ChannelConfig>,
    channel_b: Option<ChannelConfig>,
    min_saving: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InflationPayload {
    initial_salary: Option<Decimal>,
    salary_growth_rate: Option<Decimal>,
    inflation_rate: Option<Decimal>,
    years: Option<u32>,
    plan: Option<PlanId>,
    tax_year: Option<TaxYear>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlansResponse {
    tax_year: TaxYear,
    plans: Vec<LoanPlan>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThresholdsResponse {
    tax_year: TaxYear,
    plan: PlanId,
    thresholds: Vec<PeriodThreshold>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RepaymentResponse {
    tax_year: TaxYear,
    plan: PlanId,
    has_postgraduate: bool,
    period: PayPeriod,
    gross_pay: Decimal,
    repayment: RepaymentBreakdown,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(defaults: CalcDefaults) -> Router {
    let shared: SharedDefaults = Arc::new(defaults);
    Router::new()
        .route("/api/plans", get(plans_handler))
        .route("/api/thresholds", get(thresholds_handler))
        .route("/api/repayment", post(repayment_handler))
        .route("/api/reconcile", post(reconcile_handler))
        .route("/api/compare", post(compare_handler))
        .route("/api/inflation", post(inflation_handler))
        .fallback(not_found_handler)
        .with_state(shared)
}

pub async fn run_http_server(config: AppConfig) -> std::io::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let app = router(config.defaults);

    let listener = TcpListener::bind(addr).await?;
    info!("student loan calculator API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plans_handler(
    State(defaults): State<SharedDefaults>,
    Query(query): Query<TaxYearQuery>,
) -> Response {
    respond(build_plans_response(&defaults, query))
}

async fn thresholds_handler(
    State(defaults): State<SharedDefaults>,
    Query(query): Query<ThresholdsQuery>,
) -> Response {
    respond(build_thresholds_response(&defaults, query))
}

async fn repayment_handler(
    State(defaults): State<SharedDefaults>,
    Json(payload): Json<RepaymentPayload>,
) -> Response {
    respond(build_repayment_response(&defaults, payload))
}

async fn reconcile_handler(
    State(defaults): State<SharedDefaults>,
    Json(payload): Json<ReconcilePayload>,
) -> Response {
    respond(build_reconcile_response(&defaults, payload))
}

async fn compare_handler(
    State(defaults): State<SharedDefaults>,
    Json(payload): Json<ComparePayload>,
) -> Response {
    respond(build_compare_response(&defaults, payload))
}

async fn inflation_handler(
    State(defaults): State<SharedDefaults>,
    Json(payload): Json<InflationPayload>,
) -> Response {
    respond(build_inflation_response(&defaults, payload))
}

fn build_plans_response(
    defaults: &CalcDefaults,
    query: TaxYearQuery,
) -> Result<PlansResponse, String> {
    let tax_year = query.tax_year.unwrap_or(defaults.tax_year);
    let plans = rate_table(tax_year).map_err(|e| e.to_string())?;
    Ok(PlansResponse { tax_year, plans })
}

fn build_thresholds_response(
    defaults: &CalcDefaults,
    query: ThresholdsQuery,
) -> Result<ThresholdsResponse, String> {
    let plan_id = query.plan.ok_or("plan is required")?;
    let tax_year = query.tax_year.unwrap_or(defaults.tax_year);
    let loan = plan(tax_year, plan_id).map_err(|e| e.to_string())?;
    let thresholds = threshold_table(&loan, tax_year).map_err(|e| e.to_string())?;
    Ok(ThresholdsResponse {
        tax_year,
        plan: plan_id,
        thresholds,
    })
}

fn build_repayment_response(
    defaults: &CalcDefaults,
    payload: RepaymentPayload,
) -> Result<RepaymentResponse, String> {
    let gross_pay = payload.gross_pay.ok_or("grossPay is required")?;
    let plan_id = payload.plan.ok_or("plan is required")?;
    let has_postgraduate = payload.has_postgraduate.unwrap_or(false);
    let tax_year = payload.tax_year.unwrap_or(defaults.tax_year);
    let period = payload.period.unwrap_or(PayPeriod::Annually);

    let breakdown = match period {
        PayPeriod::Annually => annual_repayment(gross_pay, plan_id, has_postgraduate, tax_year),
        _ => period_repayment(gross_pay, plan_id, has_postgraduate, period, tax_year),
    }
    .map_err(|e| e.to_string())?;

    Ok(RepaymentResponse {
        tax_year,
        plan: plan_id,
        has_postgraduate,
        period,
        gross_pay,
        repayment: breakdown.rounded(),
    })
}

fn build_reconcile_response(
    defaults: &CalcDefaults,
    payload: ReconcilePayload,
) -> Result<ReconciliationResult, String> {
    let plan_id = payload.plan.ok_or("plan is required")?;
    let tax_year = payload.tax_year.unwrap_or(defaults.tax_year);
    let result = reconcile(
        &payload.income_sources,
        plan_id,
        payload.has_postgraduate.unwrap_or(false),
        tax_year,
    )
    .map_err(|e| e.to_string())?;
    Ok(result.rounded())
}

fn build_compare_response(
    defaults: &CalcDefaults,
    payload: ComparePayload,
) -> Result<PaymentComparison, String> {
    let amount = payload.amount.ok_or("amount is required")?;
    let rate = payload.interest_rate.ok_or("interestRate is required")?;
    let reference_date = payload.reference_date.ok_or("referenceDate is required")?;
    let comparison = compare(
        &payload.channel_a.unwrap_or_else(ChannelConfig::slc_direct),
        &payload.channel_b.unwrap_or_else(ChannelConfig::self_assessment),
        amount,
        rate,
        reference_date,
        payload
            .min_saving
            .unwrap_or(defaults.min_recommended_saving),
    )
    .map_err(|e| e.to_string())?;
    Ok(comparison.rounded())
}

fn build_inflation_response(
    defaults: &CalcDefaults,
    payload: InflationPayload,
) -> Result<InflationProjection, String> {
    let initial_salary = payload.initial_salary.ok_or("initialSalary is required")?;
    let plan_id = payload.plan.ok_or("plan is required")?;
    let years = payload.years.ok_or("years is required")?;
    let projection = project(
        initial_salary,
        payload.salary_growth_rate.unwrap_or(Decimal::ZERO),
        payload.inflation_rate.unwrap_or(Decimal::ZERO),
        years,
        plan_id,
        payload.tax_year.unwrap_or(defaults.tax_year),
    )
    .map_err(|e| e.to_string())?;
    Ok(projection.rounded())
}

fn respond<T: Serialize>(result: Result<T, String>) -> Response {
    match result {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => {
            warn!("rejected calculator request: {msg}");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn defaults_2024() -> CalcDefaults {
        CalcDefaults {
            tax_year: TaxYear::new(2024),
            ..CalcDefaults::default()
        }
    }

    #[test]
    fn plans_response_lists_every_plan_for_default_year() {
        let response =
            build_plans_response(&defaults_2024(), TaxYearQuery::default()).expect("valid");
        assert_eq!(response.tax_year, TaxYear::new(2024));
        assert_eq!(response.plans.len(), PlanId::ALL.len());
    }

    #[test]
    fn plans_response_rejects_unsupported_year() {
        let query = TaxYearQuery {
            tax_year: Some(TaxYear::new(2010)),
        };
        let err = build_plans_response(&defaults_2024(), query).expect_err("no 2010 table");
        assert!(err.contains("2010/11"));
    }

    #[test]
    fn thresholds_query_parses_stable_keys() {
        let query: ThresholdsQuery =
            serde_json::from_str(r#"{ "plan": "PLAN_2", "taxYear": "2024/25" }"#)
                .expect("json should parse");
        let response = build_thresholds_response(&defaults_2024(), query).expect("valid");
        let monthly = response
            .thresholds
            .iter()
            .find(|t| t.period == PayPeriod::Monthly)
            .expect("monthly row");
        assert_eq!(monthly.threshold, dec!(2274));
    }

    #[test]
    fn thresholds_query_accepts_the_same_loose_keys_as_the_cli() {
        let query: ThresholdsQuery =
            serde_json::from_str(r#"{ "plan": "plan_2", "taxYear": "2024/25" }"#)
                .expect("lenient plan key");
        assert_eq!(query.plan, Some(PlanId::Plan2));
        let response = build_thresholds_response(&defaults_2024(), query).expect("valid");
        assert_eq!(response.thresholds.len(), PayPeriod::ALL.len());
    }

    #[test]
    fn thresholds_require_plan() {
        let err = build_thresholds_response(&defaults_2024(), ThresholdsQuery::default())
            .expect_err("plan missing");
        assert!(err.contains("plan"));
    }

    #[test]
    fn repayment_payload_defaults_to_annual() {
        let payload: RepaymentPayload =
            serde_json::from_str(r#"{ "grossPay": 35000, "plan": "PLAN_2" }"#)
                .expect("json should parse");
        let response = build_repayment_response(&defaults_2024(), payload).expect("valid");
        assert_eq!(response.period, PayPeriod::Annually);
        assert_eq!(response.repayment.total, dec!(693.45));
    }

    #[test]
    fn repayment_payload_rejects_negative_pay() {
        let payload: RepaymentPayload =
            serde_json::from_str(r#"{ "grossPay": -5, "plan": "PLAN_2", "period": "WEEKLY" }"#)
                .expect("json should parse");
        let err = build_repayment_response(&defaults_2024(), payload).expect_err("negative pay");
        assert!(err.contains("gross pay"));
    }

    #[test]
    fn reconcile_payload_reports_underpayment() {
        let json = r#"{
          "plan": "PLAN_2",
          "incomeSources": [
            { "label": "Shop", "amount": 1500, "payPeriod": "MONTHLY" },
            { "label": "Bar", "amount": 1200, "payPeriod": "MONTHLY" }
          ]
        }"#;
        let payload: ReconcilePayload = serde_json::from_str(json).expect("json should parse");
        let result = build_reconcile_response(&defaults_2024(), payload).expect("valid");
        assert_eq!(result.balancing_payment_due, dec!(459.45));

        let body = serde_json::to_string(&result).expect("response should serialize");
        assert!(body.contains("\"status\":\"UNDERPAID\""));
        assert!(body.contains("\"recommendedAction\":\"makeBalancingPayment\""));
        assert!(body.contains("\"multipleJobsCombinedAboveThreshold\""));
    }

    #[test]
    fn compare_payload_defaults_to_direct_versus_self_assessment() {
        let json = r#"{ "amount": 5000, "interestRate": 0.073, "referenceDate": "2025-06-01" }"#;
        let payload: ComparePayload = serde_json::from_str(json).expect("json should parse");
        let comparison = build_compare_response(&defaults_2024(), payload).expect("valid");
        assert_eq!(comparison.interest_cost_delta, dec!(260));
        assert_eq!(comparison.min_saving, dec!(10));

        let body = serde_json::to_string(&comparison).expect("response should serialize");
        assert!(body.contains("\"recommendation\":\"preferChannelA\""));
        assert!(body.contains("\"creditedDate\":\"2025-06-06\""));
    }

    #[test]
    fn compare_payload_accepts_custom_channels() {
        let json = r#"{
          "amount": 1000,
          "interestRate": 0.07,
          "referenceDate": "2025-06-02",
          "channelA": { "latency": { "unit": "calendarDays", "amount": 2 }, "deadline": { "kind": "anytime" } },
          "channelB": { "latency": { "unit": "workingDays", "amount": 1 }, "deadline": { "kind": "anytime" } }
        }"#;
        let payload: ComparePayload = serde_json::from_str(json).expect("json should parse");
        let comparison = build_compare_response(&defaults_2024(), payload).expect("valid");
        assert_eq!(comparison.days_between, 1);
        assert_eq!(comparison.faster_channel, Some(crate::core::Channel::B));
    }

    #[test]
    fn oversized_amounts_are_rejected_instead_of_overflowing() {
        let json = r#"{
          "plan": "PLAN_2",
          "incomeSources": [ { "label": "Agency", "amount": 2e27, "payPeriod": "WEEKLY" } ]
        }"#;
        let payload: ReconcilePayload = serde_json::from_str(json).expect("json should parse");
        let err = build_reconcile_response(&defaults_2024(), payload).expect_err("overflow");
        assert!(err.contains("out of range"));

        let json = r#"{ "amount": 1e26, "interestRate": 1000, "referenceDate": "2025-06-01" }"#;
        let payload: ComparePayload = serde_json::from_str(json).expect("json should parse");
        let err = build_compare_response(&defaults_2024(), payload).expect_err("rate too high");
        assert!(err.contains("interest rate"));
    }

    #[test]
    fn inflation_payload_maps_horizon_error() {
        let json = r#"{ "initialSalary": 35000, "plan": "PLAN_1", "years": 26 }"#;
        let payload: InflationPayload = serde_json::from_str(json).expect("json should parse");
        let err = build_inflation_response(&defaults_2024(), payload).expect_err("too long");
        assert!(err.contains("write-off"));
    }

    #[test]
    fn inflation_response_is_rounded_for_display() {
        let json = r#"{
          "initialSalary": 35000,
          "salaryGrowthRate": 0.04,
          "inflationRate": 0.03,
          "plan": "PLAN_2",
          "years": 1
        }"#;
        let payload: InflationPayload = serde_json::from_str(json).expect("json should parse");
        let projection = build_inflation_response(&defaults_2024(), payload).expect("valid");
        assert_eq!(projection.years[0].nominal_repayment, dec!(693.45));
        assert_eq!(projection.years[0].real_repayment, dec!(673.25));
        assert_eq!(projection.years[0].real_value_percentage, dec!(97.09));
    }

    #[test]
    fn unknown_plan_key_fails_to_deserialize() {
        let result = serde_json::from_str::<RepaymentPayload>(r#"{ "plan": "PLAN_3" }"#);
        assert!(result.is_err());
    }
}
