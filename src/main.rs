use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use loancalc::config::{AppConfig, load_or_default};
use loancalc::core::{
    PayPeriod, PlanId, TaxYear, annual_repayment, period_repayment, plan, project,
    threshold_table,
};

#[derive(Parser, Debug)]
#[command(
    name = "loancalc",
    about = "UK student loan repayment calculators (thresholds, repayments, inflation projections)"
)]
struct Cli {
    #[arg(long, global = true, help = "Optional TOML configuration file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON calculator API
    Serve {
        #[arg(long, help = "Port to listen on, overrides the config file")]
        port: Option<u16>,
    },
    /// Print every pay-period threshold for a plan
    Thresholds {
        #[arg(long, help = "Plan key, e.g. PLAN_2")]
        plan: PlanId,
        #[arg(long, help = "Tax year, e.g. 2025/26")]
        tax_year: Option<TaxYear>,
    },
    /// Repayment due on a gross payment
    Repayment {
        #[arg(long)]
        gross_pay: Decimal,
        #[arg(long)]
        plan: PlanId,
        #[arg(long, default_value_t = false, help = "Also holds a postgraduate loan")]
        postgraduate: bool,
        #[arg(long, default_value = "ANNUALLY", help = "Pay period of --gross-pay")]
        period: PayPeriod,
        #[arg(long)]
        tax_year: Option<TaxYear>,
    },
    /// Nominal versus real repayments over several years
    Project {
        #[arg(long)]
        salary: Decimal,
        #[arg(long, default_value = "0", help = "Annual salary growth as a fraction, e.g. 0.04")]
        growth: Decimal,
        #[arg(long, default_value = "0", help = "Annual inflation as a fraction, e.g. 0.03")]
        inflation: Decimal,
        #[arg(long)]
        years: u32,
        #[arg(long)]
        plan: PlanId,
        #[arg(long)]
        tax_year: Option<TaxYear>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(msg) = run(cli.command, config).await {
        eprintln!("Error: {msg}");
        std::process::exit(1);
    }
}

async fn run(command: Command, mut config: AppConfig) -> Result<(), String> {
    let default_year = config.defaults.tax_year;
    match command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            loancalc::api::run_http_server(config)
                .await
                .map_err(|e| format!("server error: {e}"))
        }
        Command::Thresholds { plan: plan_id, tax_year } => {
            let tax_year = tax_year.unwrap_or(default_year);
            let loan = plan(tax_year, plan_id).map_err(|e| e.to_string())?;
            let table = threshold_table(&loan, tax_year).map_err(|e| e.to_string())?;
            print_json(&table)
        }
        Command::Repayment {
            gross_pay,
            plan: plan_id,
            postgraduate,
            period,
            tax_year,
        } => {
            let tax_year = tax_year.unwrap_or(default_year);
            let breakdown = match period {
                PayPeriod::Annually => annual_repayment(gross_pay, plan_id, postgraduate, tax_year),
                _ => period_repayment(gross_pay, plan_id, postgraduate, period, tax_year),
            }
            .map_err(|e| e.to_string())?;
            print_json(&breakdown.rounded())
        }
        Command::Project {
            salary,
            growth,
            inflation,
            years,
            plan: plan_id,
            tax_year,
        } => {
            let projection = project(
                salary,
                growth,
                inflation,
                years,
                plan_id,
                tax_year.unwrap_or(default_year),
            )
            .map_err(|e| e.to_string())?;
            print_json(&projection.rounded())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}
