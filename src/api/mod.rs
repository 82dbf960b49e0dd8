mod error;
pub mod format;

use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

pub use error::InputError;

use crate::core::solver::{GoalSolveConfig, GoalSolveResult, GoalType, solve_goal};
use crate::core::{Projection, ProjectionInputs, Summary, YearRecord, project_with_summary};

pub const MAX_TENURE_YEARS: u32 = 100;

const DEFAULT_SOLVE_TOLERANCE: f64 = 1.0;
const DEFAULT_SOLVE_MAX_ITERATIONS: u32 = 100;
const DEFAULT_REQUIRED_INVESTMENT_MAX: f64 = 1e11;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliGoalType {
    SustainableWithdrawal,
    RequiredInvestment,
}

impl From<CliGoalType> for GoalType {
    fn from(value: CliGoalType) -> Self {
        match value {
            CliGoalType::SustainableWithdrawal => GoalType::SustainableWithdrawal,
            CliGoalType::RequiredInvestment => GoalType::RequiredInvestment,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoalType {
    #[serde(alias = "sustainableWithdrawal", alias = "sustainable_withdrawal")]
    SustainableWithdrawal,
    #[serde(alias = "requiredInvestment", alias = "required_investment")]
    RequiredInvestment,
}

impl From<ApiGoalType> for CliGoalType {
    fn from(value: ApiGoalType) -> Self {
        match value {
            ApiGoalType::SustainableWithdrawal => CliGoalType::SustainableWithdrawal,
            ApiGoalType::RequiredInvestment => CliGoalType::RequiredInvestment,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    investment: Option<f64>,
    #[serde(alias = "monthlyWd")]
    monthly_withdrawal: Option<f64>,
    #[serde(alias = "rate")]
    annual_rate: Option<f64>,
    #[serde(alias = "years")]
    tenure_years: Option<u32>,
    defer_years: Option<u32>,
    step_up: Option<f64>,

    goal: Option<ApiGoalType>,
    target_end_corpus: Option<f64>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "swp",
    about = "Systematic withdrawal plan projector (monthly compounding, deferment, annual step-up)",
    after_help = "Run `swp serve [port]` to start the HTTP API instead."
)]
pub struct Cli {
    #[arg(long, default_value_t = 10_000_000.0, help = "Lump-sum investment")]
    investment: f64,
    #[arg(
        long,
        default_value_t = 60_000.0,
        help = "Monthly withdrawal once deferment ends"
    )]
    monthly_withdrawal: f64,
    #[arg(
        long,
        default_value_t = 12.0,
        allow_negative_numbers = true,
        help = "Expected annual return in percent, compounded monthly"
    )]
    annual_rate: f64,
    #[arg(long, default_value_t = 25)]
    tenure_years: u32,
    #[arg(long, default_value_t = 0, help = "Years before the first withdrawal")]
    defer_years: u32,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Annual increase of the monthly withdrawal in percent"
    )]
    step_up: f64,
    #[arg(long, help = "Print JSON instead of a table")]
    json: bool,

    #[arg(long, value_enum, help = "Solve for a goal instead of projecting")]
    goal: Option<CliGoalType>,
    #[arg(long, default_value_t = 0.0)]
    target_end_corpus: f64,
    #[arg(long, default_value_t = 0.0)]
    search_min: f64,
    #[arg(long)]
    search_max: Option<f64>,
    #[arg(long, default_value_t = DEFAULT_SOLVE_TOLERANCE)]
    tolerance: f64,
    #[arg(long, default_value_t = DEFAULT_SOLVE_MAX_ITERATIONS)]
    max_iterations: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    inputs: ProjectionInputs,
    schedule: Vec<YearRecord>,
    summary: Summary,
    depletion_year: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    inputs: ProjectionInputs,
    result: GoalSolveResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn check_finite(flag: &'static str, value: f64) -> Result<f64, InputError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InputError::NonFinite { flag })
    }
}

fn check_non_negative(flag: &'static str, value: f64) -> Result<f64, InputError> {
    if check_finite(flag, value)? < 0.0 {
        return Err(InputError::Negative { flag });
    }
    Ok(value)
}

pub fn build_inputs(cli: &Cli) -> Result<ProjectionInputs, InputError> {
    let investment = check_non_negative("--investment", cli.investment)?;
    let monthly_withdrawal = check_non_negative("--monthly-withdrawal", cli.monthly_withdrawal)?;
    let step_up_percent = check_non_negative("--step-up", cli.step_up)?;
    let annual_rate_percent = check_finite("--annual-rate", cli.annual_rate)?;

    if annual_rate_percent <= -100.0 {
        return Err(InputError::RateTooLow);
    }

    if !(1..=MAX_TENURE_YEARS).contains(&cli.tenure_years) {
        return Err(InputError::TenureOutOfRange {
            max: MAX_TENURE_YEARS,
        });
    }

    if cli.defer_years > cli.tenure_years {
        return Err(InputError::DeferExceedsTenure);
    }

    Ok(ProjectionInputs {
        investment,
        monthly_withdrawal,
        annual_rate_percent,
        tenure_years: cli.tenure_years,
        defer_years: cli.defer_years,
        step_up_percent,
    })
}

/// Solver bounds default to the investment itself for withdrawals and to a
/// fixed ceiling for the required corpus.
pub fn build_solve_config(cli: &Cli, inputs: &ProjectionInputs) -> Option<GoalSolveConfig> {
    let goal = cli.goal?;
    let goal_type: GoalType = goal.into();
    let search_max = cli.search_max.unwrap_or(match goal_type {
        GoalType::SustainableWithdrawal => inputs.investment.max(1.0),
        GoalType::RequiredInvestment => DEFAULT_REQUIRED_INVESTMENT_MAX,
    });

    Some(GoalSolveConfig {
        goal_type,
        target_end_corpus: cli.target_end_corpus,
        search_min: cli.search_min,
        search_max,
        tolerance: cli.tolerance,
        max_iterations: cli.max_iterations,
    })
}

/// Produces the text the binary prints for one CLI invocation.
pub fn run_cli(cli: &Cli) -> Result<String, InputError> {
    let inputs = build_inputs(cli)?;
    debug!(?inputs, "running CLI projection");

    if let Some(config) = build_solve_config(cli, &inputs) {
        let result = solve_goal(&inputs, config)?;
        if cli.json {
            return Ok(to_json(&SolveResponse { inputs, result }));
        }
        return Ok(render_solve_result(&result));
    }

    let projection = project_with_summary(&inputs);
    if cli.json {
        Ok(to_json(&build_project_response(inputs, projection)))
    } else {
        Ok(format::render_schedule_table(&projection))
    }
}

fn render_solve_result(result: &GoalSolveResult) -> String {
    let label = match result.goal_type {
        GoalType::SustainableWithdrawal => "Sustainable monthly withdrawal",
        GoalType::RequiredInvestment => "Required investment",
    };
    let mut out = format!("{}\n", result.message);
    if let Some(value) = result.solved_value {
        out.push_str(&format!("{label}: {}\n", format::format_inr(value)));
    }
    if let Some(summary) = result.solved_summary {
        out.push_str(&format!(
            "Total Amount Withdrawn: {}\nProjected End Corpus:   {}\n",
            format::format_inr(summary.total_withdrawn as f64),
            format::format_inr(summary.final_balance as f64),
        ));
    }
    out
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/solve",
            get(solve_get_handler).post(solve_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "SWP HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(payload: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => project_handler_impl(payload).await,
        Err(rejection) => extraction_rejected(rejection.status(), &rejection.body_text()),
    }
}

async fn project_post_handler(payload: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(payload).await,
        Err(rejection) => extraction_rejected(rejection.status(), &rejection.body_text()),
    }
}

async fn solve_get_handler(payload: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => solve_handler_impl(payload).await,
        Err(rejection) => extraction_rejected(rejection.status(), &rejection.body_text()),
    }
}

async fn solve_post_handler(payload: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => solve_handler_impl(payload).await,
        Err(rejection) => extraction_rejected(rejection.status(), &rejection.body_text()),
    }
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    debug!(?payload, "project request");
    let cli = cli_from_payload(payload);
    let inputs = match build_inputs(&cli) {
        Ok(inputs) => inputs,
        Err(err) => return rejected(err),
    };

    let projection = project_with_summary(&inputs);
    json_response(StatusCode::OK, build_project_response(inputs, projection))
}

async fn solve_handler_impl(payload: ProjectPayload) -> Response {
    debug!(?payload, "solve request");
    let cli = cli_from_payload(payload);
    match solve_from_cli(&cli) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => rejected(err),
    }
}

fn solve_from_cli(cli: &Cli) -> Result<SolveResponse, InputError> {
    let inputs = build_inputs(cli)?;
    let config = build_solve_config(cli, &inputs).ok_or(InputError::MissingGoal)?;
    let result = solve_goal(&inputs, config)?;
    Ok(SolveResponse { inputs, result })
}

fn rejected(err: InputError) -> Response {
    warn!(error = %err, "rejected request");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn extraction_rejected(status: StatusCode, msg: &str) -> Response {
    warn!(%status, error = msg, "malformed request");
    error_response(status, msg)
}

fn build_project_response(inputs: ProjectionInputs, projection: Projection) -> ProjectResponse {
    ProjectResponse {
        inputs,
        schedule: projection.schedule,
        summary: projection.summary,
        depletion_year: projection.depletion_year,
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
fn cli_from_json(json: &str) -> Result<Cli, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    Ok(cli_from_payload(payload))
}

fn cli_from_payload(payload: ProjectPayload) -> Cli {
    let mut cli = default_cli();

    if let Some(v) = payload.investment {
        cli.investment = v;
    }
    if let Some(v) = payload.monthly_withdrawal {
        cli.monthly_withdrawal = v;
    }
    if let Some(v) = payload.annual_rate {
        cli.annual_rate = v;
    }
    if let Some(v) = payload.tenure_years {
        cli.tenure_years = v;
    }
    if let Some(v) = payload.defer_years {
        cli.defer_years = v;
    }
    if let Some(v) = payload.step_up {
        cli.step_up = v;
    }

    if let Some(v) = payload.goal {
        cli.goal = Some(v.into());
    }
    if let Some(v) = payload.target_end_corpus {
        cli.target_end_corpus = v;
    }
    if let Some(v) = payload.search_min {
        cli.search_min = v;
    }
    if let Some(v) = payload.search_max {
        cli.search_max = Some(v);
    }
    if let Some(v) = payload.tolerance {
        cli.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        cli.max_iterations = v;
    }

    cli
}

fn default_cli() -> Cli {
    Cli {
        investment: 10_000_000.0,
        monthly_withdrawal: 60_000.0,
        annual_rate: 12.0,
        tenure_years: 25,
        defer_years: 0,
        step_up: 5.0,
        json: false,
        goal: None,
        target_end_corpus: 0.0,
        search_min: 0.0,
        search_max: None,
        tolerance: DEFAULT_SOLVE_TOLERANCE,
        max_iterations: DEFAULT_SOLVE_MAX_ITERATIONS,
    }
}
