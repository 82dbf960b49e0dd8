use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionInputs {
    pub investment: f64,
    pub monthly_withdrawal: f64,
    pub annual_rate_percent: f64,
    pub tenure_years: u32,
    pub defer_years: u32,
    pub step_up_percent: f64,
}

/// One simulated year. Monetary fields are rounded to whole units; the engine
/// carries full precision between years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: u32,
    pub opening: i64,
    pub withdrawal: i64,
    pub interest: i64,
    pub closing: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_withdrawn: i64,
    pub final_balance: i64,
    pub wealth_gain: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub schedule: Vec<YearRecord>,
    pub summary: Summary,
    pub depletion_year: Option<u32>,
}
