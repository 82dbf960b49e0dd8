use tracing::trace;

use super::types::{Projection, ProjectionInputs, Summary, YearRecord};

const MONTHS_PER_YEAR: u32 = 12;

/// Unrounded state left behind by a run, used by the solver.
#[derive(Debug, Clone)]
pub(crate) struct Trajectory {
    pub schedule: Vec<YearRecord>,
    pub ending_balance: f64,
    pub shortfall: f64,
}

pub fn project(inputs: &ProjectionInputs) -> Vec<YearRecord> {
    simulate(inputs).schedule
}

pub fn project_with_summary(inputs: &ProjectionInputs) -> Projection {
    let schedule = project(inputs);
    let summary = summarize(&schedule, inputs.investment);
    let depletion_year = depletion_year(&schedule);
    Projection {
        schedule,
        summary,
        depletion_year,
    }
}

/// Folds a schedule into totals. `investment` must be the original input, not
/// any opening balance from the schedule. Totals saturate at `i64::MAX`, the
/// same ceiling the rounded rows are clamped to.
pub fn summarize(schedule: &[YearRecord], investment: f64) -> Summary {
    let total_withdrawn = schedule
        .iter()
        .fold(0i64, |acc, r| acc.saturating_add(r.withdrawal));
    let final_balance = schedule.last().map(|r| r.closing).unwrap_or(0);
    Summary {
        total_withdrawn,
        final_balance,
        wealth_gain: wealth_gain(final_balance, total_withdrawn, investment),
    }
}

/// Computed in `f64` so saturated totals cannot overflow.
fn wealth_gain(final_balance: i64, total_withdrawn: i64, investment: f64) -> f64 {
    final_balance as f64 + total_withdrawn as f64 - investment
}

/// First year in which an active withdrawal plan exhausted the corpus.
pub fn depletion_year(schedule: &[YearRecord]) -> Option<u32> {
    schedule
        .iter()
        .find(|r| r.closing == 0 && r.withdrawal > 0)
        .map(|r| r.year)
}

pub(crate) fn simulate(inputs: &ProjectionInputs) -> Trajectory {
    let monthly_rate = inputs.annual_rate_percent / 100.0 / 12.0;
    let step_up_factor = 1.0 + inputs.step_up_percent / 100.0;

    let mut balance = inputs.investment;
    let mut current_withdrawal = inputs.monthly_withdrawal;
    let mut shortfall = 0.0;
    let mut schedule = Vec::with_capacity(inputs.tenure_years as usize);

    for year in 1..=inputs.tenure_years {
        let opening = balance;
        let withdrawals_active = year > inputs.defer_years;
        let mut year_interest = 0.0;
        let mut year_withdrawal = 0.0;

        for _ in 0..MONTHS_PER_YEAR {
            // Interest is credited before the month's withdrawal.
            let interest = balance * monthly_rate;
            balance += interest;
            year_interest += interest;

            if withdrawals_active {
                let withdrawn = balance.min(current_withdrawal);
                balance -= withdrawn;
                year_withdrawal += withdrawn;
                shortfall += current_withdrawal - withdrawn;
            }
        }

        schedule.push(YearRecord {
            year,
            opening: round_half_up(opening),
            withdrawal: round_half_up(year_withdrawal),
            interest: round_half_up(year_interest),
            closing: round_half_up(balance.max(0.0)),
        });

        // Also runs after the final year; the grown amount is never used.
        if withdrawals_active {
            current_withdrawal *= step_up_factor;
        }
        if balance <= 0.0 {
            balance = 0.0;
        }
    }

    trace!(
        years = schedule.len(),
        ending_balance = balance,
        shortfall,
        "projection complete"
    );

    Trajectory {
        schedule,
        ending_balance: balance,
        shortfall,
    }
}

/// Halves round toward positive infinity, so -2.5 becomes -2. Values beyond
/// the `i64` range saturate and NaN reports as 0.
pub(crate) fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded as i64
}
