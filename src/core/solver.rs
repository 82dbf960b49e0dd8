use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::engine::{simulate, summarize};
use super::{ProjectionInputs, Summary};

/// Shortfall below this is treated as float noise from fully paid months.
const SHORTFALL_EPSILON: f64 = 1e-6;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalType {
    SustainableWithdrawal,
    RequiredInvestment,
}

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    pub target_end_corpus: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub ending_balance: f64,
    pub sustained: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub target_end_corpus: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub solved_summary: Option<Summary>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("search bounds must be finite")]
    NonFiniteBounds,
    #[error("search_max must be greater than search_min")]
    EmptySearchRange,
    #[error("tolerance must be > 0")]
    InvalidTolerance,
    #[error("max_iterations must be > 0")]
    NoIterations,
    #[error("target_end_corpus must be a finite value >= 0")]
    InvalidTargetCorpus,
}

pub fn solve_goal(
    inputs: &ProjectionInputs,
    config: GoalSolveConfig,
) -> Result<GoalSolveResult, SolveError> {
    validate_config(config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_eval = evaluate_candidate(inputs, config, config.search_min);
    let high_eval = evaluate_candidate(inputs, config, config.search_max);

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    match config.goal_type {
        GoalType::RequiredInvestment => {
            if low_eval.sustained {
                solved_value = Some(config.search_min);
                converged = true;
                feasible = true;
                message = "Plan is already sustained at the lower investment bound.".to_string();
            } else if !high_eval.sustained {
                feasible = false;
                message = "No feasible investment found within the search bounds.".to_string();
            } else {
                let mut lo = config.search_min;
                let mut hi = config.search_max;
                let mut it = 0;
                while it < config.max_iterations {
                    it += 1;
                    let mid = (lo + hi) * 0.5;
                    let eval = evaluate_candidate(inputs, config, mid);
                    iterations.push(eval.iteration(it, lo, hi, mid));

                    if eval.sustained {
                        hi = mid;
                    } else {
                        lo = mid;
                    }

                    if (hi - lo).abs() <= config.tolerance {
                        converged = true;
                        break;
                    }
                }
                solved_value = Some(hi);
                feasible = true;
                message = if converged {
                    "Solved required investment.".to_string()
                } else {
                    "Reached max iterations before tolerance was met; returning best estimate."
                        .to_string()
                };
            }
        }
        GoalType::SustainableWithdrawal => {
            if !low_eval.sustained {
                feasible = false;
                message = "No sustainable withdrawal found within the search bounds.".to_string();
            } else if high_eval.sustained {
                solved_value = Some(config.search_max);
                converged = true;
                feasible = true;
                message = "Upper withdrawal bound is still sustainable; increase search max for a higher result."
                    .to_string();
            } else {
                let mut lo = config.search_min;
                let mut hi = config.search_max;
                let mut it = 0;
                while it < config.max_iterations {
                    it += 1;
                    let mid = (lo + hi) * 0.5;
                    let eval = evaluate_candidate(inputs, config, mid);
                    iterations.push(eval.iteration(it, lo, hi, mid));

                    if eval.sustained {
                        lo = mid;
                    } else {
                        hi = mid;
                    }

                    if (hi - lo).abs() <= config.tolerance {
                        converged = true;
                        break;
                    }
                }
                solved_value = Some(lo);
                feasible = true;
                message = if converged {
                    "Solved maximum sustainable monthly withdrawal.".to_string()
                } else {
                    "Reached max iterations before tolerance was met; returning best estimate."
                        .to_string()
                };
            }
        }
    }

    let solved_summary = solved_value.map(|value| {
        let candidate = candidate_inputs(inputs, config.goal_type, value);
        let trajectory = simulate(&candidate);
        summarize(&trajectory.schedule, candidate.investment)
    });

    debug!(
        goal = ?config.goal_type,
        ?solved_value,
        feasible,
        converged,
        iterations = iterations.len(),
        "goal solve finished"
    );

    Ok(GoalSolveResult {
        goal_type: config.goal_type,
        target_end_corpus: config.target_end_corpus,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        solved_summary,
        iterations,
        converged,
        feasible,
        message,
    })
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    ending_balance: f64,
    sustained: bool,
}

impl CandidateEval {
    fn iteration(self, iteration: u32, lo: f64, hi: f64, candidate: f64) -> GoalSolveIteration {
        GoalSolveIteration {
            iteration,
            lower_bound: lo,
            upper_bound: hi,
            candidate_value: candidate,
            ending_balance: self.ending_balance,
            sustained: self.sustained,
        }
    }
}

fn candidate_inputs(base: &ProjectionInputs, goal_type: GoalType, value: f64) -> ProjectionInputs {
    let value = value.max(0.0);
    match goal_type {
        GoalType::SustainableWithdrawal => ProjectionInputs {
            monthly_withdrawal: value,
            ..*base
        },
        GoalType::RequiredInvestment => ProjectionInputs {
            investment: value,
            ..*base
        },
    }
}

/// A plan is sustained when every requested withdrawal is paid in full and
/// the corpus ends at or above the target.
fn evaluate_candidate(
    base_inputs: &ProjectionInputs,
    config: GoalSolveConfig,
    candidate_value: f64,
) -> CandidateEval {
    let inputs = candidate_inputs(base_inputs, config.goal_type, candidate_value);
    let trajectory = simulate(&inputs);
    CandidateEval {
        ending_balance: trajectory.ending_balance,
        sustained: trajectory.shortfall <= SHORTFALL_EPSILON
            && trajectory.ending_balance >= config.target_end_corpus,
    }
}

fn validate_config(config: GoalSolveConfig) -> Result<(), SolveError> {
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(SolveError::NonFiniteBounds);
    }
    if config.search_max <= config.search_min {
        return Err(SolveError::EmptySearchRange);
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SolveError::InvalidTolerance);
    }
    if config.max_iterations == 0 {
        return Err(SolveError::NoIterations);
    }
    if !config.target_end_corpus.is_finite() || config.target_end_corpus < 0.0 {
        return Err(SolveError::InvalidTargetCorpus);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn zero_rate_inputs() -> ProjectionInputs {
        ProjectionInputs {
            investment: 120_000.0,
            monthly_withdrawal: 1_000.0,
            annual_rate_percent: 0.0,
            tenure_years: 10,
            defer_years: 0,
            step_up_percent: 0.0,
        }
    }

    fn config(goal_type: GoalType, search_max: f64) -> GoalSolveConfig {
        GoalSolveConfig {
            goal_type,
            target_end_corpus: 0.0,
            search_min: 0.0,
            search_max,
            tolerance: 0.5,
            max_iterations: 40,
        }
    }

    #[test]
    fn sustainable_withdrawal_solver_finds_zero_rate_solution() {
        // 120,000 over 120 months with no growth funds exactly 1,000 a month.
        let result = solve_goal(
            &zero_rate_inputs(),
            config(GoalType::SustainableWithdrawal, 5_000.0),
        )
        .expect("must solve");

        assert!(result.feasible);
        assert!(result.converged);
        assert_close(result.solved_value.expect("value expected"), 1_000.0, 0.5);
        assert!(!result.iterations.is_empty());
        assert!(result.iterations.iter().all(|it| it.lower_bound <= it.upper_bound));
    }

    #[test]
    fn required_investment_solver_finds_zero_rate_solution() {
        let result = solve_goal(
            &zero_rate_inputs(),
            config(GoalType::RequiredInvestment, 1_000_000.0),
        )
        .expect("must solve");

        assert!(result.feasible);
        let value = result.solved_value.expect("value expected");
        assert_close(value, 120_000.0, 0.5);
        let summary = result.solved_summary.expect("summary expected");
        assert_eq!(summary.total_withdrawn, 120_000);
    }

    #[test]
    fn target_end_corpus_raises_required_investment() {
        let mut cfg = config(GoalType::RequiredInvestment, 1_000_000.0);
        cfg.target_end_corpus = 30_000.0;

        let result = solve_goal(&zero_rate_inputs(), cfg).expect("must solve");
        assert_close(result.solved_value.expect("value expected"), 150_000.0, 0.5);
    }

    #[test]
    fn deferment_and_growth_allow_higher_withdrawal() {
        let mut inputs = zero_rate_inputs();
        inputs.annual_rate_percent = 8.0;
        inputs.defer_years = 2;

        let deferred = solve_goal(&inputs, config(GoalType::SustainableWithdrawal, 10_000.0))
            .expect("must solve")
            .solved_value
            .expect("value expected");

        assert!(deferred > 1_000.0, "got {deferred}");
    }

    #[test]
    fn required_investment_reports_infeasible_when_bounds_too_low() {
        let result = solve_goal(
            &zero_rate_inputs(),
            config(GoalType::RequiredInvestment, 50_000.0),
        )
        .expect("must return result");

        assert!(!result.feasible);
        assert!(result.solved_value.is_none());
        assert!(result.solved_summary.is_none());
    }

    #[test]
    fn sustainable_withdrawal_saturates_at_upper_bound() {
        let result = solve_goal(
            &zero_rate_inputs(),
            config(GoalType::SustainableWithdrawal, 500.0),
        )
        .expect("must return result");

        assert!(result.feasible);
        assert_eq!(result.solved_value, Some(500.0));
        assert!(result.message.contains("increase search max"));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let inputs = zero_rate_inputs();
        let base = config(GoalType::SustainableWithdrawal, 5_000.0);

        let cases = [
            (
                GoalSolveConfig {
                    search_max: f64::INFINITY,
                    ..base
                },
                SolveError::NonFiniteBounds,
            ),
            (
                GoalSolveConfig {
                    search_max: 0.0,
                    ..base
                },
                SolveError::EmptySearchRange,
            ),
            (
                GoalSolveConfig {
                    tolerance: 0.0,
                    ..base
                },
                SolveError::InvalidTolerance,
            ),
            (
                GoalSolveConfig {
                    max_iterations: 0,
                    ..base
                },
                SolveError::NoIterations,
            ),
            (
                GoalSolveConfig {
                    target_end_corpus: -1.0,
                    ..base
                },
                SolveError::InvalidTargetCorpus,
            ),
        ];

        for (cfg, expected) in cases {
            assert_eq!(solve_goal(&inputs, cfg).expect_err("must reject"), expected);
        }
    }
}
