//! The boundary to the mixed-integer optimization backend.

use good_lp::solvers::SolutionStatus;
use good_lp::solvers::coin_cbc::coin_cbc;
use good_lp::{
    Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{AssignmentError, AssignmentResult};

/// A complete model ready to hand to a backend.
pub struct LinearModel {
    pub variables: ProblemVariables,
    pub objective: Expression,
    pub constraints: Vec<Constraint>,
    /// Variables whose values are read back after solving.
    pub tracked: Vec<Variable>,
}

#[derive(Debug, Clone, Default)]
pub struct SolveLimits {
    /// Wall-clock budget for the search step.
    pub time_limit: Option<Duration>,
    /// Use a feasible but unproven solution instead of failing.
    pub accept_feasible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    Optimal,
    /// A feasible solution, stopped before optimality was proven.
    FeasibleNonOptimal,
    /// The time limit was hit. Values are present if an incumbent was found.
    TimedOut,
    Infeasible,
    Error(String),
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "OPTIMAL"),
            SolveStatus::FeasibleNonOptimal => write!(f, "FEASIBLE"),
            SolveStatus::TimedOut => write!(f, "TIMEOUT"),
            SolveStatus::Infeasible => write!(f, "INFEASIBLE"),
            SolveStatus::Error(msg) => write!(f, "ERROR ({msg})"),
        }
    }
}

const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Values of the tracked variables
#[derive(Debug, Clone, Default)]
pub struct VariableValues(HashMap<Variable, f64>);

impl VariableValues {
    pub fn new(values: HashMap<Variable, f64>) -> Self {
        Self(values)
    }

    pub fn value(&self, var: Variable) -> f64 {
        self.0.get(&var).copied().unwrap_or(0.0)
    }

    /// Binary variables are read back with a tolerance for solver noise.
    pub fn is_set(&self, var: Variable) -> bool {
        self.value(var) > 0.5
    }

    /// Every value is 0 or 1 up to solver tolerance. Leftover LP relaxation
    /// columns from a search stopped before any incumbent fail this.
    pub fn is_binary(&self) -> bool {
        let near = |v: f64, target: f64| (v - target).abs() <= INTEGRALITY_TOLERANCE;
        self.0.values().all(|&v| near(v, 0.0) || near(v, 1.0))
    }
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub values: Option<VariableValues>,
}

impl SolveOutcome {
    pub fn failed(status: SolveStatus) -> Self {
        Self {
            status,
            values: None,
        }
    }
}

/// Anything that can minimise a [`LinearModel`] over binary variables.
pub trait SolverBackend {
    fn name(&self) -> &str;

    /// Run the search. Never retries; the caller decides what a
    /// non-optimal status means.
    fn solve(&self, model: LinearModel, limits: &SolveLimits) -> SolveOutcome;
}

/// COIN-OR CBC through `good_lp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CbcBackend;

impl SolverBackend for CbcBackend {
    fn name(&self) -> &str {
        "cbc"
    }

    fn solve(&self, model: LinearModel, limits: &SolveLimits) -> SolveOutcome {
        let LinearModel {
            variables,
            objective,
            constraints,
            tracked,
        } = model;

        let mut problem = variables.minimise(objective).using(coin_cbc);
        #[cfg(not(debug_assertions))]
        problem.set_parameter("loglevel", "0");
        if let Some(limit) = limits.time_limit {
            problem.set_parameter("seconds", &limit.as_secs_f64().to_string());
        }
        let problem = constraints
            .into_iter()
            .fold(problem, |p, constraint| p.with(constraint));

        let started = Instant::now();
        let result = problem.solve();
        let elapsed = started.elapsed();
        debug!(elapsed_ms = elapsed.as_millis() as u64, "cbc finished");

        match result {
            Ok(solution) => {
                let status = match solution.status() {
                    SolutionStatus::Optimal => SolveStatus::Optimal,
                    SolutionStatus::TimeLimit => SolveStatus::TimedOut,
                    SolutionStatus::GapLimit => SolveStatus::FeasibleNonOptimal,
                };
                let values = VariableValues::new(
                    tracked
                        .iter()
                        .map(|&var| (var, solution.value(var)))
                        .collect(),
                );
                if status == SolveStatus::TimedOut && !values.is_binary() {
                    debug!("time limit reached before an integer incumbent");
                    return SolveOutcome::failed(SolveStatus::TimedOut);
                }
                SolveOutcome {
                    status,
                    values: Some(values),
                }
            }
            Err(ResolutionError::Infeasible) => SolveOutcome::failed(SolveStatus::Infeasible),
            Err(_) if limits.time_limit.is_some_and(|limit| elapsed >= limit) => {
                SolveOutcome::failed(SolveStatus::TimedOut)
            }
            Err(err) => SolveOutcome::failed(SolveStatus::Error(err.to_string())),
        }
    }
}

pub const DEFAULT_BACKEND: &str = "cbc";

/// Look up a backend by name.
pub fn backend_by_name(name: &str) -> AssignmentResult<Box<dyn SolverBackend>> {
    match name {
        "cbc" | "coin_cbc" => Ok(Box::new(CbcBackend)),
        other => Err(AssignmentError::SolverUnavailable(format!(
            "no backend named {other:?}, available: cbc"
        ))),
    }
}

/// Apply the caller's acceptance policy to a backend outcome.
///
/// Optimal results always pass. Feasible or timed-out results pass only with
/// `accept_feasible` and only when the backend produced integer values.
pub fn accept(outcome: SolveOutcome, limits: &SolveLimits) -> AssignmentResult<VariableValues> {
    let SolveOutcome { status, values } = outcome;
    match (status, values) {
        (SolveStatus::Optimal, Some(values)) => {
            info!("optimal solution found");
            Ok(values)
        }
        (status @ (SolveStatus::FeasibleNonOptimal | SolveStatus::TimedOut), Some(values))
            if limits.accept_feasible && values.is_binary() =>
        {
            warn!(%status, "accepting a solution that is not proven optimal");
            Ok(values)
        }
        (status, _) => Err(AssignmentError::SolverStatus { status }),
    }
}
