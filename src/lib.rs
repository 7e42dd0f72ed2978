use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub mod backend;
pub mod constraints;
pub mod error;
pub mod extract;
pub mod model;
pub mod normalize;
pub mod objective;
pub mod types;

pub use backend::{CbcBackend, SolveLimits, SolveStatus, SolverBackend, backend_by_name};
pub use error::{AssignmentError, AssignmentResult};
pub use model::ModelStats;
pub use types::{
    CompatibilityEntry, Location, SiteId, SiteSpec, SlotKey, Weights, WorkerId, WorkerSpec,
};

use backend::{LinearModel, VariableValues, accept};
use constraints::create_constraints;
use extract::{check_assignment, collect_co_located, collect_unfilled, create_site_assignments};
use model::{DecisionVariables, init_variables};
use normalize::normalize;
use objective::{assignment_costs, create_objective_function};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub workers: BTreeMap<WorkerId, WorkerSpec>,
    pub sites: BTreeMap<SiteId, SiteSpec>,
    #[serde(default)]
    pub weights: Weights,
    #[serde(rename = "sitePriorities", default)]
    pub site_priorities: Option<BTreeMap<SiteId, f64>>,
    #[serde(rename = "workerCompatibility", default)]
    pub worker_compatibility: Option<Vec<CompatibilityEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// site → workers placed there, sorted; sites with nothing filled are omitted
    pub solution: BTreeMap<SiteId, Vec<WorkerId>>,
    /// slots deliberately left open
    pub unfilled: Vec<SlotKey>,
}

impl Problem {
    /// Solve with CBC, accepting only a proven optimum.
    pub fn solve(&self) -> AssignmentResult<Solution> {
        self.solve_with(&CbcBackend, &SolveLimits::default())
    }

    pub fn solve_with(
        &self,
        backend: &dyn SolverBackend,
        limits: &SolveLimits,
    ) -> AssignmentResult<Solution> {
        let (values, vars) = self.solve_values(backend, limits)?;

        let solution = create_site_assignments(&values, &vars);
        let unfilled = collect_unfilled(&values, &vars);
        info!(
            sites_staffed = solution.len(),
            workers_assigned = solution.values().map(Vec::len).sum::<usize>(),
            unfilled = unfilled.len(),
            co_located_pairs = collect_co_located(&values, &vars).len(),
            "assignment extracted"
        );

        Ok(Solution { solution, unfilled })
    }

    /// Build, solve and accept the model, returning the raw values next to
    /// the variables they belong to.
    fn solve_values(
        &self,
        backend: &dyn SolverBackend,
        limits: &SolveLimits,
    ) -> AssignmentResult<(VariableValues, DecisionVariables)> {
        // Resolve defaults and rescale every cost signal up front
        let normalized = normalize(self)?;

        // Create all variables, and LUTs of type key → Variable
        let (variables, vars) = init_variables(self);

        let objective = create_objective_function(self, &vars, &normalized);
        let constraints = create_constraints(self, &vars);
        debug!(
            backend = backend.name(),
            constraints = constraints.len(),
            "model built"
        );

        let model = LinearModel {
            variables,
            objective,
            constraints,
            tracked: vars.tracked(),
        };
        let outcome = backend.solve(model, limits);
        let values = accept(outcome, limits)?;
        check_assignment(&values, &vars)?;

        let costs = assignment_costs(self, &vars, &normalized);
        for (key, &var) in &vars.assignments {
            if values.is_set(var) {
                debug!(
                    worker = %key.worker,
                    site = %key.site,
                    skill = %key.skill,
                    cost = costs[key],
                    "assigned"
                );
            }
        }

        Ok((values, vars))
    }

    /// Build the model without solving it and report its size.
    pub fn model_stats(&self) -> AssignmentResult<ModelStats> {
        normalize(self)?;
        let (_, vars) = init_variables(self);
        Ok(ModelStats {
            assignment_vars: vars.assignments.len(),
            unfilled_vars: vars.unfilled.len(),
            colocation_vars: vars.co_located.len(),
            constraints: create_constraints(self, &vars).len(),
        })
    }
}
