//! The decision-variable universe of an assignment model.

use good_lp::{ProblemVariables, Variable, variable, variables};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::Problem;
use crate::types::{AssignmentKey, CoLocationKey, SlotKey, WorkerPair};

pub type AssignmentVariableMap = BTreeMap<AssignmentKey, Variable>;
pub type SlotVariableMap = BTreeMap<SlotKey, Variable>;
pub type CoLocationVariableMap = BTreeMap<CoLocationKey, Variable>;

/// LUTs from what a boolean variable decides to the variable itself.
pub struct DecisionVariables {
    /// worker w fills skill k at site s
    pub assignments: AssignmentVariableMap,
    /// slot (s, k) is left open
    pub unfilled: SlotVariableMap,
    /// workers w1 and w2 are both placed at site s
    pub co_located: CoLocationVariableMap,
}

impl DecisionVariables {
    /// Every variable whose value should be read back after solving.
    pub fn tracked(&self) -> Vec<Variable> {
        self.assignments
            .values()
            .chain(self.unfilled.values())
            .chain(self.co_located.values())
            .copied()
            .collect()
    }
}

/// Size of the variable universe and constraint set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub assignment_vars: usize,
    pub unfilled_vars: usize,
    pub colocation_vars: usize,
    pub constraints: usize,
}

/// Create all variables upfront.
///
/// A (worker, site, skill) variable exists only when the site requires the
/// skill and the worker has a proficiency for it. Every required slot gets
/// an unfilled variable. Every unordered worker pair gets a co-location
/// indicator at every site, eligible there or not.
pub fn init_variables(problem: &Problem) -> (ProblemVariables, DecisionVariables) {
    let mut problem_vars = variables!();
    let mut assignments = BTreeMap::new();
    let mut unfilled = BTreeMap::new();
    let mut co_located = BTreeMap::new();

    for (worker_id, worker) in &problem.workers {
        for (site_id, site) in &problem.sites {
            for (skill, _) in site.candidate_skills(worker) {
                let var = problem_vars.add(
                    variable()
                        .binary()
                        .name(format!("x[{worker_id},{site_id},{skill}]")),
                );
                let key = AssignmentKey {
                    worker: worker_id.clone(),
                    site: site_id.clone(),
                    skill: skill.clone(),
                };
                assignments.insert(key, var);
            }
        }
    }

    for (site_id, site) in &problem.sites {
        for skill in &site.required_skills {
            let var = problem_vars.add(
                variable()
                    .binary()
                    .name(format!("unfilled[{site_id},{skill}]")),
            );
            let key = SlotKey {
                site: site_id.clone(),
                skill: skill.clone(),
            };
            unfilled.insert(key, var);
        }
    }

    let ids: Vec<&String> = problem.workers.keys().collect();
    for (i, first) in ids.iter().enumerate() {
        for second in &ids[i + 1..] {
            let Some(pair) = WorkerPair::new(first, second) else {
                continue;
            };
            for site_id in problem.sites.keys() {
                let var = problem_vars.add(
                    variable()
                        .binary()
                        .name(format!("z[{first},{second},{site_id}]")),
                );
                let key = CoLocationKey {
                    pair: pair.clone(),
                    site: site_id.clone(),
                };
                co_located.insert(key, var);
            }
        }
    }

    debug!(
        assignments = assignments.len(),
        unfilled = unfilled.len(),
        co_located = co_located.len(),
        "created decision variables"
    );

    let vars = DecisionVariables {
        assignments,
        unfilled,
        co_located,
    };
    (problem_vars, vars)
}
