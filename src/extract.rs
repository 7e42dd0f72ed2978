//! Reading an assignment back out of solved variable values.

use std::collections::{BTreeMap, BTreeSet};

use crate::backend::{SolveStatus, VariableValues};
use crate::error::{AssignmentError, AssignmentResult};
use crate::model::DecisionVariables;
use crate::types::{CoLocationKey, SiteId, SlotKey, WorkerId};

/// Reject values that break exclusivity or slot coverage: no worker in two
/// slots, every slot either filled once or flagged unfilled.
pub fn check_assignment(values: &VariableValues, vars: &DecisionVariables) -> AssignmentResult<()> {
    let mut placements: BTreeMap<&WorkerId, usize> = BTreeMap::new();
    let mut coverage: BTreeMap<SlotKey, usize> = BTreeMap::new();
    for (key, &var) in &vars.assignments {
        if values.is_set(var) {
            *placements.entry(&key.worker).or_default() += 1;
            let slot = SlotKey {
                site: key.site.clone(),
                skill: key.skill.clone(),
            };
            *coverage.entry(slot).or_default() += 1;
        }
    }

    let violation = |msg: String| AssignmentError::SolverStatus {
        status: SolveStatus::Error(msg),
    };
    if let Some((worker, count)) = placements.iter().find(|&(_, &count)| count > 1) {
        return Err(violation(format!("worker {worker} fills {count} slots")));
    }
    for (slot, &var) in &vars.unfilled {
        let covered = coverage.get(slot).copied().unwrap_or(0) + usize::from(values.is_set(var));
        if covered != 1 {
            return Err(violation(format!(
                "slot {}/{} covered {covered} times",
                slot.site, slot.skill
            )));
        }
    }
    Ok(())
}

/// Map each site to the workers placed there, omitting sites with no
/// filled slot.
pub fn create_site_assignments(
    values: &VariableValues,
    vars: &DecisionVariables,
) -> BTreeMap<SiteId, Vec<WorkerId>> {
    let mut assigned: BTreeMap<SiteId, BTreeSet<WorkerId>> = BTreeMap::new();
    for (key, &var) in &vars.assignments {
        if values.is_set(var) {
            assigned
                .entry(key.site.clone())
                .or_default()
                .insert(key.worker.clone());
        }
    }

    assigned
        .into_iter()
        .map(|(site, workers)| (site, workers.into_iter().collect()))
        .collect()
}

/// Every slot the solver left open.
pub fn collect_unfilled(values: &VariableValues, vars: &DecisionVariables) -> Vec<SlotKey> {
    vars.unfilled
        .iter()
        .filter(|&(_, &var)| values.is_set(var))
        .map(|(slot, _)| slot.clone())
        .collect()
}

/// Co-location indicators the solver raised.
pub fn collect_co_located(
    values: &VariableValues,
    vars: &DecisionVariables,
) -> Vec<CoLocationKey> {
    vars.co_located
        .iter()
        .filter(|&(_, &var)| values.is_set(var))
        .map(|(key, _)| key.clone())
        .collect()
}
