//! Linear constraints of the assignment model.

use good_lp::{Constraint, Expression, Variable, constraint};
use std::collections::BTreeMap;

use crate::Problem;
use crate::model::DecisionVariables;
use crate::types::{PlacementKey, SlotKey};

/// All constraints, in the order they are added to the solver.
pub fn create_constraints(problem: &Problem, vars: &DecisionVariables) -> Vec<Constraint> {
    let mut constraints = constrain_worker_exclusivity(problem, vars);
    constraints.extend(constrain_slot_coverage(problem, vars));
    constraints.extend(constrain_co_location(vars));
    constraints
}

/// Each worker fills at most one (site, skill) slot overall.
pub fn constrain_worker_exclusivity(
    problem: &Problem,
    vars: &DecisionVariables,
) -> Vec<Constraint> {
    problem
        .workers
        .keys()
        .filter_map(|worker| {
            let mut placements = vars
                .assignments
                .iter()
                .filter(|(key, _)| &key.worker == worker)
                .map(|(_, &var)| var)
                .peekable();

            // no eligible slot: nothing to bound
            placements.peek()?;

            let zero = Expression::from(0.0);
            let total = placements.fold(zero, |sum, var| sum + var);
            Some(total.leq(1.0))
        })
        .collect()
}

/// Each slot is filled by exactly one eligible worker or marked unfilled.
///
/// A slot with no eligible worker reduces to `unfilled == 1`, so the model
/// stays feasible whatever the workforce looks like.
pub fn constrain_slot_coverage(problem: &Problem, vars: &DecisionVariables) -> Vec<Constraint> {
    problem
        .sites
        .iter()
        .flat_map(|(site, spec)| {
            spec.required_skills.iter().map(move |skill| SlotKey {
                site: site.clone(),
                skill: skill.clone(),
            })
        })
        .map(|slot| {
            let zero = Expression::from(0.0);
            let filled = vars
                .assignments
                .iter()
                .filter(|(key, _)| key.site == slot.site && key.skill == slot.skill)
                .fold(zero, |sum, (_, &var)| sum + var);

            let unfilled = vars.unfilled[&slot];
            (filled + unfilled).eq(1.0)
        })
        .collect()
}

/// `z = A AND B` for every co-location indicator, where `A` and `B` are the
/// numbers of slots each worker fills at the site (0 or 1 by exclusivity):
/// `z <= A`, `z <= B`, `z >= A + B - 1`.
pub fn constrain_co_location(vars: &DecisionVariables) -> Vec<Constraint> {
    let presence = presence_expressions(vars);
    let absent = Expression::from(0.0);

    vars.co_located
        .iter()
        .flat_map(|(key, &z)| {
            let lookup = |worker: &str| {
                presence
                    .get(&PlacementKey {
                        worker: worker.to_owned(),
                        site: key.site.clone(),
                    })
                    .unwrap_or(&absent)
                    .clone()
            };
            let a = lookup(key.pair.first());
            let b = lookup(key.pair.second());

            [
                constraint!(z <= a.clone()),
                constraint!(z <= b.clone()),
                constraint!(z >= a + b - 1.0),
            ]
        })
        .collect()
}

/// Sum of each worker's decision variables per site.
fn presence_expressions(vars: &DecisionVariables) -> BTreeMap<PlacementKey, Expression> {
    let mut placed: BTreeMap<PlacementKey, Vec<Variable>> = BTreeMap::new();
    for (key, &var) in &vars.assignments {
        let placement = PlacementKey {
            worker: key.worker.clone(),
            site: key.site.clone(),
        };
        placed.entry(placement).or_default().push(var);
    }

    placed
        .into_iter()
        .map(|(placement, vars)| {
            let zero = Expression::from(0.0);
            let total = vars.into_iter().fold(zero, |sum, var| sum + var);
            (placement, total)
        })
        .collect()
}
