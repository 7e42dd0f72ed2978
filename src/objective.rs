//! Cost coefficients for every decision variable.

use good_lp::Expression;
use std::collections::BTreeMap;

use crate::Problem;
use crate::model::DecisionVariables;
use crate::normalize::Normalized;
use crate::types::AssignmentKey;

/// Keeps the priority factor bounded when a normalized priority is tiny.
const PRIORITY_OFFSET: f64 = 0.1;

/// Scale of the unfilled-slot penalty. It must dominate any assignment cost.
const UNFILLED_PENALTY: f64 = 100.0;

pub fn priority_factor(normalized_priority: f64) -> f64 {
    1.0 / (normalized_priority + PRIORITY_OFFSET)
}

/// Cost of worker `key.worker` filling `key.skill` at `key.site`.
pub fn assignment_cost(key: &AssignmentKey, proficiency: f64, normalized: &Normalized) -> f64 {
    let weights = &normalized.weights;
    let distance = normalized.distance(&key.worker, &key.site);
    priority_factor(normalized.priority(&key.site))
        * (weights.distance * distance + weights.skill * (1.0 - proficiency))
}

/// Penalty for leaving a slot open, within [100, 200).
pub fn unfilled_penalty(normalized_priority: f64) -> f64 {
    UNFILLED_PENALTY * (2.0 - normalized_priority)
}

/// Non-positive, so compatible pairs lower the total cost when co-located.
pub fn co_location_coefficient(normalized_compatibility: f64, normalized: &Normalized) -> f64 {
    -normalized.weights.compatibility * normalized_compatibility
}

/// Every variable's coefficient, in a stable order.
pub fn collect_coefficients(
    problem: &Problem,
    vars: &DecisionVariables,
    normalized: &Normalized,
) -> Vec<(good_lp::Variable, f64)> {
    let mut coefficients = Vec::with_capacity(
        vars.assignments.len() + vars.unfilled.len() + vars.co_located.len(),
    );

    for (key, &var) in &vars.assignments {
        let proficiency = problem.workers[&key.worker].skills[&key.skill];
        coefficients.push((var, assignment_cost(key, proficiency, normalized)));
    }

    for (slot, &var) in &vars.unfilled {
        coefficients.push((var, unfilled_penalty(normalized.priority(&slot.site))));
    }

    for (key, &var) in &vars.co_located {
        let compatibility = normalized.compatibility(&key.pair);
        coefficients.push((var, co_location_coefficient(compatibility, normalized)));
    }

    coefficients
}

/// The objective to minimise: every coefficient times its variable.
pub fn create_objective_function(
    problem: &Problem,
    vars: &DecisionVariables,
    normalized: &Normalized,
) -> Expression {
    collect_coefficients(problem, vars, normalized)
        .into_iter()
        .fold(Expression::from(0.0), |sum, (var, coefficient)| {
            sum + var * coefficient
        })
}

/// Coefficients per assignment key, for reporting.
pub fn assignment_costs(
    problem: &Problem,
    vars: &DecisionVariables,
    normalized: &Normalized,
) -> BTreeMap<AssignmentKey, f64> {
    vars.assignments
        .keys()
        .map(|key| {
            let proficiency = problem.workers[&key.worker].skills[&key.skill];
            (key.clone(), assignment_cost(key, proficiency, normalized))
        })
        .collect()
}
