//! Input validation, default resolution, and rescaling of the raw cost
//! signals (distance, site priority, worker compatibility) onto bounded
//! ranges so they can be combined in a single objective.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::Problem;
use crate::error::{AssignmentError, AssignmentResult};
use crate::types::{PlacementKey, SiteId, Weights, WorkerId, WorkerPair};

/// Directed compatibility scores, `(a, b) → score`.
pub type DirectedScores = BTreeMap<(WorkerId, WorkerId), f64>;

/// Fully resolved and normalized inputs. Every site has a priority and every
/// unordered pair of distinct workers has a compatibility score.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub weights: Weights,
    /// Largest raw distance over all feasible (worker, site) pairs, 0 if none.
    pub max_distance: f64,
    /// Distance / `max_distance`, in [0, 1]; only feasible pairs are present.
    pub distances: BTreeMap<PlacementKey, f64>,
    /// Priority / max priority, in (0, 1].
    pub priorities: BTreeMap<SiteId, f64>,
    /// Raw compatibility after defaulting and symmetric completion.
    pub symmetric_compatibility: DirectedScores,
    /// Min-max scaled compatibility, in [0, 1].
    pub compatibility: BTreeMap<WorkerPair, f64>,
}

impl Normalized {
    pub fn distance(&self, worker: &str, site: &str) -> f64 {
        self.distances
            .get(&PlacementKey {
                worker: worker.to_owned(),
                site: site.to_owned(),
            })
            .copied()
            .unwrap_or(0.0)
    }

    pub fn priority(&self, site: &str) -> f64 {
        self.priorities.get(site).copied().unwrap_or(1.0)
    }

    pub fn compatibility(&self, pair: &WorkerPair) -> f64 {
        self.compatibility.get(pair).copied().unwrap_or(0.0)
    }
}

/// Validate `problem` and produce its normalized signals.
pub fn normalize(problem: &Problem) -> AssignmentResult<Normalized> {
    validate(problem)?;

    let (max_distance, distances) = normalize_distances(problem)?;
    let priorities = normalize_priorities(&resolve_priorities(problem));
    let symmetric_compatibility = complete_symmetric(&resolve_compatibility(problem));
    let compatibility = normalize_compatibility(problem, &symmetric_compatibility);

    debug!(
        max_distance,
        feasible_pairs = distances.len(),
        worker_pairs = compatibility.len(),
        "normalized inputs"
    );

    Ok(Normalized {
        weights: problem.weights,
        max_distance,
        distances,
        priorities,
        symmetric_compatibility,
        compatibility,
    })
}

fn invalid(msg: impl Into<String>) -> AssignmentError {
    AssignmentError::InvalidInput(msg.into())
}

fn validate(problem: &Problem) -> AssignmentResult<()> {
    if problem.workers.is_empty() {
        return Err(invalid("no workers given"));
    }
    if problem.sites.is_empty() {
        return Err(invalid("no sites given"));
    }

    let weights = &problem.weights;
    for (name, value) in [
        ("skill", weights.skill),
        ("distance", weights.distance),
        ("compatibility", weights.compatibility),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(format!(
                "{name} weight must be within [0, 1], got {value}"
            )));
        }
    }

    for (id, worker) in &problem.workers {
        if !worker.location.is_finite() {
            return Err(invalid(format!("worker {id} has a non-finite location")));
        }
        for (skill, &proficiency) in &worker.skills {
            // NaN fails the range check too
            if !(0.0..=1.0).contains(&proficiency) {
                return Err(invalid(format!(
                    "worker {id} has proficiency {proficiency} for {skill}, expected [0, 1]"
                )));
            }
        }
    }

    for (id, site) in &problem.sites {
        if !site.location.is_finite() {
            return Err(invalid(format!("site {id} has a non-finite location")));
        }
        if site.required_skills.is_empty() {
            return Err(invalid(format!("site {id} requires no skills")));
        }
    }

    for (site, &priority) in problem.site_priorities.iter().flatten() {
        if !priority.is_finite() || priority <= 0.0 {
            return Err(invalid(format!(
                "priority of site {site} must be a positive number, got {priority}"
            )));
        }
    }

    for entry in problem.worker_compatibility.iter().flatten() {
        if !entry.score.is_finite() {
            let (a, b) = &entry.workers;
            return Err(invalid(format!(
                "compatibility of workers {a} and {b} is not finite"
            )));
        }
    }

    Ok(())
}

fn normalize_distances(problem: &Problem) -> AssignmentResult<(f64, BTreeMap<PlacementKey, f64>)> {
    let mut raw = BTreeMap::new();
    for (worker_id, worker) in &problem.workers {
        for (site_id, site) in &problem.sites {
            if site.candidate_skills(worker).next().is_none() {
                continue;
            }
            let distance = worker.location.distance_to(&site.location);
            if !distance.is_finite() {
                return Err(invalid(format!(
                    "distance from worker {worker_id} to site {site_id} is not finite"
                )));
            }
            let key = PlacementKey {
                worker: worker_id.clone(),
                site: site_id.clone(),
            };
            raw.insert(key, distance);
        }
    }

    let max_distance = raw.values().copied().fold(0.0, f64::max);
    let normalized = raw
        .into_iter()
        .map(|(key, d)| {
            let n = if max_distance > 0.0 { d / max_distance } else { 0.0 };
            (key, n)
        })
        .collect();

    Ok((max_distance, normalized))
}

/// Every known site gets a priority; unlisted sites default to 1.
fn resolve_priorities(problem: &Problem) -> BTreeMap<SiteId, f64> {
    let supplied = problem.site_priorities.as_ref();
    for site in supplied.into_iter().flat_map(|p| p.keys()) {
        if !problem.sites.contains_key(site) {
            warn!(site = %site, "ignoring priority for unknown site");
        }
    }

    problem
        .sites
        .keys()
        .map(|site| {
            let priority = supplied.and_then(|p| p.get(site)).copied().unwrap_or(1.0);
            (site.clone(), priority)
        })
        .collect()
}

fn normalize_priorities(resolved: &BTreeMap<SiteId, f64>) -> BTreeMap<SiteId, f64> {
    let max_priority = resolved.values().copied().fold(0.0, f64::max);
    let max_priority = if max_priority > 0.0 { max_priority } else { 1.0 };

    resolved
        .iter()
        .map(|(site, &p)| (site.clone(), p / max_priority))
        .collect()
}

/// Collect the supplied compatibility entries as directed scores, dropping
/// entries that name unknown workers or pair a worker with itself.
fn resolve_compatibility(problem: &Problem) -> DirectedScores {
    let mut scores = DirectedScores::new();
    for entry in problem.worker_compatibility.iter().flatten() {
        let (a, b) = &entry.workers;
        if a == b {
            warn!(worker = %a, "ignoring compatibility of a worker with itself");
            continue;
        }
        if !problem.workers.contains_key(a) || !problem.workers.contains_key(b) {
            warn!(first = %a, second = %b, "ignoring compatibility for unknown worker");
            continue;
        }
        if scores.insert((a.clone(), b.clone()), entry.score).is_some() {
            warn!(first = %a, second = %b, "duplicate compatibility entry, keeping the last");
        }
    }
    scores
}

/// Fill in the missing direction of every pair.
///
/// Reads from `raw` and writes to a fresh map, so entries added here are
/// never visited again. When both directions were supplied with different
/// scores, both become their mean.
pub fn complete_symmetric(raw: &DirectedScores) -> DirectedScores {
    let mut completed = raw.clone();
    for ((a, b), &score) in raw {
        let reverse_key = (b.clone(), a.clone());
        match raw.get(&reverse_key) {
            None => {
                completed.insert(reverse_key, score);
            }
            Some(&reverse) if reverse != score => {
                if a < b {
                    warn!(
                        first = %a,
                        second = %b,
                        score,
                        reverse,
                        "asymmetric compatibility, using the mean"
                    );
                }
                completed.insert((a.clone(), b.clone()), (score + reverse) / 2.0);
            }
            Some(_) => {}
        }
    }
    completed
}

/// Min-max scale over every unordered pair of distinct workers, with
/// unsupplied pairs scored 0.
fn normalize_compatibility(
    problem: &Problem,
    symmetric: &DirectedScores,
) -> BTreeMap<WorkerPair, f64> {
    let ids: Vec<&WorkerId> = problem.workers.keys().collect();
    let mut raw = BTreeMap::new();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            let score = symmetric
                .get(&((*a).clone(), (*b).clone()))
                .copied()
                .unwrap_or(0.0);
            if let Some(pair) = WorkerPair::new(a, b) {
                raw.insert(pair, score);
            }
        }
    }

    let min = raw.values().copied().fold(f64::INFINITY, f64::min);
    let max = raw.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max > min { max - min } else { 1.0 };

    raw.into_iter()
        .map(|(pair, score)| (pair, (score - min) / range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompatibilityEntry, Location, SiteSpec, WorkerSpec};
    use proptest::prelude::*;

    fn worker(skills: &[(&str, f64)], x: f64, y: f64) -> WorkerSpec {
        WorkerSpec {
            skills: skills.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            location: Location(x, y),
        }
    }

    fn site(skills: &[&str], x: f64, y: f64) -> SiteSpec {
        SiteSpec {
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            location: Location(x, y),
        }
    }

    fn problem() -> Problem {
        Problem {
            workers: [
                ("1".to_string(), worker(&[("electrician", 0.9)], 0.0, 0.0)),
                ("2".to_string(), worker(&[("plumber", 0.8)], 3.0, 4.0)),
                ("3".to_string(), worker(&[("welder", 0.5)], 9.0, 9.0)),
            ]
            .into(),
            sites: [
                ("a".to_string(), site(&["electrician", "plumber"], 0.0, 0.0)),
                ("b".to_string(), site(&["electrician"], 6.0, 8.0)),
            ]
            .into(),
            weights: Weights::default(),
            site_priorities: None,
            worker_compatibility: None,
        }
    }

    fn entry(a: &str, b: &str, score: f64) -> CompatibilityEntry {
        CompatibilityEntry {
            workers: (a.to_string(), b.to_string()),
            score,
        }
    }

    #[test]
    fn distances_cover_only_feasible_pairs() {
        let n = normalize(&problem()).unwrap();
        assert_eq!(n.max_distance, 10.0);
        assert_eq!(n.distances.len(), 3);
        assert_eq!(n.distance("1", "a"), 0.0);
        assert_eq!(n.distance("2", "a"), 0.5);
        assert_eq!(n.distance("1", "b"), 1.0);
        // worker 3 shares no skill with any site
        assert!(n.distances.keys().all(|k| k.worker != "3"));
    }

    #[test]
    fn zero_max_distance_does_not_divide() {
        let mut p = problem();
        p.workers.retain(|id, _| id == "1");
        p.sites.retain(|id, _| id == "a");
        let n = normalize(&p).unwrap();
        assert_eq!(n.max_distance, 0.0);
        assert_eq!(n.distance("1", "a"), 0.0);
    }

    #[test]
    fn priorities_default_and_scale() {
        let mut p = problem();
        assert_eq!(normalize(&p).unwrap().priority("a"), 1.0);

        p.site_priorities = Some([("a".to_string(), 4.0), ("zzz".to_string(), 8.0)].into());
        let n = normalize(&p).unwrap();
        assert_eq!(n.priority("a"), 1.0);
        assert_eq!(n.priority("b"), 0.25);
        assert!(!n.priorities.contains_key("zzz"));
    }

    #[test]
    fn small_supplied_priorities_stay_within_unit_range() {
        let mut p = problem();
        p.site_priorities = Some([("a".to_string(), 0.5)].into());
        let n = normalize(&p).unwrap();
        assert_eq!(n.priority("a"), 0.5);
        assert_eq!(n.priority("b"), 1.0);
    }

    #[test]
    fn symmetric_completion_copies_missing_direction() {
        let raw: DirectedScores = [(("1".to_string(), "2".to_string()), 0.7)].into();
        let done = complete_symmetric(&raw);
        assert_eq!(done[&("2".to_string(), "1".to_string())], 0.7);
        assert_eq!(done.len(), 2);
    }

    #[test]
    fn symmetric_completion_averages_conflicts() {
        let raw: DirectedScores = [
            (("1".to_string(), "2".to_string()), 1.0),
            (("2".to_string(), "1".to_string()), 0.0),
        ]
        .into();
        let done = complete_symmetric(&raw);
        assert_eq!(done[&("1".to_string(), "2".to_string())], 0.5);
        assert_eq!(done[&("2".to_string(), "1".to_string())], 0.5);
    }

    #[test]
    fn compatibility_is_min_max_scaled_with_defaults() {
        let mut p = problem();
        p.worker_compatibility = Some(vec![entry("2", "1", 1.0), entry("1", "3", -1.0)]);
        let n = normalize(&p).unwrap();

        let pair = |a, b| WorkerPair::new(a, b).unwrap();
        assert_eq!(n.compatibility(&pair("1", "2")), 1.0);
        assert_eq!(n.compatibility(&pair("1", "3")), 0.0);
        // defaulted to a neutral 0 before scaling
        assert_eq!(n.compatibility(&pair("2", "3")), 0.5);
    }

    #[test]
    fn constant_compatibility_scales_to_zero() {
        let mut p = problem();
        p.worker_compatibility = Some(vec![entry("1", "2", 0.0)]);
        let n = normalize(&p).unwrap();
        assert!(n.compatibility.values().all(|&c| c == 0.0));
    }

    #[test]
    fn unknown_and_self_compatibility_entries_are_ignored() {
        let mut p = problem();
        p.worker_compatibility = Some(vec![entry("1", "1", 1.0), entry("1", "9", 1.0)]);
        let n = normalize(&p).unwrap();
        assert!(n.symmetric_compatibility.is_empty());
    }

    #[test]
    fn rejects_invalid_input() {
        let mut p = problem();
        p.workers.clear();
        assert!(matches!(normalize(&p), Err(AssignmentError::InvalidInput(_))));

        let mut p = problem();
        p.sites.clear();
        assert!(matches!(normalize(&p), Err(AssignmentError::InvalidInput(_))));

        let mut p = problem();
        p.weights.distance = 1.5;
        assert!(matches!(normalize(&p), Err(AssignmentError::InvalidInput(_))));

        let mut p = problem();
        p.weights.skill = f64::NAN;
        assert!(matches!(normalize(&p), Err(AssignmentError::InvalidInput(_))));

        let mut p = problem();
        p.workers.get_mut("1").unwrap().location = Location(f64::INFINITY, 0.0);
        assert!(matches!(normalize(&p), Err(AssignmentError::InvalidInput(_))));

        let mut p = problem();
        p.workers.get_mut("1").unwrap().skills.insert("electrician".into(), f64::NAN);
        assert!(matches!(normalize(&p), Err(AssignmentError::InvalidInput(_))));

        let mut p = problem();
        p.sites.get_mut("a").unwrap().required_skills.clear();
        assert!(matches!(normalize(&p), Err(AssignmentError::InvalidInput(_))));

        let mut p = problem();
        p.site_priorities = Some([("a".to_string(), 0.0)].into());
        assert!(matches!(normalize(&p), Err(AssignmentError::InvalidInput(_))));

        let mut p = problem();
        p.worker_compatibility = Some(vec![entry("1", "2", f64::NAN)]);
        assert!(matches!(normalize(&p), Err(AssignmentError::InvalidInput(_))));
    }

    fn arb_problem() -> impl Strategy<Value = Problem> {
        let skills = prop::sample::select(vec!["a", "b", "c"]);
        let worker = (
            prop::collection::btree_map(skills.clone(), 0.0..=1.0f64, 1..3),
            -100.0..100.0f64,
            -100.0..100.0f64,
        )
            .prop_map(|(skills, x, y)| WorkerSpec {
                skills: skills.into_iter().map(|(s, p)| (s.to_string(), p)).collect(),
                location: Location(x, y),
            });
        let site = (
            prop::collection::btree_set(skills, 1..3),
            -100.0..100.0f64,
            -100.0..100.0f64,
            0.01..50.0f64,
        );
        (
            prop::collection::vec(worker, 1..6),
            prop::collection::vec(site, 1..4),
            prop::collection::vec((0..6usize, 0..6usize, -3.0..3.0f64), 0..8),
        )
            .prop_map(|(workers, sites, scores)| {
                let n_workers = workers.len();
                let mut priorities = BTreeMap::new();
                let sites = sites
                    .into_iter()
                    .enumerate()
                    .map(|(i, (skills, x, y, priority))| {
                        priorities.insert(format!("s{i}"), priority);
                        let spec = SiteSpec {
                            required_skills: skills.into_iter().map(String::from).collect(),
                            location: Location(x, y),
                        };
                        (format!("s{i}"), spec)
                    })
                    .collect();
                let compat = scores
                    .into_iter()
                    .map(|(a, b, score)| {
                        entry(&format!("w{}", a % n_workers), &format!("w{}", b % n_workers), score)
                    })
                    .collect();
                Problem {
                    workers: workers
                        .into_iter()
                        .enumerate()
                        .map(|(i, w)| (format!("w{i}"), w))
                        .collect(),
                    sites,
                    weights: Weights::default(),
                    site_priorities: Some(priorities),
                    worker_compatibility: Some(compat),
                }
            })
    }

    proptest! {
        #[test]
        fn normalized_signals_stay_in_range(p in arb_problem()) {
            let n = normalize(&p).unwrap();
            for &d in n.distances.values() {
                prop_assert!((0.0..=1.0).contains(&d));
            }
            prop_assert_eq!(n.priorities.len(), p.sites.len());
            for &pr in n.priorities.values() {
                prop_assert!(pr > 0.0 && pr <= 1.0);
            }
            for &c in n.compatibility.values() {
                prop_assert!((0.0..=1.0).contains(&c));
            }
        }

        #[test]
        fn completed_compatibility_is_symmetric(p in arb_problem()) {
            let n = normalize(&p).unwrap();
            for ((a, b), score) in &n.symmetric_compatibility {
                let mirrored = n.symmetric_compatibility.get(&(b.clone(), a.clone()));
                prop_assert_eq!(Some(score), mirrored);
            }
        }
    }
}
