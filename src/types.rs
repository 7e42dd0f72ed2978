use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type WorkerId = String;
pub type SiteId = String;
pub type Skill = String;

/// A point on the plane. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location(pub f64, pub f64);

impl Location {
    /// Euclidean distance to another location
    pub fn distance_to(&self, other: &Location) -> f64 {
        (self.0 - other.0).hypot(self.1 - other.1)
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// skill → proficiency in [0, 1]
    pub skills: BTreeMap<Skill, f64>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSpec {
    #[serde(rename = "requiredSkills")]
    pub required_skills: BTreeSet<Skill>,
    pub location: Location,
}

impl SiteSpec {
    /// Skills this site requires that `worker` has a proficiency entry for.
    pub fn candidate_skills<'a>(
        &'a self,
        worker: &'a WorkerSpec,
    ) -> impl Iterator<Item = (&'a Skill, f64)> + 'a {
        self.required_skills
            .iter()
            .filter_map(|skill| worker.skills.get(skill).map(|&p| (skill, p)))
    }
}

/// Relative importance of the three cost signals. Each is expected in [0, 1];
/// they need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub skill: f64,
    pub distance: f64,
    pub compatibility: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            skill: 1.0,
            distance: 1.0,
            compatibility: 0.5,
        }
    }
}

/// A compatibility score between two workers, higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityEntry {
    pub workers: (WorkerId, WorkerId),
    pub score: f64,
}

/// One (worker, site, skill) candidate assignment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssignmentKey {
    pub worker: WorkerId,
    pub site: SiteId,
    pub skill: Skill,
}

/// A (worker, site) pair that shares at least one candidate skill
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlacementKey {
    pub worker: WorkerId,
    pub site: SiteId,
}

/// A slot is one required skill at one site
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub site: SiteId,
    pub skill: Skill,
}

/// An unordered pair of distinct workers, stored with `first < second`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerPair {
    first: WorkerId,
    second: WorkerId,
}

impl WorkerPair {
    /// Returns `None` when both ids are the same worker.
    pub fn new(a: &str, b: &str) -> Option<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Some(Self {
                first: a.to_owned(),
                second: b.to_owned(),
            }),
            std::cmp::Ordering::Greater => Some(Self {
                first: b.to_owned(),
                second: a.to_owned(),
            }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }
}

/// Co-location indicator key: both workers of `pair` at `site`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoLocationKey {
    pub pair: WorkerPair,
    pub site: SiteId,
}
