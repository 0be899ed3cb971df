//! Unit lookup for a set of changed paths.
//!
//! # Responsibilities
//! - Store compiled unit matchers
//! - Compute the dirty set for a change set
//! - Provide an explicit force-all entry point
//!
//! # Design Decisions
//! - Immutable after construction (shareable without locks)
//! - O(units × changes) scan (acceptable for typical repo sizes)
//! - Force-all is a separate method, never inferred from the change set

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::detect::matcher::{AnyMatcher, Matcher, SegmentPrefixMatcher};

/// Names of the units that need a rebuild.
pub type DirtySet = BTreeSet<String>;

/// A named deployable component and the directory that owns its sources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Unit {
    pub name: String,
    pub path_prefix: String,
}

impl Unit {
    pub fn new(name: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path_prefix: path_prefix.into(),
        }
    }
}

/// A unit with its compiled matcher.
#[derive(Debug)]
struct CompiledUnit {
    name: String,
    matcher: Box<dyn Matcher>,
}

/// Compiled change detector.
#[derive(Debug)]
pub struct Detector {
    units: Vec<CompiledUnit>,
}

impl Detector {
    /// Compile a detector with one prefix per unit.
    pub fn new(units: &[Unit]) -> Self {
        let units = units
            .iter()
            .map(|u| CompiledUnit {
                name: u.name.clone(),
                matcher: Box::new(SegmentPrefixMatcher::new(&u.path_prefix)),
            })
            .collect();
        Self { units }
    }

    /// Compile a detector where each unit may own several prefixes.
    ///
    /// A unit is dirty when any of its prefixes matches.
    pub fn with_prefixes<'a, I, P>(units: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, P)>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let units = units
            .into_iter()
            .map(|(name, prefixes)| {
                let matchers: Vec<Box<dyn Matcher>> = prefixes
                    .into_iter()
                    .map(|p| Box::new(SegmentPrefixMatcher::new(p)) as Box<dyn Matcher>)
                    .collect();
                CompiledUnit {
                    name: name.to_owned(),
                    matcher: Box::new(AnyMatcher::new(matchers)),
                }
            })
            .collect();
        Self { units }
    }

    /// Names of every registered unit, in registration order.
    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|u| u.name.as_str())
    }

    /// Units with at least one changed path below one of their prefixes.
    pub fn detect<S: AsRef<str>>(&self, changes: &[S]) -> DirtySet {
        let mut dirty = DirtySet::new();

        for unit in &self.units {
            if let Some(path) = changes.iter().find(|p| unit.matcher.matches(p.as_ref())) {
                tracing::debug!(unit = %unit.name, path = %path.as_ref(), "Unit marked dirty");
                dirty.insert(unit.name.clone());
            }
        }

        tracing::debug!(
            changed_paths = changes.len(),
            dirty_units = dirty.len(),
            "Change detection complete"
        );
        dirty
    }

    /// Every registered unit, regardless of what changed.
    pub fn detect_all(&self) -> DirtySet {
        self.unit_names().map(str::to_owned).collect()
    }
}

/// Units whose `path_prefix` owns at least one of `changes`.
pub fn detect<S: AsRef<str>>(units: &[Unit], changes: &[S]) -> DirtySet {
    Detector::new(units).detect(changes)
}

/// Every unit in `units` (manual trigger).
pub fn detect_all(units: &[Unit]) -> DirtySet {
    units.iter().map(|u| u.name.clone()).collect()
}
