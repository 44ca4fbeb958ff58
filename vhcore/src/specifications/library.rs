use std::collections::HashMap;

use either::Either;
use enum_map::EnumMap;
use log::debug;
use uuid::Uuid;

use crate::{
    dispatch::SpecHandle,
    engine::{ResultKind, VerificationResult},
};

/// Tally of verdicts per [`ResultKind`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    counts: EnumMap<ResultKind, usize>,
}

impl Summary {
    pub fn record(&mut self, result: &VerificationResult) {
        self.counts[result.kind()] += 1;
    }

    pub fn get(&self, kind: ResultKind) -> usize {
        self.counts[kind]
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(kind, count)| format!("{} {}", count, kind))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Every obligation dispatched in a run, indexed for retrieval.
///
/// Re-dispatching a specification records a new obligation; the uuid index
/// points to the latest one.
#[derive(Debug, Clone, Default)]
pub struct SpecLibrary {
    handles: Vec<SpecHandle>,
    uuid_index: HashMap<Uuid, SpecHandle>,
    target_index: HashMap<String, Vec<SpecHandle>>,
}

impl SpecLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dispatched obligation.
    pub fn insert(&mut self, handle: SpecHandle) {
        let previous = self.uuid_index.insert(handle.uuid(), handle.clone());
        self.target_index
            .entry(handle.target().to_string())
            .or_default()
            .push(handle.clone());

        debug!(
            "Recorded specification {} for `{}` via `{}`: {}{}",
            handle.uuid(),
            handle.target(),
            handle.entry_point(),
            handle.result(),
            if previous.is_some() { " (re-dispatch)" } else { "" }
        );
        self.handles.push(handle);
    }

    /// Latest obligation of the specification with the given uuid.
    pub fn get_by_uuid(&self, uuid: Uuid) -> Option<&SpecHandle> {
        self.uuid_index.get(&uuid)
    }

    /// Obligations of `target`, in dispatch order.
    pub fn for_target(&self, target: &str) -> impl Iterator<Item = &SpecHandle> {
        if let Some(handles) = self.target_index.get(target) {
            Either::Left(handles.iter())
        } else {
            Either::Right(std::iter::empty())
        }
    }

    pub fn latest_for_target(&self, target: &str) -> Option<&SpecHandle> {
        self.target_index
            .get(target)
            .and_then(|handles| handles.last())
    }

    /// Obligations that were trusted rather than checked.
    pub fn assumed(&self) -> impl Iterator<Item = &SpecHandle> {
        self.handles
            .iter()
            .filter(|handle| handle.result().is_assumed_without_proof())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpecHandle> {
        self.handles.iter()
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for handle in &self.handles {
            summary.record(handle.result());
        }
        summary
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
