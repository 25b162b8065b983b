//! One-call entry point: correlation index, per-kind groupers, timeline merge.

use crate::config::Config;
use crate::correlation::CorrelationIndex;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::segment::{Grouper, KindConfig};
use crate::timeline;
use crate::types::{ActivityGroup, DelegationKind, Event, KindGroups, TimelineActivity};
use serde::Serialize;

/// Groups of every kind plus the merged timeline for one event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segmentation {
    pub groups: Vec<KindGroups>,
    pub timeline: Vec<TimelineActivity>,
}

impl Segmentation {
    /// Groups of one kind, empty when the kind never delegated.
    pub fn groups_for(&self, kind: DelegationKind) -> &[ActivityGroup] {
        self.groups
            .iter()
            .find(|kind_groups| kind_groups.kind == kind)
            .map(|kind_groups| kind_groups.groups.as_slice())
            .unwrap_or(&[])
    }
}

/// Runs the whole segmentation pipeline with a fixed set of kind configurations.
///
/// Stateless between calls: every call recomputes from the full log.
#[derive(Debug, Clone)]
pub struct Segmenter {
    configs: Vec<KindConfig>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(KindConfig::defaults())
    }
}

impl Segmenter {
    pub fn new(configs: Vec<KindConfig>) -> Self {
        Self { configs }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.kind_configs())
    }

    pub fn configs(&self) -> &[KindConfig] {
        &self.configs
    }

    /// Segment a full event log.
    ///
    /// Fails only when event indices are not strictly increasing; every
    /// other data problem is reported to `diagnostics`.
    pub fn segment(&self, events: &[Event], diagnostics: &dyn Diagnostics) -> Result<Segmentation> {
        let index = CorrelationIndex::build(events, diagnostics)?;

        let groups: Vec<KindGroups> = self
            .configs
            .iter()
            .map(|config| Grouper::new(config).group_kind(events, &index, diagnostics))
            .collect();

        let timeline = timeline::merge(events, &groups, &index, diagnostics);

        tracing::info!(
            events = events.len(),
            groups = groups.iter().map(|g| g.groups.len()).sum::<usize>(),
            activities = timeline.len(),
            "Segmented event log"
        );

        Ok(Segmentation { groups, timeline })
    }
}
