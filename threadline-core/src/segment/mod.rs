//! Delegation grouping
//!
//! Turns the flat event log into [`ActivityGroup`]s, one per delegation of a
//! given kind. A single scanner serves every kind; the differences live in
//! [`KindConfig`].
//!
//! ## Scan rules
//!
//! For every agent turn carrying a delegation of the kind, a forward scan
//! starts at the next event:
//!
//! | Event | Effect |
//! |-------|--------|
//! | Result | classified into an artifact bucket; extends the span |
//! | Result matching the delegation id | terminal: payload candidate, `Completed`, stop |
//! | Agent turn with a new delegation of the same kind | stop before it; span ends at the preceding event |
//! | Agent turn with substantive text | appended to the fallback narrative; extends the span |
//! | Anything else | skipped |
//!
//! The final payload follows a fixed precedence: a terminal shorter than
//! `min_terminal_len` loses to a nonempty narrative; any other terminal wins;
//! the narrative is used when no terminal arrived.
//!
//! Several delegations of the same kind in one turn run side by side. Each is
//! scanned in invocation order; events owned by an earlier sibling and results
//! terminating another sibling are skipped.

pub mod artifacts;
pub mod kinds;
pub mod status;

pub use artifacts::{ArtifactCategory, ArtifactClassifier, ArtifactRule};
pub use kinds::{DelegationMatcher, KindConfig};
pub use status::StatusTracker;

use crate::correlation::CorrelationIndex;
use crate::diagnostics::Diagnostics;
use crate::types::{
    ActivityGroup, ArtifactBuckets, Event, Invocation, KindGroups, PayloadSource,
};
use kinds::TASK_DESCRIPTION_KEYS;
use std::collections::HashSet;

/// Groups one kind of delegation.
#[derive(Debug, Clone)]
pub struct Grouper<'c> {
    config: &'c KindConfig,
    classifier: ArtifactClassifier,
}

impl<'c> Grouper<'c> {
    pub fn new(config: &'c KindConfig) -> Self {
        Self {
            config,
            classifier: ArtifactClassifier::new(config.artifact_rules),
        }
    }

    pub fn config(&self) -> &KindConfig {
        self.config
    }

    /// Produce every group of this kind, in delegation order.
    pub fn group(
        &self,
        events: &[Event],
        index: &CorrelationIndex<'_>,
        diagnostics: &dyn Diagnostics,
    ) -> Vec<ActivityGroup> {
        let mut groups = Vec::new();
        let mut owned: HashSet<usize> = HashSet::new();

        for (position, event) in events.iter().enumerate() {
            let Event::AgentTurn { invocations, .. } = event else {
                continue;
            };
            let delegations: Vec<&Invocation> = invocations
                .iter()
                .filter(|inv| self.config.is_delegation(inv))
                .collect();
            if delegations.is_empty() {
                continue;
            }

            let siblings: HashSet<&str> = delegations
                .iter()
                .map(|inv| inv.correlation_id.as_str())
                .collect();

            for delegation in delegations {
                let scan = Scan {
                    events,
                    start: position,
                    delegation,
                    siblings: &siblings,
                };
                groups.push(self.scan(scan, &mut owned, index, diagnostics));
            }
        }

        tracing::debug!(
            kind = %self.config.kind,
            groups = groups.len(),
            "Grouped delegations"
        );

        groups
    }

    /// Same as [`Grouper::group`], tagged with the kind.
    pub fn group_kind(
        &self,
        events: &[Event],
        index: &CorrelationIndex<'_>,
        diagnostics: &dyn Diagnostics,
    ) -> KindGroups {
        KindGroups {
            kind: self.config.kind,
            groups: self.group(events, index, diagnostics),
        }
    }

    fn scan(
        &self,
        scan: Scan<'_>,
        owned: &mut HashSet<usize>,
        index: &CorrelationIndex<'_>,
        diagnostics: &dyn Diagnostics,
    ) -> ActivityGroup {
        let start_index = scan.events[scan.start].index();
        let delegation_id = scan.delegation.correlation_id.as_str();

        let mut state = ScanState::new(start_index);
        // The delegating turn belongs to the first sibling that claims it.
        if owned.insert(start_index) {
            state.members.push(start_index);
        }

        let mut previous_index = start_index;
        for event in &scan.events[scan.start + 1..] {
            let event_index = event.index();
            if owned.contains(&event_index) {
                previous_index = event_index;
                continue;
            }

            match event {
                Event::ToolResult { correlation_id, content, .. } => {
                    let is_terminal = correlation_id == delegation_id;
                    if !is_terminal && scan.siblings.contains(correlation_id.as_str()) {
                        previous_index = event_index;
                        continue;
                    }

                    match self.classifier.classify(event, index, diagnostics) {
                        Some(artifact) => {
                            state.artifacts.push(artifact);
                            state.tracker.observe_artifact();
                            state.claim(event_index, owned);
                        }
                        None if is_terminal || self.config.count_unclassified_results => {
                            state.claim(event_index, owned);
                        }
                        None => {}
                    }

                    if is_terminal {
                        state.tracker.observe_terminal();
                        state.terminal = Some(content.clone());
                        break;
                    }
                }
                Event::AgentTurn { content, invocations, .. } => {
                    if invocations.iter().any(|inv| self.config.is_delegation(inv)) {
                        state.end_index = state.end_index.max(previous_index);
                        break;
                    }
                    if self.config.is_substantive(content) {
                        state.narrative.push(content.trim().to_string());
                        state.claim(event_index, owned);
                    }
                }
                Event::Human { .. } => {}
            }
            previous_index = event_index;
        }

        let (final_payload, payload_source) =
            resolve_payload(self.config, state.terminal.take(), &state.narrative);

        state.members.sort_unstable();
        let group = ActivityGroup {
            kind: self.config.kind,
            task_description: scan
                .delegation
                .str_arg(TASK_DESCRIPTION_KEYS)
                .unwrap_or_default()
                .trim()
                .to_string(),
            delegation_correlation_id: delegation_id.to_string(),
            start_index,
            end_index: state.end_index,
            status: state.tracker.status(),
            artifacts: state.artifacts,
            final_payload,
            payload_source,
            member_indices: state.members,
        };

        tracing::trace!(
            kind = %group.kind,
            delegation = %group.delegation_correlation_id,
            start = group.start_index,
            end = group.end_index,
            status = %group.status,
            artifacts = group.artifacts.len(),
            "Scanned delegation"
        );

        group
    }
}

/// Inputs of one delegation scan.
struct Scan<'e> {
    events: &'e [Event],
    /// Position of the delegating turn in `events`
    start: usize,
    delegation: &'e Invocation,
    /// Correlation ids of every same-kind delegation in the delegating turn
    siblings: &'e HashSet<&'e str>,
}

/// Mutable state of one delegation scan.
struct ScanState {
    tracker: StatusTracker,
    artifacts: ArtifactBuckets,
    narrative: Vec<String>,
    terminal: Option<String>,
    end_index: usize,
    members: Vec<usize>,
}

impl ScanState {
    fn new(start_index: usize) -> Self {
        Self {
            tracker: StatusTracker::new(),
            artifacts: ArtifactBuckets::default(),
            narrative: Vec::new(),
            terminal: None,
            end_index: start_index,
            members: Vec::new(),
        }
    }

    fn claim(&mut self, event_index: usize, owned: &mut HashSet<usize>) {
        self.end_index = self.end_index.max(event_index);
        self.members.push(event_index);
        owned.insert(event_index);
    }
}

/// Choose the group payload from the terminal result and the narrative.
pub fn resolve_payload(
    config: &KindConfig,
    terminal: Option<String>,
    narrative: &[String],
) -> (Option<String>, PayloadSource) {
    let narrative = (!narrative.is_empty()).then(|| narrative.join("\n\n"));

    match (terminal, narrative) {
        (Some(terminal), Some(narrative)) if config.is_short_terminal(&terminal) => {
            (Some(narrative), PayloadSource::Narrative)
        }
        (Some(terminal), _) => (Some(terminal), PayloadSource::Terminal),
        (None, Some(narrative)) => (Some(narrative), PayloadSource::Narrative),
        (None, None) => (None, PayloadSource::None),
    }
}
