//! Correlation index
//!
//! Maps correlation ids to the invocation that issued them and the result that
//! resolved them. Every grouper and the timeline merge read from the same
//! index, built once per segmentation pass.
//!
//! ## Duplicate handling
//!
//! | Situation | Policy | Reported as |
//! |-----------|--------|-------------|
//! | Same id invoked twice | last invocation wins | [`Anomaly::DuplicateInvocation`] |
//! | Same id resolved twice | first result wins | [`Anomaly::DuplicateResult`] |
//! | Result without invocation | kept, looked up as usual | [`Anomaly::OrphanResult`] |
//!
//! The only fatal condition is a log whose indices are not strictly increasing.

use crate::diagnostics::{Anomaly, Diagnostics};
use crate::error::{Error, Result};
use crate::types::{Event, Invocation};
use std::collections::HashMap;

/// An invocation together with the agent turn that carried it.
#[derive(Debug, Clone, Copy)]
pub struct InvocationEntry<'a> {
    pub invocation: &'a Invocation,
    /// Index of the agent turn carrying the invocation
    pub owner_index: usize,
}

/// A result event, borrowed from the log.
#[derive(Debug, Clone, Copy)]
pub struct ResultEntry<'a> {
    pub index: usize,
    pub producer_name: &'a str,
    pub content: &'a str,
    pub is_error: bool,
}

/// Lookup from correlation id to invocation and result.
#[derive(Debug, Default)]
pub struct CorrelationIndex<'a> {
    invocations: HashMap<&'a str, InvocationEntry<'a>>,
    results: HashMap<&'a str, ResultEntry<'a>>,
}

impl<'a> CorrelationIndex<'a> {
    /// Build the index for `events`.
    ///
    /// Fails only if event indices are not strictly increasing.
    pub fn build(events: &'a [Event], diagnostics: &dyn Diagnostics) -> Result<Self> {
        check_monotonic(events)?;

        let mut index = CorrelationIndex::default();
        let mut result_order: Vec<(&'a str, usize)> = Vec::new();

        for event in events {
            match event {
                Event::AgentTurn {
                    index: owner_index,
                    invocations,
                    ..
                } => {
                    for invocation in invocations {
                        let entry = InvocationEntry {
                            invocation,
                            owner_index: *owner_index,
                        };
                        if let Some(previous) = index
                            .invocations
                            .insert(invocation.correlation_id.as_str(), entry)
                        {
                            diagnostics.report(Anomaly::DuplicateInvocation {
                                correlation_id: invocation.correlation_id.clone(),
                                first_index: previous.owner_index,
                                second_index: *owner_index,
                            });
                        }
                    }
                }
                Event::ToolResult {
                    index: result_index,
                    correlation_id,
                    producer_name,
                    content,
                    is_error,
                } => {
                    if let Some(first) = index.results.get(correlation_id.as_str()) {
                        diagnostics.report(Anomaly::DuplicateResult {
                            correlation_id: correlation_id.clone(),
                            first_index: first.index,
                            second_index: *result_index,
                        });
                        continue;
                    }
                    index.results.insert(
                        correlation_id.as_str(),
                        ResultEntry {
                            index: *result_index,
                            producer_name,
                            content,
                            is_error: *is_error,
                        },
                    );
                    result_order.push((correlation_id.as_str(), *result_index));
                }
                Event::Human { .. } => {}
            }
        }

        // Checked after the full pass so an invocation anywhere in the log counts.
        for (correlation_id, result_index) in result_order {
            if !index.invocations.contains_key(correlation_id) {
                diagnostics.report(Anomaly::OrphanResult {
                    correlation_id: correlation_id.to_string(),
                    index: result_index,
                });
            }
        }

        tracing::debug!(
            invocations = index.invocations.len(),
            results = index.results.len(),
            "Built correlation index"
        );

        Ok(index)
    }

    pub fn invocation(&self, correlation_id: &str) -> Option<&InvocationEntry<'a>> {
        self.invocations.get(correlation_id)
    }

    pub fn result(&self, correlation_id: &str) -> Option<&ResultEntry<'a>> {
        self.results.get(correlation_id)
    }

    /// Whether the invocation with this id has been resolved.
    pub fn is_resolved(&self, correlation_id: &str) -> bool {
        self.results.contains_key(correlation_id)
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.len()
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }
}

fn check_monotonic(events: &[Event]) -> Result<()> {
    for (position, pair) in events.windows(2).enumerate() {
        let (previous, found) = (pair[0].index(), pair[1].index());
        if found <= previous {
            return Err(Error::NonMonotonicIndex {
                position: position + 1,
                previous,
                found,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use serde_json::json;

    fn call(id: &str, name: &str) -> Invocation {
        Invocation::new(id, name, json!({}))
    }

    #[test]
    fn test_links_invocation_and_result() {
        let events = vec![
            Event::human(0, "find things"),
            Event::agent_turn(1, "", vec![call("a", "read_file")]),
            Event::tool_result(2, "a", "read_file", "contents"),
        ];
        let sink = CollectingDiagnostics::new();
        let index = CorrelationIndex::build(&events, &sink).unwrap();

        let entry = index.invocation("a").unwrap();
        assert_eq!(entry.owner_index, 1);
        assert_eq!(entry.invocation.name, "read_file");
        assert_eq!(index.result("a").unwrap().index, 2);
        assert!(index.is_resolved("a"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_duplicate_invocation_last_wins() {
        let events = vec![
            Event::agent_turn(0, "", vec![call("dup", "read_file")]),
            Event::agent_turn(1, "", vec![call("dup", "write_file")]),
        ];
        let sink = CollectingDiagnostics::new();
        let index = CorrelationIndex::build(&events, &sink).unwrap();

        let entry = index.invocation("dup").unwrap();
        assert_eq!(entry.owner_index, 1);
        assert_eq!(entry.invocation.name, "write_file");
        assert_eq!(
            sink.anomalies(),
            vec![Anomaly::DuplicateInvocation {
                correlation_id: "dup".to_string(),
                first_index: 0,
                second_index: 1,
            }]
        );
    }

    #[test]
    fn test_duplicate_result_first_wins() {
        let events = vec![
            Event::agent_turn(0, "", vec![call("x", "read_file")]),
            Event::tool_result(1, "x", "read_file", "first"),
            Event::tool_result(2, "x", "read_file", "second"),
        ];
        let sink = CollectingDiagnostics::new();
        let index = CorrelationIndex::build(&events, &sink).unwrap();

        assert_eq!(index.result("x").unwrap().content, "first");
        assert_eq!(sink.anomalies()[0].as_str(), "duplicate_result");
    }

    #[test]
    fn test_orphan_result_reported() {
        let events = vec![Event::tool_result(0, "ghost", "read_file", "?")];
        let sink = CollectingDiagnostics::new();
        let index = CorrelationIndex::build(&events, &sink).unwrap();

        assert!(index.result("ghost").is_some());
        assert_eq!(
            sink.anomalies(),
            vec![Anomaly::OrphanResult {
                correlation_id: "ghost".to_string(),
                index: 0,
            }]
        );
    }

    #[test]
    fn test_non_monotonic_indices_rejected() {
        let events = vec![Event::human(0, "a"), Event::human(2, "b"), Event::human(2, "c")];
        let sink = CollectingDiagnostics::new();
        let err = CorrelationIndex::build(&events, &sink).unwrap_err();

        match err {
            Error::NonMonotonicIndex {
                position,
                previous,
                found,
            } => {
                assert_eq!(position, 2);
                assert_eq!(previous, 2);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
