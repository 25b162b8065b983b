//! Timeline merge
//!
//! Combines the groups of every kind with the events no group claimed into a
//! single ordered list of [`TimelineActivity`] entries.
//!
//! - Each kind that produced at least one group contributes exactly one entry
//!   aggregating all of its groups; its status is the first group's status.
//! - Every agent turn or result outside all group spans becomes its own entry,
//!   classified by tool name. An event inside some group's span is covered by
//!   that group's entry even when the group did not fold it in (filler turns,
//!   tools no rule matches), so it appears in neither the group nor the
//!   timeline. Renderers wanting those events read them from the log by index.
//! - Entries are ordered by source index; at equal index, research sorts
//!   before critique, critique before planning, and those before residual
//!   events.
//!
//! Merging never fails: content that cannot be read degrades the entry to
//! [`ActivityKind::Unclassified`] and is reported to the diagnostics sink.

use crate::correlation::CorrelationIndex;
use crate::diagnostics::{Anomaly, Diagnostics};
use crate::segment::artifacts::TODO_TOOLS;
use crate::types::{
    ActivityKind, ActivityPayload, DelegationKind, Event, GroupStatus, Invocation, KindGroups,
    ResidualEvent, TimelineActivity, TodoItem,
};
use serde_json::Value;
use std::collections::BTreeSet;

/// Tie-break rank of residual entries (after every delegation kind).
const RESIDUAL_RANK: usize = DelegationKind::ALL.len();

/// Longest task description kept in a group title.
const TITLE_DESCRIPTION_CHARS: usize = 80;

/// Result content prefixes that announce a file change from an unknown tool.
const FILE_UPDATE_PREFIXES: &[&str] = &["updated file", "successfully wrote"];

/// Maps recognized tool names to residual activity kinds.
struct ResidualRule {
    tools: &'static [&'static str],
    kind: ActivityKind,
}

const RESIDUAL_RULES: &[ResidualRule] = &[
    ResidualRule {
        tools: TODO_TOOLS,
        kind: ActivityKind::TodoUpdate,
    },
    ResidualRule {
        tools: &["write_file"],
        kind: ActivityKind::FileWrite,
    },
    ResidualRule {
        tools: &["edit_file"],
        kind: ActivityKind::FileEdit,
    },
];

fn rule_kind(tool_name: &str) -> Option<ActivityKind> {
    RESIDUAL_RULES
        .iter()
        .find(|rule| rule.tools.iter().any(|t| t.eq_ignore_ascii_case(tool_name)))
        .map(|rule| rule.kind)
}

/// Indices of the events covered by some group span, across all kinds.
///
/// Only indices present in `events` are returned; gaps inside a span are not.
pub fn processed_indices(events: &[Event], groups: &[KindGroups]) -> BTreeSet<usize> {
    let spans = group_spans(groups);
    events
        .iter()
        .map(Event::index)
        .filter(|event_index| is_processed(&spans, *event_index))
        .collect()
}

/// Group spans sorted by start, as inclusive `(start, end)` pairs.
fn group_spans(groups: &[KindGroups]) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = groups
        .iter()
        .flat_map(|kind_groups| kind_groups.groups.iter())
        .map(|group| (group.start_index, group.end_index))
        .collect();
    spans.sort_unstable();
    spans
}

fn is_processed(spans: &[(usize, usize)], event_index: usize) -> bool {
    // Spans may overlap across kinds, so check every span starting at or before the index
    let candidates = spans.partition_point(|(start, _)| *start <= event_index);
    spans[..candidates]
        .iter()
        .any(|(_, end)| event_index <= *end)
}

/// Merge groups and residual events into one ordered timeline.
pub fn merge(
    events: &[Event],
    groups: &[KindGroups],
    index: &CorrelationIndex<'_>,
    diagnostics: &dyn Diagnostics,
) -> Vec<TimelineActivity> {
    let spans = group_spans(groups);
    let mut entries: Vec<((usize, usize), TimelineActivity)> = Vec::new();

    for kind_groups in groups {
        if let Some(activity) = aggregate_kind(kind_groups) {
            entries.push(((activity.source_index, kind_rank(kind_groups.kind)), activity));
        }
    }

    let mut processed = 0usize;
    for event in events {
        if is_processed(&spans, event.index()) {
            processed += 1;
            continue;
        }
        if let Some(activity) = residual_activity(event, index, diagnostics) {
            entries.push(((activity.source_index, RESIDUAL_RANK), activity));
        }
    }

    entries.sort_by_key(|(key, _)| *key);

    let timeline: Vec<TimelineActivity> = entries
        .into_iter()
        .enumerate()
        .map(|(order, (_, mut activity))| {
            activity.order = order;
            activity
        })
        .collect();

    tracing::debug!(
        activities = timeline.len(),
        processed,
        "Merged timeline"
    );

    timeline
}

fn kind_rank(kind: DelegationKind) -> usize {
    DelegationKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(RESIDUAL_RANK)
}

fn aggregate_kind(kind_groups: &KindGroups) -> Option<TimelineActivity> {
    let first = kind_groups.groups.first()?;
    let kind = kind_groups.kind;

    let mut title = if first.task_description.is_empty() {
        kind.display_name().to_string()
    } else {
        format!(
            "{}: {}",
            kind.display_name(),
            truncate(&first.task_description, TITLE_DESCRIPTION_CHARS)
        )
    };
    let more = kind_groups.groups.len() - 1;
    if more > 0 {
        title.push_str(&format!(" (+{} more)", more));
    }

    Some(TimelineActivity {
        id: format!("{}-{}", kind.as_str(), first.start_index),
        order: 0,
        source_index: first.start_index,
        kind: kind.into(),
        title,
        status: first.status,
        payload: ActivityPayload::Group {
            groups: kind_groups.groups.clone(),
        },
    })
}

/// Classify one unclaimed event. Human turns are not activities.
fn residual_activity(
    event: &Event,
    index: &CorrelationIndex<'_>,
    diagnostics: &dyn Diagnostics,
) -> Option<TimelineActivity> {
    let event_index = event.index();

    let (kind, invocation, tool_name, status) = match event {
        Event::Human { .. } => return None,
        Event::AgentTurn { invocations, .. } => {
            let recognized = invocations
                .iter()
                .find_map(|inv| rule_kind(&inv.name).map(|kind| (kind, inv)));
            let status = if invocations.iter().all(|inv| index.is_resolved(&inv.correlation_id)) {
                GroupStatus::Completed
            } else {
                GroupStatus::InProgress
            };
            match recognized {
                Some((kind, inv)) => (kind, Some(inv), Some(inv.name.clone()), status),
                None => (
                    ActivityKind::Unclassified,
                    None,
                    invocations.first().map(|inv| inv.name.clone()),
                    status,
                ),
            }
        }
        Event::ToolResult {
            correlation_id,
            producer_name,
            content,
            ..
        } => {
            let invocation = index.invocation(correlation_id).map(|entry| entry.invocation);
            let kind = rule_kind(producer_name).unwrap_or_else(|| {
                if is_file_update_notice(content) {
                    ActivityKind::FileUpdate
                } else {
                    ActivityKind::Unclassified
                }
            });
            (kind, invocation, Some(producer_name.clone()), GroupStatus::Completed)
        }
    };

    let mut residual = ResidualEvent {
        event: event.clone(),
        tool_name,
        file_path: None,
        todos: None,
    };

    let kind = match kind {
        ActivityKind::TodoUpdate => match read_todos(invocation) {
            Ok(todos) => {
                residual.todos = Some(todos);
                kind
            }
            Err(reason) => {
                diagnostics.report(Anomaly::MalformedPayload {
                    index: event_index,
                    producer_name: residual.tool_name.clone().unwrap_or_default(),
                    reason,
                });
                ActivityKind::Unclassified
            }
        },
        ActivityKind::FileWrite | ActivityKind::FileEdit => {
            residual.file_path = invocation.and_then(Invocation::file_path).map(str::to_string);
            kind
        }
        ActivityKind::FileUpdate => {
            residual.file_path = invocation
                .and_then(Invocation::file_path)
                .map(str::to_string)
                .or_else(|| notice_path(event.content()));
            kind
        }
        other => other,
    };

    Some(TimelineActivity {
        id: format!("event-{}", event_index),
        order: 0,
        source_index: event_index,
        kind,
        title: residual_title(kind, &residual),
        status,
        payload: ActivityPayload::Event { residual },
    })
}

fn is_file_update_notice(content: &str) -> bool {
    let lowered = content.trim_start().to_lowercase();
    FILE_UPDATE_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

/// Path named in a notice like "Updated file /notes/plan.md".
fn notice_path(content: &str) -> Option<String> {
    let trimmed = content.trim();
    let lowered = trimmed.to_lowercase();
    let prefix = FILE_UPDATE_PREFIXES
        .iter()
        .find(|prefix| lowered.starts_with(*prefix))?;
    let rest = trimmed.get(prefix.len()..)?.trim();
    let rest = rest.strip_prefix("to ").unwrap_or(rest).trim();
    rest.split_whitespace()
        .next()
        .map(|path| path.trim_end_matches(['.', ',', ':']).to_string())
        .filter(|path| !path.is_empty())
}

/// Todo items from a `write_todos` invocation.
fn read_todos(invocation: Option<&Invocation>) -> Result<Vec<TodoItem>, String> {
    let todos = invocation
        .and_then(|inv| inv.arguments.get("todos"))
        .ok_or_else(|| "no todo list in invocation".to_string())?;
    let todos = match todos {
        // Some runtimes pass the list as an encoded string
        Value::String(encoded) => serde_json::from_str::<Value>(encoded).map_err(|e| e.to_string())?,
        other => other.clone(),
    };
    serde_json::from_value(todos).map_err(|e| e.to_string())
}

fn residual_title(kind: ActivityKind, residual: &ResidualEvent) -> String {
    let path = residual.file_path.as_deref();
    match kind {
        ActivityKind::TodoUpdate => {
            let count = residual.todos.as_ref().map(Vec::len).unwrap_or(0);
            format!("Updated todo list ({} items)", count)
        }
        ActivityKind::FileWrite => path
            .map(|p| format!("Wrote {}", p))
            .unwrap_or_else(|| "Wrote file".to_string()),
        ActivityKind::FileEdit => path
            .map(|p| format!("Edited {}", p))
            .unwrap_or_else(|| "Edited file".to_string()),
        ActivityKind::FileUpdate => path
            .map(|p| format!("Updated {}", p))
            .unwrap_or_else(|| "File updated".to_string()),
        _ => match (&residual.event, residual.tool_name.as_deref()) {
            (Event::ToolResult { is_error: true, .. }, Some(tool)) => format!("{} failed", tool),
            (Event::ToolResult { .. }, Some(tool)) => format!("{} result", tool),
            (Event::AgentTurn { .. }, Some(tool)) => format!("Called {}", tool),
            _ => "Agent message".to_string(),
        },
    }
}

fn truncate(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let cut: String = input.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}
