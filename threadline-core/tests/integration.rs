//! Integration tests for the segmentation pipeline
//!
//! These tests use fixture files in `tests/fixtures/` to verify the
//! end-to-end flow from event log to groups and timeline.

use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use threadline_core::eventlog;
use threadline_core::types::{
    ActivityKind, ActivityPayload, DelegationKind, Event, GroupStatus, Invocation, PayloadSource,
};
use threadline_core::{CollectingDiagnostics, NoopDiagnostics, Segmentation, Segmenter};

/// Get the path to a fixture file
fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load_fixture(name: &str) -> Vec<Event> {
    eventlog::read_events(&fixture_path(name)).expect("fixture should parse")
}

fn segment(events: &[Event]) -> Segmentation {
    Segmenter::default()
        .segment(events, &NoopDiagnostics)
        .expect("segmentation should succeed")
}

fn research(id: &str, description: &str) -> Invocation {
    Invocation::new(
        id,
        "task",
        json!({"subagent_type": "research-agent", "description": description}),
    )
}

fn long_text(topic: &str) -> String {
    format!(
        "{topic}: the sources agree on the main points and disagree only on details of the rollout schedule"
    )
}

// ============================================
// End-to-end scenarios
// ============================================

#[test]
fn test_completed_research_group() {
    let events = load_fixture("research-completed.jsonl");
    let sink = CollectingDiagnostics::new();
    let segmentation = Segmenter::default().segment(&events, &sink).unwrap();

    let groups = segmentation.groups_for(DelegationKind::Research);
    assert_eq!(groups.len(), 1);

    let group = &groups[0];
    assert_eq!(group.start_index, 1);
    assert_eq!(group.end_index, 3);
    assert_eq!(group.status, GroupStatus::Completed);
    assert_eq!(group.task_description, "Survey the Rust 2024 edition changes");
    assert_eq!(group.artifacts.len(), 1);
    assert_eq!(group.artifacts.search_batches[0].index, 2);
    assert_eq!(group.artifacts.search_batches[0].results.len(), 1);
    assert_eq!(group.payload_source, PayloadSource::Terminal);
    assert!(group
        .final_payload
        .as_deref()
        .unwrap()
        .starts_with("The 2024 edition"));

    assert!(segmentation.groups_for(DelegationKind::Critique).is_empty());
    assert!(segmentation.groups_for(DelegationKind::Planning).is_empty());

    // The search result has no invocation in the log
    let anomalies = sink.anomalies();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].as_str(), "orphan_result");
}

#[test]
fn test_short_terminal_falls_back_to_narrative() {
    let events = load_fixture("short-terminal.jsonl");
    let segmentation = segment(&events);

    let group = &segmentation.groups_for(DelegationKind::Research)[0];
    assert_eq!(group.status, GroupStatus::Completed);
    assert_eq!(group.end_index, 4);
    assert_eq!(group.payload_source, PayloadSource::Narrative);
    assert_eq!(group.final_payload.as_deref(), Some(events[2].content()));
    assert_eq!(group.artifacts.search_batches.len(), 1);
}

#[test]
fn test_mixed_session_timeline() {
    let events = load_fixture("mixed-session.jsonl");
    let segmentation = segment(&events);

    let summary: Vec<(&str, ActivityKind, GroupStatus)> = segmentation
        .timeline
        .iter()
        .map(|a| (a.id.as_str(), a.kind, a.status))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("event-1", ActivityKind::TodoUpdate, GroupStatus::Completed),
            ("event-2", ActivityKind::TodoUpdate, GroupStatus::Completed),
            ("research-3", ActivityKind::Research, GroupStatus::Completed),
            ("event-7", ActivityKind::FileWrite, GroupStatus::Completed),
            ("event-8", ActivityKind::FileWrite, GroupStatus::Completed),
            ("critique-9", ActivityKind::Critique, GroupStatus::Completed),
            ("event-11", ActivityKind::Unclassified, GroupStatus::Completed),
        ]
    );

    let orders: Vec<usize> = segmentation.timeline.iter().map(|a| a.order).collect();
    assert_eq!(orders, (0..7).collect::<Vec<_>>());

    let research = &segmentation.groups_for(DelegationKind::Research)[0];
    assert_eq!(research.member_indices, vec![3, 5, 6]);
    assert_eq!(research.artifacts.search_batches[0].query, "tokio vs async-std");

    match &segmentation.timeline[0].payload {
        ActivityPayload::Event { residual } => {
            let todos = residual.todos.as_ref().unwrap();
            assert_eq!(todos.len(), 2);
            assert_eq!(todos[0].status, "in_progress");
        }
        other => panic!("unexpected payload: {other:?}"),
    }
    assert_eq!(segmentation.timeline[3].title, "Wrote /workspace/report.md");
    assert_eq!(
        segmentation.timeline[5].title,
        "Critique: Review the report for accuracy"
    );
}

// ============================================
// Laws
// ============================================

#[test]
fn test_no_delegation_means_no_groups() {
    let events = vec![
        Event::human(0, "hello"),
        Event::agent_turn(
            1,
            "",
            vec![Invocation::new("r", "read_file", json!({"path": "/a"}))],
        ),
        Event::tool_result(2, "r", "read_file", "contents"),
    ];
    let segmentation = segment(&events);

    for kind in DelegationKind::ALL {
        assert!(segmentation.groups_for(kind).is_empty());
    }
    assert!(segmentation
        .timeline
        .iter()
        .all(|a| a.kind == ActivityKind::Unclassified));
}

#[test]
fn test_ownership_is_disjoint_within_kind() {
    let events = vec![
        Event::agent_turn(0, "", vec![research("a", "one"), research("b", "two")]),
        Event::tool_result(1, "s", "internet_search", "[]"),
        Event::tool_result(2, "b", "task", long_text("b")),
        Event::agent_turn(3, long_text("narrative"), vec![]),
        Event::tool_result(4, "a", "task", long_text("a")),
        Event::agent_turn(5, "", vec![research("c", "three")]),
        Event::tool_result(6, "t", "read_file", "text"),
    ];
    let segmentation = segment(&events);

    for kind_groups in &segmentation.groups {
        let mut seen = HashSet::new();
        for group in &kind_groups.groups {
            for index in &group.member_indices {
                assert!(seen.insert(*index), "index {index} owned twice");
                assert!(*index < events.len());
            }
            assert!(group.end_index < events.len());
            assert!(group.start_index <= group.end_index);
        }
    }

    let processed = threadline_core::timeline::processed_indices(&events, &segmentation.groups);
    assert!(processed.iter().all(|index| *index < events.len()));
}

#[test]
fn test_processed_indices_follow_sparse_logs() {
    let events = vec![
        Event::human(0, "start"),
        Event::agent_turn(10, "", vec![research("x", "gap")]),
        Event::tool_result(1_000_000, "s", "internet_search", "[]"),
        Event::tool_result(90_000_000, "x", "task", long_text("x")),
    ];
    let segmentation = segment(&events);

    let group = &segmentation.groups_for(DelegationKind::Research)[0];
    assert_eq!(group.member_indices, vec![10, 1_000_000, 90_000_000]);

    let processed = threadline_core::timeline::processed_indices(&events, &segmentation.groups);
    let present: HashSet<usize> = events.iter().map(Event::index).collect();
    assert_eq!(processed.len(), 3);
    assert!(processed.iter().all(|index| present.contains(index)));
    assert_eq!(segmentation.timeline.len(), 1);
}

#[test]
fn test_segmentation_is_idempotent() {
    let events = load_fixture("mixed-session.jsonl");
    let first = segment(&events);
    let second = segment(&events);
    assert_eq!(first, second);
}

#[test]
fn test_tie_break_prefers_narrative_over_stub() {
    let first = long_text("first finding");
    let second = long_text("second finding");
    let events = vec![
        Event::agent_turn(0, "", vec![research("x", "topic")]),
        Event::agent_turn(1, first.clone(), vec![]),
        Event::agent_turn(2, second.clone(), vec![]),
        Event::tool_result(3, "x", "task", "ok"),
    ];
    let segmentation = segment(&events);

    let group = &segmentation.groups_for(DelegationKind::Research)[0];
    assert_eq!(group.status, GroupStatus::Completed);
    assert_eq!(group.payload_source, PayloadSource::Narrative);
    assert_eq!(
        group.final_payload.as_deref(),
        Some(format!("{first}\n\n{second}").as_str())
    );
}

#[test]
fn test_new_delegation_stops_previous_group() {
    let events = vec![
        Event::agent_turn(0, "", vec![research("a", "first")]),
        Event::tool_result(1, "s", "internet_search", "[]"),
        Event::human(2, "also look into this"),
        Event::agent_turn(3, "", vec![research("b", "second")]),
        Event::tool_result(4, "b", "task", long_text("b")),
    ];
    let segmentation = segment(&events);

    let groups = segmentation.groups_for(DelegationKind::Research);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].end_index, 2);
    assert_eq!(groups[0].status, GroupStatus::InProgress);
    assert_eq!(groups[1].start_index, 3);
    assert_eq!(groups[1].end_index, 4);
    assert_eq!(groups[1].status, GroupStatus::Completed);
}

#[test]
fn test_status_never_regresses_during_replay() {
    let events = load_fixture("short-terminal.jsonl");
    let mut statuses = Vec::new();

    for len in 2..=events.len() {
        let segmentation = segment(&events[..len]);
        let group = &segmentation.groups_for(DelegationKind::Research)[0];
        statuses.push(group.status);
    }

    assert!(statuses.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(statuses.first(), Some(&GroupStatus::Pending));
    assert_eq!(statuses.last(), Some(&GroupStatus::Completed));
}

#[test]
fn test_unordered_log_is_rejected() {
    let mut events = load_fixture("research-completed.jsonl");
    events.swap(2, 3);
    let result = Segmenter::default().segment(&events, &NoopDiagnostics);
    assert!(matches!(
        result,
        Err(threadline_core::Error::NonMonotonicIndex { position: 3, .. })
    ));
}
