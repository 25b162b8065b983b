//! Per-kind scanner configuration.
//!
//! The research, critique and planning groupers share one scanner; what
//! differs between them lives in a [`KindConfig`]: how a delegation is
//! recognized, which results count as artifacts, and the length thresholds
//! used by the payload tie-break.

use super::artifacts::{ArtifactRule, CRITIQUE_RULES, PLANNING_RULES, RESEARCH_RULES};
use crate::types::{DelegationKind, Invocation};

/// Generic sub-agent launchers; the target agent is named in the arguments.
pub const DELEGATION_TOOLS: &[&str] = &["task", "delegate", "spawn_agent"];

/// Argument keys that name the target sub-agent.
pub const SUBAGENT_KEYS: &[&str] = &["subagent_type", "agent_type", "agent"];

/// Argument keys that describe the delegated task, in preference order.
pub const TASK_DESCRIPTION_KEYS: &[&str] =
    &["description", "prompt", "task", "query", "instructions"];

/// Agent text starting with one of these is filler, not narrative.
pub const DEFAULT_ACKNOWLEDGEMENT_PREFIXES: &[&str] = &[
    "i'll ",
    "i will ",
    "let me ",
    "now let me ",
    "okay",
    "ok,",
    "sure",
    "great",
    "perfect",
    "got it",
];

/// Recognizes delegations of one kind.
#[derive(Debug, Clone, Copy)]
pub struct DelegationMatcher {
    /// Launcher tools that take a sub-agent name argument
    pub delegation_tools: &'static [&'static str],
    /// Sub-agent names that select this kind
    pub subagent_types: &'static [&'static str],
    /// Tools that delegate to this kind directly
    pub direct_tools: &'static [&'static str],
}

impl DelegationMatcher {
    pub fn matches(&self, invocation: &Invocation) -> bool {
        let name = invocation.name.as_str();
        if self
            .direct_tools
            .iter()
            .any(|tool| tool.eq_ignore_ascii_case(name))
        {
            return true;
        }
        if !self
            .delegation_tools
            .iter()
            .any(|tool| tool.eq_ignore_ascii_case(name))
        {
            return false;
        }
        invocation
            .str_arg(SUBAGENT_KEYS)
            .map(str::trim)
            .map(|agent| {
                self.subagent_types
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(agent))
            })
            .unwrap_or(false)
    }
}

/// Everything the scanner needs to know about one delegation kind.
#[derive(Debug, Clone)]
pub struct KindConfig {
    pub kind: DelegationKind,
    pub matcher: DelegationMatcher,
    /// Ordered artifact classification table
    pub artifact_rules: &'static [ArtifactRule],
    /// Terminal payloads shorter than this (in chars) are treated as stubs
    pub min_terminal_len: usize,
    /// Agent text must be longer than this (in chars) to count as narrative
    pub min_narrative_len: usize,
    /// Whether results no rule matches still extend the group's span
    pub count_unclassified_results: bool,
    /// Lowercase prefixes marking filler agent text
    pub acknowledgement_prefixes: Vec<String>,
}

impl KindConfig {
    pub fn research() -> Self {
        Self {
            kind: DelegationKind::Research,
            matcher: DelegationMatcher {
                delegation_tools: DELEGATION_TOOLS,
                subagent_types: &["research-agent", "researcher", "research"],
                direct_tools: &["research", "conduct_research"],
            },
            artifact_rules: RESEARCH_RULES,
            min_terminal_len: 50,
            min_narrative_len: 80,
            count_unclassified_results: true,
            acknowledgement_prefixes: default_prefixes(),
        }
    }

    pub fn critique() -> Self {
        Self {
            kind: DelegationKind::Critique,
            matcher: DelegationMatcher {
                delegation_tools: DELEGATION_TOOLS,
                subagent_types: &["critique-agent", "critic", "reviewer"],
                direct_tools: &["critique", "review"],
            },
            artifact_rules: CRITIQUE_RULES,
            min_terminal_len: 40,
            min_narrative_len: 60,
            count_unclassified_results: true,
            acknowledgement_prefixes: default_prefixes(),
        }
    }

    pub fn planning() -> Self {
        Self {
            kind: DelegationKind::Planning,
            matcher: DelegationMatcher {
                delegation_tools: DELEGATION_TOOLS,
                subagent_types: &["planning-agent", "planner"],
                direct_tools: &["plan", "create_plan"],
            },
            artifact_rules: PLANNING_RULES,
            min_terminal_len: 20,
            min_narrative_len: 40,
            count_unclassified_results: true,
            acknowledgement_prefixes: default_prefixes(),
        }
    }

    pub fn for_kind(kind: DelegationKind) -> Self {
        match kind {
            DelegationKind::Research => Self::research(),
            DelegationKind::Critique => Self::critique(),
            DelegationKind::Planning => Self::planning(),
        }
    }

    /// Built-in configurations for every kind, in tie-break order.
    pub fn defaults() -> Vec<Self> {
        DelegationKind::ALL.into_iter().map(Self::for_kind).collect()
    }

    pub fn is_delegation(&self, invocation: &Invocation) -> bool {
        self.matcher.matches(invocation)
    }

    /// Whether agent text is worth keeping as fallback narrative.
    pub fn is_substantive(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.chars().count() <= self.min_narrative_len {
            return false;
        }
        let lowered = trimmed.to_lowercase();
        !self
            .acknowledgement_prefixes
            .iter()
            .any(|prefix| lowered.starts_with(prefix.as_str()))
    }

    /// Whether a terminal payload is too short to be a real answer.
    pub fn is_short_terminal(&self, text: &str) -> bool {
        text.trim().chars().count() < self.min_terminal_len
    }
}

fn default_prefixes() -> Vec<String> {
    DEFAULT_ACKNOWLEDGEMENT_PREFIXES
        .iter()
        .map(|p| p.to_string())
        .collect()
}
