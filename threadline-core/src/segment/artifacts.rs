//! Artifact classification
//!
//! Each delegation kind owns an ordered table of [`ArtifactRule`]s. A result is
//! matched against the table by its producer name and, optionally, by a
//! substring of the file path its invocation targeted. The first matching rule
//! decides the [`ArtifactCategory`]; a result that matches nothing is not an
//! artifact for that kind.
//!
//! Recognizing a new tool is a one-line change to the relevant table.

use crate::correlation::CorrelationIndex;
use crate::diagnostics::{Anomaly, Diagnostics};
use crate::types::{
    Artifact, Event, FileMutation, FileRead, Invocation, SearchBatch, StructuredDocument,
};
use serde_json::Value;

/// Tools that return web search hits.
pub const SEARCH_TOOLS: &[&str] = &["internet_search", "web_search", "tavily_search", "search"];
pub const READ_TOOLS: &[&str] = &["read_file"];
pub const MUTATION_TOOLS: &[&str] = &["write_file", "edit_file"];
pub const TODO_TOOLS: &[&str] = &["write_todos"];
pub const CRITIQUE_TOOLS: &[&str] = &["submit_critique", "critique_findings"];

/// Typed bucket an artifact lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactCategory {
    SearchResults,
    FileRead,
    FileMutation,
    StructuredDocument,
}

/// One row of a classification table.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactRule {
    /// Producer names this rule accepts (ASCII case-insensitive)
    pub producers: &'static [&'static str],
    /// Required substring of the target path, if any
    pub path_contains: Option<&'static str>,
    pub category: ArtifactCategory,
}

impl ArtifactRule {
    pub const fn new(producers: &'static [&'static str], category: ArtifactCategory) -> Self {
        Self {
            producers,
            path_contains: None,
            category,
        }
    }

    pub const fn with_path(mut self, needle: &'static str) -> Self {
        self.path_contains = Some(needle);
        self
    }

    pub fn matches(&self, producer_name: &str, path: Option<&str>) -> bool {
        let producer_ok = self
            .producers
            .iter()
            .any(|name| name.eq_ignore_ascii_case(producer_name));
        if !producer_ok {
            return false;
        }
        match self.path_contains {
            None => true,
            Some(needle) => path
                .map(|p| p.to_ascii_lowercase().contains(needle))
                .unwrap_or(false),
        }
    }
}

pub const RESEARCH_RULES: &[ArtifactRule] = &[
    ArtifactRule::new(SEARCH_TOOLS, ArtifactCategory::SearchResults),
    ArtifactRule::new(READ_TOOLS, ArtifactCategory::FileRead),
    ArtifactRule::new(MUTATION_TOOLS, ArtifactCategory::FileMutation),
];

pub const CRITIQUE_RULES: &[ArtifactRule] = &[
    ArtifactRule::new(CRITIQUE_TOOLS, ArtifactCategory::StructuredDocument),
    ArtifactRule::new(MUTATION_TOOLS, ArtifactCategory::FileMutation).with_path("critique"),
    ArtifactRule::new(READ_TOOLS, ArtifactCategory::FileRead),
    ArtifactRule::new(SEARCH_TOOLS, ArtifactCategory::SearchResults),
];

pub const PLANNING_RULES: &[ArtifactRule] = &[
    ArtifactRule::new(TODO_TOOLS, ArtifactCategory::StructuredDocument),
    ArtifactRule::new(MUTATION_TOOLS, ArtifactCategory::FileMutation).with_path("plan"),
    ArtifactRule::new(READ_TOOLS, ArtifactCategory::FileRead),
];

/// Buckets result events using one kind's rule table.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactClassifier {
    rules: &'static [ArtifactRule],
}

impl ArtifactClassifier {
    pub fn new(rules: &'static [ArtifactRule]) -> Self {
        Self { rules }
    }

    /// Category of the first rule matching this result, if any.
    pub fn category_for(&self, producer_name: &str, path: Option<&str>) -> Option<ArtifactCategory> {
        self.rules
            .iter()
            .find(|rule| rule.matches(producer_name, path))
            .map(|rule| rule.category)
    }

    /// Classify a result event into an artifact.
    ///
    /// Returns `None` for non-result events, for results no rule matches, and
    /// for structured documents whose payload cannot be read (reported to
    /// `diagnostics`).
    pub fn classify(
        &self,
        event: &Event,
        index: &CorrelationIndex<'_>,
        diagnostics: &dyn Diagnostics,
    ) -> Option<Artifact> {
        let Event::ToolResult {
            index: result_index,
            correlation_id,
            producer_name,
            content,
            is_error,
        } = event
        else {
            return None;
        };

        let invocation = index.invocation(correlation_id).map(|entry| entry.invocation);
        let path = invocation.and_then(Invocation::file_path);
        let category = self.category_for(producer_name, path)?;

        let artifact = match category {
            ArtifactCategory::SearchResults => {
                let query = invocation
                    .and_then(|inv| inv.str_arg(&["query", "q", "search_query"]))
                    .unwrap_or_default()
                    .to_string();
                let results = if *is_error {
                    Vec::new()
                } else {
                    parse_search_results(content).unwrap_or_else(|reason| {
                        diagnostics.report(Anomaly::MalformedPayload {
                            index: *result_index,
                            producer_name: producer_name.clone(),
                            reason,
                        });
                        Vec::new()
                    })
                };
                Artifact::SearchResults(SearchBatch {
                    query,
                    results,
                    correlation_id: correlation_id.clone(),
                    index: *result_index,
                })
            }
            ArtifactCategory::FileRead => Artifact::FileRead(FileRead {
                path: path.unwrap_or_default().to_string(),
                content: content.clone(),
                correlation_id: correlation_id.clone(),
                index: *result_index,
            }),
            ArtifactCategory::FileMutation => {
                let (result, error) = if *is_error {
                    (None, Some(content.clone()))
                } else {
                    (Some(content.clone()), None)
                };
                Artifact::FileMutation(FileMutation {
                    tool_name: producer_name.clone(),
                    arguments: invocation.map(|inv| inv.arguments.clone()).unwrap_or_default(),
                    result,
                    error,
                    correlation_id: correlation_id.clone(),
                    index: *result_index,
                })
            }
            ArtifactCategory::StructuredDocument => {
                let value = match structured_value(content, invocation) {
                    Ok(value) => value,
                    Err(reason) => {
                        diagnostics.report(Anomaly::MalformedPayload {
                            index: *result_index,
                            producer_name: producer_name.clone(),
                            reason,
                        });
                        return None;
                    }
                };
                Artifact::StructuredDocument(StructuredDocument {
                    tool_name: producer_name.clone(),
                    value,
                    correlation_id: correlation_id.clone(),
                    index: *result_index,
                })
            }
        };

        Some(artifact)
    }
}

/// Read search hits from a result payload.
///
/// Accepts a JSON array, an object with a `results` array, or a single object.
fn parse_search_results(content: &str) -> Result<Vec<Value>, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err("`results` is not a list".to_string()),
            None => Ok(vec![Value::Object(map)]),
        },
        _ => Err("expected a list of search results".to_string()),
    }
}

/// Structured value for a document artifact.
///
/// Prefers JSON content; tools like `write_todos` answer with prose, in which
/// case the invocation's arguments carry the structure.
fn structured_value(content: &str, invocation: Option<&Invocation>) -> Result<Value, String> {
    let arguments = invocation
        .map(|inv| &inv.arguments)
        .filter(|args| !args.is_empty())
        .map(|args| Value::Object(args.clone()));

    match serde_json::from_str::<Value>(content) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(value),
        Ok(_) => arguments.ok_or_else(|| "expected a JSON object or list".to_string()),
        Err(e) => arguments.ok_or_else(|| e.to_string()),
    }
}
