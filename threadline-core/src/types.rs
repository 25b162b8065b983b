//! Core domain types for threadline
//!
//! These types describe both the input (a flat, chronological event log written
//! by an agent runtime) and the output of segmentation (delegation groups and
//! the merged activity timeline handed to a renderer).
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | One entry in the conversation log (human turn, agent turn, or tool result) |
//! | **Invocation** | A tool or sub-agent call carried by an agent turn |
//! | **Correlation id** | The id shared by an invocation and the result that resolves it |
//! | **Delegation** | An invocation that hands work to a research, critique or planning sub-agent |
//! | **Group** | The span of the log attributed to one delegation |
//! | **Terminal result** | The result whose correlation id matches the delegation |
//! | **Narrative** | Substantive agent text gathered during a scan, used when the terminal result is a stub |
//! | **Residual event** | An event not claimed by any group, shown on its own in the timeline |
//!
//! Everything here is immutable once built. The engine recomputes all outputs
//! from the full log on every call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================
// Events
// ============================================

/// A tool or sub-agent call issued inside an agent turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// Id linking this call to its eventual result
    pub correlation_id: String,
    /// Tool name ("task", "read_file", "internet_search", ...)
    pub name: String,
    /// Call arguments
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl Invocation {
    pub fn new(correlation_id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            correlation_id: correlation_id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// First non-empty string argument among `keys`.
    pub fn str_arg(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.arguments.get(*key))
            .filter_map(Value::as_str)
            .find(|s| !s.trim().is_empty())
    }

    /// File path argument, accepting the spellings tools use in practice.
    pub fn file_path(&self) -> Option<&str> {
        self.str_arg(&["file_path", "path", "filePath"])
    }
}

/// One entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A message typed by a real person
    Human { index: usize, content: String },
    /// A message from the agent, optionally invoking tools or sub-agents
    AgentTurn {
        index: usize,
        #[serde(default)]
        content: String,
        #[serde(default)]
        invocations: Vec<Invocation>,
    },
    /// The outcome of exactly one invocation
    #[serde(rename = "result")]
    ToolResult {
        index: usize,
        correlation_id: String,
        producer_name: String,
        #[serde(default)]
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl Event {
    pub fn human(index: usize, content: impl Into<String>) -> Self {
        Event::Human {
            index,
            content: content.into(),
        }
    }

    pub fn agent_turn(index: usize, content: impl Into<String>, invocations: Vec<Invocation>) -> Self {
        Event::AgentTurn {
            index,
            content: content.into(),
            invocations,
        }
    }

    pub fn tool_result(
        index: usize,
        correlation_id: impl Into<String>,
        producer_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Event::ToolResult {
            index,
            correlation_id: correlation_id.into(),
            producer_name: producer_name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Position of this event in the log
    pub fn index(&self) -> usize {
        match self {
            Event::Human { index, .. }
            | Event::AgentTurn { index, .. }
            | Event::ToolResult { index, .. } => *index,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Event::Human { content, .. }
            | Event::AgentTurn { content, .. }
            | Event::ToolResult { content, .. } => content,
        }
    }

    /// Invocations carried by this event (empty unless it is an agent turn)
    pub fn invocations(&self) -> &[Invocation] {
        match self {
            Event::AgentTurn { invocations, .. } => invocations,
            _ => &[],
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Event::Human { .. } => "human",
            Event::AgentTurn { .. } => "agent_turn",
            Event::ToolResult { .. } => "result",
        }
    }
}

// ============================================
// Delegation kinds and status
// ============================================

/// Kind of sub-agent a delegation hands work to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationKind {
    Research,
    Critique,
    Planning,
}

impl DelegationKind {
    /// All kinds, in timeline tie-break order
    pub const ALL: [DelegationKind; 3] = [
        DelegationKind::Research,
        DelegationKind::Critique,
        DelegationKind::Planning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DelegationKind::Research => "research",
            DelegationKind::Critique => "critique",
            DelegationKind::Planning => "planning",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DelegationKind::Research => "Research",
            DelegationKind::Critique => "Critique",
            DelegationKind::Planning => "Planning",
        }
    }
}

impl std::fmt::Display for DelegationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DelegationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "research" => Ok(DelegationKind::Research),
            "critique" => Ok(DelegationKind::Critique),
            "planning" => Ok(DelegationKind::Planning),
            _ => Err(format!("unknown delegation kind: {}", s)),
        }
    }
}

/// Lifecycle of a group or activity.
///
/// Variants are ordered; a group's status only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// Nothing structured observed yet
    Pending,
    /// At least one artifact arrived, terminal result not yet seen
    InProgress,
    /// Terminal result observed
    Completed,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Pending => "pending",
            GroupStatus::InProgress => "in_progress",
            GroupStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a group's final payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSource {
    /// Content of the terminal result
    Terminal,
    /// Accumulated narrative (terminal missing or too short)
    Narrative,
    /// No payload yet
    None,
}

// ============================================
// Artifacts
// ============================================

/// A batch of results returned by one search call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBatch {
    /// Query from the originating invocation (empty if unknown)
    pub query: String,
    /// Individual hits, as returned by the tool
    pub results: Vec<Value>,
    pub correlation_id: String,
    /// Index of the result event
    pub index: usize,
}

/// A file read by the sub-agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRead {
    pub path: String,
    pub content: String,
    pub correlation_id: String,
    pub index: usize,
}

/// A file written or edited by the sub-agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMutation {
    pub tool_name: String,
    /// Arguments of the originating invocation (empty if unknown)
    pub arguments: Map<String, Value>,
    /// Tool output on success
    pub result: Option<String>,
    /// Tool output on failure
    pub error: Option<String>,
    pub correlation_id: String,
    pub index: usize,
}

/// Structured JSON output from a recognized tool (todo lists, critique findings)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub tool_name: String,
    pub value: Value,
    pub correlation_id: String,
    pub index: usize,
}

/// A single classified artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Artifact {
    SearchResults(SearchBatch),
    FileRead(FileRead),
    FileMutation(FileMutation),
    StructuredDocument(StructuredDocument),
}

/// Typed artifact collections owned by one group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBuckets {
    pub search_batches: Vec<SearchBatch>,
    pub file_reads: Vec<FileRead>,
    pub file_mutations: Vec<FileMutation>,
    pub documents: Vec<StructuredDocument>,
}

impl ArtifactBuckets {
    pub fn push(&mut self, artifact: Artifact) {
        match artifact {
            Artifact::SearchResults(batch) => self.search_batches.push(batch),
            Artifact::FileRead(read) => self.file_reads.push(read),
            Artifact::FileMutation(mutation) => self.file_mutations.push(mutation),
            Artifact::StructuredDocument(doc) => self.documents.push(doc),
        }
    }

    pub fn len(&self) -> usize {
        self.search_batches.len() + self.file_reads.len() + self.file_mutations.len() + self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================
// Groups
// ============================================

/// The span of the log attributed to one delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityGroup {
    pub kind: DelegationKind,
    /// What the delegating agent asked the sub-agent to do
    pub task_description: String,
    /// Correlation id of the delegating invocation
    pub delegation_correlation_id: String,
    /// Index of the agent turn carrying the delegation
    pub start_index: usize,
    /// Highest index attributed to this group (always >= `start_index`)
    pub end_index: usize,
    pub status: GroupStatus,
    pub artifacts: ArtifactBuckets,
    /// Final answer chosen by the tie-break rules
    pub final_payload: Option<String>,
    pub payload_source: PayloadSource,
    /// Indices owned by this group, ascending
    pub member_indices: Vec<usize>,
}

impl ActivityGroup {
    /// Inclusive span covered by this group
    pub fn span(&self) -> std::ops::RangeInclusive<usize> {
        self.start_index..=self.end_index
    }
}

/// All groups produced for one kind, in delegation order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindGroups {
    pub kind: DelegationKind,
    pub groups: Vec<ActivityGroup>,
}

// ============================================
// Timeline
// ============================================

/// What a timeline entry represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Research,
    Critique,
    Planning,
    TodoUpdate,
    FileWrite,
    FileEdit,
    FileUpdate,
    Unclassified,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Research => "research",
            ActivityKind::Critique => "critique",
            ActivityKind::Planning => "planning",
            ActivityKind::TodoUpdate => "todo_update",
            ActivityKind::FileWrite => "file_write",
            ActivityKind::FileEdit => "file_edit",
            ActivityKind::FileUpdate => "file_update",
            ActivityKind::Unclassified => "unclassified",
        }
    }

    /// Whether this entry aggregates delegation groups
    pub fn is_delegation(&self) -> bool {
        matches!(
            self,
            ActivityKind::Research | ActivityKind::Critique | ActivityKind::Planning
        )
    }
}

impl From<DelegationKind> for ActivityKind {
    fn from(kind: DelegationKind) -> Self {
        match kind {
            DelegationKind::Research => ActivityKind::Research,
            DelegationKind::Critique => ActivityKind::Critique,
            DelegationKind::Planning => ActivityKind::Planning,
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One item of a todo list update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub content: String,
    #[serde(default)]
    pub status: String,
}

/// A single event shown on its own in the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualEvent {
    pub event: Event,
    /// Recognized tool name, if any
    pub tool_name: Option<String>,
    /// Target file for file activities
    pub file_path: Option<String>,
    /// Parsed items for todo updates
    pub todos: Option<Vec<TodoItem>>,
}

/// Content of a timeline entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityPayload {
    /// Every group of one kind
    Group { groups: Vec<ActivityGroup> },
    /// One residual event
    Event { residual: ResidualEvent },
}

/// One entry of the merged timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineActivity {
    /// Stable anchor id ("research-3", "event-7")
    pub id: String,
    /// Position in the merged timeline
    pub order: usize,
    /// Index of the first contributing event
    pub source_index: usize,
    pub kind: ActivityKind,
    pub title: String,
    pub status: GroupStatus,
    pub payload: ActivityPayload,
}
