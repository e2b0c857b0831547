use crate::AlbumId;

pub type JobId = u64;

/// What the user asked for: inspect metadata only, or run the full download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Parse,
    Download,
}

impl JobKind {
    /// Short noun used in status and log lines.
    pub fn noun(self) -> &'static str {
        match self {
            JobKind::Parse => "parse",
            JobKind::Download => "download",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Resolving,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    pub fn is_active(self) -> bool {
        matches!(self, JobState::Resolving | JobState::Running)
    }
}

/// One submitted task. Owned exclusively by [`crate::AppState`]; once
/// terminal it is retained only for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    /// The raw input as submitted, kept for display on resolution failure.
    pub input: String,
    /// Present once resolution succeeded.
    pub album: Option<AlbumId>,
    pub state: JobState,
    pub error: Option<String>,
}

impl Job {
    /// A freshly submitted job, about to run the resolver.
    pub fn submitted(id: JobId, kind: JobKind, input: String) -> Self {
        Self {
            id,
            kind,
            input,
            album: None,
            state: JobState::Resolving,
            error: None,
        }
    }
}

/// One timestamped line in the visible job log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: String,
    pub line: String,
}

/// Display payload produced by a successful metadata fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlbumMetadata {
    pub name: String,
    pub author: String,
    pub tags: Vec<String>,
    pub chapter_count: usize,
    pub description: Option<String>,
}
