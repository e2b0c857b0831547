use crate::{JobId, JobKind, JobState, LogEntry};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub status_line: String,
    pub busy: bool,
    /// False while a job is in flight or the content source is unavailable.
    pub controls_enabled: bool,
    pub input: String,
    /// The in-flight job, or the most recently finished one.
    pub job: Option<JobRowView>,
    pub album: Option<AlbumCardView>,
    pub log: Vec<LogEntry>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub kind: JobKind,
    /// Canonical id, or the raw input when resolution failed.
    pub album_id: String,
    pub state: JobState,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumCardView {
    pub name: String,
    pub author: String,
    pub tags: Vec<String>,
    pub chapter_count: usize,
    pub description: Option<String>,
}
