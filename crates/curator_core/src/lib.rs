//! Curator core: pure job state machine and view-model helpers.
mod effect;
mod job;
mod msg;
mod resolve;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use job::{AlbumMetadata, Job, JobId, JobKind, JobState, LogEntry};
pub use msg::{JobOutcome, Msg};
pub use resolve::{resolve, AlbumId, ResolveError};
pub use state::AppState;
pub use update::update;
pub use view_model::{AlbumCardView, AppViewModel, JobRowView};
