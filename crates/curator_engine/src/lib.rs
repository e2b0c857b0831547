//! Curator engine: content-source IO, pipeline options, and job execution.
mod engine;
mod http;
mod options;
mod pipeline;
mod source;
mod storage;
mod template;
mod types;

pub use engine::{Clock, EngineConfig, EngineHandle};
pub use http::{HttpSourceClient, SourceSettings};
pub use options::{default_document, LoadOutcome, OptionStore, DEFAULT_DIR_RULE};
pub use pipeline::{
    default_kwargs, known_plugin, DownloadPlan, KnownPlugin, PluginInvocation, Stage,
    KNOWN_PLUGINS, PLUGIN_DOWNLOAD_COVER, PLUGIN_IMG2PDF, PLUGIN_LONG_IMG, PLUGIN_SKIP_SPARSE,
};
pub use source::{ProgressSink, SourceClient, SourceError};
pub use storage::{ensure_dir, write_atomic, PersistError};
pub use template::{render_rule, sanitize_component, RuleContext};
pub use types::{
    AlbumDetail, AlbumMetadata, ChapterRef, DownloadSummary, EngineEvent, JobId, JobKind,
};
