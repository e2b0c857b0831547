use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use curator_core::{AlbumMetadata, Effect, JobOutcome, Msg};
use curator_engine::{EngineEvent, EngineHandle, OptionStore};
use curator_logging::curator_info;

use crate::shell::ShellEvent;

/// Executes effects from the pure core and pumps engine events back into
/// the foreground loop as messages.
pub(crate) struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub(crate) fn new(engine: EngineHandle, tx: mpsc::Sender<ShellEvent>) -> Self {
        let runner = Self { engine };
        runner.spawn_event_pump(tx);
        runner
    }

    /// The pipeline document is snapshotted here, at dispatch time, so a
    /// settings edit or save during the run cannot race the reader.
    pub(crate) fn enqueue(&self, effects: Vec<Effect>, store: &OptionStore) {
        for effect in effects {
            match effect {
                Effect::RunJob {
                    job_id,
                    kind,
                    album,
                } => {
                    curator_info!(
                        "dispatching job {} ({}) for album {}",
                        job_id,
                        kind.noun(),
                        album
                    );
                    self.engine.dispatch(
                        job_id,
                        map_kind(kind),
                        album.as_str().to_string(),
                        store.plan(),
                    );
                }
            }
        }
    }

    fn spawn_event_pump(&self, tx: mpsc::Sender<ShellEvent>) {
        let engine = self.engine.clone();
        thread::spawn(move || loop {
            if let Some(event) = engine.try_recv() {
                if tx.send(ShellEvent::Msg(map_event(event))).is_err() {
                    break;
                }
            } else {
                thread::sleep(Duration::from_millis(20));
            }
        });
    }
}

fn map_kind(kind: curator_core::JobKind) -> curator_engine::JobKind {
    match kind {
        curator_core::JobKind::Parse => curator_engine::JobKind::Parse,
        curator_core::JobKind::Download => curator_engine::JobKind::Download,
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Started { job_id, at } => Msg::JobStarted { job_id, at },
        EngineEvent::MetadataReady {
            job_id,
            at,
            metadata,
        } => Msg::MetadataReady {
            job_id,
            at,
            metadata: map_metadata(metadata),
        },
        EngineEvent::Log { job_id, at, line } => Msg::JobLog { job_id, at, line },
        EngineEvent::Finished { job_id, at, result } => Msg::JobFinished {
            job_id,
            at,
            outcome: match result {
                Ok(()) => JobOutcome::Succeeded,
                Err(message) => JobOutcome::Failed { message },
            },
        },
    }
}

fn map_metadata(metadata: curator_engine::AlbumMetadata) -> AlbumMetadata {
    AlbumMetadata {
        name: metadata.name,
        author: metadata.author,
        tags: metadata.tags,
        chapter_count: metadata.chapter_count,
        description: metadata.description,
    }
}
