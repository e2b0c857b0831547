use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use curator_logging::curator_error;

use crate::http::HttpSourceClient;
use crate::pipeline::DownloadPlan;
use crate::source::{ProgressSink, SourceClient, SourceError};
use crate::types::{AlbumMetadata, EngineEvent, JobId, JobKind};

/// Stamps outgoing events; the app injects a wall-clock formatter so the
/// engine itself stays clock-free.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

pub struct EngineConfig {
    pub settings: crate::http::SourceSettings,
    pub clock: Clock,
}

impl EngineConfig {
    pub fn new(settings: crate::http::SourceSettings, clock: Clock) -> Self {
        Self { settings, clock }
    }
}

enum EngineCommand {
    Run {
        job_id: JobId,
        kind: JobKind,
        album_id: String,
        plan: DownloadPlan,
    },
}

/// Handle to the single worker thread. Commands run strictly one at a
/// time; together with the submit-time busy check this keeps the whole
/// system single-flight.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    /// Builds the bundled HTTP client and spawns the worker thread. Fails
    /// fast when the content source cannot be configured.
    pub fn new(config: EngineConfig) -> Result<Self, SourceError> {
        let client = HttpSourceClient::new(config.settings)?;
        Ok(Self::with_client(Arc::new(client), config.clock))
    }

    /// Worker over an arbitrary client; the seam tests use for fakes.
    pub fn with_client(client: Arc<dyn SourceClient>, clock: Clock) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let events = EventSender {
            tx: event_tx,
            clock,
        };

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    curator_error!("could not start engine runtime: {}", err);
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                let EngineCommand::Run {
                    job_id,
                    kind,
                    album_id,
                    plan,
                } = command;
                run_one(
                    &runtime,
                    client.as_ref(),
                    &events,
                    job_id,
                    kind,
                    &album_id,
                    &plan,
                );
            }
        });

        Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    pub fn dispatch(&self, job_id: JobId, kind: JobKind, album_id: String, plan: DownloadPlan) {
        let _ = self.cmd_tx.send(EngineCommand::Run {
            job_id,
            kind,
            album_id,
            plan,
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }
}

fn run_one(
    runtime: &tokio::runtime::Runtime,
    client: &dyn SourceClient,
    events: &EventSender,
    job_id: JobId,
    kind: JobKind,
    album_id: &str,
    plan: &DownloadPlan,
) {
    events.started(job_id);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        runtime.block_on(execute(client, events, job_id, kind, album_id, plan))
    }));

    // Exactly one terminal event per job, on every exit path; the shell
    // relies on it to restore the controls.
    let result = match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err("job execution panicked".to_string()),
    };
    if let Err(message) = &result {
        curator_error!("job {} failed: {}", job_id, message);
    }
    events.finished(job_id, result);
}

async fn execute(
    client: &dyn SourceClient,
    events: &EventSender,
    job_id: JobId,
    kind: JobKind,
    album_id: &str,
    plan: &DownloadPlan,
) -> Result<(), SourceError> {
    let detail = client.fetch_metadata(album_id).await?;
    events.metadata(job_id, detail.metadata.clone());

    if kind == JobKind::Download {
        let sink = JobSink { events, job_id };
        client.download(album_id, plan, &sink).await?;
    }
    Ok(())
}

struct EventSender {
    tx: mpsc::Sender<EngineEvent>,
    clock: Clock,
}

impl EventSender {
    fn now(&self) -> String {
        (self.clock)()
    }

    fn started(&self, job_id: JobId) {
        let _ = self.tx.send(EngineEvent::Started {
            job_id,
            at: self.now(),
        });
    }

    fn metadata(&self, job_id: JobId, metadata: AlbumMetadata) {
        let _ = self.tx.send(EngineEvent::MetadataReady {
            job_id,
            at: self.now(),
            metadata,
        });
    }

    fn log(&self, job_id: JobId, line: String) {
        let _ = self.tx.send(EngineEvent::Log {
            job_id,
            at: self.now(),
            line,
        });
    }

    fn finished(&self, job_id: JobId, result: Result<(), String>) {
        let _ = self.tx.send(EngineEvent::Finished {
            job_id,
            at: self.now(),
            result,
        });
    }
}

struct JobSink<'a> {
    events: &'a EventSender,
    job_id: JobId,
}

impl ProgressSink for JobSink<'_> {
    fn log(&self, line: &str) {
        self.events.log(self.job_id, line.to_string());
    }
}
