use crate::{resolve, AppState, Effect, Job, JobKind, JobOutcome, JobState, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::Submitted { kind } => return submit(state, kind),
        Msg::SourceUnavailable { reason } => {
            state.mark_source_unavailable(reason);
            Vec::new()
        }
        Msg::JobStarted { job_id, at } => {
            if let Some(job) = state.active_job(job_id) {
                let line = match &job.album {
                    Some(album) => format!("started {} of album {album}", job.kind.noun()),
                    None => format!("started {}", job.kind.noun()),
                };
                state.push_log(at, line);
            }
            Vec::new()
        }
        Msg::MetadataReady {
            job_id,
            at,
            metadata,
        } => {
            if let Some(job) = state.active_job(job_id) {
                let kind = job.kind;
                state.push_log(at.clone(), format!("album title: {}", metadata.name));
                if kind == JobKind::Parse {
                    state.push_log(at.clone(), format!("author: {}", metadata.author));
                }
                state.push_log(at, format!("chapters: {}", metadata.chapter_count));
                if kind == JobKind::Download {
                    state.set_status(format!("downloading \"{}\"...", metadata.name));
                }
                state.store_metadata(metadata);
            }
            Vec::new()
        }
        Msg::JobLog { job_id, at, line } => {
            if state.active_job(job_id).is_some() {
                state.push_log(at, line);
            }
            Vec::new()
        }
        Msg::JobFinished {
            job_id,
            at,
            outcome,
        } => {
            if let Some(job) = state.finish(job_id, &outcome) {
                match &outcome {
                    JobOutcome::Succeeded => match job.kind {
                        JobKind::Parse => {
                            let name = state
                                .metadata()
                                .map(|metadata| metadata.name.clone())
                                .unwrap_or_default();
                            state.set_status(format!("parse finished: \"{name}\""));
                        }
                        JobKind::Download => {
                            state.push_log(at, "download finished".to_string());
                            state.set_status("download finished");
                        }
                    },
                    JobOutcome::Failed { message } => {
                        let noun = job.kind.noun();
                        state.push_log(at, format!("{noun} failed: {message}"));
                        state.set_status(format!("{noun} failed: {message}"));
                    }
                }
            }
            Vec::new()
        }
    };

    (state, effects)
}

/// Submission runs entirely in the foreground: single-flight check, resolve,
/// then either an immediate terminal failure or a dispatch effect.
fn submit(mut state: AppState, kind: JobKind) -> (AppState, Vec<Effect>) {
    if let Some(reason) = state.source_error() {
        let reason = reason.to_string();
        state.set_status(format!("content source unavailable: {reason}"));
        return (state, Vec::new());
    }
    if state.is_busy() {
        state.set_status("a job is already running, wait for it to finish");
        return (state, Vec::new());
    }

    let raw = state.input().trim().to_string();
    if raw.is_empty() {
        state.set_status("enter an album id or URL");
        return (state, Vec::new());
    }

    let job_id = state.allocate_job_id();
    let mut job = Job::submitted(job_id, kind, raw.clone());

    match resolve(&raw) {
        Err(err) => {
            // Terminal before any background work; controls were never
            // disabled, so there is nothing to restore.
            job.state = JobState::Failed;
            job.error = Some(err.to_string());
            state.record_rejected(job);
            state.set_status("could not parse the album id, check the input");
            (state, Vec::new())
        }
        Ok(album) => {
            job.album = Some(album.clone());
            job.state = JobState::Running;
            let verb = match kind {
                JobKind::Parse => "parsing",
                JobKind::Download => "downloading",
            };
            state.set_status(format!("{verb} album {album}..."));
            state.begin(job);
            (
                state,
                vec![Effect::RunJob {
                    job_id,
                    kind,
                    album,
                }],
            )
        }
    }
}
