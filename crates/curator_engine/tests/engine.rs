use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use curator_engine::{
    AlbumDetail, AlbumMetadata, DownloadPlan, DownloadSummary, EngineEvent, EngineHandle,
    JobKind, ProgressSink, SourceClient, SourceError,
};

struct FakeSource {
    fail_fetch: bool,
    fail_download: bool,
    panic_in_download: bool,
}

impl FakeSource {
    fn ok() -> Self {
        Self {
            fail_fetch: false,
            fail_download: false,
            panic_in_download: false,
        }
    }
}

#[async_trait::async_trait]
impl SourceClient for FakeSource {
    async fn fetch_metadata(&self, album_id: &str) -> Result<AlbumDetail, SourceError> {
        if self.fail_fetch {
            return Err(SourceError::Status(404));
        }
        Ok(AlbumDetail {
            metadata: AlbumMetadata {
                name: format!("Album {album_id}"),
                author: "X".to_string(),
                tags: vec!["a".to_string()],
                chapter_count: 1,
                description: None,
            },
            chapters: Vec::new(),
        })
    }

    async fn download(
        &self,
        _album_id: &str,
        _plan: &DownloadPlan,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadSummary, SourceError> {
        if self.panic_in_download {
            panic!("boom");
        }
        if self.fail_download {
            return Err(SourceError::Network("connection reset".to_string()));
        }
        sink.log("chapter 1/1: saved 3 images");
        Ok(DownloadSummary {
            chapters_processed: 1,
            chapters_saved: 1,
            images_saved: 3,
        })
    }

    fn cover_url(&self, album_id: &str) -> String {
        format!("fake://cover/{album_id}")
    }
}

fn handle_for(source: FakeSource) -> EngineHandle {
    EngineHandle::with_client(Arc::new(source), Arc::new(|| "12:00:00".to_string()))
}

fn empty_plan() -> DownloadPlan {
    DownloadPlan {
        base_dir: PathBuf::from("unused"),
        dir_rule: "{album_id}/{chapter_id}".to_string(),
        before_album: Vec::new(),
        after_album: Vec::new(),
        before_photo: Vec::new(),
    }
}

/// Drains events until the terminal one arrives, then keeps listening for a
/// short grace period so duplicate terminal events would be caught.
fn collect_events(handle: &EngineHandle) -> Vec<EngineEvent> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut events = Vec::new();
    let mut settle_until = None;

    loop {
        match handle.try_recv() {
            Some(event) => {
                let terminal = matches!(event, EngineEvent::Finished { .. });
                events.push(event);
                if terminal && settle_until.is_none() {
                    settle_until = Some(Instant::now() + Duration::from_millis(150));
                }
            }
            None => {
                if let Some(until) = settle_until {
                    if Instant::now() > until {
                        break;
                    }
                } else if Instant::now() > deadline {
                    panic!("engine never sent a terminal event: {events:?}");
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }
    events
}

#[test]
fn parse_job_emits_started_metadata_finished() {
    let handle = handle_for(FakeSource::ok());
    handle.dispatch(1, JobKind::Parse, "422866".to_string(), empty_plan());

    let events = collect_events(&handle);
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], EngineEvent::Started { job_id: 1, .. }));
    match &events[1] {
        EngineEvent::MetadataReady { metadata, .. } => {
            assert_eq!(metadata.name, "Album 422866");
        }
        other => panic!("expected metadata event, got {other:?}"),
    }
    assert!(matches!(
        &events[2],
        EngineEvent::Finished { job_id: 1, result: Ok(()), .. }
    ));
}

#[test]
fn download_job_forwards_sink_lines() {
    let handle = handle_for(FakeSource::ok());
    handle.dispatch(2, JobKind::Download, "7".to_string(), empty_plan());

    let events = collect_events(&handle);
    assert!(events.iter().any(|event| matches!(
        event,
        EngineEvent::Log { job_id: 2, line, .. } if line == "chapter 1/1: saved 3 images"
    )));
    assert!(matches!(
        events.last().unwrap(),
        EngineEvent::Finished { result: Ok(()), .. }
    ));
}

#[test]
fn fetch_failure_ends_with_exactly_one_failed_terminal() {
    let handle = handle_for(FakeSource {
        fail_fetch: true,
        ..FakeSource::ok()
    });
    handle.dispatch(3, JobKind::Parse, "404404".to_string(), empty_plan());

    let events = collect_events(&handle);
    let terminals: Vec<_> = events
        .iter()
        .filter(|event| matches!(event, EngineEvent::Finished { .. }))
        .collect();
    assert_eq!(terminals.len(), 1);
    match terminals[0] {
        EngineEvent::Finished { result: Err(message), .. } => {
            assert!(message.contains("http status 404"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!events
        .iter()
        .any(|event| matches!(event, EngineEvent::MetadataReady { .. })));
}

#[test]
fn download_failure_carries_the_source_message() {
    let handle = handle_for(FakeSource {
        fail_download: true,
        ..FakeSource::ok()
    });
    handle.dispatch(4, JobKind::Download, "7".to_string(), empty_plan());

    let events = collect_events(&handle);
    match events.last().unwrap() {
        EngineEvent::Finished { result: Err(message), .. } => {
            assert!(message.contains("connection reset"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn a_panicking_job_still_gets_a_terminal_event() {
    let handle = handle_for(FakeSource {
        panic_in_download: true,
        ..FakeSource::ok()
    });
    handle.dispatch(5, JobKind::Download, "7".to_string(), empty_plan());

    let events = collect_events(&handle);
    match events.last().unwrap() {
        EngineEvent::Finished { result: Err(message), .. } => {
            assert!(message.contains("panicked"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    // The worker survives and processes the next command.
    handle.dispatch(6, JobKind::Parse, "1".to_string(), empty_plan());
    let events = collect_events(&handle);
    assert!(matches!(
        events.last().unwrap(),
        EngineEvent::Finished { job_id: 6, result: Ok(()), .. }
    ));
}

#[test]
fn jobs_run_sequentially_in_dispatch_order() {
    let handle = handle_for(FakeSource::ok());
    handle.dispatch(7, JobKind::Parse, "1".to_string(), empty_plan());
    handle.dispatch(8, JobKind::Parse, "2".to_string(), empty_plan());

    let mut first = collect_events(&handle);
    // Both jobs may already be drained; collect more if the second terminal
    // has not arrived yet.
    if !first.iter().any(
        |event| matches!(event, EngineEvent::Finished { job_id: 8, .. }),
    ) {
        first.extend(collect_events(&handle));
    }

    let order: Vec<_> = first
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Finished { job_id, .. } => Some(*job_id),
            _ => None,
        })
        .collect();
    assert_eq!(order, vec![7, 8]);
}
