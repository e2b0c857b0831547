use std::sync::Once;

use curator_core::{update, AppState, Effect, JobKind, JobOutcome, JobState, Msg};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(curator_logging::initialize_for_tests);
}

fn submit(state: AppState, input: &str, kind: JobKind) -> (AppState, Vec<Effect>) {
    let (state, _) = update(state, Msg::InputChanged(input.to_string()));
    update(state, Msg::Submitted { kind })
}

#[test]
fn submit_resolves_and_dispatches() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "https://site/album/422866", JobKind::Parse);

    let view = state.view();
    assert!(view.busy);
    assert!(!view.controls_enabled);
    assert_eq!(view.job.as_ref().unwrap().album_id, "422866");
    assert_eq!(view.job.as_ref().unwrap().state, JobState::Running);

    let Effect::RunJob {
        job_id,
        kind,
        album,
    } = &effects[0];
    assert_eq!(*job_id, 1);
    assert_eq!(*kind, JobKind::Parse);
    assert_eq!(album.as_str(), "422866");
    assert_eq!(effects.len(), 1);
}

#[test]
fn empty_input_is_rejected_without_a_job() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "   ", JobKind::Download);

    let view = state.view();
    assert!(effects.is_empty());
    assert!(!view.busy);
    assert!(view.controls_enabled);
    assert!(view.job.is_none());
    assert_eq!(view.status_line, "enter an album id or URL");
}

#[test]
fn unparseable_input_fails_before_any_background_work() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "definitely-not-an-id", JobKind::Download);

    let view = state.view();
    assert!(effects.is_empty());
    assert!(!view.busy);
    assert!(view.controls_enabled, "controls stay enabled");
    let job = view.job.unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert!(job.error.is_some());
    assert_eq!(view.status_line, "could not parse the album id, check the input");
    // Resolution failure is status-only; nothing reached the log.
    assert!(view.log.is_empty());
}

#[test]
fn second_submit_while_busy_is_rejected_and_job_unaffected() {
    init_logging();
    let (state, _) = submit(AppState::new(), "422866", JobKind::Download);
    let before = state.view().job.clone().unwrap();

    let (state, effects) = submit(state, "999999", JobKind::Parse);

    assert!(effects.is_empty());
    let view = state.view();
    assert!(view.busy);
    assert_eq!(view.job.unwrap(), before, "running job is untouched");
    assert_eq!(
        view.status_line,
        "a job is already running, wait for it to finish"
    );
}

#[test]
fn submit_after_terminal_job_is_accepted_again() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "422866", JobKind::Parse);
    let Effect::RunJob { job_id, .. } = effects[0].clone();

    let (state, _) = update(
        state,
        Msg::JobFinished {
            job_id,
            at: "12:00:01".to_string(),
            outcome: JobOutcome::Succeeded,
        },
    );
    assert!(!state.view().busy);

    let (state, effects) = submit(state, "777", JobKind::Download);
    assert_eq!(effects.len(), 1);
    assert_eq!(state.view().job.unwrap().album_id, "777");
}

#[test]
fn unavailable_source_disables_submission() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::SourceUnavailable {
            reason: "no source endpoint configured".to_string(),
        },
    );
    assert!(!state.view().controls_enabled);

    let (state, effects) = submit(state, "422866", JobKind::Parse);
    assert!(effects.is_empty());
    assert!(state.view().job.is_none());
    assert!(state
        .view()
        .status_line
        .contains("content source unavailable"));
}

#[test]
fn input_changed_produces_no_effects() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::InputChanged("422".to_string()));
    assert!(effects.is_empty());
    assert_eq!(state.view().input, "422");
}
