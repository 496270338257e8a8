//! End-to-end session scenarios driven through the public handle,
//! with a scripted generator standing in for the model runtime.

use parking_lot::Mutex;
use parley::chat::{Author, MessageStatus};
use parley::gate::{GateSource, GateState};
use parley::generate::{Fragment, FragmentStream, TextGenerator};
use parley::session::{SessionConfig, SessionController, SessionHandle, SessionSnapshot, SubmitOutcome};
use parley::speech::{
    QueueMode, QueuedSynthesizer, RecognitionCandidate, SpeechQueue, SpeechSynthesizer,
};
use parley::{ParleyError, Result};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Yields one pre-recorded fragment script per generate call.
struct ScriptedGenerator {
    scripts: Mutex<VecDeque<Vec<Result<Fragment>>>>,
}

impl ScriptedGenerator {
    fn new(scripts: Vec<Vec<Result<Fragment>>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
        }
    }

    fn single(script: Vec<Result<Fragment>>) -> Self {
        Self::new(vec![script])
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, _prompt: &str) -> FragmentStream {
        let script = self.scripts.lock().pop_front().unwrap_or_default();
        Box::pin(futures::stream::iter(script))
    }
}

/// Holds the stream open until released, so tests can observe the busy
/// phase deterministically.
struct GatedGenerator {
    release: Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
}

impl GatedGenerator {
    fn new() -> (Self, tokio::sync::oneshot::Sender<()>) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        (
            Self {
                release: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl TextGenerator for GatedGenerator {
    fn generate(&self, _prompt: &str) -> FragmentStream {
        let release = self.release.lock().take();
        Box::pin(async_stream::stream! {
            if let Some(rx) = release {
                let _ = rx.await;
            }
            yield Ok(Fragment::last("done"));
        })
    }
}

struct FailingSynthesizer;

impl SpeechSynthesizer for FailingSynthesizer {
    fn initialize(&mut self) -> Result<()> {
        Err(ParleyError::SynthesisInit("no speech service".into()))
    }

    fn speak(&mut self, _text: &str, _mode: QueueMode) -> Result<()> {
        Ok(())
    }
}

fn start_session(
    generator: impl TextGenerator + 'static,
) -> (SessionHandle, SpeechQueue) {
    let queue = SpeechQueue::new();
    let synthesizer = QueuedSynthesizer::new(queue.clone());
    let handle = SessionController::start(
        SessionConfig::default(),
        Box::new(generator),
        Box::new(synthesizer),
    )
    .expect("session should start");
    (handle, queue)
}

fn wait_until(
    handle: &SessionHandle,
    what: &str,
    predicate: impl Fn(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = handle.snapshot();
        if predicate(&snapshot) {
            return snapshot;
        }
        if Instant::now() > deadline {
            panic!("timed out waiting for {}; last snapshot: {:?}", what, snapshot);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn wait_until_ready(handle: &SessionHandle) -> SessionSnapshot {
    wait_until(handle, "session ready", |s| s.is_ready())
}

#[test]
fn end_to_end_turn_appends_both_messages_and_reopens_gate() {
    let generator = ScriptedGenerator::single(vec![
        Ok(Fragment::piece("Hel")),
        Ok(Fragment::last("lo!")),
    ]);
    let (handle, queue) = start_session(generator);
    wait_until_ready(&handle);

    assert_eq!(handle.submit_text("Hi").unwrap(), SubmitOutcome::Accepted);

    let snapshot = wait_until(&handle, "turn to finish", |s| {
        s.is_ready() && s.messages.len() == 2
    });

    let user = &snapshot.messages[0];
    assert_eq!(user.author, Author::User);
    assert_eq!(user.raw_content, "Hi");
    assert_eq!(user.status, MessageStatus::Complete);

    let model = &snapshot.messages[1];
    assert_eq!(model.author, Author::Model);
    assert_eq!(model.raw_content, "Hello!");
    assert_eq!(model.status, MessageStatus::Complete);

    // Completed response was handed off for speech.
    assert_eq!(queue.dequeue().as_deref(), Some("Hello!"));
}

#[test]
fn busy_gate_rejects_submissions_at_the_input_surface() {
    let (generator, release) = GatedGenerator::new();
    let (handle, _queue) = start_session(generator);
    wait_until_ready(&handle);

    handle.submit_text("first").unwrap();
    let busy = wait_until(&handle, "gate to close", |s| {
        s.gate == GateState::Busy && s.gate_source == GateSource::Controller
    });
    assert_eq!(busy.messages.len(), 2);
    assert!(busy.messages[1].is_in_progress());

    // Second submission is rejected without queueing anything.
    assert_eq!(
        handle.submit_text("second").unwrap(),
        SubmitOutcome::RejectedBusy
    );

    release.send(()).unwrap();
    let done = wait_until(&handle, "turn to finish", |s| s.is_ready());
    assert_eq!(done.messages.len(), 2);
    assert_eq!(done.messages[1].raw_content, "done");
    assert_eq!(done.messages[0].raw_content, "first");
}

#[test]
fn generation_fault_surfaces_as_model_message_and_reopens_gate() {
    let generator = ScriptedGenerator::single(vec![
        Ok(Fragment::piece("par")),
        Err(ParleyError::Generation("boom".into())),
    ]);
    let (handle, queue) = start_session(generator);
    wait_until_ready(&handle);

    handle.submit_text("Hi").unwrap();
    let snapshot = wait_until(&handle, "fault to surface", |s| {
        s.is_ready() && s.messages.len() == 3
    });

    // The partial response is finalized, never left in progress.
    let partial = &snapshot.messages[1];
    assert_eq!(partial.raw_content, "par");
    assert_eq!(partial.status, MessageStatus::Complete);

    let error = &snapshot.messages[2];
    assert_eq!(error.author, Author::Model);
    assert_eq!(error.status, MessageStatus::Complete);
    assert!(error.raw_content.contains("boom"), "got: {}", error.raw_content);

    // No speech handoff for a failed turn.
    assert!(queue.is_empty());
}

#[test]
fn zero_fragment_stream_is_a_generation_fault() {
    let generator = ScriptedGenerator::single(vec![]);
    let (handle, _queue) = start_session(generator);
    wait_until_ready(&handle);

    handle.submit_text("Hi").unwrap();
    let snapshot = wait_until(&handle, "fault to surface", |s| {
        s.is_ready() && s.messages.len() == 3
    });

    assert!(snapshot.messages.iter().all(|m| !m.is_in_progress()));
    assert!(snapshot.messages[2]
        .raw_content
        .contains("Response generation failed"));
}

#[test]
fn missing_final_marker_completes_with_accumulated_text() {
    let generator = ScriptedGenerator::single(vec![Ok(Fragment::piece("Hi there"))]);
    let (handle, queue) = start_session(generator);
    wait_until_ready(&handle);

    handle.submit_text("Hello").unwrap();
    let snapshot = wait_until(&handle, "turn to finish", |s| {
        s.is_ready() && s.messages.len() == 2
    });

    let model = &snapshot.messages[1];
    assert_eq!(model.raw_content, "Hi there");
    assert_eq!(model.status, MessageStatus::Complete);
    assert_eq!(queue.dequeue().as_deref(), Some("Hi there"));
}

#[test]
fn recognition_results_feed_best_transcript_into_a_turn() {
    let generator = ScriptedGenerator::single(vec![Ok(Fragment::last("Hello!"))]);
    let (handle, _queue) = start_session(generator);
    wait_until_ready(&handle);

    handle.notify_recognition_started().unwrap();
    wait_until(&handle, "listening phase", |s| {
        s.gate == GateState::Busy && s.gate_source == GateSource::Recognizer
    });

    handle
        .submit_recognition_results(vec![
            RecognitionCandidate::new("hello word", 0.61),
            RecognitionCandidate::new("hello world", 0.93),
        ])
        .unwrap();

    let snapshot = wait_until(&handle, "turn to finish", |s| {
        s.is_ready() && s.messages.len() == 2
    });
    assert_eq!(snapshot.messages[0].raw_content, "hello world");
    assert_eq!(snapshot.messages[1].raw_content, "Hello!");
}

#[test]
fn empty_recognition_reopens_without_a_turn() {
    let generator = ScriptedGenerator::new(vec![]);
    let (handle, _queue) = start_session(generator);
    wait_until_ready(&handle);

    handle.notify_recognition_started().unwrap();
    wait_until(&handle, "listening phase", |s| s.gate == GateState::Busy);

    handle.submit_recognition_results(vec![]).unwrap();
    let snapshot = wait_until_ready(&handle);
    assert!(snapshot.messages.is_empty());
}

#[test]
fn failed_recognition_reopens_without_a_message() {
    let generator = ScriptedGenerator::new(vec![]);
    let (handle, _queue) = start_session(generator);
    wait_until_ready(&handle);

    handle.notify_recognition_started().unwrap();
    wait_until(&handle, "listening phase", |s| s.gate == GateState::Busy);

    handle.notify_recognition_failed("ERROR_NO_MATCH").unwrap();
    let snapshot = wait_until_ready(&handle);
    assert!(snapshot.messages.is_empty());
    assert_eq!(snapshot.gate_source, GateSource::Recognizer);
}

#[test]
fn recognized_speech_submission_runs_a_turn() {
    let generator = ScriptedGenerator::single(vec![Ok(Fragment::last("Hello!"))]);
    let (handle, _queue) = start_session(generator);
    wait_until_ready(&handle);

    handle.submit_from_recognized_speech("Hi").unwrap();
    let snapshot = wait_until(&handle, "turn to finish", |s| {
        s.is_ready() && s.messages.len() == 2
    });
    assert_eq!(snapshot.messages[0].raw_content, "Hi");
}

#[test]
fn synthesis_init_failure_keeps_text_input_usable() {
    let generator = ScriptedGenerator::single(vec![Ok(Fragment::last("Hello!"))]);
    let handle = SessionController::start(
        SessionConfig::default(),
        Box::new(generator),
        Box::new(FailingSynthesizer),
    )
    .expect("session should start");

    let snapshot = wait_until_ready(&handle);
    assert!(!snapshot.speech_available);

    handle.submit_text("Hi").unwrap();
    let snapshot = wait_until(&handle, "turn to finish", |s| {
        s.is_ready() && s.messages.len() == 2
    });
    assert_eq!(snapshot.messages[1].raw_content, "Hello!");
}

#[test]
fn disabled_speech_starts_ready_immediately() {
    let queue = SpeechQueue::new();
    let handle = SessionController::start(
        SessionConfig::default().without_speech(),
        Box::new(ScriptedGenerator::new(vec![])),
        Box::new(QueuedSynthesizer::new(queue.clone())),
    )
    .expect("session should start");

    let snapshot = wait_until_ready(&handle);
    assert!(!snapshot.speech_available);
    assert_eq!(snapshot.gate_source, GateSource::Startup);
}

#[test]
fn whitespace_only_submission_is_ignored() {
    let generator = ScriptedGenerator::new(vec![]);
    let (handle, _queue) = start_session(generator);
    wait_until_ready(&handle);

    handle.submit_text("   ").unwrap();
    std::thread::sleep(Duration::from_millis(50));
    let snapshot = handle.snapshot();
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.is_ready());
}
