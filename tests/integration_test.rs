use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tts_batch::batch::{BatchOptions, BatchRunner, ItemOutcome, SkipReason};
use tts_batch::catalog::{self, VoiceLabels};
use tts_batch::error::{BatchError, CatalogError, SynthesisError, ValidationError, VerifyError};
use tts_batch::{
    spawn_batch, CancelToken, EngineOutput, NoProgress, ProgressEvent, SpeechEngine,
    SynthesisConfig, TextItem,
};

mockall::mock! {
    pub Engine {}
    impl SpeechEngine for Engine {
        fn id(&self) -> &'static str;
        fn locate(&self) -> std::io::Result<PathBuf>;
        fn run(&self, args: &[OsString]) -> std::io::Result<EngineOutput>;
        fn list_voices_args(&self) -> Vec<OsString>;
    }
}

/// Value of a `--flag=value` argument.
fn arg_value(args: &[OsString], flag: &str) -> String {
    let prefix = format!("{flag}=");
    args.iter()
        .find_map(|a| a.to_str()?.strip_prefix(prefix.as_str()).map(str::to_string))
        .expect("flag present")
}

fn write_target(args: &[OsString], bytes: usize) {
    fs::write(arg_value(args, "--write-media"), vec![7u8; bytes]).unwrap();
}

/// A mock that is found on PATH.
fn located_engine() -> MockEngine {
    let mut engine = MockEngine::new();
    engine.expect_id().return_const("mock-tts");
    engine
        .expect_locate()
        .returning(|| Ok(PathBuf::from("/usr/bin/mock-tts")));
    engine
}

fn runner(engine: MockEngine, max_retries: u32) -> BatchRunner {
    BatchRunner::new(
        Arc::new(engine),
        BatchOptions {
            max_retries,
            ..BatchOptions::default()
        },
    )
}

fn config() -> SynthesisConfig {
    SynthesisConfig::new("en-US-AriaNeural")
}

#[test]
fn test_mixed_batch_with_blank_row() {
    let mut engine = located_engine();
    engine.expect_run().times(2).returning(|args| {
        write_target(args, 200);
        Ok(EngineOutput::new(Some(0), "WEBVTT\n"))
    });

    let dir = tempfile::tempdir().unwrap();
    let events = RefCell::new(Vec::new());
    let sink = |e: ProgressEvent| events.borrow_mut().push(e);
    let items = TextItem::sequence(["Hello", "", "World"]);

    let result = runner(engine, 10)
        .run_batch(&items, dir.path(), &config(), &sink, None)
        .unwrap();

    assert_eq!(result.successes(), 2);
    assert_eq!(result.skips(), 1);
    assert_eq!(result.failures(), 0);
    assert!(result.failure_report().is_none());
    assert!(matches!(
        result.items[1].outcome,
        ItemOutcome::Skipped(SkipReason::EmptyInput)
    ));
    assert!(dir.path().join("Hello.mp3").exists());
    assert!(dir.path().join("World.mp3").exists());

    let events = events.into_inner();
    assert_eq!(events.len(), 4);
    let indices: Vec<usize> = events.iter().map(|e| e.current).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(events[3].percentage, 100.0);
}

#[test]
fn test_engine_receives_validated_arguments() {
    let mut engine = located_engine();
    engine
        .expect_run()
        .withf(|args: &[OsString]| {
            arg_value(args, "--voice") == "en-US-AriaNeural"
                && arg_value(args, "--rate") == "+0%"
                && arg_value(args, "--volume") == "-10%"
                && arg_value(args, "--text") == "trim me"
        })
        .times(1)
        .returning(|args| {
            write_target(args, 150);
            Ok(EngineOutput::new(Some(0), ""))
        });

    let dir = tempfile::tempdir().unwrap();
    let cfg = SynthesisConfig::new(" en-US-AriaNeural ")
        .with_rate("")
        .with_volume("-10%");

    let result = runner(engine, 3)
        .run_batch(&[TextItem::new(0, "  trim me  ")], dir.path(), &cfg, &NoProgress, None)
        .unwrap();
    assert_eq!(result.successes(), 1);
    assert!(dir.path().join("trim_me.mp3").exists());
}

#[test]
fn test_transient_failure_is_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let mut engine = located_engine();
    engine.expect_run().times(3).returning(move |args| {
        if seen.fetch_add(1, Ordering::SeqCst) < 2 {
            write_target(args, 10);
            Ok(EngineOutput::new(Some(0), "NoAudioReceived: Error"))
        } else {
            write_target(args, 4096);
            Ok(EngineOutput::new(Some(0), ""))
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let result = runner(engine, 10)
        .run_batch(&[TextItem::new(0, "retry")], dir.path(), &config(), &NoProgress, None)
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    match &result.items[0].outcome {
        ItemOutcome::Success(path) => assert_eq!(fs::metadata(path).unwrap().len(), 4096),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_exhausted_item_does_not_stop_the_batch() {
    let mut engine = located_engine();
    engine.expect_run().times(4).returning(|args| {
        if arg_value(args, "--text") == "bad" {
            write_target(args, 500);
            Ok(EngineOutput::new(Some(0), "转换失败"))
        } else {
            write_target(args, 500);
            Ok(EngineOutput::new(Some(0), ""))
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let items = TextItem::sequence(["bad", "good"]);
    let result = runner(engine, 3)
        .run_batch(&items, dir.path(), &config(), &NoProgress, None)
        .unwrap();

    assert_eq!(result.failures(), 1);
    assert_eq!(result.successes(), 1);
    match &result.items[0].outcome {
        ItemOutcome::Failed { error, attempts } => {
            assert_eq!(*attempts, 3);
            assert!(matches!(error, SynthesisError::Engine { .. }));
            assert_eq!(error.raw_output(), Some("转换失败"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!dir.path().join("bad.mp3").exists());
    assert!(dir.path().join("good.mp3").exists());

    let report = result.failure_report().unwrap();
    assert!(report.starts_with("1 of 2 synthesis item(s) failed:"));
    assert!(report.contains("#1/2 (bad) after 3 attempt(s)"));
}

#[test]
fn test_undersized_output_is_removed_and_fails() {
    let mut engine = located_engine();
    engine.expect_run().times(2).returning(|args| {
        write_target(args, 99);
        Ok(EngineOutput::new(Some(0), ""))
    });

    let dir = tempfile::tempdir().unwrap();
    let result = runner(engine, 2)
        .run_batch(&[TextItem::new(0, "tiny")], dir.path(), &config(), &NoProgress, None)
        .unwrap();

    match &result.items[0].outcome {
        ItemOutcome::Failed {
            error: SynthesisError::Verify(VerifyError::UndersizedOutput { size, .. }),
            attempts,
        } => {
            assert_eq!(*size, 99);
            assert_eq!(*attempts, 2);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!dir.path().join("tiny.mp3").exists());
}

#[test]
fn test_missing_output_fails() {
    let mut engine = located_engine();
    engine
        .expect_run()
        .times(1)
        .returning(|_| Ok(EngineOutput::new(Some(0), "")));

    let dir = tempfile::tempdir().unwrap();
    let result = runner(engine, 1)
        .run_batch(&[TextItem::new(0, "ghost")], dir.path(), &config(), &NoProgress, None)
        .unwrap();

    assert!(matches!(
        result.items[0].outcome,
        ItemOutcome::Failed {
            error: SynthesisError::Verify(VerifyError::MissingOutput(_)),
            attempts: 1
        }
    ));
}

#[test]
fn test_validation_failure_is_not_retried() {
    let mut engine = located_engine();
    engine.expect_run().times(0);

    let dir = tempfile::tempdir().unwrap();
    let cfg = config().with_rate("fast");
    let result = runner(engine, 10)
        .run_batch(&[TextItem::new(0, "hello")], dir.path(), &cfg, &NoProgress, None)
        .unwrap();

    match &result.items[0].outcome {
        ItemOutcome::Failed { error, attempts } => {
            assert_eq!(*attempts, 0);
            assert!(matches!(
                error,
                SynthesisError::Validation(ValidationError::InvalidRateFormat(_))
            ));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_engine_not_found_aborts_before_any_run() {
    let mut engine = MockEngine::new();
    engine.expect_id().return_const("mock-tts");
    engine.expect_locate().returning(|| {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "cannot find binary path",
        ))
    });
    engine.expect_run().times(0);

    let dir = tempfile::tempdir().unwrap();
    let err = runner(engine, 10)
        .run_batch(
            &TextItem::sequence(["a", "b"]),
            dir.path(),
            &config(),
            &NoProgress,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, BatchError::EngineNotFound { .. }));
}

#[test]
fn test_catalog_unavailable_without_spawning() {
    let mut engine = MockEngine::new();
    engine.expect_id().return_const("mock-tts");
    engine.expect_locate().returning(|| {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "cannot find binary path",
        ))
    });
    engine.expect_run().times(0);
    engine.expect_list_voices_args().times(0);

    let err = catalog::list_voices(&engine, VoiceLabels::builtin()).unwrap_err();
    assert!(matches!(err, CatalogError::CatalogUnavailable { .. }));
}

#[test]
fn test_catalog_from_engine_listing() {
    let mut engine = located_engine();
    engine
        .expect_list_voices_args()
        .returning(|| vec![OsString::from("--list-voices")]);
    engine
        .expect_run()
        .withf(|args: &[OsString]| args == [OsString::from("--list-voices")])
        .times(1)
        .returning(|_| {
            Ok(EngineOutput::new(
                Some(0),
                "Name                  Gender\n--------------------  ------\nja-JP-NanamiNeural    Female\nen-GB-RyanNeural      Male\n",
            ))
        });

    let voices = catalog::list_voices(&engine, VoiceLabels::builtin()).unwrap();
    let labels: Vec<&str> = voices.iter().map(|v| v.display_label.as_str()).collect();
    assert_eq!(labels, vec!["日语(日本)-女-Nanami", "英语(英国)-男-Ryan"]);
}

#[test]
fn test_catalog_engine_failure() {
    let mut engine = located_engine();
    engine
        .expect_list_voices_args()
        .returning(|| vec![OsString::from("--list-voices")]);
    engine
        .expect_run()
        .returning(|_| Ok(EngineOutput::new(Some(1), "connection refused")));

    let err = catalog::list_voices(&engine, VoiceLabels::builtin()).unwrap_err();
    assert!(matches!(err, CatalogError::CatalogUnavailable { .. }));
}

#[test]
fn test_empty_batch_reports_completion() {
    let mut engine = located_engine();
    engine.expect_run().times(0);

    let dir = tempfile::tempdir().unwrap();
    let events = RefCell::new(Vec::new());
    let sink = |e: ProgressEvent| events.borrow_mut().push(e);

    let result = runner(engine, 10)
        .run_batch(&[], dir.path(), &config(), &sink, None)
        .unwrap();

    assert_eq!(result.total(), 0);
    let events = events.into_inner();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].percentage, 100.0);
}

#[test]
fn test_output_dir_failure_is_fatal() {
    let mut engine = located_engine();
    engine.expect_run().times(0);

    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"x").unwrap();

    let err = runner(engine, 10)
        .run_batch(
            &[TextItem::new(0, "hello")],
            &blocker.join("out"),
            &config(),
            &NoProgress,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, BatchError::OutputDir { .. }));
}

#[test]
fn test_cancellation_between_items() {
    let mut engine = located_engine();
    engine.expect_run().times(1).returning(|args| {
        write_target(args, 300);
        Ok(EngineOutput::new(Some(0), ""))
    });

    let dir = tempfile::tempdir().unwrap();
    let token = CancelToken::new();
    let events = RefCell::new(Vec::new());
    let sink = |e: ProgressEvent| {
        events.borrow_mut().push(e);
        token.cancel();
    };

    let result = runner(engine, 10)
        .run_batch(
            &TextItem::sequence(["one", "two", "three"]),
            dir.path(),
            &config(),
            &sink,
            Some(&token),
        )
        .unwrap();

    assert_eq!(result.successes(), 1);
    assert!(matches!(
        result.items[2].outcome,
        ItemOutcome::Skipped(SkipReason::Cancelled)
    ));
    let events = events.into_inner();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].percentage, 100.0);
}

#[test]
fn test_background_batch_streams_progress() {
    let mut engine = located_engine();
    engine.expect_run().times(3).returning(|args| {
        write_target(args, 256);
        Ok(EngineOutput::new(Some(0), ""))
    });

    let dir = tempfile::tempdir().unwrap();
    let handle = spawn_batch(
        Arc::new(runner(engine, 10)),
        TextItem::sequence(["a", "b", "c"]),
        dir.path().to_path_buf(),
        config(),
        None,
    );

    let events: Vec<ProgressEvent> = handle.progress.iter().collect();
    let result = handle.join().unwrap();

    assert_eq!(result.successes(), 3);
    assert_eq!(events.len(), 4);
    assert!(events.windows(2).all(|w| w[0].current <= w[1].current));
    assert_eq!(events.last().map(|e| e.percentage), Some(100.0));
}

#[test]
fn test_engine_process_error_is_retried_and_cleans_up() {
    let mut engine = located_engine();
    engine.expect_run().times(3).returning(|args| {
        write_target(args, 2048);
        Err(io::Error::new(io::ErrorKind::TimedOut, "engine timed out"))
    });

    let dir = tempfile::tempdir().unwrap();
    let result = runner(engine, 3)
        .run_batch(&[TextItem::new(0, "slow")], dir.path(), &config(), &NoProgress, None)
        .unwrap();

    match &result.items[0].outcome {
        ItemOutcome::Failed {
            error: SynthesisError::Process(source),
            attempts,
        } => {
            assert_eq!(*attempts, 3);
            assert_eq!(source.kind(), io::ErrorKind::TimedOut);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!dir.path().join("slow.mp3").exists());
}
