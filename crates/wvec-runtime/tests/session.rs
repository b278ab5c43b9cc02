//! Training sessions: checkpoints, resume, thermal pauses and shutdown

use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use wvec_core::formats::checkpoint;
use wvec_core::Error;
use wvec_runtime::{
    shutdown, RuntimeConfig, RuntimeContext, SessionConfig, ThermalConfig, TrainingSession,
};

// The shutdown flag is process-wide
static SERIAL: Mutex<()> = Mutex::new(());

fn corpus() -> (Vec<i32>, Vec<i32>) {
    let tokens = (0..400).map(|i| (i * 13 + i / 5) % 40).collect();
    let table = (0..200).map(|i| (i * 7) % 40).collect();
    (tokens, table)
}

fn context() -> RuntimeContext {
    let config = RuntimeConfig { num_threads: 2, seed: Some(21), ..Default::default() };
    let mut ctx = RuntimeContext::new(config).unwrap();
    ctx.init_model(40, 8).unwrap();
    ctx
}

fn write_sensor(path: &Path, millis: i32) {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, format!("{}\n", millis)).unwrap();
    fs::rename(&tmp, path).unwrap();
}

#[test]
fn test_full_run_checkpoints_each_epoch() {
    let _guard = SERIAL.lock();
    let dir = tempfile::tempdir().unwrap();
    let ckpt = dir.path().join("run.wvck");
    let (tokens, table) = corpus();

    let ctx = context();
    let session = TrainingSession::new(SessionConfig {
        epochs: 3,
        window: 2,
        negatives: 3,
        checkpoint_path: Some(ckpt.clone()),
        ..Default::default()
    });
    let report = session.run(&ctx, &tokens, &table).unwrap();

    assert_eq!(report.start_epoch, 0);
    assert_eq!(report.epochs_completed, 3);
    assert!(!report.interrupted);
    assert_eq!(report.pairs, 3 * (4 * 400 - 6));

    let header = checkpoint::read_header(&ckpt).unwrap();
    assert_eq!(header.epoch, 3);
    assert_eq!(header.learning_rate, session.learning_rate_for(3));
}

#[test]
fn test_resume_continues_from_saved_epoch() {
    let _guard = SERIAL.lock();
    let dir = tempfile::tempdir().unwrap();
    let ckpt = dir.path().join("resume.wvck");
    let (tokens, table) = corpus();

    let first = SessionConfig {
        epochs: 2,
        window: 1,
        negatives: 2,
        checkpoint_path: Some(ckpt.clone()),
        ..Default::default()
    };
    TrainingSession::new(first.clone()).run(&context(), &tokens, &table).unwrap();
    let saved = checkpoint::read_header(&ckpt).unwrap();

    let mut ctx = RuntimeContext::default();
    let mut session = TrainingSession::new(SessionConfig { epochs: 4, ..first });
    assert!(session.resume(&mut ctx).unwrap());
    assert_eq!(session.start_epoch(), 2);
    assert_eq!(ctx.state().dims(), (40, 8));
    assert_eq!(session.learning_rate_for(2), saved.learning_rate);

    let report = session.run(&ctx, &tokens, &table).unwrap();
    assert_eq!(report.start_epoch, 2);
    assert_eq!(report.epochs_completed, 4);
    assert_eq!(report.pairs, 2 * (2 * 400 - 2));
}

#[test]
fn test_resume_decays_from_saved_rate() {
    let _guard = SERIAL.lock();
    let dir = tempfile::tempdir().unwrap();
    let ckpt = dir.path().join("rate.wvck");
    let (tokens, table) = corpus();

    context().save_checkpoint(&ckpt, 2, 0.03).unwrap();

    let mut ctx = RuntimeContext::default();
    let mut session = TrainingSession::new(SessionConfig {
        epochs: 4,
        learning_rate: 0.025,
        window: 1,
        negatives: 1,
        checkpoint_path: Some(ckpt.clone()),
        ..Default::default()
    });
    assert!(session.resume(&mut ctx).unwrap());
    assert_eq!(session.learning_rate_for(2), 0.03);
    assert!((session.learning_rate_for(3) - 0.015).abs() < 1e-7);

    let report = session.run(&ctx, &tokens, &table).unwrap();
    assert_eq!(report.epochs_completed, 4);
    let header = checkpoint::read_header(&ckpt).unwrap();
    assert_eq!(header.epoch, 4);
    assert_eq!(header.learning_rate, session.learning_rate_for(4));
}

#[test]
fn test_resume_without_checkpoint_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context();
    let mut session = TrainingSession::new(SessionConfig {
        checkpoint_path: Some(dir.path().join("absent.wvck")),
        ..Default::default()
    });
    assert!(!session.resume(&mut ctx).unwrap());
    assert_eq!(session.start_epoch(), 0);
    assert!(ctx.state().is_init());
}

#[test]
fn test_waits_for_sensor_to_cool() {
    let _guard = SERIAL.lock();
    let dir = tempfile::tempdir().unwrap();
    let sensor = dir.path().join("temp");
    write_sensor(&sensor, 92_000);
    let (tokens, table) = corpus();

    let session = TrainingSession::new(SessionConfig {
        epochs: 1,
        window: 1,
        negatives: 1,
        thermal: Some(ThermalConfig {
            sensor_path: sensor.clone(),
            threshold_celsius: 85,
            cooldown_ms: 10,
        }),
        ..Default::default()
    });

    let cooler = {
        let sensor = sensor.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            write_sensor(&sensor, 50_000);
        })
    };

    let report = session.run(&context(), &tokens, &table).unwrap();
    cooler.join().unwrap();
    assert_eq!(report.epochs_completed, 1);
    assert!(!report.interrupted);
}

#[test]
fn test_shutdown_while_overheated() {
    let _guard = SERIAL.lock();
    let dir = tempfile::tempdir().unwrap();
    let sensor = dir.path().join("temp");
    write_sensor(&sensor, 99_000);
    let (tokens, table) = corpus();

    let session = TrainingSession::new(SessionConfig {
        epochs: 3,
        thermal: Some(ThermalConfig {
            sensor_path: sensor,
            threshold_celsius: 85,
            cooldown_ms: 10,
        }),
        ..Default::default()
    });

    let ctx = context();
    let stopper = thread::spawn(|| {
        thread::sleep(Duration::from_millis(100));
        shutdown::request();
    });

    let report = session.run(&ctx, &tokens, &table).unwrap();
    stopper.join().unwrap();
    assert!(report.interrupted);
    assert_eq!(report.epochs_completed, 0);
    assert_eq!(report.pairs, 0);
    shutdown::reset();
}

#[test]
fn test_unreadable_sensor_aborts_run() {
    let _guard = SERIAL.lock();
    let dir = tempfile::tempdir().unwrap();
    let (tokens, table) = corpus();

    let session = TrainingSession::new(SessionConfig {
        thermal: Some(ThermalConfig {
            sensor_path: dir.path().join("missing"),
            ..Default::default()
        }),
        ..Default::default()
    });

    let result = session.run(&context(), &tokens, &table);
    assert!(matches!(result, Err(Error::FileIo(_))));
}
