//! Undo/redo of automation edits through the command bus

use std::sync::Arc;

use cf_core::{CfError, Value, ValueKind};
use cf_engine::{Automation, AutomationParams, EngineConfig, TrackAutomations};
use cf_state::{
    DeleteAutomationCommand, InsertKeyframeCommand, UndoManager, add_automation, finish_recording,
};
use parking_lot::RwLock;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn track() -> Arc<RwLock<TrackAutomations>> {
    Arc::new(RwLock::new(TrackAutomations::new(EngineConfig::default())))
}

fn double_params() -> AutomationParams {
    AutomationParams::new(
        Value::Double(0.5),
        Value::Double(0.0),
        Value::Double(1.0),
        ValueKind::Double,
    )
}

fn record_square(automation: &Automation, start: i64, len: i64) {
    assert!(automation.begin_write());
    for p in start..start + len {
        let high = (p / 64) % 2 == 0;
        automation
            .ingest_write_sample(p, Value::Double(if high { 0.9 } else { 0.1 }))
            .unwrap();
    }
}

#[test]
fn test_write_session_undo_redo() {
    init_logging();
    let track = track();
    let mut manager = UndoManager::new(64);
    let a = add_automation(&mut manager, &track, "cutoff", double_params()).unwrap();

    a.insert_keyframe(1000, Value::Double(0.0));
    a.insert_keyframe(2000, Value::Double(1.0));
    a.insert_keyframe(9000, Value::Double(0.25));
    let before = a.keyframes();

    record_square(&a, 500, 3000);
    assert!(finish_recording(&mut manager, &a));
    let after = a.keyframes();
    assert_ne!(before, after);
    assert_eq!(manager.undo_name(), Some("Record Automation"));

    assert!(manager.undo());
    assert_eq!(a.keyframes(), before);

    assert!(manager.redo());
    assert_eq!(a.keyframes(), after);
}

#[test]
fn test_finish_without_session_pushes_nothing() {
    let track = track();
    let mut manager = UndoManager::new(64);
    let a = add_automation(&mut manager, &track, "pan", double_params()).unwrap();
    let steps = manager.undo_count();

    assert!(!finish_recording(&mut manager, &a));
    a.begin_write();
    assert!(!finish_recording(&mut manager, &a));
    assert_eq!(manager.undo_count(), steps);
}

#[test]
fn test_point_edits_after_recording_undo_in_order() {
    let track = track();
    let mut manager = UndoManager::new(64);
    let a = add_automation(&mut manager, &track, "send", double_params()).unwrap();
    let initial = a.keyframes();

    record_square(&a, 0, 512);
    finish_recording(&mut manager, &a);
    let recorded = a.keyframes();

    manager.execute(Box::new(InsertKeyframeCommand::new(
        a.clone(),
        10_000,
        Value::Double(0.7),
    )));

    manager.undo();
    assert_eq!(a.keyframes(), recorded);
    manager.undo();
    assert_eq!(a.keyframes(), initial);
}

#[test]
fn test_add_automation_capacity() {
    let track = track();
    let mut manager = UndoManager::new(64);
    for i in 0..8 {
        add_automation(&mut manager, &track, &format!("p{i}"), double_params()).unwrap();
    }
    let err = add_automation(&mut manager, &track, "p8", double_params());
    assert!(matches!(err, Err(CfError::CapacityExceeded { max: 8 })));
    assert_eq!(manager.undo_count(), 8);
}

#[test]
fn test_undone_add_is_disposed_when_history_moves_on() {
    let track = track();
    let mut manager = UndoManager::new(64);
    let a = add_automation(&mut manager, &track, "gain", double_params()).unwrap();
    let id = a.id();

    manager.undo();
    assert!(a.is_removed());
    assert_eq!(track.read().len(), 1);

    // The hidden automation still owns its parameter
    assert!(matches!(
        add_automation(&mut manager, &track, "gain", double_params()),
        Err(CfError::AlreadyBound(_))
    ));

    // A new edit clears the redo stack, which drops the add command
    let other = add_automation(&mut manager, &track, "pan", double_params()).unwrap();
    assert!(track.read().get(id).is_none());
    assert!(track.read().get(other.id()).is_some());
    assert!(add_automation(&mut manager, &track, "gain", double_params()).is_ok());
}

#[test]
fn test_delete_automation_round_trip() {
    let track = track();
    let mut manager = UndoManager::new(64);
    let a = add_automation(&mut manager, &track, "gain", double_params()).unwrap();

    manager.execute(Box::new(DeleteAutomationCommand::new(track.clone(), a.id())));
    assert!(a.is_removed());
    assert_eq!(track.read().active().count(), 0);

    manager.undo();
    assert!(!a.is_removed());

    manager.redo();
    assert!(a.is_removed());

    // Dropping history disposes the deleted automation
    manager.clear();
    assert!(track.read().get(a.id()).is_none());
    assert!(track.read().is_empty());
}

#[test]
fn test_push_command_inside_group() {
    let track = track();
    let mut manager = UndoManager::new(64);
    let a = add_automation(&mut manager, &track, "gain", double_params()).unwrap();
    let before = a.keyframes();

    manager.begin_group("Overdub");
    manager.execute(Box::new(InsertKeyframeCommand::new(a.clone(), 100, Value::Double(0.1))));
    record_square(&a, 200, 256);
    finish_recording(&mut manager, &a);
    manager.end_group();

    assert_eq!(manager.undo_name(), Some("Overdub"));
    manager.undo();
    assert_eq!(a.keyframes(), before);
}
