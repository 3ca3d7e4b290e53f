//! Concrete Command Implementations for Automation Editing
//!
//! Provides undoable commands for:
//! - Keyframe operations (insert, remove, move)
//! - Automation operations (add, delete)
//! - Write sessions (whole recorded span)
//!
//! Handlers hold positions, never indices, and re-locate their target when
//! they run.

use std::any::Any;
use std::sync::Arc;

use cf_core::{CfResult, SamplePos, Value};
use cf_engine::{Automation, AutomationId, AutomationParams, TrackAutomations, WriteSession};
use parking_lot::RwLock;

use crate::{Command, CommandSink};

// ═══════════════════════════════════════════════════════════════════════════════
// KEYFRAME COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Insert a keyframe
pub struct InsertKeyframeCommand {
    automation: Arc<Automation>,
    position: SamplePos,
    value: Value,
    /// Value that sat at `position` before, when the insert degraded to a move
    replaced: Option<Value>,
}

impl InsertKeyframeCommand {
    pub fn new(automation: Arc<Automation>, position: SamplePos, value: Value) -> Self {
        Self {
            automation,
            position,
            value,
            replaced: None,
        }
    }
}

impl Command for InsertKeyframeCommand {
    fn execute(&mut self) {
        self.replaced = self.automation.keyframe_at(self.position);
        self.automation.insert_keyframe(self.position, self.value);
    }

    fn undo(&mut self) {
        match self.replaced {
            Some(previous) => {
                self.automation.insert_keyframe(self.position, previous);
            }
            None => {
                self.automation.remove_keyframe_at(self.position);
            }
        }
    }

    fn name(&self) -> &str {
        "Insert Keyframe"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Remove a keyframe
pub struct RemoveKeyframeCommand {
    automation: Arc<Automation>,
    position: SamplePos,
    removed: Option<Value>,
}

impl RemoveKeyframeCommand {
    pub fn new(automation: Arc<Automation>, position: SamplePos) -> Self {
        Self {
            automation,
            position,
            removed: None,
        }
    }
}

impl Command for RemoveKeyframeCommand {
    fn execute(&mut self) {
        self.removed = self.automation.remove_keyframe_at(self.position);
    }

    fn undo(&mut self) {
        if let Some(value) = self.removed.take() {
            self.automation.insert_keyframe(self.position, value);
        }
    }

    fn name(&self) -> &str {
        "Remove Keyframe"
    }

    fn changed(&self) -> bool {
        self.removed.is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Move a keyframe. Consecutive moves of the same keyframe (a drag) merge
/// into one undo step.
pub struct MoveKeyframeCommand {
    automation: Arc<Automation>,
    from_position: SamplePos,
    from_value: Option<Value>,
    to_position: SamplePos,
    to_value: Value,
    applied: bool,
}

impl MoveKeyframeCommand {
    pub fn new(
        automation: Arc<Automation>,
        from_position: SamplePos,
        to_position: SamplePos,
        to_value: Value,
    ) -> Self {
        Self {
            automation,
            from_position,
            from_value: None,
            to_position,
            to_value,
            applied: false,
        }
    }
}

impl Command for MoveKeyframeCommand {
    fn execute(&mut self) {
        if self.from_value.is_none() {
            self.from_value = self.automation.keyframe_at(self.from_position);
        }
        self.applied = self.from_value.is_some()
            && self
                .automation
                .move_keyframe_at(self.from_position, self.to_position, self.to_value);
    }

    fn undo(&mut self) {
        if !self.applied {
            return;
        }
        if let Some(from_value) = self.from_value {
            self.automation
                .move_keyframe_at(self.to_position, self.from_position, from_value);
        }
        self.applied = false;
    }

    fn name(&self) -> &str {
        "Move Keyframe"
    }

    /// A move that would cross a neighbor is refused and leaves no step
    fn changed(&self) -> bool {
        self.applied
    }

    fn can_merge(&self, other: &dyn Command) -> bool {
        other
            .as_any()
            .downcast_ref::<MoveKeyframeCommand>()
            .is_some_and(|next| {
                Arc::ptr_eq(&self.automation, &next.automation)
                    && next.from_position == self.to_position
            })
    }

    fn merge(&mut self, other: Box<dyn Command>) {
        // Keep the origin from self, take the destination from other
        if let Some(next) = other.as_any().downcast_ref::<MoveKeyframeCommand>() {
            self.to_position = next.to_position;
            self.to_value = next.to_value;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTOMATION COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Re-add a hidden automation, or hide it again on undo.
///
/// Created by [`add_automation`] after the automation already exists.
pub struct AddAutomationCommand {
    track: Arc<RwLock<TrackAutomations>>,
    id: AutomationId,
    undone: bool,
}

impl AddAutomationCommand {
    pub fn new(track: Arc<RwLock<TrackAutomations>>, id: AutomationId) -> Self {
        Self {
            track,
            id,
            undone: false,
        }
    }
}

impl Command for AddAutomationCommand {
    fn execute(&mut self) {
        self.track.read().restore(self.id);
        self.undone = false;
    }

    fn undo(&mut self) {
        self.track.read().remove(self.id);
        self.undone = true;
    }

    fn name(&self) -> &str {
        "Add Automation"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for AddAutomationCommand {
    fn drop(&mut self) {
        if self.undone {
            dispose_if_removed(&self.track, self.id);
        }
    }
}

/// Delete (hide) an automation
pub struct DeleteAutomationCommand {
    track: Arc<RwLock<TrackAutomations>>,
    id: AutomationId,
    applied: bool,
}

impl DeleteAutomationCommand {
    pub fn new(track: Arc<RwLock<TrackAutomations>>, id: AutomationId) -> Self {
        Self {
            track,
            id,
            applied: false,
        }
    }
}

impl Command for DeleteAutomationCommand {
    fn execute(&mut self) {
        self.applied = self.track.read().remove(self.id);
    }

    fn undo(&mut self) {
        if self.applied {
            self.track.read().restore(self.id);
            self.applied = false;
        }
    }

    fn name(&self) -> &str {
        "Delete Automation"
    }

    fn changed(&self) -> bool {
        self.applied
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for DeleteAutomationCommand {
    fn drop(&mut self) {
        if self.applied {
            dispose_if_removed(&self.track, self.id);
        }
    }
}

/// Final reclamation once no command can bring the automation back
fn dispose_if_removed(track: &RwLock<TrackAutomations>, id: AutomationId) {
    let mut track = track.write();
    let removed = track.get(id).is_some_and(|a| a.is_removed());
    if removed {
        track.dispose(id);
    }
}

/// Add an automation to a track and record the step.
///
/// Capacity errors are returned before anything is recorded.
pub fn add_automation(
    sink: &mut dyn CommandSink,
    track: &Arc<RwLock<TrackAutomations>>,
    label: &str,
    params: AutomationParams,
) -> CfResult<Arc<Automation>> {
    let automation = track.write().add(label, params)?;
    sink.push_command(Box::new(AddAutomationCommand::new(
        Arc::clone(track),
        automation.id(),
    )));
    Ok(automation)
}

// ═══════════════════════════════════════════════════════════════════════════════
// WRITE SESSION
// ═══════════════════════════════════════════════════════════════════════════════

/// A whole recording pass, undone and redone as a snapshot swap
pub struct WriteSessionCommand {
    automation: Arc<Automation>,
    session: WriteSession,
}

impl WriteSessionCommand {
    pub fn new(automation: Arc<Automation>, session: WriteSession) -> Self {
        Self {
            automation,
            session,
        }
    }

    pub fn session(&self) -> &WriteSession {
        &self.session
    }
}

impl Command for WriteSessionCommand {
    fn execute(&mut self) {
        let s = &self.session;
        self.automation.restore_span(s.start, s.end, &s.after);
    }

    fn undo(&mut self) {
        let s = &self.session;
        self.automation.restore_span(s.start, s.end, &s.before);
    }

    fn name(&self) -> &str {
        "Record Automation"
    }

    fn changed(&self) -> bool {
        !self.session.is_noop()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// End the automation's write session and push it as one undo step.
/// Returns false when there was nothing to record.
pub fn finish_recording(sink: &mut dyn CommandSink, automation: &Arc<Automation>) -> bool {
    let Some(session) = automation.end_write() else {
        return false;
    };
    if session.is_noop() {
        log::debug!("{}: write session changed nothing", automation.label());
        return false;
    }
    sink.push_command(Box::new(WriteSessionCommand::new(
        Arc::clone(automation),
        session,
    )));
    true
}
