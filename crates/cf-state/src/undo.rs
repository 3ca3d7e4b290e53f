//! Edit history for automation commands
//!
//! Commands arrive either already applied (a finished recording pass pushed
//! through [`CommandSink`]) or are run by [`UndoManager::execute`]. A command
//! that reports no change never becomes an undo step, and a dropped command
//! reclaims whatever it kept alive for a possible undo.

use std::any::Any;

/// Reversible edit.
///
/// Dropping a command is its dispose step: a command that owns the last
/// reference to hidden state reclaims it in `Drop`.
pub trait Command: Send + Sync {
    /// Apply, or re-apply after an undo
    fn execute(&mut self);

    fn undo(&mut self);

    /// Label shown in the edit menu
    fn name(&self) -> &str;

    /// Whether the last `execute` changed the curve or track
    fn changed(&self) -> bool {
        true
    }

    /// Whether `next`, recorded right after this command, folds into it
    fn can_merge(&self, _next: &dyn Command) -> bool {
        false
    }

    fn merge(&mut self, _next: Box<dyn Command>) {}

    fn as_any(&self) -> &dyn Any;
}

/// Reversible-command bus.
///
/// Receives commands whose effect has already been applied.
pub trait CommandSink {
    fn push_command(&mut self, command: Box<dyn Command>);
}

/// Steps collected while a group is open. Nested groups fold into the
/// outermost one.
struct OpenGroup {
    name: String,
    depth: usize,
    steps: Vec<Box<dyn Command>>,
}

/// Linear undo/redo history with a step limit
pub struct UndoManager {
    done: Vec<Box<dyn Command>>,
    undone: Vec<Box<dyn Command>>,
    limit: usize,
    group: Option<OpenGroup>,
}

impl UndoManager {
    pub fn new(limit: usize) -> Self {
        Self {
            done: Vec::new(),
            undone: Vec::new(),
            limit: limit.max(1),
            group: None,
        }
    }

    /// Run `command` and record it
    pub fn execute(&mut self, mut command: Box<dyn Command>) {
        command.execute();
        self.push_command(command);
    }

    pub fn undo(&mut self) -> bool {
        let Some(mut step) = self.done.pop() else {
            return false;
        };
        log::debug!("undo '{}'", step.name());
        step.undo();
        self.undone.push(step);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(mut step) = self.undone.pop() else {
            return false;
        };
        log::debug!("redo '{}'", step.name());
        step.execute();
        self.done.push(step);
        true
    }

    /// Open a group; everything recorded until the matching
    /// [`end_group`](Self::end_group) undoes as one step named `name`
    pub fn begin_group(&mut self, name: &str) {
        match &mut self.group {
            Some(group) => group.depth += 1,
            None => {
                self.group = Some(OpenGroup {
                    name: name.to_string(),
                    depth: 1,
                    steps: Vec::new(),
                })
            }
        }
    }

    pub fn end_group(&mut self) {
        let Some(group) = self.group.as_mut() else {
            return;
        };
        group.depth -= 1;
        if group.depth > 0 {
            return;
        }
        if let Some(group) = self.group.take()
            && !group.steps.is_empty()
        {
            self.commit(Box::new(StepGroup {
                name: group.name,
                steps: group.steps,
            }));
        }
    }

    pub fn undo_name(&self) -> Option<&str> {
        self.done.last().map(|step| step.name())
    }

    pub fn redo_name(&self) -> Option<&str> {
        self.undone.last().map(|step| step.name())
    }

    pub fn undo_count(&self) -> usize {
        self.done.len()
    }

    pub fn redo_count(&self) -> usize {
        self.undone.len()
    }

    /// Forget all history. Dropped commands run their dispose step.
    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
        self.group = None;
    }

    fn commit(&mut self, step: Box<dyn Command>) {
        if let Some(last) = self.done.last_mut()
            && last.can_merge(step.as_ref())
        {
            last.merge(step);
            return;
        }
        self.done.push(step);
        if self.done.len() > self.limit {
            let excess = self.done.len() - self.limit;
            self.done.drain(..excess);
        }
    }
}

impl CommandSink for UndoManager {
    fn push_command(&mut self, command: Box<dyn Command>) {
        if !command.changed() {
            log::debug!("'{}' changed nothing; not recorded", command.name());
            return;
        }

        // Undone steps can no longer be redone once a new edit lands
        self.undone.clear();

        match &mut self.group {
            Some(group) => group.steps.push(command),
            None => self.commit(command),
        }
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Closed group, replayed in order and undone in reverse
struct StepGroup {
    name: String,
    steps: Vec<Box<dyn Command>>,
}

impl Command for StepGroup {
    fn execute(&mut self) {
        self.steps.iter_mut().for_each(|step| step.execute());
    }

    fn undo(&mut self) {
        self.steps.iter_mut().rev().for_each(|step| step.undo());
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
