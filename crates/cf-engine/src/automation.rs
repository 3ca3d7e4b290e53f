//! Automation
//!
//! One curve per automatable parameter:
//! - Keyframe editing from the UI thread
//! - Sequential evaluation from the render thread
//! - Live write-mode recording through the simplifier
//!
//! The curve sits behind a single `RwLock`. Render-thread entry points never
//! allocate or log while holding it, and the `try_*` forms give up after the
//! configured lock budget instead of stalling the audio callback.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cf_core::{CfError, CfResult, Endpoint, SamplePos, Value, ValueKind};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::evaluator::Evaluator;
use crate::keyframe::{CoordinateMapper, InsertOutcome, KeyframeRef, KeyframeStore};
use crate::recorder::{RecordSimplifier, RecordState, WriteSession};
use crate::snapshot::AutomationSnapshot;

// ═══════════════════════════════════════════════════════════════════════════
// IDENTITY / PARAMS
// ═══════════════════════════════════════════════════════════════════════════

/// Automation identifier, unique within a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AutomationId(pub u32);

/// Kind, range and starting value of an automated parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationParams {
    pub kind: ValueKind,
    pub min: Value,
    pub max: Value,
    pub default_value: Value,
}

impl AutomationParams {
    pub fn new(default_value: Value, min: Value, max: Value, kind: ValueKind) -> Self {
        Self {
            kind,
            min,
            max,
            default_value,
        }
    }

    /// Float parameter over the unit range
    pub fn unit(default_value: f32) -> Self {
        Self::new(
            Value::Float(default_value),
            Value::Float(0.0),
            Value::Float(1.0),
            ValueKind::Float,
        )
    }

    /// Parameters taken from a live binding
    pub fn from_endpoint(endpoint: &dyn Endpoint) -> Self {
        Self::new(
            endpoint.default_value(),
            endpoint.min(),
            endpoint.max(),
            endpoint.kind(),
        )
    }

    pub fn validate(&self) -> CfResult<()> {
        for v in [self.min, self.max, self.default_value] {
            if v.kind() != self.kind {
                return Err(CfError::KindMismatch {
                    expected: self.kind,
                    found: v.kind(),
                });
            }
        }
        if !self.min.less_than(self.max) {
            return Err(CfError::InvalidRange(format!(
                "min {} must be below max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// AUTOMATION
// ═══════════════════════════════════════════════════════════════════════════

/// Lock-protected curve state
#[derive(Debug)]
struct Curve {
    store: KeyframeStore,
    recorder: RecordSimplifier,
    /// Full curve captured when a write session starts
    session_before: Vec<(SamplePos, Value)>,
}

/// Per-parameter automation curve
pub struct Automation {
    id: AutomationId,
    label: String,
    params: AutomationParams,
    range: f64,
    curve: RwLock<Curve>,
    reading: AtomicBool,
    writing: AtomicBool,
    removed: AtomicBool,
    endpoint: Option<Arc<dyn Endpoint>>,
    lock_budget: Duration,
    record_reserve: usize,
}

impl Automation {
    /// Bind a standalone automation with default engine settings
    pub fn bind(default_value: Value, min: Value, max: Value, kind: ValueKind) -> CfResult<Self> {
        Self::new(
            AutomationId(0),
            String::new(),
            AutomationParams::new(default_value, min, max, kind),
            &EngineConfig::default(),
        )
    }

    /// Create an automation whose sole keyframe holds the default at position 0
    pub fn new(
        id: AutomationId,
        label: impl Into<String>,
        params: AutomationParams,
        config: &EngineConfig,
    ) -> CfResult<Self> {
        params.validate()?;
        let store = KeyframeStore::new(
            params.kind,
            params.min,
            params.max,
            0,
            params.default_value,
            config.initial_keyframe_capacity,
        );
        Ok(Self::from_store(id, label.into(), params, store, config))
    }

    /// Automation that reads its shape from, and plays back into, `endpoint`
    pub fn for_endpoint(
        id: AutomationId,
        endpoint: Arc<dyn Endpoint>,
        config: &EngineConfig,
    ) -> CfResult<Self> {
        let params = AutomationParams::from_endpoint(endpoint.as_ref());
        let mut automation = Self::new(id, endpoint.name().to_string(), params, config)?;
        automation.endpoint = Some(endpoint);
        Ok(automation)
    }

    /// Rebuild from persisted data
    pub fn from_snapshot(
        id: AutomationId,
        snapshot: &AutomationSnapshot,
        config: &EngineConfig,
    ) -> CfResult<Self> {
        snapshot.validate()?;
        let default_value = snapshot.keyframes[0].1;
        let params = AutomationParams::new(default_value, snapshot.min, snapshot.max, snapshot.kind);
        let store = KeyframeStore::from_pairs(
            snapshot.kind,
            snapshot.min,
            snapshot.max,
            &snapshot.keyframes,
            config.initial_keyframe_capacity,
        )
        .ok_or_else(|| CfError::InvalidSnapshot(format!("{}: no keyframes", snapshot.label)))?;

        let automation = Self::from_store(id, snapshot.label.clone(), params, store, config);
        automation.set_reading(snapshot.read);
        Ok(automation)
    }

    fn from_store(
        id: AutomationId,
        label: String,
        params: AutomationParams,
        store: KeyframeStore,
        config: &EngineConfig,
    ) -> Self {
        log::debug!(
            "Automation {:?} '{}' bound: {} in [{}, {}]",
            id,
            label,
            params.kind,
            params.min,
            params.max
        );
        Self {
            id,
            label,
            range: store.range(),
            params,
            curve: RwLock::new(Curve {
                store,
                recorder: RecordSimplifier::new(config.simplifier),
                session_before: Vec::new(),
            }),
            reading: AtomicBool::new(true),
            writing: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            endpoint: None,
            lock_budget: config.lock_budget(),
            record_reserve: config.simplifier.record_reserve,
        }
    }

    /// Attach a live binding after construction
    pub fn with_endpoint(mut self, endpoint: Arc<dyn Endpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    // ─── accessors ──────────────────────────────────────────────────────────

    pub fn id(&self) -> AutomationId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ValueKind {
        self.params.kind
    }

    pub fn min(&self) -> Value {
        self.params.min
    }

    pub fn max(&self) -> Value {
        self.params.max
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn default_value(&self) -> Value {
        self.params.default_value
    }

    pub fn endpoint(&self) -> Option<&Arc<dyn Endpoint>> {
        self.endpoint.as_ref()
    }

    pub fn is_reading(&self) -> bool {
        self.reading.load(Ordering::Acquire)
    }

    pub fn set_reading(&self, reading: bool) {
        self.reading.store(reading, Ordering::Release);
    }

    pub fn is_writing(&self) -> bool {
        self.writing.load(Ordering::Acquire)
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Toggle the user-facing "deleted" state. Storage is kept until disposal.
    pub fn set_removed(&self, removed: bool) {
        self.removed.store(removed, Ordering::Release);
    }

    pub fn recording_state(&self) -> RecordState {
        self.curve.read().recorder.state()
    }

    pub fn keyframe_count(&self) -> usize {
        self.curve.read().store.len()
    }

    /// Detached copy of all keyframes
    pub fn keyframes(&self) -> Vec<(SamplePos, Value)> {
        self.curve.read().store.export()
    }

    /// Value of the keyframe at exactly `position`
    pub fn keyframe_at(&self, position: SamplePos) -> Option<Value> {
        let curve = self.curve.read();
        let index = curve.store.index_of(position)?;
        curve.store.get(index).map(|k| k.value)
    }

    /// Current position and value behind a handle
    pub fn resolve(&self, handle: &KeyframeRef) -> Option<(SamplePos, Value)> {
        let curve = self.curve.read();
        let index = curve.store.resolve(handle)?;
        curve.store.get(index).map(|k| (k.position, k.value))
    }

    /// Run `f` against the keyframe store under the read lock
    pub fn with_store<R>(&self, f: impl FnOnce(&KeyframeStore) -> R) -> R {
        f(&self.curve.read().store)
    }

    // ─── editing (UI thread) ────────────────────────────────────────────────

    /// Insert a keyframe, or update the one already at `position`
    pub fn insert_keyframe(&self, position: SamplePos, value: Value) -> KeyframeRef {
        let mut curve = self.curve.write();
        let outcome = curve.store.insert_at(position, value);
        if let InsertOutcome::Moved(index) = outcome {
            log::debug!("{}: keyframe at {} updated in place (index {})", self.label, position, index);
        }
        let index = outcome.index();
        KeyframeRef {
            index,
            position,
            generation: curve.store.generation(),
        }
    }

    /// Remove the keyframe behind `handle`. Returns what was removed, or
    /// `None` if the handle is stale or the keyframe is the last one left.
    pub fn remove_keyframe(&self, handle: &KeyframeRef) -> Option<(SamplePos, Value)> {
        let mut curve = self.curve.write();
        let Some(index) = curve.store.resolve(handle) else {
            log::debug!("{}: no keyframe at {} to remove", self.label, handle.position);
            return None;
        };
        let removed = curve.store.get(index).map(|k| (k.position, k.value))?;
        if !curve.store.remove(index) {
            log::debug!("{}: refusing to remove the last keyframe", self.label);
            return None;
        }
        Some(removed)
    }

    /// Move the keyframe behind `handle`. Returns the updated handle, or
    /// `None` if the handle is stale or the move would cross a neighbor.
    pub fn move_keyframe(
        &self,
        handle: &KeyframeRef,
        position: SamplePos,
        value: Value,
    ) -> Option<KeyframeRef> {
        let mut curve = self.curve.write();
        let index = curve.store.resolve(handle)?;
        if !curve.store.move_to(index, position, value) {
            log::debug!(
                "{}: move of keyframe {} to {} rejected",
                self.label,
                handle.position,
                position
            );
            return None;
        }
        curve.store.handle(index)
    }

    /// Remove the keyframe at exactly `position`, returning its value
    pub fn remove_keyframe_at(&self, position: SamplePos) -> Option<Value> {
        let mut curve = self.curve.write();
        let index = curve.store.index_of(position)?;
        let value = curve.store.get(index).map(|k| k.value)?;
        curve.store.remove(index).then_some(value)
    }

    /// Move the keyframe at exactly `from`
    pub fn move_keyframe_at(&self, from: SamplePos, to: SamplePos, value: Value) -> bool {
        let mut curve = self.curve.write();
        let Some(index) = curve.store.index_of(from) else {
            return false;
        };
        curve.store.move_to(index, to, value)
    }

    /// Replace the keyframes in `[start, end]` with a detached copy
    pub fn restore_span(&self, start: SamplePos, end: SamplePos, keyframes: &[(SamplePos, Value)]) {
        let mut curve = self.curve.write();
        curve.store.replace_span(start, end, keyframes);
        log::debug!(
            "{}: restored span [{}, {}] with {} keyframes",
            self.label,
            start,
            end,
            keyframes.len()
        );
    }

    /// Refresh display X of every keyframe
    pub fn refresh_draw_x(&self, mapper: &dyn CoordinateMapper) {
        self.curve.write().store.refresh_draw_x(mapper);
    }

    // ─── evaluation (render thread) ─────────────────────────────────────────

    /// Value at an integer position
    #[inline]
    pub fn value_at(&self, position: SamplePos) -> Value {
        self.value_at_fractional(position as f64)
    }

    /// Value at a fractional position
    pub fn value_at_fractional(&self, position: f64) -> Value {
        let curve = self.curve.read();
        Evaluator::new(&curve.store).value_at(position)
    }

    /// Like [`value_at`](Self::value_at), giving up after the lock budget
    pub fn try_value_at(&self, position: SamplePos) -> CfResult<Value> {
        let curve = self
            .curve
            .try_read_for(self.lock_budget)
            .ok_or(CfError::LockContention)?;
        Ok(Evaluator::new(&curve.store).value_at(position as f64))
    }

    /// Fill `dest` with values at `start + i * step`
    pub fn fill_range(&self, dest: &mut [Value], start: f64, step: f64) {
        let curve = self.curve.read();
        Evaluator::new(&curve.store).fill(dest, start, step);
    }

    /// Like [`fill_range`](Self::fill_range), giving up after the lock budget
    pub fn try_fill_range(&self, dest: &mut [Value], start: f64, step: f64) -> CfResult<()> {
        let curve = self
            .curve
            .try_read_for(self.lock_budget)
            .ok_or(CfError::LockContention)?;
        Evaluator::new(&curve.store).fill(dest, start, step);
        Ok(())
    }

    /// Fill a plain `f32` buffer, e.g. a per-sample gain lane
    pub fn fill_range_f32(&self, dest: &mut [f32], start: f64, step: f64) -> CfResult<()> {
        let curve = self
            .curve
            .try_read_for(self.lock_budget)
            .ok_or(CfError::LockContention)?;
        Evaluator::new(&curve.store).fill_f32(dest, start, step);
        Ok(())
    }

    /// Push the curve value at `position` into the bound endpoint.
    ///
    /// Returns the applied value, or `None` when playback is not reading this
    /// curve (not reading, recording, removed, or unbound).
    pub fn apply(&self, position: SamplePos) -> CfResult<Option<Value>> {
        if !self.is_reading() || self.is_writing() || self.is_removed() {
            return Ok(None);
        }
        let Some(endpoint) = &self.endpoint else {
            return Ok(None);
        };
        let value = self.try_value_at(position)?;
        endpoint.write(value);
        Ok(Some(value))
    }

    // ─── recording ──────────────────────────────────────────────────────────

    /// Enter write mode. Returns false if a session is already running.
    pub fn begin_write(&self) -> bool {
        let mut curve = self.curve.write();
        if self.writing.load(Ordering::Acquire) {
            return false;
        }
        let curve = &mut *curve;
        curve.session_before = curve.store.export();
        curve.store.reserve(self.record_reserve);
        curve.recorder.begin(&curve.store);
        self.writing.store(true, Ordering::Release);
        log::info!(
            "{}: write session started over {} keyframes",
            self.label,
            curve.session_before.len()
        );
        true
    }

    /// Feed one recorded sample
    pub fn ingest_write_sample(&self, position: SamplePos, value: Value) -> CfResult<()> {
        self.ingest_write_chunk(position, position + 1, value)
    }

    /// Feed one recorded sample belonging to a render chunk ending at
    /// `chunk_end` (exclusive). A no-op outside write mode.
    pub fn ingest_write_chunk(
        &self,
        position: SamplePos,
        chunk_end: SamplePos,
        value: Value,
    ) -> CfResult<()> {
        if !self.is_writing() {
            return Ok(());
        }
        let mut curve = self
            .curve
            .try_write_for(self.lock_budget)
            .ok_or(CfError::LockContention)?;
        let curve = &mut *curve;
        curve.recorder.ingest(&mut curve.store, position, chunk_end, value);
        Ok(())
    }

    /// Leave write mode. Returns the replaced span with before/after copies,
    /// or `None` if no session was running or no sample arrived.
    pub fn end_write(&self) -> Option<WriteSession> {
        let mut curve = self.curve.write();
        if !self.writing.swap(false, Ordering::AcqRel) {
            return None;
        }
        let curve = &mut *curve;
        let before_all = std::mem::take(&mut curve.session_before);
        let Some((start, end)) = curve.recorder.finish(&mut curve.store) else {
            log::info!("{}: write session ended without samples", self.label);
            return None;
        };

        let before = before_all
            .into_iter()
            .filter(|(p, _)| (start..=end).contains(p))
            .collect();
        let after = curve.store.export_span(start, end);
        log::info!(
            "{}: write session recorded [{}, {}] -> {} keyframes",
            self.label,
            start,
            end,
            after.len()
        );
        Some(WriteSession {
            start,
            end,
            before,
            after,
        })
    }

    // ─── persistence ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> AutomationSnapshot {
        AutomationSnapshot {
            label: self.label.clone(),
            kind: self.params.kind,
            min: self.params.min,
            max: self.params.max,
            range: self.range,
            read: self.is_reading(),
            keyframes: self.keyframes(),
        }
    }
}

impl std::fmt::Debug for Automation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Automation")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.params.kind)
            .field("reading", &self.is_reading())
            .field("writing", &self.is_writing())
            .field("removed", &self.is_removed())
            .finish()
    }
}
