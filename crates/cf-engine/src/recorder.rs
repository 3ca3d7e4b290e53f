//! Live automation recording
//!
//! Turns a causal stream of parameter samples into a sparse piecewise-linear
//! curve. No look-ahead is available: every decision is taken against the
//! last committed keyframes and the previous ("ghost") sample.
//!
//! While the stream runs straight, the most recent keyframe is dragged along
//! with it. When the direction shifts, the ghost and the current sample are
//! committed as vertices. Slow drift in either state is caught by a
//! cumulative deviation budget.

use cf_core::{SamplePos, Value, ValueKind};
use serde::{Deserialize, Serialize};

use crate::keyframe::KeyframeStore;

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG / STATE
// ═══════════════════════════════════════════════════════════════════════════

/// Simplifier tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifierConfig {
    /// Normalized sample-to-sample change treated as "no change"
    pub change_epsilon: f64,
    /// Cumulative normalized deviation before a new keyframe is committed
    pub commit_threshold: f64,
    /// Keyframe slots reserved when a write session starts
    pub record_reserve: usize,
}

impl Default for SimplifierConfig {
    fn default() -> Self {
        Self {
            change_epsilon: 1e-15,
            commit_threshold: 1e-2,
            record_reserve: 256,
        }
    }
}

/// Recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordState {
    #[default]
    Idle,
    TrackingStraight,
    TrackingChanging,
}

/// Detached before/after copies of the span a write session replaced
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSession {
    pub start: SamplePos,
    pub end: SamplePos,
    pub before: Vec<(SamplePos, Value)>,
    pub after: Vec<(SamplePos, Value)>,
}

impl WriteSession {
    /// Whether the session left the span unchanged
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SIMPLIFIER
// ═══════════════════════════════════════════════════════════════════════════

/// Online curve simplifier
#[derive(Debug, Clone)]
pub struct RecordSimplifier {
    config: SimplifierConfig,
    active: bool,
    changing: bool,
    ghost_value: Value,
    ghost_position: SamplePos,
    ghost_valid: bool,
    cumulative_slope_deviation: f64,
    range: f64,
    /// Most recent committed keyframe and the one before it
    last_commit: Option<(SamplePos, Value)>,
    prev_commit: Option<(SamplePos, Value)>,
    recorded_from: SamplePos,
    recorded_until: SamplePos,
    /// Exclusive end of the region already cleared ahead of the stream
    cleared_until: SamplePos,
}

impl RecordSimplifier {
    pub fn new(config: SimplifierConfig) -> Self {
        Self {
            config,
            active: false,
            changing: false,
            ghost_value: Value::Double(0.0),
            ghost_position: 0,
            ghost_valid: false,
            cumulative_slope_deviation: 0.0,
            range: 1.0,
            last_commit: None,
            prev_commit: None,
            recorded_from: 0,
            recorded_until: 0,
            cleared_until: 0,
        }
    }

    pub fn config(&self) -> &SimplifierConfig {
        &self.config
    }

    pub fn state(&self) -> RecordState {
        match (self.active, self.changing) {
            (false, _) => RecordState::Idle,
            (true, false) => RecordState::TrackingStraight,
            (true, true) => RecordState::TrackingChanging,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether a sample arrived since `begin`
    pub fn has_samples(&self) -> bool {
        self.ghost_valid
    }

    /// Arm for a new session over `store`
    pub fn begin(&mut self, store: &KeyframeStore) {
        self.active = true;
        self.changing = false;
        self.ghost_value = Value::zero(store.kind());
        self.ghost_position = 0;
        self.ghost_valid = false;
        self.cumulative_slope_deviation = 0.0;
        self.range = if store.range() > 0.0 { store.range() } else { 1.0 };
        self.last_commit = None;
        self.prev_commit = None;
    }

    /// Feed one sample. `chunk_end` is the exclusive end of the render chunk
    /// the sample belongs to; existing keyframes up to it are overwritten.
    pub fn ingest(
        &mut self,
        store: &mut KeyframeStore,
        position: SamplePos,
        chunk_end: SamplePos,
        value: Value,
    ) {
        if !self.active {
            return;
        }
        if self.ghost_valid && position <= self.ghost_position {
            return;
        }
        let value = value.cast(store.kind()).clamp(store.min(), store.max());

        if !self.ghost_valid {
            self.start_run(store, position, chunk_end, value);
            self.set_ghost(position, value);
            return;
        }

        self.clear_ahead(store, chunk_end);

        let ghost_deviation = self.ghost_value.delta_to(value).as_f64().abs() / self.range;
        if ghost_deviation > self.config.change_epsilon {
            if self.changing {
                self.track_curvature(store, position, value);
            } else {
                self.commit(store, self.ghost_position, self.ghost_value);
                self.commit(store, position, value);
                self.changing = true;
                self.cumulative_slope_deviation = 0.0;
            }
        } else if self.changing {
            self.commit(store, position, value);
            self.changing = false;
            self.cumulative_slope_deviation = 0.0;
        } else {
            self.extend_line(store, position, value);
        }

        self.set_ghost(position, value);
    }

    /// Stop recording. Commits the pending ghost sample and returns the
    /// inclusive span of the curve the session touched.
    pub fn finish(&mut self, store: &mut KeyframeStore) -> Option<(SamplePos, SamplePos)> {
        if !self.active {
            return None;
        }
        self.active = false;
        self.changing = false;
        if !self.ghost_valid {
            return None;
        }

        self.commit(store, self.ghost_position, self.ghost_value);
        self.ghost_valid = false;
        let end = self.recorded_until.max(self.cleared_until - 1);
        Some((self.recorded_from, end))
    }

    // ─── steps ──────────────────────────────────────────────────────────────

    /// First sample: two keyframes one frame apart, then clear the chunk
    fn start_run(
        &mut self,
        store: &mut KeyframeStore,
        position: SamplePos,
        chunk_end: SamplePos,
        value: Value,
    ) {
        self.recorded_from = position;
        self.recorded_until = position;
        self.commit(store, position, value);
        self.commit(store, position + 1, value);

        let end = chunk_end.max(position + 2);
        store.remove_positions(position + 2, end);
        self.cleared_until = end;
        self.changing = false;
        self.cumulative_slope_deviation = 0.0;
    }

    /// Drop pre-existing keyframes ahead of the stream, never touching
    /// anything recorded in this session
    fn clear_ahead(&mut self, store: &mut KeyframeStore, chunk_end: SamplePos) {
        if chunk_end <= self.cleared_until {
            return;
        }
        let from = self.cleared_until.max(self.recorded_until + 1);
        store.remove_positions(from, chunk_end);
        self.cleared_until = chunk_end;
    }

    /// Straight run: drag the last keyframe along while the slope it implies
    /// stays close to the committed one
    fn extend_line(&mut self, store: &mut KeyframeStore, position: SamplePos, value: Value) {
        let (Some(prev), Some(last)) = (self.prev_commit, self.last_commit) else {
            self.commit(store, position, value);
            return;
        };

        let committed = slope_between(prev, last);
        let candidate = slope_between(prev, (position, value));
        let span = (position - prev.0) as f64;
        self.cumulative_slope_deviation += (committed - candidate).abs() * span / self.range;

        if self.cumulative_slope_deviation > self.config.commit_threshold {
            self.commit(store, position, value);
            self.cumulative_slope_deviation = 0.0;
            return;
        }

        let moved = store
            .index_of(last.0)
            .is_some_and(|index| store.move_to(index, position, value));
        if moved {
            self.last_commit = Some((position, value));
            self.recorded_until = self.recorded_until.max(position);
        } else {
            self.commit(store, position, value);
        }
    }

    /// Changing run: measure how far the stream bends away from the line
    /// through the last vertex and the ghost
    fn track_curvature(&mut self, store: &mut KeyframeStore, position: SamplePos, value: Value) {
        let Some(anchor) = self.last_commit else {
            self.commit(store, position, value);
            return;
        };
        let dx = (self.ghost_position - anchor.0) as f64;
        if dx <= 0.0 {
            return;
        }

        let (a, g, v) = (anchor.1.as_f64(), self.ghost_value.as_f64(), value.as_f64());
        let predicted = a + (g - a) / dx * (position - anchor.0) as f64;
        let magnitude = a.abs().max(g.abs()).max(v.abs());
        let gap = (predicted - v).abs() - rounding_noise(value.kind(), magnitude);
        if gap > 0.0 {
            self.cumulative_slope_deviation += gap / self.range;
        }

        if self.cumulative_slope_deviation > self.config.commit_threshold {
            self.commit(store, self.ghost_position, self.ghost_value);
            self.cumulative_slope_deviation = 0.0;
        }
    }

    fn commit(&mut self, store: &mut KeyframeStore, position: SamplePos, value: Value) {
        store.insert_at(position, value);
        match self.last_commit {
            Some((p, _)) if p == position => {}
            last => self.prev_commit = last,
        }
        self.last_commit = Some((position, value));
        self.recorded_until = self.recorded_until.max(position);
    }

    fn set_ghost(&mut self, position: SamplePos, value: Value) {
        self.ghost_position = position;
        self.ghost_value = value;
        self.ghost_valid = true;
    }
}

/// Worst rounding error a straight line through three stored samples of
/// `kind` can show at `magnitude`
fn rounding_noise(kind: ValueKind, magnitude: f64) -> f64 {
    match kind {
        ValueKind::Float => 4.0 * f64::from(f32::EPSILON) * magnitude,
        ValueKind::Double => 4.0 * f64::EPSILON * magnitude,
        ValueKind::Int16 | ValueKind::Int32 | ValueKind::Uint16 => 1.0,
        ValueKind::Bool => 0.0,
    }
}

fn slope_between(a: (SamplePos, Value), b: (SamplePos, Value)) -> f64 {
    let dx = (b.0 - a.0) as f64;
    if dx == 0.0 {
        0.0
    } else {
        (b.1.as_f64() - a.1.as_f64()) / dx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KeyframeStore {
        KeyframeStore::new(
            ValueKind::Double,
            Value::Double(0.0),
            Value::Double(1.0),
            0,
            Value::Double(0.5),
            4,
        )
    }

    #[test]
    fn test_idle_ignores_samples() {
        let mut store = store();
        let mut rec = RecordSimplifier::new(SimplifierConfig::default());
        rec.ingest(&mut store, 10, 11, Value::Double(0.9));
        assert_eq!(store.len(), 1);
        assert_eq!(rec.state(), RecordState::Idle);
        assert!(rec.finish(&mut store).is_none());
    }

    #[test]
    fn test_first_sample_commits_pair() {
        let mut store = store();
        let mut rec = RecordSimplifier::new(SimplifierConfig::default());
        rec.begin(&store);
        rec.ingest(&mut store, 100, 101, Value::Double(0.25));
        let kf: Vec<_> = store.iter().map(|k| (k.position, k.value)).collect();
        assert_eq!(
            kf,
            vec![
                (0, Value::Double(0.5)),
                (100, Value::Double(0.25)),
                (101, Value::Double(0.25)),
            ]
        );
        assert_eq!(rec.state(), RecordState::TrackingStraight);
    }

    #[test]
    fn test_flat_input_extends_one_keyframe() {
        let mut store = store();
        let mut rec = RecordSimplifier::new(SimplifierConfig::default());
        rec.begin(&store);
        for p in 100..5000 {
            rec.ingest(&mut store, p, p + 1, Value::Double(0.25));
        }
        let span = rec.finish(&mut store);
        assert_eq!(span, Some((100, 4999)));
        assert_eq!(store.len(), 3);
        assert_eq!(store.last().position, 4999);
    }

    #[test]
    fn test_long_float_ramp_stays_sparse() {
        let mut store = KeyframeStore::new(
            ValueKind::Float,
            Value::Float(0.0),
            Value::Float(1.0),
            0,
            Value::Float(0.0),
            4,
        );
        let mut rec = RecordSimplifier::new(SimplifierConfig::default());
        rec.begin(&store);

        let n = 1_000_000i64;
        for p in 0..n {
            let x = p as f64 / (n - 1) as f64;
            rec.ingest(&mut store, p, p + 1, Value::Float(x as f32));
        }
        assert_eq!(rec.finish(&mut store), Some((0, n - 1)));
        assert!(store.len() <= 4, "{} keyframes", store.len());
        assert_eq!(store.last().value, Value::Float(1.0));
    }

    #[test]
    fn test_nan_samples_record_as_min() {
        let mut store = store();
        let mut rec = RecordSimplifier::new(SimplifierConfig::default());
        rec.begin(&store);
        rec.ingest(&mut store, 10, 11, Value::Double(0.6));
        rec.ingest(&mut store, 11, 12, Value::Double(f64::NAN));
        rec.ingest(&mut store, 12, 13, Value::Double(0.6));
        rec.finish(&mut store);
        assert!(store.iter().all(|k| !k.value.is_nan()));
        let at_nan = store.index_of(11).and_then(|i| store.get(i)).map(|k| k.value);
        assert_eq!(at_nan, Some(Value::Double(0.0)));
    }

    #[test]
    fn test_step_enters_changing_then_settles() {
        let mut store = store();
        let mut rec = RecordSimplifier::new(SimplifierConfig::default());
        rec.begin(&store);
        rec.ingest(&mut store, 0, 1, Value::Double(0.0));
        rec.ingest(&mut store, 1, 2, Value::Double(0.0));
        rec.ingest(&mut store, 2, 3, Value::Double(1.0));
        assert_eq!(rec.state(), RecordState::TrackingChanging);
        rec.ingest(&mut store, 3, 4, Value::Double(1.0));
        assert_eq!(rec.state(), RecordState::TrackingStraight);
    }

    #[test]
    fn test_non_increasing_positions_ignored() {
        let mut store = store();
        let mut rec = RecordSimplifier::new(SimplifierConfig::default());
        rec.begin(&store);
        rec.ingest(&mut store, 50, 51, Value::Double(0.1));
        rec.ingest(&mut store, 50, 51, Value::Double(0.9));
        rec.ingest(&mut store, 20, 21, Value::Double(0.9));
        assert!(store.iter().all(|k| k.position == 0 || k.value == Value::Double(0.1)));
    }

    #[test]
    fn test_overwrites_future_keyframes() {
        let mut store = store();
        store.insert_at(300, Value::Double(1.0));
        store.insert_at(600, Value::Double(0.0));
        store.insert_at(2000, Value::Double(0.7));

        let mut rec = RecordSimplifier::new(SimplifierConfig::default());
        rec.begin(&store);
        for p in 100..1000 {
            rec.ingest(&mut store, p, p + 1, Value::Double(0.4));
        }
        rec.finish(&mut store);

        assert!(store.index_of(300).is_none());
        assert!(store.index_of(600).is_none());
        assert!(store.index_of(2000).is_some());
    }

    #[test]
    fn test_chunk_clear_spans_whole_chunk() {
        let mut store = store();
        store.insert_at(120, Value::Double(1.0));
        let mut rec = RecordSimplifier::new(SimplifierConfig::default());
        rec.begin(&store);
        rec.ingest(&mut store, 100, 256, Value::Double(0.3));
        assert!(store.index_of(120).is_none());
    }
}
