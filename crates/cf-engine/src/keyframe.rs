//! Keyframe storage
//!
//! Ordered, never-empty sequence of (position, value) anchors with cached
//! forward slopes. Keyframes live in one contiguous arena addressed by index;
//! nothing outside the store holds an address into it, so growing the arena
//! needs no fix-ups. External holders keep a [`KeyframeRef`] and re-resolve it.

use std::sync::atomic::{AtomicUsize, Ordering};

use cf_core::{SamplePos, Value, ValueKind};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════
// KEYFRAME
// ═══════════════════════════════════════════════════════════════════════════

/// Forward delta from a keyframe to its successor.
///
/// `dy` is held in the kind's delta kind so that narrow and unsigned
/// differences never wrap. The last keyframe carries a flat slope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slope {
    pub dx: i64,
    pub dy: Value,
}

impl Slope {
    pub fn flat(kind: ValueKind) -> Self {
        Self {
            dx: 0,
            dy: Value::zero(kind.delta_kind()),
        }
    }

    #[inline]
    pub fn is_flat(&self) -> bool {
        self.dx == 0
    }
}

/// Single anchor point on a curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub position: SamplePos,
    pub value: Value,
    pub slope: Slope,
    /// Value normalized into [0, 1] against the automation range
    pub display_prop: f64,
    /// Display X, filled by a [`CoordinateMapper`]
    pub draw_x: f32,
}

/// Result of [`KeyframeStore::insert_at`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(usize),
    /// A keyframe already sat at the position; its value was replaced
    Moved(usize),
}

impl InsertOutcome {
    pub fn index(self) -> usize {
        match self {
            Self::Inserted(i) | Self::Moved(i) => i,
        }
    }
}

/// Re-resolvable keyframe handle.
///
/// The cached index is trusted only while the store's generation is
/// unchanged; otherwise the handle is looked up again by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyframeRef {
    pub index: usize,
    pub position: SamplePos,
    pub generation: u64,
}

/// Timeline position to display X mapping
pub trait CoordinateMapper {
    fn position_to_x(&self, position: SamplePos) -> f32;
}

// ═══════════════════════════════════════════════════════════════════════════
// KEYFRAME STORE
// ═══════════════════════════════════════════════════════════════════════════

/// Ordered keyframe arena
#[derive(Debug)]
pub struct KeyframeStore {
    kind: ValueKind,
    min: Value,
    max: Value,
    range: f64,
    keyframes: Vec<Keyframe>,
    /// Last resolved evaluation index. A hint only; always kept in bounds.
    cursor: AtomicUsize,
    generation: u64,
}

impl KeyframeStore {
    /// Create a store holding a single keyframe
    pub fn new(
        kind: ValueKind,
        min: Value,
        max: Value,
        position: SamplePos,
        initial: Value,
        capacity: usize,
    ) -> Self {
        let mut store = Self {
            kind,
            min,
            max,
            range: max.as_f64() - min.as_f64(),
            keyframes: Vec::with_capacity(capacity.max(1)),
            cursor: AtomicUsize::new(0),
            generation: 0,
        };
        let value = store.normalize_value(initial);
        let display_prop = store.display_prop(value);
        store.keyframes.push(Keyframe {
            position,
            value,
            slope: Slope::flat(kind),
            display_prop,
            draw_x: 0.0,
        });
        store
    }

    /// Rebuild a store from detached pairs. Returns `None` for an empty list.
    /// Pairs are inserted one by one, so unordered input is sorted and
    /// duplicate positions collapse to the last value.
    pub fn from_pairs(
        kind: ValueKind,
        min: Value,
        max: Value,
        pairs: &[(SamplePos, Value)],
        capacity: usize,
    ) -> Option<Self> {
        let (&(position, value), rest) = pairs.split_first()?;
        let mut store = Self::new(kind, min, max, position, value, capacity.max(pairs.len()));
        for &(position, value) in rest {
            store.insert_at(position, value);
        }
        Some(store)
    }

    // ─── accessors ──────────────────────────────────────────────────────────

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn min(&self) -> Value {
        self.min
    }

    pub fn max(&self) -> Value {
        self.max
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Never true for a constructed store
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.keyframes.capacity()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Keyframe> {
        self.keyframes.get(index)
    }

    #[inline]
    pub fn as_slice(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyframe> {
        self.keyframes.iter()
    }

    #[inline]
    pub fn first(&self) -> &Keyframe {
        &self.keyframes[0]
    }

    #[inline]
    pub fn last(&self) -> &Keyframe {
        &self.keyframes[self.keyframes.len() - 1]
    }

    #[inline]
    pub(crate) fn cursor_hint(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_cursor_hint(&self, index: usize) {
        self.cursor.store(index, Ordering::Relaxed);
    }

    // ─── lookup ─────────────────────────────────────────────────────────────

    /// Index of the keyframe at exactly `position`
    pub fn index_of(&self, position: SamplePos) -> Option<usize> {
        self.keyframes
            .binary_search_by_key(&position, |k| k.position)
            .ok()
    }

    /// Index of the latest keyframe at or before `position`
    pub fn index_at_or_before(&self, position: f64) -> Option<usize> {
        let n = self
            .keyframes
            .partition_point(|k| (k.position as f64) <= position);
        n.checked_sub(1)
    }

    /// Handle for the keyframe at `index`
    pub fn handle(&self, index: usize) -> Option<KeyframeRef> {
        self.keyframes.get(index).map(|k| KeyframeRef {
            index,
            position: k.position,
            generation: self.generation,
        })
    }

    /// Current index of a handle's keyframe, if it still exists
    pub fn resolve(&self, handle: &KeyframeRef) -> Option<usize> {
        if handle.generation == self.generation
            && let Some(k) = self.keyframes.get(handle.index)
            && k.position == handle.position
        {
            return Some(handle.index);
        }
        self.index_of(handle.position)
    }

    /// Detached copy of the whole curve
    pub fn export(&self) -> Vec<(SamplePos, Value)> {
        self.keyframes.iter().map(|k| (k.position, k.value)).collect()
    }

    /// Detached copy of keyframes with positions in `[start, end]`
    pub fn export_span(&self, start: SamplePos, end: SamplePos) -> Vec<(SamplePos, Value)> {
        let (lo, hi) = self.span_indices(start, end);
        self.keyframes[lo..hi]
            .iter()
            .map(|k| (k.position, k.value))
            .collect()
    }

    // ─── mutation ───────────────────────────────────────────────────────────

    /// Insert a keyframe, or replace the value of one already at `position`
    pub fn insert_at(&mut self, position: SamplePos, value: Value) -> InsertOutcome {
        let value = self.normalize_value(value);
        let display_prop = self.display_prop(value);
        let index = self.keyframes.partition_point(|k| k.position < position);

        if index < self.keyframes.len() && self.keyframes[index].position == position {
            self.keyframes[index].value = value;
            self.keyframes[index].display_prop = display_prop;
            self.update_neighborhood(index);
            self.check_invariants();
            return InsertOutcome::Moved(index);
        }

        let keyframe = Keyframe {
            position,
            value,
            slope: Slope::flat(self.kind),
            display_prop,
            draw_x: 0.0,
        };
        self.ensure_slot();
        self.keyframes.insert(index, keyframe);
        self.update_neighborhood(index);

        // Keep the cursor on the same keyframe it referenced before the shift
        let cursor = self.cursor_hint();
        if cursor >= index && cursor + 1 < self.keyframes.len() {
            self.set_cursor_hint(cursor + 1);
        }
        self.generation += 1;
        self.check_invariants();
        InsertOutcome::Inserted(index)
    }

    /// Remove one keyframe. The sole remaining keyframe is never removed.
    pub fn remove(&mut self, index: usize) -> bool {
        if self.keyframes.len() <= 1 || index >= self.keyframes.len() {
            return false;
        }
        self.keyframes.remove(index);
        if index > 0 {
            self.update_slope(index - 1);
        }
        self.rebase_cursor_after_removal(index, 1);
        self.generation += 1;
        self.check_invariants();
        true
    }

    /// Remove keyframes in `[start, end)`, clamped so that at least one keyframe
    /// survives. Returns the number removed.
    pub fn remove_range(&mut self, start: usize, end: usize) -> usize {
        let len = self.keyframes.len();
        let end = end.min(len);
        let mut start = start.min(end);
        if end - start >= len {
            start = 1;
        }
        if start >= end {
            return 0;
        }

        self.keyframes.drain(start..end);
        if start > 0 {
            self.update_slope(start - 1);
        }
        self.rebase_cursor_after_removal(start, end - start);
        self.generation += 1;
        self.check_invariants();
        end - start
    }

    /// Remove keyframes whose position lies in `[start, end)`
    pub fn remove_positions(&mut self, start: SamplePos, end: SamplePos) -> usize {
        if end <= start {
            return 0;
        }
        let lo = self.keyframes.partition_point(|k| k.position < start);
        let hi = self.keyframes.partition_point(|k| k.position < end);
        self.remove_range(lo, hi)
    }

    /// Move a keyframe. Rejected if the new position would reach or cross a
    /// neighbor.
    pub fn move_to(&mut self, index: usize, position: SamplePos, value: Value) -> bool {
        let len = self.keyframes.len();
        if index >= len {
            return false;
        }
        if index > 0 && self.keyframes[index - 1].position >= position {
            return false;
        }
        if index + 1 < len && self.keyframes[index + 1].position <= position {
            return false;
        }

        let value = self.normalize_value(value);
        let display_prop = self.display_prop(value);
        let moved = self.keyframes[index].position != position;
        let k = &mut self.keyframes[index];
        k.position = position;
        k.value = value;
        k.display_prop = display_prop;
        self.update_neighborhood(index);
        if moved {
            self.generation += 1;
        }
        self.check_invariants();
        true
    }

    /// Replace every keyframe with a position in `[start, end]` by `pairs`
    pub fn replace_span(&mut self, start: SamplePos, end: SamplePos, pairs: &[(SamplePos, Value)]) {
        let (mut lo, hi) = self.span_indices(start, end);
        if pairs.is_empty() && hi - lo >= self.keyframes.len() {
            lo += 1;
        }
        if lo < hi {
            self.keyframes.drain(lo..hi);
        }
        for &(position, value) in pairs {
            let value = self.normalize_value(value);
            let index = self.keyframes.partition_point(|k| k.position < position);
            let keyframe = Keyframe {
                position,
                value,
                slope: Slope::flat(self.kind),
                display_prop: self.display_prop(value),
                draw_x: 0.0,
            };
            if index < self.keyframes.len() && self.keyframes[index].position == position {
                self.keyframes[index] = keyframe;
            } else {
                self.ensure_slot();
                self.keyframes.insert(index, keyframe);
            }
        }
        self.rebuild_slopes();

        let last = self.keyframes.len() - 1;
        if self.cursor_hint() > last {
            self.set_cursor_hint(last);
        }
        self.generation += 1;
        self.check_invariants();
    }

    /// Reserve room for `additional` keyframes
    pub fn reserve(&mut self, additional: usize) {
        self.keyframes.reserve(additional);
    }

    /// Recompute display X for every keyframe
    pub fn refresh_draw_x(&mut self, mapper: &dyn CoordinateMapper) {
        for k in &mut self.keyframes {
            k.draw_x = mapper.position_to_x(k.position);
        }
    }

    // ─── internals ──────────────────────────────────────────────────────────

    fn normalize_value(&self, value: Value) -> Value {
        value.cast(self.kind).clamp(self.min, self.max)
    }

    fn display_prop(&self, value: Value) -> f64 {
        if self.range > 0.0 {
            ((value.as_f64() - self.min.as_f64()) / self.range).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Double the arena when full
    fn ensure_slot(&mut self) {
        let capacity = self.keyframes.capacity();
        if self.keyframes.len() == capacity {
            self.keyframes.reserve_exact(capacity.max(1));
        }
    }

    fn span_indices(&self, start: SamplePos, end: SamplePos) -> (usize, usize) {
        let lo = self.keyframes.partition_point(|k| k.position < start);
        let hi = self.keyframes.partition_point(|k| k.position <= end);
        (lo, hi.max(lo))
    }

    fn update_slope(&mut self, index: usize) {
        let slope = match self.keyframes.get(index + 1) {
            Some(next) => {
                let cur = &self.keyframes[index];
                Slope {
                    dx: next.position - cur.position,
                    dy: cur.value.delta_to(next.value),
                }
            }
            None => Slope::flat(self.kind),
        };
        self.keyframes[index].slope = slope;
    }

    /// Refresh the slopes that depend on keyframe `index`
    fn update_neighborhood(&mut self, index: usize) {
        if index > 0 {
            self.update_slope(index - 1);
        }
        self.update_slope(index);
    }

    fn rebuild_slopes(&mut self) {
        for i in 0..self.keyframes.len() {
            self.update_slope(i);
        }
    }

    fn rebase_cursor_after_removal(&self, start: usize, count: usize) {
        let cursor = self.cursor_hint();
        let rebased = if cursor >= start + count {
            cursor - count
        } else if cursor >= start {
            start.saturating_sub(1)
        } else {
            cursor
        };
        self.set_cursor_hint(rebased.min(self.keyframes.len() - 1));
    }

    /// Structural invariants; a violation is a programming defect
    #[inline]
    pub fn check_invariants(&self) {
        debug_assert!(!self.keyframes.is_empty(), "keyframe store is empty");
        debug_assert!(
            self.keyframes.windows(2).all(|w| w[0].position < w[1].position),
            "keyframes out of order"
        );
        debug_assert!(
            self.keyframes.iter().all(|k| k.value.kind() == self.kind),
            "keyframe kind differs from store kind"
        );
        debug_assert!(
            self.cursor_hint() < self.keyframes.len(),
            "cursor outside keyframe bounds"
        );
    }
}
