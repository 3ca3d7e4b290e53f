//! Curve evaluation
//!
//! Sequential lookup for the render thread. The cursor walks one neighbor at
//! a time from where the previous query left it, so consecutive positions
//! cost O(drift) instead of a search.

use cf_core::Value;

use crate::keyframe::{Keyframe, KeyframeStore};

/// Move `cursor` to the latest keyframe at or before `position`
#[inline]
fn seek(keyframes: &[Keyframe], cursor: usize, position: f64) -> usize {
    let last = keyframes.len() - 1;
    let mut cursor = cursor.min(last);
    while cursor < last && (keyframes[cursor + 1].position as f64) <= position {
        cursor += 1;
    }
    while cursor > 0 && (keyframes[cursor].position as f64) > position {
        cursor -= 1;
    }
    cursor
}

/// Value on the segment starting at `k`
#[inline]
fn interpolate(k: &Keyframe, position: f64) -> Value {
    if k.slope.is_flat() || !k.value.kind().interpolates() {
        return k.value;
    }
    let t = (position - k.position as f64) / k.slope.dx as f64;
    k.value.offset_by(k.slope.dy.scale(t))
}

/// Cursor-carrying reader over a keyframe store.
///
/// Created under the automation's read lock. The resolved cursor is written
/// back to the store as a hint for the next render chunk when dropped.
pub struct Evaluator<'a> {
    store: &'a KeyframeStore,
    cursor: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(store: &'a KeyframeStore) -> Self {
        Self {
            cursor: store.cursor_hint(),
            store,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Value at a (possibly fractional) position
    #[inline]
    pub fn value_at(&mut self, position: f64) -> Value {
        let keyframes = self.store.as_slice();
        let first = &keyframes[0];
        if position <= first.position as f64 {
            self.cursor = 0;
            return first.value;
        }
        self.cursor = seek(keyframes, self.cursor, position);
        interpolate(&keyframes[self.cursor], position)
    }

    /// Fill `dest` with values at `start + i * step`.
    ///
    /// `step` may be negative (reverse playback) or fractional.
    pub fn fill(&mut self, dest: &mut [Value], start: f64, step: f64) {
        for (i, out) in dest.iter_mut().enumerate() {
            *out = self.value_at(start + i as f64 * step);
        }
    }

    /// Same as [`fill`](Self::fill) into a plain `f32` buffer
    pub fn fill_f32(&mut self, dest: &mut [f32], start: f64, step: f64) {
        for (i, out) in dest.iter_mut().enumerate() {
            *out = self.value_at(start + i as f64 * step).as_f32();
        }
    }
}

impl Drop for Evaluator<'_> {
    fn drop(&mut self) {
        self.store.set_cursor_hint(self.cursor);
    }
}
