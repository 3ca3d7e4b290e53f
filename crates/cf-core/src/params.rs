//! Parameter endpoints
//!
//! An endpoint owns the live value a track parameter reads. Automations
//! take their kind, range and default from it and push evaluated values
//! back into it during playback.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{CfError, CfResult, Value, ValueKind};

/// Live parameter binding
pub trait Endpoint: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ValueKind;

    fn min(&self) -> Value;

    fn max(&self) -> Value;

    fn default_value(&self) -> Value;

    /// Current live value
    fn read(&self) -> Value;

    /// Push a value into the live parameter. Called from the render thread.
    fn write(&self, value: Value);
}

/// Endpoint backed by an atomic for lock-free access
pub struct AtomicEndpoint {
    name: String,
    kind: ValueKind,
    min: Value,
    max: Value,
    default: Value,
    bits: AtomicU64,
}

impl AtomicEndpoint {
    pub fn new(
        name: impl Into<String>,
        default: Value,
        min: Value,
        max: Value,
    ) -> CfResult<Self> {
        let kind = default.kind();
        for bound in [min, max] {
            if bound.kind() != kind {
                return Err(CfError::KindMismatch {
                    expected: kind,
                    found: bound.kind(),
                });
            }
        }
        if !min.less_than(max) {
            return Err(CfError::InvalidRange(format!("min {min} must be below max {max}")));
        }

        let default = default.clamp(min, max);
        Ok(Self {
            name: name.into(),
            kind,
            min,
            max,
            default,
            bits: AtomicU64::new(default.as_f64().to_bits()),
        })
    }

    /// Float endpoint over the unit range
    pub fn unit(name: impl Into<String>, default: f32) -> CfResult<Self> {
        Self::new(name, Value::Float(default), Value::Float(0.0), Value::Float(1.0))
    }

    /// Reset to the default value
    pub fn reset(&self) {
        self.write(self.default);
    }
}

impl Endpoint for AtomicEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ValueKind {
        self.kind
    }

    fn min(&self) -> Value {
        self.min
    }

    fn max(&self) -> Value {
        self.max
    }

    fn default_value(&self) -> Value {
        self.default
    }

    #[inline]
    fn read(&self) -> Value {
        Value::from_f64(self.kind, f64::from_bits(self.bits.load(Ordering::Relaxed)))
    }

    #[inline]
    fn write(&self, value: Value) {
        let value = value.cast(self.kind).clamp(self.min, self.max);
        self.bits.store(value.as_f64().to_bits(), Ordering::Relaxed);
    }
}

impl std::fmt::Debug for AtomicEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicEndpoint")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &self.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_clamps() {
        let ep = AtomicEndpoint::unit("volume", 0.8).unwrap();
        assert_eq!(ep.read(), Value::Float(0.8));

        ep.write(Value::Float(1.7));
        assert_eq!(ep.read(), Value::Float(1.0));

        ep.reset();
        assert_eq!(ep.read(), Value::Float(0.8));
    }

    #[test]
    fn test_integer_endpoint() {
        let ep = AtomicEndpoint::new(
            "transpose",
            Value::Int16(0),
            Value::Int16(-12),
            Value::Int16(12),
        )
        .unwrap();
        ep.write(Value::Int16(-40));
        assert_eq!(ep.read(), Value::Int16(-12));
        assert_eq!(ep.kind(), ValueKind::Int16);
    }

    #[test]
    fn test_rejects_bad_bounds() {
        assert!(matches!(
            AtomicEndpoint::new("x", Value::Float(0.0), Value::Int16(0), Value::Float(1.0)),
            Err(CfError::KindMismatch { .. })
        ));
        assert!(matches!(
            AtomicEndpoint::new("x", Value::Float(0.0), Value::Float(1.0), Value::Float(0.0)),
            Err(CfError::InvalidRange(_))
        ));
    }
}
