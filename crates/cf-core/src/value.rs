//! Typed parameter values
//!
//! Automatable parameters come in a small, closed set of numeric shapes.
//! `Value` carries one of them; the arithmetic itself lives on the `Scalar`
//! trait so that every operation branches on the kind exactly once.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tolerance used for zero/equality tests on floating kinds
const FLOAT_EPSILON: f64 = 1e-9;

// ═══════════════════════════════════════════════════════════════════════════
// VALUE KIND
// ═══════════════════════════════════════════════════════════════════════════

/// Value kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int16,
    Int32,
    Uint16,
    Float,
    Double,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Uint16 => "uint16",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    #[inline]
    pub fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Whether values of this kind blend between keyframes.
    /// Booleans are a pure step function.
    #[inline]
    pub fn interpolates(self) -> bool {
        !matches!(self, Self::Bool)
    }

    /// Kind used to hold the signed difference of two values of this kind.
    ///
    /// Unsigned and narrow integer differences do not fit their own kind
    /// (`0u16 - 1u16`, `i16::MAX - i16::MIN`), so they widen.
    #[inline]
    pub fn delta_kind(self) -> ValueKind {
        match self {
            Self::Bool => Self::Bool,
            Self::Int16 | Self::Uint16 => Self::Int32,
            Self::Int32 => Self::Double,
            Self::Float => Self::Float,
            Self::Double => Self::Double,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SCALAR TRAIT
// ═══════════════════════════════════════════════════════════════════════════

/// Arithmetic shared by every primitive a `Value` can hold
pub trait Scalar: Copy + PartialOrd + Send + Sync + 'static {
    const KIND: ValueKind;

    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn scale(self, factor: f64) -> Self;
    fn to_f64(self) -> f64;
    fn from_f64(x: f64) -> Self;
    fn is_zero(self) -> bool;
    fn kind_min() -> Self;
    fn kind_max() -> Self;
    fn into_value(self) -> Value;
}

macro_rules! impl_int_scalar {
    ($t:ty, $variant:ident) => {
        impl Scalar for $t {
            const KIND: ValueKind = ValueKind::$variant;

            #[inline]
            fn add(self, rhs: Self) -> Self {
                self.saturating_add(rhs)
            }

            #[inline]
            fn sub(self, rhs: Self) -> Self {
                self.saturating_sub(rhs)
            }

            #[inline]
            fn scale(self, factor: f64) -> Self {
                // `as` from f64 truncates toward zero and saturates
                (self as f64 * factor) as $t
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(x: f64) -> Self {
                x as $t
            }

            #[inline]
            fn is_zero(self) -> bool {
                self == 0
            }

            fn kind_min() -> Self {
                <$t>::MIN
            }

            fn kind_max() -> Self {
                <$t>::MAX
            }

            #[inline]
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_int_scalar!(i16, Int16);
impl_int_scalar!(i32, Int32);
impl_int_scalar!(u16, Uint16);

impl Scalar for f32 {
    const KIND: ValueKind = ValueKind::Float;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self + rhs
    }

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self - rhs
    }

    #[inline]
    fn scale(self, factor: f64) -> Self {
        (self as f64 * factor) as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(x: f64) -> Self {
        x as f32
    }

    #[inline]
    fn is_zero(self) -> bool {
        (self as f64).abs() < FLOAT_EPSILON
    }

    fn kind_min() -> Self {
        0.0
    }

    fn kind_max() -> Self {
        1.0
    }

    #[inline]
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl Scalar for f64 {
    const KIND: ValueKind = ValueKind::Double;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self + rhs
    }

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self - rhs
    }

    #[inline]
    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(x: f64) -> Self {
        x
    }

    #[inline]
    fn is_zero(self) -> bool {
        self.abs() < FLOAT_EPSILON
    }

    fn kind_min() -> Self {
        0.0
    }

    fn kind_max() -> Self {
        1.0
    }

    #[inline]
    fn into_value(self) -> Value {
        Value::Double(self)
    }
}

impl Scalar for bool {
    const KIND: ValueKind = ValueKind::Bool;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self || rhs
    }

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self ^ rhs
    }

    #[inline]
    fn scale(self, factor: f64) -> Self {
        self && factor.abs() >= 0.5
    }

    #[inline]
    fn to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }

    #[inline]
    fn from_f64(x: f64) -> Self {
        x.abs() >= 0.5
    }

    #[inline]
    fn is_zero(self) -> bool {
        !self
    }

    fn kind_min() -> Self {
        false
    }

    fn kind_max() -> Self {
        true
    }

    #[inline]
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// VALUE
// ═══════════════════════════════════════════════════════════════════════════

/// Tagged parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Uint16(u16),
    Float(f32),
    Double(f64),
}

/// Apply a unary `Scalar` expression to whatever the value holds
macro_rules! map_scalar {
    ($value:expr, |$x:ident| $body:expr) => {
        match $value {
            Value::Bool($x) => $body,
            Value::Int16($x) => $body,
            Value::Int32($x) => $body,
            Value::Uint16($x) => $body,
            Value::Float($x) => $body,
            Value::Double($x) => $body,
        }
    };
}

/// Apply a binary `Scalar` expression to two values of the same kind
macro_rules! zip_scalar {
    ($lhs:expr, $rhs:expr, |$a:ident, $b:ident| $body:expr) => {{
        let lhs = $lhs;
        let rhs = $rhs.coerce_to(lhs.kind());
        match (lhs, rhs) {
            (Value::Bool($a), Value::Bool($b)) => $body,
            (Value::Int16($a), Value::Int16($b)) => $body,
            (Value::Int32($a), Value::Int32($b)) => $body,
            (Value::Uint16($a), Value::Uint16($b)) => $body,
            (Value::Float($a), Value::Float($b)) => $body,
            (Value::Double($a), Value::Double($b)) => $body,
            _ => unreachable!("operands were coerced to one kind"),
        }
    }};
}

impl Value {
    /// Kind tag of this value
    #[inline]
    pub fn kind(self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int16(_) => ValueKind::Int16,
            Self::Int32(_) => ValueKind::Int32,
            Self::Uint16(_) => ValueKind::Uint16,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
        }
    }

    /// Zero of the given kind
    pub fn zero(kind: ValueKind) -> Self {
        Self::from_f64(kind, 0.0)
    }

    /// Smallest value of a kind (floats use the unit range)
    pub fn kind_min(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => bool::kind_min().into_value(),
            ValueKind::Int16 => i16::kind_min().into_value(),
            ValueKind::Int32 => i32::kind_min().into_value(),
            ValueKind::Uint16 => u16::kind_min().into_value(),
            ValueKind::Float => f32::kind_min().into_value(),
            ValueKind::Double => f64::kind_min().into_value(),
        }
    }

    /// Largest value of a kind (floats use the unit range)
    pub fn kind_max(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => bool::kind_max().into_value(),
            ValueKind::Int16 => i16::kind_max().into_value(),
            ValueKind::Int32 => i32::kind_max().into_value(),
            ValueKind::Uint16 => u16::kind_max().into_value(),
            ValueKind::Float => f32::kind_max().into_value(),
            ValueKind::Double => f64::kind_max().into_value(),
        }
    }

    /// Build a value of `kind` from a double, truncating and saturating
    /// for integer kinds
    pub fn from_f64(kind: ValueKind, x: f64) -> Self {
        match kind {
            ValueKind::Bool => bool::from_f64(x).into_value(),
            ValueKind::Int16 => i16::from_f64(x).into_value(),
            ValueKind::Int32 => i32::from_f64(x).into_value(),
            ValueKind::Uint16 => u16::from_f64(x).into_value(),
            ValueKind::Float => f32::from_f64(x).into_value(),
            ValueKind::Double => f64::from_f64(x).into_value(),
        }
    }

    #[inline]
    pub fn as_f64(self) -> f64 {
        map_scalar!(self, |x| x.to_f64())
    }

    #[inline]
    pub fn as_f32(self) -> f32 {
        self.as_f64() as f32
    }

    #[inline]
    pub fn as_bool(self) -> bool {
        !self.is_zero()
    }

    /// Convert to another kind through f64
    pub fn cast(self, kind: ValueKind) -> Self {
        if self.kind() == kind {
            self
        } else {
            Self::from_f64(kind, self.as_f64())
        }
    }

    /// Mixed-kind arithmetic is a caller bug; debug builds stop here
    #[inline]
    fn coerce_to(self, kind: ValueKind) -> Self {
        debug_assert_eq!(self.kind(), kind, "mixed-kind value operation");
        self.cast(kind)
    }

    #[inline]
    pub fn add(self, rhs: Self) -> Self {
        zip_scalar!(self, rhs, |a, b| Scalar::add(a, b).into_value())
    }

    /// `self - rhs` in the same kind (integers saturate)
    #[inline]
    pub fn sub(self, rhs: Self) -> Self {
        zip_scalar!(self, rhs, |a, b| Scalar::sub(a, b).into_value())
    }

    #[inline]
    pub fn scale(self, factor: f64) -> Self {
        map_scalar!(self, |x| Scalar::scale(x, factor).into_value())
    }

    /// `self / rhs` as a plain ratio
    #[inline]
    pub fn ratio(self, rhs: Self) -> f64 {
        self.as_f64() / rhs.as_f64()
    }

    /// Signed difference `other - self`, held in `kind().delta_kind()`
    #[inline]
    pub fn delta_to(self, other: Self) -> Self {
        let other = other.coerce_to(self.kind());
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Self::Bool(a ^ b),
            (Self::Float(a), Self::Float(b)) => Self::Float(b - a),
            (Self::Double(a), Self::Double(b)) => Self::Double(b - a),
            (Self::Int16(a), Self::Int16(b)) => Self::Int32(b as i32 - a as i32),
            (Self::Uint16(a), Self::Uint16(b)) => Self::Int32(b as i32 - a as i32),
            (Self::Int32(a), Self::Int32(b)) => Self::Double(b as f64 - a as f64),
            _ => unreachable!("operands were coerced to one kind"),
        }
    }

    /// Apply a delta produced by `delta_to` (or a scaled copy of one)
    #[inline]
    pub fn offset_by(self, delta: Self) -> Self {
        debug_assert_eq!(delta.kind(), self.kind().delta_kind(), "delta of wrong kind");
        match (self, delta) {
            (Self::Bool(a), Self::Bool(d)) => Self::Bool(a ^ d),
            (Self::Float(a), Self::Float(d)) => Self::Float(a + d),
            (Self::Double(a), Self::Double(d)) => Self::Double(a + d),
            (base, delta) => Self::from_f64(base.kind(), base.as_f64() + delta.as_f64()),
        }
    }

    pub fn compare(self, rhs: Self) -> Option<Ordering> {
        zip_scalar!(self, rhs, |a, b| a.partial_cmp(&b))
    }

    #[inline]
    pub fn less_than(self, rhs: Self) -> bool {
        self.compare(rhs) == Some(Ordering::Less)
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        map_scalar!(self, |x| Scalar::is_zero(x))
    }

    /// Equality with the floating tolerance used throughout the engine
    pub fn approx_eq(self, rhs: Self) -> bool {
        if self.kind().is_floating() {
            (self.as_f64() - rhs.as_f64()).abs() < FLOAT_EPSILON
        } else {
            self.compare(rhs) == Some(Ordering::Equal)
        }
    }

    /// Only floating kinds can hold NaN
    #[inline]
    pub fn is_nan(self) -> bool {
        self.kind().is_floating() && self.as_f64().is_nan()
    }

    pub fn in_range(self, min: Self, max: Self) -> bool {
        !self.is_nan() && !self.less_than(min) && !max.less_than(self)
    }

    /// Clamp into `[min, max]`. NaN has no place in the range and maps to `min`.
    pub fn clamp(self, min: Self, max: Self) -> Self {
        if self.is_nan() || self.less_than(min) {
            min
        } else if max.less_than(self) {
            max
        } else {
            self
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Uint16(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.2}"),
            Self::Double(v) => write!(f, "{v:.2}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Self::Uint16(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kind_tags() {
        assert_eq!(Value::Float(0.5).kind(), ValueKind::Float);
        assert_eq!(Value::Uint16(3).kind(), ValueKind::Uint16);
        assert!(!ValueKind::Bool.interpolates());
        assert!(ValueKind::Int32.interpolates());
        assert_eq!(Value::zero(ValueKind::Int16), Value::Int16(0));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(Value::Float(0.25).add(Value::Float(0.5)), Value::Float(0.75));
        assert_eq!(Value::Double(1.0).sub(Value::Double(0.25)), Value::Double(0.75));
        assert_eq!(Value::Int32(10).scale(0.55), Value::Int32(5));
        assert_eq!(Value::Int16(i16::MAX).add(Value::Int16(1)), Value::Int16(i16::MAX));
        assert_eq!(Value::Uint16(2).sub(Value::Uint16(5)), Value::Uint16(0));
    }

    #[test]
    fn test_bool_semantics() {
        assert_eq!(Value::Bool(true).scale(0.4), Value::Bool(false));
        assert_eq!(Value::Bool(true).scale(1.0), Value::Bool(true));
        assert_eq!(Value::Bool(false).add(Value::Bool(true)), Value::Bool(true));
        assert_eq!(Value::Bool(true).as_f64(), 1.0);
        assert!(Value::Bool(false).is_zero());
    }

    #[test]
    fn test_delta_widens_narrow_integers() {
        let d = Value::Uint16(10).delta_to(Value::Uint16(4));
        assert_eq!(d, Value::Int32(-6));
        assert_eq!(Value::Uint16(10).offset_by(d), Value::Uint16(4));

        let wide = Value::Int16(i16::MIN).delta_to(Value::Int16(i16::MAX));
        assert_eq!(wide, Value::Int32(65535));

        let d32 = Value::Int32(i32::MIN).delta_to(Value::Int32(i32::MAX));
        assert_eq!(d32.kind(), ValueKind::Double);
    }

    #[test]
    fn test_offset_saturates() {
        let v = Value::Uint16(3).offset_by(Value::Int32(-100));
        assert_eq!(v, Value::Uint16(0));
    }

    #[test]
    fn test_compare_and_range() {
        assert!(Value::Float(0.1).less_than(Value::Float(0.2)));
        assert!(Value::Int16(-3).in_range(Value::Int16(-5), Value::Int16(0)));
        assert!(!Value::Double(1.5).in_range(Value::Double(0.0), Value::Double(1.0)));
        assert_eq!(
            Value::Double(1.5).clamp(Value::Double(0.0), Value::Double(1.0)),
            Value::Double(1.0)
        );
    }

    #[test]
    fn test_nan_never_survives_clamp() {
        let (lo, hi) = (Value::Float(0.0), Value::Float(1.0));
        assert_eq!(Value::Float(f32::NAN).clamp(lo, hi), lo);
        assert!(!Value::Float(f32::NAN).in_range(lo, hi));
        assert_eq!(Value::Float(f32::INFINITY).clamp(lo, hi), hi);
        assert_eq!(Value::Float(f32::NEG_INFINITY).clamp(lo, hi), lo);

        let nan = Value::Double(f64::NAN).cast(ValueKind::Float);
        assert_eq!(nan.clamp(lo, hi), lo);
        assert!(!Value::Int16(3).is_nan());
    }

    #[test]
    fn test_ratio_and_cast() {
        assert_relative_eq!(Value::Int32(25).ratio(Value::Int32(100)), 0.25);
        assert_eq!(Value::Double(3.9).cast(ValueKind::Int16), Value::Int16(3));
        assert_eq!(Value::Double(70000.0).cast(ValueKind::Uint16), Value::Uint16(u16::MAX));
        assert!(Value::Float(0.3).approx_eq(Value::Float(0.3)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(0.5).to_string(), "0.50");
        assert_eq!(Value::Int16(-2).to_string(), "-2");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    #[should_panic(expected = "mixed-kind")]
    #[cfg(debug_assertions)]
    fn test_mixed_kinds_panic_in_debug() {
        let _ = Value::Float(1.0).add(Value::Int16(1));
    }
}
