//! Persisted automation data
//!
//! The plain-data form an external serializer stores for each automation.

use cf_core::{CfError, CfResult, SamplePos, Value, ValueKind};
use serde::{Deserialize, Serialize};

/// Detached, serializable copy of an automation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationSnapshot {
    pub label: String,
    pub kind: ValueKind,
    pub min: Value,
    pub max: Value,
    pub range: f64,
    /// Whether playback reads the curve
    pub read: bool,
    pub keyframes: Vec<(SamplePos, Value)>,
}

impl AutomationSnapshot {
    /// Reject data the engine could not load without breaking its invariants
    pub fn validate(&self) -> CfResult<()> {
        for v in [self.min, self.max] {
            if v.kind() != self.kind {
                return Err(CfError::KindMismatch {
                    expected: self.kind,
                    found: v.kind(),
                });
            }
        }
        if !self.min.less_than(self.max) {
            return Err(CfError::InvalidSnapshot(format!(
                "{}: min {} is not below max {}",
                self.label, self.min, self.max
            )));
        }
        if self.keyframes.is_empty() {
            return Err(CfError::InvalidSnapshot(format!("{}: no keyframes", self.label)));
        }
        if let Some(w) = self.keyframes.windows(2).find(|w| w[0].0 >= w[1].0) {
            return Err(CfError::InvalidSnapshot(format!(
                "{}: keyframe at {} is not after {}",
                self.label, w[1].0, w[0].0
            )));
        }
        if let Some(&(p, v)) = self.keyframes.iter().find(|(_, v)| v.kind() != self.kind) {
            return Err(CfError::InvalidSnapshot(format!(
                "{}: keyframe at {p} holds {} in a {} automation",
                self.label,
                v.kind(),
                self.kind
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> CfResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> CfResult<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> AutomationSnapshot {
        AutomationSnapshot {
            label: "pan".into(),
            kind: ValueKind::Float,
            min: Value::Float(0.0),
            max: Value::Float(1.0),
            range: 1.0,
            read: true,
            keyframes: vec![(0, Value::Float(0.5)), (48_000, Value::Float(0.0))],
        }
    }

    #[test]
    fn test_json_round_trip() {
        let snap = snapshot();
        let json = snap.to_json().unwrap();
        assert_eq!(AutomationSnapshot::from_json(&json).unwrap(), snap);
    }

    #[test]
    fn test_rejects_unordered() {
        let mut snap = snapshot();
        snap.keyframes.swap(0, 1);
        assert!(matches!(snap.validate(), Err(CfError::InvalidSnapshot(_))));
    }

    #[test]
    fn test_rejects_mixed_kinds() {
        let mut snap = snapshot();
        snap.keyframes.push((96_000, Value::Int16(1)));
        assert!(matches!(snap.validate(), Err(CfError::InvalidSnapshot(_))));

        let mut snap = snapshot();
        snap.max = Value::Double(1.0);
        assert!(matches!(snap.validate(), Err(CfError::KindMismatch { .. })));
    }

    #[test]
    fn test_rejects_empty() {
        let mut snap = snapshot();
        snap.keyframes.clear();
        assert!(snap.validate().is_err());
        assert!(matches!(
            AutomationSnapshot::from_json("{"),
            Err(CfError::Serialization(_))
        ));
    }
}
