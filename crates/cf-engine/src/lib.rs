//! cf-engine: Automation curve engine
//!
//! Storage, evaluation and live recording of per-parameter curves:
//! - `KeyframeStore`: ordered, never-empty keyframe arena with cached slopes
//! - `Evaluator`: cursor-based sequential lookup for the render thread
//! - `RecordSimplifier`: online simplification of write-mode sample streams
//! - `Automation` / `TrackAutomations`: the lock-protected public surface

pub mod automation;
pub mod config;
pub mod evaluator;
pub mod keyframe;
pub mod recorder;
pub mod snapshot;
pub mod track;

pub use automation::{Automation, AutomationId, AutomationParams};
pub use config::EngineConfig;
pub use evaluator::Evaluator;
pub use keyframe::{CoordinateMapper, InsertOutcome, Keyframe, KeyframeRef, KeyframeStore, Slope};
pub use recorder::{RecordSimplifier, RecordState, SimplifierConfig, WriteSession};
pub use snapshot::AutomationSnapshot;
pub use track::TrackAutomations;
