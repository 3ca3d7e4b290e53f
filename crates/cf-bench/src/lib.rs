//! # cf-bench
//!
//! Performance benchmarks for CurveForge automation components.
//!
//! ## Benchmark Categories
//!
//! - **Eval Benchmarks**: `value_at`, `fill_range` forward and reverse
//! - **Record Benchmarks**: write-mode simplification of synthetic streams
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p cf-bench
//!
//! # Run specific benchmark
//! cargo bench -p cf-bench -- fill_range
//! ```

pub mod generators;

pub use generators::*;
