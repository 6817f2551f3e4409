//! Position evaluation.
//!
//! Two independent evaluators share this module: the neural policy engine
//! that scores every action for move choice, and the defensive evaluator
//! that tracks a side's structural health over the course of a game.

pub mod defense;
pub mod history;
pub mod neural;

pub use defense::{
    DefenseConfig, DefenseMetrics, DefenseSnapshot, DefensiveEvaluator, RiskLevel, Trend,
};
pub use history::{HistorySummary, SnapshotHistory};
pub use neural::{
    EngineError, EngineState, HttpFetcher, InferenceConfig, ModelFetcher, ModelLoader,
    ModelManifest, OnnxLoader, PolicyEngine, PolicyModel,
};
