//! Hybrid ARIMAX + residual LSTM pipeline.
//!
//! The linear stage explains wave height from wind speed; the residual
//! network learns what the linear stage leaves over. Forecasts are the sum
//! of both.

pub mod model_set;
pub mod orchestrator;
pub mod seed_search;

pub use model_set::{HoldoutEvaluation, ModelMetadata, ModelSet};
pub use orchestrator::{HybridOrchestrator, HybridReport};
pub use seed_search::{guarded_retrain, run_seed_search, BestTrial, SearchOutcome, StopReason, TrialOutcome, TrialRecord};
