//! Residual forecaster: an LSTM over windows of scaled ARIMAX residuals.

mod adam;
pub mod iterative;
mod model;
mod network;
mod trainer;

pub use iterative::{predict_iterative, WindowBuffer};
pub use model::ResidualModel;
pub use network::LstmNetwork;
pub use trainer::{ResidualTrainer, TrainedResidual, TrainingHistory};
