mod predictor;
mod reconciler;
mod session;
mod smoothing;

pub use predictor::{ClientPredictor, PredictedState};
pub use reconciler::{
    POSITION_TOLERANCE_SQUARED, ROTATION_TOLERANCE, Reconciler, ReconcilerConfig, Reconciliation,
};
pub use session::{ClientSession, PredictionConfig, SessionStats};
pub use smoothing::{SNAP_DISTANCE_SQUARED, SmoothingError};
