//! Prediction and inference
//!
//! Load trained artifacts once and turn form input into decisions.

pub mod format;
pub mod inference;
pub mod session;
pub mod threshold;

pub use inference::{Outcome, PredictionService};
pub use session::FormSession;
pub use threshold::Threshold;
