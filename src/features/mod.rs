//! Feature extraction and encoding
//!
//! Converts raw form input into model-ready feature vectors.

pub mod bucket;
pub mod encoding;
pub mod scaling;
pub mod schema;

pub use bucket::BucketRule;
pub use encoding::{FeatureEncoder, FieldRule, Level};
pub use scaling::{Scaler, ScalerParams};
pub use schema::{EncodedVector, FeatureSchema};
