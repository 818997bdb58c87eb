//! State module for tracking extraction progress
//!
//! # Components
//!
//! - `ValidationState`: Tracks an extraction through the validate-and-retry loop

mod validation_state;

pub use validation_state::ValidationState;
