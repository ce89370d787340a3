// ABOUTME: Core types, traits, and utilities for Parley
// ABOUTME: Foundational package providing the clock, shared constants, and input validation

pub mod clock;
pub mod constants;
pub mod validation;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};

// Re-export constants
pub use constants::APP_VERSION;

// Re-export validation
pub use validation::{permitted_value, Validator, EMAIL_RX};
