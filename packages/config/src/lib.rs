// ABOUTME: Configuration and environment variable management for Parley
// ABOUTME: Environment variable names shared by the server and its binary

pub mod constants;

pub use constants::*;
