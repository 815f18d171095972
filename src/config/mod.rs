//! # Configuration Module
//!
//! This module centralizes all configuration constants for segbuf. Constants
//! are grouped by their functional area and interdependencies are documented
//! and enforced through compile-time assertions.
//!
//! ## Why Centralization?
//!
//! The page geometry and the buffer thresholds depend on each other: the slab
//! pool hands out `PAGE_SIZE` pages, the buffer decides "slab page vs.
//! oversized heap chunk" against `PAGE_SIZE`, and the threshold floors must
//! never exceed their defaults. Co-locating these values and adding
//! compile-time checks prevents mismatch bugs.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency
//!   documentation

pub mod constants;
pub use constants::*;
