//! # Crate-Level Scenario Tests
//!
//! Whole-run scenarios driven through [`crate::pipeline::Pipeline`] with the
//! deterministic providers in [`fakes`]. Module-level behaviour is tested
//! next to each module.

pub mod fakes;
