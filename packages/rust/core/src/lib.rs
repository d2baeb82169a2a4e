//! Core pipeline orchestration and domain logic for blogforge.
//!
//! This crate ties together rendering, extraction, markdown conversion,
//! search, and storage into the two end-to-end workflows: acquisition
//! ([`pipeline::acquire`]) and enhancement ([`enhancement::Enhancer`]).

pub mod enhancement;
pub mod generation;
pub mod pacing;
pub mod pipeline;
pub mod prompt;

pub use enhancement::{BatchReport, Enhancer, Stage};
pub use generation::{ChatCompletionsGenerator, TextGenerator};
pub use pacing::{FixedDelays, NoDelay, Pacer, PacingStep};
pub use pipeline::{AcquisitionReport, ProgressReporter, SilentProgress, acquire};
