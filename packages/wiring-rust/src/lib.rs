//! `Daisychain` Wiring: declarative chain configuration on top of
//! `daisychain-core`.
//!
//! A [`ChainConfig`] names targets and appendix owners; a
//! [`TargetRegistry`] maps those names to instances; [`assemble`] turns both
//! into a built interface implementation. The [`pricing`] module is a worked
//! example wired both ways.

pub mod assemble;
pub mod config;
pub mod error;
pub mod pricing;
pub mod registry;

pub use assemble::assemble;
pub use config::{ArgumentConfig, ChainConfig, PipelineConfig, StepConfig};
pub use error::WiringError;
pub use registry::TargetRegistry;
