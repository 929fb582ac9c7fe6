//! `Daisychain` Core: method-dispatch chaining engine.
//!
//! An interface method is implemented by a [`Pipeline`]: an ordered list of
//! [`Step`]s, each calling one method of a registered [`StepTarget`]. Steps
//! read their arguments from the interface call or from owner-tagged
//! [`Appendix`] values carried in the [`ProtocolContext`], and are skipped
//! when a required argument is missing. A [`Dispatcher`] maps method
//! identifiers to pipelines; [`chain_interface!`] generates the struct that
//! implements the interface on top of it.

pub mod appendix;
pub mod argument;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod factory;
mod macros;
pub mod param;
pub mod pipeline;
pub mod signature;
pub mod step;
pub mod target;
pub mod traits;
pub mod types;

pub use appendix::{Appendix, AppendixKey, AppendixStore, OwnerId};
pub use argument::{Argument, ArgumentSource, Resolution, ResolveSite};
pub use context::ProtocolContext;
pub use dispatcher::Dispatcher;
pub use error::{BuildError, DispatchError, MissingReason, MissingRequiredArgument};
pub use factory::DispatcherFactory;
pub use param::{AppendixSet, Arg, Param, ParamKind, ParamShape, Resolved};
pub use pipeline::{ErasedPipeline, Pipeline, PipelineAssembly, PipelineBuilder, PipelineDescription};
pub use signature::{ChainInterface, MethodSignature, Parameter};
pub use step::{Step, StepDescription, StepSpec};
pub use target::{BoundMethod, MethodTable, TargetHandle};
pub use traits::{Handler, StepTarget};
pub use types::{ArgValue, CallArgs, TypeInfo};
