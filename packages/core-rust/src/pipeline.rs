//! Ordered step sequences implementing one interface method.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::appendix::AppendixStore;
use crate::context::ProtocolContext;
use crate::error::{BuildError, DispatchError};
use crate::signature::Parameter;
use crate::step::{BindScope, Step, StepDescription, StepSpec};
use crate::types::{CallArgs, TypeInfo};

// ---------------------------------------------------------------------------
// PipelineBuilder
// ---------------------------------------------------------------------------

/// Configuration of the pipeline for method `method`, returning `T`.
pub struct PipelineBuilder<T> {
    method: String,
    params: Option<Vec<Parameter>>,
    steps: Vec<StepSpec>,
    _result: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> PipelineBuilder<T> {
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
            steps: Vec::new(),
            _result: PhantomData,
        }
    }

    /// Declares the next parameter of the method signature.
    ///
    /// Once any parameter is declared, positional arguments are checked
    /// against the declared count at build time.
    #[must_use]
    pub fn parameter<A: 'static>(self) -> Self {
        self.declare(Parameter::of::<A>(false))
    }

    /// Declares the next parameter as required: calls passing null fail.
    #[must_use]
    pub fn required_parameter<A: 'static>(self) -> Self {
        self.declare(Parameter::of::<A>(true))
    }

    /// Replaces the declared signature.
    #[must_use]
    pub fn parameters(mut self, params: Vec<Parameter>) -> Self {
        self.params = Some(params);
        self
    }

    fn declare(mut self, parameter: Parameter) -> Self {
        self.params.get_or_insert_with(Vec::new).push(parameter);
        self
    }

    /// Appends a step; steps run in the order they are added.
    #[must_use]
    pub fn step(mut self, step: StepSpec) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Validates every step and produces the pipeline.
    ///
    /// Building does not consume the builder; building twice yields
    /// structurally equal pipelines.
    ///
    /// # Errors
    ///
    /// Returns the first [`BuildError`] found, in step order.
    pub fn build(&self) -> Result<Pipeline<T>, BuildError> {
        self.build_with(self.params.clone())
    }

    fn build_with(&self, params: Option<Vec<Parameter>>) -> Result<Pipeline<T>, BuildError> {
        let scope = BindScope {
            pipeline: &self.method,
            arity: params.as_ref().map(Vec::len),
        };
        let steps = self
            .steps
            .iter()
            .map(|spec| Step::bind(spec, scope))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(pipeline = %self.method, steps = steps.len(), "built pipeline");
        Ok(Pipeline {
            method: self.method.clone(),
            params,
            steps,
        })
    }
}

impl<T> fmt::Debug for PipelineBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("method", &self.method)
            .field("returns", &std::any::type_name::<T>())
            .field("params", &self.params)
            .field("steps", &self.steps)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A validated, immutable sequence of steps.
pub struct Pipeline<T> {
    method: String,
    params: Option<Vec<Parameter>>,
    steps: Vec<Step<T>>,
}

impl<T: Send + 'static> Pipeline<T> {
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Runs every step in order, threading the context through.
    ///
    /// # Errors
    ///
    /// Fails before any step runs if a required parameter is null or a call
    /// argument does not match its declared type; otherwise returns the first
    /// fatal step error.
    pub fn execute(
        &self,
        ctx: ProtocolContext<T>,
        args: &CallArgs,
    ) -> Result<ProtocolContext<T>, DispatchError> {
        self.check_parameters(args)?;
        self.steps
            .iter()
            .try_fold(ctx, |ctx, step| step.execute(ctx, args))
    }

    fn check_parameters(&self, args: &CallArgs) -> Result<(), DispatchError> {
        let Some(params) = &self.params else {
            return Ok(());
        };
        for (position, param) in params.iter().enumerate() {
            match args.slot(position) {
                Some(Some(value)) if value.type_info() != param.ty => {
                    return Err(DispatchError::ArgumentTypeMismatch {
                        method: self.method.clone(),
                        position,
                        expected: param.ty,
                        found: value.type_info(),
                    });
                }
                Some(Some(_)) => {}
                Some(None) | None if param.required => {
                    return Err(DispatchError::NullRequiredParameter {
                        method: self.method.clone(),
                        position,
                    });
                }
                Some(None) | None => {}
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn describe(&self) -> PipelineDescription {
        PipelineDescription {
            method: self.method.clone(),
            returns: TypeInfo::of::<T>(),
            params: self.params.clone(),
            steps: self.steps.iter().map(Step::describe).collect(),
        }
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("method", &self.method)
            .field("params", &self.params)
            .field("steps", &self.steps)
            .finish()
    }
}

/// Structural view of a built pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDescription {
    pub method: String,
    pub returns: TypeInfo,
    pub params: Option<Vec<Parameter>>,
    pub steps: Vec<StepDescription>,
}

impl fmt::Display for PipelineDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.method)?;
        for (i, param) in self.params.iter().flatten().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        writeln!(f, ") -> {}", self.returns)?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {}. {step}", i + 1)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Type erasure
// ---------------------------------------------------------------------------

/// A built pipeline with its result type erased, as held by a dispatcher.
pub trait ErasedPipeline: Send + Sync {
    fn method(&self) -> &str;

    fn returns(&self) -> TypeInfo;

    /// Runs the pipeline from a fresh context seeded with `appendixes`.
    ///
    /// The returned box holds a `ProtocolContext<T>` with `T` as reported by
    /// [`returns`](Self::returns).
    ///
    /// # Errors
    ///
    /// See [`Pipeline::execute`].
    fn run(&self, appendixes: AppendixStore, args: &CallArgs) -> Result<Box<dyn Any + Send>, DispatchError>;

    fn describe(&self) -> PipelineDescription;
}

impl<T: Send + 'static> ErasedPipeline for Pipeline<T> {
    fn method(&self) -> &str {
        &self.method
    }

    fn returns(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn run(&self, appendixes: AppendixStore, args: &CallArgs) -> Result<Box<dyn Any + Send>, DispatchError> {
        let ctx = ProtocolContext::<T>::from_appendixes(appendixes);
        self.execute(ctx, args)
            .map(|ctx| Box::new(ctx) as Box<dyn Any + Send>)
    }

    fn describe(&self) -> PipelineDescription {
        Pipeline::describe(self)
    }
}

/// A pipeline builder with its result type erased.
///
/// Lets configuration code that only knows method names add steps to a
/// correctly typed builder obtained from
/// [`ChainInterface::pipeline`](crate::ChainInterface::pipeline).
pub trait PipelineAssembly: Send {
    fn method(&self) -> &str;

    fn returns(&self) -> TypeInfo;

    /// Declared signature, if any.
    fn parameters(&self) -> Option<&[Parameter]>;

    fn push_step(&mut self, step: StepSpec);

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// See [`PipelineBuilder::build`].
    fn assemble(&self) -> Result<Arc<dyn ErasedPipeline>, BuildError>;

    /// Builds the pipeline with `signature` as its parameters, unless the
    /// builder declares parameters of its own.
    ///
    /// # Errors
    ///
    /// See [`PipelineBuilder::build`].
    fn assemble_declared(&self, signature: &[Parameter]) -> Result<Arc<dyn ErasedPipeline>, BuildError>;
}

impl<T: Send + 'static> PipelineAssembly for PipelineBuilder<T> {
    fn method(&self) -> &str {
        &self.method
    }

    fn returns(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn parameters(&self) -> Option<&[Parameter]> {
        self.params.as_deref()
    }

    fn push_step(&mut self, step: StepSpec) {
        self.steps.push(step);
    }

    fn assemble(&self) -> Result<Arc<dyn ErasedPipeline>, BuildError> {
        self.build()
            .map(|pipeline| Arc::new(pipeline) as Arc<dyn ErasedPipeline>)
    }

    fn assemble_declared(&self, signature: &[Parameter]) -> Result<Arc<dyn ErasedPipeline>, BuildError> {
        let params = self.params.clone().unwrap_or_else(|| signature.to_vec());
        self.build_with(Some(params))
            .map(|pipeline| Arc::new(pipeline) as Arc<dyn ErasedPipeline>)
    }
}

impl<T: Send + 'static> From<PipelineBuilder<T>> for Box<dyn PipelineAssembly> {
    fn from(builder: PipelineBuilder<T>) -> Self {
        Box::new(builder)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
