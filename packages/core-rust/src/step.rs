//! A single delegate invocation within a pipeline.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::argument::{Argument, ArgumentSource, Resolution, ResolveSite};
use crate::context::ProtocolContext;
use crate::error::{BuildError, DispatchError};
use crate::param::{ParamKind, ParamShape, Resolved};
use crate::target::{BoundMethod, TargetHandle};
use crate::traits::StepTarget;
use crate::types::{CallArgs, TypeInfo};

// ---------------------------------------------------------------------------
// StepSpec
// ---------------------------------------------------------------------------

/// Unvalidated configuration of a step: target, method name and arguments.
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub target: TargetHandle,
    pub method: String,
    pub arguments: Vec<Argument>,
}

impl StepSpec {
    #[must_use]
    pub fn new(target: TargetHandle, method: impl Into<String>) -> Self {
        Self {
            target,
            method: method.into(),
            arguments: Vec::new(),
        }
    }

    /// Step calling `method` on `target`.
    #[must_use]
    pub fn on<S: StepTarget>(target: Arc<S>, method: impl Into<String>) -> Self {
        Self::new(TargetHandle::new(target), method)
    }

    /// Appends the next argument.
    #[must_use]
    pub fn arg(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    #[must_use]
    pub fn args(mut self, arguments: impl IntoIterator<Item = Argument>) -> Self {
        self.arguments.extend(arguments);
        self
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// What a step is validated against while its pipeline is built.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BindScope<'a> {
    pub pipeline: &'a str,
    /// Declared parameter count of the pipeline's method, if known.
    pub arity: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct BoundArgument {
    argument: Argument,
    ty: TypeInfo,
}

/// A validated step producing a `ProtocolContext<T>`.
pub struct Step<T> {
    method: BoundMethod,
    arguments: Vec<BoundArgument>,
    _result: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Step<T> {
    /// Validates `spec` against the target method it names.
    pub(crate) fn bind(spec: &StepSpec, scope: BindScope<'_>) -> Result<Self, BuildError> {
        let target = spec.target.name();
        let mut candidates = spec.target.find(&spec.method);
        let Some(method) = candidates.next() else {
            return Err(BuildError::MethodNotFound {
                target: target.to_string(),
                method: spec.method.clone(),
                reason: "no method exposed under this name".to_string(),
            });
        };
        if candidates.next().is_some() {
            return Err(BuildError::OverloadedMethod {
                target: target.to_string(),
                method: spec.method.clone(),
            });
        }

        if method.params().len() != spec.arguments.len() {
            return Err(BuildError::MethodNotFound {
                target: target.to_string(),
                method: spec.method.clone(),
                reason: format!(
                    "method takes {} parameters, {} arguments configured",
                    method.params().len(),
                    spec.arguments.len()
                ),
            });
        }

        let expected = TypeInfo::of::<T>();
        if method.output() != expected {
            return Err(BuildError::ReturnTypeMismatch {
                method: format!("{target}::{}", spec.method),
                expected,
                found: method.output(),
            });
        }

        let mut arguments = Vec::with_capacity(spec.arguments.len());
        let mut context_arguments = 0;
        for (position, (argument, shape)) in spec.arguments.iter().zip(method.params()).enumerate() {
            let mismatch = |reason: String| BuildError::IncompatibleArgument {
                target: target.to_string(),
                method: spec.method.clone(),
                position,
                reason,
            };

            check_kind(argument.source, *shape).map_err(&mismatch)?;

            let declared = match argument.source {
                ArgumentSource::Context => {
                    context_arguments += 1;
                    if context_arguments > 1 {
                        return Err(mismatch("only one context argument per step".to_string()));
                    }
                    Some(expected)
                }
                _ => argument.ty,
            };
            if let Some(declared) = declared {
                if declared != shape.ty {
                    return Err(BuildError::ArgumentTypeMismatch {
                        target: target.to_string(),
                        method: spec.method.clone(),
                        position,
                        expected: shape.ty,
                        found: declared,
                    });
                }
            }

            if let (ArgumentSource::Positional { index }, Some(arity)) = (argument.source, scope.arity) {
                if index >= arity {
                    return Err(BuildError::IndexOutOfRange {
                        pipeline: scope.pipeline.to_string(),
                        target: target.to_string(),
                        method: spec.method.clone(),
                        position,
                        index,
                        arity,
                    });
                }
            }

            let mut argument = *argument;
            argument.ty = Some(shape.ty);
            if shape.kind == ParamKind::Value {
                argument.required = true;
            }
            arguments.push(BoundArgument {
                argument,
                ty: shape.ty,
            });
        }

        debug!(
            pipeline = scope.pipeline,
            step_target = target,
            method = method.name(),
            arguments = arguments.len(),
            "bound step"
        );

        Ok(Self {
            method: method.clone(),
            arguments,
            _result: PhantomData,
        })
    }

    /// Runs the step against `ctx`.
    ///
    /// If a required argument is missing the target is not called and `ctx`
    /// is returned unchanged. Otherwise the context the target returns
    /// replaces `ctx`.
    ///
    /// # Errors
    ///
    /// Returns fatal resolution errors and wraps a failing target in
    /// [`DispatchError::InvocationFailure`].
    pub fn execute(
        &self,
        ctx: ProtocolContext<T>,
        args: &CallArgs,
    ) -> Result<ProtocolContext<T>, DispatchError> {
        let mut resolved = Vec::with_capacity(self.arguments.len());
        let mut context_position = None;
        for (position, bound) in self.arguments.iter().enumerate() {
            let site = ResolveSite {
                target: self.method.target(),
                method: self.method.name(),
                position,
                ty: bound.ty,
            };
            match bound.argument.resolve(&ctx, args, &site)? {
                Resolution::Present(value) => {
                    if matches!(value, Resolved::Context(_)) {
                        context_position = Some(position);
                    }
                    resolved.push(value);
                }
                Resolution::Skip(missing) => {
                    info!(%missing, "skipping step");
                    return Ok(ctx);
                }
            }
        }

        if let Some(position) = context_position {
            resolved[position] = Resolved::Context(Some(Box::new(ctx)));
        }

        let output = self.method.invoke(resolved).map_err(|source| {
            error!(
                step_target = self.method.target(),
                method = self.method.name(),
                error = %source,
                "step invocation failed"
            );
            DispatchError::InvocationFailure {
                target: self.method.target(),
                method: self.method.name().to_string(),
                source,
            }
        })?;

        output
            .downcast::<ProtocolContext<T>>()
            .map(|ctx| *ctx)
            .map_err(|_| DispatchError::ReturnTypeMismatch {
                method: format!("{}::{}", self.method.target(), self.method.name()),
                expected: TypeInfo::of::<T>(),
                found: self.method.output(),
            })
    }

    #[must_use]
    pub fn describe(&self) -> StepDescription {
        StepDescription {
            target: self.method.target(),
            method: self.method.name(),
            arguments: self.arguments.iter().map(|bound| bound.argument).collect(),
        }
    }
}

fn check_kind(source: ArgumentSource, shape: ParamShape) -> Result<(), String> {
    let fits = match source {
        ArgumentSource::Positional { .. } | ArgumentSource::Appendix { .. } => {
            matches!(shape.kind, ParamKind::Value | ParamKind::Optional)
        }
        ArgumentSource::AppendixSet { .. } => shape.kind == ParamKind::Set,
        ArgumentSource::Context => shape.kind == ParamKind::Context,
    };
    if fits {
        Ok(())
    } else {
        Err(format!("{source} cannot feed a {:?} parameter of {}", shape.kind, shape.ty))
    }
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("target", &self.method.target())
            .field("method", &self.method.name())
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// Structural view of a built step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescription {
    pub target: &'static str,
    pub method: &'static str,
    /// Arguments as validated, with types and required flags filled in.
    pub arguments: Vec<Argument>,
}

impl fmt::Display for StepDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}(", self.target, self.method)?;
        for (i, argument) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if argument.required_not_empty {
                f.write_str("#[required_not_empty] ")?;
            } else if argument.required {
                f.write_str("#[required] ")?;
            }
            write!(f, "{}", argument.source)?;
        }
        f.write_str(")")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
