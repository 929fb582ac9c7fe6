//! Typed parameters of target methods.
//!
//! A target method declares what it needs through its parameter types:
//!
//! | Parameter type        | Kind       | Accepts                                   |
//! |-----------------------|------------|-------------------------------------------|
//! | [`Arg<A>`]            | `Value`    | a present value (the argument is required) |
//! | `Option<A>`           | `Optional` | a value or "no value"                     |
//! | [`AppendixSet<A>`]    | `Set`      | every appendix of one slot                |
//! | `ProtocolContext<T>`  | `Context`  | the context the step receives             |
//!
//! The builder compares these shapes against the configured arguments, so a
//! mismatch is a build error rather than a runtime surprise.

use std::any::Any;
use std::fmt;

use anyhow::anyhow;

use crate::context::ProtocolContext;
use crate::types::{ArgValue, TypeInfo};

// ---------------------------------------------------------------------------
// ParamShape
// ---------------------------------------------------------------------------

/// How a target parameter consumes its resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Value,
    Optional,
    Set,
    Context,
}

/// Declared kind and element type of one target parameter.
///
/// For `Context` parameters `ty` is the result type `T` of `ProtocolContext<T>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamShape {
    pub kind: ParamKind,
    pub ty: TypeInfo,
}

impl ParamShape {
    #[must_use]
    pub fn new(kind: ParamKind, ty: TypeInfo) -> Self {
        Self { kind, ty }
    }
}

// ---------------------------------------------------------------------------
// Resolved
// ---------------------------------------------------------------------------

/// Outcome of resolving one argument, handed to the target method.
pub enum Resolved {
    Value(ArgValue),
    /// Optional argument whose source held nothing.
    Absent,
    Set(Vec<ArgValue>),
    /// Placeholder for the incoming context; filled by the step right before
    /// the call so the context is only moved when the step actually runs.
    Context(Option<Box<dyn Any + Send>>),
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Absent => f.write_str("Absent"),
            Self::Set(values) => f.debug_tuple("Set").field(values).finish(),
            Self::Context(ctx) => write!(f, "Context(filled: {})", ctx.is_some()),
        }
    }
}

// ---------------------------------------------------------------------------
// Param trait and extractors
// ---------------------------------------------------------------------------

/// A type that can appear as a parameter of a target method.
pub trait Param: Sized + 'static {
    fn shape() -> ParamShape;

    /// Converts the resolved argument into the parameter value.
    ///
    /// # Errors
    ///
    /// Fails if the resolved value does not fit the parameter; the build step
    /// rules this out for validated configurations.
    fn from_resolved(resolved: Resolved) -> anyhow::Result<Self>;
}

/// A required argument value.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg<A>(pub A);

impl<A> Arg<A> {
    #[must_use]
    pub fn into_inner(self) -> A {
        self.0
    }
}

impl<A: Any + Clone + Send + Sync> Param for Arg<A> {
    fn shape() -> ParamShape {
        ParamShape::new(ParamKind::Value, TypeInfo::of::<A>())
    }

    fn from_resolved(resolved: Resolved) -> anyhow::Result<Self> {
        match resolved {
            Resolved::Value(value) => downcast_cloned(&value).map(Arg),
            other => Err(anyhow!("expected a value of {}, got {other:?}", TypeInfo::of::<A>())),
        }
    }
}

impl<A: Any + Clone + Send + Sync> Param for Option<A> {
    fn shape() -> ParamShape {
        ParamShape::new(ParamKind::Optional, TypeInfo::of::<A>())
    }

    fn from_resolved(resolved: Resolved) -> anyhow::Result<Self> {
        match resolved {
            Resolved::Value(value) => downcast_cloned(&value).map(Some),
            Resolved::Absent => Ok(None),
            other => Err(anyhow!("expected an optional {}, got {other:?}", TypeInfo::of::<A>())),
        }
    }
}

/// Contents of every appendix in one `(owner, A)` slot, in attachment order.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendixSet<A>(pub Vec<A>);

impl<A> AppendixSet<A> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, A> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<A> {
        self.0
    }
}

impl<A: Any + Clone + Send + Sync> Param for AppendixSet<A> {
    fn shape() -> ParamShape {
        ParamShape::new(ParamKind::Set, TypeInfo::of::<A>())
    }

    fn from_resolved(resolved: Resolved) -> anyhow::Result<Self> {
        match resolved {
            Resolved::Set(values) => values
                .iter()
                .map(downcast_cloned)
                .collect::<anyhow::Result<Vec<A>>>()
                .map(AppendixSet),
            other => Err(anyhow!("expected a set of {}, got {other:?}", TypeInfo::of::<A>())),
        }
    }
}

impl<T: Send + 'static> Param for ProtocolContext<T> {
    fn shape() -> ParamShape {
        ParamShape::new(ParamKind::Context, TypeInfo::of::<T>())
    }

    fn from_resolved(resolved: Resolved) -> anyhow::Result<Self> {
        match resolved {
            Resolved::Context(Some(boxed)) => boxed
                .downcast::<ProtocolContext<T>>()
                .map(|ctx| *ctx)
                .map_err(|_| anyhow!("context is not a ProtocolContext<{}>", TypeInfo::of::<T>())),
            other => Err(anyhow!("expected the call context, got {other:?}")),
        }
    }
}

fn downcast_cloned<A: Any + Clone>(value: &ArgValue) -> anyhow::Result<A> {
    value
        .downcast_ref::<A>()
        .cloned()
        .ok_or_else(|| anyhow!("expected {}, got {}", TypeInfo::of::<A>(), value.type_info()))
}
