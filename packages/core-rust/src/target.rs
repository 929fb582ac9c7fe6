//! Method tables of step targets and their type-erased, bound form.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::ProtocolContext;
use crate::param::{ParamShape, Resolved};
use crate::traits::{Handler, StepTarget};
use crate::types::TypeInfo;

type ErasedCall<S> =
    Arc<dyn Fn(&S, Vec<Resolved>) -> anyhow::Result<Box<dyn Any + Send>> + Send + Sync>;

type BoundCall = Arc<dyn Fn(Vec<Resolved>) -> anyhow::Result<Box<dyn Any + Send>> + Send + Sync>;

// ---------------------------------------------------------------------------
// MethodTable
// ---------------------------------------------------------------------------

/// Methods a [`StepTarget`] exposes, filled in by [`StepTarget::expose`].
pub struct MethodTable<S> {
    methods: Vec<TargetMethod<S>>,
}

struct TargetMethod<S> {
    name: &'static str,
    params: Vec<ParamShape>,
    output: TypeInfo,
    call: ErasedCall<S>,
}

impl<S: Send + Sync + 'static> MethodTable<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
        }
    }

    /// Exposes `handler` under `name`.
    ///
    /// Exposing the same name twice is allowed here but rejected when a step
    /// binds to that name.
    pub fn method<H, Args, T>(&mut self, name: &'static str, handler: H) -> &mut Self
    where
        H: Handler<S, Args, T>,
        T: Send + 'static,
    {
        let call: ErasedCall<S> = Arc::new(move |target: &S, args: Vec<Resolved>| {
            handler
                .call(target, args)
                .map(|ctx: ProtocolContext<T>| Box::new(ctx) as Box<dyn Any + Send>)
        });
        self.methods.push(TargetMethod {
            name,
            params: H::params(),
            output: TypeInfo::of::<T>(),
            call,
        });
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<S: Send + Sync + 'static> Default for MethodTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// TargetHandle / BoundMethod
// ---------------------------------------------------------------------------

/// A target instance together with its exposed methods, bound and type-erased.
///
/// Cheap to clone; the instance is shared.
#[derive(Clone)]
pub struct TargetHandle {
    name: &'static str,
    methods: Arc<[BoundMethod]>,
}

impl TargetHandle {
    /// Binds every method `S` exposes to `target`.
    #[must_use]
    pub fn new<S: StepTarget>(target: Arc<S>) -> Self {
        let mut table = MethodTable::<S>::new();
        S::expose(&mut table);
        let name = S::target_name();
        let methods = table
            .methods
            .into_iter()
            .map(|method| {
                let call = method.call;
                let instance = Arc::clone(&target);
                BoundMethod {
                    target: name,
                    name: method.name,
                    params: method.params,
                    output: method.output,
                    call: Arc::new(move |args| call(&instance, args)),
                }
            })
            .collect();
        Self { name, methods }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn methods(&self) -> &[BoundMethod] {
        &self.methods
    }

    /// Every exposed method called `name`.
    pub fn find<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a BoundMethod> + 'a {
        self.methods.iter().filter(move |method| method.name == name)
    }
}

impl<S: StepTarget> From<Arc<S>> for TargetHandle {
    fn from(target: Arc<S>) -> Self {
        Self::new(target)
    }
}

impl fmt::Debug for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetHandle")
            .field("name", &self.name)
            .field("methods", &self.methods.iter().map(|m| m.name).collect::<Vec<_>>())
            .finish()
    }
}

/// One exposed method bound to its target instance.
#[derive(Clone)]
pub struct BoundMethod {
    target: &'static str,
    name: &'static str,
    params: Vec<ParamShape>,
    output: TypeInfo,
    call: BoundCall,
}

impl BoundMethod {
    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn params(&self) -> &[ParamShape] {
        &self.params
    }

    /// Result type `T` of the `ProtocolContext<T>` the method returns.
    #[must_use]
    pub fn output(&self) -> TypeInfo {
        self.output
    }

    /// Invokes the method; the returned box holds a `ProtocolContext<T>` with
    /// `T` as reported by [`output`](Self::output).
    ///
    /// # Errors
    ///
    /// Propagates the target method's error.
    pub fn invoke(&self, args: Vec<Resolved>) -> anyhow::Result<Box<dyn Any + Send>> {
        (self.call)(args)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("target", &self.target)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
