//! Method signatures of chained interfaces.

use std::fmt;
use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::pipeline::{PipelineAssembly, PipelineBuilder};
use crate::types::TypeInfo;

/// One declared parameter of an interface method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub ty: TypeInfo,
    /// A null value for a required parameter fails the call before any step runs.
    pub required: bool,
}

impl Parameter {
    #[must_use]
    pub fn of<A: 'static>(required: bool) -> Self {
        Self {
            ty: TypeInfo::of::<A>(),
            required,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.required {
            write!(f, "#[required] {}", self.ty)
        } else {
            write!(f, "{}", self.ty)
        }
    }
}

/// Identifier, parameters and return type of one interface method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub id: &'static str,
    pub params: Vec<Parameter>,
    pub returns: TypeInfo,
}

impl MethodSignature {
    #[must_use]
    pub fn new<R: 'static>(id: &'static str, params: Vec<Parameter>) -> Self {
        Self {
            id,
            params,
            returns: TypeInfo::of::<R>(),
        }
    }
}

/// An interface whose methods are implemented by pipelines.
///
/// Usually implemented through [`chain_interface!`](crate::chain_interface),
/// which also generates the trampoline methods forwarding to
/// [`Dispatcher::invoke`].
pub trait ChainInterface: Send + Sync + Sized + 'static {
    /// Interface name used in logs, errors and configuration files.
    const NAME: &'static str;

    fn signatures() -> Vec<MethodSignature>;

    /// An empty, correctly typed pipeline builder for method `id`, or `None`
    /// if the interface has no such method.
    fn pipeline(id: &str) -> Option<Box<dyn PipelineAssembly>>;

    fn from_dispatcher(dispatcher: Arc<Dispatcher>) -> Self;

    fn dispatcher(&self) -> &Arc<Dispatcher>;

    /// A pipeline builder for method `id` with the declared parameters
    /// already set. Unknown ids yield a builder without parameters, which
    /// the factory rejects.
    #[must_use]
    fn method_pipeline<R: Send + 'static>(id: &str) -> PipelineBuilder<R> {
        let builder = PipelineBuilder::new(id);
        match Self::signatures().into_iter().find(|signature| signature.id == id) {
            Some(signature) => builder.parameters(signature.params),
            None => builder,
        }
    }
}
