//! Assembles dispatchers from pipeline configurations.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::dispatcher::Dispatcher;
use crate::error::BuildError;
use crate::pipeline::{PipelineAssembly, PipelineBuilder};
use crate::signature::{ChainInterface, MethodSignature};

/// Collects pipelines for one interface and builds a [`Dispatcher`].
///
/// ```ignore
/// let calculator: PriceCalculatorChain = DispatcherFactory::for_interface::<PriceCalculatorChain>()
///     .pipeline(PriceCalculatorChain::method_pipeline::<Money>("calculatePrice").step(...))
///     .build_interface()?;
/// ```
pub struct DispatcherFactory {
    interface: String,
    signatures: Option<Vec<MethodSignature>>,
    assemblies: Vec<Box<dyn PipelineAssembly>>,
}

impl DispatcherFactory {
    /// Factory for an interface known only by name; pipelines are not
    /// checked against any signature.
    #[must_use]
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            signatures: None,
            assemblies: Vec::new(),
        }
    }

    /// Factory whose pipelines must match the methods declared by `I`.
    #[must_use]
    pub fn for_interface<I: ChainInterface>() -> Self {
        Self {
            interface: I::NAME.to_string(),
            signatures: Some(I::signatures()),
            assemblies: Vec::new(),
        }
    }

    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    #[must_use]
    pub fn pipeline<T: Send + 'static>(self, pipeline: PipelineBuilder<T>) -> Self {
        self.assembly(Box::new(pipeline))
    }

    /// Adds a type-erased pipeline configuration.
    #[must_use]
    pub fn assembly(mut self, assembly: Box<dyn PipelineAssembly>) -> Self {
        self.assemblies.push(assembly);
        self
    }

    /// Validates and builds every pipeline.
    ///
    /// When the factory was created for an interface, a pipeline that
    /// declares no parameters of its own is built against the interface
    /// signature of its method.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DuplicateMethod`] if a method is configured
    /// twice, signature errors when the factory was created for an
    /// interface, and any step validation error.
    pub fn build(&self) -> Result<Dispatcher, BuildError> {
        self.build_against(self.signatures.as_deref())
    }

    /// Builds the dispatcher and wraps it in the interface implementation.
    ///
    /// Pipelines are always checked against the signatures of `I`, even if
    /// the factory was created by name only.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InterfaceMismatch`] if this factory was created
    /// for a different interface, or any error of [`build`](Self::build).
    pub fn build_interface<I: ChainInterface>(&self) -> Result<I, BuildError> {
        if self.interface != I::NAME {
            return Err(BuildError::InterfaceMismatch {
                configured: self.interface.clone(),
                requested: I::NAME.to_string(),
            });
        }
        let dispatcher = match &self.signatures {
            Some(signatures) => self.build_against(Some(signatures.as_slice())),
            None => self.build_against(Some(I::signatures().as_slice())),
        }?;
        Ok(I::from_dispatcher(Arc::new(dispatcher)))
    }

    fn build_against(&self, signatures: Option<&[MethodSignature]>) -> Result<Dispatcher, BuildError> {
        let mut pipelines = HashMap::with_capacity(self.assemblies.len());
        for assembly in &self.assemblies {
            let method = assembly.method();
            if pipelines.contains_key(method) {
                return Err(BuildError::DuplicateMethod {
                    interface: self.interface.clone(),
                    method: method.to_string(),
                });
            }
            let pipeline = match signatures {
                Some(signatures) => {
                    let signature = self.check_signature(signatures, assembly.as_ref())?;
                    assembly.assemble_declared(&signature.params)?
                }
                None => assembly.assemble()?,
            };
            pipelines.insert(method.to_string(), pipeline);
        }
        debug!(interface = %self.interface, pipelines = pipelines.len(), "built dispatcher");
        Ok(Dispatcher::new(self.interface.clone(), pipelines))
    }

    fn check_signature<'s>(
        &self,
        signatures: &'s [MethodSignature],
        assembly: &dyn PipelineAssembly,
    ) -> Result<&'s MethodSignature, BuildError> {
        let method = assembly.method();
        let Some(signature) = signatures.iter().find(|s| s.id == method) else {
            return Err(BuildError::MethodNotFound {
                target: self.interface.clone(),
                method: method.to_string(),
                reason: "interface declares no such method".to_string(),
            });
        };
        if signature.returns != assembly.returns() {
            return Err(BuildError::ReturnTypeMismatch {
                method: method.to_string(),
                expected: signature.returns,
                found: assembly.returns(),
            });
        }
        match assembly.parameters() {
            Some(params) if params != signature.params.as_slice() => Err(BuildError::SignatureMismatch {
                interface: self.interface.clone(),
                method: method.to_string(),
            }),
            _ => Ok(signature),
        }
    }
}

impl std::fmt::Debug for DispatcherFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherFactory")
            .field("interface", &self.interface)
            .field(
                "methods",
                &self.assemblies.iter().map(|a| a.method()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
