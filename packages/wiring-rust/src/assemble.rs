use daisychain_core::{BuildError, ChainInterface, DispatcherFactory, StepSpec};
use tracing::{debug, info};

use crate::config::ChainConfig;
use crate::error::WiringError;
use crate::registry::TargetRegistry;

/// Builds the interface implementation described by `config`.
///
/// Targets and owners are looked up by name in `registry`. Argument types are
/// taken from the target method parameters, so configurations never name Rust
/// types.
///
/// # Errors
///
/// Returns [`WiringError::InterfaceMismatch`] if the configuration is for
/// another interface, [`WiringError::UnknownTarget`] /
/// [`WiringError::UnknownOwner`] for unregistered names and
/// [`WiringError::Build`] when the pipelines fail validation.
pub fn assemble<I: ChainInterface>(config: &ChainConfig, registry: &TargetRegistry) -> Result<I, WiringError> {
    if config.interface != I::NAME {
        return Err(WiringError::InterfaceMismatch {
            configured: config.interface.clone(),
            expected: I::NAME.to_string(),
        });
    }

    let mut factory = DispatcherFactory::for_interface::<I>();
    for pipeline in &config.pipelines {
        let mut assembly = I::pipeline(&pipeline.method).ok_or_else(|| BuildError::MethodNotFound {
            target: I::NAME.to_string(),
            method: pipeline.method.clone(),
            reason: "interface declares no such method".to_string(),
        })?;

        for step in &pipeline.steps {
            let target = registry.target(&step.target).ok_or_else(|| WiringError::UnknownTarget {
                name: step.target.clone(),
            })?;
            let method = step.method.as_deref().unwrap_or(&pipeline.method);
            let arguments = step
                .arguments
                .iter()
                .map(|argument| argument.to_argument(registry))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(
                pipeline = %pipeline.method,
                step_target = %step.target,
                method,
                "configured step"
            );
            assembly.push_step(StepSpec::new(target, method).args(arguments));
        }
        factory = factory.assembly(assembly);
    }

    let chain = factory.build_interface::<I>()?;
    info!(
        interface = I::NAME,
        pipelines = config.pipelines.len(),
        "assembled chain"
    );
    Ok(chain)
}
