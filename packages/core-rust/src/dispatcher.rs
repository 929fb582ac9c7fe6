//! Dispatches interface calls to the pipeline configured for each method.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, info_span};

use crate::appendix::AppendixStore;
use crate::context::ProtocolContext;
use crate::error::DispatchError;
use crate::pipeline::{ErasedPipeline, PipelineDescription};
use crate::types::{CallArgs, TypeInfo};

/// Routes calls by method identifier to immutable pipelines.
///
/// Holds no per-call state: every call gets a fresh context, so one
/// dispatcher can be shared across threads and invoked concurrently.
/// Calls to a method without a pipeline return
/// [`DispatchError::UnknownMethod`].
pub struct Dispatcher {
    interface: String,
    pipelines: HashMap<String, Arc<dyn ErasedPipeline>>,
}

impl Dispatcher {
    pub(crate) fn new(interface: String, pipelines: HashMap<String, Arc<dyn ErasedPipeline>>) -> Self {
        Self {
            interface,
            pipelines,
        }
    }

    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Configured method identifiers, sorted.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.pipelines.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    /// Runs the pipeline of `method` and returns the final result.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownMethod`] if no pipeline is configured,
    /// [`DispatchError::ReturnTypeMismatch`] if `R` is not the pipeline's
    /// result type, and any fatal error raised while the pipeline runs.
    pub fn invoke<R: Send + 'static>(&self, method: &str, args: &CallArgs) -> Result<Option<R>, DispatchError> {
        self.invoke_with::<R>(method, args, AppendixStore::new())
            .map(ProtocolContext::into_result)
    }

    /// Like [`invoke`](Self::invoke), but starts from a context seeded with
    /// `appendixes` and returns the whole final context.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub fn invoke_with<R: Send + 'static>(
        &self,
        method: &str,
        args: &CallArgs,
        appendixes: AppendixStore,
    ) -> Result<ProtocolContext<R>, DispatchError> {
        let span = info_span!(
            "dispatch",
            interface = %self.interface,
            method,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );
        let _entered = span.enter();

        let start = Instant::now();
        let result = self.run::<R>(method, args, appendixes);
        let duration_ms = start.elapsed().as_millis();

        let outcome = match &result {
            Ok(_) => "ok",
            Err(_) => "error",
        };

        #[allow(clippy::cast_possible_truncation)]
        let duration_u64 = duration_ms as u64;
        span.record("duration_ms", duration_u64);
        span.record("outcome", outcome);

        info!(
            interface = %self.interface,
            method,
            duration_ms = duration_u64,
            outcome,
            "dispatch complete"
        );

        result
    }

    fn run<R: Send + 'static>(
        &self,
        method: &str,
        args: &CallArgs,
        appendixes: AppendixStore,
    ) -> Result<ProtocolContext<R>, DispatchError> {
        let pipeline = self.pipelines.get(method).ok_or_else(|| DispatchError::UnknownMethod {
            interface: self.interface.clone(),
            method: method.to_string(),
        })?;

        let requested = TypeInfo::of::<R>();
        let mismatch = || DispatchError::ReturnTypeMismatch {
            method: method.to_string(),
            expected: pipeline.returns(),
            found: requested,
        };
        if pipeline.returns() != requested {
            return Err(mismatch());
        }

        pipeline
            .run(appendixes, args)?
            .downcast::<ProtocolContext<R>>()
            .map(|ctx| *ctx)
            .map_err(|_| mismatch())
    }

    /// Structural descriptions of every pipeline, sorted by method.
    #[must_use]
    pub fn describe(&self) -> Vec<PipelineDescription> {
        let mut descriptions: Vec<_> = self.pipelines.values().map(|p| p.describe()).collect();
        descriptions.sort_by(|a, b| a.method.cmp(&b.method));
        descriptions
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("interface", &self.interface)
            .field("methods", &self.methods())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appendix::OwnerId;
    use crate::argument::Argument;
    use crate::factory::DispatcherFactory;
    use crate::param::Arg;
    use crate::pipeline::PipelineBuilder;
    use crate::step::StepSpec;
    use crate::target::MethodTable;
    use crate::traits::StepTarget;

    const A: OwnerId = OwnerId::from_u128(0xA);
    const B: OwnerId = OwnerId::from_u128(0xB);

    /// Sets the result to 10.
    struct Start;
    /// Multiplies by 0.9; needs appendix A.
    struct Discount;
    /// Subtracts 1; needs appendix B.
    struct Rebate;

    impl StepTarget for Start {
        fn expose(methods: &mut MethodTable<Self>) {
            methods.method("compute", |_: &Self, ctx: ProtocolContext<f64>| -> anyhow::Result<_> {
                Ok(ctx.with_result(10.0))
            });
        }
    }

    impl StepTarget for Discount {
        fn expose(methods: &mut MethodTable<Self>) {
            methods.method(
                "compute",
                |_: &Self, ctx: ProtocolContext<f64>, _: Arg<String>| -> anyhow::Result<_> {
                    let value = ctx.result().copied().unwrap_or_default() * 0.9;
                    Ok(ctx.with_result(value))
                },
            );
        }
    }

    impl StepTarget for Rebate {
        fn expose(methods: &mut MethodTable<Self>) {
            methods.method(
                "compute",
                |_: &Self, ctx: ProtocolContext<f64>, _: Arg<String>| -> anyhow::Result<_> {
                    let value = ctx.result().copied().unwrap_or_default() - 1.0;
                    Ok(ctx.with_result(value))
                },
            );
        }
    }

    fn dispatcher() -> Dispatcher {
        DispatcherFactory::new("Calculator")
            .pipeline(
                PipelineBuilder::<f64>::new("compute")
                    .step(StepSpec::on(Arc::new(Start), "compute").arg(Argument::context()))
                    .step(
                        StepSpec::on(Arc::new(Discount), "compute")
                            .arg(Argument::context())
                            .arg(Argument::appendix::<String>(A)),
                    )
                    .step(
                        StepSpec::on(Arc::new(Rebate), "compute")
                            .arg(Argument::context())
                            .arg(Argument::appendix::<String>(B)),
                    ),
            )
            .pipeline(
                PipelineBuilder::<u32>::new("count")
                    .step(StepSpec::on(Arc::new(Counter), "count").arg(Argument::positional::<u32>(0))),
            )
            .build()
            .unwrap()
    }

    struct Counter;

    impl StepTarget for Counter {
        fn expose(methods: &mut MethodTable<Self>) {
            methods.method("count", |_: &Self, Arg(n): Arg<u32>| -> anyhow::Result<_> {
                Ok(ProtocolContext::of(n + 1))
            });
        }
    }

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.unwrap();
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn missing_appendix_skips_its_step() {
        let appendixes = AppendixStore::new().with(B, "b".to_string());
        let ctx = dispatcher()
            .invoke_with::<f64>("compute", &CallArgs::new(), appendixes)
            .unwrap();
        approx(ctx.into_result(), 9.0);
    }

    #[test]
    fn full_chain_applies_every_step() {
        let appendixes = AppendixStore::new()
            .with(A, "a".to_string())
            .with(B, "b".to_string());
        let ctx = dispatcher()
            .invoke_with::<f64>("compute", &CallArgs::new(), appendixes)
            .unwrap();
        approx(ctx.into_result(), 8.0);
    }

    #[test]
    fn unknown_method_leaves_others_working() {
        let dispatcher = dispatcher();
        let err = dispatcher.invoke::<f64>("unknown", &CallArgs::new()).unwrap_err();
        assert!(matches!(err, DispatchError::UnknownMethod { ref method, .. } if method == "unknown"));
        assert_eq!(dispatcher.invoke::<u32>("count", &CallArgs::new().with(1_u32)).unwrap(), Some(2));
    }

    #[test]
    fn positional_index_past_the_call_fails_every_call() {
        let dispatcher = DispatcherFactory::new("Calculator")
            .pipeline(
                PipelineBuilder::<u32>::new("count")
                    .step(StepSpec::on(Arc::new(Counter), "count").arg(Argument::positional::<u32>(5))),
            )
            .build()
            .unwrap();
        let args = CallArgs::new().with(1_u32).with(2_u32);
        for _ in 0..3 {
            let err = dispatcher.invoke::<u32>("count", &args).unwrap_err();
            assert!(matches!(err, DispatchError::IndexOutOfRange { index: 5, len: 2, .. }));
        }
    }

    #[test]
    fn wrong_return_type_is_rejected() {
        let err = dispatcher().invoke::<i32>("count", &CallArgs::new().with(1_u32)).unwrap_err();
        assert!(matches!(err, DispatchError::ReturnTypeMismatch { .. }));
    }

    #[test]
    fn lists_and_describes_methods() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.interface(), "Calculator");
        assert_eq!(dispatcher.methods(), vec!["compute", "count"]);
        let descriptions = dispatcher.describe();
        assert_eq!(descriptions[0].steps.len(), 3);
        assert_eq!(descriptions[1].method, "count");
    }
}
