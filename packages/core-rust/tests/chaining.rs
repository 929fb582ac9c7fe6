//! End-to-end behaviour of built dispatchers: skip masks, build idempotence and
//! isolation of concurrent calls.

use std::sync::Arc;

use daisychain_core::{
    AppendixStore, Arg, Argument, CallArgs, Dispatcher, DispatcherFactory, MethodTable, OwnerId, PipelineBuilder,
    ProtocolContext, StepSpec, StepTarget,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Adds `1 << bit` to the running total; needs a `u8` appendix of its owner.
struct BitSetter {
    bit: u32,
}

impl BitSetter {
    fn set(&self, ctx: ProtocolContext<u32>, _marker: Arg<u8>) -> anyhow::Result<ProtocolContext<u32>> {
        let total = ctx.result().copied().unwrap_or(0) | (1 << self.bit);
        Ok(ctx.with_result(total))
    }
}

impl StepTarget for BitSetter {
    fn expose(methods: &mut MethodTable<Self>) {
        methods.method("set", Self::set);
    }

    fn target_name() -> &'static str {
        "BitSetter"
    }
}

fn owner(bit: u32) -> OwnerId {
    OwnerId::from_u128(0x100 + u128::from(bit))
}

const BITS: u32 = 6;

fn bit_pipeline() -> PipelineBuilder<u32> {
    (0..BITS).fold(PipelineBuilder::new("mask"), |builder, bit| {
        builder.step(
            StepSpec::on(Arc::new(BitSetter { bit }), "set")
                .arg(Argument::context())
                .arg(Argument::appendix::<u8>(owner(bit))),
        )
    })
}

/// Echoes its call argument combined with the caller's appendix.
struct Echo;

const CALLER: OwnerId = OwnerId::from_u128(0xCA11);

impl StepTarget for Echo {
    fn expose(methods: &mut MethodTable<Self>) {
        methods.method(
            "echo",
            |_: &Self, Arg(id): Arg<u64>, Arg(tag): Arg<String>| -> anyhow::Result<_> {
                Ok(ProtocolContext::of(format!("{id}:{tag}")))
            },
        );
    }
}

fn dispatcher() -> Dispatcher {
    DispatcherFactory::new("Chain")
        .pipeline(bit_pipeline())
        .pipeline(
            PipelineBuilder::<String>::new("echo")
                .required_parameter::<u64>()
                .step(
                    StepSpec::on(Arc::new(Echo), "echo")
                        .arg(Argument::positional::<u64>(0))
                        .arg(Argument::appendix::<String>(CALLER)),
                ),
        )
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn only_steps_with_their_appendix_run(mask in 0_u32..(1 << BITS)) {
        let mut appendixes = AppendixStore::new();
        for bit in (0..BITS).filter(|bit| mask & (1 << bit) != 0) {
            appendixes.attach(owner(bit), 1_u8);
        }

        let ctx = dispatcher()
            .invoke_with::<u32>("mask", &CallArgs::new(), appendixes)
            .unwrap();
        let expected = if mask == 0 { None } else { Some(mask) };
        prop_assert_eq!(ctx.result().copied(), expected);
    }
}

#[test]
fn identical_configuration_builds_identical_dispatchers() {
    let first = dispatcher();
    let second = dispatcher();
    assert_eq!(first.describe(), second.describe());

    let appendixes = || AppendixStore::new().with(owner(1), 1_u8).with(owner(3), 1_u8);
    let a = first.invoke_with::<u32>("mask", &CallArgs::new(), appendixes()).unwrap();
    let b = second.invoke_with::<u32>("mask", &CallArgs::new(), appendixes()).unwrap();
    assert_eq!(a.result(), b.result());
    assert_eq!(a.result(), Some(&0b1010));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_never_share_context() {
    let dispatcher = Arc::new(dispatcher());

    let handles: Vec<_> = (0..64_u64)
        .map(|id| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::task::spawn_blocking(move || {
                let appendixes = AppendixStore::new().with(CALLER, format!("caller-{id}"));
                let ctx = dispatcher
                    .invoke_with::<String>("echo", &CallArgs::new().with(id), appendixes)
                    .unwrap();
                (id, ctx.into_result())
            })
        })
        .collect();

    for handle in handles {
        let (id, result) = handle.await.unwrap();
        assert_eq!(result, Some(format!("{id}:caller-{id}")));
    }
}
