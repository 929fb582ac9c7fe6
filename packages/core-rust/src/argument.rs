//! Argument resolvers: where each target parameter gets its value from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::appendix::OwnerId;
use crate::context::ProtocolContext;
use crate::error::{DispatchError, MissingReason, MissingRequiredArgument};
use crate::param::Resolved;
use crate::types::{CallArgs, TypeInfo};

// ---------------------------------------------------------------------------
// ArgumentSource
// ---------------------------------------------------------------------------

/// Where an argument is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum ArgumentSource {
    /// Positional argument of the interface call.
    #[serde(rename = "call")]
    Positional { index: usize },
    /// First appendix in the `(owner, type)` slot.
    Appendix { owner: OwnerId },
    /// Every appendix in the `(owner, type)` slot.
    AppendixSet { owner: OwnerId },
    /// The context the step receives.
    Context,
}

impl fmt::Display for ArgumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional { index } => write!(f, "call[{index}]"),
            Self::Appendix { owner } => write!(f, "appendix({owner})"),
            Self::AppendixSet { owner } => write!(f, "appendix_set({owner})"),
            Self::Context => f.write_str("context"),
        }
    }
}

// ---------------------------------------------------------------------------
// Argument
// ---------------------------------------------------------------------------

/// One configured argument of a step.
///
/// `ty` is the expected value type (the element type for sets). When left as
/// `None` the step takes it from the target parameter at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Argument {
    pub source: ArgumentSource,
    pub ty: Option<TypeInfo>,
    pub required: bool,
    pub required_not_empty: bool,
}

impl Argument {
    /// Argument without a declared type; see [`Argument::ty`].
    #[must_use]
    pub fn inferred(source: ArgumentSource) -> Self {
        Self {
            source,
            ty: None,
            required: false,
            required_not_empty: false,
        }
    }

    fn typed<A: 'static>(source: ArgumentSource) -> Self {
        Self {
            ty: Some(TypeInfo::of::<A>()),
            ..Self::inferred(source)
        }
    }

    /// Reads the call argument at `index`.
    #[must_use]
    pub fn positional<A: 'static>(index: usize) -> Self {
        Self::typed::<A>(ArgumentSource::Positional { index })
    }

    /// Reads the first appendix of type `A` attached by `owner`.
    #[must_use]
    pub fn appendix<A: 'static>(owner: OwnerId) -> Self {
        Self::typed::<A>(ArgumentSource::Appendix { owner })
    }

    /// Reads every appendix of type `A` attached by `owner`.
    #[must_use]
    pub fn appendix_set<A: 'static>(owner: OwnerId) -> Self {
        Self::typed::<A>(ArgumentSource::AppendixSet { owner })
    }

    /// Passes the incoming context.
    #[must_use]
    pub fn context() -> Self {
        Self::inferred(ArgumentSource::Context)
    }

    /// Marks the argument required: if it cannot be resolved the step is skipped.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks a set argument required and non-empty.
    #[must_use]
    pub fn required_not_empty(mut self) -> Self {
        self.required = true;
        self.required_not_empty = true;
        self
    }

    /// Resolves the argument against one call.
    ///
    /// Reads `ctx` and `args` only. A context argument resolves to an empty
    /// placeholder the step fills right before invoking the target.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::IndexOutOfRange`] when a positional index is
    /// past the call arguments, and [`DispatchError::ArgumentTypeMismatch`]
    /// when a call argument has another type than expected.
    pub fn resolve<T>(
        &self,
        ctx: &ProtocolContext<T>,
        args: &CallArgs,
        site: &ResolveSite<'_>,
    ) -> Result<Resolution, DispatchError> {
        match self.source {
            ArgumentSource::Positional { index } => match args.slot(index) {
                None => Err(DispatchError::IndexOutOfRange {
                    target: site.target,
                    method: site.method.to_string(),
                    position: site.position,
                    index,
                    len: args.len(),
                }),
                Some(None) => Ok(self.absent(site, MissingReason::Absent)),
                Some(Some(value)) if value.type_info() == site.ty => {
                    Ok(Resolution::Present(Resolved::Value(value.clone())))
                }
                Some(Some(value)) => Err(DispatchError::ArgumentTypeMismatch {
                    method: site.method.to_string(),
                    position: site.position,
                    expected: site.ty,
                    found: value.type_info(),
                }),
            },
            ArgumentSource::Appendix { owner } => {
                match ctx.appendixes().first(owner, site.ty) {
                    Some(appendix) => Ok(Resolution::Present(Resolved::Value(
                        appendix.content().clone(),
                    ))),
                    None => Ok(self.absent(site, MissingReason::Absent)),
                }
            }
            ArgumentSource::AppendixSet { owner } => {
                let values: Vec<_> = ctx
                    .appendixes()
                    .all(owner, site.ty)
                    .iter()
                    .map(|appendix| appendix.content().clone())
                    .collect();
                if values.is_empty() && self.required_not_empty {
                    Ok(Resolution::Skip(site.missing(MissingReason::EmptySet)))
                } else {
                    Ok(Resolution::Present(Resolved::Set(values)))
                }
            }
            ArgumentSource::Context => Ok(Resolution::Present(Resolved::Context(None))),
        }
    }

    fn absent(&self, site: &ResolveSite<'_>, reason: MissingReason) -> Resolution {
        if self.required {
            Resolution::Skip(site.missing(reason))
        } else {
            Resolution::Present(Resolved::Absent)
        }
    }
}

/// Position of an argument within a step, used for error reporting.
#[derive(Debug, Clone, Copy)]
pub struct ResolveSite<'a> {
    pub target: &'static str,
    pub method: &'a str,
    pub position: usize,
    /// Expected value type, or element type for sets.
    pub ty: TypeInfo,
}

impl ResolveSite<'_> {
    fn missing(&self, reason: MissingReason) -> MissingRequiredArgument {
        MissingRequiredArgument {
            target: self.target,
            method: self.method.to_string(),
            position: self.position,
            argument_type: self.ty,
            reason,
        }
    }
}

/// Outcome of a resolution that did not fail fatally.
#[derive(Debug)]
pub enum Resolution {
    Present(Resolved),
    /// A required argument is missing; the step must be skipped.
    Skip(MissingRequiredArgument),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const EMPLOYMENT: OwnerId = OwnerId::from_u128(1);
    const MARKETING: OwnerId = OwnerId::from_u128(2);

    fn site<A: 'static>() -> ResolveSite<'static> {
        ResolveSite {
            target: "Calc",
            method: "price",
            position: 0,
            ty: TypeInfo::of::<A>(),
        }
    }

    fn value_of<A: 'static + Copy>(resolution: Resolution) -> A {
        match resolution {
            Resolution::Present(Resolved::Value(value)) => *value.downcast_ref::<A>().unwrap(),
            other => panic!("expected a value, got {other:?}"),
        }
    }

    #[test]
    fn positional_reads_call_argument() {
        let args = CallArgs::new().with(3_u32).with(7_u32);
        let resolution = Argument::positional::<u32>(1)
            .resolve(&ProtocolContext::<()>::new(), &args, &site::<u32>())
            .unwrap();
        assert_eq!(value_of::<u32>(resolution), 7);
    }

    #[test]
    fn positional_past_end_is_fatal() {
        let args = CallArgs::new().with(1_u32).with(2_u32);
        let err = Argument::positional::<u32>(5)
            .resolve(&ProtocolContext::<()>::new(), &args, &site::<u32>())
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::IndexOutOfRange { index: 5, len: 2, .. }
        ));
    }

    #[test]
    fn positional_type_mismatch_is_fatal() {
        let args = CallArgs::new().with("text");
        let err = Argument::positional::<u32>(0)
            .resolve(&ProtocolContext::<()>::new(), &args, &site::<u32>())
            .unwrap_err();
        assert!(matches!(err, DispatchError::ArgumentTypeMismatch { .. }));
    }

    #[test]
    fn null_positional_skips_only_when_required() {
        let args = CallArgs::new().with_null();
        let ctx = ProtocolContext::<()>::new();

        let optional = Argument::positional::<u32>(0)
            .resolve(&ctx, &args, &site::<u32>())
            .unwrap();
        assert!(matches!(optional, Resolution::Present(Resolved::Absent)));

        let required = Argument::positional::<u32>(0)
            .required()
            .resolve(&ctx, &args, &site::<u32>())
            .unwrap();
        assert!(matches!(required, Resolution::Skip(_)));
    }

    #[test]
    fn appendix_matches_owner_and_type() {
        let ctx = ProtocolContext::<()>::new()
            .with_appendix(EMPLOYMENT, 10_u32)
            .with_appendix(EMPLOYMENT, 20_u32)
            .with_appendix(MARKETING, 30_u32);
        let args = CallArgs::new();

        let first = Argument::appendix::<u32>(EMPLOYMENT)
            .resolve(&ctx, &args, &site::<u32>())
            .unwrap();
        assert_eq!(value_of::<u32>(first), 10);

        let other_type = Argument::appendix::<u64>(EMPLOYMENT)
            .required()
            .resolve(&ctx, &args, &site::<u64>())
            .unwrap();
        match other_type {
            Resolution::Skip(missing) => {
                assert_eq!(missing.reason, MissingReason::Absent);
                assert_eq!(missing.argument_type, TypeInfo::of::<u64>());
            }
            Resolution::Present(resolved) => panic!("expected skip, got {resolved:?}"),
        }
    }

    #[test]
    fn empty_set_skips_only_when_required_not_empty() {
        let ctx = ProtocolContext::<()>::new();
        let args = CallArgs::new();

        let required = Argument::appendix_set::<u32>(MARKETING)
            .required()
            .resolve(&ctx, &args, &site::<u32>())
            .unwrap();
        assert!(matches!(required, Resolution::Present(Resolved::Set(ref v)) if v.is_empty()));

        let not_empty = Argument::appendix_set::<u32>(MARKETING)
            .required_not_empty()
            .resolve(&ctx, &args, &site::<u32>())
            .unwrap();
        assert!(matches!(
            not_empty,
            Resolution::Skip(MissingRequiredArgument { reason: MissingReason::EmptySet, .. })
        ));
    }

    #[test]
    fn context_resolves_to_placeholder() {
        let resolution = Argument::context()
            .resolve(&ProtocolContext::of(1_u8), &CallArgs::new(), &site::<u8>())
            .unwrap();
        assert!(matches!(resolution, Resolution::Present(Resolved::Context(None))));
    }

    #[test]
    fn source_deserializes_from_tagged_json() {
        let source: ArgumentSource = serde_json::from_str(r#"{"from":"call","index":1}"#).unwrap();
        assert_eq!(source, ArgumentSource::Positional { index: 1 });
        let source: ArgumentSource = serde_json::from_str(r#"{"from":"context"}"#).unwrap();
        assert_eq!(source, ArgumentSource::Context);
    }

    proptest! {
        #[test]
        fn positional_bounds_follow_call_length(len in 0_usize..8, index in 0_usize..12) {
            let mut args = CallArgs::new();
            for i in 0..len {
                args.push(i);
            }
            let result = Argument::positional::<usize>(index)
                .resolve(&ProtocolContext::<()>::new(), &args, &site::<usize>());
            if index < len {
                prop_assert_eq!(value_of::<usize>(result.unwrap()), index);
            } else {
                let is_out_of_range = matches!(result, Err(DispatchError::IndexOutOfRange { .. }));
                prop_assert!(is_out_of_range);
            }
        }

        #[test]
        fn set_holds_every_matching_appendix(values in proptest::collection::vec(any::<u16>(), 0..10)) {
            let mut ctx = ProtocolContext::<()>::new();
            for value in &values {
                ctx.attach(MARKETING, *value);
            }
            ctx.attach(EMPLOYMENT, 0_u16);
            let resolution = Argument::appendix_set::<u16>(MARKETING)
                .resolve(&ctx, &CallArgs::new(), &site::<u16>())
                .unwrap();
            let Resolution::Present(Resolved::Set(set)) = resolution else {
                return Err(TestCaseError::fail("expected a set"));
            };
            let read: Vec<u16> = set.iter().map(|v| *v.downcast_ref::<u16>().unwrap()).collect();
            prop_assert_eq!(read, values);
        }
    }
}
