use crate::context::ProtocolContext;
use crate::param::{Param, ParamShape, Resolved};
use crate::target::MethodTable;

/// An implementation whose methods can be chained as pipeline steps.
///
/// Instead of discovering methods reflectively, a target lists the methods it
/// offers in [`expose`](StepTarget::expose). Each exposed method has a stable
/// identifier, typed parameters (see [`crate::param`]) and returns
/// `anyhow::Result<ProtocolContext<T>>`.
///
/// ```ignore
/// impl StepTarget for BasePriceCalculator {
///     fn expose(methods: &mut MethodTable<Self>) {
///         methods.method("calculatePrice", Self::calculate_price);
///     }
/// }
/// ```
pub trait StepTarget: Send + Sync + 'static {
    fn expose(methods: &mut MethodTable<Self>)
    where
        Self: Sized;

    /// Name used in logs and errors. Defaults to the Rust type name.
    fn target_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

/// A callable that can be registered as a target method.
///
/// Implemented for every `Fn(&S, P1, .., Pn) -> anyhow::Result<ProtocolContext<T>>`
/// whose parameters implement [`Param`], for up to eight parameters. `Args` is
/// the parameter tuple and only disambiguates the arities.
pub trait Handler<S, Args, T>: Send + Sync + 'static {
    /// Declared parameter shapes, in call order.
    fn params() -> Vec<ParamShape>;

    /// Calls the handler with already resolved arguments.
    ///
    /// # Errors
    ///
    /// Returns the handler's own error, or an error if `args` does not fit the
    /// declared parameters.
    fn call(&self, target: &S, args: Vec<Resolved>) -> anyhow::Result<ProtocolContext<T>>;
}

macro_rules! impl_handler {
    ($($param:ident),*) => {
        impl<S, F, T, $($param,)*> Handler<S, ($($param,)*), T> for F
        where
            F: Fn(&S, $($param),*) -> anyhow::Result<ProtocolContext<T>> + Send + Sync + 'static,
            $($param: Param,)*
        {
            fn params() -> Vec<ParamShape> {
                vec![$($param::shape()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, target: &S, args: Vec<Resolved>) -> anyhow::Result<ProtocolContext<T>> {
                let arity = args.len();
                let mut args = args.into_iter();
                $(
                    let $param = $param::from_resolved(args.next().ok_or_else(|| {
                        anyhow::anyhow!("handler received {arity} arguments, too few for its parameters")
                    })?)?;
                )*
                (self)(target, $($param),*)
            }
        }
    };
}

impl_handler!();
impl_handler!(P1);
impl_handler!(P1, P2);
impl_handler!(P1, P2, P3);
impl_handler!(P1, P2, P3, P4);
impl_handler!(P1, P2, P3, P4, P5);
impl_handler!(P1, P2, P3, P4, P5, P6);
impl_handler!(P1, P2, P3, P4, P5, P6, P7);
impl_handler!(P1, P2, P3, P4, P5, P6, P7, P8);
