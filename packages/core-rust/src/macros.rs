/// Generates a struct implementing a trait by forwarding every method to a
/// [`Dispatcher`](crate::Dispatcher).
///
/// Each method names its pipeline identifier after `=>`. The trait method
/// must return `Result<Option<R>, DispatchError>` where `R` is the type after
/// `->`. Parameters marked `#[required]` fail the call when null.
///
/// ```ignore
/// pub trait PriceCalculator {
///     fn calculate_price(&self, article: Article, customer: Customer)
///         -> Result<Option<Money>, DispatchError>;
/// }
///
/// chain_interface! {
///     pub struct PriceCalculatorChain implements PriceCalculator {
///         fn calculate_price(&self, #[required] article: Article, #[required] customer: Customer)
///             -> Money => "calculatePrice";
///     }
/// }
/// ```
///
/// The generated struct implements [`ChainInterface`](crate::ChainInterface)
/// with `NAME` set to the trait name.
#[macro_export]
macro_rules! chain_interface {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident implements $iface:ident {
            $(
                $(#[$fmeta:meta])*
                fn $method:ident(&self $(, $(#[$flag:ident])? $arg:ident : $ty:ty)*) -> $ret:ty => $id:literal;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $name {
            dispatcher: ::std::sync::Arc<$crate::Dispatcher>,
        }

        impl $crate::ChainInterface for $name {
            const NAME: &'static str = ::core::stringify!($iface);

            fn signatures() -> ::std::vec::Vec<$crate::MethodSignature> {
                ::std::vec![$(
                    $crate::MethodSignature::new::<$ret>(
                        $id,
                        ::std::vec![$(
                            $crate::Parameter::of::<$ty>($crate::__chain_required!($($flag)?))
                        ),*],
                    )
                ),*]
            }

            fn pipeline(id: &str) -> ::core::option::Option<::std::boxed::Box<dyn $crate::PipelineAssembly>> {
                match id {
                    $(
                        $id => ::core::option::Option::Some(::std::boxed::Box::new(
                            <Self as $crate::ChainInterface>::method_pipeline::<$ret>($id),
                        )),
                    )*
                    _ => ::core::option::Option::None,
                }
            }

            fn from_dispatcher(dispatcher: ::std::sync::Arc<$crate::Dispatcher>) -> Self {
                Self { dispatcher }
            }

            fn dispatcher(&self) -> &::std::sync::Arc<$crate::Dispatcher> {
                &self.dispatcher
            }
        }

        impl $iface for $name {
            $(
                $(#[$fmeta])*
                fn $method(&self $(, $arg: $ty)*)
                    -> ::core::result::Result<::core::option::Option<$ret>, $crate::DispatchError>
                {
                    #[allow(unused_mut)]
                    let mut args = $crate::CallArgs::new();
                    $( args.push($arg); )*
                    self.dispatcher.invoke::<$ret>($id, &args)
                }
            )*
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(::core::stringify!($name))
                    .field("dispatcher", &self.dispatcher)
                    .finish()
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __chain_required {
    () => {
        false
    };
    (required) => {
        true
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
