use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Runtime identity of a Rust type, paired with its name for diagnostics.
///
/// Equality and hashing use only the `TypeId`; the name is informational and is
/// what error messages and `Debug` output show.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Returns the `TypeInfo` for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this describes the type `T`.
    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Type-erased, shared value used for call arguments and appendix contents.
///
/// Cloning is cheap (an `Arc` bump). The concrete type is recovered with
/// [`ArgValue::downcast_ref`].
#[derive(Clone)]
pub struct ArgValue {
    value: Arc<dyn Any + Send + Sync>,
    type_info: TypeInfo,
}

impl ArgValue {
    #[must_use]
    pub fn new<A: Any + Send + Sync>(value: A) -> Self {
        Self {
            value: Arc::new(value),
            type_info: TypeInfo::of::<A>(),
        }
    }

    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    #[must_use]
    pub fn downcast_ref<A: Any>(&self) -> Option<&A> {
        self.value.downcast_ref::<A>()
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArgValue<{}>", self.type_info.name)
    }
}

/// Positional arguments of one interface call.
///
/// A slot may be null (`None`), mirroring a nullable parameter. The array is
/// never mutated by the engine and is shared unchanged by every step of a
/// pipeline.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    values: Vec<Option<ArgValue>>,
}

impl CallArgs {
    #[must_use]
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Appends a value and returns the arguments for chaining.
    #[must_use]
    pub fn with<A: Any + Send + Sync>(mut self, value: A) -> Self {
        self.push(value);
        self
    }

    /// Appends a null slot and returns the arguments for chaining.
    #[must_use]
    pub fn with_null(mut self) -> Self {
        self.push_null();
        self
    }

    pub fn push<A: Any + Send + Sync>(&mut self, value: A) {
        self.values.push(Some(ArgValue::new(value)));
    }

    pub fn push_null(&mut self) {
        self.values.push(None);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the slot at `index`: `None` if out of range, `Some(None)` if null.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<Option<&ArgValue>> {
        self.values.get(index).map(Option::as_ref)
    }

    /// Typed view of the value at `index`, if present and of type `A`.
    #[must_use]
    pub fn value<A: Any>(&self, index: usize) -> Option<&A> {
        self.values
            .get(index)
            .and_then(Option::as_ref)
            .and_then(ArgValue::downcast_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_info_equality_ignores_name_and_compares_ids() {
        assert_eq!(TypeInfo::of::<u32>(), TypeInfo::of::<u32>());
        assert_ne!(TypeInfo::of::<u32>(), TypeInfo::of::<i32>());
        assert!(TypeInfo::of::<String>().is::<String>());
        assert!(TypeInfo::of::<String>().name().ends_with("String"));
    }

    #[test]
    fn call_args_slots_distinguish_null_from_out_of_range() {
        let args = CallArgs::new().with(7_u32).with_null();

        assert_eq!(args.len(), 2);
        assert!(args.slot(0).unwrap().is_some());
        assert!(args.slot(1).unwrap().is_none());
        assert!(args.slot(2).is_none());
    }

    #[test]
    fn call_args_typed_access() {
        let args = CallArgs::new().with("article".to_string()).with(3_i64);

        assert_eq!(args.value::<String>(0).map(String::as_str), Some("article"));
        assert_eq!(args.value::<i64>(1), Some(&3));
        // Wrong type yields None rather than panicking.
        assert_eq!(args.value::<u8>(1), None);
    }

    #[test]
    fn arg_value_clone_shares_content() {
        let value = ArgValue::new(vec![1, 2, 3]);
        let copy = value.clone();
        assert_eq!(copy.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));
        assert!(copy.type_info().is::<Vec<i32>>());
        assert_eq!(format!("{value:?}"), format!("ArgValue<{}>", std::any::type_name::<Vec<i32>>()));
    }
}
