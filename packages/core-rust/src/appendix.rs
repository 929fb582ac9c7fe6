//! Owner-tagged side-channel attachments carried alongside a call.
//!
//! An [`Appendix`] is a typed value contributed by a domain module, identified
//! by its [`OwnerId`]. The [`AppendixStore`] indexes appendixes by
//! `(owner, type)`; one slot may hold any number of values.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ArgValue, TypeInfo};

// ---------------------------------------------------------------------------
// OwnerId
// ---------------------------------------------------------------------------

/// Opaque identifier of the domain module that contributed an appendix.
///
/// Used purely as a lookup key; it implies no ownership relation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Creates an owner id from a fixed value, usable in `const` items.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Creates a random owner id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for OwnerId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({})", self.0)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ---------------------------------------------------------------------------
// Appendix
// ---------------------------------------------------------------------------

/// A single typed attachment. Immutable once created.
#[derive(Debug, Clone)]
pub struct Appendix {
    owner: OwnerId,
    content: ArgValue,
}

impl Appendix {
    #[must_use]
    pub fn new<A: Any + Send + Sync>(owner: OwnerId, content: A) -> Self {
        Self {
            owner,
            content: ArgValue::new(content),
        }
    }

    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    #[must_use]
    pub fn content(&self) -> &ArgValue {
        &self.content
    }

    #[must_use]
    pub fn content_type(&self) -> TypeInfo {
        self.content.type_info()
    }
}

// ---------------------------------------------------------------------------
// AppendixStore
// ---------------------------------------------------------------------------

/// Lookup key of an appendix slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppendixKey {
    pub owner: OwnerId,
    pub content_type: TypeInfo,
}

/// Appendixes of one call, indexed by `(owner, content type)`.
///
/// Values within a slot keep their attachment order. Cloning the store clones
/// the index only; contents are shared.
#[derive(Debug, Clone, Default)]
pub struct AppendixStore {
    slots: HashMap<AppendixKey, Vec<Appendix>>,
}

impl AppendixStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `content` under `owner`.
    pub fn attach<A: Any + Send + Sync>(&mut self, owner: OwnerId, content: A) {
        self.insert(Appendix::new(owner, content));
    }

    /// Attaches `content` under `owner` and returns the store for chaining.
    #[must_use]
    pub fn with<A: Any + Send + Sync>(mut self, owner: OwnerId, content: A) -> Self {
        self.attach(owner, content);
        self
    }

    /// Inserts an already constructed appendix.
    pub fn insert(&mut self, appendix: Appendix) {
        let key = AppendixKey {
            owner: appendix.owner(),
            content_type: appendix.content_type(),
        };
        self.slots.entry(key).or_default().push(appendix);
    }

    /// Copies every appendix of `other` into this store.
    pub fn extend_from(&mut self, other: &AppendixStore) {
        for appendix in other.iter() {
            self.insert(appendix.clone());
        }
    }

    /// First appendix of type `A` attached by `owner`.
    #[must_use]
    pub fn get<A: Any>(&self, owner: OwnerId) -> Option<&A> {
        self.first(owner, TypeInfo::of::<A>())
            .and_then(|appendix| appendix.content().downcast_ref::<A>())
    }

    /// All appendixes of type `A` attached by `owner`, in attachment order.
    pub fn get_all<A: Any>(&self, owner: OwnerId) -> impl Iterator<Item = &A> {
        self.all(owner, TypeInfo::of::<A>())
            .iter()
            .filter_map(|appendix| appendix.content().downcast_ref::<A>())
    }

    /// First appendix in the `(owner, content_type)` slot.
    #[must_use]
    pub fn first(&self, owner: OwnerId, content_type: TypeInfo) -> Option<&Appendix> {
        self.all(owner, content_type).first()
    }

    /// Every appendix in the `(owner, content_type)` slot.
    #[must_use]
    pub fn all(&self, owner: OwnerId, content_type: TypeInfo) -> &[Appendix] {
        self.slots
            .get(&AppendixKey {
                owner,
                content_type,
            })
            .map_or(&[][..], Vec::as_slice)
    }

    #[must_use]
    pub fn contains<A: Any>(&self, owner: OwnerId) -> bool {
        !self.all(owner, TypeInfo::of::<A>()).is_empty()
    }

    /// Removes and returns the `(owner, A)` slot.
    pub fn remove<A: Any>(&mut self, owner: OwnerId) -> Vec<Appendix> {
        self.slots
            .remove(&AppendixKey {
                owner,
                content_type: TypeInfo::of::<A>(),
            })
            .unwrap_or_default()
    }

    /// Iterates all appendixes. Order across slots is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = &Appendix> {
        self.slots.values().flatten()
    }

    /// Total number of appendixes across all slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.values().all(Vec::is_empty)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
