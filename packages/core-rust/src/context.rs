use std::any::Any;

use crate::appendix::{AppendixStore, OwnerId};

/// Per-call state threaded through a pipeline: the result produced so far and
/// the appendixes attached to the call.
///
/// A context belongs to exactly one top-level call. The dispatcher creates it
/// empty, each step that runs replaces it with the context it returns, and the
/// dispatcher unwraps the final `result`. Nothing is merged between the context
/// a step receives and the one it returns: a step that wants to keep earlier
/// appendixes or the previous result must carry them over itself, for example
/// by taking the incoming context as an argument and returning it modified.
#[derive(Debug, Clone)]
pub struct ProtocolContext<T> {
    result: Option<T>,
    appendixes: AppendixStore,
}

impl<T> ProtocolContext<T> {
    /// Creates an empty context: no result, no appendixes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            result: None,
            appendixes: AppendixStore::new(),
        }
    }

    /// Creates a context holding only `result`.
    #[must_use]
    pub fn of(result: T) -> Self {
        Self {
            result: Some(result),
            appendixes: AppendixStore::new(),
        }
    }

    /// Creates a context without result, seeded with `appendixes`.
    #[must_use]
    pub fn from_appendixes(appendixes: AppendixStore) -> Self {
        Self {
            result: None,
            appendixes,
        }
    }

    #[must_use]
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn result_mut(&mut self) -> Option<&mut T> {
        self.result.as_mut()
    }

    pub fn set_result(&mut self, result: T) {
        self.result = Some(result);
    }

    pub fn take_result(&mut self) -> Option<T> {
        self.result.take()
    }

    /// Replaces the result, keeping the appendixes.
    #[must_use]
    pub fn with_result(mut self, result: T) -> Self {
        self.result = Some(result);
        self
    }

    /// Consumes the context, returning the result.
    #[must_use]
    pub fn into_result(self) -> Option<T> {
        self.result
    }

    /// Consumes the context, returning result and appendixes.
    #[must_use]
    pub fn into_parts(self) -> (Option<T>, AppendixStore) {
        (self.result, self.appendixes)
    }

    #[must_use]
    pub fn appendixes(&self) -> &AppendixStore {
        &self.appendixes
    }

    pub fn appendixes_mut(&mut self) -> &mut AppendixStore {
        &mut self.appendixes
    }

    /// Attaches an appendix to this context.
    pub fn attach<A: Any + Send + Sync>(&mut self, owner: OwnerId, content: A) {
        self.appendixes.attach(owner, content);
    }

    /// Attaches an appendix and returns the context for chaining.
    #[must_use]
    pub fn with_appendix<A: Any + Send + Sync>(mut self, owner: OwnerId, content: A) -> Self {
        self.appendixes.attach(owner, content);
        self
    }

    #[must_use]
    pub fn appendix<A: Any>(&self, owner: OwnerId) -> Option<&A> {
        self.appendixes.get(owner)
    }

    /// Maps the result to another type, keeping the appendixes.
    #[must_use]
    pub fn map_result<U, F>(self, f: F) -> ProtocolContext<U>
    where
        F: FnOnce(T) -> U,
    {
        ProtocolContext {
            result: self.result.map(f),
            appendixes: self.appendixes,
        }
    }
}

impl<T> Default for ProtocolContext<T> {
    fn default() -> Self {
        Self::new()
    }
}
