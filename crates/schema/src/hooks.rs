//! Function hooks carried by schema definitions
//!
//! Hooks are shared closures. Two hooks are equal only when they are the same
//! allocation, which is what makes "re-register the identical schema" idempotent
//! while two separately built schemas with look-alike closures still conflict.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::context::SummaryContext;
use crate::error::{MutatorError, SummaryError};
use crate::mutation::MutatorArgs;

/// Cross-field predicate run after every per-field check passed.
pub type ValidateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// Zero-argument factory producing a complete instance.
pub type DefaultFn = dyn Fn() -> Value + Send + Sync;

/// Field-level default generator.
pub type GenerateFn = dyn Fn() -> Value + Send + Sync;

/// Whole-instance summary used for the `llm` audience.
pub type SummarizeFn =
    dyn Fn(&Value, &SummaryContext<'_>) -> Result<String, SummaryError> + Send + Sync;

/// Summary of one field value when its visibility is `summarized`.
pub type FieldSummarizeFn =
    dyn Fn(&Value, &SummaryContext<'_>) -> Result<String, SummaryError> + Send + Sync;

/// Per-audience formatting override for a whole instance.
pub type RenderFn =
    dyn Fn(&Value, &SummaryContext<'_>) -> Result<String, SummaryError> + Send + Sync;

/// Named mutation applied to a working copy of the component instance.
pub type MutatorFn =
    dyn Fn(&mut Value, &MutatorArgs<'_>) -> Result<(), MutatorError> + Send + Sync;

/// A shared, identity-compared closure.
pub struct Hook<F: ?Sized>(Arc<F>);

impl<F: ?Sized> Hook<F> {
    pub fn from_arc(inner: Arc<F>) -> Self {
        Self(inner)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<F: ?Sized> From<Arc<F>> for Hook<F> {
    fn from(inner: Arc<F>) -> Self {
        Self(inner)
    }
}

impl<F: ?Sized> Clone for Hook<F> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<F: ?Sized> Deref for Hook<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.0
    }
}

impl<F: ?Sized> PartialEq for Hook<F> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<F: ?Sized> fmt::Debug for Hook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

/// Hooks serialize as `true`: descriptions report presence, never code.
impl<F: ?Sized> Serialize for Hook<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(true)
    }
}

pub(crate) fn validate_hook(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Hook<ValidateFn> {
    let inner: Arc<ValidateFn> = Arc::new(f);
    Hook::from_arc(inner)
}

pub(crate) fn default_hook(f: impl Fn() -> Value + Send + Sync + 'static) -> Hook<DefaultFn> {
    let inner: Arc<DefaultFn> = Arc::new(f);
    Hook::from_arc(inner)
}

pub(crate) fn generate_hook(f: impl Fn() -> Value + Send + Sync + 'static) -> Hook<GenerateFn> {
    let inner: Arc<GenerateFn> = Arc::new(f);
    Hook::from_arc(inner)
}

pub(crate) fn summarize_hook(
    f: impl Fn(&Value, &SummaryContext<'_>) -> Result<String, SummaryError> + Send + Sync + 'static,
) -> Hook<SummarizeFn> {
    let inner: Arc<SummarizeFn> = Arc::new(f);
    Hook::from_arc(inner)
}

pub(crate) fn mutator_hook(
    f: impl Fn(&mut Value, &MutatorArgs<'_>) -> Result<(), MutatorError> + Send + Sync + 'static,
) -> Hook<MutatorFn> {
    let inner: Arc<MutatorFn> = Arc::new(f);
    Hook::from_arc(inner)
}
