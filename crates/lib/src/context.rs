//! Request-scoped handle passed into every collection operation.
//!
//! A [`Context`] bundles the three collaborators a collection needs and does
//! not own: the [`Session`] rows are read and written through, the
//! [`IdentityCache`] that keeps one instance per path, and the [`Notifier`]
//! that receives mutation events. Nothing is looked up ambiently.

use std::fmt;
use std::sync::Arc;

use crate::backend::Session;
use crate::cache::{IdentityCache, NullCache};
use crate::events::{Notifier, NullNotifier, Payload, Phase, Target};

/// Session, cache and notifier for one unit of work.
///
/// Cloning is cheap; clones share all three collaborators.
#[derive(Clone)]
pub struct Context {
    session: Arc<dyn Session>,
    cache: Arc<dyn IdentityCache>,
    notifier: Arc<dyn Notifier>,
}

impl Context {
    /// A context over `session` with no cache and no notifier.
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            session,
            cache: Arc::new(NullCache),
            notifier: Arc::new(NullNotifier),
        }
    }

    /// Use `cache` as the identity cache.
    pub fn with_cache(mut self, cache: Arc<dyn IdentityCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Deliver mutation events to `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    pub fn cache(&self) -> &dyn IdentityCache {
        self.cache.as_ref()
    }

    pub(crate) fn notify(&self, target: &Target, phase: Phase, payload: &Payload) {
        self.notifier.notify(target, phase, payload);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}
