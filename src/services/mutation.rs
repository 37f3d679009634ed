//! Mutate-then-reconcile: the shape every state-changing view action takes.
//!
//! An action issues exactly one remote mutation. On failure the view cache
//! is left untouched, the error is logged and a failure notification goes
//! out. On success the cache is reconciled either by a local patch (when the
//! new state is fully known) or by re-running the view's fetch (when it
//! depends on server-side joins), then a success notification goes out.
//! There are no retries and no deduplication.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use tracing::{debug, error, info, warn};

use super::notifications::Notifier;
use crate::error::AppResult;

struct Slot<T> {
    value: T,
    loaded: bool,
    mounted: bool,
}

/// Per-view cached collection.
///
/// Writes after `unmount` are dropped, so a late response for a view the
/// user has left is a no-op.
pub struct ViewCache<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for ViewCache<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Default> Default for ViewCache<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> ViewCache<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                value,
                loaded: false,
                mounted: true,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock().value)
    }

    /// True once a fetch has landed.
    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    pub fn is_mounted(&self) -> bool {
        self.lock().mounted
    }

    pub fn unmount(&self) {
        self.lock().mounted = false;
    }

    /// Replace the whole value. Returns false when unmounted.
    pub fn replace(&self, value: T) -> bool {
        let mut slot = self.lock();
        if !slot.mounted {
            return false;
        }
        slot.value = value;
        slot.loaded = true;
        true
    }

    /// Patch the value in place. Returns false when unmounted.
    pub fn patch(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut slot = self.lock();
        if !slot.mounted {
            return false;
        }
        f(&mut slot.value);
        true
    }
}

impl<T: Clone> ViewCache<T> {
    pub fn snapshot(&self) -> T {
        self.lock().value.clone()
    }
}

/// Labels for one user action.
#[derive(Debug, Clone)]
pub struct Action {
    pub name: &'static str,
    pub success: String,
    pub failure: String,
    pub reload_failure: String,
}

impl Action {
    pub fn new(name: &'static str, success: impl Into<String>, failure: impl Into<String>) -> Self {
        Self {
            name,
            success: success.into(),
            failure: failure.into(),
            reload_failure: "Failed to refresh data".to_string(),
        }
    }

    /// Message shown when the post-mutation refetch fails.
    pub fn on_reload_failure(mut self, message: impl Into<String>) -> Self {
        self.reload_failure = message.into();
        self
    }
}

/// How the cache catches up with a successful mutation.
pub enum Reconcile<'a, T> {
    /// The new state is fully known locally.
    Patch(Box<dyn FnOnce(&mut T) + Send + 'a>),
    /// The new state needs server-side joins; re-run the fetch.
    Refetch(BoxFuture<'a, AppResult<T>>),
}

impl<'a, T> Reconcile<'a, T> {
    pub fn patch(f: impl FnOnce(&mut T) + Send + 'a) -> Self {
        Reconcile::Patch(Box::new(f))
    }

    pub fn refetch(fetch: impl Future<Output = AppResult<T>> + Send + 'a) -> Self {
        Reconcile::Refetch(Box::pin(fetch))
    }
}

/// Run one remote mutation and reconcile the view cache with it.
///
/// Returns the mutation's result. A failed refetch after a successful
/// mutation is reported to the user but does not fail the action.
pub async fn mutate_then_reconcile<T, R>(
    cache: &ViewCache<T>,
    notifier: &dyn Notifier,
    action: Action,
    mutation: impl Future<Output = AppResult<R>>,
    reconcile: Reconcile<'_, T>,
) -> AppResult<R> {
    let output = match mutation.await {
        Ok(output) => output,
        Err(e) => {
            error!(action = action.name, error = %e, "Mutation failed");
            notifier.error(&action.failure);
            return Err(e);
        }
    };

    match reconcile {
        Reconcile::Patch(apply) => {
            if !cache.patch(apply) {
                debug!(action = action.name, "View unmounted, patch dropped");
            }
        }
        Reconcile::Refetch(fetch) => match fetch.await {
            Ok(value) => {
                if !cache.replace(value) {
                    debug!(action = action.name, "View unmounted, refetch dropped");
                }
            }
            Err(e) => {
                warn!(action = action.name, error = %e, "Refetch after mutation failed");
                notifier.error(&action.reload_failure);
            }
        },
    }

    info!(action = action.name, "Mutation applied");
    notifier.success(&action.success);
    Ok(output)
}

/// Fetch a view's data into its cache, notifying on failure.
pub async fn load_into<T>(
    cache: &ViewCache<T>,
    notifier: &dyn Notifier,
    failure: &str,
    fetch: impl Future<Output = AppResult<T>>,
) -> AppResult<()> {
    match fetch.await {
        Ok(value) => {
            if !cache.replace(value) {
                debug!("View unmounted, load dropped");
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "{}", failure);
            notifier.error(failure);
            Err(e)
        }
    }
}
