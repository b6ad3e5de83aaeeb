//! Interval boundary events.
//!
//! A host environment that can call a hook immediately before and
//! immediately after each unit of work implements [`BoundarySource`].
//! [`HookRegistry`] is the in-process version: a pre/post pair that code
//! fires around each "cell".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use cellmem_core::error::{Error, Result};
use cellmem_core::id::SubscriptionId;

/// Callbacks invoked synchronously at interval boundaries.
pub trait BoundaryHooks: Send + Sync {
    fn on_interval_start(&self);
    fn on_interval_end(&self);
}

pub trait BoundarySource: Send + Sync {
    fn subscribe(&self, hooks: Arc<dyn BoundaryHooks>) -> SubscriptionId;

    /// Remove a subscription. Unknown ids yield `Error::UnsubscribeNoOp`.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;
}

type Subscribers = Vec<(SubscriptionId, Arc<dyn BoundaryHooks>)>;

/// In-process pre/post hook pair.
#[derive(Default)]
pub struct HookRegistry {
    next_id: AtomicU64,
    hooks: Mutex<Subscribers>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.hooks.lock().unwrap_or_else(|p| p.into_inner())
    }

    // Hooks run outside the lock so they may (un)subscribe re-entrantly.
    fn snapshot(&self) -> Vec<Arc<dyn BoundaryHooks>> {
        self.lock().iter().map(|(_, h)| Arc::clone(h)).collect()
    }

    pub fn fire_start(&self) {
        for h in self.snapshot() {
            h.on_interval_start();
        }
    }

    pub fn fire_end(&self) {
        for h in self.snapshot() {
            h.on_interval_end();
        }
    }

    /// Run `work` as one interval: start hooks, `work`, end hooks.
    pub fn run_cell<T>(&self, work: impl FnOnce() -> T) -> T {
        self.fire_start();
        let out = work();
        self.fire_end();
        out
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl BoundarySource for HookRegistry {
    fn subscribe(&self, hooks: Arc<dyn BoundaryHooks>) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::AcqRel));
        self.lock().push((id, hooks));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let mut hooks = self.lock();
        let before = hooks.len();
        hooks.retain(|(sid, _)| *sid != id);
        if hooks.len() == before {
            Err(Error::UnsubscribeNoOp)
        } else {
            Ok(())
        }
    }
}
