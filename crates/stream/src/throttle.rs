use derive_more::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Default number of asynchronous streams allowed to run at once.
pub const MAX_ASYNC_STREAM_COUNT: usize = 32;

/// Where a stream's coding work runs.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Inline, on whichever thread submits the chunk.
    #[display("synchronous")]
    Synchronous,
    /// On the session's own worker thread.
    #[display("asynchronous")]
    Asynchronous,
}

impl Mode {
    #[must_use]
    pub fn is_asynchronous(&self) -> bool {
        matches!(self, Mode::Asynchronous)
    }
}

#[derive(Debug)]
struct Registry {
    capacity: usize,
    active: Vec<u64>,
    next_id: u64,
}

/// Bounds how many asynchronous streams run concurrently.
///
/// Admission is advisory: once the registry is full, new streams are simply
/// created synchronous instead of being delayed. Clones share one registry.
#[derive(Clone, Debug)]
pub struct ConcurrencyThrottle {
    registry: Arc<Mutex<Registry>>,
}

impl ConcurrencyThrottle {
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                capacity,
                active: Vec::new(),
                next_id: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Only affects streams created after the change.
    pub fn set_capacity(&self, capacity: usize) {
        self.lock().capacity = capacity;
    }

    /// Number of registered asynchronous streams.
    pub fn active(&self) -> usize {
        self.lock().active.len()
    }

    /// Forget every registration. Tickets issued before the reset become
    /// no-ops when dropped.
    pub fn reset(&self) {
        let mut registry = self.lock();
        debug!(active = registry.active.len(), "throttle reset");
        registry.active.clear();
    }

    /// Pick the mode for a new stream.
    pub fn admit(&self, synchronous: bool, force_asynchronous: bool) -> Mode {
        if synchronous {
            return Mode::Synchronous;
        }
        Self::decide(&self.lock(), force_asynchronous)
    }

    /// Register an asynchronous stream. The registration lasts until the
    /// returned ticket is dropped.
    pub fn register(&self) -> ThrottleTicket {
        self.register_locked(&mut self.lock())
    }

    /// [`admit`](Self::admit) and, for an asynchronous stream,
    /// [`register`](Self::register) under one lock, so concurrent callers
    /// cannot overshoot the capacity. `None` means synchronous.
    pub fn admit_and_register(&self, synchronous: bool, force_asynchronous: bool) -> Option<ThrottleTicket> {
        if synchronous {
            return None;
        }
        let mut registry = self.lock();
        Self::decide(&registry, force_asynchronous)
            .is_asynchronous()
            .then(|| self.register_locked(&mut registry))
    }

    fn decide(registry: &Registry, force_asynchronous: bool) -> Mode {
        if registry.active.len() >= registry.capacity && !force_asynchronous {
            debug!(
                active = registry.active.len(),
                capacity = registry.capacity,
                "asynchronous stream limit reached, falling back to synchronous"
            );
            return Mode::Synchronous;
        }
        Mode::Asynchronous
    }

    fn register_locked(&self, registry: &mut Registry) -> ThrottleTicket {
        let id = registry.next_id;
        registry.next_id += 1;
        registry.active.push(id);
        trace!(id, active = registry.active.len(), "stream registered");
        ThrottleTicket {
            registry: Arc::clone(&self.registry),
            id,
        }
    }
}

impl Default for ConcurrencyThrottle {
    fn default() -> Self {
        Self::new(MAX_ASYNC_STREAM_COUNT)
    }
}

/// Registration of one asynchronous stream; deregisters on drop.
#[derive(Debug)]
pub struct ThrottleTicket {
    registry: Arc<Mutex<Registry>>,
    id: u64,
}

impl Drop for ThrottleTicket {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(position) = registry.active.iter().position(|id| *id == self.id) {
            registry.active.remove(position);
            trace!(id = self.id, active = registry.active.len(), "stream deregistered");
        }
    }
}
