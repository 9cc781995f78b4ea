use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A shared, lock-guarded value that can be handed to worker threads.
///
/// `MtResource` wraps an `Arc<RwLock<T>>`. The chunk manager uses it for the
/// two structures that cross the worker/render-thread boundary: the pending
/// list that finishing generation tasks append to, and the active chunk
/// collection that the renderer iterates for uploads and draws.
///
/// A panic on a worker while it holds the lock does not make the resource
/// unusable: the guard is recovered from the poisoned lock, since every
/// writer leaves the protected value in a consistent state between
/// statements.
///
/// # Examples
///
/// ```
/// use voxel_streamer::core::MtResource;
///
/// let pending = MtResource::new(Vec::<u32>::new());
/// let worker_handle = pending.clone();
///
/// std::thread::spawn(move || worker_handle.get_mut().push(7))
///     .join()
///     .unwrap();
///
/// assert_eq!(*pending.get(), vec![7]);
/// ```
pub struct MtResource<T: Send + Sync> {
    resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync> MtResource<T> {
    /// Wraps `resource` in a new shared lock.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Acquires shared read access.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires exclusive write access, blocking readers until the guard drops.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the contents with `T::default()` and returns the previous value.
    ///
    /// The write lock is held only for the swap, which keeps the commit step
    /// on the render thread short even when many results are waiting.
    pub fn take(&self) -> T
    where
        T: Default,
    {
        std::mem::take(&mut *self.get_mut())
    }

    /// Number of live handles to this resource, including `self`.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
