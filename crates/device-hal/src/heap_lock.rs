//! Reentrant heap guard.
//!
//! Every guarded call runs inside a critical section, so on a single core
//! no other context can interrupt an allocation in progress. Inside that
//! section the guard is a recursive lock keyed by context id: the same
//! context may re-enter (an allocator hook that itself allocates), and a
//! different context finding the lock held gets a failed allocation rather
//! than a spin it could never leave. Before [`ReentrantLock::activate`] is
//! called (before the scheduler starts) there is only one context and the
//! lock is a no-op.

use core::alloc::{GlobalAlloc, Layout};
use core::num::NonZeroUsize;
use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

const UNOWNED: usize = 0;

/// Recursive lock owned by one execution context at a time.
pub struct ReentrantLock {
    owner: AtomicUsize,
    depth: AtomicU32,
    active: AtomicBool,
    current: fn() -> NonZeroUsize,
}

impl ReentrantLock {
    /// New, inactive lock. `current` identifies the calling context (task
    /// handle or similar); it must be stable for the life of the context.
    pub const fn new(current: fn() -> NonZeroUsize) -> Self {
        Self {
            owner: AtomicUsize::new(UNOWNED),
            depth: AtomicU32::new(0),
            active: AtomicBool::new(false),
            current,
        }
    }

    /// Start enforcing mutual exclusion. Called once the scheduler exists.
    pub fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// `true` once [`activate`](Self::activate) has been called.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Take one level of the lock. Returns `false`, without waiting, when
    /// another context holds it.
    pub fn lock(&self) -> bool {
        if !self.is_active() {
            return true;
        }
        let me = (self.current)().get();
        if self.owner.load(Ordering::Acquire) == me {
            self.depth.fetch_add(1, Ordering::Relaxed);
            return true;
        }
        if self
            .owner
            .compare_exchange(UNOWNED, me, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }
        self.depth.store(1, Ordering::Relaxed);
        true
    }

    /// Release one level. Returns `false` if the caller does not own the lock.
    pub fn unlock(&self) -> bool {
        if !self.is_active() {
            return true;
        }
        let me = (self.current)().get();
        if self.owner.load(Ordering::Acquire) != me {
            return false;
        }
        let remaining = self.depth.load(Ordering::Relaxed).saturating_sub(1);
        self.depth.store(remaining, Ordering::Relaxed);
        if remaining == 0 {
            self.owner.store(UNOWNED, Ordering::Release);
        }
        true
    }

    /// Current recursion depth (0 when free).
    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Relaxed)
    }

    /// Run `f` inside a critical section with the lock held. `None` if
    /// another context owns the lock.
    pub fn with<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        critical_section::with(|_| {
            if !self.lock() {
                return None;
            }
            let result = f();
            self.unlock();
            Some(result)
        })
    }
}

/// A [`GlobalAlloc`] serialised by a [`ReentrantLock`].
pub struct GuardedAlloc<A> {
    inner: A,
    lock: ReentrantLock,
}

impl<A> GuardedAlloc<A> {
    /// Wrap `inner`.
    pub const fn new(inner: A, current: fn() -> NonZeroUsize) -> Self {
        Self {
            inner,
            lock: ReentrantLock::new(current),
        }
    }

    /// The wrapped allocator, e.g. to hand it its heap region.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// The guard, e.g. to [`activate`](ReentrantLock::activate) it.
    pub fn lock(&self) -> &ReentrantLock {
        &self.lock
    }
}

// SAFETY: every call is forwarded unchanged to `inner`; the lock only adds
// mutual exclusion and never touches the returned memory.
unsafe impl<A: GlobalAlloc> GlobalAlloc for GuardedAlloc<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: caller upholds `GlobalAlloc::alloc`'s contract.
        self.lock
            .with(|| unsafe { self.inner.alloc(layout) })
            .unwrap_or(ptr::null_mut())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: caller upholds `GlobalAlloc::dealloc`'s contract.
        if self
            .lock
            .with(|| unsafe { self.inner.dealloc(ptr, layout) })
            .is_none()
        {
            error!("heap: dealloc refused, lock held by another context");
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: caller upholds `GlobalAlloc::realloc`'s contract.
        self.lock
            .with(|| unsafe { self.inner.realloc(ptr, layout, new_size) })
            .unwrap_or(ptr::null_mut())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn context_one() -> NonZeroUsize {
        NonZeroUsize::new(1).unwrap()
    }

    #[test]
    fn inactive_lock_is_a_no_op() {
        let lock = ReentrantLock::new(context_one);
        assert!(lock.lock());
        assert_eq!(lock.depth(), 0);
        assert!(lock.unlock());
    }

    #[test]
    fn same_context_can_reenter() {
        let lock = ReentrantLock::new(context_one);
        lock.activate();
        assert!(lock.lock());
        assert!(lock.lock());
        assert_eq!(lock.depth(), 2);
        assert!(lock.unlock());
        assert_eq!(lock.depth(), 1);
        assert!(lock.unlock());
        assert_eq!(lock.depth(), 0);
    }

    #[test]
    fn nested_with_returns_value() {
        let lock = ReentrantLock::new(context_one);
        lock.activate();
        let value = lock.with(|| lock.with(|| 42));
        assert_eq!(value, Some(Some(42)));
        assert_eq!(lock.depth(), 0);
    }

    static SWITCHED_CONTEXT: AtomicUsize = AtomicUsize::new(1);

    fn switched_context() -> NonZeroUsize {
        NonZeroUsize::new(SWITCHED_CONTEXT.load(Ordering::Relaxed)).unwrap()
    }

    #[test]
    fn other_context_fails_instead_of_waiting() {
        let alloc = GuardedAlloc::new(std::alloc::System, switched_context);
        alloc.lock().activate();
        assert!(alloc.lock().lock());

        // An exception handler arrives while thread mode holds the heap.
        SWITCHED_CONTEXT.store(23, Ordering::Relaxed);
        let layout = Layout::from_size_align(16, 4).unwrap();
        // SAFETY: non-zero size layout; a null result is not dereferenced.
        let ptr = unsafe { alloc.alloc(layout) };
        assert!(ptr.is_null());
        assert!(!alloc.lock().unlock());

        SWITCHED_CONTEXT.store(1, Ordering::Relaxed);
        assert!(alloc.lock().unlock());
        assert_eq!(alloc.lock().depth(), 0);
    }

    #[test]
    fn guarded_system_allocator_round_trip() {
        let alloc = GuardedAlloc::new(std::alloc::System, context_one);
        alloc.lock().activate();
        let layout = Layout::from_size_align(64, 8).unwrap();
        // SAFETY: non-zero size layout; pointer freed with the same layout.
        unsafe {
            let ptr = alloc.alloc(layout);
            assert!(!ptr.is_null());
            ptr.write_bytes(0xA5, 64);
            alloc.dealloc(ptr, layout);
        }
        assert_eq!(alloc.lock().depth(), 0);
    }
}
