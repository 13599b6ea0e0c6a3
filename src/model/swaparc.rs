//! Lock-free snapshot cell.
//!
//! The reconciler publishes a fresh `Arc<State>` after every batch of
//! mutations; status-bar pollers and other readers `load` whatever snapshot
//! is current without ever blocking the writer or observing a half-applied
//! mutation.

use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, Ordering};

pub struct SwapArc<T> {
    ptr: AtomicPtr<T>,
}

impl<T> SwapArc<T> {
    pub fn new(initial: Arc<T>) -> Self {
        let raw = Arc::into_raw(initial) as *mut T;
        Self { ptr: AtomicPtr::new(raw) }
    }

    pub fn from_value(value: T) -> Self { Self::new(Arc::new(value)) }

    #[inline]
    pub fn load(&self) -> Arc<T> {
        let p = self.ptr.load(Ordering::Acquire);
        assert!(!p.is_null(), "SwapArc pointer was null");
        unsafe {
            Arc::increment_strong_count(p);
            Arc::from_raw(p)
        }
    }

    #[inline]
    pub fn store(&self, new_val: Arc<T>) {
        let newp = Arc::into_raw(new_val) as *mut T;
        let oldp = self.ptr.swap(newp, Ordering::AcqRel);
        unsafe {
            drop(Arc::from_raw(oldp));
        }
    }

}

impl<T> Drop for SwapArc<T> {
    fn drop(&mut self) {
        let p = self.ptr.load(Ordering::Relaxed);
        if !p.is_null() {
            unsafe {
                drop(Arc::from_raw(p));
            }
        }
    }
}

unsafe impl<T: Send + Sync> Send for SwapArc<T> {}
unsafe impl<T: Send + Sync> Sync for SwapArc<T> {}
