//! Registration slot for a late-bound service table.
//!
//! The core defines the shape of a collaborator (console, boot hooks) and the
//! collaborator hands in a `&'static` table once at boot.

use core::sync::atomic::{AtomicPtr, Ordering};

pub struct ServiceCell<T> {
    ptr: AtomicPtr<T>,
    name: &'static str,
}

// SAFETY: only `&'static T` pointers are ever stored and they are never written through.
unsafe impl<T: Sync> Sync for ServiceCell<T> {}

impl<T> ServiceCell<T> {
    /// `name` shows up in the panic raised by a double registration.
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self {
            ptr: AtomicPtr::new(core::ptr::null_mut()),
            name,
        }
    }

    /// Register the table. Panics if one is already registered.
    #[inline]
    pub fn register(&self, services: &'static T) {
        let prev = self
            .ptr
            .swap(services as *const T as *mut T, Ordering::Release);
        assert!(prev.is_null(), "{} already registered", self.name);
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        !self.ptr.load(Ordering::Acquire).is_null()
    }

    #[inline]
    pub fn try_get(&self) -> Option<&'static T> {
        let ptr = self.ptr.load(Ordering::Acquire);
        // SAFETY: non-null values come from `register`, which only takes `&'static T`.
        unsafe { ptr.as_ref() }
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}
