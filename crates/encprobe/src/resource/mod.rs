//! Live resource tracking: the address-keyed resource table, the
//! allocation-site ranking built from it and the usage report.

pub mod report;
pub mod sites;
pub mod table;

pub use report::UsageReport;
pub use sites::SiteTotal;
pub use table::{Insert, MemSummary, Origin, Removal, ResourceEntry, ResourceTable};

use std::ptr::NonNull;
use std::sync::Arc;

/// Anything that identifies a resource by its memory address.
pub trait AsAddress {
    fn as_address(&self) -> usize;
}

impl AsAddress for usize {
    #[inline]
    fn as_address(&self) -> usize {
        *self
    }
}

impl<T: ?Sized> AsAddress for *const T {
    #[inline]
    fn as_address(&self) -> usize {
        self.cast::<()>() as usize
    }
}

impl<T: ?Sized> AsAddress for *mut T {
    #[inline]
    fn as_address(&self) -> usize {
        self.cast::<()>() as usize
    }
}

impl<T: ?Sized> AsAddress for NonNull<T> {
    #[inline]
    fn as_address(&self) -> usize {
        self.as_ptr().as_address()
    }
}

impl<T: ?Sized> AsAddress for &T {
    #[inline]
    fn as_address(&self) -> usize {
        (*self as *const T).as_address()
    }
}

impl<T: ?Sized> AsAddress for &mut T {
    #[inline]
    fn as_address(&self) -> usize {
        (&**self as *const T).as_address()
    }
}

impl<T: ?Sized> AsAddress for Box<T> {
    #[inline]
    fn as_address(&self) -> usize {
        (&**self as *const T).as_address()
    }
}

impl<T: ?Sized> AsAddress for Arc<T> {
    #[inline]
    fn as_address(&self) -> usize {
        Arc::as_ptr(self).as_address()
    }
}
