//! Exclusive ownership of raw OS resources.
//!
//! `UniqueHandle` owns one raw value and releases it through its
//! `HandlePolicy` when dropped or reset. It is move-only: there is no
//! `Clone`, so at most one live instance owns a given raw value.

use std::fmt;
use std::mem;

/// How to recognise and release one kind of raw resource.
pub trait HandlePolicy {
    /// The raw value, e.g. a file descriptor.
    type Raw: Copy + PartialEq + fmt::Debug;

    /// Sentinel stored when nothing is owned.
    fn invalid() -> Self::Raw;

    /// Whether `raw` refers to a live resource.
    fn valid(raw: Self::Raw) -> bool;

    /// Release `raw`. Only ever called with values that pass `valid`.
    fn close(raw: Self::Raw);
}

/// Policy for POSIX file descriptors: invalid sentinel is `-1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FdPolicy;

impl HandlePolicy for FdPolicy {
    type Raw = i32;

    fn invalid() -> i32 {
        -1
    }

    fn valid(raw: i32) -> bool {
        Self::invalid() < raw
    }

    #[cfg(unix)]
    fn close(raw: i32) {
        // SAFETY: the descriptor is owned by the handle being reset and is
        // never used again after this call.
        unsafe {
            libc::close(raw);
        }
    }

    #[cfg(not(unix))]
    fn close(_raw: i32) {}
}

/// Move-only owner of a raw resource.
pub struct UniqueHandle<P: HandlePolicy> {
    raw: P::Raw,
}

impl<P: HandlePolicy> UniqueHandle<P> {
    /// Take ownership of `raw`. No validation is performed.
    pub fn new(raw: P::Raw) -> Self {
        Self { raw }
    }

    /// A handle that owns nothing.
    pub fn invalid() -> Self {
        Self { raw: P::invalid() }
    }

    pub fn is_valid(&self) -> bool {
        P::valid(self.raw)
    }

    /// The raw value, still owned by this handle.
    pub fn get(&self) -> P::Raw {
        self.raw
    }

    /// Give up ownership without closing. The caller now owns the value.
    #[must_use = "the released value is no longer closed automatically"]
    pub fn release(&mut self) -> P::Raw {
        mem::replace(&mut self.raw, P::invalid())
    }

    /// Release the owned value and leave this handle invalid.
    pub fn reset(&mut self) {
        self.reset_to(P::invalid());
    }

    /// Store `raw`, closing the previously owned value.
    ///
    /// No-op when `raw` equals the current value, so a handle can never
    /// close the descriptor it is about to own.
    pub fn reset_to(&mut self, raw: P::Raw) {
        if raw != self.raw {
            let old = mem::replace(&mut self.raw, raw);
            if P::valid(old) {
                P::close(old);
            }
        }
    }

    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.raw, &mut other.raw);
    }
}

impl<P: HandlePolicy> Default for UniqueHandle<P> {
    fn default() -> Self {
        Self::invalid()
    }
}

impl<P: HandlePolicy> Drop for UniqueHandle<P> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<P: HandlePolicy> fmt::Debug for UniqueHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniqueHandle")
            .field("raw", &self.raw)
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Owned POSIX file descriptor.
pub type FdHandle = UniqueHandle<FdPolicy>;
