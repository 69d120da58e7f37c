use core::ptr::null_mut;
use core::sync::atomic::{AtomicPtr, Ordering};

const TAG: usize = 0b1;

/// An atomic pointer whose lowest bit doubles as a flag.
///
/// The pointer and the flag live in one word, so a single compare-and-swap
/// can check or change both at once. Pointees must be at least 2-byte
/// aligned, which every `Box`-allocated node is.
pub(crate) struct MaybeTagged<T> {
    ptr: AtomicPtr<T>,
}

#[inline]
fn pack<T>(ptr: *mut T, tag: bool) -> *mut T {
    debug_assert_eq!(ptr as usize & TAG, 0, "pointer is not aligned for tagging");
    (ptr as usize | if tag { TAG } else { 0 }) as *mut T
}

#[inline]
fn unpack<T>(raw: *mut T) -> (*mut T, bool) {
    ((raw as usize & !TAG) as *mut T, raw as usize & TAG != 0)
}

impl<T> MaybeTagged<T> {
    pub(crate) fn new(ptr: *mut T) -> Self {
        Self {
            ptr: AtomicPtr::new(pack(ptr, false)),
        }
    }

    pub(crate) fn null() -> Self {
        Self::new(null_mut())
    }

    /// Loads pointer and flag together.
    pub(crate) fn load(&self, order: Ordering) -> (*mut T, bool) {
        unpack(self.ptr.load(order))
    }

    pub(crate) fn load_ptr(&self) -> *mut T {
        self.load(Ordering::Acquire).0
    }

    pub(crate) fn is_tagged(&self) -> bool {
        self.load(Ordering::Acquire).1
    }

    /// Overwrites the word with an untagged `ptr`.
    pub(crate) fn store_ptr(&self, ptr: *mut T) {
        self.ptr.store(pack(ptr, false), Ordering::Release);
    }

    /// Swaps an untagged `current` for an untagged `new`.
    ///
    /// On failure returns what was actually found.
    pub(crate) fn compare_exchange(
        &self,
        current: *mut T,
        new: *mut T,
        success: Ordering,
        failure: Ordering,
    ) -> Result<*mut T, (*mut T, bool)> {
        self.compare_exchange_tagged((current, false), (new, false), success, failure)
            .map(|(ptr, _)| ptr)
    }

    /// Swaps `current` for `new`, comparing and writing the flag together
    /// with the pointer.
    pub(crate) fn compare_exchange_tagged(
        &self,
        current: (*mut T, bool),
        new: (*mut T, bool),
        success: Ordering,
        failure: Ordering,
    ) -> Result<(*mut T, bool), (*mut T, bool)> {
        self.ptr
            .compare_exchange(
                pack(current.0, current.1),
                pack(new.0, new.1),
                success,
                failure,
            )
            .map(unpack)
            .map_err(unpack)
    }

    /// Sets the flag, provided the word still holds an untagged `ptr`.
    pub(crate) fn try_tag(&self, ptr: *mut T) -> bool {
        self.compare_exchange_tagged((ptr, false), (ptr, true), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
