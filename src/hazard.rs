//! Hazard-pointer plumbing shared by every list whose readers run without
//! holding the locks that writers unlink under.

use crate::MaybeTagged;
use core::sync::atomic::{fence, Ordering};
use haphazard::{Domain, HazardPointer, Singleton};

pub(crate) struct Nodes;

unsafe impl Singleton for Nodes {}

static NODES: Domain<Nodes> = Domain::new(&Nodes);

pub(crate) type Hazard = HazardPointer<'static, Nodes>;

pub(crate) fn hazard() -> Hazard {
    HazardPointer::new_in_domain(&NODES)
}

/// Publishes `ptr` in `hazard`.
///
/// The protection only counts once the caller has re-read the location
/// `ptr` came from and found it unchanged.
pub(crate) fn protect<T>(hazard: &mut Hazard, ptr: *mut T) {
    hazard.protect_raw(ptr);
    fence(Ordering::SeqCst);
}

/// Protects the pointer currently stored in `slot`, ignoring its tag.
pub(crate) fn protect_slot<T>(hazard: &mut Hazard, slot: &MaybeTagged<T>) -> *mut T {
    let mut ptr = slot.load_ptr();

    protect(hazard, ptr);

    let mut v_ptr = slot.load_ptr();

    while !core::ptr::eq(ptr, v_ptr) {
        ptr = v_ptr;
        protect(hazard, ptr);

        v_ptr = slot.load_ptr();
    }

    ptr
}

/// Hands an unlinked, `Box`-allocated node to the domain.
///
/// # Safety
///
/// `ptr` must come from `Box::into_raw`, be unreachable for new readers, and
/// be retired at most once.
pub(crate) unsafe fn retire<T: Send + 'static>(ptr: *mut T) {
    tracing::trace!(node = ?ptr, "retired");
    NODES.retire_ptr::<T, Box<T>>(ptr);
}

/// Frees whatever retired nodes are no longer protected.
pub(crate) fn reclaim() -> usize {
    NODES.eager_reclaim()
}
