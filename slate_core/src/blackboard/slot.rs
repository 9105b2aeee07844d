//! Slot records and the value publish/read primitives.
//!
//! A slot is one fixed-layout value cell plus the descriptor it was
//! registered with. Publishing is the smallest operation the platform
//! allows: values of 1/2/4/8 bytes in suitably aligned cells go through
//! a single atomic store with Release ordering, and readers mirror that
//! with a single Acquire load, so such values can never be observed
//! torn. Larger values use a plain copy bracketed by fences; for those
//! the no-torn-value guarantee is convention, not enforcement (readers
//! polling mid-copy can see a mix), which callers accept by storing
//! values above [`MAX_ATOMIC_VALUE_SIZE`].

use crate::blackboard::descriptor::TypeDescriptor;
use crate::error::{SlateError, SlateResult};
use std::ptr;
use std::sync::atomic::{fence, AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Largest value size for which publish and read are single atomic
/// operations (given a cell aligned to the value size, which the layout
/// guarantees for registered slots).
pub const MAX_ATOMIC_VALUE_SIZE: usize = 8;

/// Per-slot bookkeeping in the segment's slot table. Written once at
/// creation, read-only afterwards.
#[repr(C, align(64))]
pub(crate) struct SlotRecord {
    pub value_type_hash: u64,
    pub value_size: u64,
    pub value_align: u64,
    /// Byte offset of the value cell from the segment base
    pub value_offset: u64,
    _padding: [u8; 32],
}

impl SlotRecord {
    pub fn new(desc: &TypeDescriptor, value_offset: usize) -> Self {
        Self {
            value_type_hash: desc.type_hash(),
            value_size: desc.size() as u64,
            value_align: desc.alignment() as u64,
            value_offset: value_offset as u64,
            _padding: [0; 32],
        }
    }

    /// Validate a requester's descriptor against this slot.
    ///
    /// Size and alignment must agree; a differing name hash with a
    /// matching layout is allowed and only logged, since the tag is an
    /// advisory cross-process diagnostic.
    pub fn check_layout(&self, requested: &TypeDescriptor) -> SlateResult<()> {
        if self.value_size != requested.size() as u64
            || self.value_align != requested.alignment() as u64
        {
            return Err(SlateError::TypeMismatch {
                requested: *requested,
                stored_size: self.value_size,
                stored_align: self.value_align,
            });
        }
        if self.value_type_hash != requested.type_hash() {
            log::warn!(
                "slot registered under a different type name than requested {} \
                 (layout matches, proceeding)",
                requested
            );
        }
        Ok(())
    }
}

/// Publish `size` bytes from `src` into the cell at `dst`.
///
/// # Safety
///
/// `dst` must point at a cell of at least `size` bytes inside a live
/// mapping, and `src` at `size` readable bytes. The caller is the
/// single writer for this cell.
pub(crate) unsafe fn publish_bytes(dst: *mut u8, src: *const u8, size: usize) {
    match size {
        1 => (*(dst as *const AtomicU8)).store(*src, Ordering::Release),
        2 if dst as usize % 2 == 0 => (*(dst as *const AtomicU16))
            .store((src as *const u16).read_unaligned(), Ordering::Release),
        4 if dst as usize % 4 == 0 => (*(dst as *const AtomicU32))
            .store((src as *const u32).read_unaligned(), Ordering::Release),
        8 if dst as usize % 8 == 0 => (*(dst as *const AtomicU64))
            .store((src as *const u64).read_unaligned(), Ordering::Release),
        _ => {
            ptr::copy_nonoverlapping(src, dst, size);
            fence(Ordering::Release);
        }
    }
}

/// Copy `size` bytes out of the cell at `src` into `dst`.
///
/// # Safety
///
/// Same pointer requirements as [`publish_bytes`], with `dst` writable.
pub(crate) unsafe fn read_bytes(src: *const u8, dst: *mut u8, size: usize) {
    match size {
        1 => *dst = (*(src as *const AtomicU8)).load(Ordering::Acquire),
        2 if src as usize % 2 == 0 => (dst as *mut u16)
            .write_unaligned((*(src as *const AtomicU16)).load(Ordering::Acquire)),
        4 if src as usize % 4 == 0 => (dst as *mut u32)
            .write_unaligned((*(src as *const AtomicU32)).load(Ordering::Acquire)),
        8 if src as usize % 8 == 0 => (dst as *mut u64)
            .write_unaligned((*(src as *const AtomicU64)).load(Ordering::Acquire)),
        _ => {
            fence(Ordering::Acquire);
            ptr::copy_nonoverlapping(src, dst, size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_one_cache_line() {
        assert_eq!(std::mem::size_of::<SlotRecord>(), 64);
    }

    #[test]
    fn test_atomic_roundtrip() {
        let mut cell = [0u64; 1];
        let value = 0x1122_3344_5566_7788u64;
        let mut out = 0u64;
        unsafe {
            publish_bytes(
                cell.as_mut_ptr() as *mut u8,
                &value as *const u64 as *const u8,
                8,
            );
            read_bytes(
                cell.as_ptr() as *const u8,
                &mut out as *mut u64 as *mut u8,
                8,
            );
        }
        assert_eq!(out, value);
    }

    #[test]
    fn test_copy_roundtrip_above_atomic_width() {
        let mut cell = [0u64; 4];
        let value = [1.5f64, -2.5, 3.25];
        let mut out = [0.0f64; 3];
        unsafe {
            publish_bytes(
                cell.as_mut_ptr() as *mut u8,
                value.as_ptr() as *const u8,
                24,
            );
            read_bytes(cell.as_ptr() as *const u8, out.as_mut_ptr() as *mut u8, 24);
        }
        assert_eq!(out, value);
    }

    #[test]
    fn test_check_layout() {
        let stored = TypeDescriptor::of::<f64>();
        let record = SlotRecord::new(&stored, 0);

        assert!(record.check_layout(&TypeDescriptor::of::<f64>()).is_ok());
        // Same layout, different name: advisory only
        assert!(record.check_layout(&TypeDescriptor::of::<u64>()).is_ok());
        // Different layout: rejected
        assert!(matches!(
            record.check_layout(&TypeDescriptor::of::<f32>()),
            Err(SlateError::TypeMismatch { .. })
        ));
    }
}
