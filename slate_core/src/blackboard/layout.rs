//! Shared segment layout: header, slot table, key area, value cells.
//!
//! ```text
//! [StoreHeader]            cache-line aligned, magic + key descriptor
//! [SlotRecord; n]          one per entry, cache-line aligned each
//! [key area]               n keys at a fixed stride
//! [value cells]            one per slot, individually aligned
//! ```
//!
//! All offsets are computed once at creation time and validated on
//! open; nothing in the layout is recomputed per access.

use crate::blackboard::descriptor::TypeDescriptor;
use crate::blackboard::slot::SlotRecord;
use crate::error::{SlateError, SlateResult};
use std::mem;
use std::sync::atomic::AtomicU64;

pub(crate) const STORE_MAGIC: u64 = 0x534c_4154_4553_4852; // "SLATESHR"
pub(crate) const LAYOUT_VERSION: u32 = 1;

// Safety constants to prevent dangerous configurations
pub(crate) const MAX_SLOT_COUNT: usize = 65_536;
pub(crate) const MAX_VALUE_SIZE: usize = 1_000_000; // Maximum size per value in bytes
pub(crate) const MAX_TOTAL_SIZE: usize = 100_000_000; // Maximum segment size (100MB)

/// Header at the front of every store segment, written once by the
/// creator before publish. Only the two atomics mutate afterwards.
#[repr(C, align(64))]
pub(crate) struct StoreHeader {
    pub magic: u64,
    pub layout_version: u32,
    pub slot_count: u32,
    pub key_size: u64,
    pub key_align: u64,
    pub key_type_hash: u64,
    pub key_area_offset: u64,
    pub total_size: u64,
    /// Writer-ownership token: 0 when free, owner pid while a Writer is
    /// alive. Claimed by compare-exchange, released on Writer drop.
    pub writer_owner: AtomicU64,
    /// Live reader bindings, diagnostics only.
    pub reader_count: AtomicU64,
    _padding: [u8; 56], // Pad to cache line boundary
}

impl StoreHeader {
    pub fn new(
        slot_count: u32,
        key: &TypeDescriptor,
        key_area_offset: usize,
        total_size: usize,
    ) -> Self {
        Self {
            magic: STORE_MAGIC,
            layout_version: LAYOUT_VERSION,
            slot_count,
            key_size: key.size() as u64,
            key_align: key.alignment() as u64,
            key_type_hash: key.type_hash(),
            key_area_offset: key_area_offset as u64,
            total_size: total_size as u64,
            writer_owner: AtomicU64::new(0),
            reader_count: AtomicU64::new(0),
            _padding: [0; 56],
        }
    }
}

/// Computed placement of every region inside the segment.
pub(crate) struct StoreLayout {
    pub slots_offset: usize,
    pub key_area_offset: usize,
    pub key_stride: usize,
    pub value_offsets: Vec<usize>,
    pub total_size: usize,
}

pub(crate) fn align_up(offset: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (offset + align - 1) & !(align - 1)
}

/// Compute the segment layout for one key descriptor and an ordered set
/// of value descriptors.
///
/// Value cells of at most 8 bytes are aligned up to their
/// next-power-of-two size so the atomic publish/read fast path in
/// `slot.rs` always applies to them.
pub(crate) fn compute_layout(
    key: &TypeDescriptor,
    values: &[TypeDescriptor],
) -> SlateResult<StoreLayout> {
    if key.size() == 0 {
        return Err(SlateError::ServiceCreation(
            "cannot use a zero-sized key type".to_string(),
        ));
    }
    if values.is_empty() {
        return Err(SlateError::ServiceCreation(
            "a store requires at least one entry".to_string(),
        ));
    }
    if values.len() > MAX_SLOT_COUNT {
        return Err(SlateError::ServiceCreation(format!(
            "{} entries exceed the maximum of {}",
            values.len(),
            MAX_SLOT_COUNT
        )));
    }

    let slots_offset = align_up(mem::size_of::<StoreHeader>(), mem::align_of::<SlotRecord>());
    let slots_size = values
        .len()
        .checked_mul(mem::size_of::<SlotRecord>())
        .ok_or_else(|| {
            SlateError::ServiceCreation("integer overflow computing slot table size".to_string())
        })?;

    let key_area_offset = align_up(slots_offset + slots_size, key.alignment());
    let key_stride = align_up(key.size(), key.alignment());
    let key_area_size = values.len().checked_mul(key_stride).ok_or_else(|| {
        SlateError::ServiceCreation("integer overflow computing key area size".to_string())
    })?;

    let mut cursor = key_area_offset + key_area_size;
    let mut value_offsets = Vec::with_capacity(values.len());
    for desc in values {
        if desc.size() == 0 {
            return Err(SlateError::ServiceCreation(format!(
                "cannot store zero-sized value type {}",
                desc
            )));
        }
        if desc.size() > MAX_VALUE_SIZE {
            return Err(SlateError::ServiceCreation(format!(
                "value size {} too large, maximum is {}",
                desc.size(),
                MAX_VALUE_SIZE
            )));
        }

        // Promote small cells to their size class so they can be
        // published with a single atomic operation.
        let cell_align = if desc.size() <= 8 {
            desc.alignment().max(desc.size().next_power_of_two())
        } else {
            desc.alignment()
        };
        let offset = align_up(cursor, cell_align);
        value_offsets.push(offset);
        cursor = offset.checked_add(desc.size()).ok_or_else(|| {
            SlateError::ServiceCreation("integer overflow computing value area".to_string())
        })?;
    }

    if cursor > MAX_TOTAL_SIZE {
        return Err(SlateError::ServiceCreation(format!(
            "total segment size {} exceeds maximum {}",
            cursor, MAX_TOTAL_SIZE
        )));
    }

    Ok(StoreLayout {
        slots_offset,
        key_area_offset,
        key_stride,
        value_offsets,
        total_size: cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(65, 64), 128);
    }

    #[test]
    fn test_layout_offsets_are_aligned() {
        let key = TypeDescriptor::of::<u32>();
        let values = [
            TypeDescriptor::of::<f64>(),
            TypeDescriptor::of::<[u8; 3]>(),
            TypeDescriptor::of::<u16>(),
        ];
        let layout = compute_layout(&key, &values).unwrap();

        assert_eq!(layout.slots_offset % mem::align_of::<SlotRecord>(), 0);
        assert_eq!(layout.key_area_offset % 4, 0);
        assert_eq!(layout.key_stride, 4);
        assert_eq!(layout.value_offsets.len(), 3);
        assert_eq!(layout.value_offsets[0] % 8, 0);
        // 3-byte cell is promoted to its 4-byte size class
        assert_eq!(layout.value_offsets[1] % 4, 0);
        assert_eq!(layout.value_offsets[2] % 2, 0);
        assert!(layout.total_size > layout.value_offsets[2]);
    }

    #[test]
    fn test_layout_rejects_empty() {
        let key = TypeDescriptor::of::<u32>();
        assert!(compute_layout(&key, &[]).is_err());
    }

    #[test]
    fn test_layout_rejects_oversized_value() {
        let key = TypeDescriptor::of::<u32>();
        let values = [TypeDescriptor::of::<[u8; 2_000_000]>()];
        assert!(compute_layout(&key, &values).is_err());
    }

    #[test]
    fn test_header_is_two_cache_lines() {
        assert_eq!(mem::size_of::<StoreHeader>(), 128);
        assert_eq!(mem::align_of::<StoreHeader>(), 64);
    }
}
