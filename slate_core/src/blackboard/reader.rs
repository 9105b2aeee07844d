//! Read-side access: `Reader` and per-key `EntryHandle`.

use crate::blackboard::descriptor::TypeDescriptor;
use crate::blackboard::slot;
use crate::blackboard::store::StoreInner;
use crate::error::{SlateError, SlateResult};
use bytemuck::{NoUninit, Pod};
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Read capability for one blackboard store.
///
/// Cheap to clone; every clone counts as a live reader binding in the
/// segment header.
pub struct Reader<K> {
    inner: Arc<StoreInner<K>>,
}

impl<K> Clone for Reader<K> {
    fn clone(&self) -> Self {
        self.inner
            .header()
            .reader_count
            .fetch_add(1, Ordering::Relaxed);
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K> Drop for Reader<K> {
    fn drop(&mut self) {
        self.inner
            .header()
            .reader_count
            .fetch_sub(1, Ordering::Relaxed);
    }
}

impl<K: Copy + NoUninit + 'static> Reader<K> {
    pub(crate) fn bind(inner: Arc<StoreInner<K>>) -> Self {
        inner.header().reader_count.fetch_add(1, Ordering::Relaxed);
        Self { inner }
    }

    /// Acquire a read handle for `key`.
    ///
    /// Fails with `EntryAccess` if the key is not registered and with
    /// `TypeMismatch` if `V`'s layout disagrees with the slot's. Many
    /// readers may hold handles to the same slot concurrently.
    pub fn entry<V: Pod + 'static>(&self, key: K) -> SlateResult<EntryHandle<'_, K, V>> {
        let idx = self.inner.lookup(&key).ok_or_else(|| {
            SlateError::EntryAccess(format!(
                "no slot registered for the requested key in '{}'",
                self.inner.name()
            ))
        })?;
        let record = self.inner.slot_at(idx);
        record.check_layout(&TypeDescriptor::of::<V>())?;

        Ok(EntryHandle {
            value_ptr: self.inner.value_ptr(record),
            _marker: PhantomData,
        })
    }

    pub fn store_name(&self) -> &str {
        self.inner.name()
    }
}

/// Read handle bound to one slot.
///
/// Holds a raw view into the mapping and is therefore not `Send`: a
/// handle belongs to the caller that acquired it. Reacquisition is
/// cheap, so polling layers drop and re-request handles per tick.
pub struct EntryHandle<'a, K, V> {
    value_ptr: *const u8,
    _marker: PhantomData<(&'a Reader<K>, V)>,
}

impl<'a, K, V: Pod + 'static> EntryHandle<'a, K, V> {
    /// Copy the slot's current value into caller-owned memory.
    ///
    /// The copy races with concurrent writer updates: any single call
    /// observes either the pre- or post-update value. For values of at
    /// most [`crate::blackboard::MAX_ATOMIC_VALUE_SIZE`] bytes that is
    /// enforced by a single atomic load; above it, it is the documented
    /// convention.
    pub fn get(&self) -> V {
        let mut out = MaybeUninit::<V>::uninit();
        unsafe {
            slot::read_bytes(
                self.value_ptr,
                out.as_mut_ptr() as *mut u8,
                mem::size_of::<V>(),
            );
            out.assume_init()
        }
    }
}
