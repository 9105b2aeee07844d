//! Write-side access: `Writer`, `EntryHandleMut`, and the `EntryValue`
//! loan used for in-place construction before an atomic commit.

use crate::blackboard::descriptor::TypeDescriptor;
use crate::blackboard::slot;
use crate::blackboard::store::StoreInner;
use crate::error::{SlateError, SlateResult};
use bytemuck::{NoUninit, Pod};
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Write capability for one blackboard store.
///
/// At most one `Writer` is alive per store system-wide; the ownership
/// token in the segment header is released when this drops. Not `Clone`.
pub struct Writer<K> {
    inner: Arc<StoreInner<K>>,
}

impl<K> Drop for Writer<K> {
    fn drop(&mut self) {
        self.inner.header().writer_owner.store(0, Ordering::Release);
        log::debug!("Blackboard '{}': writer released", self.inner.name());
    }
}

impl<K: Copy + NoUninit + 'static> Writer<K> {
    pub(crate) fn bind(inner: Arc<StoreInner<K>>) -> Self {
        Self { inner }
    }

    /// Acquire a mutable handle for `key`.
    ///
    /// Same lookup and layout validation as the read path. The protocol
    /// expects one mutable handle outstanding per key; that discipline
    /// is the caller's (it is not tracked in shared state).
    pub fn entry<V: Pod + 'static>(&self, key: K) -> SlateResult<EntryHandleMut<'_, K, V>> {
        let idx = self.inner.lookup(&key).ok_or_else(|| {
            SlateError::EntryAccess(format!(
                "no slot registered for the requested key in '{}'",
                self.inner.name()
            ))
        })?;
        let record = self.inner.slot_at(idx);
        record.check_layout(&TypeDescriptor::of::<V>())?;

        Ok(EntryHandleMut {
            value_ptr: self.inner.value_ptr(record),
            _marker: PhantomData,
        })
    }

    pub fn store_name(&self) -> &str {
        self.inner.name()
    }
}

/// Mutable handle bound to one slot. Not `Send`; belongs to the caller
/// that acquired it.
pub struct EntryHandleMut<'a, K, V> {
    value_ptr: *mut u8,
    _marker: PhantomData<(&'a Writer<K>, V)>,
}

impl<'a, K, V: Pod + 'static> EntryHandleMut<'a, K, V> {
    /// Publish `value` into the slot in one operation.
    ///
    /// The handle stays valid; this is the cheap path for small values.
    pub fn update_with_copy(&mut self, value: V) {
        unsafe {
            slot::publish_bytes(
                self.value_ptr,
                bytemuck::bytes_of(&value).as_ptr(),
                mem::size_of::<V>(),
            );
        }
    }

    /// Convert this handle into a staged loan for in-place construction.
    ///
    /// Consumes the handle, so the slot cannot be updated through it
    /// while the loan is outstanding; `commit` issues a fresh handle.
    /// The staging buffer starts as a copy of the slot's current
    /// contents.
    pub fn loan_uninit(self) -> EntryValue<'a, K, V> {
        let mut staged = Box::new(MaybeUninit::<V>::uninit());
        unsafe {
            slot::read_bytes(
                self.value_ptr,
                staged.as_mut_ptr() as *mut u8,
                mem::size_of::<V>(),
            );
        }
        EntryValue {
            value_ptr: self.value_ptr,
            staged,
            committed: false,
            _marker: PhantomData,
        }
    }
}

/// Exclusively-owned staging buffer loaned from one slot.
///
/// Terminal states: committed (staged bytes published, fresh mutable
/// handle issued) or discarded (dropped without effect; the slot keeps
/// its prior value). A writer may abandon a partially-constructed value
/// at any point before commit.
pub struct EntryValue<'a, K, V> {
    value_ptr: *mut u8,
    staged: Box<MaybeUninit<V>>,
    committed: bool,
    _marker: PhantomData<(&'a Writer<K>, V)>,
}

impl<'a, K, V: Pod + 'static> EntryValue<'a, K, V> {
    /// Direct access to the staged memory for in-place construction.
    pub fn payload_mut(&mut self) -> SlateResult<&mut MaybeUninit<V>> {
        if self.committed {
            return Err(SlateError::ObjectDisposed(
                "entry value was already committed",
            ));
        }
        Ok(&mut *self.staged)
    }

    /// Wholesale copy into the staged memory.
    pub fn write(&mut self, value: V) -> SlateResult<()> {
        if self.committed {
            return Err(SlateError::ObjectDisposed(
                "entry value was already committed",
            ));
        }
        self.staged.write(value);
        Ok(())
    }

    /// Publish the staged bytes as the slot's current value and issue a
    /// fresh mutable handle for the next update cycle.
    ///
    /// One-shot: any operation after a successful commit fails with
    /// `ObjectDisposed`. Uses the same atomic publish primitive as
    /// `update_with_copy`, so the two paths are observably equivalent.
    pub fn commit(&mut self) -> SlateResult<EntryHandleMut<'a, K, V>> {
        if self.committed {
            return Err(SlateError::ObjectDisposed(
                "entry value was already committed",
            ));
        }
        unsafe {
            slot::publish_bytes(
                self.value_ptr,
                self.staged.as_ptr() as *const u8,
                mem::size_of::<V>(),
            );
        }
        self.committed = true;
        Ok(EntryHandleMut {
            value_ptr: self.value_ptr,
            _marker: PhantomData,
        })
    }

    /// Drop the loan without publishing. Equivalent to letting the
    /// value go out of scope; the slot's prior value is untouched.
    pub fn discard(self) {}
}
