//! Store creation, attachment, and slot lookup.

use crate::blackboard::descriptor::TypeDescriptor;
use crate::blackboard::layout::{compute_layout, StoreHeader, LAYOUT_VERSION, STORE_MAGIC};
use crate::blackboard::reader::Reader;
use crate::blackboard::slot::SlotRecord;
use crate::blackboard::writer::Writer;
use crate::error::{SlateError, SlateResult};
use crate::memory::ShmRegion;
use bytemuck::NoUninit;
use std::mem;
use std::ptr::{self, NonNull};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Key-equality predicate fixed at store creation or open time.
///
/// Must behave as a total equivalence relation and agree across every
/// process attached to the same store; the protocol carries it as
/// configuration and never verifies function equivalence.
pub type KeyEq<K> = Arc<dyn Fn(&K, &K) -> bool + Send + Sync>;

/// One (key, initial value, descriptor) triple collected by the builder.
struct EntrySeed<K> {
    key: K,
    descriptor: TypeDescriptor,
    initial: Vec<u8>,
}

/// Process-local view of one mapped store segment. Shared by the
/// `Blackboard` handle and every `Reader`/`Writer` bound to it.
pub(crate) struct StoreInner<K> {
    region: ShmRegion,
    header: NonNull<StoreHeader>,
    slots: NonNull<SlotRecord>,
    key_area: NonNull<u8>,
    key_stride: usize,
    slot_count: usize,
    key_eq: KeyEq<K>,
    name: String,
}

unsafe impl<K: Send> Send for StoreInner<K> {}
unsafe impl<K: Sync> Sync for StoreInner<K> {}

impl<K> StoreInner<K> {
    pub fn header(&self) -> &StoreHeader {
        unsafe { self.header.as_ref() }
    }

    pub fn slot_at(&self, idx: usize) -> &SlotRecord {
        debug_assert!(idx < self.slot_count);
        unsafe { &*self.slots.as_ptr().add(idx) }
    }

    pub fn value_ptr(&self, slot: &SlotRecord) -> *mut u8 {
        unsafe { (self.region.as_ptr() as *mut u8).add(slot.value_offset as usize) }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<K: Copy + NoUninit + 'static> StoreInner<K> {
    pub fn key_at(&self, idx: usize) -> &K {
        debug_assert!(idx < self.slot_count);
        unsafe { &*(self.key_area.as_ptr().add(idx * self.key_stride) as *const K) }
    }

    /// Resolve a key to its slot index with the store predicate. Linear
    /// scan; key sets are small and fixed.
    pub fn lookup(&self, key: &K) -> Option<usize> {
        (0..self.slot_count).find(|&i| (*self.key_eq)(key, self.key_at(i)))
    }

    /// Parse and validate an attached segment.
    fn from_region(region: ShmRegion, key_eq: KeyEq<K>, name: String) -> SlateResult<Self> {
        let header_size = mem::size_of::<StoreHeader>();
        if region.size() < header_size {
            return Err(SlateError::ServiceCreation(format!(
                "segment '{}' too small for a store header",
                name
            )));
        }

        let base = region.as_ptr() as *mut u8;
        if !(base as usize).is_multiple_of(mem::align_of::<StoreHeader>()) {
            return Err(SlateError::ServiceCreation(format!(
                "segment '{}' base pointer not properly aligned",
                name
            )));
        }

        let header = unsafe { NonNull::new_unchecked(base as *mut StoreHeader) };
        let (magic, version) = unsafe {
            let h = header.as_ref();
            (h.magic, h.layout_version)
        };
        if magic != STORE_MAGIC {
            return Err(SlateError::ServiceCreation(format!(
                "segment '{}' is not a blackboard store",
                name
            )));
        }
        if version != LAYOUT_VERSION {
            return Err(SlateError::ServiceCreation(format!(
                "segment '{}' has layout version {} (expected {})",
                name, version, LAYOUT_VERSION
            )));
        }

        let (slot_count, key_size, key_align, key_hash, key_area_offset, total_size) = unsafe {
            let h = header.as_ref();
            (
                h.slot_count as usize,
                h.key_size,
                h.key_align,
                h.key_type_hash,
                h.key_area_offset as usize,
                h.total_size as usize,
            )
        };

        if slot_count == 0 || region.size() < total_size {
            return Err(SlateError::ServiceCreation(format!(
                "segment '{}' is truncated or empty",
                name
            )));
        }

        let key_desc = TypeDescriptor::of::<K>();
        if key_size != key_desc.size() as u64 || key_align != key_desc.alignment() as u64 {
            return Err(SlateError::ServiceCreation(format!(
                "store '{}' registered keys with size={}, alignment={} but {} was requested",
                name, key_size, key_align, key_desc
            )));
        }
        if key_hash != key_desc.type_hash() {
            log::warn!(
                "store '{}' registered keys under a different type name than {} \
                 (layout matches, proceeding)",
                name,
                key_desc
            );
        }

        let slots_offset =
            crate::blackboard::layout::align_up(header_size, mem::align_of::<SlotRecord>());
        let slots_end = slots_offset + slot_count * mem::size_of::<SlotRecord>();
        let key_stride =
            crate::blackboard::layout::align_up(key_desc.size(), key_desc.alignment());
        let keys_end = key_area_offset + slot_count * key_stride;
        if slots_end > total_size || keys_end > total_size || key_area_offset < slots_end {
            return Err(SlateError::ServiceCreation(format!(
                "segment '{}' slot table extends beyond the mapped region",
                name
            )));
        }

        let inner = Self {
            header,
            slots: unsafe { NonNull::new_unchecked(base.add(slots_offset) as *mut SlotRecord) },
            key_area: unsafe { NonNull::new_unchecked(base.add(key_area_offset)) },
            key_stride,
            slot_count,
            key_eq,
            name,
            region,
        };

        // Every value cell must sit inside the mapped region.
        for i in 0..inner.slot_count {
            let slot = inner.slot_at(i);
            let end = slot.value_offset as usize + slot.value_size as usize;
            if end > total_size {
                return Err(SlateError::ServiceCreation(format!(
                    "segment '{}' value cell {} extends beyond the mapped region",
                    inner.name, i
                )));
            }
        }

        Ok(inner)
    }
}

/// Builder for a new named blackboard store.
///
/// Collects the ordered entry set, lays the segment out, writes the
/// initial values, and publishes the store for other processes to open.
pub struct BlackboardBuilder<K> {
    name: String,
    key_eq: KeyEq<K>,
    seeds: Vec<EntrySeed<K>>,
}

impl<K: Copy + NoUninit + 'static> BlackboardBuilder<K> {
    pub fn new<F>(name: &str, key_eq: F) -> Self
    where
        F: Fn(&K, &K) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            key_eq: Arc::new(key_eq),
            seeds: Vec::new(),
        }
    }

    /// Register one entry with its initial value. The same key must not
    /// be added twice (checked under the store predicate at `create`).
    pub fn add<V: bytemuck::Pod + 'static>(mut self, key: K, initial: V) -> Self {
        self.seeds.push(EntrySeed {
            key,
            descriptor: TypeDescriptor::of::<V>(),
            initial: bytemuck::bytes_of(&initial).to_vec(),
        });
        self
    }

    /// Allocate, initialize, and publish the store.
    ///
    /// Creation is all-or-nothing: the segment becomes visible to other
    /// processes only after every slot is fully initialized.
    pub fn create(self) -> SlateResult<Blackboard<K>> {
        if self.seeds.is_empty() {
            return Err(SlateError::ServiceCreation(format!(
                "store '{}' requires at least one entry",
                self.name
            )));
        }
        for i in 0..self.seeds.len() {
            for j in (i + 1)..self.seeds.len() {
                if (*self.key_eq)(&self.seeds[i].key, &self.seeds[j].key) {
                    return Err(SlateError::ServiceCreation(format!(
                        "store '{}' registers equal keys at positions {} and {}",
                        self.name, i, j
                    )));
                }
            }
        }

        let key_desc = TypeDescriptor::of::<K>();
        let descriptors: Vec<TypeDescriptor> =
            self.seeds.iter().map(|s| s.descriptor).collect();
        let layout = compute_layout(&key_desc, &descriptors)?;

        let mut region = ShmRegion::create(&self.name, layout.total_size)?;
        let base = region.as_mut_ptr();
        if !(base as usize).is_multiple_of(mem::align_of::<StoreHeader>()) {
            return Err(SlateError::ServiceCreation(format!(
                "segment '{}' base pointer not properly aligned",
                self.name
            )));
        }

        unsafe {
            ptr::write(
                base as *mut StoreHeader,
                StoreHeader::new(
                    self.seeds.len() as u32,
                    &key_desc,
                    layout.key_area_offset,
                    layout.total_size,
                ),
            );

            let slots = base.add(layout.slots_offset) as *mut SlotRecord;
            for (i, seed) in self.seeds.iter().enumerate() {
                ptr::write(
                    slots.add(i),
                    SlotRecord::new(&seed.descriptor, layout.value_offsets[i]),
                );

                let key_bytes = bytemuck::bytes_of(&seed.key);
                ptr::copy_nonoverlapping(
                    key_bytes.as_ptr(),
                    base.add(layout.key_area_offset + i * layout.key_stride),
                    key_bytes.len(),
                );

                ptr::copy_nonoverlapping(
                    seed.initial.as_ptr(),
                    base.add(layout.value_offsets[i]),
                    seed.initial.len(),
                );
            }
        }

        region.publish()?;

        log::info!(
            "Blackboard '{}': created with {} entries ({} bytes)",
            self.name,
            self.seeds.len(),
            layout.total_size
        );

        let inner = StoreInner::<K>::from_region(region, self.key_eq, self.name)?;
        Ok(Blackboard {
            inner: Arc::new(inner),
        })
    }
}

/// A shared-memory blackboard store: a fixed set of typed slots, one
/// writer, any number of readers, coordinated only through the mapped
/// segment.
pub struct Blackboard<K> {
    inner: Arc<StoreInner<K>>,
}

impl<K> Clone for Blackboard<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: Copy + NoUninit + 'static> Blackboard<K> {
    /// Start building a new store under `name` with the given
    /// key-equality predicate.
    pub fn builder<F>(name: &str, key_eq: F) -> BlackboardBuilder<K>
    where
        F: Fn(&K, &K) -> bool + Send + Sync + 'static,
    {
        BlackboardBuilder::new(name, key_eq)
    }

    /// Attach to an existing store. The predicate must agree in
    /// behavior with the creator's; only the key layout is verified.
    pub fn open<F>(name: &str, key_eq: F) -> SlateResult<Self>
    where
        F: Fn(&K, &K) -> bool + Send + Sync + 'static,
    {
        let region = ShmRegion::open(name)?;
        let inner =
            StoreInner::<K>::from_region(region, Arc::new(key_eq), name.to_string())?;
        log::info!(
            "Blackboard '{}': opened with {} entries",
            name,
            inner.slot_count()
        );
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Bind the store's single writer.
    ///
    /// At most one writer may be alive per store system-wide; ownership
    /// is claimed through a token in the segment header and released
    /// when the `Writer` drops.
    pub fn writer(&self) -> SlateResult<Writer<K>> {
        let pid = std::process::id() as u64;
        match self.inner.header().writer_owner.compare_exchange(
            0,
            pid,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                log::debug!("Blackboard '{}': writer bound (pid {})", self.name(), pid);
                Ok(Writer::bind(self.inner.clone()))
            }
            Err(owner) => Err(SlateError::WriterCreation(format!(
                "blackboard '{}' already has a writer (owner pid {})",
                self.name(),
                owner
            ))),
        }
    }

    /// Bind a reader. Any number may be alive concurrently.
    pub fn reader(&self) -> SlateResult<Reader<K>> {
        log::debug!("Blackboard '{}': reader bound", self.name());
        Ok(Reader::bind(self.inner.clone()))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.lookup(key).is_some()
    }
}

impl<K> Blackboard<K> {
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Number of registered slots.
    pub fn len(&self) -> usize {
        self.inner.slot_count()
    }

    pub fn is_empty(&self) -> bool {
        // A store cannot be created empty.
        false
    }
}
