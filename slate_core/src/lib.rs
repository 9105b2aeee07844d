//! # SLATE Core
//!
//! The core runtime for SLATE, a shared-memory blackboard for
//! inter-process state sharing.
//!
//! A blackboard holds the latest value of a fixed set of typed slots in
//! one named shared-memory segment. A single writer publishes updates;
//! any number of reader processes copy the current value out. There are
//! no queues, no brokers, and no history: per slot, the last write is
//! what the next read sees.
//!
//! - **Blackboard**: store creation, attachment by name, writer/reader
//!   binding
//! - **Entry handles**: per-key read and write access, layout-checked
//!   at acquisition via [`TypeDescriptor`]
//! - **EntryValue**: staged loan for constructing large values in place
//!   before an atomic commit
//! - **ChangeObserver**: polling change detection layered on the read
//!   API
//! - **Memory**: named mmap segments with all-or-nothing creation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slate_core::{Blackboard, SlateResult};
//!
//! #[repr(u32)]
//! #[derive(Clone, Copy, PartialEq, Eq, bytemuck::NoUninit)]
//! enum SensorKey {
//!     Temperature = 0,
//!     Humidity = 1,
//! }
//!
//! fn main() -> SlateResult<()> {
//!     let store = Blackboard::builder("weather", |a: &SensorKey, b| a == b)
//!         .add(SensorKey::Temperature, 20.0f64)
//!         .add(SensorKey::Humidity, 50.0f64)
//!         .create()?;
//!
//!     let writer = store.writer()?;
//!     writer.entry::<f64>(SensorKey::Temperature)?.update_with_copy(21.5);
//!
//!     let reader = store.reader()?;
//!     let current = reader.entry::<f64>(SensorKey::Temperature)?.get();
//!     assert_eq!(current, 21.5);
//!     Ok(())
//! }
//! ```

pub mod blackboard;
pub mod config;
pub mod error;
pub mod memory;
pub mod observe;

// Re-export commonly used types for easy access
pub use blackboard::{
    Blackboard, BlackboardBuilder, EntryHandle, EntryHandleMut, EntryValue, KeyEq, Reader,
    TypeDescriptor, Writer, MAX_ATOMIC_VALUE_SIZE,
};
pub use config::{ObserverConfig, SlateConfig, StoreConfig};
pub use error::{SlateError, SlateResult};
pub use observe::{CancelHandle, ChangeObserver, DEFAULT_POLL_INTERVAL};
