//! # SLATE - Shared-memory blackboard
//!
//! SLATE lets one writer process and many reader processes exchange the
//! latest state of a fixed set of typed slots through a single named
//! shared-memory segment, with no queues and no broker in between.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slate::prelude::*;
//!
//! #[repr(u32)]
//! #[derive(Clone, Copy, PartialEq, Eq, bytemuck::NoUninit)]
//! enum Key {
//!     Temperature = 0,
//! }
//!
//! fn main() -> Result<()> {
//!     let store = Blackboard::builder("weather", |a: &Key, b| a == b)
//!         .add(Key::Temperature, 20.0f64)
//!         .create()?;
//!
//!     let writer = store.writer()?;
//!     writer.entry::<f64>(Key::Temperature)?.update_with_copy(21.5);
//!     Ok(())
//! }
//! ```

// Re-export core components
pub use slate_core::{self, *};

/// The SLATE prelude - everything you need to get started
pub mod prelude {
    // Store and handle types
    pub use slate_core::blackboard::{
        Blackboard, BlackboardBuilder, EntryHandle, EntryHandleMut, EntryValue, Reader,
        TypeDescriptor, Writer,
    };

    // Change detection
    pub use slate_core::observe::{CancelHandle, ChangeObserver};

    // Configuration
    pub use slate_core::config::{ObserverConfig, SlateConfig, StoreConfig};

    // Error types
    pub use slate_core::error::{SlateError, SlateResult};
    pub type Result<T> = SlateResult<T>;

    // Common std types
    pub use std::sync::Arc;
    pub use std::time::Duration;
}
