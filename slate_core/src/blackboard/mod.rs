//! # The blackboard core
//!
//! A blackboard is a shared-memory table of fixed-layout slots: one
//! writer process publishes the latest value per key, any number of
//! reader processes copy it out. There is no queueing and no history;
//! a slot always holds exactly its most recently committed value.
//!
//! - **TypeDescriptor**: layout fingerprint validating cross-process
//!   type agreement at entry acquisition
//! - **Blackboard / BlackboardBuilder**: store creation, attachment by
//!   name, and writer/reader binding
//! - **EntryHandle / EntryHandleMut**: per-key read and write handles
//! - **EntryValue**: staged loan for in-place construction before an
//!   atomic commit

pub mod descriptor;
pub(crate) mod layout;
pub mod reader;
pub(crate) mod slot;
pub mod store;
pub mod writer;

pub use descriptor::TypeDescriptor;
pub use reader::{EntryHandle, Reader};
pub use slot::MAX_ATOMIC_VALUE_SIZE;
pub use store::{Blackboard, BlackboardBuilder, KeyEq};
pub use writer::{EntryHandleMut, EntryValue, Writer};
