//! # Shared Memory utilities for SLATE
//!
//! This module provides the segment plumbing underneath the blackboard:
//!
//! - **ShmRegion**: named, memory-mapped segments with all-or-nothing
//!   creation (stage, initialize, publish) and strict open-only attach
//! - **platform**: cross-platform base paths for segment files
//!
//! The blackboard core above this module never touches paths or files;
//! it sees one contiguous mapping per store.

pub mod platform;
pub mod shm_region;

pub use platform::*;
pub use shm_region::ShmRegion;
