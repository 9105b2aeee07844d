// SLATE shared memory segments - named mmap-backed regions under the
// platform shm directory (see platform.rs).
use crate::error::{SlateError, SlateResult};
use crate::memory::platform::shm_stores_dir;
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Named shared memory segment backing one blackboard store.
///
/// Creation is split from attachment: `create` stages the segment in an
/// anonymous temp file so the caller can fully initialize it, and
/// `publish` installs it under its final name in one step. Until
/// `publish` succeeds, no other process can observe the segment at all,
/// so a half-initialized store is never visible. `open` attaches to an
/// existing segment and never creates one.
#[derive(Debug)]
pub struct ShmRegion {
    mmap: MmapMut,
    size: usize,
    path: PathBuf,
    _file: File,
    name: String,
    staging: Option<NamedTempFile>,
    owner: bool,
}

/// Convert a store name to a safe filename
fn segment_path(name: &str) -> PathBuf {
    let safe_name = name.replace(['/', ':'], "_");
    shm_stores_dir().join(format!("slate_{}", safe_name))
}

impl ShmRegion {
    /// Create a new staged segment of `size` bytes for `name`.
    ///
    /// The segment is not visible to other processes until `publish` is
    /// called. Fails if a segment with this name already exists.
    pub fn create(name: &str, size: usize) -> SlateResult<Self> {
        let dir = shm_stores_dir();
        std::fs::create_dir_all(&dir)?;

        let path = segment_path(name);
        if path.exists() {
            return Err(SlateError::ServiceCreation(format!(
                "shared segment '{}' already exists",
                name
            )));
        }

        // Stage in the same directory so the final hard link cannot
        // cross filesystems.
        let staging = tempfile::Builder::new()
            .prefix(".slate_stage_")
            .tempfile_in(&dir)
            .map_err(|e| {
                SlateError::ServiceCreation(format!(
                    "failed to stage shared segment '{}': {}",
                    name, e
                ))
            })?;

        staging.as_file().set_len(size as u64).map_err(|e| {
            SlateError::ServiceCreation(format!(
                "failed to allocate {} bytes for shared segment '{}': {}",
                size, name, e
            ))
        })?;

        let file = staging.as_file().try_clone()?;
        let mmap = unsafe {
            MmapOptions::new().len(size).map_mut(&file).map_err(|e| {
                SlateError::ServiceCreation(format!(
                    "failed to map shared segment '{}': {}",
                    name, e
                ))
            })?
        };

        Ok(Self {
            mmap,
            size,
            path,
            _file: file,
            name: name.to_string(),
            staging: Some(staging),
            owner: true,
        })
    }

    /// Publish a staged segment under its final name.
    ///
    /// The mapping stays valid across the transition (the hard link
    /// shares the staging file's inode). Fails with `ServiceCreation`
    /// if the name was taken in the meantime.
    pub fn publish(&mut self) -> SlateResult<()> {
        let staging = self
            .staging
            .take()
            .ok_or(SlateError::ObjectDisposed("segment already published"))?;

        self.mmap.flush()?;

        std::fs::hard_link(staging.path(), &self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                SlateError::ServiceCreation(format!(
                    "shared segment '{}' already exists",
                    self.name
                ))
            } else {
                SlateError::Io(e)
            }
        })?;

        // Dropping the staging handle unlinks the temp name; the inode
        // lives on through the published path.
        drop(staging);

        log::info!(
            "ShmRegion '{}': published {} bytes at {}",
            self.name,
            self.size,
            self.path.display()
        );
        Ok(())
    }

    /// Open an existing published segment (no creation)
    pub fn open(name: &str) -> SlateResult<Self> {
        let path = segment_path(name);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                SlateError::ServiceCreation(format!(
                    "shared segment '{}' does not exist: {}",
                    name, e
                ))
            })?;

        let metadata = file.metadata()?;
        let size = metadata.len() as usize;

        let mmap = unsafe {
            MmapOptions::new().len(size).map_mut(&file).map_err(|e| {
                SlateError::ServiceCreation(format!(
                    "failed to map shared segment '{}': {}",
                    name, e
                ))
            })?
        };

        log::info!("ShmRegion '{}': opened {} bytes", name, size);

        Ok(Self {
            mmap,
            size,
            path,
            _file: file,
            name: name.to_string(),
            staging: None,
            owner: false,
        })
    }

    /// Remove a published segment by name.
    ///
    /// Existing mappings stay valid until the last process unmaps them;
    /// only the name is reclaimed.
    pub fn unlink(name: &str) -> SlateResult<()> {
        std::fs::remove_file(segment_path(name))?;
        Ok(())
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// Segments are persistent: the creator does not unlink on drop, so
// opener processes can outlive it. Reclamation goes through `unlink`.
impl Drop for ShmRegion {
    fn drop(&mut self) {}
}

// Thread safety
unsafe impl Send for ShmRegion {}
unsafe impl Sync for ShmRegion {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_publish_open() {
        let name = format!("region_test_{}", std::process::id());
        let _ = ShmRegion::unlink(&name);

        let mut region = ShmRegion::create(&name, 4096).unwrap();
        assert!(region.is_owner());
        assert_eq!(region.size(), 4096);

        // Not yet published: open must fail
        assert!(ShmRegion::open(&name).is_err());

        unsafe {
            *region.as_mut_ptr() = 0xAB;
        }
        region.publish().unwrap();

        let attached = ShmRegion::open(&name).unwrap();
        assert!(!attached.is_owner());
        assert_eq!(attached.size(), 4096);
        assert_eq!(unsafe { *attached.as_ptr() }, 0xAB);

        ShmRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_create_rejects_taken_name() {
        let name = format!("region_taken_{}", std::process::id());
        let _ = ShmRegion::unlink(&name);

        let mut first = ShmRegion::create(&name, 1024).unwrap();
        first.publish().unwrap();

        let second = ShmRegion::create(&name, 1024);
        assert!(matches!(second, Err(SlateError::ServiceCreation(_))));

        ShmRegion::unlink(&name).unwrap();
    }

    #[test]
    fn test_publish_is_one_shot() {
        let name = format!("region_oneshot_{}", std::process::id());
        let _ = ShmRegion::unlink(&name);

        let mut region = ShmRegion::create(&name, 1024).unwrap();
        region.publish().unwrap();
        assert!(matches!(
            region.publish(),
            Err(SlateError::ObjectDisposed(_))
        ));

        ShmRegion::unlink(&name).unwrap();
    }
}
