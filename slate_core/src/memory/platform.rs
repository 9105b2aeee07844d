// Cross-platform shared memory path abstraction
//
// Linux: /dev/shm/slate (tmpfs - RAM-backed, fastest)
// macOS: /tmp/slate (regular filesystem, but still fast for IPC)
// Windows: %TEMP%\slate (uses system temp directory)

use std::path::PathBuf;

/// Get the base directory for SLATE shared memory
///
/// This returns a platform-appropriate path for shared memory:
/// - Linux: `/dev/shm/slate` (tmpfs for maximum performance)
/// - macOS: `/tmp/slate` (no /dev/shm, but /tmp is still fast)
/// - Windows: `%TEMP%\slate` (system temp directory)
pub fn shm_base_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/dev/shm/slate")
    }

    #[cfg(target_os = "macos")]
    {
        // macOS doesn't have /dev/shm, use /tmp instead
        PathBuf::from("/tmp/slate")
    }

    #[cfg(target_os = "windows")]
    {
        // Windows uses temp directory
        std::env::temp_dir().join("slate")
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        // Fallback for other Unix-like systems (BSD, etc.)
        PathBuf::from("/tmp/slate")
    }
}

/// Get the stores directory where blackboard segments live
pub fn shm_stores_dir() -> PathBuf {
    shm_base_dir().join("stores")
}

/// Check if we're running on a platform with true shared memory (tmpfs)
pub fn has_native_shm() -> bool {
    #[cfg(target_os = "linux")]
    {
        true
    }

    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

/// Get platform name for logging/diagnostics
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "linux")]
    { "Linux" }

    #[cfg(target_os = "macos")]
    { "macOS" }

    #[cfg(target_os = "windows")]
    { "Windows" }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    { "Unix" }
}
