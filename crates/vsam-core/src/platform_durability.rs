//! Durable sync for snapshot files.
//!
//! A snapshot is only considered saved once its bytes and the directory entry
//! produced by the final rename have both reached persistent storage.

use std::fs::File;
use std::io;
use std::path::Path;

/// Flush file contents to persistent media using the strongest call the
/// platform offers.
///
/// - Linux: `fdatasync`
/// - macOS/iOS: `fcntl(F_FULLFSYNC)`, plain fsync stops at the drive cache
/// - Windows: `FlushFileBuffers`
/// - elsewhere: `File::sync_data`
pub fn sync_file(file: &File) -> io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: the fd comes from a live File borrowed for the whole call.
        let rc = unsafe { libc::fdatasync(file.as_raw_fd()) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: the fd comes from a live File borrowed for the whole call.
        let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_FULLFSYNC) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::io::AsRawHandle;
        use winapi::um::fileapi::FlushFileBuffers;
        // SAFETY: the handle comes from a live File borrowed for the whole call.
        let ok = unsafe { FlushFileBuffers(file.as_raw_handle() as *mut _) };
        if ok != 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(any(
        target_os = "linux",
        target_os = "macos",
        target_os = "ios",
        target_os = "windows"
    )))]
    {
        file.sync_data()
    }
}

/// Persist directory metadata (a completed rename) for the directory holding `path`.
///
/// Windows has no directory fsync; renames there are flushed with the file.
pub fn sync_parent_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        File::open(parent)?.sync_all()
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sync_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"snapshot bytes").unwrap();
        let result = sync_file(file.as_file());
        assert!(result.is_ok(), "sync_file failed: {:?}", result.err());
    }

    #[test]
    fn test_sync_parent_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("DATA.KSDS");
        std::fs::write(&path, b"x").unwrap();
        assert!(sync_parent_dir(&path).is_ok());
    }
}
