//! Anonymous in-memory files for loading libraries without touching disk.

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd};
use std::path::PathBuf;

const NAME: &[u8] = b"stowage-module\0";

/// Copy `bytes` into a fresh memfd.
pub(crate) fn anonymous_file(bytes: &[u8]) -> io::Result<File> {
    // SAFETY: NAME is NUL-terminated; the flags are valid for memfd_create.
    let fd = unsafe { libc::memfd_create(NAME.as_ptr().cast(), libc::MFD_CLOEXEC) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: fd was just returned by memfd_create and is owned by nothing else.
    let mut file = unsafe { File::from_raw_fd(fd) };
    file.write_all(bytes)?;
    Ok(file)
}

/// Path through which the dynamic linker can open `file`.
pub(crate) fn proc_path(file: &File) -> PathBuf {
    PathBuf::from(format!("/proc/self/fd/{}", file.as_raw_fd()))
}
