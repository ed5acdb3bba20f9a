//! Extended attributes on the host filesystem.

use std::io;
use std::path::Path;

use unsfs_core::{AttributeService, AttributeValue};

/// [`AttributeService`] backed by the host's `getxattr`/`setxattr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostAttributes;

impl HostAttributes {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
mod imp {
    use std::ffi::CString;
    use std::io;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    use bytes::Bytes;
    use unsfs_core::AttributeValue;

    /// Largest value the kernel stores for a single attribute.
    pub(super) const XATTR_SIZE_MAX: usize = 64 * 1024;

    fn cstrings(path: &Path, name: &str) -> io::Result<(CString, CString)> {
        Ok((
            CString::new(path.as_os_str().as_bytes())?,
            CString::new(name)?,
        ))
    }

    /// Size of the stored value, without reading it.
    fn stored_len(path: &CString, name: &CString, follow_symlink: bool) -> io::Result<usize> {
        let res = unsafe {
            if follow_symlink {
                libc::getxattr(path.as_ptr(), name.as_ptr(), std::ptr::null_mut(), 0)
            } else {
                libc::lgetxattr(path.as_ptr(), name.as_ptr(), std::ptr::null_mut(), 0)
            }
        };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(res as usize)
    }

    pub fn get(
        path: &Path,
        name: &str,
        max_len: usize,
        follow_symlink: bool,
    ) -> io::Result<AttributeValue> {
        let (cpath, cname) = cstrings(path, name)?;

        // A zero-sized buffer makes getxattr report the size instead of reading.
        if max_len == 0 {
            return match stored_len(&cpath, &cname, follow_symlink) {
                Ok(0) => Ok(AttributeValue::Present(Bytes::new())),
                Ok(len) => Ok(AttributeValue::TooLarge(len)),
                Err(e) if e.raw_os_error() == Some(libc::ENODATA) => Ok(AttributeValue::Absent),
                Err(e) => Err(e),
            };
        }

        let mut buf = vec![0u8; max_len.min(XATTR_SIZE_MAX)];
        let res = unsafe {
            if follow_symlink {
                libc::getxattr(
                    cpath.as_ptr(),
                    cname.as_ptr(),
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                )
            } else {
                libc::lgetxattr(
                    cpath.as_ptr(),
                    cname.as_ptr(),
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                )
            }
        };
        if res < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::ENODATA) => Ok(AttributeValue::Absent),
                Some(libc::ERANGE) => {
                    Ok(AttributeValue::TooLarge(stored_len(&cpath, &cname, follow_symlink)?))
                }
                _ => Err(err),
            };
        }

        buf.truncate(res as usize);
        Ok(AttributeValue::Present(Bytes::from(buf)))
    }

    pub fn set(path: &Path, name: &str, value: &[u8]) -> io::Result<()> {
        let (cpath, cname) = cstrings(path, name)?;
        let res = unsafe {
            libc::setxattr(
                cpath.as_ptr(),
                cname.as_ptr(),
                value.as_ptr() as *const libc::c_void,
                value.len(),
                0,
            )
        };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use std::io;
    use std::path::Path;

    use unsfs_core::AttributeValue;

    fn unsupported() -> io::Error {
        io::Error::new(
            io::ErrorKind::Unsupported,
            "extended attributes are only supported on Linux",
        )
    }

    pub fn get(_: &Path, _: &str, _: usize, _: bool) -> io::Result<AttributeValue> {
        Err(unsupported())
    }

    pub fn set(_: &Path, _: &str, _: &[u8]) -> io::Result<()> {
        Err(unsupported())
    }
}

impl AttributeService for HostAttributes {
    fn get_attribute(
        &self,
        path: &Path,
        name: &str,
        max_len: usize,
        follow_symlink: bool,
    ) -> io::Result<AttributeValue> {
        log::debug!("getxattr {} {}", path.display(), name);
        imp::get(path, name, max_len, follow_symlink)
    }

    fn set_attribute(&self, path: &Path, name: &str, value: &[u8]) -> io::Result<()> {
        log::debug!("setxattr {} {} ({} bytes)", path.display(), name, value.len());
        imp::set(path, name, value)
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use unsfs_core::{AttributeResolver, AttributeValue};

    const NAME: &str = "user.unsfs.test";

    /// Some temp filesystems (tmpfs on older kernels, overlayfs) refuse user xattrs.
    fn supported(dir: &Path) -> bool {
        match HostAttributes.set_attribute(dir, NAME, b"probe") {
            Ok(()) => true,
            Err(e) => {
                eprintln!("skipping: user xattrs unsupported here: {}", e);
                false
            }
        }
    }

    #[test]
    fn missing_attribute_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        if !supported(dir.path()) {
            return;
        }

        let value = HostAttributes
            .get_attribute(dir.path(), "user.unsfs.missing", 1024, false)
            .unwrap();
        assert_eq!(value, AttributeValue::Absent);
    }

    #[test]
    fn set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        if !supported(dir.path()) {
            return;
        }

        HostAttributes
            .set_attribute(dir.path(), NAME, b"pool=123:cont=56")
            .unwrap();
        let value = HostAttributes
            .get_attribute(dir.path(), NAME, 1024, false)
            .unwrap();
        assert_eq!(
            value,
            AttributeValue::Present(bytes::Bytes::from_static(b"pool=123:cont=56"))
        );
    }

    #[test]
    fn oversized_value_reports_length() {
        let dir = tempfile::tempdir().unwrap();
        if !supported(dir.path()) {
            return;
        }

        HostAttributes
            .set_attribute(dir.path(), NAME, b"pool=123456789")
            .unwrap();
        assert_eq!(
            HostAttributes.get_attribute(dir.path(), NAME, 4, false).unwrap(),
            AttributeValue::TooLarge(14)
        );
        assert_eq!(
            HostAttributes.get_attribute(dir.path(), NAME, 0, false).unwrap(),
            AttributeValue::TooLarge(14)
        );
    }

    #[test]
    fn huge_limit_reads_without_full_allocation() {
        let dir = tempfile::tempdir().unwrap();
        if !supported(dir.path()) {
            return;
        }

        HostAttributes.set_attribute(dir.path(), NAME, b"pool=1").unwrap();
        assert_eq!(
            HostAttributes
                .get_attribute(dir.path(), NAME, usize::MAX, false)
                .unwrap(),
            AttributeValue::Present(bytes::Bytes::from_static(b"pool=1"))
        );
        assert_eq!(imp::XATTR_SIZE_MAX, 65_536);
    }

    #[test]
    fn resolver_reads_host_binding() {
        let dir = tempfile::tempdir().unwrap();
        if !supported(dir.path()) {
            return;
        }

        let resolver = AttributeResolver::new(HostAttributes::new());
        let entries: unsfs_core::KeyValues =
            [("pool", "p:1"), ("cont", "c")].into_iter().collect();
        resolver.bind(dir.path(), NAME, &entries, 1024).unwrap();

        let back = resolver
            .resolve_entries(dir.path(), NAME, 1024, false)
            .unwrap()
            .unwrap();
        assert_eq!(back.get("pool"), Some("p:1"));
    }

    #[test]
    fn nul_in_name_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(HostAttributes
            .get_attribute(dir.path(), "user.bad\0name", 16, false)
            .is_err());
    }
}
