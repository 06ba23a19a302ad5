/// Returns true when the current process runs as root (UID 0).
/// Permission-sensitive tests use this to skip themselves in containers.
#[inline]
pub fn running_as_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no side effects.
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
