use std::thread;
use std::time::Duration;
use tracing::debug;

/// Check if process is alive without disturbing it (kill with signal 0).
pub fn process_alive(pid: u32) -> bool {
    let c_pid = pid as libc::pid_t;
    match send_signal(c_pid, 0) {
        Ok(_) => true,                      // Signal sent successfully, process exists
        Err(errno) => errno == libc::EPERM, // EPERM means process exists but no permission
    }
}

/// Terminate process: SIGTERM first, SIGKILL if it is still around after a
/// short grace period.
pub fn terminate_process(pid: u32) {
    let c_pid = pid as libc::pid_t;

    if !process_alive(pid) {
        return;
    }

    if send_signal(c_pid, libc::SIGTERM).is_ok() {
        thread::sleep(Duration::from_millis(500));

        if !process_alive(pid) {
            return;
        }
    }

    if send_signal(c_pid, libc::SIGKILL).is_ok() {
        debug!("pid={} sent SIGKILL", pid);
    }
}

/// Encapsulates the unsafe kill call and returns the errno on failure.
fn send_signal(pid: libc::pid_t, signal: libc::c_int) -> Result<(), libc::c_int> {
    let result = unsafe { libc::kill(pid, signal) };
    if result == 0 {
        Ok(())
    } else {
        Err(last_errno())
    }
}

fn last_errno() -> libc::c_int {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        unsafe { *libc::__errno_location() }
    }

    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    {
        unsafe { *libc::__error() }
    }

    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd"
    )))]
    {
        0
    }
}
