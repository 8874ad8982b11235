//! Platform-specific process plumbing.

#[cfg(unix)]
pub mod unix;

#[cfg(unix)]
pub use unix::{process_alive, terminate_process};

/// Prepare a command for supervised execution: own process group, and on
/// Linux a parent-death signal so orphaned children do not outlive the
/// warden.
pub fn prepare_command(cmd: &mut tokio::process::Command) {
    #[cfg(unix)]
    {
        use std::io;

        unsafe {
            cmd.pre_exec(|| {
                if libc::setpgid(0, 0) != 0 {
                    return Err(io::Error::last_os_error());
                }
                #[cfg(target_os = "linux")]
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) != 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }
    #[cfg(not(unix))]
    {
        let _ = cmd;
    }
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    false
}

#[cfg(not(unix))]
pub fn terminate_process(_pid: u32) {}
