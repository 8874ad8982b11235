//! Termination signal forwarding.
//!
//! SIGINT/SIGTERM are forwarded to every registered child, then the default
//! disposition is restored and the signal re-raised so the hosting
//! environment observes a normal termination instead of a restart loop.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};

const MAX_CHILDREN: usize = 4;

// Child pids change on every restart; slots hold the current generation.
static CHILD_PIDS: [AtomicU32; MAX_CHILDREN] = [
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
];

/// Track a freshly spawned child. Silently drops the pid when every slot is
/// taken; the table is sized for more children than the plan can hold.
pub fn register(pid: u32) {
    for slot in &CHILD_PIDS {
        if slot
            .compare_exchange(0, pid, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return;
        }
    }
}

/// Forget a child whose handle is gone (exit observed or handle replaced).
pub fn unregister(pid: u32) {
    for slot in &CHILD_PIDS {
        let _ = slot.compare_exchange(pid, 0, Ordering::SeqCst, Ordering::SeqCst);
    }
}

/// Install the forwarding handlers once per process.
pub fn install() -> io::Result<()> {
    #[cfg(unix)]
    {
        setup_unix_signal_handlers();
    }
    Ok(())
}

#[cfg(unix)]
fn setup_unix_signal_handlers() {
    use std::sync::Once;

    static INIT: Once = Once::new();

    INIT.call_once(|| unsafe {
        install_sigaction(libc::SIGINT);
        install_sigaction(libc::SIGTERM);
    });
}

#[cfg(unix)]
unsafe fn install_sigaction(signum: libc::c_int) {
    extern "C" fn handler(signum: libc::c_int) {
        // Only async-signal-safe calls in here: kill, signal, raise.
        for slot in &CHILD_PIDS {
            let pid = slot.load(Ordering::SeqCst);
            if pid != 0 {
                unsafe {
                    libc::kill(pid as libc::pid_t, signum);
                }
            }
        }
        unsafe {
            libc::signal(signum, libc::SIG_DFL);
            libc::raise(signum);
        }
    }

    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();

        // SA_RESTART to avoid interrupted system calls elsewhere in the runtime
        action.sa_flags = libc::SA_RESTART;
        action.sa_sigaction = handler as usize;

        let mut empty_set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut empty_set as *mut libc::sigset_t);
        action.sa_mask = empty_set;

        libc::sigaction(signum, &action, std::ptr::null_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_unregister_cycle_slots() {
        register(7001);
        register(7002);
        unregister(7001);
        register(7003);

        let live: Vec<u32> = CHILD_PIDS
            .iter()
            .map(|slot| slot.load(Ordering::SeqCst))
            .filter(|pid| *pid != 0)
            .collect();
        assert!(live.contains(&7002));
        assert!(live.contains(&7003));
        assert!(!live.contains(&7001));

        unregister(7002);
        unregister(7003);
    }
}
