//! SIGINT bookkeeping for in-flight deploys.
//!
//! The foreground child shares our process group, so Ctrl-C still stops the
//! running `git`/`heroku` command. The handler only records that it happened,
//! which lets the failing step unwind its guards (maintenance off, workers
//! restored, tags and refs removed) instead of the whole process dying
//! mid-sequence. Once recorded, the executor refuses to start any further
//! command except those run while a guard is releasing. A second Ctrl-C
//! restores the default disposition and terminates immediately.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};

static RECEIVED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static RELEASING: Cell<usize> = const { Cell::new(0) };
}

/// Install the SIGINT handler. No-op on non-Unix targets.
pub fn install() {
    #[cfg(unix)]
    unsafe {
        libc::signal(
            libc::SIGINT,
            handle_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
    }
}

#[cfg(unix)]
extern "C" fn handle_sigint(_: libc::c_int) {
    if RECEIVED.swap(true, Ordering::SeqCst) {
        unsafe {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::raise(libc::SIGINT);
        }
    }
}

/// Whether an interrupt has been received during this run.
pub fn received() -> bool {
    RECEIVED.load(Ordering::SeqCst)
}

/// Whether the current thread is inside a guard release.
pub fn releasing() -> bool {
    RELEASING.with(|depth| depth.get() > 0)
}

struct ReleaseScope;

impl Drop for ReleaseScope {
    fn drop(&mut self) {
        RELEASING.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Run `release` with commands allowed to start after an interrupt.
pub fn while_releasing<T>(release: impl FnOnce() -> T) -> T {
    RELEASING.with(|depth| depth.set(depth.get() + 1));
    let _scope = ReleaseScope;
    release()
}
