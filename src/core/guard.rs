//! Scoped acquire/release around a protected section.
//!
//! Every workflow resource (deploy ref, deploy tag, scaled-down workers,
//! maintenance mode) is held through [`with_guard`]. Guards nest, so they
//! unwind innermost first.
//!
//! Once acquisition has been attempted, the release runs exactly once: after
//! the body returns, after the body fails, after the acquire itself fails
//! (platform toggles may have applied before reporting an error), and from
//! `Drop` if the body panics. Releases run inside
//! [`interrupt::while_releasing`], so they still execute after Ctrl-C.
//!
//! Release failures follow the guard's [`ReleasePolicy`]:
//!
//! | body      | release   | `Propagate`     | `BestEffort`    |
//! |-----------|-----------|-----------------|-----------------|
//! | `Ok(v)`   | `Ok`      | `Ok(v)`         | `Ok(v)`         |
//! | `Ok(v)`   | `Err(r)`  | `Err(r)`        | warn, `Ok(v)`   |
//! | `Err(e)`  | `Ok`      | `Err(e)`        | `Err(e)`        |
//! | `Err(e)`  | `Err(r)`  | warn, `Err(e)`  | warn, `Err(e)`  |

use crate::error::{Error, Result};
use crate::interrupt;
use crate::report;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleasePolicy {
    /// A release failure fails the run unless an earlier failure is already propagating.
    Propagate,
    /// A release failure is only ever reported as a warning.
    BestEffort,
}

struct PendingRelease<'n, F>
where
    F: FnOnce() -> Result<()>,
{
    name: &'n str,
    release: Option<F>,
}

impl<F> PendingRelease<'_, F>
where
    F: FnOnce() -> Result<()>,
{
    fn run(&mut self) -> Result<()> {
        match self.release.take() {
            Some(release) => interrupt::while_releasing(release),
            None => Ok(()),
        }
    }
}

impl<F> Drop for PendingRelease<'_, F>
where
    F: FnOnce() -> Result<()>,
{
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            if let Err(err) = interrupt::while_releasing(release) {
                warn_release_failed(self.name, &err);
            }
        }
    }
}

fn warn_release_failed(name: &str, err: &Error) {
    report::warning(&format!("Could not release {}: {}", name, err));
    log_status!("guard", "{} release failed: {:?}", name, err.details);
}

/// Run `body` between `acquire` and `release`.
pub fn with_guard<T, A, B, R>(
    name: &str,
    policy: ReleasePolicy,
    acquire: A,
    body: B,
    release: R,
) -> Result<T>
where
    A: FnOnce() -> Result<()>,
    B: FnOnce() -> Result<T>,
    R: FnOnce() -> Result<()>,
{
    let mut pending = PendingRelease {
        name,
        release: Some(release),
    };

    let outcome = acquire().and_then(|()| body());
    let released = pending.run();

    settle(name, policy, outcome, released)
}

/// Run `body` under the guard only when `enabled`; otherwise run it bare.
pub fn with_guard_if<T, A, B, R>(
    enabled: bool,
    name: &str,
    policy: ReleasePolicy,
    acquire: A,
    body: B,
    release: R,
) -> Result<T>
where
    A: FnOnce() -> Result<()>,
    B: FnOnce() -> Result<T>,
    R: FnOnce() -> Result<()>,
{
    if enabled {
        with_guard(name, policy, acquire, body, release)
    } else {
        body()
    }
}

fn settle<T>(
    name: &str,
    policy: ReleasePolicy,
    outcome: Result<T>,
    released: Result<()>,
) -> Result<T> {
    match (outcome, released) {
        (outcome, Ok(())) => outcome,
        (Ok(value), Err(err)) => match policy {
            ReleasePolicy::Propagate => Err(err),
            ReleasePolicy::BestEffort => {
                warn_release_failed(name, &err);
                Ok(value)
            }
        },
        (Err(original), Err(err)) => {
            warn_release_failed(name, &err);
            Err(original)
        }
    }
}
