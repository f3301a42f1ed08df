//! The rewrite-session deadline: a task-local cell holding its own timeout
//! deadline, consulted cooperatively by the matcher and rewriter before
//! any non-trivial recursive step.
//!
//! `tokio::task_local!` would be the natural fit for an async runtime, but
//! nothing else in this engine is async — the rewrite algorithm is
//! synchronous end to end, with no suspension points other than the memo
//! cache mutex and the timeout check — so a plain `std::thread_local!`
//! cell is enough and keeps one session's deadline from leaking into
//! another thread's.

use std::cell::Cell;
use std::time::{Duration, Instant};

thread_local! {
    static DEADLINE: Cell<Option<Instant>> = Cell::new(None);
    static SESSION_DEPTH: Cell<u32> = Cell::new(0);
}

/// Installs a deadline `secs` seconds from now for the current thread.
/// `0` clears any deadline (per `rewrite_timeout_secs = 0` meaning
/// "disabled").
pub fn arm(secs: u64) {
    DEADLINE.with(|cell| {
        cell.set(if secs == 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_secs(secs))
        });
    });
}

pub fn disarm() {
    DEADLINE.with(|cell| cell.set(None));
}

/// A guard marking one nested level of a rewrite session. `rewrite` recurses
/// into itself for every subterm it normalizes; only the outermost call
/// should arm or disarm the deadline; a nested call entering while a session
/// is already active just bumps the depth counter and leaves the existing
/// deadline alone.
pub struct SessionGuard {
    armed_here: bool,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        SESSION_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
        if self.armed_here {
            disarm();
        }
    }
}

/// Enters one level of a rewrite session, arming a deadline from `secs` if
/// this is the outermost (depth-zero) call.
pub fn enter_session(secs: u64) -> SessionGuard {
    let depth = SESSION_DEPTH.with(|d| {
        let next = d.get() + 1;
        d.set(next);
        next
    });
    let armed_here = depth == 1;
    if armed_here {
        arm(secs);
    }
    SessionGuard { armed_here }
}

/// True once the current thread's deadline, if any, has passed.
pub fn expired() -> bool {
    DEADLINE.with(|cell| matches!(cell.get(), Some(deadline) if Instant::now() >= deadline))
}

/// Runs `f` with a deadline armed for its duration, disarming afterward
/// regardless of how `f` returns.
pub fn with_deadline<T>(secs: u64, f: impl FnOnce() -> T) -> T {
    arm(secs);
    let result = f();
    disarm();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seconds_disables_timeout() {
        arm(0);
        assert!(!expired());
    }

    #[test]
    fn past_deadline_is_expired() {
        DEADLINE.with(|cell| cell.set(Some(Instant::now() - Duration::from_secs(1))));
        assert!(expired());
        disarm();
    }

    #[test]
    fn nested_session_entry_does_not_rearm() {
        let outer = enter_session(0);
        DEADLINE.with(|cell| cell.set(Some(Instant::now() - Duration::from_secs(1))));
        assert!(expired());
        {
            let _inner = enter_session(3600);
            // A nested entry must not clobber the outer deadline.
            assert!(expired());
        }
        assert!(expired(), "deadline must still be set after the inner guard drops");
        drop(outer);
        assert!(!expired(), "deadline is cleared once the outermost guard drops");
    }
}
