//! Coalesced work: many requests, at most one run per frame.
//!
//! High-frequency inputs (scroll) only record the latest value; the frame
//! tick takes it once.  The pending flag is explicit so callers can tell
//! whether a frame still needs scheduling.

#[derive(Debug)]
pub struct CoalescedWork<T> {
    latest: Option<T>,
}

impl<T> CoalescedWork<T> {
    pub fn new() -> Self {
        Self { latest: None }
    }

    /// Record `value`, replacing anything not yet taken.  Returns `true`
    /// when this request made the work pending (a frame must be scheduled),
    /// `false` when one was already pending.
    pub fn request(&mut self, value: T) -> bool {
        self.latest.replace(value).is_none()
    }

    /// Take the latest value and clear the pending flag.
    pub fn take(&mut self) -> Option<T> {
        self.latest.take()
    }

    pub fn is_pending(&self) -> bool {
        self.latest.is_some()
    }
}

impl<T> Default for CoalescedWork<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_runs_once_with_latest_value() {
        let mut work = CoalescedWork::new();
        assert!(!work.is_pending());
        assert!(work.request(10.0));
        assert!(!work.request(20.0));
        assert!(!work.request(35.0));
        assert!(work.is_pending());

        assert_eq!(work.take(), Some(35.0));
        assert_eq!(work.take(), None);
        assert!(!work.is_pending());
    }

    #[test]
    fn test_request_after_take_schedules_again() {
        let mut work = CoalescedWork::default();
        work.request(1);
        work.take();
        assert!(work.request(2));
        assert_eq!(work.take(), Some(2));
    }
}
