use std::time::Duration;

/// Delays between send attempts used unless configured otherwise.
pub const DEFAULT_SCHEDULE: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(5),
];

/// Returns the delay to wait before retry number `attempt` (0-based), or
/// `None` once the schedule is exhausted.
pub fn delay_for_attempt(schedule: &[Duration], attempt: usize) -> Option<Duration> {
    schedule.get(attempt).copied()
}

/// Bounded, fixed-schedule retry state.
///
/// A fresh (or [`reset`](Backoff::reset)) backoff yields each scheduled
/// delay once, in order, then reports exhaustion.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tally_common::Backoff;
///
/// let mut backoff = Backoff::default();
/// assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
/// assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
/// assert_eq!(backoff.next_delay(), Some(Duration::from_secs(5)));
/// assert_eq!(backoff.next_delay(), None);
/// backoff.reset();
/// assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    schedule: Vec<Duration>,
    step: usize,
}

impl Backoff {
    pub fn new(schedule: Vec<Duration>) -> Self {
        Self { schedule, step: 0 }
    }

    pub fn next_delay(&mut self) -> Option<Duration> {
        let delay = delay_for_attempt(&self.schedule, self.step)?;
        self.step += 1;
        Some(delay)
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Number of delays handed out since the last reset.
    pub fn retries(&self) -> usize {
        self.step
    }

    /// Total number of attempts a send cycle gets: the first try plus one
    /// per scheduled delay.
    pub fn max_attempts(&self) -> usize {
        self.schedule.len() + 1
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEDULE.to_vec())
    }
}
