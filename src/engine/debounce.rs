use std::time::{Duration, Instant};

/// Generation-keyed trailing debounce.
///
/// Each `schedule` supersedes the pending deadline; only the newest
/// generation can ever fire.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    generation: u64,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            generation: 0,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) -> u64 {
        self.generation += 1;
        self.deadline = Some(now + self.quiet);
        self.generation
    }

    /// The pending generation, once its quiet period has elapsed. Fires once.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        Some(self.generation)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(500));
        let generation = d.schedule(start);
        assert_eq!(d.poll(start + Duration::from_millis(499)), None);
        assert_eq!(d.poll(start + Duration::from_millis(500)), Some(generation));
        assert_eq!(d.poll(start + Duration::from_millis(900)), None);
    }

    #[test]
    fn test_reschedule_supersedes() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(500));
        let old = d.schedule(start);
        let new = d.schedule(start + Duration::from_millis(300));
        assert!(!d.is_current(old));
        assert_eq!(d.poll(start + Duration::from_millis(600)), None);
        assert_eq!(d.poll(start + Duration::from_millis(800)), Some(new));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.schedule(start);
        d.cancel();
        assert!(!d.is_pending());
        assert_eq!(d.poll(start + Duration::from_secs(1)), None);
    }
}
