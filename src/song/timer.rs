use std::time::Duration;

use tokio::time::Instant;

/// Stopwatch for a song's playback position.
///
/// Elapsed time is the closed segments in `accumulated` plus the currently
/// open segment, if any. Pausing closes the open segment, so paused wall time
/// is never counted.
#[derive(Debug, Default, Clone)]
pub struct PlaybackTimer {
    accumulated: Duration,
    running_since: Option<Instant>,
    started: bool,
}

impl PlaybackTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restarts from zero and begins counting.
    pub fn start(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(Instant::now());
        self.started = true;
    }

    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    /// No-op unless the timer was started and is currently paused.
    pub fn resume(&mut self) {
        if self.started && self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }

    /// Time left until `total`; `None` when the length is unknown (zero).
    pub fn remaining(&self, total: Duration) -> Option<Duration> {
        if total.is_zero() {
            return None;
        }
        Some(total.saturating_sub(self.elapsed()))
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_unstarted_timer_is_zero() {
        let mut timer = PlaybackTimer::new();
        timer.resume();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(timer.elapsed(), Duration::ZERO);
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_gap_not_counted() {
        let mut timer = PlaybackTimer::new();
        timer.start();
        tokio::time::advance(Duration::from_secs(10)).await;

        timer.pause();
        let at_pause = timer.elapsed();
        assert_eq!(at_pause, Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(timer.elapsed(), at_pause);

        timer.resume();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(timer.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_pause_and_resume_are_harmless() {
        let mut timer = PlaybackTimer::new();
        timer.start();
        tokio::time::advance(Duration::from_secs(2)).await;
        timer.pause();
        timer.pause();
        timer.resume();
        timer.resume();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(timer.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_resets() {
        let mut timer = PlaybackTimer::new();
        timer.start();
        tokio::time::advance(Duration::from_secs(30)).await;
        timer.start();
        assert_eq!(timer.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining() {
        let mut timer = PlaybackTimer::new();
        timer.start();
        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(
            timer.remaining(Duration::from_secs(60)),
            Some(Duration::from_secs(10))
        );
        assert_eq!(timer.remaining(Duration::from_secs(30)), Some(Duration::ZERO));
        assert_eq!(timer.remaining(Duration::ZERO), None);
    }
}
