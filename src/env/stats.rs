//! Rolling episode statistics

use std::collections::VecDeque;

use super::episode::EpisodeOutcome;

/// Mean, minimum and maximum over the most recent `window` samples.
#[derive(Debug, Clone)]
pub struct RollingMean {
    samples: VecDeque<f32>,
    window: usize,
    total: f32,
}

impl RollingMean {
    pub fn new(window: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(window.max(1)),
            window: window.max(1),
            total: 0.0,
        }
    }

    pub fn record(&mut self, sample: f32) {
        while self.samples.len() >= self.window {
            if let Some(evicted) = self.samples.pop_front() {
                self.total -= evicted;
            }
        }
        self.samples.push_back(sample);
        self.total += sample;
    }

    /// Zero until the first sample arrives.
    pub fn mean(&self) -> f32 {
        match self.samples.len() {
            0 => 0.0,
            n => self.total / n as f32,
        }
    }

    pub fn min(&self) -> Option<f32> {
        self.samples.iter().copied().reduce(f32::min)
    }

    pub fn max(&self) -> Option<f32> {
        self.samples.iter().copied().reduce(f32::max)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Totals and recent averages over finished episodes.
#[derive(Debug, Clone)]
pub struct EpisodeStats {
    pub episodes: usize,
    pub wins: usize,
    pub timeouts: usize,
    /// Mean per-agent return of recent episodes
    pub rewards: RollingMean,
    pub lengths: RollingMean,
    pub win_rate: RollingMean,
    current_return: f32,
}

impl EpisodeStats {
    pub fn new(window_size: usize) -> Self {
        Self {
            episodes: 0,
            wins: 0,
            timeouts: 0,
            rewards: RollingMean::new(window_size),
            lengths: RollingMean::new(window_size),
            win_rate: RollingMean::new(window_size),
            current_return: 0.0,
        }
    }

    pub fn record_step(&mut self, rewards: &[f32]) {
        if !rewards.is_empty() {
            self.current_return += rewards.iter().sum::<f32>() / rewards.len() as f32;
        }
    }

    pub fn record_episode(&mut self, outcome: EpisodeOutcome, length: usize) {
        self.episodes += 1;
        match outcome {
            EpisodeOutcome::Won => self.wins += 1,
            EpisodeOutcome::TimedOut => self.timeouts += 1,
            EpisodeOutcome::Lost | EpisodeOutcome::Interrupted => {}
        }
        self.rewards.record(self.current_return);
        self.lengths.record(length as f32);
        self.win_rate.record(if outcome.is_win() { 1.0 } else { 0.0 });
        self.current_return = 0.0;
    }

    pub fn overall_win_rate(&self) -> f32 {
        self.wins as f32 / (self.episodes as f32 + 1e-6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_mean_evicts_oldest() {
        let mut returns = RollingMean::new(2);
        assert!(returns.is_empty());
        assert_eq!(returns.mean(), 0.0);

        returns.record(10.0);
        returns.record(-2.0);
        returns.record(6.0);

        assert_eq!(returns.len(), 2);
        assert!((returns.mean() - 2.0).abs() < 1e-6);
        assert_eq!(returns.min(), Some(-2.0));
        assert_eq!(returns.max(), Some(6.0));
    }

    #[test]
    fn test_episode_stats() {
        let mut stats = EpisodeStats::new(10);

        stats.record_step(&[1.0, 3.0]);
        stats.record_step(&[0.5, 0.5]);
        stats.record_episode(EpisodeOutcome::Won, 2);
        stats.record_step(&[-1.0]);
        stats.record_episode(EpisodeOutcome::TimedOut, 1);

        assert_eq!(stats.episodes, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.timeouts, 1);
        // returns are 2.5 and -1.0
        assert!((stats.rewards.mean() - 0.75).abs() < 1e-6);
        assert!((stats.win_rate.mean() - 0.5).abs() < 1e-6);
        assert!((stats.lengths.mean() - 1.5).abs() < 1e-6);
    }
}
