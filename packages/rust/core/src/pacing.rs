//! Fixed waits between network operations.
//!
//! The orchestrators never sleep directly; they ask a [`Pacer`] to pause
//! at named points so tests can run with [`NoDelay`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use blogforge_shared::PacingConfig;

/// Points in the pipelines where a pause is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingStep {
    /// After the search query, before the first competitor fetch.
    AfterSearch,
    /// Between two competitor fetches.
    BetweenCompetitors,
    /// Between two articles of a batch enhancement.
    BetweenArticles,
    /// Between two article pages during acquisition.
    BetweenAcquisitions,
}

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, step: PacingStep);
}

/// Sleeps for a configured duration per step.
#[derive(Debug, Clone)]
pub struct FixedDelays {
    pub after_search: Duration,
    pub between_competitors: Duration,
    pub between_articles: Duration,
    pub between_acquisitions: Duration,
}

impl FixedDelays {
    pub fn delay_for(&self, step: PacingStep) -> Duration {
        match step {
            PacingStep::AfterSearch => self.after_search,
            PacingStep::BetweenCompetitors => self.between_competitors,
            PacingStep::BetweenArticles => self.between_articles,
            PacingStep::BetweenAcquisitions => self.between_acquisitions,
        }
    }
}

impl From<&PacingConfig> for FixedDelays {
    fn from(config: &PacingConfig) -> Self {
        Self {
            after_search: Duration::from_millis(config.search_delay_ms),
            between_competitors: Duration::from_millis(config.competitor_delay_ms),
            between_articles: Duration::from_millis(config.article_delay_ms),
            between_acquisitions: Duration::from_millis(config.acquisition_delay_ms),
        }
    }
}

impl Default for FixedDelays {
    fn default() -> Self {
        Self::from(&PacingConfig::default())
    }
}

#[async_trait]
impl Pacer for FixedDelays {
    async fn pause(&self, step: PacingStep) {
        let delay = self.delay_for(step);
        if delay.is_zero() {
            return;
        }
        trace!(?step, delay_ms = delay.as_millis() as u64, "pacing");
        tokio::time::sleep(delay).await;
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&self, _step: PacingStep) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config() {
        let delays = FixedDelays::default();
        assert_eq!(delays.delay_for(PacingStep::AfterSearch), Duration::from_millis(2000));
        assert_eq!(
            delays.delay_for(PacingStep::BetweenCompetitors),
            Duration::from_millis(2000)
        );
        assert_eq!(delays.delay_for(PacingStep::BetweenArticles), Duration::from_millis(5000));
        assert_eq!(
            delays.delay_for(PacingStep::BetweenAcquisitions),
            Duration::from_millis(1000)
        );
    }

    #[tokio::test]
    async fn fixed_delay_sleeps() {
        let delays = FixedDelays {
            after_search: Duration::ZERO,
            between_competitors: Duration::ZERO,
            between_articles: Duration::from_millis(20),
            between_acquisitions: Duration::ZERO,
        };
        let start = std::time::Instant::now();
        delays.pause(PacingStep::BetweenArticles).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
