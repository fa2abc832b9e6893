// Copyright 2025 Cowboy AI, LLC.

//! Metrics collection for compliance evaluations

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Counter names recorded by the engine
pub mod names {
    /// Evaluations that ran every rule
    pub const EVALUATIONS: &str = "evaluation.completed";
    /// Evaluations aborted because an entity was missing
    pub const NOT_FOUND: &str = "evaluation.not_found";
    /// Evaluations aborted by cancellation
    pub const CANCELLED: &str = "evaluation.cancelled";
    /// Alerts raised by any rule
    pub const ALERTS_RAISED: &str = "alerts.raised";
    /// Alerts that were persisted
    pub const ALERTS_SAVED: &str = "alerts.saved";
    /// Alerts lost to persistence failures
    pub const ALERTS_FAILED: &str = "alerts.failed";
    /// Duration of a full evaluation
    pub const EVALUATE: &str = "evaluate";
}

/// Counters and duration samples for the evaluation pipeline
#[derive(Debug, Clone, Default)]
pub struct EvaluationMetrics {
    counters: Arc<RwLock<HashMap<String, u64>>>,
    durations: Arc<RwLock<HashMap<String, Vec<Duration>>>>,
}

impl EvaluationMetrics {
    /// Keep only the most recent samples per operation
    const MAX_SAMPLES: usize = 1000;

    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter
    pub async fn increment(&self, name: &str) {
        let mut counters = self.counters.write().await;
        *counters.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Count an alert raised by `rule`
    pub async fn record_alert(&self, rule: &str) {
        self.increment(names::ALERTS_RAISED).await;
        self.increment(&format!("{}.{rule}", names::ALERTS_RAISED)).await;
    }

    /// Record operation duration
    pub async fn record_duration(&self, operation: &str, duration: Duration) {
        let mut durations = self.durations.write().await;
        let samples = durations.entry(operation.to_string()).or_default();
        samples.push(duration);
        if samples.len() > Self::MAX_SAMPLES {
            let excess = samples.len() - Self::MAX_SAMPLES;
            samples.drain(0..excess);
        }
    }

    /// Get counter value
    pub async fn get_counter(&self, name: &str) -> u64 {
        self.counters.read().await.get(name).copied().unwrap_or(0)
    }

    /// Get average duration for an operation
    pub async fn get_avg_duration(&self, operation: &str) -> Option<Duration> {
        let durations = self.durations.read().await;
        durations.get(operation).and_then(|samples| average(samples))
    }

    /// Snapshot of every counter and duration
    pub async fn summary(&self) -> MetricsSummary {
        let counters = self.counters.read().await.clone();
        let durations = self
            .durations
            .read()
            .await
            .iter()
            .filter_map(|(op, samples)| DurationStats::from_samples(samples).map(|s| (op.clone(), s)))
            .collect();

        MetricsSummary {
            counters,
            durations,
        }
    }

    /// Reset all metrics
    pub async fn reset(&self) {
        self.counters.write().await.clear();
        self.durations.write().await.clear();
    }
}

fn average(samples: &[Duration]) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    let sum: Duration = samples.iter().sum();
    Some(sum / samples.len() as u32)
}

/// Summary of all metrics
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    /// Counter values
    pub counters: HashMap<String, u64>,
    /// Duration statistics
    pub durations: HashMap<String, DurationStats>,
}

/// Duration statistics for an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationStats {
    /// Number of measurements
    pub count: usize,
    /// Average duration
    pub avg: Duration,
    /// 50th percentile
    pub p50: Duration,
    /// 95th percentile
    pub p95: Duration,
    /// Minimum duration
    pub min: Duration,
    /// Maximum duration
    pub max: Duration,
}

impl DurationStats {
    fn from_samples(samples: &[Duration]) -> Option<Self> {
        let avg = average(samples)?;
        let mut sorted = samples.to_vec();
        sorted.sort();
        let at = |percentile: f64| sorted[((sorted.len() as f64 - 1.0) * percentile) as usize];

        Some(Self {
            count: sorted.len(),
            avg,
            p50: at(0.5),
            p95: at(0.95),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Timer for measuring operation duration
pub struct MetricsTimer<'a> {
    metrics: &'a EvaluationMetrics,
    operation: &'static str,
    start: Instant,
}

impl<'a> MetricsTimer<'a> {
    /// Start timing `operation`
    pub fn new(metrics: &'a EvaluationMetrics, operation: &'static str) -> Self {
        Self {
            metrics,
            operation,
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration
    pub async fn record(self) {
        self.metrics
            .record_duration(self.operation, self.start.elapsed())
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counters() {
        let metrics = EvaluationMetrics::new();

        metrics.increment(names::EVALUATIONS).await;
        metrics.increment(names::EVALUATIONS).await;

        assert_eq!(metrics.get_counter(names::EVALUATIONS).await, 2);
        assert_eq!(metrics.get_counter("nonexistent").await, 0);
    }

    #[tokio::test]
    async fn test_alerts_are_counted_per_rule() {
        let metrics = EvaluationMetrics::new();

        metrics.record_alert("DailyLimitRule").await;
        metrics.record_alert("DailyLimitRule").await;
        metrics.record_alert("RiskCountryRule").await;

        assert_eq!(metrics.get_counter(names::ALERTS_RAISED).await, 3);
        assert_eq!(metrics.get_counter("alerts.raised.DailyLimitRule").await, 2);
        assert_eq!(metrics.get_counter("alerts.raised.RiskCountryRule").await, 1);
    }

    #[tokio::test]
    async fn test_durations() {
        let metrics = EvaluationMetrics::new();

        metrics.record_duration("op1", Duration::from_millis(10)).await;
        metrics.record_duration("op1", Duration::from_millis(20)).await;
        metrics.record_duration("op1", Duration::from_millis(30)).await;

        assert_eq!(
            metrics.get_avg_duration("op1").await,
            Some(Duration::from_millis(20))
        );
        assert_eq!(metrics.get_avg_duration("missing").await, None);
    }

    #[tokio::test]
    async fn test_samples_are_capped() {
        let metrics = EvaluationMetrics::new();
        for _ in 0..1005 {
            metrics.record_duration("op", Duration::from_millis(1)).await;
        }

        let summary = metrics.summary().await;
        assert_eq!(summary.durations["op"].count, 1000);
    }

    #[tokio::test]
    async fn test_timer() {
        let metrics = EvaluationMetrics::new();

        let timer = MetricsTimer::new(&metrics, names::EVALUATE);
        tokio::time::sleep(Duration::from_millis(10)).await;
        timer.record().await;

        assert!(metrics.get_avg_duration(names::EVALUATE).await.unwrap() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_summary_and_reset() {
        let metrics = EvaluationMetrics::new();

        metrics.increment(names::ALERTS_SAVED).await;
        metrics.record_duration("save", Duration::from_millis(5)).await;
        metrics.record_duration("save", Duration::from_millis(15)).await;

        let summary = metrics.summary().await;
        assert_eq!(summary.counters.get(names::ALERTS_SAVED), Some(&1));
        let save = &summary.durations["save"];
        assert_eq!(save.count, 2);
        assert_eq!(save.avg, Duration::from_millis(10));
        assert_eq!(save.min, Duration::from_millis(5));
        assert_eq!(save.max, Duration::from_millis(15));

        metrics.reset().await;
        assert!(metrics.summary().await.counters.is_empty());
    }
}
