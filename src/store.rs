//! In-memory retention of sensor readings.
//!
//! One append-only log per sensor id, created lazily on first append.
//! Appends preserve producer order for a given sensor; timestamps are
//! trusted as-is and never reordered. Retention is unbounded here;
//! eviction and rotation are a deployment concern.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::sensor::types::Reading;

/// Time and count filter for [`ReadingStore::query`].
///
/// All bounds are optional; the default query returns everything.
#[derive(Debug, Clone, Default)]
pub struct ReadingQuery {
    /// Return at most this many of the most recent matches.
    pub limit: Option<usize>,
    /// Inclusive lower timestamp bound.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound.
    pub end: Option<DateTime<Utc>>,
}

impl ReadingQuery {
    /// Query for the most recent `limit` readings.
    pub fn last(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// Append-only per-sensor reading logs.
#[derive(Debug, Default)]
pub struct ReadingStore {
    logs: RwLock<HashMap<String, Vec<Reading>>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading, lazily creating the sensor's log.
    pub async fn append(&self, reading: Reading) {
        let mut logs = self.logs.write().await;
        logs.entry(reading.sensor_id.clone()).or_default().push(reading);
    }

    /// Readings for a sensor in chronological order.
    ///
    /// Applies the time bounds first, then keeps the most recent `limit`
    /// matches. Unknown sensor ids yield an empty vec, not an error.
    pub async fn query(&self, sensor_id: &str, query: &ReadingQuery) -> Vec<Reading> {
        let logs = self.logs.read().await;
        let log = match logs.get(sensor_id) {
            Some(log) => log,
            None => return Vec::new(),
        };

        let matches: Vec<&Reading> = log
            .iter()
            .filter(|r| {
                query.start.map_or(true, |s| r.timestamp >= s)
                    && query.end.map_or(true, |e| r.timestamp <= e)
            })
            .collect();

        let skip = query
            .limit
            .map_or(0, |limit| matches.len().saturating_sub(limit));
        matches.into_iter().skip(skip).cloned().collect()
    }

    /// The most recent reading for a sensor, if any.
    pub async fn latest(&self, sensor_id: &str) -> Option<Reading> {
        self.logs
            .read()
            .await
            .get(sensor_id)
            .and_then(|log| log.last().cloned())
    }

    /// Number of retained readings for a sensor.
    pub async fn count(&self, sensor_id: &str) -> usize {
        self.logs
            .read()
            .await
            .get(sensor_id)
            .map_or(0, |log| log.len())
    }

    /// Drop a sensor's entire log. Subsequent queries return empty.
    pub async fn remove(&self, sensor_id: &str) {
        self.logs.write().await.remove(sensor_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reading_at(sensor_id: &str, value: f64, secs_ago: i64) -> Reading {
        Reading::new(sensor_id)
            .with_field("temperature", value)
            .at(Utc::now() - Duration::seconds(secs_ago))
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = ReadingStore::new();
        for i in 0..5 {
            store.append(reading_at("s1", i as f64, 50 - i * 10)).await;
        }

        let readings = store.query("s1", &ReadingQuery::default()).await;
        assert_eq!(readings.len(), 5);
        let values: Vec<f64> = readings
            .iter()
            .map(|r| r.field("temperature").unwrap())
            .collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        for pair in readings.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_limit_keeps_most_recent() {
        let store = ReadingStore::new();
        for i in 0..10 {
            store.append(reading_at("s1", i as f64, 100 - i * 10)).await;
        }

        let readings = store.query("s1", &ReadingQuery::last(3)).await;
        let values: Vec<f64> = readings
            .iter()
            .map(|r| r.field("temperature").unwrap())
            .collect();
        assert_eq!(values, vec![7.0, 8.0, 9.0]);

        // Asking for more than exists returns everything
        let readings = store.query("s1", &ReadingQuery::last(50)).await;
        assert_eq!(readings.len(), 10);
    }

    #[tokio::test]
    async fn test_time_bounds_are_inclusive() {
        let store = ReadingStore::new();
        let now = Utc::now();
        for secs_ago in [30, 20, 10] {
            store.append(reading_at("s1", secs_ago as f64, secs_ago)).await;
        }

        let query = ReadingQuery {
            limit: None,
            start: Some(now - Duration::seconds(20)),
            end: Some(now - Duration::seconds(10)),
        };
        let readings = store.query("s1", &query).await;
        assert_eq!(readings.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_sensor_is_empty_not_error() {
        let store = ReadingStore::new();
        assert!(store.query("nope", &ReadingQuery::default()).await.is_empty());
        assert!(store.latest("nope").await.is_none());
        assert_eq!(store.count("nope").await, 0);
    }

    #[tokio::test]
    async fn test_remove_drops_history() {
        let store = ReadingStore::new();
        store.append(reading_at("s1", 1.0, 10)).await;
        store.append(reading_at("s2", 2.0, 10)).await;

        store.remove("s1").await;

        assert!(store.query("s1", &ReadingQuery::default()).await.is_empty());
        assert_eq!(store.count("s2").await, 1);
    }

    #[tokio::test]
    async fn test_latest() {
        let store = ReadingStore::new();
        store.append(reading_at("s1", 1.0, 20)).await;
        store.append(reading_at("s1", 2.0, 10)).await;

        let latest = store.latest("s1").await.unwrap();
        assert_eq!(latest.field("temperature"), Some(2.0));
    }
}
