// Time series domain models
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(time: DateTime<Utc>, value: f64) -> Self {
        Self { time, value }
    }
}

/// Inclusive time range a series was fetched over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub range: TimeRange,
    pub samples: Vec<Sample>,
}

impl Series {
    /// Build a series from provider samples. Samples are stably sorted by time.
    pub fn new(range: TimeRange, mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.time);
        Self { range, samples }
    }

    /// Build a series from samples already in time order.
    pub(crate) fn from_ordered(range: TimeRange, samples: Vec<Sample>) -> Self {
        debug_assert!(samples.windows(2).all(|w| w[0].time <= w[1].time));
        Self { range, samples }
    }

    /// Build a series from nullable samples, dropping the absent ones.
    pub fn from_nullable(
        range: TimeRange,
        samples: impl IntoIterator<Item = (DateTime<Utc>, Option<f64>)>,
    ) -> Self {
        let samples = samples
            .into_iter()
            .filter_map(|(time, value)| value.map(|v| Sample::new(time, v)))
            .collect();
        Self::new(range, samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    /// Same timestamps and range, values mapped through `f`.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        let samples = self
            .samples
            .iter()
            .map(|s| Sample::new(s.time, f(s.value)))
            .collect();
        Self::from_ordered(self.range, samples)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + chrono::TimeDelta::minutes(minute)
    }

    pub fn series(points: &[(i64, f64)]) -> Series {
        let samples = points.iter().map(|&(m, v)| Sample::new(at(m), v)).collect();
        Series::new(TimeRange::new(at(0), at(60)), samples)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_new_orders_samples_by_time() {
        let s = series(&[(3, 3.0), (1, 1.0), (2, 2.0)]);
        assert_eq!(s.values().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_nullable_drops_absent_samples() {
        let range = TimeRange::new(at(0), at(10));
        let s = Series::from_nullable(range, vec![(at(1), Some(1.5)), (at(2), None), (at(3), Some(2.5))]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.samples[1].time, at(3));
    }
}
