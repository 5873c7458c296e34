// In-process tag store, optionally seeded from a CSV export
use crate::application::tag_store::{SeriesProvider, StoreBounds, StoreError, TagSink};
use crate::domain::series::{Series, TimeRange};
use crate::domain::tag::TagId;
use crate::domain::window::TimeBounds;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;

/// Row table keyed by timestamp; each row holds the non-null cells by column.
#[derive(Debug, Default)]
struct Table {
    columns: HashSet<String>,
    rows: BTreeMap<DateTime<Utc>, HashMap<String, f64>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a CSV with a `Time` column followed by one column per tag.
    /// Empty or non-numeric cells are stored as nulls.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open CSV seed {}", path.display()))?;

        let headers = reader.headers()?.clone();
        let time_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("time"))
            .context("CSV seed has no Time column")?;

        let mut columns = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            if idx == time_idx {
                continue;
            }
            if TagId::is_valid(header) {
                columns.push((idx, header.to_string()));
            } else {
                tracing::warn!("Skipping CSV column '{}': not a valid tag id", header);
            }
        }
        let names: Vec<&str> = columns.iter().map(|(_, name)| name.as_str()).collect();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let raw_time = record.get(time_idx).unwrap_or_default();
            let time = parse_timestamp(raw_time)
                .with_context(|| format!("Bad timestamp '{}' on data row {}", raw_time, line + 1))?;
            let cells = columns
                .iter()
                .map(|(idx, _)| record.get(*idx).and_then(|c| c.trim().parse::<f64>().ok()))
                .collect();
            rows.push((time, cells));
        }

        let store = Self::new();
        let count = rows.len();
        store.insert_rows(&names, rows);
        tracing::info!(
            "Loaded {} rows x {} tags from {}",
            count,
            names.len(),
            path.display()
        );
        Ok(store)
    }

    /// Insert rows of nullable cells; `columns` names each cell position.
    pub fn insert_rows(&self, columns: &[&str], rows: Vec<(DateTime<Utc>, Vec<Option<f64>>)>) {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        table.columns.extend(columns.iter().map(|c| c.to_string()));
        for (time, cells) in rows {
            let row = table.rows.entry(time).or_default();
            for (column, cell) in columns.iter().zip(cells) {
                match cell {
                    Some(value) => row.insert(column.to_string(), value),
                    None => row.remove(*column),
                };
            }
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))?;
    Ok(naive.and_utc())
}

impl SeriesProvider for MemoryStore {
    fn fetch(&self, tag: &TagId, range: TimeRange) -> Result<Series, StoreError> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        if !table.columns.contains(tag.as_str()) {
            return Err(StoreError::UnknownTag(tag.to_string()));
        }
        let cells = table
            .rows
            .range(range.start..=range.end)
            .map(|(time, row)| (*time, row.get(tag.as_str()).copied()));
        Ok(Series::from_nullable(range, cells))
    }
}

impl StoreBounds for MemoryStore {
    fn bounds(&self) -> Result<Option<TimeBounds>, StoreError> {
        let table = self.table.read().unwrap_or_else(|e| e.into_inner());
        let oldest = table.rows.keys().next();
        let newest = table.rows.keys().next_back();
        Ok(oldest.zip(newest).map(|(oldest, newest)| TimeBounds {
            oldest: *oldest,
            newest: *newest,
        }))
    }
}

impl TagSink for MemoryStore {
    fn write_tag(&self, tag: &TagId, series: &Series) -> Result<(), StoreError> {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        for row in table.rows.values_mut() {
            row.remove(tag.as_str());
        }
        table.columns.insert(tag.to_string());
        for sample in &series.samples {
            table
                .rows
                .entry(sample.time)
                .or_default()
                .insert(tag.to_string(), sample.value);
        }
        tracing::info!("Materialized {} with {} samples", tag, series.len());
        Ok(())
    }
}
