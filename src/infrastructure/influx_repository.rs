// InfluxDB tag store: one measurement, one field per tag
use crate::application::tag_store::{SeriesProvider, StoreBounds, StoreError, TagSink};
use crate::domain::series::{Series, TimeRange};
use crate::domain::tag::TagId;
use crate::domain::window::TimeBounds;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::RwLock;

#[derive(Debug)]
pub struct InfluxRepository {
    host: String,
    token: String,
    database: String,
    retention_policy: String,
    measurement: String,
    /// Field keys seen so far; refreshed from the server on a miss.
    known_fields: RwLock<HashSet<String>>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    #[allow(dead_code)]
    name: String,
    columns: Vec<String>,
    values: Vec<Vec<serde_json::Value>>,
}

impl InfluxQLResponse {
    fn rows(&self) -> impl Iterator<Item = (&[String], &[serde_json::Value])> {
        self.results
            .first()
            .and_then(|r| r.series.as_ref())
            .into_iter()
            .flatten()
            .flat_map(|s| s.values.iter().map(move |row| (s.columns.as_slice(), row.as_slice())))
    }
}

impl InfluxRepository {
    pub fn new(
        host: String,
        token: String,
        database: String,
        retention_policy: String,
        measurement: String,
    ) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            token,
            database,
            retention_policy,
            measurement,
            known_fields: RwLock::default(),
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        let encoded_query = urlencoding::encode(query);
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.retention_policy),
            encoded_query
        )
    }

    fn build_write_url(&self) -> String {
        format!(
            "{}/write?db={}&rp={}&precision=ms",
            self.host,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.retention_policy)
        )
    }

    fn execute_query(&self, query: &str) -> Result<InfluxQLResponse> {
        tracing::debug!("Executing InfluxQL: {}", query);
        let url = self.build_query_url(query);

        let client = reqwest::blocking::Client::new();
        let response = client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .context("Failed to send request to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            anyhow::bail!("InfluxDB query failed with status {}: {}", status, body);
        }

        let data = response
            .json::<InfluxQLResponse>()
            .context("Failed to parse InfluxDB response")?;

        if let Some(result) = data.results.first() {
            if let Some(error) = &result.error {
                anyhow::bail!("InfluxDB query error: {}", error);
            }
        }

        Ok(data)
    }

    fn field_keys(&self) -> Result<HashSet<String>> {
        let query = format!("SHOW FIELD KEYS FROM \"{}\"", self.measurement);
        Ok(parse_field_keys(&self.execute_query(&query)?))
    }

    fn has_field(&self, tag: &TagId) -> Result<bool> {
        let known = self.known_fields.read().unwrap_or_else(|e| e.into_inner());
        if known.contains(tag.as_str()) {
            return Ok(true);
        }
        drop(known);

        let keys = self.field_keys()?;
        let found = keys.contains(tag.as_str());
        *self.known_fields.write().unwrap_or_else(|e| e.into_inner()) = keys;
        Ok(found)
    }

    fn boundary_time(&self, order: &str) -> Result<Option<DateTime<Utc>>> {
        let query = format!(
            "SELECT * FROM \"{}\" ORDER BY time {} LIMIT 1",
            self.measurement, order
        );
        let response = self.execute_query(&query)?;
        response
            .rows()
            .next()
            .map(|(columns, row)| row_time(columns, row))
            .transpose()
    }
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_field_keys(response: &InfluxQLResponse) -> HashSet<String> {
    response
        .rows()
        .filter_map(|(_, row)| row.first().and_then(|v| v.as_str()).map(str::to_string))
        .collect()
}

fn row_time(columns: &[String], row: &[serde_json::Value]) -> Result<DateTime<Utc>> {
    let time_idx = columns.iter().position(|c| c == "time").unwrap_or(0);
    let raw = row
        .get(time_idx)
        .and_then(|v| v.as_str())
        .context("InfluxDB row has no time column")?;
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid InfluxDB timestamp '{}'", raw))?
        .with_timezone(&Utc))
}

fn parse_series(response: &InfluxQLResponse, tag: &TagId, range: TimeRange) -> Result<Series> {
    let mut cells = Vec::new();
    for (columns, row) in response.rows() {
        let value_idx = columns.iter().position(|c| c == tag.as_str()).unwrap_or(1);
        let time = row_time(columns, row)?;
        cells.push((time, row.get(value_idx).and_then(|v| v.as_f64())));
    }
    Ok(Series::from_nullable(range, cells))
}

/// Line protocol for a derived tag. Non-finite samples cannot be stored and are skipped.
fn line_protocol(measurement: &str, tag: &TagId, series: &Series) -> String {
    let measurement = measurement.replace(' ', "\\ ").replace(',', "\\,");
    series
        .samples
        .iter()
        .filter(|s| {
            if !s.value.is_finite() {
                tracing::warn!("Skipping non-finite {} sample at {}", tag, s.time);
            }
            s.value.is_finite()
        })
        .map(|s| format!("{} {}={} {}", measurement, tag, s.value, s.time.timestamp_millis()))
        .collect::<Vec<_>>()
        .join("\n")
}

impl SeriesProvider for InfluxRepository {
    fn fetch(&self, tag: &TagId, range: TimeRange) -> Result<Series, StoreError> {
        if !self.has_field(tag)? {
            return Err(StoreError::UnknownTag(tag.to_string()));
        }

        // `tag` is a validated TagId, safe to interpolate as an identifier.
        let query = format!(
            "SELECT \"{}\" FROM \"{}\" WHERE time >= '{}' AND time <= '{}'",
            tag,
            self.measurement,
            rfc3339(range.start),
            rfc3339(range.end)
        );
        let response = self.execute_query(&query)?;
        let series = parse_series(&response, tag, range)?;
        tracing::debug!("Fetched {} samples for {} from InfluxDB", series.len(), tag);
        Ok(series)
    }
}

impl StoreBounds for InfluxRepository {
    fn bounds(&self) -> Result<Option<TimeBounds>, StoreError> {
        let oldest = self.boundary_time("ASC")?;
        let newest = self.boundary_time("DESC")?;
        Ok(oldest
            .zip(newest)
            .map(|(oldest, newest)| TimeBounds { oldest, newest }))
    }
}

impl TagSink for InfluxRepository {
    fn write_tag(&self, tag: &TagId, series: &Series) -> Result<(), StoreError> {
        let body = line_protocol(&self.measurement, tag, series);
        if body.is_empty() {
            tracing::warn!("No storable samples for {}", tag);
            return Ok(());
        }

        let client = reqwest::blocking::Client::new();
        let response = client
            .post(self.build_write_url())
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .context("Failed to send write to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(anyhow::anyhow!("InfluxDB write failed with status {}: {}", status, body).into());
        }

        self.known_fields
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tag.to_string());
        tracing::info!("Wrote {} samples for {} to InfluxDB", series.len(), tag);
        Ok(())
    }
}
