// Store contracts for tag data access
use crate::domain::series::{Series, TimeRange};
use crate::domain::tag::{InvalidTagId, TagId};
use crate::domain::window::TimeBounds;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    InvalidTagId(#[from] InvalidTagId),
    #[error("unknown tag '{0}'")]
    UnknownTag(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub trait SeriesProvider: Send + Sync {
    /// Samples of `tag` within `range` (inclusive), in time order, absent values dropped.
    fn fetch(&self, tag: &TagId, range: TimeRange) -> Result<Series, StoreError>;
}

pub trait StoreBounds: Send + Sync {
    /// Oldest and newest stored timestamps, or `None` when the store is empty
    fn bounds(&self) -> Result<Option<TimeBounds>, StoreError>;
}

pub trait TagSink: Send + Sync {
    /// Store a derived tag as a new column, one value per sample timestamp.
    /// An existing column with the same id is replaced.
    fn write_tag(&self, tag: &TagId, series: &Series) -> Result<(), StoreError>;
}

/// Everything the services need from a backing store.
pub trait TagStore: SeriesProvider + StoreBounds + TagSink {}

impl<T: SeriesProvider + StoreBounds + TagSink> TagStore for T {}
