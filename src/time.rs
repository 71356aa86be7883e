//! The time axis shared by all time series and its partitioning into buckets.
use anyhow::{Context, Result, ensure};
use chrono::{Datelike, NaiveDateTime, TimeDelta};
use itertools::Itertools;
use std::ops::Range;

/// The format used for timestamps in input files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Parse a timestamp string in [`TIMESTAMP_FORMAT`]
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
        .with_context(|| format!("Invalid timestamp '{s}' (expected format {TIMESTAMP_FORMAT})"))
}

/// An hourly time axis from `start` to `end` inclusive
#[derive(Debug, Clone, PartialEq)]
pub struct TimeHorizon {
    timestamps: Vec<NaiveDateTime>,
}

impl TimeHorizon {
    /// Create a new hourly [`TimeHorizon`] covering `start` to `end` inclusive
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        ensure!(
            start <= end,
            "Start of time horizon ({start}) is after its end ({end})"
        );

        let step = TimeDelta::hours(1);
        let timestamps = itertools::iterate(start, |t| *t + step)
            .take_while(|t| *t <= end)
            .collect();

        Ok(Self { timestamps })
    }

    /// The timestamps, in order
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// The number of timestamps
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the horizon is empty (never true for a horizon built with [`TimeHorizon::new`])
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The index of the given timestamp, if it is on the axis
    pub fn position(&self, timestamp: &NaiveDateTime) -> Option<usize> {
        let first = *self.timestamps.first()?;
        let offset = (*timestamp - first).num_minutes();
        if offset < 0 || offset % 60 != 0 {
            return None;
        }

        usize::try_from(offset / 60)
            .ok()
            .filter(|idx| *idx < self.timestamps.len())
    }
}

/// How the time axis is partitioned before applying per-bucket constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucketing {
    /// One bucket spanning the whole horizon
    Aggregate,
    /// One bucket per timestamp
    Hourly,
    /// One bucket per calendar day
    Daily,
    /// One bucket per ISO week
    Weekly,
    /// One bucket per calendar month
    Monthly,
}

impl TimeBucketing {
    /// Partition the timestamps into contiguous buckets of indices.
    ///
    /// Buckets follow calendar boundaries, so the first and last buckets may be partial.
    pub fn partition(self, timestamps: &[NaiveDateTime]) -> Vec<Range<usize>> {
        let n = timestamps.len();
        if n == 0 {
            return Vec::new();
        }

        match self {
            Self::Aggregate => vec![0..n],
            Self::Hourly => (0..n).map(|i| i..i + 1).collect(),
            Self::Daily => group_contiguous(timestamps, |t| (t.year(), t.ordinal())),
            Self::Weekly => group_contiguous(timestamps, |t| {
                let week = t.iso_week();
                (week.year(), week.week())
            }),
            Self::Monthly => group_contiguous(timestamps, |t| (t.year(), t.month())),
        }
    }
}

/// Group consecutive timestamps sharing the same key into ranges of indices
fn group_contiguous<K, F>(timestamps: &[NaiveDateTime], key: F) -> Vec<Range<usize>>
where
    K: PartialEq,
    F: Fn(&NaiveDateTime) -> K,
{
    timestamps
        .iter()
        .enumerate()
        .chunk_by(|(_, t)| key(*t))
        .into_iter()
        .map(|(_, mut group)| {
            let (first, _) = group.next().expect("Groups are never empty");
            let last = group.last().map_or(first, |(idx, _)| idx);
            first..last + 1
        })
        .collect()
}
