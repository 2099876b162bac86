use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::grouping::{CaptureEvent, EventGrouper};
use crate::scanner::{DayPartition, DayWalker, PartitionScanner, WalkLimits};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

pub use crate::cancel::CancelToken;

/// How the anchor bounds the newest end of a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    /// Events with a member at or before the anchor are eligible, so the
    /// event the anchor names is included.
    #[default]
    Inclusive,
    /// Only events entirely older than `anchor - slush` are eligible, so the
    /// event the anchor names is skipped.
    Exclusive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Newest first.
    pub events: Vec<CaptureEvent>,
    /// Representative time of the next older event; echo back inclusively.
    pub prev_cursor: Option<DateTime<Utc>>,
    /// Time of the nearest event newer than this page, or `None` when the
    /// page starts at the newest event. When that event lies on the day after
    /// the anchor's day, only its oldest file has been read, so this is that
    /// file's time rather than the event's newest. Echoed inclusively it still
    /// lands on the same event.
    pub next_cursor: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub id: String,
    pub display_name: String,
}

/// Entry point for browsing capture events. Holds configuration only; every
/// call re-reads storage, so one engine can serve concurrent requests.
#[derive(Debug)]
pub struct PageEngine {
    config: AppConfig,
    scanner: PartitionScanner,
    slush: Duration,
    future_slack: Duration,
    limits: WalkLimits,
}

impl PageEngine {
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut scanner = PartitionScanner::new(&config.image_dir, config.time_source);
        for (id, collection) in &config.collections {
            scanner = scanner.with_pattern(id, &collection.file_pattern)?;
        }

        let slush = seconds(config.slush_secs)?;
        let future_slack = seconds(config.future_slack_secs)?;
        if Utc::now().checked_add_signed(future_slack).is_none() {
            return Err(Error::InvalidRequest(format!(
                "future slack out of range: {}s",
                config.future_slack_secs
            )));
        }
        let limits = WalkLimits {
            max_empty_days: config.max_empty_days,
            max_lookback_days: config.max_lookback_days,
        };

        info!(
            "Serving {} collections from {} ({:?} times, slush {}s)",
            config.collections.len(),
            config.image_dir.display(),
            config.time_source,
            config.slush_secs,
        );

        Ok(Self {
            config,
            scanner,
            slush,
            future_slack,
            limits,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn collections(&self) -> Vec<CollectionInfo> {
        self.config
            .collections
            .iter()
            .map(|(id, collection)| CollectionInfo {
                id: id.clone(),
                display_name: collection
                    .display_name
                    .clone()
                    .unwrap_or_else(|| id.clone()),
            })
            .collect()
    }

    fn check_collection(&self, collection: &str) -> Result<()> {
        if self.config.collections.contains_key(collection) {
            Ok(())
        } else {
            Err(Error::UnknownCollection(collection.to_string()))
        }
    }

    pub fn page(
        &self,
        collection: &str,
        count: usize,
        anchor: Option<DateTime<Utc>>,
        mode: AnchorMode,
    ) -> Result<Page> {
        self.page_with_cancel(collection, count, anchor, mode, &CancelToken::new())
    }

    /// Up to `count` capture events at or before `anchor` (default: now plus
    /// the configured forward slack), newest first, with cursors to the
    /// neighbouring pages.
    pub fn page_with_cancel(
        &self,
        collection: &str,
        count: usize,
        anchor: Option<DateTime<Utc>>,
        mode: AnchorMode,
        cancel: &CancelToken,
    ) -> Result<Page> {
        self.check_collection(collection)?;
        if count == 0 {
            return Err(Error::InvalidRequest("count must be at least 1".into()));
        }

        let anchor = match anchor {
            Some(anchor) => anchor,
            None => Utc::now()
                .checked_add_signed(self.future_slack)
                .ok_or_else(|| Error::InvalidRequest("default anchor out of range".into()))?,
        };
        // Nothing is older than an out-of-range cutoff.
        let cutoff = anchor.checked_sub_signed(self.slush);
        let eligible = |event: &CaptureEvent| match mode {
            AnchorMode::Inclusive => event.oldest_time() <= anchor,
            AnchorMode::Exclusive => {
                cutoff.is_some_and(|cutoff| event.representative_time() < cutoff)
            }
        };

        let walker = DayWalker::start(
            &self.scanner,
            collection,
            anchor.date_naive(),
            self.limits,
            cancel.clone(),
        )?;
        let mut events = EventGrouper::new(walker, self.slush);

        let mut page = Page {
            events: Vec::with_capacity(count),
            prev_cursor: None,
            next_cursor: None,
        };

        while page.events.len() < count {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let Some(event) = events.next().transpose()? else {
                debug!(
                    "{} exhausted after {} events ({:?})",
                    collection,
                    page.events.len(),
                    events.inner().stop_reason()
                );
                return Ok(page);
            };
            if eligible(&event) {
                page.events.push(event);
            } else {
                page.next_cursor = Some(event.representative_time());
            }
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        page.prev_cursor = events
            .next()
            .transpose()?
            .map(|event| event.representative_time());

        debug!(
            "{} page at {} ({:?}): {} events, prev {:?}, next {:?}",
            collection,
            anchor,
            mode,
            page.events.len(),
            page.prev_cursor,
            page.next_cursor
        );
        Ok(page)
    }

    /// Storage path of one artifact named in a page.
    pub fn artifact_path(
        &self,
        collection: &str,
        year: &str,
        month: &str,
        day: &str,
        file_name: &str,
    ) -> Result<PathBuf> {
        self.check_collection(collection)?;

        let date = parse_date_components(year, month, day).ok_or_else(|| {
            Error::InvalidRequest(format!("no such day: {year}/{month}/{day}"))
        })?;

        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == file_name => {}
            _ => {
                return Err(Error::InvalidRequest(format!(
                    "not a plain file name: {file_name}"
                )))
            }
        }

        let partition = DayPartition::new(collection, date);
        Ok(self.scanner.partition_dir(&partition).join(file_name))
    }
}

fn seconds(secs: u64) -> Result<Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| Error::InvalidRequest(format!("duration out of range: {secs}s")))
}

fn parse_date_components(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let numeric = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !numeric(year, 4) || !numeric(month, 2) || !numeric(day, 2) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}
