use super::partition::PartitionScanner;
use crate::artifact::ArtifactFile;
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use chrono::{Days, NaiveDate};
use std::vec;
use tracing::debug;

/// Why a walk stopped producing files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStop {
    /// `max_empty_days` consecutive partitions held nothing.
    EmptyDays,
    /// The look-back bound was reached.
    Lookback,
}

#[derive(Debug, Clone, Copy)]
pub struct WalkLimits {
    pub max_empty_days: u32,
    pub max_lookback_days: u32,
}

impl Default for WalkLimits {
    fn default() -> Self {
        Self {
            max_empty_days: 31,
            max_lookback_days: 3 * 365,
        }
    }
}

/// Streams the artifacts of one collection newest first, starting with the
/// whole day `from_day` and stepping back one day partition at a time.
///
/// The stream opens with the oldest artifact of the day after `from_day`, so
/// that an event straddling midnight groups the same way it would from a walk
/// that started later. Consumers discard anything newer than their anchor.
pub struct DayWalker<'a> {
    scanner: &'a PartitionScanner,
    collection: &'a str,
    cancel: CancelToken,
    limits: WalkLimits,
    oldest_day: NaiveDate,
    next_day: Option<NaiveDate>,
    lookahead: Option<ArtifactFile>,
    current: vec::IntoIter<ArtifactFile>,
    empty_run: u32,
    stop: Option<WalkStop>,
    failed: bool,
}

impl<'a> DayWalker<'a> {
    pub fn start(
        scanner: &'a PartitionScanner,
        collection: &'a str,
        from_day: NaiveDate,
        limits: WalkLimits,
        cancel: CancelToken,
    ) -> Result<Self> {
        let lookahead = match from_day.succ_opt() {
            Some(next_day) => scanner.list(collection, next_day)?.pop(),
            None => None,
        };

        let oldest_day = from_day
            .checked_sub_days(Days::new(u64::from(limits.max_lookback_days)))
            .unwrap_or(NaiveDate::MIN);

        Ok(Self {
            scanner,
            collection,
            cancel,
            limits,
            oldest_day,
            next_day: Some(from_day),
            lookahead,
            current: Vec::new().into_iter(),
            empty_run: 0,
            stop: None,
            failed: false,
        })
    }

    /// Set once the walk has ended for a reason other than a failure.
    pub fn stop_reason(&self) -> Option<WalkStop> {
        self.stop
    }

    fn finish(&mut self, reason: WalkStop) {
        debug!(
            "Walk of {} ended ({:?}) after {} consecutive empty days",
            self.collection, reason, self.empty_run
        );
        self.next_day = None;
        self.stop = Some(reason);
    }

    /// Load the next older partition into `current`. Returns `Ok(false)` once
    /// the walk is over.
    fn advance_day(&mut self) -> Result<bool> {
        let Some(day) = self.next_day else {
            return Ok(false);
        };

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if day < self.oldest_day {
            self.finish(WalkStop::Lookback);
            return Ok(false);
        }
        if self.empty_run >= self.limits.max_empty_days {
            self.finish(WalkStop::EmptyDays);
            return Ok(false);
        }

        let files = self.scanner.list(self.collection, day)?;
        if files.is_empty() {
            self.empty_run += 1;
        } else {
            self.empty_run = 0;
        }
        self.current = files.into_iter();
        self.next_day = day.pred_opt();
        if self.next_day.is_none() {
            self.stop = Some(WalkStop::Lookback);
        }
        Ok(true)
    }
}

impl Iterator for DayWalker<'_> {
    type Item = Result<ArtifactFile>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(file) = self.lookahead.take() {
            return Some(Ok(file));
        }

        loop {
            if let Some(file) = self.current.next() {
                return Some(Ok(file));
            }
            match self.advance_day() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
