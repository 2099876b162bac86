//! Folding a newest-first artifact stream into capture events.
//!
//! Membership is decided by the gap to the previously added file only, so an
//! event may span more than one tolerance window when files chain together.

use crate::artifact::ArtifactFile;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use std::mem;

/// Files judged to come from one observation. Members are newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEvent {
    members: Vec<ArtifactFile>,
}

impl CaptureEvent {
    fn from_members(members: Vec<ArtifactFile>) -> Self {
        debug_assert!(!members.is_empty());
        Self { members }
    }

    /// Time of the newest member.
    pub fn representative_time(&self) -> DateTime<Utc> {
        self.members[0].capture_time
    }

    /// Time of the oldest member.
    pub fn oldest_time(&self) -> DateTime<Utc> {
        self.members[self.members.len() - 1].capture_time
    }

    pub fn members(&self) -> &[ArtifactFile] {
        &self.members
    }

    pub fn file_names(&self) -> Vec<String> {
        self.members.iter().map(ArtifactFile::file_name).collect()
    }
}

/// Pull-based grouper over a newest-first stream of artifacts.
///
/// Always start from a file boundary at the head of a stream; resuming in the
/// middle of an event produces a different grouping.
pub struct EventGrouper<I> {
    files: I,
    slush: Duration,
    current: Vec<ArtifactFile>,
    done: bool,
}

impl<I> EventGrouper<I>
where
    I: Iterator<Item = Result<ArtifactFile>>,
{
    pub fn new(files: I, slush: Duration) -> Self {
        Self {
            files,
            slush,
            current: Vec::new(),
            done: false,
        }
    }

    pub fn inner(&self) -> &I {
        &self.files
    }
}

impl<I> Iterator for EventGrouper<I>
where
    I: Iterator<Item = Result<ArtifactFile>>,
{
    type Item = Result<CaptureEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.files.next() {
                Some(Ok(file)) => {
                    let joins = match self.current.last() {
                        Some(last) => last.capture_time - file.capture_time <= self.slush,
                        None => true,
                    };
                    if joins {
                        self.current.push(file);
                    } else {
                        let event = mem::replace(&mut self.current, vec![file]);
                        return Some(Ok(CaptureEvent::from_members(event)));
                    }
                }
                Some(Err(err)) => {
                    self.done = true;
                    self.current.clear();
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    if self.current.is_empty() {
                        return None;
                    }
                    let event = mem::take(&mut self.current);
                    return Some(Ok(CaptureEvent::from_members(event)));
                }
            }
        }
    }
}
