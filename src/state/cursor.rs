//! Traversal state for one crawl run
//!
//! The cursor is owned by the coordinator and only changes between listing
//! page transitions; article workers never see it.

use crate::calendar::{JalaliDate, TargetDateSet};
use std::fmt;

/// Why a traversal stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// A dispatched article fell outside the target dates
    TargetExhausted,
    /// Rolling back another day would pass the earliest allowed date
    ReachedFloor,
    /// The run was cancelled between pages
    Cancelled,
}

impl DoneReason {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::TargetExhausted => "target_exhausted",
            Self::ReachedFloor => "reached_floor",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// The traversal state machine's current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    /// About to request listing `page` of `date`
    Listing { date: JalaliDate, page: u32 },

    /// Extracting the `references` articles found on a listing page
    Dispatching {
        date: JalaliDate,
        page: u32,
        references: usize,
    },

    /// Terminal
    Done(DoneReason),
}

impl CrawlPhase {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Mutable progress through the archive
#[derive(Debug, Clone)]
pub struct CrawlCursor {
    current_date: JalaliDate,
    current_page: u32,
    date_exhausted: bool,
    target_exhausted: bool,
    floor: JalaliDate,
}

impl CrawlCursor {
    /// Starts at page 1 of the most recent target date
    pub fn new(targets: &TargetDateSet, floor: JalaliDate) -> Self {
        Self {
            current_date: targets.last(),
            current_page: 1,
            date_exhausted: false,
            target_exhausted: false,
            floor,
        }
    }

    pub fn current_date(&self) -> JalaliDate {
        self.current_date
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn date_exhausted(&self) -> bool {
        self.date_exhausted
    }

    pub fn target_exhausted(&self) -> bool {
        self.target_exhausted
    }

    /// The listing request the cursor points at
    pub fn listing(&self) -> CrawlPhase {
        CrawlPhase::Listing {
            date: self.current_date,
            page: self.current_page,
        }
    }

    /// Records that an article on the current page is outside the target dates
    ///
    /// The rest of the page is still dispatched; no later page is requested.
    pub fn mark_target_exhausted(&mut self) {
        self.target_exhausted = true;
        self.date_exhausted = true;
    }

    /// Transition after every reference on the current page was dispatched
    pub fn finish_page(&mut self) -> CrawlPhase {
        if self.target_exhausted {
            return CrawlPhase::Done(DoneReason::TargetExhausted);
        }
        self.current_page += 1;
        self.listing()
    }

    /// Transition after the current listing page yielded no references
    ///
    /// Moves to page 1 of the previous day, or stops when that day would
    /// precede the floor.
    pub fn roll_back_day(&mut self) -> CrawlPhase {
        self.date_exhausted = true;

        match self.current_date.pred() {
            Some(previous) if previous >= self.floor => {
                self.current_date = previous;
                self.current_page = 1;
                self.date_exhausted = false;
                self.listing()
            }
            _ => CrawlPhase::Done(DoneReason::ReachedFloor),
        }
    }
}
