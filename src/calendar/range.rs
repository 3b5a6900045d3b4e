//! Resolution of the requested date window into target dates

use crate::calendar::JalaliDate;
use crate::InvalidRange;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// The ordered, immutable set of days a run is allowed to ingest
///
/// Dates are strictly increasing and the set is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDateSet {
    dates: Vec<JalaliDate>,
}

impl TargetDateSet {
    /// Every day from `from` to `to`, inclusive
    pub fn between(from: JalaliDate, to: JalaliDate) -> Result<Self, InvalidRange> {
        if from > to {
            return Err(InvalidRange::Reversed { from, to });
        }

        let mut dates = vec![from];
        let mut cursor = from;
        while cursor < to {
            match cursor.succ() {
                Some(next) => {
                    dates.push(next);
                    cursor = next;
                }
                None => break,
            }
        }

        Ok(Self { dates })
    }

    /// A set holding one day
    pub fn single(date: JalaliDate) -> Self {
        Self { dates: vec![date] }
    }

    /// The earliest target day
    pub fn first(&self) -> JalaliDate {
        self.dates[0]
    }

    /// The most recent target day, where traversal starts
    pub fn last(&self) -> JalaliDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn contains(&self, date: &JalaliDate) -> bool {
        self.dates.binary_search(date).is_ok()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JalaliDate> {
        self.dates.iter()
    }
}

/// The Jalali day before `now`'s local date
pub fn yesterday(now: DateTime<FixedOffset>) -> Option<JalaliDate> {
    JalaliDate::from_gregorian(now.date_naive())?.pred()
}

/// Current wall-clock time in the given offset
pub fn now_in(offset: FixedOffset) -> DateTime<FixedOffset> {
    offset.from_utc_datetime(&Utc::now().naive_utc())
}

/// Turns optional date bounds into the set of days to crawl
///
/// Both bounds or neither must be given. With no bounds the set holds only
/// yesterday relative to `now`. Ranges longer than `max_days` are refused.
pub fn resolve_target_dates(
    date_from: Option<JalaliDate>,
    date_to: Option<JalaliDate>,
    now: DateTime<FixedOffset>,
    max_days: u32,
) -> Result<TargetDateSet, InvalidRange> {
    let set = match (date_from, date_to) {
        (Some(from), Some(to)) => {
            if from > to {
                return Err(InvalidRange::Reversed { from, to });
            }
            // Refuse before materializing every day of a mistyped window
            let span = (to.to_gregorian() - from.to_gregorian()).num_days() + 1;
            if span > i64::from(max_days) {
                return Err(InvalidRange::TooLong {
                    days: span as usize,
                    max: max_days,
                });
            }
            TargetDateSet::between(from, to)?
        }
        (None, None) => {
            let date = yesterday(now)
                .ok_or_else(|| InvalidRange::Malformed(now.date_naive().to_string()))?;
            TargetDateSet::single(date)
        }
        _ => return Err(InvalidRange::PartialBounds),
    };

    if set.len() > max_days as usize {
        return Err(InvalidRange::TooLong {
            days: set.len(),
            max: max_days,
        });
    }

    Ok(set)
}
