//! Solar Hijri (Jalali) calendar dates
//!
//! The archive is organized by Jalali calendar days, so every date the
//! crawler reasons about is a [`JalaliDate`]. Conversion to and from the
//! Gregorian calendar goes through `chrono::NaiveDate` using the 2820-year
//! break table arithmetic.

use crate::InvalidRange;
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Jalali years where the 33-year leap cycle shifts
const BREAKS: [i32; 20] = [
    -61, 9, 38, 199, 426, 686, 756, 818, 1111, 1181, 1210, 1635, 2060, 2097, 2192, 2262, 2324,
    2394, 2456, 3178,
];

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 3177;

/// A calendar day in the Jalali calendar
///
/// Field order gives chronological ordering for the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JalaliDate {
    year: i32,
    month: u32,
    day: u32,
}

/// Leap information for one Jalali year
struct YearInfo {
    /// Years since the last leap year (0 means this year is leap)
    leap: i32,
    /// Gregorian year in which this Jalali year begins
    gregorian_year: i32,
    /// Day of March on which Farvardin 1 falls
    march: i32,
}

fn year_info(jy: i32) -> YearInfo {
    let gy = jy + 621;
    let mut leap_j = -14;
    let mut jp = BREAKS[0];
    let mut jump = 0;

    for &jm in &BREAKS[1..] {
        jump = jm - jp;
        if jy < jm {
            break;
        }
        leap_j += jump / 33 * 8 + (jump % 33) / 4;
        jp = jm;
    }

    let mut n = jy - jp;
    leap_j += n / 33 * 8 + ((n % 33) + 3) / 4;
    if jump % 33 == 4 && jump - n == 4 {
        leap_j += 1;
    }

    let leap_g = gy / 4 - ((gy / 100 + 1) * 3) / 4 - 150;
    let march = 20 + leap_j - leap_g;

    if jump - n < 6 {
        n = n - jump + ((jump + 4) / 33) * 33;
    }
    let mut leap = (((n + 1) % 33) - 1) % 4;
    if leap == -1 {
        leap = 4;
    }

    YearInfo {
        leap,
        gregorian_year: gy,
        march,
    }
}

/// Returns true if the given Jalali year has 366 days
pub fn is_leap_year(year: i32) -> bool {
    year_info(year).leap == 0
}

/// Number of days in a Jalali month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1..=6 => 31,
        7..=11 => 30,
        12 if is_leap_year(year) => 30,
        12 => 29,
        _ => 0,
    }
}

impl JalaliDate {
    /// Builds a date, rejecting days that do not exist in the calendar
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, InvalidRange> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year)
            || !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
        {
            return Err(InvalidRange::Malformed(format!(
                "{:04}{:02}{:02}",
                year, month, day
            )));
        }
        Ok(Self { year, month, day })
    }

    /// Builds a date from the packed form `year * 10000 + month * 100 + day`
    pub fn from_yyyymmdd(value: u32) -> Result<Self, InvalidRange> {
        let year = (value / 10000) as i32;
        let month = (value / 100) % 100;
        let day = value % 100;
        Self::new(year, month, day).map_err(|_| InvalidRange::Malformed(value.to_string()))
    }

    /// Packs the date as `year * 10000 + month * 100 + day`
    pub fn to_yyyymmdd(&self) -> u32 {
        self.year as u32 * 10000 + self.month * 100 + self.day
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// Converts a Gregorian date to the Jalali day it falls on
    ///
    /// Returns None for dates outside the supported years.
    pub fn from_gregorian(date: NaiveDate) -> Option<Self> {
        let gy = date.year();
        let mut jy = gy - 621;
        if !(MIN_YEAR..=MAX_YEAR).contains(&jy) {
            return None;
        }

        let info = year_info(jy);
        let new_year = NaiveDate::from_ymd_opt(gy, 3, info.march as u32)?;
        let mut k = (date - new_year).num_days() as i32;

        if k >= 0 {
            if k <= 185 {
                return Self::new(jy, 1 + (k / 31) as u32, (k % 31) as u32 + 1).ok();
            }
            k -= 186;
        } else {
            jy -= 1;
            k += 179;
            if info.leap == 1 {
                k += 1;
            }
        }

        Self::new(jy, 7 + (k / 30) as u32, (k % 30) as u32 + 1).ok()
    }

    /// Converts the date to the Gregorian calendar
    pub fn to_gregorian(&self) -> NaiveDate {
        let info = year_info(self.year);
        let month = self.month as i64;
        let offset = (month - 1) * 31 - (month / 7) * (month - 7) + self.day as i64 - 1;

        // Farvardin 1 always lands on March 19-22 for supported years
        NaiveDate::from_ymd_opt(info.gregorian_year, 3, info.march as u32)
            .map(|new_year| new_year + chrono::Duration::days(offset))
            .unwrap_or(NaiveDate::MIN)
    }

    /// The following calendar day
    pub fn succ(&self) -> Option<Self> {
        if self.day < days_in_month(self.year, self.month) {
            Some(Self {
                day: self.day + 1,
                ..*self
            })
        } else if self.month < 12 {
            Some(Self {
                month: self.month + 1,
                day: 1,
                ..*self
            })
        } else if self.year < MAX_YEAR {
            Some(Self {
                year: self.year + 1,
                month: 1,
                day: 1,
            })
        } else {
            None
        }
    }

    /// The preceding calendar day
    pub fn pred(&self) -> Option<Self> {
        if self.day > 1 {
            Some(Self {
                day: self.day - 1,
                ..*self
            })
        } else if self.month > 1 {
            let month = self.month - 1;
            Some(Self {
                month,
                day: days_in_month(self.year, month),
                ..*self
            })
        } else if self.year > MIN_YEAR {
            let year = self.year - 1;
            Some(Self {
                year,
                month: 12,
                day: days_in_month(year, 12),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for JalaliDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for JalaliDate {
    type Err = InvalidRange;

    /// Parses `YYYYMMDD`, also accepting `YYYY-MM-DD` and `YYYY/MM/DD`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '/')
            .collect();

        if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidRange::Malformed(s.to_string()));
        }

        let value: u32 = digits
            .parse()
            .map_err(|_| InvalidRange::Malformed(s.to_string()))?;
        Self::from_yyyymmdd(value).map_err(|_| InvalidRange::Malformed(s.to_string()))
    }
}
