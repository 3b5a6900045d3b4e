//! Calendar support for the archive's native (Jalali) calendar
//!
//! - `JalaliDate`: a validated Jalali calendar day with Gregorian conversion
//! - `TargetDateSet`: the ordered days a run may ingest
//! - `resolve_target_dates`: the calendar range resolver

mod jalali;
mod range;

pub use jalali::{days_in_month, is_leap_year, JalaliDate};
pub use range::{now_in, resolve_target_dates, yesterday, TargetDateSet};
