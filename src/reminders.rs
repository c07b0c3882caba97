use chrono::{Duration, NaiveDateTime};

use crate::models::Job;

/// How far ahead an interview counts as upcoming.
pub const LOOKAHEAD_DAYS: i64 = 7;

/// How many applications the dashboard lists as recent.
pub const RECENT_LIMIT: usize = 5;

/// Jobs with an interview between today and seven days from `now`, both
/// ends inclusive, soonest first.
///
/// Interview dates carry no time of day, so the window is compared in
/// calendar days: an interview dated today is still upcoming at 23:59.
pub fn upcoming_interviews(jobs: &[Job], now: NaiveDateTime) -> Vec<&Job> {
    let start = now.date();
    let end = (now + Duration::days(LOOKAHEAD_DAYS)).date();

    let mut upcoming: Vec<&Job> = jobs
        .iter()
        .filter(|job| matches!(job.interview_date, Some(date) if date >= start && date <= end))
        .collect();
    upcoming.sort_by_key(|job| job.interview_date);
    upcoming
}

/// The `limit` most recently applied-to jobs, newest first. Jobs applied on
/// the same day keep their cache order.
pub fn recent_jobs(jobs: &[Job], limit: usize) -> Vec<&Job> {
    let mut recent: Vec<&Job> = jobs.iter().collect();
    recent.sort_by(|a, b| b.date_applied.cmp(&a.date_applied));
    recent.truncate(limit);
    recent
}
