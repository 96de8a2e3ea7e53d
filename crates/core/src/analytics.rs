//! Read-side aggregation over add-on requests.
//!
//! Nothing here mutates requests. The functions take a snapshot (usually a
//! [`crate::lifecycle::RequestList`]) and fold it into counts for the analytics views.

use crate::constants::{DAY_SHIFT_END_HOUR, DAY_SHIFT_START_HOUR, PREVENTABLE_REASON_KEYWORDS};
use crate::directory::WardDirectory;
use crate::error::{LifecycleError, LifecycleResult};
use crate::request::{AddOnRequest, RequestStatus};
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use std::collections::BTreeMap;

/// Inclusive bounds on `created_at`. Either side may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShiftCounts {
    pub day: u64,
    pub night: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub completed: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AddOnStats {
    pub total_requests: u64,
    pub ward_stats: BTreeMap<String, u64>,
    pub test_stats: BTreeMap<String, u64>,
    pub reason_stats: BTreeMap<String, u64>,
    pub shift_stats: ShiftCounts,
    pub user_stats: BTreeMap<String, u64>,
    pub preventable_count: u64,
    /// Percentage of requests flagged preventable, rounded to two decimals.
    pub preventable_percentage: f64,
    pub status_breakdown: StatusCounts,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddOnTrends {
    pub daily_stats: BTreeMap<NaiveDate, u64>,
    pub period_days: u32,
}

/// Day shift runs from 07:00 (inclusive) to 19:00 (exclusive), UTC.
pub fn is_day_shift(at: DateTime<Utc>) -> bool {
    (DAY_SHIFT_START_HOUR..DAY_SHIFT_END_HOUR).contains(&at.hour())
}

/// A reason mentioning a missed or forgotten test marks the add-on as preventable.
pub fn is_preventable(reason: &str) -> bool {
    let reason = reason.to_lowercase();
    PREVENTABLE_REASON_KEYWORDS
        .iter()
        .any(|keyword| reason.contains(keyword))
}

/// Aggregates requests created within `range`.
///
/// Ward names come from `directory`; a ward missing from the directory is reported as
/// `Ward <id>`.
pub fn addon_stats<'a>(
    requests: impl IntoIterator<Item = &'a AddOnRequest>,
    directory: &dyn WardDirectory,
    range: DateRange,
) -> AddOnStats {
    let mut stats = AddOnStats::default();

    for request in requests
        .into_iter()
        .filter(|request| range.contains(request.created_at()))
    {
        stats.total_requests += 1;

        let ward_name = directory
            .ward(request.ward_id())
            .map(|ward| ward.name)
            .unwrap_or_else(|| format!("Ward {}", request.ward_id()));
        *stats.ward_stats.entry(ward_name).or_default() += 1;
        *stats
            .test_stats
            .entry(request.requested_test().to_owned())
            .or_default() += 1;
        *stats
            .reason_stats
            .entry(request.reason().to_owned())
            .or_default() += 1;
        *stats
            .user_stats
            .entry(request.requested_by().name.to_string())
            .or_default() += 1;

        if is_day_shift(request.created_at()) {
            stats.shift_stats.day += 1;
        } else {
            stats.shift_stats.night += 1;
        }

        if is_preventable(request.reason()) {
            stats.preventable_count += 1;
        }

        match request.status() {
            RequestStatus::Pending => stats.status_breakdown.pending += 1,
            RequestStatus::Approved => stats.status_breakdown.approved += 1,
            RequestStatus::Rejected => stats.status_breakdown.rejected += 1,
            RequestStatus::Completed => stats.status_breakdown.completed += 1,
        }
    }

    if stats.total_requests > 0 {
        let pct = stats.preventable_count as f64 / stats.total_requests as f64 * 100.0;
        stats.preventable_percentage = (pct * 100.0).round() / 100.0;
    }

    stats
}

/// Counts requests per UTC calendar day over the last `days` days ending at `now`.
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] if `days` is zero or reaches back before the
/// earliest representable timestamp.
pub fn addon_trends<'a>(
    requests: impl IntoIterator<Item = &'a AddOnRequest>,
    days: u32,
    now: DateTime<Utc>,
) -> LifecycleResult<AddOnTrends> {
    if days == 0 {
        return Err(LifecycleError::Validation(
            "days must be at least 1".into(),
        ));
    }

    let start = now
        .checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| LifecycleError::Validation(format!("days {days} is out of range")))?;
    let mut daily_stats = BTreeMap::new();
    for request in requests
        .into_iter()
        .filter(|request| request.created_at() >= start)
    {
        *daily_stats
            .entry(request.created_at().date_naive())
            .or_default() += 1;
    }

    Ok(AddOnTrends {
        daily_stats,
        period_days: days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Caller;
    use crate::directory::tests::sample_directory;
    use crate::ids::{RequestId, WardId};
    use crate::request::tests::{draft, lab, nurse};
    use crate::request::RequestDraft;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, day, hour, 30, 0).unwrap()
    }

    fn request(ward: u32, test: &str, reason: &str, by: Caller, created: DateTime<Utc>) -> AddOnRequest {
        let draft = RequestDraft {
            ward_id: Some(WardId(ward)),
            room_id: None,
            requested_test: test.into(),
            reason: reason.into(),
            ..draft()
        };
        AddOnRequest::open(RequestId::generate(), draft.validate().unwrap(), by, created)
    }

    fn sample() -> Vec<AddOnRequest> {
        let other_nurse = Caller::new("n-2", "Nurse Two", "charge_nurse").unwrap();
        let approved = request(1, "CBC", "Forgot to order", nurse(), at(1, 8))
            .approve("add_to_same_sample", &lab(), at(1, 9))
            .unwrap();
        let rejected = request(2, "Lactate", "sepsis screen", other_nurse, at(2, 20))
            .reject("Old sample", &lab(), at(2, 21))
            .unwrap();
        vec![
            approved,
            rejected,
            request(1, "CBC", "MISSING from admission bloods", nurse(), at(3, 6)),
            request(7, "Troponin", "chest pain", nurse(), at(3, 19)),
        ]
    }

    #[test]
    fn counts_by_ward_test_reason_user_and_status() {
        let requests = sample();
        let stats = addon_stats(&requests, &sample_directory(), DateRange::default());

        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.ward_stats["Ward A"], 2);
        assert_eq!(stats.ward_stats["Ward B"], 1);
        assert_eq!(stats.ward_stats["Ward 7"], 1);
        assert_eq!(stats.test_stats["CBC"], 2);
        assert_eq!(stats.reason_stats["chest pain"], 1);
        assert_eq!(stats.user_stats["Nurse Ratched"], 3);
        assert_eq!(stats.user_stats["Nurse Two"], 1);
        assert_eq!(
            stats.status_breakdown,
            StatusCounts {
                pending: 2,
                approved: 1,
                rejected: 1,
                completed: 0,
            }
        );
    }

    #[test]
    fn shift_split_uses_seven_to_nineteen() {
        let requests = sample();
        let stats = addon_stats(&requests, &sample_directory(), DateRange::default());
        // 08:30 is day; 20:30, 06:30 and 19:30 are night.
        assert_eq!(stats.shift_stats, ShiftCounts { day: 1, night: 3 });
        assert!(is_day_shift(Utc.with_ymd_and_hms(2026, 2, 1, 7, 0, 0).unwrap()));
        assert!(!is_day_shift(Utc.with_ymd_and_hms(2026, 2, 1, 19, 0, 0).unwrap()));
    }

    #[test]
    fn preventable_reasons_are_case_insensitive() {
        let requests = sample();
        let stats = addon_stats(&requests, &sample_directory(), DateRange::default());
        assert_eq!(stats.preventable_count, 2);
        assert_eq!(stats.preventable_percentage, 50.0);
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        let requests = vec![
            request(1, "CBC", "forgot", nurse(), at(1, 8)),
            request(1, "CBC", "stat", nurse(), at(1, 8)),
            request(1, "CBC", "stat", nurse(), at(1, 8)),
        ];
        let stats = addon_stats(&requests, &sample_directory(), DateRange::default());
        assert_eq!(stats.preventable_percentage, 33.33);
    }

    #[test]
    fn empty_input_has_zero_percentage() {
        let stats = addon_stats(&Vec::<AddOnRequest>::new(), &sample_directory(), DateRange::default());
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.preventable_percentage, 0.0);
    }

    #[test]
    fn date_range_is_inclusive() {
        let requests = sample();
        let range = DateRange {
            start: Some(at(2, 20)),
            end: Some(at(3, 6)),
        };
        let stats = addon_stats(&requests, &sample_directory(), range);
        assert_eq!(stats.total_requests, 2);
    }

    #[test]
    fn trends_group_by_day_within_window() {
        let requests = sample();
        let trends = addon_trends(&requests, 2, at(3, 23)).unwrap();
        assert_eq!(trends.period_days, 2);
        let day = |d| NaiveDate::from_ymd_opt(2026, 2, d).unwrap();
        assert_eq!(trends.daily_stats.get(&day(1)), None);
        assert_eq!(trends.daily_stats[&day(2)], 1);
        assert_eq!(trends.daily_stats[&day(3)], 2);
    }

    #[test]
    fn trends_reject_zero_days() {
        assert!(matches!(
            addon_trends(&Vec::<AddOnRequest>::new(), 0, Utc::now()),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn trends_reject_windows_beyond_the_calendar() {
        assert!(matches!(
            addon_trends(&sample(), u32::MAX, Utc::now()),
            Err(LifecycleError::Validation(_))
        ));

        // A long but representable window still counts everything.
        let trends = addon_trends(&sample(), 100_000, at(3, 23)).unwrap();
        assert_eq!(trends.daily_stats.values().sum::<u64>(), 4);
    }
}
