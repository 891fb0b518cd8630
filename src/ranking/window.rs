use chrono::{DateTime, NaiveDate, Utc};

/// Closed UTC interval covering whole calendar days.
///
/// `start` is 00:00:00.000 of the first day and `end` is 23:59:59.999 of the
/// last day. An inverted pair of dates gives an empty window, nothing is
/// rejected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MetricWindow {
    pub fn from_dates(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let start = start_date
            .and_hms_milli_opt(0, 0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc();
        let end = end_date
            .and_hms_milli_opt(23, 59, 59, 999)
            .expect("23:59:59.999 is a valid time")
            .and_utc();

        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}
