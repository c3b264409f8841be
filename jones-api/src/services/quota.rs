use chrono::{DateTime, Duration, NaiveTime, Utc};

/// One UTC calendar day, both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn utc_day_of(instant: DateTime<Utc>) -> Self {
        let start = instant.date_naive().and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1) - Duration::nanoseconds(1);
        Self { start, end }
    }

    pub fn utc_today() -> Self {
        Self::utc_day_of(Utc::now())
    }

    #[cfg(test)]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}
