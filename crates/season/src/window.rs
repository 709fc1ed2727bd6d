use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use town_protocol::RouteWindow;

/// Injected source of the current local date and time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall clock in the process's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSource {
    Auto,
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedWindow {
    pub window: RouteWindow,
    pub source: WindowSource,
}

/// Bucket a local timestamp.
///
/// Saturday and Sunday are `weekend` all day. Weekdays:
/// 00:00–10:59 morning, 11:00–13:59 lunch, 14:00–18:59 after_work,
/// 19:00–23:59 evening.
#[must_use]
pub fn window_for(now: NaiveDateTime) -> RouteWindow {
    if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
        return RouteWindow::Weekend;
    }
    match now.hour() {
        0..=10 => RouteWindow::Morning,
        11..=13 => RouteWindow::Lunch,
        14..=18 => RouteWindow::AfterWork,
        _ => RouteWindow::Evening,
    }
}

/// An explicit override wins outright; otherwise derive from `now`.
#[must_use]
pub fn resolve_window(override_window: Option<RouteWindow>, now: NaiveDateTime) -> ResolvedWindow {
    match override_window {
        Some(window) => ResolvedWindow {
            window,
            source: WindowSource::Override,
        },
        None => ResolvedWindow {
            window: window_for(now),
            source: WindowSource::Auto,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-07-15 is a Monday.
    fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn weekday_bucket_boundaries() {
        assert_eq!(window_for(monday_at(0, 0)), RouteWindow::Morning);
        assert_eq!(window_for(monday_at(10, 59)), RouteWindow::Morning);
        assert_eq!(window_for(monday_at(11, 0)), RouteWindow::Lunch);
        assert_eq!(window_for(monday_at(13, 59)), RouteWindow::Lunch);
        assert_eq!(window_for(monday_at(14, 0)), RouteWindow::AfterWork);
        assert_eq!(window_for(monday_at(18, 59)), RouteWindow::AfterWork);
        assert_eq!(window_for(monday_at(19, 0)), RouteWindow::Evening);
        assert_eq!(window_for(monday_at(23, 59)), RouteWindow::Evening);
    }

    #[test]
    fn weekends_ignore_the_hour() {
        let saturday = NaiveDate::from_ymd_opt(2024, 7, 20)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(window_for(saturday), RouteWindow::Weekend);
    }

    #[test]
    fn override_wins_outright() {
        let resolved = resolve_window(Some(RouteWindow::Evening), monday_at(8, 0));
        assert_eq!(resolved.window, RouteWindow::Evening);
        assert_eq!(resolved.source, WindowSource::Override);

        let auto = resolve_window(None, monday_at(12, 30));
        assert_eq!(
            auto,
            ResolvedWindow {
                window: RouteWindow::Lunch,
                source: WindowSource::Auto
            }
        );
    }

    #[test]
    fn fixed_clock_reports_its_date() {
        let clock = FixedClock(monday_at(9, 0));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
    }
}
