//! Unit tests for billing windows and clocks

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::temporal::TemporalError;
use core_kernel::{BillingWindow, Clock, ManualClock};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 21, 7, 0, 0).unwrap()
}

mod billing_window {
    use super::*;

    #[test]
    fn test_thirty_day_deadline() {
        let window = BillingWindow::new(start(), 30).unwrap();
        assert_eq!(window.deadline(), Utc.with_ymd_and_hms(2025, 9, 20, 7, 0, 0).unwrap());
        assert_eq!(window.length_days(), 30);
        assert_eq!(window.started_at(), start());
    }

    #[test]
    fn test_length_out_of_range() {
        assert_eq!(
            BillingWindow::new(start(), BillingWindow::MAX_LENGTH_DAYS + 1),
            Err(TemporalError::LengthOutOfRange(BillingWindow::MAX_LENGTH_DAYS + 1))
        );
    }

    #[test]
    fn test_elapsed_is_negative_before_start() {
        let window = BillingWindow::new(start(), 1).unwrap();
        assert_eq!(window.elapsed(start() - Duration::hours(1)), Duration::hours(-1));
        assert_eq!(window.elapsed(start() + Duration::minutes(90)), Duration::minutes(90));
    }

    #[test]
    fn test_remaining_counts_down() {
        let window = BillingWindow::new(start(), 2).unwrap();
        assert_eq!(window.remaining(start() + Duration::hours(12)), Duration::hours(36));
    }

    #[test]
    fn test_serde_round_trip_keeps_bounds() {
        let window = BillingWindow::new(start(), 7).unwrap();
        let json = serde_json::to_string(&window).unwrap();
        let back: BillingWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(back.deadline(), window.deadline());
    }
}

mod clocks {
    use super::*;

    #[test]
    fn test_manual_clock_set_and_advance() {
        let clock = ManualClock::new(start());
        clock.set(start() + Duration::days(3));
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), start() + Duration::days(3) + Duration::minutes(5));
    }
}
