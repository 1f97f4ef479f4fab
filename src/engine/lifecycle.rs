use chrono::NaiveDate;

use crate::model::{BookingStatus, Stay};

use super::EngineError;

/// The booking state machine. Pure validation: computes the resulting state
/// or rejects the request; the coordinator persists the result.
///
/// Legal transitions:
/// - `Pending -> Confirmed` (coordinator reserved a room)
/// - `Pending -> Cancelled`
/// - `Confirmed -> CheckedIn` when `today >= check_in`
/// - `Confirmed -> Cancelled` (releases the reservation)
/// - `CheckedIn -> Completed` when `today >= check_out`
///
/// Everything else — cancelling an occupied room, touching a terminal
/// booking, date guards not yet met — is `InvalidTransition`.
pub fn transition(
    current: BookingStatus,
    target: BookingStatus,
    stay: &Stay,
    today: NaiveDate,
) -> Result<BookingStatus, EngineError> {
    use BookingStatus::*;

    let allowed = match (current, target) {
        (Pending, Confirmed) => true,
        (Pending, Cancelled) => true,
        (Confirmed, CheckedIn) => today >= stay.check_in,
        (Confirmed, Cancelled) => true,
        (CheckedIn, Completed) => today >= stay.check_out,
        _ => false,
    };

    if allowed {
        Ok(target)
    } else {
        metrics::counter!(crate::observability::INVALID_TRANSITIONS_TOTAL).increment(1);
        Err(EngineError::InvalidTransition {
            from: current,
            to: target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, day).unwrap()
    }

    fn stay() -> Stay {
        Stay::new(d(10), d(13))
    }

    fn assert_invalid(result: Result<BookingStatus, EngineError>) {
        assert!(matches!(result, Err(EngineError::InvalidTransition { .. })));
    }

    #[test]
    fn pending_confirm_and_cancel() {
        use BookingStatus::*;
        assert_eq!(transition(Pending, Confirmed, &stay(), d(1)).unwrap(), Confirmed);
        assert_eq!(transition(Pending, Cancelled, &stay(), d(1)).unwrap(), Cancelled);
    }

    #[test]
    fn check_in_respects_date_guard() {
        use BookingStatus::*;
        assert_invalid(transition(Confirmed, CheckedIn, &stay(), d(9)));
        assert_eq!(transition(Confirmed, CheckedIn, &stay(), d(10)).unwrap(), CheckedIn);
        // Late check-in is fine.
        assert_eq!(transition(Confirmed, CheckedIn, &stay(), d(12)).unwrap(), CheckedIn);
    }

    #[test]
    fn complete_respects_date_guard() {
        use BookingStatus::*;
        assert_invalid(transition(CheckedIn, Completed, &stay(), d(12)));
        assert_eq!(transition(CheckedIn, Completed, &stay(), d(13)).unwrap(), Completed);
    }

    #[test]
    fn checked_in_cannot_cancel() {
        use BookingStatus::*;
        assert_invalid(transition(CheckedIn, Cancelled, &stay(), d(11)));
    }

    #[test]
    fn terminal_states_reject_everything() {
        use BookingStatus::*;
        for terminal in [Completed, Cancelled] {
            for target in [Pending, Confirmed, CheckedIn, Completed, Cancelled] {
                assert_invalid(transition(terminal, target, &stay(), d(20)));
            }
        }
    }

    #[test]
    fn no_skipping_states() {
        use BookingStatus::*;
        assert_invalid(transition(Pending, CheckedIn, &stay(), d(11)));
        assert_invalid(transition(Pending, Completed, &stay(), d(20)));
        assert_invalid(transition(Confirmed, Completed, &stay(), d(20)));
        assert_invalid(transition(Confirmed, Pending, &stay(), d(1)));
    }

    #[test]
    fn error_names_both_states() {
        use BookingStatus::*;
        match transition(CheckedIn, Cancelled, &stay(), d(11)) {
            Err(EngineError::InvalidTransition { from, to }) => {
                assert_eq!(from, CheckedIn);
                assert_eq!(to, Cancelled);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }
}
