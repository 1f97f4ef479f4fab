use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds, used for record timestamps.
pub type Ms = i64;

/// Half-open date range `[check_in, check_out)`.
///
/// Checkout day is excluded, so a stay ending on a date and another starting
/// on that same date share the room without overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl Stay {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        debug_assert!(check_in < check_out, "Stay check_in must precede check_out");
        Self { check_in, check_out }
    }

    pub fn nights(&self) -> i64 {
        self.check_out.signed_duration_since(self.check_in).num_days()
    }

    pub fn overlaps(&self, other: &Stay) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    pub fn contains_date(&self, d: NaiveDate) -> bool {
        self.check_in <= d && d < self.check_out
    }
}

/// Housekeeping state of a physical room. Deliberately says nothing about
/// occupancy — that is derived from assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Available,
    Dirty,
    Maintenance,
}

/// Booking lifecycle states. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::CheckedIn => "CheckedIn",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomType {
    pub id: Ulid,
    pub name: String,
    pub base_price: Decimal,
    pub max_occupancy: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Ulid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: Ulid,
    pub user_id: Ulid,
    /// Requested room type. The concrete room is chosen at confirmation.
    pub room_type_id: Ulid,
    pub stay: Stay,
    pub total: Decimal,
    pub status: BookingStatus,
}

/// A room-to-booking assignment as stored on the room it reserves.
///
/// Never deleted: cancellation flips `cancelled`, keeping the record as
/// history while removing its dates from overlap checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Ulid,
    pub booking_id: Ulid,
    pub stay: Stay,
    pub created_at: Ms,
    pub cancelled: bool,
}

impl Assignment {
    pub fn is_active(&self) -> bool {
        !self.cancelled
    }
}

/// A physical room plus its full assignment list, sorted by `stay.check_in`.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub id: Ulid,
    /// Unique within the inventory; also the selection tie-break key.
    pub number: u32,
    pub room_type_id: Ulid,
    pub status: RoomStatus,
    pub assignments: Vec<Assignment>,
}

impl RoomState {
    pub fn new(id: Ulid, number: u32, room_type_id: Ulid, status: RoomStatus) -> Self {
        Self {
            id,
            number,
            room_type_id,
            status,
            assignments: Vec::new(),
        }
    }

    /// Insert keeping the list sorted by check-in date.
    pub fn insert_assignment(&mut self, assignment: Assignment) {
        let pos = self
            .assignments
            .binary_search_by_key(&assignment.stay.check_in, |a| a.stay.check_in)
            .unwrap_or_else(|e| e);
        self.assignments.insert(pos, assignment);
    }

    pub fn assignment_mut(&mut self, id: Ulid) -> Option<&mut Assignment> {
        self.assignments.iter_mut().find(|a| a.id == id)
    }

    /// Assignments whose stay overlaps the query window.
    /// Binary search skips everything starting at or after the query checkout.
    pub fn overlapping(&self, query: &Stay) -> impl Iterator<Item = &Assignment> {
        let right_bound = self
            .assignments
            .partition_point(|a| a.stay.check_in < query.check_out);
        self.assignments[..right_bound]
            .iter()
            .filter(move |a| a.stay.check_out > query.check_in)
    }
}

/// The WAL record format — one event per committed state change. A single
/// event carries everything one operation touches, so replaying the log
/// can never reconstruct a half-applied confirmation or cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomTypeCreated {
        id: Ulid,
        name: String,
        // bincode rejects Decimal's self-describing default format, so money
        // travels as a string on the wire.
        #[serde(with = "rust_decimal::serde::str")]
        base_price: Decimal,
        max_occupancy: u32,
    },
    RoomCreated {
        id: Ulid,
        number: u32,
        room_type_id: Ulid,
        status: RoomStatus,
    },
    RoomStatusChanged {
        id: Ulid,
        status: RoomStatus,
    },
    UserCreated {
        id: Ulid,
        email: String,
        full_name: String,
        phone: Option<String>,
    },
    BookingCreated {
        id: Ulid,
        user_id: Ulid,
        room_type_id: Ulid,
        stay: Stay,
        #[serde(with = "rust_decimal::serde::str")]
        total: Decimal,
    },
    BookingConfirmed {
        booking_id: Ulid,
        assignment_id: Ulid,
        room_id: Ulid,
        stay: Stay,
        created_at: Ms,
    },
    BookingCancelled {
        booking_id: Ulid,
    },
    BookingCheckedIn {
        booking_id: Ulid,
    },
    BookingCompleted {
        booking_id: Ulid,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub id: Ulid,
    pub number: u32,
    pub room_type_id: Ulid,
    pub status: RoomStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingInfo {
    pub id: Ulid,
    pub user_id: Ulid,
    pub room_type_id: Ulid,
    pub stay: Stay,
    pub total: Decimal,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentInfo {
    pub id: Ulid,
    pub booking_id: Ulid,
    pub room_id: Ulid,
    pub stay: Stay,
    pub created_at: Ms,
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn stay_basics() {
        let s = Stay::new(d(2026, 6, 10), d(2026, 6, 13));
        assert_eq!(s.nights(), 3);
        assert!(s.contains_date(d(2026, 6, 10)));
        assert!(s.contains_date(d(2026, 6, 12)));
        assert!(!s.contains_date(d(2026, 6, 13))); // half-open
    }

    #[test]
    fn stay_overlap() {
        let a = Stay::new(d(2026, 6, 10), d(2026, 6, 13));
        let b = Stay::new(d(2026, 6, 12), d(2026, 6, 15));
        let c = Stay::new(d(2026, 6, 13), d(2026, 6, 16));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // adjacent: same-day checkout/check-in
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn assignments_stay_sorted() {
        let mut rs = RoomState::new(Ulid::new(), 101, Ulid::new(), RoomStatus::Available);
        for (ci, co) in [(20, 23), (10, 13), (15, 18)] {
            rs.insert_assignment(Assignment {
                id: Ulid::new(),
                booking_id: Ulid::new(),
                stay: Stay::new(d(2026, 6, ci), d(2026, 6, co)),
                created_at: 0,
                cancelled: false,
            });
        }
        assert_eq!(rs.assignments[0].stay.check_in, d(2026, 6, 10));
        assert_eq!(rs.assignments[1].stay.check_in, d(2026, 6, 15));
        assert_eq!(rs.assignments[2].stay.check_in, d(2026, 6, 20));
    }

    #[test]
    fn overlapping_skips_disjoint() {
        let mut rs = RoomState::new(Ulid::new(), 101, Ulid::new(), RoomStatus::Available);
        for (ci, co) in [(1, 4), (10, 13), (20, 23)] {
            rs.insert_assignment(Assignment {
                id: Ulid::new(),
                booking_id: Ulid::new(),
                stay: Stay::new(d(2026, 6, ci), d(2026, 6, co)),
                created_at: 0,
                cancelled: false,
            });
        }
        let query = Stay::new(d(2026, 6, 11), d(2026, 6, 14));
        let hits: Vec<_> = rs.overlapping(&query).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].stay.check_in, d(2026, 6, 10));
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        let mut rs = RoomState::new(Ulid::new(), 101, Ulid::new(), RoomStatus::Available);
        rs.insert_assignment(Assignment {
            id: Ulid::new(),
            booking_id: Ulid::new(),
            stay: Stay::new(d(2026, 6, 10), d(2026, 6, 13)),
            created_at: 0,
            cancelled: false,
        });
        let query = Stay::new(d(2026, 6, 13), d(2026, 6, 16));
        assert_eq!(rs.overlapping(&query).count(), 0);
    }

    #[test]
    fn money_carrying_events_survive_bincode() {
        use rust_decimal_macros::dec;

        let events = [
            Event::RoomTypeCreated {
                id: Ulid::new(),
                name: "Executive King".into(),
                base_price: dec!(189.00),
                max_occupancy: 2,
            },
            Event::BookingCreated {
                id: Ulid::new(),
                user_id: Ulid::new(),
                room_type_id: Ulid::new(),
                stay: Stay::new(d(2026, 6, 10), d(2026, 6, 13)),
                total: dec!(567.00),
            },
        ];
        for event in events {
            let bytes = bincode::serialize(&event).unwrap();
            let decoded: Event = bincode::deserialize(&bytes).unwrap();
            assert_eq!(event, decoded);
        }
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::BookingConfirmed {
            booking_id: Ulid::new(),
            assignment_id: Ulid::new(),
            room_id: Ulid::new(),
            stay: Stay::new(d(2026, 6, 10), d(2026, 6, 13)),
            created_at: 1_750_000_000_000,
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
