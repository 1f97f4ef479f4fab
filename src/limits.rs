//! Hard limits. Anything beyond these is rejected with `LimitExceeded`
//! rather than degrading quietly.

use chrono::NaiveDate;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_EMAIL_LEN: usize = 320;
pub const MAX_PHONE_LEN: usize = 32;

pub const MAX_ROOM_TYPES: usize = 1_000;
pub const MAX_ROOMS: usize = 10_000;
pub const MAX_USERS: usize = 1_000_000;
pub const MAX_BOOKINGS: usize = 1_000_000;

/// Per-room cap on assignment records (active plus historical).
pub const MAX_ASSIGNMENTS_PER_ROOM: usize = 100_000;

/// Longest bookable stay.
pub const MAX_STAY_NIGHTS: i64 = 365;

/// Dates outside this range are treated as upstream bugs, not requests.
pub const MIN_VALID_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2000, 1, 1) {
    Some(d) => d,
    None => unreachable!(),
};
pub const MAX_VALID_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2100, 1, 1) {
    Some(d) => d,
    None => unreachable!(),
};

pub const WAL_CHANNEL_CAPACITY: usize = 4096;

/// Default bound on a single WAL interaction.
pub const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;

/// Pause before the single internal retry of a failed WAL append.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;
