use crate::model::*;

// ── Interval Index ────────────────────────────────────────────────

/// Is the room free for the whole stay? An assignment blocks the stay iff it
/// is active (its booking is not cancelled) and its dates overlap. Adjacent
/// stays — one checking out the day the other checks in — do not collide.
///
/// Pure query; housekeeping status is the selector's concern, not ours.
pub fn is_free(room: &RoomState, stay: &Stay) -> bool {
    room.overlapping(stay).all(|a| !a.is_active())
}

/// Free date ranges inside `window` for a single room: the window minus all
/// active assignments, as disjoint sorted ranges.
pub fn free_ranges(room: &RoomState, window: &Stay) -> Vec<Stay> {
    let mut taken: Vec<Stay> = room
        .overlapping(window)
        .filter(|a| a.is_active())
        .map(|a| {
            Stay::new(
                a.stay.check_in.max(window.check_in),
                a.stay.check_out.min(window.check_out),
            )
        })
        .collect();
    taken.sort_by_key(|s| s.check_in);
    let taken = merge_overlapping(&taken);
    subtract_stays(&[*window], &taken)
}

/// Merge sorted overlapping/adjacent ranges into disjoint ranges.
pub fn merge_overlapping(sorted: &[Stay]) -> Vec<Stay> {
    let mut merged: Vec<Stay> = Vec::new();
    for &stay in sorted {
        if let Some(last) = merged.last_mut()
            && stay.check_in <= last.check_out {
                last.check_out = last.check_out.max(stay.check_out);
                continue;
            }
        merged.push(stay);
    }
    merged
}

/// Subtract sorted disjoint `to_remove` ranges from sorted `base` ranges.
pub fn subtract_stays(base: &[Stay], to_remove: &[Stay]) -> Vec<Stay> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.check_in;
        let current_end = b.check_out;

        while ri < to_remove.len() && to_remove[ri].check_out <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].check_in < current_end {
            let r = &to_remove[j];
            if r.check_in > current_start {
                result.push(Stay::new(current_start, r.check_in));
            }
            current_start = current_start.max(r.check_out);
            j += 1;
        }

        if current_start < current_end {
            result.push(Stay::new(current_start, current_end));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ulid::Ulid;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, day).unwrap()
    }

    fn stay(ci: u32, co: u32) -> Stay {
        Stay::new(d(ci), d(co))
    }

    fn room_with(assignments: Vec<(u32, u32, bool)>) -> RoomState {
        let mut rs = RoomState::new(Ulid::new(), 101, Ulid::new(), RoomStatus::Available);
        for (ci, co, cancelled) in assignments {
            rs.insert_assignment(Assignment {
                id: Ulid::new(),
                booking_id: Ulid::new(),
                stay: stay(ci, co),
                created_at: 0,
                cancelled,
            });
        }
        rs
    }

    // ── is_free ───────────────────────────────────────────

    #[test]
    fn free_when_empty() {
        let rs = room_with(vec![]);
        assert!(is_free(&rs, &stay(10, 13)));
    }

    #[test]
    fn blocked_by_overlapping_assignment() {
        let rs = room_with(vec![(10, 13, false)]);
        assert!(!is_free(&rs, &stay(12, 15)));
        assert!(!is_free(&rs, &stay(8, 11)));
        assert!(!is_free(&rs, &stay(11, 12))); // fully inside
        assert!(!is_free(&rs, &stay(8, 20))); // fully covering
    }

    #[test]
    fn adjacent_stays_do_not_block() {
        let rs = room_with(vec![(10, 13, false)]);
        assert!(is_free(&rs, &stay(13, 16))); // check in on checkout day
        assert!(is_free(&rs, &stay(7, 10))); // check out on check-in day
    }

    #[test]
    fn cancelled_assignment_does_not_block() {
        let rs = room_with(vec![(10, 13, true)]);
        assert!(is_free(&rs, &stay(10, 13)));
        assert!(is_free(&rs, &stay(11, 20)));
    }

    #[test]
    fn mixed_active_and_cancelled() {
        let rs = room_with(vec![(10, 13, true), (10, 13, false)]);
        assert!(!is_free(&rs, &stay(11, 12)));
    }

    // ── merge / subtract ──────────────────────────────────

    #[test]
    fn merge_overlapping_basic() {
        let stays = vec![stay(1, 5), stay(3, 8), stay(12, 15)];
        assert_eq!(merge_overlapping(&stays), vec![stay(1, 8), stay(12, 15)]);
    }

    #[test]
    fn merge_adjacent() {
        let stays = vec![stay(1, 5), stay(5, 9)];
        assert_eq!(merge_overlapping(&stays), vec![stay(1, 9)]);
    }

    #[test]
    fn subtract_no_overlap() {
        let base = vec![stay(1, 5), stay(10, 15)];
        let remove = vec![stay(5, 10)];
        assert_eq!(subtract_stays(&base, &remove), base);
    }

    #[test]
    fn subtract_middle_punch() {
        let base = vec![stay(1, 20)];
        let remove = vec![stay(5, 8), stay(12, 14)];
        assert_eq!(
            subtract_stays(&base, &remove),
            vec![stay(1, 5), stay(8, 12), stay(14, 20)]
        );
    }

    #[test]
    fn subtract_full_cover() {
        let base = vec![stay(5, 8)];
        let remove = vec![stay(1, 20)];
        assert!(subtract_stays(&base, &remove).is_empty());
    }

    // ── free_ranges ───────────────────────────────────────

    #[test]
    fn free_ranges_around_assignments() {
        let rs = room_with(vec![(10, 13, false), (20, 23, false), (15, 18, true)]);
        let free = free_ranges(&rs, &stay(1, 28));
        assert_eq!(free, vec![stay(1, 10), stay(13, 20), stay(23, 28)]);
    }

    #[test]
    fn free_ranges_clamps_to_window() {
        let rs = room_with(vec![(1, 12, false)]);
        let free = free_ranges(&rs, &stay(10, 20));
        assert_eq!(free, vec![stay(12, 20)]);
    }
}
