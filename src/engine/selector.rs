use ulid::Ulid;

use crate::model::*;

use super::availability::is_free;
use super::Engine;

/// Eligibility as the selector sees it: not under maintenance, and free for
/// the whole stay. Dirty rooms are eligible — housekeeping state is not
/// occupancy.
pub(super) fn is_eligible(room: &RoomState, stay: &Stay) -> bool {
    room.status != RoomStatus::Maintenance && is_free(room, stay)
}

impl Engine {
    /// Read-only selection: the lowest-numbered eligible room of the type, or
    /// `None`. Takes per-room read locks one at a time; good for search, not
    /// for reserving — the confirming path re-checks under write locks.
    pub(super) async fn select_room(&self, type_id: &Ulid, stay: &Stay) -> Option<Ulid> {
        // rooms_of_type is ordered by room number, so the first hit wins.
        for (_, room_id) in self.store.rooms_of_type(type_id) {
            let Some(room) = self.store.room(&room_id) else {
                continue;
            };
            let guard = room.read().await;
            if is_eligible(&guard, stay) {
                return Some(room_id);
            }
        }
        None
    }
}
