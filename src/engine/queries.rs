use ulid::Ulid;

use crate::model::*;

use super::availability::free_ranges;
use super::coordinator::validate_stay;
use super::selector::is_eligible;
use super::{Engine, EngineError};

impl Engine {
    /// Pre-booking search: does the type have at least one eligible room for
    /// the stay? Read-only — nothing is reserved.
    pub async fn is_room_type_available(
        &self,
        room_type_id: Ulid,
        stay: Stay,
    ) -> Result<bool, EngineError> {
        validate_stay(&stay)?;
        if !self.store.contains_room_type(&room_type_id) {
            return Err(EngineError::NotFound(room_type_id));
        }
        Ok(self.select_room(&room_type_id, &stay).await.is_some())
    }

    /// How many rooms of the type could still take the stay. Same eligibility
    /// rules as selection; useful for inventory dashboards and search results.
    pub async fn count_available_rooms(
        &self,
        room_type_id: Ulid,
        stay: Stay,
    ) -> Result<usize, EngineError> {
        validate_stay(&stay)?;
        if !self.store.contains_room_type(&room_type_id) {
            return Err(EngineError::NotFound(room_type_id));
        }
        let mut count = 0;
        for (_, room_id) in self.store.rooms_of_type(&room_type_id) {
            let Some(room) = self.store.room(&room_id) else {
                continue;
            };
            if is_eligible(&*room.read().await, &stay) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Free date ranges for one room inside a window, active assignments
    /// subtracted.
    pub async fn room_vacancies(
        &self,
        room_id: Ulid,
        window: Stay,
    ) -> Result<Vec<Stay>, EngineError> {
        validate_stay(&window)?;
        let room = self
            .store
            .room(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        let guard = room.read().await;
        Ok(free_ranges(&guard, &window))
    }

    pub async fn get_booking(&self, id: Ulid) -> Result<BookingInfo, EngineError> {
        let booking = self.store.booking(&id).ok_or(EngineError::NotFound(id))?;
        let guard = booking.read().await;
        Ok(BookingInfo {
            id: guard.id,
            user_id: guard.user_id,
            room_type_id: guard.room_type_id,
            stay: guard.stay,
            total: guard.total,
            status: guard.status,
        })
    }

    /// Every assignment ever made for a booking, cancelled ones included.
    pub async fn booking_assignments(&self, booking_id: Ulid) -> Vec<AssignmentInfo> {
        let mut out = Vec::new();
        for (assignment_id, room_id) in self.store.assignments_of_booking(&booking_id) {
            let Some(room) = self.store.room(&room_id) else {
                continue;
            };
            let guard = room.read().await;
            if let Some(a) = guard.assignments.iter().find(|a| a.id == assignment_id) {
                out.push(AssignmentInfo {
                    id: a.id,
                    booking_id: a.booking_id,
                    room_id,
                    stay: a.stay,
                    created_at: a.created_at,
                    cancelled: a.cancelled,
                });
            }
        }
        out
    }

    pub async fn get_room(&self, id: Ulid) -> Result<RoomInfo, EngineError> {
        let room = self.store.room(&id).ok_or(EngineError::NotFound(id))?;
        let guard = room.read().await;
        Ok(RoomInfo {
            id: guard.id,
            number: guard.number,
            room_type_id: guard.room_type_id,
            status: guard.status,
        })
    }

    pub fn get_room_type(&self, id: Ulid) -> Result<RoomType, EngineError> {
        self.store.room_type(&id).ok_or(EngineError::NotFound(id))
    }

    pub fn get_user(&self, id: Ulid) -> Result<User, EngineError> {
        self.store.user(&id).ok_or(EngineError::NotFound(id))
    }

    pub fn list_room_types(&self) -> Vec<RoomType> {
        let mut types = self.store.room_types();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        types
    }

    pub async fn list_rooms_of_type(&self, room_type_id: Ulid) -> Vec<RoomInfo> {
        let mut out = Vec::new();
        for (_, room_id) in self.store.rooms_of_type(&room_type_id) {
            if let Ok(info) = self.get_room(room_id).await {
                out.push(info);
            }
        }
        out
    }
}
