use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

pub type SharedRoomState = Arc<RwLock<RoomState>>;
pub type SharedBooking = Arc<RwLock<Booking>>;

/// In-memory tables reconstructed from the WAL. Rooms and bookings sit behind
/// per-record locks; room types and users are read-only after creation and
/// need none.
pub struct InventoryStore {
    room_types: DashMap<Ulid, RoomType>,
    users: DashMap<Ulid, User>,
    users_by_email: DashMap<String, Ulid>,
    rooms: DashMap<Ulid, SharedRoomState>,
    rooms_by_number: DashMap<u32, Ulid>,
    /// Type id → `(room_number, room_id)`, ascending by number. This ordering
    /// is what makes room selection deterministic.
    rooms_by_type: DashMap<Ulid, Vec<(u32, Ulid)>>,
    bookings: DashMap<Ulid, SharedBooking>,
    /// Assignment id → room id.
    assignment_rooms: DashMap<Ulid, Ulid>,
    /// Booking id → assignment ids, historical ones included.
    booking_assignments: DashMap<Ulid, Vec<Ulid>>,
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryStore {
    pub fn new() -> Self {
        Self {
            room_types: DashMap::new(),
            users: DashMap::new(),
            users_by_email: DashMap::new(),
            rooms: DashMap::new(),
            rooms_by_number: DashMap::new(),
            rooms_by_type: DashMap::new(),
            bookings: DashMap::new(),
            assignment_rooms: DashMap::new(),
            booking_assignments: DashMap::new(),
        }
    }

    // ── Room types ───────────────────────────────────────────

    pub fn room_type_count(&self) -> usize {
        self.room_types.len()
    }

    pub fn contains_room_type(&self, id: &Ulid) -> bool {
        self.room_types.contains_key(id)
    }

    pub fn room_type(&self, id: &Ulid) -> Option<RoomType> {
        self.room_types.get(id).map(|e| e.value().clone())
    }

    pub fn insert_room_type(&self, rt: RoomType) {
        self.room_types.insert(rt.id, rt);
    }

    pub fn room_types(&self) -> Vec<RoomType> {
        self.room_types.iter().map(|e| e.value().clone()).collect()
    }

    // ── Users ────────────────────────────────────────────────

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn contains_user(&self, id: &Ulid) -> bool {
        self.users.contains_key(id)
    }

    pub fn user(&self, id: &Ulid) -> Option<User> {
        self.users.get(id).map(|e| e.value().clone())
    }

    pub fn user_id_by_email(&self, email: &str) -> Option<Ulid> {
        self.users_by_email.get(email).map(|e| *e.value())
    }

    pub fn insert_user(&self, user: User) {
        self.users_by_email.insert(user.email.clone(), user.id);
        self.users.insert(user.id, user);
    }

    pub fn users(&self) -> Vec<User> {
        self.users.iter().map(|e| e.value().clone()).collect()
    }

    // ── Rooms ────────────────────────────────────────────────

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains_room(&self, id: &Ulid) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn room(&self, id: &Ulid) -> Option<SharedRoomState> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn room_id_by_number(&self, number: u32) -> Option<Ulid> {
        self.rooms_by_number.get(&number).map(|e| *e.value())
    }

    /// Insert a room and index it by number and by type.
    pub fn insert_room(&self, rs: RoomState) {
        let id = rs.id;
        let number = rs.number;
        let type_id = rs.room_type_id;
        self.rooms.insert(id, Arc::new(RwLock::new(rs)));
        self.rooms_by_number.insert(number, id);
        let mut by_type = self.rooms_by_type.entry(type_id).or_default();
        let pos = by_type
            .binary_search_by_key(&number, |(n, _)| *n)
            .unwrap_or_else(|e| e);
        by_type.insert(pos, (number, id));
    }

    /// Rooms of a type as `(room_number, room_id)`, ascending by number.
    pub fn rooms_of_type(&self, type_id: &Ulid) -> Vec<(u32, Ulid)> {
        self.rooms_by_type
            .get(type_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn room_ids(&self) -> Vec<Ulid> {
        self.rooms.iter().map(|e| *e.key()).collect()
    }

    // ── Bookings ─────────────────────────────────────────────

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    pub fn contains_booking(&self, id: &Ulid) -> bool {
        self.bookings.contains_key(id)
    }

    pub fn booking(&self, id: &Ulid) -> Option<SharedBooking> {
        self.bookings.get(id).map(|e| e.value().clone())
    }

    pub fn insert_booking(&self, booking: Booking) {
        self.bookings.insert(booking.id, Arc::new(RwLock::new(booking)));
    }

    pub fn booking_ids(&self) -> Vec<Ulid> {
        self.bookings.iter().map(|e| *e.key()).collect()
    }

    // ── Assignment indexes ───────────────────────────────────

    pub fn record_assignment(&self, assignment_id: Ulid, booking_id: Ulid, room_id: Ulid) {
        self.assignment_rooms.insert(assignment_id, room_id);
        self.booking_assignments
            .entry(booking_id)
            .or_default()
            .push(assignment_id);
    }

    pub fn contains_assignment(&self, id: &Ulid) -> bool {
        self.assignment_rooms.contains_key(id)
    }

    pub fn room_of_assignment(&self, assignment_id: &Ulid) -> Option<Ulid> {
        self.assignment_rooms.get(assignment_id).map(|e| *e.value())
    }

    /// All assignments of a booking as `(assignment_id, room_id)` pairs.
    pub fn assignments_of_booking(&self, booking_id: &Ulid) -> Vec<(Ulid, Ulid)> {
        let Some(ids) = self.booking_assignments.get(booking_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|aid| self.room_of_assignment(aid).map(|rid| (*aid, rid)))
            .collect()
    }
}
