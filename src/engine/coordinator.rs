use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::oneshot;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::lifecycle;
use super::selector::is_eligible;
use super::{Engine, EngineError, WalCommand};

fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Reject stays that should never have reached the engine.
pub(super) fn validate_stay(stay: &Stay) -> Result<(), EngineError> {
    if stay.check_out <= stay.check_in {
        return Err(EngineError::InvariantViolation(
            "check_out must be strictly after check_in",
        ));
    }
    if stay.check_in < MIN_VALID_DATE || stay.check_out > MAX_VALID_DATE {
        return Err(EngineError::InvariantViolation("stay outside valid date range"));
    }
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    Ok(())
}

impl Engine {
    // ── Inventory management ─────────────────────────────────

    pub async fn create_room_type(
        &self,
        id: Ulid,
        name: String,
        base_price: Decimal,
        max_occupancy: u32,
    ) -> Result<(), EngineError> {
        let _gate = self.compaction_gate.read().await;
        if self.store.room_type_count() >= MAX_ROOM_TYPES {
            return Err(EngineError::LimitExceeded("too many room types"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("room type name too long"));
        }
        if self.store.contains_room_type(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let event = Event::RoomTypeCreated {
            id,
            name: name.clone(),
            base_price,
            max_occupancy,
        };
        self.persist(&event).await?;
        self.store.insert_room_type(RoomType {
            id,
            name,
            base_price,
            max_occupancy,
        });
        Ok(())
    }

    pub async fn create_room(
        &self,
        id: Ulid,
        number: u32,
        room_type_id: Ulid,
        status: RoomStatus,
    ) -> Result<(), EngineError> {
        let _gate = self.compaction_gate.read().await;
        if self.store.room_count() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        if self.store.contains_room(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if !self.store.contains_room_type(&room_type_id) {
            return Err(EngineError::NotFound(room_type_id));
        }
        if self.store.room_id_by_number(number).is_some() {
            return Err(EngineError::Duplicate("room number"));
        }

        let event = Event::RoomCreated { id, number, room_type_id, status };
        self.persist(&event).await?;
        self.store.insert_room(RoomState::new(id, number, room_type_id, status));
        Ok(())
    }

    /// Housekeeping hook. Never touches assignments: marking a room Dirty or
    /// back Available says nothing about who is booked into it.
    pub async fn set_room_status(&self, id: Ulid, status: RoomStatus) -> Result<(), EngineError> {
        let _gate = self.compaction_gate.read().await;
        let room = self.store.room(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = room.write_owned().await;

        let event = Event::RoomStatusChanged { id, status };
        self.persist(&event).await?;
        guard.status = status;
        Ok(())
    }

    pub async fn create_user(
        &self,
        id: Ulid,
        email: String,
        full_name: String,
        phone: Option<String>,
    ) -> Result<(), EngineError> {
        let _gate = self.compaction_gate.read().await;
        if self.store.user_count() >= MAX_USERS {
            return Err(EngineError::LimitExceeded("too many users"));
        }
        if email.len() > MAX_EMAIL_LEN {
            return Err(EngineError::LimitExceeded("email too long"));
        }
        if full_name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("name too long"));
        }
        if let Some(ref p) = phone
            && p.len() > MAX_PHONE_LEN {
                return Err(EngineError::LimitExceeded("phone too long"));
            }
        if self.store.contains_user(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if self.store.user_id_by_email(&email).is_some() {
            return Err(EngineError::Duplicate("email"));
        }

        let event = Event::UserCreated {
            id,
            email: email.clone(),
            full_name: full_name.clone(),
            phone: phone.clone(),
        };
        self.persist(&event).await?;
        self.store.insert_user(User { id, email, full_name, phone });
        Ok(())
    }

    /// Create a booking in `Pending` with no assignment. The requested room
    /// type travels on the booking; the concrete room is chosen at `confirm`.
    pub async fn create_booking(
        &self,
        id: Ulid,
        user_id: Ulid,
        room_type_id: Ulid,
        stay: Stay,
        total: Decimal,
    ) -> Result<(), EngineError> {
        let _gate = self.compaction_gate.read().await;
        if self.store.booking_count() >= MAX_BOOKINGS {
            return Err(EngineError::LimitExceeded("too many bookings"));
        }
        validate_stay(&stay)?;
        if self.store.contains_booking(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        if !self.store.contains_user(&user_id) {
            return Err(EngineError::NotFound(user_id));
        }
        if !self.store.contains_room_type(&room_type_id) {
            return Err(EngineError::NotFound(room_type_id));
        }

        let event = Event::BookingCreated { id, user_id, room_type_id, stay, total };
        self.persist(&event).await?;
        self.store.insert_booking(Booking {
            id,
            user_id,
            room_type_id,
            stay,
            total,
            status: BookingStatus::Pending,
        });
        Ok(())
    }

    // ── Booking lifecycle ────────────────────────────────────

    /// Confirm a pending booking by reserving a concrete room.
    ///
    /// Candidates are walked in room-number order; each is checked under its
    /// own write lock, so the availability check and the reservation are one
    /// atomic step per room — two concurrent confirms can never both take the
    /// same room for overlapping dates. A candidate that turns out conflicting
    /// under its lock is simply passed over; when the list runs out the
    /// outcome is `NotAvailable` and the booking stays `Pending`.
    pub async fn confirm(&self, booking_id: Ulid) -> Result<AssignmentInfo, EngineError> {
        let start = std::time::Instant::now();
        let _gate = self.compaction_gate.read().await;
        let booking = self
            .store
            .booking(&booking_id)
            .ok_or(EngineError::NotFound(booking_id))?;
        let mut booking_guard = booking.write_owned().await;

        let confirmed = lifecycle::transition(
            booking_guard.status,
            BookingStatus::Confirmed,
            &booking_guard.stay,
            today(),
        )?;
        validate_stay(&booking_guard.stay)?;
        let stay = booking_guard.stay;
        let room_type_id = booking_guard.room_type_id;

        for (number, room_id) in self.store.rooms_of_type(&room_type_id) {
            let Some(room) = self.store.room(&room_id) else {
                continue;
            };
            let mut room_guard = room.write_owned().await;
            if !is_eligible(&room_guard, &stay) {
                continue;
            }
            if room_guard.assignments.len() >= MAX_ASSIGNMENTS_PER_ROOM {
                return Err(EngineError::LimitExceeded("too many assignments on room"));
            }

            let assignment_id = Ulid::new();
            let created_at = now_ms();
            let event = Event::BookingConfirmed {
                booking_id,
                assignment_id,
                room_id,
                stay,
                created_at,
            };
            self.persist(&event).await?;

            booking_guard.status = confirmed;
            room_guard.insert_assignment(Assignment {
                id: assignment_id,
                booking_id,
                stay,
                created_at,
                cancelled: false,
            });
            self.store.record_assignment(assignment_id, booking_id, room_id);

            metrics::counter!(observability::CONFIRMATIONS_TOTAL).increment(1);
            metrics::histogram!(observability::CONFIRM_DURATION_SECONDS)
                .record(start.elapsed().as_secs_f64());
            tracing::info!(%booking_id, room = number, "booking confirmed");

            return Ok(AssignmentInfo {
                id: assignment_id,
                booking_id,
                room_id,
                stay,
                created_at,
                cancelled: false,
            });
        }

        metrics::counter!(observability::CONFIRMATIONS_NOT_AVAILABLE_TOTAL).increment(1);
        tracing::debug!(%booking_id, %room_type_id, "no eligible room");
        Err(EngineError::NotAvailable { room_type_id })
    }

    /// Cancel a booking. Its assignments stay on their rooms as history but
    /// are flagged inactive, so the dates free up immediately.
    pub async fn cancel(&self, booking_id: Ulid) -> Result<(), EngineError> {
        let _gate = self.compaction_gate.read().await;
        let booking = self
            .store
            .booking(&booking_id)
            .ok_or(EngineError::NotFound(booking_id))?;
        let mut booking_guard = booking.write_owned().await;

        let cancelled = lifecycle::transition(
            booking_guard.status,
            BookingStatus::Cancelled,
            &booking_guard.stay,
            today(),
        )?;

        // Group assignments per room, then lock rooms in id order. The
        // booking lock is already held; room locks always come after it.
        let mut by_room: BTreeMap<Ulid, Vec<Ulid>> = BTreeMap::new();
        for (assignment_id, room_id) in self.store.assignments_of_booking(&booking_id) {
            by_room.entry(room_id).or_default().push(assignment_id);
        }
        let mut room_guards = Vec::with_capacity(by_room.len());
        for (room_id, assignment_ids) in by_room {
            if let Some(room) = self.store.room(&room_id) {
                room_guards.push((room.write_owned().await, assignment_ids));
            }
        }

        self.persist(&Event::BookingCancelled { booking_id }).await?;

        booking_guard.status = cancelled;
        for (guard, assignment_ids) in &mut room_guards {
            for aid in assignment_ids {
                if let Some(a) = guard.assignment_mut(*aid) {
                    a.cancelled = true;
                }
            }
        }

        metrics::counter!(observability::CANCELLATIONS_TOTAL).increment(1);
        tracing::info!(%booking_id, "booking cancelled");
        Ok(())
    }

    /// Guest arrival. Allowed from `Confirmed` on or after the check-in date.
    /// `today` comes from the caller, keeping the date guard clock-free.
    pub async fn check_in(&self, booking_id: Ulid, today: NaiveDate) -> Result<(), EngineError> {
        self.apply_status_transition(booking_id, BookingStatus::CheckedIn, today, |id| {
            Event::BookingCheckedIn { booking_id: id }
        })
        .await
    }

    /// Guest departure. Allowed from `CheckedIn` on or after the checkout date.
    pub async fn complete(&self, booking_id: Ulid, today: NaiveDate) -> Result<(), EngineError> {
        self.apply_status_transition(booking_id, BookingStatus::Completed, today, |id| {
            Event::BookingCompleted { booking_id: id }
        })
        .await
    }

    /// Shared path for the pure status transitions: validate through the
    /// state machine, persist one event, apply.
    async fn apply_status_transition(
        &self,
        booking_id: Ulid,
        target: BookingStatus,
        today: NaiveDate,
        make_event: impl FnOnce(Ulid) -> Event,
    ) -> Result<(), EngineError> {
        let _gate = self.compaction_gate.read().await;
        let booking = self
            .store
            .booking(&booking_id)
            .ok_or(EngineError::NotFound(booking_id))?;
        let mut guard = booking.write_owned().await;

        let next = lifecycle::transition(guard.status, target, &guard.stay, today)?;
        self.persist(&make_event(booking_id)).await?;
        guard.status = next;
        tracing::debug!(%booking_id, status = %next, "booking transitioned");
        Ok(())
    }

    // ── WAL compaction ───────────────────────────────────────

    /// Rewrite the WAL with the minimal event set reproducing current state.
    /// The embedder decides when; there is no background compactor. Holding
    /// the gate exclusively makes the snapshot a consistent cut: in-flight
    /// mutations finish first, new ones wait.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _gate = self.compaction_gate.write().await;
        let mut events = Vec::new();

        for rt in self.store.room_types() {
            events.push(Event::RoomTypeCreated {
                id: rt.id,
                name: rt.name,
                base_price: rt.base_price,
                max_occupancy: rt.max_occupancy,
            });
        }
        for user in self.store.users() {
            events.push(Event::UserCreated {
                id: user.id,
                email: user.email,
                full_name: user.full_name,
                phone: user.phone,
            });
        }

        let mut rooms = Vec::new();
        for room_id in self.store.room_ids() {
            if let Some(room) = self.store.room(&room_id) {
                rooms.push(room.read().await.clone());
            }
        }
        rooms.sort_by_key(|r| r.number);
        for room in &rooms {
            events.push(Event::RoomCreated {
                id: room.id,
                number: room.number,
                room_type_id: room.room_type_id,
                status: room.status,
            });
        }

        let mut bookings = Vec::new();
        for booking_id in self.store.booking_ids() {
            if let Some(booking) = self.store.booking(&booking_id) {
                bookings.push(booking.read().await.clone());
            }
        }
        bookings.sort_by_key(|b| b.id);
        for b in &bookings {
            events.push(Event::BookingCreated {
                id: b.id,
                user_id: b.user_id,
                room_type_id: b.room_type_id,
                stay: b.stay,
                total: b.total,
            });
        }

        // Assignments re-confirm their bookings; status fixups follow.
        for room in &rooms {
            for a in &room.assignments {
                events.push(Event::BookingConfirmed {
                    booking_id: a.booking_id,
                    assignment_id: a.id,
                    room_id: room.id,
                    stay: a.stay,
                    created_at: a.created_at,
                });
            }
        }
        for b in &bookings {
            match b.status {
                BookingStatus::CheckedIn => {
                    events.push(Event::BookingCheckedIn { booking_id: b.id });
                }
                BookingStatus::Completed => {
                    events.push(Event::BookingCompleted { booking_id: b.id });
                }
                BookingStatus::Cancelled => {
                    events.push(Event::BookingCancelled { booking_id: b.id });
                }
                BookingStatus::Pending | BookingStatus::Confirmed => {}
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::Storage("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Storage("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::Storage(e.to_string()))?;
        tracing::info!("WAL compacted");
        Ok(())
    }
}
