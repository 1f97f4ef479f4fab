mod availability;
mod coordinator;
mod error;
mod lifecycle;
mod queries;
mod selector;
mod store;

pub use availability::{free_ranges, is_free, merge_overlapping, subtract_stays};
pub use error::EngineError;
pub use lifecycle::transition;
pub use store::{InventoryStore, SharedBooking, SharedRoomState};

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, RwLock};

use crate::limits::{DEFAULT_RETRY_BACKOFF_MS, DEFAULT_STORAGE_TIMEOUT_MS, WAL_CHANNEL_CAPACITY};
use crate::model::*;
use crate::observability;
use crate::wal::Wal;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task owning the WAL. Appends are batched: the first Append
/// blocks, every immediately available Append joins its batch, and one
/// flush+fsync commits them all before any sender hears back.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;

                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush what we have before handling it.
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break, // channel drained
                    }
                }

                flush_batch(&mut wal, batch);
                if let Some(cmd) = deferred {
                    handle_non_append(&mut wal, cmd);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_batch(wal: &mut Wal, batch: Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();

    let mut append_err: Option<io::Error> = None;
    for (event, _) in &batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even after an append error so partially buffered bytes don't
    // leak into the next batch (these callers are all told the batch failed).
    let flush_err = wal.flush_sync().err();
    let result = match append_err.or(flush_err) {
        Some(e) => Err(e),
        None => Ok(()),
    };

    metrics::histogram!(observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());

    for (_, tx) in batch {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

// ── Engine ───────────────────────────────────────────────

/// Knobs for the storage interaction bounds.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Upper bound on a single WAL append (queue wait plus fsync).
    pub storage_timeout: Duration,
    /// Pause before the single internal retry of a failed append.
    pub retry_backoff: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            storage_timeout: Duration::from_millis(DEFAULT_STORAGE_TIMEOUT_MS),
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

/// The availability and assignment engine: in-memory inventory tables,
/// durable event log, and the booking operations on top of them.
pub struct Engine {
    pub store: InventoryStore,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    options: EngineOptions,
    /// Every mutation holds this in read mode; compaction takes it in write
    /// mode, so a snapshot never interleaves with an in-flight operation.
    /// Always acquired before any record lock.
    pub(super) compaction_gate: RwLock<()>,
}

impl Engine {
    /// Open the engine over the WAL at `wal_path`, replaying any existing
    /// events into a fresh store.
    pub fn open(wal_path: PathBuf, options: EngineOptions) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(WAL_CHANNEL_CAPACITY);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let store = InventoryStore::new();
        for event in &events {
            replay_apply(&store, event);
        }
        tracing::debug!(events = events.len(), "WAL replay complete");

        Ok(Self {
            store,
            wal_tx,
            options,
            compaction_gate: RwLock::new(()),
        })
    }

    /// Durably record one event, bounded by the storage timeout and retried
    /// once with backoff. Only after this returns Ok may in-memory state
    /// change.
    pub(super) async fn persist(&self, event: &Event) -> Result<(), EngineError> {
        match self.try_append(event).await {
            Ok(()) => Ok(()),
            Err(first) => {
                metrics::counter!(observability::WAL_RETRIES_TOTAL).increment(1);
                tracing::warn!("WAL append failed, retrying once: {first}");
                tokio::time::sleep(self.options.retry_backoff).await;
                self.try_append(event).await
            }
        }
    }

    async fn try_append(&self, event: &Event) -> Result<(), EngineError> {
        let append = async {
            let (tx, rx) = oneshot::channel();
            self.wal_tx
                .send(WalCommand::Append {
                    event: event.clone(),
                    response: tx,
                })
                .await
                .map_err(|_| EngineError::Storage("WAL writer shut down".into()))?;
            rx.await
                .map_err(|_| EngineError::Storage("WAL writer dropped response".into()))?
                .map_err(|e| EngineError::Storage(e.to_string()))
        };
        match tokio::time::timeout(self.options.storage_timeout, append).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Storage("WAL append timed out".into())),
        }
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

/// Apply one replayed event to the store. We own every Arc here, so
/// `try_write` always succeeds; never block inside replay. A retried append
/// that was in fact durable can leave duplicate events in the log, so
/// creations of an already-known id are skipped.
fn replay_apply(store: &InventoryStore, event: &Event) {
    match event {
        Event::RoomTypeCreated { id, name, base_price, max_occupancy } => {
            if !store.contains_room_type(id) {
                store.insert_room_type(RoomType {
                    id: *id,
                    name: name.clone(),
                    base_price: *base_price,
                    max_occupancy: *max_occupancy,
                });
            }
        }
        Event::RoomCreated { id, number, room_type_id, status } => {
            if !store.contains_room(id) {
                store.insert_room(RoomState::new(*id, *number, *room_type_id, *status));
            }
        }
        Event::RoomStatusChanged { id, status } => {
            if let Some(room) = store.room(id) {
                let mut guard = room.try_write().expect("replay: uncontended write");
                guard.status = *status;
            }
        }
        Event::UserCreated { id, email, full_name, phone } => {
            if !store.contains_user(id) {
                store.insert_user(User {
                    id: *id,
                    email: email.clone(),
                    full_name: full_name.clone(),
                    phone: phone.clone(),
                });
            }
        }
        Event::BookingCreated { id, user_id, room_type_id, stay, total } => {
            if !store.contains_booking(id) {
                store.insert_booking(Booking {
                    id: *id,
                    user_id: *user_id,
                    room_type_id: *room_type_id,
                    stay: *stay,
                    total: *total,
                    status: BookingStatus::Pending,
                });
            }
        }
        Event::BookingConfirmed { booking_id, assignment_id, room_id, stay, created_at } => {
            if store.contains_assignment(assignment_id) {
                return; // duplicate from a retried append
            }
            if let Some(booking) = store.booking(booking_id) {
                booking.try_write().expect("replay: uncontended write").status =
                    BookingStatus::Confirmed;
            }
            if let Some(room) = store.room(room_id) {
                room.try_write()
                    .expect("replay: uncontended write")
                    .insert_assignment(Assignment {
                        id: *assignment_id,
                        booking_id: *booking_id,
                        stay: *stay,
                        created_at: *created_at,
                        cancelled: false,
                    });
                store.record_assignment(*assignment_id, *booking_id, *room_id);
            }
        }
        Event::BookingCancelled { booking_id } => {
            if let Some(booking) = store.booking(booking_id) {
                booking.try_write().expect("replay: uncontended write").status =
                    BookingStatus::Cancelled;
            }
            for (assignment_id, room_id) in store.assignments_of_booking(booking_id) {
                if let Some(room) = store.room(&room_id) {
                    let mut guard = room.try_write().expect("replay: uncontended write");
                    if let Some(a) = guard.assignment_mut(assignment_id) {
                        a.cancelled = true;
                    }
                }
            }
        }
        Event::BookingCheckedIn { booking_id } => {
            if let Some(booking) = store.booking(booking_id) {
                booking.try_write().expect("replay: uncontended write").status =
                    BookingStatus::CheckedIn;
            }
        }
        Event::BookingCompleted { booking_id } => {
            if let Some(booking) = store.booking(booking_id) {
                booking.try_write().expect("replay: uncontended write").status =
                    BookingStatus::Completed;
            }
        }
    }
}
