//! Process-wide interaction counters.
//! Read by the CLI `simulate` summary; cheap enough to bump on every command.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

static DATA_REQUESTS: AtomicU64 = AtomicU64::new(0);
static DENIED_REQUESTS: AtomicU64 = AtomicU64::new(0);
static UNCHECKED_REQUESTS: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_RETRIES: AtomicU64 = AtomicU64::new(0);
static COMMANDS_EXECUTED: AtomicU64 = AtomicU64::new(0);
static UNHANDLED_COMMANDS: AtomicU64 = AtomicU64::new(0);
static FAILED_COMMANDS: AtomicU64 = AtomicU64::new(0);
static GUARD_TRIPS: AtomicU64 = AtomicU64::new(0);

static LEVEL_COUNTERS: OnceLock<Mutex<HashMap<i32, LevelCounter>>> = OnceLock::new();

pub fn inc_data_requests() {
    DATA_REQUESTS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_denied_requests() {
    DENIED_REQUESTS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_unchecked_requests() {
    UNCHECKED_REQUESTS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_snapshot_retries() {
    SNAPSHOT_RETRIES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_commands_executed() {
    COMMANDS_EXECUTED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_unhandled_commands() {
    UNHANDLED_COMMANDS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_failed_commands() {
    FAILED_COMMANDS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_guard_trips() {
    GUARD_TRIPS.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LevelCounter {
    pub entries: u64,
    pub objects_spawned: u64,
}

fn level_counter_lock() -> &'static Mutex<HashMap<i32, LevelCounter>> {
    LEVEL_COUNTERS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Record a player entering `level_id` and the number of objects initialized for them.
pub fn record_level_entry(level_id: i32, objects: usize) -> LevelCounter {
    let mut guard = level_counter_lock()
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    let counter = guard.entry(level_id).or_default();
    counter.entries = counter.entries.saturating_add(1);
    counter.objects_spawned = counter.objects_spawned.saturating_add(objects as u64);
    *counter
}

pub fn level_counters_snapshot() -> HashMap<i32, LevelCounter> {
    level_counter_lock()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub data_requests: u64,
    pub denied_requests: u64,
    pub unchecked_requests: u64,
    pub snapshot_retries: u64,
    pub commands_executed: u64,
    pub unhandled_commands: u64,
    pub failed_commands: u64,
    pub guard_trips: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        data_requests: DATA_REQUESTS.load(Ordering::Relaxed),
        denied_requests: DENIED_REQUESTS.load(Ordering::Relaxed),
        unchecked_requests: UNCHECKED_REQUESTS.load(Ordering::Relaxed),
        snapshot_retries: SNAPSHOT_RETRIES.load(Ordering::Relaxed),
        commands_executed: COMMANDS_EXECUTED.load(Ordering::Relaxed),
        unhandled_commands: UNHANDLED_COMMANDS.load(Ordering::Relaxed),
        failed_commands: FAILED_COMMANDS.load(Ordering::Relaxed),
        guard_trips: GUARD_TRIPS.load(Ordering::Relaxed),
    }
}
