use thiserror::Error;

/// Errors that can arise while loading world data or executing interaction commands.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// Returned when an object id is not present in the world registry.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A command needed a parameter the authored content did not provide.
    #[error("command {code} is missing parameter {index}")]
    MissingParameter { code: i32, index: usize },

    /// A parameter that must be an integer could not be parsed.
    #[error("command {code} parameter {index} is not an integer: {value:?}")]
    MalformedParameter {
        code: i32,
        index: usize,
        value: String,
    },

    /// Counter objects never hold negative values.
    #[error("counter {object_id} cannot be set to {value}")]
    NegativeCounter { object_id: String, value: i32 },

    /// Incrementing a state would leave the `i32` range.
    #[error("state of {object_id} cannot advance past {value}")]
    StateOverflow { object_id: String, value: i32 },

    /// Loot table referenced by content but absent from the loaded tables.
    #[error("unknown loot table: {0}")]
    UnknownLootTable(String),

    /// Structural problem in the world data file (bad keys, duplicate states, etc.).
    #[error("invalid world data: {0}")]
    WorldData(String),

    /// Wrapper around IO errors (reading world data or loot tables).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON parse errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
