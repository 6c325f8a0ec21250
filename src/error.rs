//! Error types, one family per entity
//!
//! Every rejected mutation leaves its target untouched and returns one of
//! these. The festival error wraps the others so callers of the aggregate
//! only need to match on a single type.

use thiserror::Error;

/// A raw value failed validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("{field} must not be blank")]
    Blank { field: &'static str },

    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be strictly positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArtistError {
    #[error("invalid artist: {0}")]
    Invalid(#[from] ValueError),

    #[error("artist already performs in slot {0}")]
    SlotAlreadyListed(String),

    #[error("artist does not perform in slot {0}")]
    SlotNotListed(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlotError {
    #[error("invalid slot: {0}")]
    Invalid(#[from] ValueError),

    /// Carries the ids of every scheduled slot the new one overlaps
    #[error("slot {slot} collides with {conflicts:?} on scene {scene}")]
    Collision {
        slot: String,
        scene: String,
        conflicts: Vec<String>,
    },

    #[error("slot {0} is already scheduled")]
    AlreadyScheduled(String),

    #[error("slot {0} is not scheduled")]
    NotScheduled(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TicketClassError {
    #[error("invalid ticket class: {0}")]
    Invalid(#[from] ValueError),

    #[error("a ticket class named {0} already exists")]
    Duplicate(String),

    #[error("no ticket class named {0}")]
    NotFound(String),

    #[error("ticket class {0} holds benefits; raise its quantity through the festival")]
    Linked(String),

    #[error("selling {quantity} {type_name} tickets needs {load} units of {stock}, only {capacity} available")]
    CapacityExceeded {
        type_name: String,
        quantity: u32,
        stock: String,
        load: f64,
        capacity: u32,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StockError {
    #[error("invalid stock: {0}")]
    Invalid(#[from] ValueError),

    #[error("stock {0} is fixed; unfix it before changing its quantity")]
    Fixed(String),

    #[error("a stock named {0} already exists")]
    Duplicate(String),

    #[error("no stock named {0}")]
    NotFound(String),

    #[error("benefits draw on stock {0}; fix it through the festival")]
    Linked(String),

    #[error("stock {stock} would need {load} units but holds {capacity}")]
    CapacityExceeded {
        stock: String,
        load: f64,
        capacity: u32,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BenefitError {
    #[error("invalid benefit: {0}")]
    Invalid(#[from] ValueError),

    #[error("benefit needs {required} units of fixed stock {stock}, which holds {capacity}")]
    CapacityExceeded {
        stock: String,
        required: f64,
        capacity: u32,
    },

    #[error("ticket class {ticket_class} already has a benefit on stock {stock}")]
    AlreadyConnected { ticket_class: String, stock: String },

    #[error("benefit between {ticket_class} and {stock} is not connected")]
    NotFound { ticket_class: String, stock: String },

    #[error("benefit links {expected}, not {found}")]
    WrongEndpoint { expected: String, found: String },
}

#[derive(Error, Debug)]
pub enum FestivalError {
    #[error("invalid festival: {0}")]
    Invalid(#[from] ValueError),

    #[error("festival start {0} is in the past")]
    StartInPast(chrono::DateTime<chrono::Utc>),

    #[error(transparent)]
    Artist(#[from] ArtistError),

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    TicketClass(#[from] TicketClassError),

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Benefit(#[from] BenefitError),

    #[error(transparent)]
    Optimization(#[from] OptimizationError),

    #[error("no artist named {0}")]
    ArtistNotFound(String),

    #[error("artist {0} is already part of the festival")]
    DuplicateArtist(String),

    #[error("{entity} is linked to {counterpart}, which is not attached to this festival")]
    DetachedLink { entity: String, counterpart: String },

    #[error("festival is inconsistent: {0}")]
    Integrity(String),

    #[error("festival has no backing file; use save_as first")]
    NoFile,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizationError {
    #[error("no ticket quantities satisfy the stock and area constraints")]
    Infeasible,

    #[error("solver failed: {0}")]
    Solver(String),

    #[error("solver returned no value for ticket class {0}")]
    MissingValue(String),

    #[error("solver returned {value} for ticket class {ticket_class}, not a non-negative integer")]
    InvalidValue { ticket_class: String, value: f64 },

    #[error("proposed plan needs {load} units of stock {stock}, which holds {capacity}")]
    CapacityExceeded {
        stock: String,
        load: f64,
        capacity: u32,
    },

    #[error("proposed plan needs {required} m2, festival area is {available} m2")]
    AreaExceeded { required: f64, available: f64 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] ValueError),
}
