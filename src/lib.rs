// Festival Planner - Core Library
// Exposes the festival domain for the CLI and for tests

pub mod config;
pub mod entities;
pub mod error;
pub mod festival;
pub mod optimizer;
pub mod persistence;
pub mod report;
pub mod schedule;
pub mod solver;
pub mod values;

// Re-export commonly used types
pub use config::{AreaCharging, PlannerConfig, AVERAGE_AREA_PER_PERSON};
pub use entities::{Artist, Benefit, Slot, Stock, TicketClass};
pub use error::{
    ArtistError, BenefitError, ConfigError, FestivalError, OptimizationError, SlotError,
    StockError, TicketClassError, ValueError,
};
pub use festival::{Festival, ProgramEntry};
pub use optimizer::{ModelBuilder, OptimizationOutcome, Optimizer, PlannedQuantity};
pub use report::{write_ticket_plan_csv, FinancialReport};
pub use schedule::Schedule;
pub use solver::{LinearProgram, LpConstraint, LpSolution, LpSolver, LpStatus, LpVariable, MicroLpSolver};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
