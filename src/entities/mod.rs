// Entity Models
// "Identity persists, values change"
//
// Each entity has:
// - Stable identity (UUID) that NEVER changes
// - Validated values that can change through checked setters
// - Cross-references by id only (no owning pointers between entities)

pub mod artist;
pub mod benefit;
pub mod slot;
pub mod stock;
pub mod ticket_class;

pub use artist::Artist;
pub use benefit::Benefit;
pub use slot::Slot;
pub use stock::Stock;
pub use ticket_class::TicketClass;
