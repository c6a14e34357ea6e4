pub mod completion;
pub mod storage_event;
pub mod transport_event;

// Re-export commonly used types
pub use completion::{Callback, Event, Gate, Outcome};
pub use storage_event::StorageEvent;
pub use transport_event::TransportRequestEvent;
