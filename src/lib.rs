pub mod capture;
pub mod command;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod registry;
pub mod resource;
pub mod scpi;
pub mod transport;

// Re-export the primary types so callers can drive the console without
// knowing the internal module layout.
pub use command::{Command, Line, Outcome, Plan};
pub use config::Config;
pub use console::{Console, Input, Step};
pub use dispatch::Context;
pub use error::{Error, Result};
pub use history::History;
pub use registry::DeviceRegistry;
pub use resource::{Interface, ResourceAddress};
pub use transport::{BusEvent, MockTransport, Session, Transport, VisaBus};
