pub mod connection;
mod session;

pub use connection::{ConnectionId, ConnectionPhase};
pub use session::{ActiveConnection, AuthOutcome, ClientSnapshot, ListenAddress, Session};
