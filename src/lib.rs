//! SpeedShare — dynamic bandwidth arbiter for download clients

pub mod agents;
pub mod arbiter;
pub mod config;
pub mod error;
pub mod manager;
pub mod supervisor;
pub mod watchdir;

pub use agents::{AgentAdapter, AgentId};
pub use arbiter::{allocate, Allocation};
pub use config::Config;
pub use error::{Result, SpeedShareError};
pub use manager::{SpeedManager, TickOutcome};
pub use supervisor::{AgentConnectionState, ConnectionSupervisor};
