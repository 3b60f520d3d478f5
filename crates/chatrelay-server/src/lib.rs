pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod relay;
pub mod rooms;
pub mod server;
pub mod session;
pub mod state;
pub mod transport;

pub use cli::Cli;
pub use config::RelayConfig;
pub use coordinator::Coordinator;
pub use error::{ChatError, ChatResult};
pub use models::*;
pub use relay::EventRelay;
pub use rooms::*;
pub use server::{build_app, run_server};
pub use session::{Session, SessionState};
pub use state::*;
pub use transport::{ConnectionId, Hub};
