//! chatrelay Redis backends
//!
//! Redis implementations of the coordination seams so that several
//! stateless chatrelay instances can run behind one load balancer:
//! - `RedisStore`: room set, member-count hash and per-room history lists
//! - `RedisBus`: a single Pub/Sub channel carrying relay envelopes

mod backoff;
mod bus;
mod store;

pub use bus::RedisBus;
pub use store::RedisStore;

use chatrelay_core::Error;

/// Open a client, mapping a malformed URL to a configuration error.
/// The URL may carry credentials, so it never appears in the error.
pub fn open_client(url: &str) -> chatrelay_core::Result<redis::Client> {
    redis::Client::open(url).map_err(|e| Error::config(format!("invalid redis url: {e}")))
}

/// Server address of `client` for logs, without credentials
pub fn server_addr(client: &redis::Client) -> String {
    client.get_connection_info().addr.to_string()
}
