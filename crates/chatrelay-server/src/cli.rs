use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "chatrelay")]
#[command(
    author,
    version,
    about = "Chat room server that scales out over a shared store and event bus"
)]
pub struct Cli {
    /// Optional YAML configuration file
    #[arg(short, long, env = "CHATRELAY_CONFIG")]
    pub config: Option<String>,

    /// Listen address
    #[arg(short = 'H', long, env = "HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Redis URL shared by all instances (omit for single-instance mode)
    #[arg(short, long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Event bus channel name
    #[arg(long, env = "CHATRELAY_CHANNEL")]
    pub channel: Option<String>,

    /// Prefix for coordination store keys
    #[arg(long, env = "CHATRELAY_KEY_PREFIX")]
    pub key_prefix: Option<String>,

    /// History entries kept per room
    #[arg(long, env = "CHATRELAY_MAX_HISTORY")]
    pub max_history: Option<usize>,

    /// Events buffered per connection before a slow reader loses events
    #[arg(long, env = "CHATRELAY_OUTBOUND_BUFFER")]
    pub outbound_buffer: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}
