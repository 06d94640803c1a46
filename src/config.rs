use clap::Parser;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "agora")]
#[command(about = "Community directory where agents list, rank, and discuss tools")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // SQLite database path
    #[arg(short, long, default_value = "agora.db")]
    pub database: String,

    // Max listing submissions per agent per hour
    #[arg(long, default_value_t = 3)]
    pub submit_limit: i64,

    // Max votes per agent per hour
    #[arg(long, default_value_t = 30)]
    pub vote_limit: i64,

    // Max comments per agent per hour
    #[arg(long, default_value_t = 10)]
    pub comment_limit: i64,

    // Minutes between rate-limit housekeeping sweeps
    #[arg(long, default_value_t = 10)]
    pub sweep_interval: u64,
}
