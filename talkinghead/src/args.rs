use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Talking-head video generation service
#[derive(Debug, Parser)]
#[command(name = "talkinghead", about = "Generate talking-head videos from a face image and an audio clip")]
pub struct Args {
    /// Path to configuration file; built-in defaults apply when it is missing
    #[arg(short, long, default_value = "talkinghead.toml", env = "TALKINGHEAD_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "TALKINGHEAD_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Override the directory sessions and published videos are written to
    #[arg(long, env = "TALKINGHEAD_RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,
}
