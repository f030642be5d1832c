use clap::Parser;
use std::path::{Path, PathBuf};

/// Watch a namespace for failing pods and send deduplicated alerts.
#[derive(Debug, Parser)]
#[command(name = "crashwatch", version, about)]
pub struct Args {
    /// Path of the JSON config file
    #[arg(short = 'c', long = "config", default_value = "./config.json")]
    pub config: PathBuf,

    /// Use only environment variables, ignore the config file
    #[arg(short = 'e', long = "env-only", default_value_t = false)]
    pub env_only: bool,
}

impl Args {
    pub fn config_path(&self) -> Option<&Path> {
        if self.env_only {
            None
        } else {
            Some(self.config.as_path())
        }
    }
}
