// Public modules
pub mod types;
pub mod config;
pub mod cli;
pub mod error;
pub mod extract;
pub mod timezone;
pub mod dedup;
pub mod kubernetes;
pub mod notify;
pub mod watcher;

// Re-export commonly used items
pub use types::*;
pub use config::{
    load_config, load_config_with_env, ConfigFile, EnvironmentProvider, MockEnvironment,
    SystemEnvironment,
};
pub use error::NotifyError;
pub use extract::extract_failure;
pub use timezone::{normalize, resolve_zone, DEFAULT_TIME_ZONE};
pub use dedup::{is_new, DEFAULT_QUIET_WINDOW_MINUTES};
pub use kubernetes::{KubePodEvents, PodEventSource, PodEventStream};
pub use notify::{AlertHandler, Notifier};
pub use watcher::{AlertPipeline, Outcome, Watcher};
