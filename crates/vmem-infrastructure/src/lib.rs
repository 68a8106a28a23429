//! Infrastructure layer for vmem: configuration, logging, queue coupling,
//! media subprocess adapters, and the composition root.

pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod media;
pub mod queue;

pub use bootstrap::{bootstrap, AppContext};
pub use config::{load_config, AppConfig};
pub use logging::init_logging;
