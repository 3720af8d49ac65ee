mod certificate;
mod config;
mod log;

pub use certificate::*;
pub use config::*;
pub use log::*;
