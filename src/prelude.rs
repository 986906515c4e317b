pub use std::io::Write;

pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};
pub use tokio::sync::broadcast;

pub use crate::channels::Channels;
pub use crate::config::Config;
pub use crate::error::Error;
pub use crate::options::Options;
