pub mod retry;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::models::common::Config;

pub fn load_config<P: AsRef<Path>>(file_name: P) -> Result<Config> {
    let path = file_name.as_ref();
    info!("Config path: {}", path.display());

    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .context("failed to read config file")?;

    settings
        .try_deserialize()
        .context("failed to parse config")
}
