use dotenvy::dotenv;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::{env, fs};
use thiserror::Error;

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([a-zA-Z_][0-9a-zA-Z_]*)\}").expect("valid env var pattern");
}

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub async fn load_from_file<T: DeserializeOwned>(file_name: impl AsRef<Path>) -> Result<T, LoadConfigError> {
    dotenv().ok();
    let contents = tokio::fs::read_to_string(file_name).await?;
    load_from_str(&contents)
}

pub fn load_from_file_sync<T: DeserializeOwned>(file_name: impl AsRef<Path>) -> Result<T, LoadConfigError> {
    dotenv().ok();
    let contents = fs::read_to_string(file_name)?;
    load_from_str(&contents)
}

/// Expand `${VAR}` references from the environment and parse the TOML document.
pub fn load_from_str<T: DeserializeOwned>(raw_config: &str) -> Result<T, LoadConfigError> {
    let contents = expand_vars(raw_config);
    let config: T = toml::from_str(&contents)?;
    Ok(config)
}

/// Unset variables are left as `${VAR}` so that validation can name them.
fn expand_vars(raw_config: &str) -> String {
    ENV_VAR
        .replace_all(raw_config, |caps: &Captures| match env::var(&caps[1]) {
            Ok(val) => val,
            Err(_) => caps[0].to_string(),
        })
        .to_string()
}

pub fn has_unexpanded_var(value: &str) -> bool {
    ENV_VAR.is_match(value)
}
