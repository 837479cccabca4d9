//! async-openai client construction shared by the OpenAI-compatible providers.

use crate::error::{Result, ToolgateError};
use async_openai::{config::Config, Client};
use std::time::Duration;

/// Create an async-openai client for any compatible backend with a request timeout.
pub fn create_client<C: Config>(config: C, timeout: Duration) -> Result<Client<C>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ToolgateError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(config).with_http_client(http_client))
}
