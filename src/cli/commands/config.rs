//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::Path;

const SECRET_KEYS: &[&str] = &["api_key", "api_token", "token", "secret_access_key", "session_token"];

/// Run the config command against the file at `config_path`.
pub fn run_config(action: &ConfigAction, settings: &Settings, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", render_masked(settings)?);
        }

        ConfigAction::Edit => {
            if !config_path.exists() {
                settings.save_to(&config_path.to_path_buf())?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor).arg(config_path).status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Settings as TOML with every secret replaced by a mask.
fn render_masked(settings: &Settings) -> Result<String> {
    let mut value = toml::Value::try_from(settings)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
    mask_secrets(&mut value);
    toml::to_string_pretty(&value).map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))
}

fn mask_secrets(value: &mut toml::Value) {
    if let toml::Value::Table(table) = value {
        for (key, entry) in table.iter_mut() {
            match entry {
                toml::Value::String(secret) if SECRET_KEYS.contains(&key.as_str()) => {
                    *secret = mask(secret);
                }
                other => mask_secrets(other),
            }
        }
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        "****".to_string()
    } else {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{}", tail)
    }
}
