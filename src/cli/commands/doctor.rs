//! Doctor command - verify configuration and integration credentials.

use crate::cli::Output;
use crate::config::Settings;
use crate::integrations::{IntegrationType, Integrations};
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Toolgate Doctor");
    println!();
    println!("Checking configuration and integrations...\n");

    let mut checks = Vec::new();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    println!("{}", style("Directories").bold());
    let dir_checks = check_directories(settings);
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    println!("{}", style("Integrations").bold());
    let integration_checks = check_integrations(settings);
    for check in &integration_checks {
        check.print();
    }
    checks.extend(integration_checks);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Toolgate.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s). Tools of unconfigured integrations will report what is missing.",
            warnings
        ));
    } else {
        Output::success("All checks passed! Toolgate is ready to use.");
    }

    Ok(())
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: toolgate config edit",
        )
    }
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    [("Data directory", settings.data_dir()), ("Temp directory", settings.temp_dir())]
        .into_iter()
        .map(|(name, dir)| {
            if dir.is_dir() {
                CheckResult::ok(name, &format!("{}", dir.display()))
            } else {
                CheckResult::warning(
                    name,
                    &format!("{} (will be created)", dir.display()),
                    "Directory will be created on first use",
                )
            }
        })
        .collect()
}

fn check_integrations(settings: &Settings) -> Vec<CheckResult> {
    let integrations = match Integrations::from_settings(settings) {
        Ok(integrations) => integrations,
        Err(e) => {
            return vec![CheckResult::error(
                "Clients",
                &format!("failed to initialize: {}", e),
                "Check the [general] and [openai] sections of the config",
            )]
        }
    };

    integrations
        .status()
        .into_iter()
        .map(|(integration, missing)| {
            let name = integration.as_str();
            if !settings.mcp.integrations.contains(&integration) {
                return CheckResult::ok(name, "disabled");
            }
            match missing {
                None => CheckResult::ok(name, "configured"),
                Some(detail) => CheckResult::warning(name, &detail, env_hint(integration)),
            }
        })
        .collect()
}

/// Where the credentials of an integration come from.
fn env_hint(integration: IntegrationType) -> &'static str {
    match integration {
        IntegrationType::OpenAi => "Set OPEN_AI_API_KEY or [openai] api_key",
        IntegrationType::Ollama => "Set OLLAMA_BASE_PATH or [ollama] base_url",
        IntegrationType::Gemini => "Set GEMINI_API_KEY or [gemini] api_key",
        IntegrationType::Dial => "Set DIAL_AI_API_KEY and DIAL_AI_BATH_PATH or the [dial] section",
        IntegrationType::Bedrock => "Set BEDROCK_BEARER_TOKEN (or BEDROCK_ACCESS_KEY_ID and BEDROCK_SECRET_ACCESS_KEY) and BEDROCK_REGION",
        IntegrationType::Jira => "Set JIRA_BASE_PATH, JIRA_EMAIL and JIRA_API_TOKEN or the [jira] section",
        IntegrationType::Confluence => {
            "Set CONFLUENCE_BASE_PATH, CONFLUENCE_EMAIL and CONFLUENCE_API_TOKEN or the [confluence] section"
        }
        IntegrationType::Gitlab => "Set GITLAB_TOKEN (and GITLAB_BASE_PATH) or the [gitlab] section",
    }
}
