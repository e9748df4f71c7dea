//! Init command implementation
//!
//! Writes a starter `deepdive.toml`, `.env.example` and `reports/` directory.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    Success,
    /// deepdive.toml already exists and `--force` was not given
    AlreadyExists,
    Error(String),
}

/// Configuration for the init command
#[derive(Debug, Clone)]
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    pub host: String,
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing deepdive");

    let base_path = &config.path;
    let config_path = base_path.join("deepdive.toml");
    if config_path.exists() && !config.force {
        output.warning("deepdive.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let reports_dir = base_path.join("reports");
    if let Err(e) = fs::create_dir_all(&reports_dir) {
        output.error(&format!("Failed to create reports/: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("directory", "reports");

    let files = [
        ("config", "deepdive.toml", generate_config_toml(&config)),
        ("env", ".env.example", generate_env_example()),
    ];
    for (kind, name, content) in files {
        match write_file(&base_path.join(name), &content, config.force) {
            Ok(true) => output.created(kind, name),
            Ok(false) => output.skipped(name, "already exists"),
            Err(e) => {
                output.error(&format!("Failed to create {}: {}", name, e));
                return InitResult::Error(e.to_string());
            }
        }
    }

    let gitignore_path = base_path.join(".gitignore");
    if !gitignore_path.exists() {
        match write_file(&gitignore_path, "/target\n.env\nreports/\n", false) {
            Ok(_) => output.created("file", ".gitignore"),
            Err(e) => output.warning(&format!("Failed to create .gitignore: {}", e)),
        }
    }

    output.complete("deepdive initialized successfully!");

    output.header("Next Steps");
    output.newline();
    output.info("1. Set the provider keys:");
    output.command("cp .env.example .env");
    output.command("# Edit .env and set GEMINI_API_KEY and TAVILY_API_KEY");
    output.newline();
    output.info("2. Run a one-off report or start the server:");
    output.command("deepdive run \"latest advances in AI agents\"");
    output.command("deepdive serve");

    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));

    InitResult::Success
}

/// Write `content` unless the file exists and `force` is off.
/// Returns whether the file was written.
fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}

fn generate_config_toml(config: &InitConfig) -> String {
    format!(
        r#"# deepdive configuration
# Provider keys are read from the environment variables named below.

[server]
host = "{host}"
port = {port}
log_level = "info"
# "pretty" or "json"
log_format = "pretty"
max_retained_runs = 64

[llm]
# "gemini" (OpenAI-compatible endpoint) or "openai"
provider = "gemini"
api_key_env = "GEMINI_API_KEY"
model = "gemini-2.5-flash"
temperature = 0.4
# Seconds to wait for each model reply; 0 waits indefinitely
timeout_secs = 120

[search]
api_key_env = "TAVILY_API_KEY"
base_url = "https://api.tavily.com"
max_results = 5
search_depth = "basic"
timeout_secs = 30

[report]
max_workers = 2
# 0 waits indefinitely
section_timeout_secs = 120
event_log_capacity = 1024
"#,
        host = config.host,
        port = config.port
    )
}

fn generate_env_example() -> String {
    r#"# deepdive environment variables
# Copy this file to .env and fill in the values.

# REQUIRED: language model provider key
GEMINI_API_KEY=your-gemini-key

# REQUIRED: web search provider key
TAVILY_API_KEY=tvly-your-key

# Optional: Logging filter (overrides server.log_level)
RUST_LOG=info,deepdive=debug

# Optional: server bind overrides
# DEEPDIVE_HOST=0.0.0.0
# DEEPDIVE_PORT=8080
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::DeepdiveConfig;
    use tempfile::TempDir;

    fn init_config(temp_dir: &TempDir, force: bool) -> InitConfig {
        InitConfig {
            path: temp_dir.path().to_path_buf(),
            force,
            host: "127.0.0.1".to_string(),
            port: 4000,
        }
    }

    #[test]
    fn test_generated_config_parses() {
        let temp_dir = TempDir::new().unwrap();
        let toml = generate_config_toml(&init_config(&temp_dir, false));

        let config = DeepdiveConfig::parse(&toml).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.report.max_workers, 2);
        assert_eq!(config.llm.api_key_env(), "GEMINI_API_KEY");
        assert_eq!(config.llm.timeout_secs, 120);
    }

    #[test]
    fn test_generate_env_example() {
        let env = generate_env_example();
        assert!(env.contains("GEMINI_API_KEY="));
        assert!(env.contains("TAVILY_API_KEY="));
    }

    #[test]
    fn test_write_file_skips_existing_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file.txt");
        fs::write(&path, "original").unwrap();

        assert!(!write_file(&path, "new", false).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");

        assert!(write_file(&path, "new", true).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_run_creates_all_files() {
        let temp_dir = TempDir::new().unwrap();
        let result = run(init_config(&temp_dir, false), &Output::no_color());

        assert!(matches!(result, InitResult::Success));
        assert!(temp_dir.path().join("deepdive.toml").exists());
        assert!(temp_dir.path().join(".env.example").exists());
        assert!(temp_dir.path().join(".gitignore").exists());
        assert!(temp_dir.path().join("reports").is_dir());
    }

    #[test]
    fn test_run_already_exists_without_force() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("deepdive.toml"), "# mine").unwrap();

        let result = run(init_config(&temp_dir, false), &Output::no_color());
        assert!(matches!(result, InitResult::AlreadyExists));
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("deepdive.toml")).unwrap(),
            "# mine"
        );

        let result = run(init_config(&temp_dir, true), &Output::no_color());
        assert!(matches!(result, InitResult::Success));
        assert!(fs::read_to_string(temp_dir.path().join("deepdive.toml"))
            .unwrap()
            .contains("[report]"));
    }
}
