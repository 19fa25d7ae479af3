//! Init command implementation
//!
//! Scaffolds a working directory with `ares.toml`, `.env.example` and a
//! knowledge-base directory containing one sample document.

use super::output::Output;
use crate::utils::toml_config::DEFAULT_CONFIG_TEMPLATE;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug, PartialEq, Eq)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// Project already exists (ares.toml found)
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

const SAMPLE_DOCUMENT: &str = "# About this knowledge base\n\n\
Drop .md or .txt files into this directory. Each paragraph is indexed \
separately and the best matching paragraphs are handed to the answer stage \
as context.\n\n\
Restart the server after adding documents; the index is built at startup.\n";

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.header(&format!("Initializing ares-research v{}", env!("CARGO_PKG_VERSION")));

    let base_path = &config.path;
    let config_path = base_path.join("ares.toml");
    if config_path.exists() && !config.force {
        output.warning("ares.toml already exists!");
        output.info("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let knowledge_dir = base_path.join("data").join("knowledge");
    if let Err(e) = fs::create_dir_all(&knowledge_dir) {
        output.error(&format!("Failed to create data/knowledge: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("directory", "data/knowledge");

    let files = [
        (config_path, generate_config(&config), "config", "ares.toml"),
        (
            base_path.join(".env.example"),
            generate_env_example(),
            "env",
            ".env.example",
        ),
        (
            knowledge_dir.join("README.md"),
            SAMPLE_DOCUMENT.to_string(),
            "document",
            "data/knowledge/README.md",
        ),
    ];

    for (path, content, kind, display) in &files {
        match write_file(path, content, config.force) {
            Ok(true) => output.created(kind, display),
            Ok(false) => output.skipped(display, "already exists"),
            Err(e) => {
                output.error(&format!("Failed to create {}: {}", display, e));
                return InitResult::Error(e.to_string());
            }
        }
    }

    output.success("ares-research initialized");

    output.header("Next Steps");
    output.newline();
    output.info("1. Start Ollama (if not running):");
    output.command("ollama serve");
    output.command("ollama pull llama3.2");
    output.newline();
    output.info("2. Start the server:");
    output.command("ares-research");
    output.newline();
    output.info("3. Or try a single request:");
    output.command("ares-research ask \"What is 2+2, and what's new in Rust?\"");

    output.newline();
    output.info(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));

    InitResult::Success
}

/// Write `content` unless the file exists and `force` is off. Returns whether
/// the file was written.
fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}

fn generate_config(config: &InitConfig) -> String {
    DEFAULT_CONFIG_TEMPLATE
        .replacen("host = \"127.0.0.1\"", &format!("host = \"{}\"", config.host), 1)
        .replacen("port = 3000", &format!("port = {}", config.port), 1)
}

fn generate_env_example() -> String {
    r#"# ares-research environment
# Copy to .env and adjust.

# Log filter, overrides server.log_level
RUST_LOG=info,ares_research=debug

# Only needed when an [providers.*] entry has type = "openai"
# OPENAI_API_KEY=sk-...
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::AppConfig;
    use tempfile::TempDir;

    fn init_config(path: &Path, force: bool) -> InitConfig {
        InitConfig {
            path: path.to_path_buf(),
            force,
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }

    #[test]
    fn test_generated_config_parses() {
        let dir = TempDir::new().unwrap();
        let content = generate_config(&init_config(dir.path(), false));
        let config = AppConfig::from_toml_str(&content).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.research.decomposer_model, "decomposer");
    }

    #[test]
    fn test_write_file_respects_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");

        assert!(write_file(&path, "first", false).unwrap());
        assert!(!write_file(&path, "second", false).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");

        assert!(write_file(&path, "third", true).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "third");
    }

    #[test]
    fn test_run_creates_all_files() {
        let dir = TempDir::new().unwrap();
        let result = run(init_config(dir.path(), false), &Output::no_color());

        assert_eq!(result, InitResult::Success);
        assert!(dir.path().join("ares.toml").exists());
        assert!(dir.path().join(".env.example").exists());
        assert!(dir.path().join("data/knowledge/README.md").exists());
    }

    #[test]
    fn test_run_already_exists_without_force() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ares.toml"), "# mine").unwrap();

        let result = run(init_config(dir.path(), false), &Output::no_color());
        assert_eq!(result, InitResult::AlreadyExists);
        assert_eq!(
            fs::read_to_string(dir.path().join("ares.toml")).unwrap(),
            "# mine"
        );
    }

    #[test]
    fn test_run_force_overwrites() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ares.toml"), "# mine").unwrap();

        let result = run(init_config(dir.path(), true), &Output::no_color());
        assert_eq!(result, InitResult::Success);
        let content = fs::read_to_string(dir.path().join("ares.toml")).unwrap();
        assert!(content.contains("[research]"));
    }
}
