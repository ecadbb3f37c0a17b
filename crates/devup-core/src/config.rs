use crate::command::CommandSpec;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "devup.toml";

/// Uncommitted per-developer overrides, deep-merged over [`CONFIG_FILE`].
pub const LOCAL_CONFIG_FILE: &str = "devup.local.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub prerequisites: PrerequisitesConfig,
    #[serde(default = "default_install_steps")]
    pub install: Vec<InstallStep>,
    #[serde(default = "default_api_server")]
    pub api: ServerSpec,
    #[serde(default = "default_frontend_server")]
    pub frontend: ServerSpec,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_project_name")]
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrerequisitesConfig {
    /// Dependency manifests that must exist in the project root.
    #[serde(default = "default_prerequisite_files")]
    pub files: Vec<String>,
}

impl Default for PrerequisitesConfig {
    fn default() -> Self {
        Self {
            files: default_prerequisite_files(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallStep {
    /// Human-readable label, e.g. "Node.js dependencies".
    pub name: String,
    #[serde(flatten)]
    pub command: CommandSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSpec {
    pub name: String,
    #[serde(default)]
    pub port: Option<u16>,
    /// URLs printed once every server is up.
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub command: CommandSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Pause between starting the API server and the frontend.
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Grace period after SIGTERM before a child is killed outright.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: default_startup_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl SupervisorConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn default_project_name() -> String {
    std::env::current_dir()
        .ok()
        .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "project".to_string())
}

fn default_prerequisite_files() -> Vec<String> {
    vec!["package.json".to_string(), "requirements.txt".to_string()]
}

fn python_program() -> String {
    if cfg!(windows) {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}

fn default_install_steps() -> Vec<InstallStep> {
    vec![
        InstallStep {
            name: "Python dependencies".to_string(),
            command: CommandSpec::new(
                python_program(),
                ["-m", "pip", "install", "-r", "requirements.txt"],
            ),
        },
        InstallStep {
            name: "Node.js dependencies".to_string(),
            command: CommandSpec::new("npm", ["install"]),
        },
    ]
}

fn default_api_server() -> ServerSpec {
    ServerSpec {
        name: "Python FastAPI server".to_string(),
        port: Some(8000),
        links: vec![
            Link {
                label: "Python API".to_string(),
                url: "http://localhost:8000".to_string(),
            },
            Link {
                label: "API docs".to_string(),
                url: "http://localhost:8000/docs".to_string(),
            },
        ],
        command: CommandSpec::new(
            python_program(),
            [
                "-m",
                "uvicorn",
                "api.main:app",
                "--host",
                "0.0.0.0",
                "--port",
                "8000",
                "--reload",
            ],
        )
        .with_env("PYTHONPATH", "{root}"),
    }
}

fn default_frontend_server() -> ServerSpec {
    ServerSpec {
        name: "Next.js development server".to_string(),
        port: Some(3000),
        links: vec![Link {
            label: "Next.js frontend".to_string(),
            url: "http://localhost:3000".to_string(),
        }],
        command: CommandSpec::new("npm", ["run", "dev"]),
    }
}

fn default_startup_delay_ms() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_shutdown_timeout_ms() -> u64 {
    10_000
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            prerequisites: PrerequisitesConfig::default(),
            install: default_install_steps(),
            api: default_api_server(),
            frontend: default_frontend_server(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

/// Deep-merge two TOML values. The `override_val` takes precedence over `base`.
/// Tables are merged recursively; arrays and scalars are replaced.
fn deep_merge(base: toml::Value, override_val: toml::Value) -> toml::Value {
    match (base, override_val) {
        (toml::Value::Table(mut base_table), toml::Value::Table(override_table)) => {
            for (key, override_v) in override_table {
                let merged = if let Some(base_v) = base_table.remove(&key) {
                    deep_merge(base_v, override_v)
                } else {
                    override_v
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_base, override_val) => override_val,
    }
}

fn read_toml(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))
}

impl DevConfig {
    /// Load `devup.toml` from `dir`, falling back to built-in defaults when it
    /// does not exist. `devup.local.toml` is layered on top either way.
    pub fn load(dir: &Path) -> Result<Self> {
        let base_path = dir.join(CONFIG_FILE);
        let base = if base_path.exists() {
            read_toml(&base_path)?
        } else {
            tracing::debug!(dir = %dir.display(), "no {} found, using defaults", CONFIG_FILE);
            toml::Value::Table(toml::Table::new())
        };
        Self::with_local_overrides(base, dir)
    }

    /// Load an explicitly named config file. Unlike [`DevConfig::load`], the
    /// file must exist.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Config file {} not found", path.display());
        }
        let base = read_toml(path)?;
        Self::with_local_overrides(base, &project_root_of(path))
    }

    fn with_local_overrides(base: toml::Value, dir: &Path) -> Result<Self> {
        let local_path = dir.join(LOCAL_CONFIG_FILE);
        let merged = if local_path.exists() {
            tracing::debug!(path = %local_path.display(), "applying local overrides");
            deep_merge(base, read_toml(&local_path)?)
        } else {
            base
        };
        let config = merged
            .try_into::<DevConfig>()
            .with_context(|| format!("Invalid config in {}", dir.display()))?;
        Ok(config)
    }

    /// Resolve the config and the project root it belongs to. With no
    /// explicit path the current directory is the project root.
    pub fn locate(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        match explicit {
            Some(path) => Ok((Self::load_file(path)?, project_root_of(path))),
            None => {
                let root = PathBuf::from(".");
                Ok((Self::load(&root)?, root))
            }
        }
    }

    /// The servers in launch order.
    pub fn servers(&self) -> [&ServerSpec; 2] {
        [&self.api, &self.frontend]
    }

    pub fn validate(&self) -> Result<()> {
        for step in &self.install {
            if step.command.program.trim().is_empty() {
                bail!("Install step '{}' has an empty program", step.name);
            }
        }
        for server in self.servers() {
            if server.command.program.trim().is_empty() {
                bail!("Server '{}' has an empty program", server.name);
            }
        }
        if self.supervisor.poll_interval_ms == 0 {
            bail!("supervisor.poll_interval_ms must be greater than zero");
        }
        Ok(())
    }
}

fn project_root_of(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
