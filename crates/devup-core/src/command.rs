use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Placeholder expanded to the absolute project root in programs, args, env
/// values and working directories.
pub const ROOT_PLACEHOLDER: &str = "{root}";

/// An external command as written in `devup.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Added to the inherited environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Working directory relative to the project root.
    #[serde(default)]
    pub cwd: Option<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn program_for(&self, root: &Path) -> String {
        expand(&self.program, root)
    }

    pub fn working_dir(&self, root: &Path) -> PathBuf {
        match &self.cwd {
            Some(dir) => root.join(expand(dir, root)),
            None => root.to_path_buf(),
        }
    }

    /// Build a ready-to-spawn [`Command`]. Stdio is inherited.
    pub fn to_command(&self, root: &Path) -> Command {
        let mut cmd = Command::new(self.program_for(root));
        cmd.args(self.args.iter().map(|arg| expand(arg, root)))
            .envs(self.env.iter().map(|(k, v)| (k, expand(v, root))))
            .current_dir(self.working_dir(root));
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

fn expand(value: &str, root: &Path) -> String {
    value.replace(ROOT_PLACEHOLDER, &root.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let spec = CommandSpec::new("npm", ["run", "dev"]);
        assert_eq!(spec.to_string(), "npm run dev");
    }

    #[test]
    fn display_quotes_args_with_spaces() {
        let spec = CommandSpec::new("sh", ["-c", "echo hi"]);
        assert_eq!(spec.to_string(), "sh -c \"echo hi\"");
    }

    #[test]
    fn root_placeholder_expands_everywhere() {
        let root = Path::new("/srv/app");
        let spec = CommandSpec::new("{root}/venv/bin/python", ["{root}/main.py"])
            .with_env("PYTHONPATH", "{root}")
            .with_cwd("web");

        assert_eq!(spec.program_for(root), "/srv/app/venv/bin/python");
        assert_eq!(spec.working_dir(root), PathBuf::from("/srv/app/web"));

        let cmd = spec.to_command(root);
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["/srv/app/main.py"]);
        let envs: Vec<_> = cmd.get_envs().collect();
        assert_eq!(
            envs,
            vec![(
                std::ffi::OsStr::new("PYTHONPATH"),
                Some(std::ffi::OsStr::new("/srv/app"))
            )]
        );
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/srv/app/web")));
    }

    #[test]
    fn working_dir_defaults_to_root() {
        let spec = CommandSpec::new("npm", ["install"]);
        assert_eq!(spec.working_dir(Path::new("/p")), PathBuf::from("/p"));
    }
}
