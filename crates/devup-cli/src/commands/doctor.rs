use anyhow::{bail, Result};
use colored::Colorize;
use devup_core::config::{DevConfig, CONFIG_FILE};
use devup_core::preflight;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

struct CheckResult {
    passed: bool,
    message: String,
}

impl CheckResult {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

fn check_config(config_path: Option<&Path>) -> (CheckResult, Option<(DevConfig, PathBuf)>) {
    let source = match config_path {
        Some(path) => path.display().to_string(),
        None if Path::new(CONFIG_FILE).exists() => CONFIG_FILE.to_string(),
        None => "built-in defaults".to_string(),
    };

    match DevConfig::locate(config_path) {
        Ok((config, root)) => match config.validate() {
            Ok(()) => (CheckResult::pass(format!("Config OK ({})", source)), Some((config, root))),
            Err(e) => (CheckResult::fail(format!("Config invalid: {}", e)), None),
        },
        Err(e) => (CheckResult::fail(format!("Config unreadable: {:#}", e)), None),
    }
}

fn check_prerequisites(root: &Path, files: &[String]) -> Vec<CheckResult> {
    let missing = preflight::missing_files(root, files);
    files
        .iter()
        .map(|file| {
            if missing.contains(file) {
                CheckResult::fail(format!("{} not found", file))
            } else {
                CheckResult::pass(format!("{} found", file))
            }
        })
        .collect()
}

fn check_tool(program: &str) -> CheckResult {
    match Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
    {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let first_line = version.lines().next().unwrap_or("").trim();
            if first_line.is_empty() {
                CheckResult::pass(program.to_string())
            } else {
                CheckResult::pass(format!("{} ({})", program, first_line))
            }
        }
        Ok(_) => CheckResult::fail(format!("{} found but returned error", program)),
        Err(_) => CheckResult::fail(format!("{} not found on PATH", program)),
    }
}

/// Distinct programs referenced by install steps and servers, in first-use order.
fn programs(config: &DevConfig, root: &Path) -> Vec<String> {
    let mut seen = BTreeSet::new();
    config
        .install
        .iter()
        .map(|step| &step.command)
        .chain(config.servers().into_iter().map(|server| &server.command))
        .map(|command| command.program_for(root))
        .filter(|program| seen.insert(program.clone()))
        .collect()
}

pub fn run(config_path: Option<&Path>) -> Result<()> {
    println!("{}", "devup doctor".bold());
    println!();

    // === Configuration ===
    println!("{}", "Configuration".bold().underline());
    let (config_check, loaded) = check_config(config_path);
    let mut all_checks = vec![config_check];
    print_checks(&all_checks);

    if let Some((config, root)) = loaded {
        // === Manifests ===
        println!();
        println!("{}", "Dependency Manifests".bold().underline());
        let manifest_checks = check_prerequisites(&root, &config.prerequisites.files);
        print_checks(&manifest_checks);

        // === Tools ===
        println!();
        println!("{}", "Development Tools".bold().underline());
        let tool_checks: Vec<CheckResult> = programs(&config, &root)
            .iter()
            .map(|program| check_tool(program))
            .collect();
        print_checks(&tool_checks);

        all_checks.extend(manifest_checks);
        all_checks.extend(tool_checks);
    }

    // === Summary ===
    let total = all_checks.len();
    let passed = all_checks.iter().filter(|c| c.passed).count();
    let failed = total - passed;

    println!();
    let summary = format!("{}/{} checks passed", passed, total);
    if failed == 0 {
        println!("{}", summary.green().bold());
        Ok(())
    } else {
        println!("{}", summary.yellow().bold());
        bail!("{} issue(s) found, see above for details", failed)
    }
}

fn print_checks(checks: &[CheckResult]) {
    for check in checks {
        if check.passed {
            println!("  {} {}", "\u{2713}".green(), check.message);
        } else {
            println!("  {} {}", "\u{2717}".red(), check.message);
        }
    }
}
