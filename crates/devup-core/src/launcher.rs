use crate::config::ServerSpec;
use crate::process::ManagedProcess;
use crate::signal::ShutdownLatch;
use crate::supervisor;
use crate::ui;
use anyhow::Result;
use std::path::Path;
use std::time::Duration;

#[derive(Debug)]
pub enum Launch {
    Started(Vec<ManagedProcess>),
    /// An interrupt arrived before every server was spawned; anything
    /// already running has been stopped.
    Interrupted,
}

/// Start `servers` in order, pausing `startup_delay` between consecutive
/// spawns so the earlier server can initialize.
///
/// If a spawn fails, the servers already started are terminated before the
/// error is returned.
pub fn launch(
    servers: &[&ServerSpec],
    root: &Path,
    startup_delay: Duration,
    shutdown_timeout: Duration,
    latch: &ShutdownLatch,
) -> Result<Launch> {
    let mut started: Vec<ManagedProcess> = Vec::with_capacity(servers.len());

    for (i, server) in servers.iter().enumerate() {
        let interrupted = if i > 0 {
            latch.sleep(startup_delay)
        } else {
            latch.is_triggered()
        };
        if interrupted {
            tracing::info!(started = started.len(), "interrupted before launch");
            supervisor::shutdown(&mut started, shutdown_timeout)?;
            return Ok(Launch::Interrupted);
        }

        let detail = match server.port {
            Some(port) => format!("port {}", port),
            None => server.command.to_string(),
        };
        ui::starting(&server.name, &detail);

        match ManagedProcess::spawn(&server.name, &server.command, root) {
            Ok(process) => {
                tracing::info!(name = %server.name, pid = process.id(), "server started");
                started.push(process);
            }
            Err(e) => {
                ui::failed(&format!("Could not start {}", server.name));
                if let Err(stop_err) = supervisor::shutdown(&mut started, shutdown_timeout) {
                    tracing::warn!(error = %stop_err, "failed to stop servers after launch error");
                }
                return Err(e);
            }
        }
    }

    Ok(Launch::Started(started))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::command::CommandSpec;
    use std::time::Instant;

    fn server(name: &str, script: &str) -> ServerSpec {
        ServerSpec {
            name: name.to_string(),
            port: None,
            links: Vec::new(),
            command: CommandSpec::new("sh", ["-c", script]),
        }
    }

    /// Records its start and, on SIGTERM, its stop. The trap is installed
    /// before the start marker is written.
    fn trapping_server(name: &str) -> ServerSpec {
        server(
            name,
            &format!(
                "trap 'touch {name}.stopped; exit 0' TERM; touch {name}.started; \
                 while true; do sleep 0.05; done"
            ),
        )
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    fn stop_all(launch: Launch) {
        if let Launch::Started(mut procs) = launch {
            supervisor::shutdown(&mut procs, Duration::from_secs(5)).unwrap();
        }
    }

    #[test]
    fn starts_servers_in_order_with_delay() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log");
        let api = server("api", "echo api >> log; exec sleep 30");
        let web = server("web", "echo web >> log; exec sleep 30");

        let start = Instant::now();
        let launch = launch(
            &[&api, &web],
            dir.path(),
            Duration::from_millis(300),
            Duration::from_secs(5),
            &ShutdownLatch::new(),
        )
        .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));

        match &launch {
            Launch::Started(procs) => {
                let names: Vec<_> = procs.iter().map(|p| p.name()).collect();
                assert_eq!(names, vec!["api", "web"]);
            }
            Launch::Interrupted => panic!("unexpected interrupt"),
        }
        // The frontend script may not have reached its echo yet.
        wait_until(|| read_lines(&log).len() >= 2);
        stop_all(launch);

        assert_eq!(read_lines(&log), vec!["api", "web"]);
    }

    #[test]
    fn server_env_is_extended_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = server(
            "api",
            "echo \"$PYTHONPATH|${PATH:+has-path}\" > env.tmp; mv env.tmp env.txt; exec sleep 30",
        );
        api.command = api.command.with_env("PYTHONPATH", "{root}");

        let launch = launch(
            &[&api],
            dir.path(),
            Duration::ZERO,
            Duration::from_secs(5),
            &ShutdownLatch::new(),
        )
        .unwrap();

        let path = dir.path().join("env.txt");
        wait_until(|| path.exists());
        stop_all(launch);

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.trim(), format!("{}|has-path", dir.path().display()));
    }

    #[test]
    fn pending_interrupt_starts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let api = trapping_server("api");
        let web = trapping_server("web");
        let latch = ShutdownLatch::new();
        latch.trigger();

        let launch = launch(
            &[&api, &web],
            dir.path(),
            Duration::from_secs(30),
            Duration::from_secs(5),
            &latch,
        )
        .unwrap();

        assert!(matches!(launch, Launch::Interrupted));
        // Anything spawned would have had ample time to write its marker.
        std::thread::sleep(Duration::from_millis(300));
        assert!(!dir.path().join("api.started").exists());
        assert!(!dir.path().join("web.started").exists());
    }

    #[test]
    fn interrupt_during_delay_stops_first_server() {
        let dir = tempfile::tempdir().unwrap();
        let api = trapping_server("api");
        let web = trapping_server("web");
        let latch = ShutdownLatch::new();

        let remote = latch.clone();
        let api_started = dir.path().join("api.started");
        let trigger = std::thread::spawn(move || {
            let started = wait_until(|| api_started.exists());
            remote.trigger();
            started
        });

        let launch = launch(
            &[&api, &web],
            dir.path(),
            Duration::from_secs(30),
            Duration::from_secs(5),
            &latch,
        )
        .unwrap();
        assert!(trigger.join().unwrap(), "api server never started");

        assert!(matches!(launch, Launch::Interrupted));
        assert!(dir.path().join("api.stopped").exists());
        assert!(!dir.path().join("web.started").exists());
    }

    #[test]
    fn failed_second_spawn_stops_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let api = trapping_server("api");
        let mut web = server("web", "");
        web.command = CommandSpec::new("devup-no-such-dev-server", ["dev"]);

        // The delay gives the API shell time to install its TERM trap.
        let err = launch(
            &[&api, &web],
            dir.path(),
            Duration::from_secs(1),
            Duration::from_secs(5),
            &ShutdownLatch::new(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("Failed to start web"));
        assert!(dir.path().join("api.started").exists());
        assert!(dir.path().join("api.stopped").exists());
    }
}
