//! Development environment bootstrapper: installs project dependencies, runs
//! the API and frontend dev servers side by side, and stops both on Ctrl+C.

pub mod bootstrap;
pub mod command;
pub mod config;
pub mod installer;
pub mod launcher;
pub mod preflight;
pub mod process;
pub mod signal;
pub mod supervisor;
pub mod ui;

pub use bootstrap::Bootstrap;
pub use config::DevConfig;
pub use signal::ShutdownLatch;
pub use supervisor::Outcome;
