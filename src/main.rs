#![cfg_attr(windows, windows_subsystem = "windows")]
#![cfg_attr(not(windows), allow(dead_code))]

#[macro_use]
mod status;

mod app;
mod config;
mod console;
mod crash;
mod dispatch;
mod error;
mod event_loop;
mod logging;
mod signal;
#[cfg(windows)]
mod window;

use crate::config::ConfigFile;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn build_info() -> String {
    format!(
        "{} ({}, built {})",
        VERSION,
        option_env!("VERGEN_TARGET_TRIPLE").unwrap_or("unknown target"),
        option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown date")
    )
}

fn main() {
    crash::install();

    // Arguments are accepted and ignored.
    let config_file = ConfigFile::discover();
    let config = config_file.current();
    logging::init(config.log_filter.as_deref());

    log::info!("CtrlWin {}", build_info());
    match config_file.path() {
        Some(path) => log::debug!("Config from {}", path.display()),
        None => log::debug!("No config directory, using defaults"),
    }

    std::process::exit(run(&config));
}

#[cfg(windows)]
fn run(config: &config::Config) -> i32 {
    use std::io::{self, LineWriter};

    let mut platform = app::Win32Platform::new();
    let mut out = LineWriter::with_capacity(status::OUTPUT_BUFFER_SIZE, io::stdout());

    match app::run(&mut platform, config, &event_loop::RUNNING, &mut out) {
        Ok(stats) => {
            log::info!(
                "Clean shutdown after {} messages{}",
                stats.dispatched,
                if stats.quit { " (WM_QUIT)" } else { "" }
            );
            0
        }
        Err(e) => {
            log::error!("{}", e);
            e.exit_code()
        }
    }
}

#[cfg(not(windows))]
fn run(_config: &config::Config) -> i32 {
    eprintln!("CtrlWin {} requires Windows", build_info());
    1
}
