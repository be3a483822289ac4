use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde_derive::{Deserialize, Serialize};

use crate::event_loop::PollMode;

#[derive(Debug, Default)]
pub struct ConfigFile {
    backing: Option<PathBuf>,
    config: Config,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Allocate a console of our own if there's none to attach to.
    pub create_console: bool,
    pub window: WindowConfig,
    pub poll: PollMode,
    /// An env_logger filter, taking precedence over RUST_LOG.
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub class_name: String,
    /// None leaves it to the window manager.
    pub width: Option<i32>,
    pub height: Option<i32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_console: true,
            window: WindowConfig::default(),
            poll: PollMode::default(),
            log_filter: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Win32 CTRL-C".to_string(),
            class_name: "Win32CtrlC".to_string(),
            width: None,
            height: None,
        }
    }
}

impl ConfigFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            backing: Some(path.as_ref().to_owned()),
            config: std::fs::read(path)
                .and_then(|data| {
                    serde_json::from_slice::<Config>(&data)
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
                })
                .unwrap_or_default(),
        }
    }

    /// The config.json in the per-user config directory, or pure defaults if
    /// there isn't one.  Only ever read; nothing is written back.
    pub fn discover() -> Self {
        match ProjectDirs::from("", "CtrlWin", "CtrlWin") {
            Some(dirs) => Self::new(dirs.config_dir().join("config.json")),
            None => Self::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.backing.as_deref()
    }

    pub fn current(&self) -> Config {
        self.config.clone()
    }
}

#[test]
fn test_config_defaults() {
    let dir = tempdir::TempDir::new("ctrlwin-config").unwrap();
    let cf = ConfigFile::new(dir.path().join("missing.json"));

    let c = cf.current();
    assert_eq!(c, Config::default());
    assert!(c.create_console);
    assert_eq!(c.window.title, "Win32 CTRL-C");
    assert_eq!(c.window.class_name, "Win32CtrlC");
    assert_eq!(c.poll, PollMode::Wait { timeout_ms: 50 });
}

#[test]
fn test_config_load() {
    let dir = tempdir::TempDir::new("ctrlwin-config").unwrap();
    let path = dir.path().join("config.json");

    let cf = ConfigFile::new(&path);
    assert_eq!(cf.current(), Config::default());
    assert!(!path.exists());

    let mut c = cf.current();
    c.create_console = false;
    c.window.width = Some(800);
    c.poll = PollMode::Busy;
    c.log_filter = Some("debug".to_string());
    std::fs::write(&path, serde_json::to_vec(&c).unwrap()).unwrap();

    let loaded = ConfigFile::new(&path);
    assert_eq!(loaded.current(), c);
    assert_eq!(loaded.path(), Some(path.as_path()));
}

#[test]
fn test_config_partial_and_invalid() {
    let dir = tempdir::TempDir::new("ctrlwin-config").unwrap();

    let partial = dir.path().join("partial.json");
    std::fs::write(
        &partial,
        r#"{ "window": { "title": "Hello" }, "poll": { "mode": "busy" } }"#,
    )
    .unwrap();
    let c = ConfigFile::new(&partial).current();
    assert_eq!(c.window.title, "Hello");
    assert_eq!(c.window.class_name, "Win32CtrlC");
    assert_eq!(c.poll, PollMode::Busy);
    assert!(c.create_console);

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json").unwrap();
    assert_eq!(ConfigFile::new(&broken).current(), Config::default());
}
