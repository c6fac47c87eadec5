use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use log::debug;

use crate::terminal::surface::{DisplaySurface, Region};

pub fn default_log_path() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow!("no home directory available"))?
        .join(".tegmail.log"))
}

/// Route the `log` facade into `path`, appending. The terminal is in raw
/// mode while the session runs, so nothing may go to stderr.
pub fn init(path: &Path, debug: bool) -> Result<()> {
    builder(path, debug)?.try_init()?;
    Ok(())
}

fn builder(path: &Path, debug: bool) -> Result<env_logger::Builder> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let default = if debug { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default));
    builder.target(env_logger::Target::Pipe(Box::new(file)));
    Ok(builder)
}

/// Debug messages shown on the status line and appended to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugSink {
    enabled: bool,
}

impl DebugSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn write(&self, surface: &mut dyn DisplaySurface, text: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        surface.clear(Region::Status)?;
        surface.print(Region::Status, &format!("[DEBUG] {text}"))?;
        debug!(target: "tegmail::debug", "{text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSurface;

    #[test]
    fn disabled_sink_leaves_status_alone() {
        let mut surface = FakeSurface::new(5, []);
        surface.print(Region::Status, "ready").unwrap();
        DebugSink::new(false).write(&mut surface, "hidden").unwrap();
        assert_eq!(surface.state().status, "ready");
    }

    #[test]
    fn enabled_sink_replaces_status() {
        let mut surface = FakeSurface::new(5, []);
        surface.print(Region::Status, "ready").unwrap();
        DebugSink::new(true).write(&mut surface, "key j").unwrap();
        assert_eq!(surface.state().status, "[DEBUG] key j");
    }

    #[test]
    fn log_file_is_appended_not_truncated() {
        use log::Log;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tegmail.log");
        std::fs::write(&path, "earlier line\n").unwrap();

        let logger = builder(&path, true).unwrap().build();
        logger.log(
            &log::Record::builder()
                .args(format_args!("later line"))
                .level(log::Level::Error)
                .target("tegmail")
                .build(),
        );
        logger.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("earlier line\n"), "{contents}");
        assert!(contents.contains("later line"), "{contents}");
    }

    #[test]
    fn init_installs_the_file_logger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tegmail.log");

        init(&path, true).unwrap();
        log::error!("through the facade");
        log::logger().flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("through the facade"), "{contents}");
        // a second logger cannot be installed
        assert!(init(&path, true).is_err());
    }
}
