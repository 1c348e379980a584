//! Settings file adapter.
//!
//! The settings file is plain `KEY=VALUE` lines, optionally followed by
//! `[section]` blocks. Keys are case-sensitive and anything before the first
//! header lands in the `default` section.

use std::fs;
use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::TurtleError;
use crate::ports::config_port::ConfigPort;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TurtleError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(content, &path.display().to_string())
    }

    pub fn from_string(content: &str) -> Result<Self, TurtleError> {
        Self::parse(content.to_string(), "<string>")
    }

    fn parse(content: String, origin: &str) -> Result<Self, TurtleError> {
        let mut config = Ini::new_cs();
        config.read(content).map_err(|reason| TurtleError::ConfigParse {
            file: origin.to_string(),
            reason,
        })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }
}
