//! Configuration file handling.
//!
//! The file format is the command language itself: one `//...`
//! connection line followed by one `*name*value,value` line per macro,
//! sorted by name. That keeps the file hand-editable and lets the
//! loader reuse the ordinary command path.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use matrixkit_core::Result;

/// File name used when none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "matrixkit.conf";

/// A configuration file at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the connection parameters and macro table, replacing any
    /// previous content.
    pub fn write(&self, connection: &[u64], macros: &BTreeMap<char, Vec<String>>) -> Result<()> {
        let params: Vec<String> = connection.iter().map(|p| p.to_string()).collect();
        let mut content = format!("//{}\n", params.join("."));
        for (name, values) in macros {
            content.push_str(&format!("*{}*{}\n", name, values.join(",")));
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Read the stored command lines. A missing file is not an error,
    /// it just means nothing has been saved yet.
    pub fn read_lines(&self) -> Result<Option<Vec<String>>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content.lines().map(str::to_string).collect())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
