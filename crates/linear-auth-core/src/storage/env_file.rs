//! Plain env-file storage backend
//!
//! Reads and edits the shared plugins env file (`KEY=VALUE` per line). This
//! is the location older installations keep the key in, and the file the
//! host parses into its environment at start-up.

use async_trait::async_trait;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::SecretBackend;
use crate::config::{ENV_COMMENT, ENV_KEY};
use crate::credential::ApiKey;
use crate::error::Result;

#[cfg(unix)]
const FILE_MODE: u32 = 0o600;
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// Separators accepted around the key, the same set the edit pattern uses
const BLANK: [char; 2] = [' ', '\t'];

/// Parse dotenv-style content into ordered `(key, value)` pairs.
///
/// Blank lines and `#` comments are skipped. Leading indentation and an
/// `export` prefix are accepted, matching single or double quotes are
/// stripped, and unquoted values end at a ` #` inline comment.
pub fn parse_env(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim_start_matches(BLANK).trim_end();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = strip_export(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim_end_matches(BLANK);
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

/// Drop an `export` keyword followed by blanks, as shells accept it
fn strip_export(line: &str) -> &str {
    match line.strip_prefix("export") {
        Some(rest) if rest.starts_with(BLANK) => rest.trim_start_matches(BLANK),
        _ => line,
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end(),
        None => value,
    }
}

/// Env-file storage backend
pub struct FileBackend {
    path: PathBuf,
    assignment: Regex,
    comment: Regex,
}

impl FileBackend {
    /// Create a backend over the env file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let key = regex::escape(ENV_KEY);
        Self {
            path: path.into(),
            // Patterns are built from constants and always compile. The
            // assignment matches every line `parse_env` reads as the key;
            // group 1 holds the indentation and `export` prefix.
            assignment: Regex::new(&format!(
                r"(?m)^([ \t]*(?:export[ \t]+)?){}[ \t]*=[^\r\n]*",
                key
            ))
            .expect("assignment pattern is valid"),
            comment: Regex::new(r"^[ \t]*#\s*Linear API").expect("comment pattern is valid"),
        }
    }

    /// Path of the env file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the env file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the whole file, `None` if it does not exist
    async fn read_existing(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create the parent directory (owner-only) if it is missing
    async fn ensure_parent(&self) -> Result<()> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }

        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);
        builder.create(parent).await?;

        debug!("Created env directory {:?}", parent);
        Ok(())
    }

    /// Replace the file contents, owner read/write only
    async fn write(&self, content: &str) -> Result<()> {
        // Write via a temp file so a failed write leaves the old file intact
        let temp_path = self.path.with_extension("tmp");

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(FILE_MODE);

        {
            use tokio::io::AsyncWriteExt;
            let mut file = options.open(&temp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(FILE_MODE))
                .await?;
        }

        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    /// Insert or replace the key line in `content`.
    ///
    /// A replaced line keeps its indentation and `export` prefix.
    fn upsert(&self, content: &str, value: &ApiKey) -> String {
        let line = format!("{}={}", ENV_KEY, value.expose());

        if self.assignment.is_match(content) {
            return self
                .assignment
                .replace_all(content, |caps: &Captures| format!("{}{}", &caps[1], line))
                .into_owned();
        }

        let mut updated = content.to_string();
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(ENV_COMMENT);
        updated.push('\n');
        updated.push_str(&line);
        updated.push('\n');
        updated
    }

    /// Remove key lines and the comment line directly above each one.
    ///
    /// Returns `None` if the key is not assigned anywhere.
    fn strip(&self, content: &str) -> Option<String> {
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let mut keep = vec![true; lines.len()];
        let mut found = false;

        for (idx, line) in lines.iter().enumerate() {
            if !self.assignment.is_match(line) {
                continue;
            }
            found = true;
            keep[idx] = false;
            if idx > 0 && self.comment.is_match(lines[idx - 1]) {
                keep[idx - 1] = false;
            }
        }

        if !found {
            return None;
        }

        Some(
            lines
                .iter()
                .zip(keep)
                .filter_map(|(line, keep)| keep.then_some(*line))
                .collect(),
        )
    }
}

#[async_trait]
impl SecretBackend for FileBackend {
    async fn store(&self, value: &ApiKey) -> Result<()> {
        self.ensure_parent().await?;

        let content = self.read_existing().await?.unwrap_or_default();
        let updated = self.upsert(&content, value);
        self.write(&updated).await?;

        debug!("Stored API key {} in {:?}", value.masked(), self.path);
        Ok(())
    }

    async fn load(&self) -> Result<Option<ApiKey>> {
        let Some(content) = self.read_existing().await? else {
            debug!("No env file at {:?}", self.path);
            return Ok(None);
        };

        let value = parse_env(&content)
            .into_iter()
            .filter(|(key, _)| key == ENV_KEY)
            .map(|(_, value)| value)
            .last()
            .filter(|value| !value.is_empty());

        Ok(value.map(ApiKey::new))
    }

    async fn delete(&self) -> Result<bool> {
        let Some(content) = self.read_existing().await? else {
            return Ok(false);
        };

        let Some(updated) = self.strip(&content) else {
            debug!("{} not present in {:?}", ENV_KEY, self.path);
            return Ok(false);
        };

        self.write(&updated).await?;
        debug!("Removed {} from {:?}", ENV_KEY, self.path);
        Ok(true)
    }

    fn backend_name(&self) -> &'static str {
        "Env file"
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
