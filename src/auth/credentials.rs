//! Per-identity token files under `<config_dir>/tegmail/credentials/`.

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub expires_at_epoch: Option<i64>, // epoch seconds
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// The cached access token, if it has not expired at `now`.
    pub fn valid_access_token(&self, now: i64) -> Option<&str> {
        match (&self.access_token, self.expires_at_epoch) {
            (Some(at), Some(exp)) if now < exp => Some(at),
            _ => None,
        }
    }
}

/// Names end up as file names, so only a conservative alphabet is allowed.
pub fn validate_identity(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("identity name must not be empty");
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        bail!("identity name {name:?} contains {c:?}; use letters, digits, '.', '_' or '-'");
    }
    if name.starts_with('.') {
        bail!("identity name {name:?} must not start with '.'");
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn default_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| anyhow!("no config dir available"))?
            .join("tegmail")
            .join("credentials"))
    }

    /// Open (creating if needed) the credential directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        validate_identity(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Stored identity names, sorted.
    pub fn identities(&self) -> Result<Vec<String>> {
        let mut names = vec![];
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && validate_identity(stem).is_ok()
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn load(&self, name: &str) -> Result<Option<Credentials>> {
        let p = self.path(name)?;
        if !p.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&p)?;
        let creds: Credentials = serde_json::from_str(&s)
            .map_err(|e| anyhow!("corrupt credentials file {}: {e}", p.display()))?;
        Ok(Some(creds))
    }

    pub fn save(&self, name: &str, creds: &Credentials) -> Result<()> {
        let p = self.path(name)?;
        let s = serde_json::to_string_pretty(creds)?;
        fs::write(&p, s)?;
        Ok(())
    }
}

/// Ask which identity to use. An empty answer picks the only stored identity
/// when there is exactly one; any other valid name is used as is, which
/// creates a new identity on first authorization.
pub fn prompt_identity<R: BufRead, W: Write>(
    store: &CredentialStore,
    input: &mut R,
    output: &mut W,
) -> Result<String> {
    let existing = store.identities()?;
    if existing.is_empty() {
        writeln!(output, "No stored identities.")?;
    } else {
        writeln!(output, "Stored identities: {}", existing.join(", "))?;
    }
    match existing.as_slice() {
        [only] => write!(output, "Identity [{only}]: ")?,
        _ => write!(output, "Identity: ")?,
    }
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();

    if answer.is_empty() {
        return match existing.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(anyhow!("an identity name is required")),
        };
    }
    validate_identity(answer)?;
    Ok(answer.to_string())
}
