use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

const TOKEN_FILE: &str = "token";
const USER_FILE: &str = "user.json";

/// The durable slot behind the session: a bearer token and a serialized user,
/// one file each.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    dir: PathBuf,
}

impl SessionStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Raw contents of both entries; a missing file reads as `None`.
    pub fn load(&self) -> Result<(Option<String>, Option<String>)> {
        let token = read_optional(&self.dir.join(TOKEN_FILE))?;
        let user = read_optional(&self.dir.join(USER_FILE))?;
        Ok((token, user))
    }

    /// Writes both entries or neither.
    pub fn save(&self, token: &str, user_json: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(TOKEN_FILE), token)?;
        if let Err(e) = fs::write(self.dir.join(USER_FILE), user_json) {
            let _ = fs::remove_file(self.dir.join(TOKEN_FILE));
            return Err(e.into());
        }
        debug!(dir = %self.dir.display(), "session persisted");
        Ok(())
    }

    pub fn save_user(&self, user_json: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(USER_FILE), user_json)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        for name in [TOKEN_FILE, USER_FILE] {
            match fs::remove_file(self.dir.join(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!(dir = %self.dir.display(), "session cleared");
        Ok(())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
