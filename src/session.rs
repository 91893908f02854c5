use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::models::{LoginResponse, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub role: Role,
    pub full_name: String,
}

impl From<LoginResponse> for Session {
    fn from(login: LoginResponse) -> Self {
        Session {
            user_id: login.id,
            role: login.role,
            full_name: login.full_name,
        }
    }
}

/// On-disk session record. The whole identity is one file, so signing out
/// removes user id, role and name together rather than leaving stale keys.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let body = serde_json::to_string_pretty(session)?;
        let staged = self.path.with_extension("json.tmp");
        fs::write(&staged, body)
            .with_context(|| format!("failed to write {}", staged.display()))?;
        fs::rename(&staged, &self.path)
            .with_context(|| format!("failed to move session into {}", self.path.display()))?;
        Ok(())
    }

    pub fn load(&self) -> anyhow::Result<Option<Session>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read session file {}", self.path.display()))
            }
        };
        let session = serde_json::from_str(&raw).with_context(|| {
            format!("session file {} is unreadable; sign in again", self.path.display())
        })?;
        Ok(Some(session))
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove session file {}", self.path.display())),
        }
    }

    pub fn require_teacher(&self) -> anyhow::Result<Session> {
        let Some(session) = self.load()? else {
            bail!("not signed in; run `edupredict-console login` first");
        };
        if session.role != Role::Teacher {
            bail!(
                "{} is signed in as {}; this console only serves teachers",
                session.full_name,
                session.role
            );
        }
        Ok(session)
    }
}
