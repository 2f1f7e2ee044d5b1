use std::path::{Path, PathBuf};

use ::redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{BindOutcome, Error, IdentityCode, IdentityStore, Participant, Result, Token};

/// Key: identity code, Value: the held token as a Unicode scalar value, if
/// any.
const PARTICIPANTS: TableDefinition<&str, Option<u32>> = TableDefinition::new("participants");

/// Key: token as a Unicode scalar value, Value: identity code of the holder.
///
/// One entry per held token. This key space is what enforces token
/// uniqueness.
const TOKEN_HOLDERS: TableDefinition<u32, &str> = TableDefinition::new("token_holders");

/// A durable [`IdentityStore`] backed by a redb database file.
///
/// redb serializes write transactions, so [`IdentityStore::try_bind`] reads
/// both conditions and writes both tables inside one transaction: either the
/// participant row and the holder row commit together, or nothing does.
///
/// Every redb failure surfaces as [`Error::StoreUnavailable`].
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Creates or opens a store at `path`.
    ///
    /// Creates the parent directory and the tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the directory, file, or tables
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::store_unavailable(format!(
                        "failed to create directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let db = Database::create(&path).map_err(store_fault)?;

        let txn = db.begin_write().map_err(store_fault)?;
        {
            txn.open_table(PARTICIPANTS).map_err(store_fault)?;
            txn.open_table(TOKEN_HOLDERS).map_err(store_fault)?;
        }
        txn.commit().map_err(store_fault)?;

        #[cfg(feature = "tracing")]
        tracing::debug!("Opened identity store at {}", path.display());

        Ok(Self { db, path })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for RedbStore {
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn ensure(&self, code: &IdentityCode) -> Result<Participant> {
        let txn = self.db.begin_write().map_err(store_fault)?;
        let existing = {
            let mut participants = txn.open_table(PARTICIPANTS).map_err(store_fault)?;
            let existing = participants
                .get(code.as_str())
                .map_err(store_fault)?
                .map(|guard| guard.value());
            if existing.is_none() {
                participants
                    .insert(code.as_str(), None::<u32>)
                    .map_err(store_fault)?;
            }
            existing
        };

        match existing {
            Some(raw) => {
                txn.abort().map_err(store_fault)?;
                Ok(Participant {
                    code: code.clone(),
                    token: raw.map(token_from_raw).transpose()?,
                })
            }
            None => {
                txn.commit().map_err(store_fault)?;
                Ok(Participant::registered(code.clone()))
            }
        }
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn participant(&self, code: &IdentityCode) -> Result<Option<Participant>> {
        let txn = self.db.begin_read().map_err(store_fault)?;
        let participants = txn.open_table(PARTICIPANTS).map_err(store_fault)?;
        let raw = participants
            .get(code.as_str())
            .map_err(store_fault)?
            .map(|guard| guard.value());

        raw.map(|raw| {
            Ok(Participant {
                code: code.clone(),
                token: raw.map(token_from_raw).transpose()?,
            })
        })
        .transpose()
    }

    fn has_token(&self, token: Token) -> Result<bool> {
        let txn = self.db.begin_read().map_err(store_fault)?;
        let holders = txn.open_table(TOKEN_HOLDERS).map_err(store_fault)?;
        Ok(holders
            .get(u32::from(token.as_char()))
            .map_err(store_fault)?
            .is_some())
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn try_bind(&self, code: &IdentityCode, token: Token) -> Result<BindOutcome> {
        let raw_token = u32::from(token.as_char());
        let txn = self.db.begin_write().map_err(store_fault)?;
        let outcome = {
            let mut participants = txn.open_table(PARTICIPANTS).map_err(store_fault)?;
            let mut holders = txn.open_table(TOKEN_HOLDERS).map_err(store_fault)?;

            let current = participants
                .get(code.as_str())
                .map_err(store_fault)?
                .map(|guard| guard.value())
                .ok_or_else(|| Error::UnknownParticipant {
                    code: code.to_string(),
                })?;

            if let Some(held) = current {
                BindOutcome::AlreadyHeld {
                    token: token_from_raw(held)?,
                }
            } else if holders.get(raw_token).map_err(store_fault)?.is_some() {
                BindOutcome::TokenTaken
            } else {
                participants
                    .insert(code.as_str(), Some(raw_token))
                    .map_err(store_fault)?;
                holders
                    .insert(raw_token, code.as_str())
                    .map_err(store_fault)?;
                BindOutcome::Bound
            }
        };

        if outcome == BindOutcome::Bound {
            txn.commit().map_err(store_fault)?;
        } else {
            txn.abort().map_err(store_fault)?;
        }
        Ok(outcome)
    }

    fn count_assigned(&self) -> Result<usize> {
        let txn = self.db.begin_read().map_err(store_fault)?;
        let holders = txn.open_table(TOKEN_HOLDERS).map_err(store_fault)?;
        let len = holders.len().map_err(store_fault)?;
        usize::try_from(len).map_err(Error::store_unavailable)
    }
}

fn store_fault(err: impl Into<::redb::Error>) -> Error {
    Error::store_unavailable(err.into())
}

fn token_from_raw(raw: u32) -> Result<Token> {
    char::from_u32(raw)
        .map(Token::new)
        .ok_or_else(|| Error::store_unavailable(format!("corrupt token value {raw:#x}")))
}
