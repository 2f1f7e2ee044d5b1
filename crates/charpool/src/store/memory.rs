use std::collections::HashMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    BindOutcome, Error, IdentityCode, IdentityStore, Participant, Result, Token,
    store::{Mutex, MutexGuard},
};

#[derive(Default)]
struct State {
    participants: HashMap<IdentityCode, Option<Token>>,
    holders: HashMap<Token, IdentityCode>,
}

/// A process-local [`IdentityStore`].
///
/// A single mutex guards both the participant map and the token-to-holder
/// index, so [`IdentityStore::try_bind`] checks and writes in one critical
/// section. Nothing survives a restart; use `RedbStore` for durability.
///
/// ## Recommended When
/// - Tests and benchmarks
/// - Single-process deployments where losing allocations on restart is fine
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered participants, allocated or not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the lock was poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.participants.len())
    }

    /// Whether no participant has registered yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the lock was poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.participants.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }
}

impl IdentityStore for MemoryStore {
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn ensure(&self, code: &IdentityCode) -> Result<Participant> {
        let mut state = self.lock()?;
        let token = *state.participants.entry(code.clone()).or_insert(None);
        Ok(Participant {
            code: code.clone(),
            token,
        })
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn participant(&self, code: &IdentityCode) -> Result<Option<Participant>> {
        let state = self.lock()?;
        Ok(state.participants.get(code).map(|token| Participant {
            code: code.clone(),
            token: *token,
        }))
    }

    fn has_token(&self, token: Token) -> Result<bool> {
        Ok(self.lock()?.holders.contains_key(&token))
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn try_bind(&self, code: &IdentityCode, token: Token) -> Result<BindOutcome> {
        let mut state = self.lock()?;
        let State {
            participants,
            holders,
        } = &mut *state;

        let slot = participants
            .get_mut(code)
            .ok_or_else(|| Error::UnknownParticipant {
                code: code.to_string(),
            })?;

        if let Some(held) = *slot {
            return Ok(BindOutcome::AlreadyHeld { token: held });
        }
        if holders.contains_key(&token) {
            return Ok(BindOutcome::TokenTaken);
        }

        *slot = Some(token);
        holders.insert(token, code.clone());
        Ok(BindOutcome::Bound)
    }

    fn count_assigned(&self) -> Result<usize> {
        Ok(self.lock()?.holders.len())
    }
}
