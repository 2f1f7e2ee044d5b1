//! Error types for the allocation subsystem.
//!
//! Sampling collisions never surface here: the allocator absorbs them. A
//! participant that already holds a token is also not an error; see
//! [`crate::Allocation::AlreadyAllocated`].

/// Result alias used throughout `charpool`.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `charpool` can produce.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The identity code does not have exactly
    /// [`IDENTITY_CODE_LEN`](crate::IDENTITY_CODE_LEN) characters. Raised
    /// before the store is touched.
    #[error("identity code must be exactly {expected} characters, got {len}")]
    InvalidIdentityCode {
        /// Number of characters in the rejected code.
        len: usize,
        /// Required number of characters.
        expected: usize,
    },

    /// The configured alphabet is empty or contains duplicate tokens.
    #[error("invalid alphabet: {reason}")]
    InvalidAlphabet {
        /// What is wrong with the alphabet.
        reason: String,
    },

    /// An allocation was requested for a code that never logged in.
    #[error("unknown participant `{code}`")]
    UnknownParticipant {
        /// The unregistered identity code.
        code: String,
    },

    /// Every token in the alphabet is held by some participant.
    #[error("token pool exhausted: all {pool_size} tokens are allocated")]
    PoolExhausted {
        /// Size of the alphabet.
        pool_size: usize,
    },

    /// The backing store failed. Fatal to the in-flight request and never
    /// retried by the allocator.
    #[error("store unavailable: {context}")]
    StoreUnavailable {
        /// Description of the underlying storage fault.
        context: String,
    },

    /// The in-memory store's lock was poisoned by a panicking thread.
    ///
    /// Never produced when the `parking-lot` feature is enabled, since
    /// `parking_lot` mutexes do not poison.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl Error {
    /// Wraps a storage fault as [`Error::StoreUnavailable`].
    pub fn store_unavailable(context: impl core::fmt::Display) -> Self {
        Self::StoreUnavailable {
            context: context.to_string(),
        }
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::store::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
