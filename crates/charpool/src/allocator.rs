//! Token selection and binding.

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Alphabet, BindOutcome, Error, IdentityCode, IdentityStore, RandSource, Result, Token,
};

/// Multiplier applied to the pool size to derive the default number of
/// random samples before falling back to a full scan.
pub const DEFAULT_SAMPLE_FACTOR: usize = 2;

/// Result of a successful allocation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "status", rename_all = "snake_case")
)]
pub enum Allocation {
    /// `token` was bound to the participant by this request.
    Allocated {
        /// The newly bound token.
        token: Token,
    },
    /// The participant already held `token`; nothing changed.
    AlreadyAllocated {
        /// The token the participant holds.
        token: Token,
    },
}

impl Allocation {
    pub const fn token(&self) -> Token {
        match *self {
            Self::Allocated { token } | Self::AlreadyAllocated { token } => token,
        }
    }

    pub const fn is_new(&self) -> bool {
        matches!(self, Self::Allocated { .. })
    }
}

/// Configuration for a [`PoolAllocator`].
#[derive(Clone, Debug)]
pub struct AllocatorConfig {
    pub alphabet: Alphabet,
    /// Random samples to try before scanning the whole alphabet.
    pub max_sampled_attempts: usize,
}

impl AllocatorConfig {
    /// Uses `DEFAULT_SAMPLE_FACTOR × N` sampled attempts.
    pub fn new(alphabet: Alphabet) -> Self {
        let max_sampled_attempts = alphabet.len().saturating_mul(DEFAULT_SAMPLE_FACTOR);
        Self {
            alphabet,
            max_sampled_attempts,
        }
    }

    #[must_use]
    pub fn with_max_sampled_attempts(mut self, attempts: usize) -> Self {
        self.max_sampled_attempts = attempts;
        self
    }
}

/// Draws a free token from the alphabet and binds it to a participant.
///
/// Allocation runs in two phases:
///
/// 1. **Sampling**: up to `max_sampled_attempts` uniform draws. A draw that
///    some participant already holds, or that loses a bind race, is a
///    collision and is retried with a fresh draw. Cheap while the pool is
///    mostly free.
/// 2. **Scan**: the alphabet is shuffled once and every token is tried in that
///    order. Near exhaustion, when most draws collide, this bounds the work to
///    `N` store round-trips.
///
/// If neither phase binds a token, every token is held and allocation fails
/// with [`Error::PoolExhausted`]. Allocation therefore always terminates.
///
/// A participant found to already hold a token ends the request immediately
/// with [`Allocation::AlreadyAllocated`]. Store faults are returned as-is and
/// never retried.
#[derive(Clone, Debug)]
pub struct PoolAllocator<R> {
    config: AllocatorConfig,
    rng: R,
}

enum Attempt {
    Done(Allocation),
    Collision,
}

impl<R: RandSource> PoolAllocator<R> {
    pub const fn new(config: AllocatorConfig, rng: R) -> Self {
        Self { config, rng }
    }

    pub const fn alphabet(&self) -> &Alphabet {
        &self.config.alphabet
    }

    /// Binds a free token to the registered participant `code`.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolExhausted`] when every token is held.
    /// - [`Error::UnknownParticipant`] when `code` was never registered.
    /// - Any store fault, unchanged.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, store)))]
    pub fn allocate<S>(&self, store: &S, code: &IdentityCode) -> Result<Allocation>
    where
        S: IdentityStore + ?Sized,
    {
        let alphabet = &self.config.alphabet;

        for _attempt in 0..self.config.max_sampled_attempts {
            let token = self.sample();
            if let Attempt::Done(allocation) = Self::attempt(store, code, token)? {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempts = _attempt + 1, %token, "Allocated by sampling");
                return Ok(allocation);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sampled = self.config.max_sampled_attempts,
            "Sampling exhausted, scanning the pool"
        );

        for token in self.shuffled() {
            if let Attempt::Done(allocation) = Self::attempt(store, code, token)? {
                #[cfg(feature = "tracing")]
                tracing::debug!(%token, "Allocated by scan");
                return Ok(allocation);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(pool_size = alphabet.len(), "Token pool exhausted");

        Err(Error::PoolExhausted {
            pool_size: alphabet.len(),
        })
    }

    fn attempt<S>(store: &S, code: &IdentityCode, token: Token) -> Result<Attempt>
    where
        S: IdentityStore + ?Sized,
    {
        if store.has_token(token)? {
            #[cfg(feature = "tracing")]
            tracing::trace!(%token, "Collision on pre-check");
            return Ok(Attempt::Collision);
        }

        match store.try_bind(code, token)? {
            BindOutcome::Bound => Ok(Attempt::Done(Allocation::Allocated { token })),
            BindOutcome::AlreadyHeld { token } => {
                Ok(Attempt::Done(Allocation::AlreadyAllocated { token }))
            }
            BindOutcome::TokenTaken => {
                #[cfg(feature = "tracing")]
                tracing::trace!(%token, "Lost bind race");
                Ok(Attempt::Collision)
            }
        }
    }

    /// Indices from the random source are reduced into range, so a source
    /// that ignores its bound still yields a pool token.
    fn sample(&self) -> Token {
        let alphabet = self.alphabet().as_slice();
        alphabet[self.rng.rand_below(alphabet.len()) % alphabet.len()]
    }

    /// Fisher-Yates over a copy of the alphabet.
    fn shuffled(&self) -> Vec<Token> {
        let mut tokens = self.alphabet().as_slice().to_vec();
        for i in (1..tokens.len()).rev() {
            let j = self.rng.rand_below(i + 1) % (i + 1);
            tokens.swap(i, j);
        }
        tokens
    }
}
