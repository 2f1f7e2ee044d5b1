use std::sync::Arc;

use crate::{IdentityCode, Participant, Result, Token};

/// Outcome of [`IdentityStore::try_bind`].
///
/// None of these is an error. A store fault or an unknown participant is
/// reported through the `Err` side instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindOutcome {
    /// The token is now bound to the participant.
    Bound,
    /// The participant already held a token; nothing was written. Terminal
    /// for the allocation request.
    AlreadyHeld {
        /// The token the participant holds.
        token: Token,
    },
    /// Another participant holds the requested token; nothing was written.
    /// The allocator should retry with a different token.
    TokenTaken,
}

/// Durable mapping from identity code to [`Participant`].
///
/// Implementations are shared between concurrent requests, so every method
/// takes `&self` and performs its own synchronization.
pub trait IdentityStore {
    /// Returns the participant for `code`, registering it without a token if
    /// it does not exist yet. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails only when the store is unavailable.
    fn ensure(&self, code: &IdentityCode) -> Result<Participant>;

    /// Looks up a participant without registering it.
    ///
    /// # Errors
    ///
    /// Fails only when the store is unavailable.
    fn participant(&self, code: &IdentityCode) -> Result<Option<Participant>>;

    /// Whether any participant currently holds `token`.
    ///
    /// # Errors
    ///
    /// Fails only when the store is unavailable.
    fn has_token(&self, token: Token) -> Result<bool>;

    /// Binds `token` to `code` if, and only if, the participant holds no token
    /// and no other participant holds `token`.
    ///
    /// Both conditions and the write form one indivisible operation: two
    /// racing calls can never both return [`BindOutcome::Bound`] for the same
    /// code or for the same token. When both conditions fail,
    /// [`BindOutcome::AlreadyHeld`] wins.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownParticipant`] if `code` was never registered.
    /// - [`Error::StoreUnavailable`] on a storage fault.
    ///
    /// [`Error::UnknownParticipant`]: crate::Error::UnknownParticipant
    /// [`Error::StoreUnavailable`]: crate::Error::StoreUnavailable
    fn try_bind(&self, code: &IdentityCode, token: Token) -> Result<BindOutcome>;

    /// Number of participants holding a token.
    ///
    /// # Errors
    ///
    /// Fails only when the store is unavailable.
    fn count_assigned(&self) -> Result<usize>;
}

macro_rules! forward_identity_store {
    ($($ptr:ty),*) => {$(
        impl<S: IdentityStore + ?Sized> IdentityStore for $ptr {
            fn ensure(&self, code: &IdentityCode) -> Result<Participant> {
                (**self).ensure(code)
            }

            fn participant(&self, code: &IdentityCode) -> Result<Option<Participant>> {
                (**self).participant(code)
            }

            fn has_token(&self, token: Token) -> Result<bool> {
                (**self).has_token(token)
            }

            fn try_bind(&self, code: &IdentityCode, token: Token) -> Result<BindOutcome> {
                (**self).try_bind(code, token)
            }

            fn count_assigned(&self) -> Result<usize> {
                (**self).count_assigned()
            }
        }
    )*};
}

forward_identity_store!(&S, Box<S>, Arc<S>);
