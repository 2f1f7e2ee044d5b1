//! Participant storage.
//!
//! [`IdentityStore`] is the seam between the allocation logic and durable
//! state. Every implementation must make [`IdentityStore::try_bind`] a single
//! atomic conditional write: the token uniqueness invariant is enforced here
//! and nowhere else.

mod interface;
mod memory;
mod mutex;
#[cfg(feature = "redb")]
mod redb;

pub use interface::*;
pub use memory::*;
pub(crate) use mutex::*;
#[cfg_attr(docsrs, doc(cfg(feature = "redb")))]
#[cfg(feature = "redb")]
pub use self::redb::*;
