//! The public allocation surface.
//!
//! [`AllocationService`] validates identity codes, keeps participant records
//! through an [`IdentityStore`], and delegates token selection to a
//! [`PoolAllocator`]. It is the only type the outer layers (HTTP handlers,
//! CLIs) need to talk to.

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Allocation, AllocatorConfig, Alphabet, Error, IdentityCode, IdentityStore, Participant,
    PoolAllocator, RandSource, Result,
};

/// Registers participants and hands each one exactly one token.
///
/// Per participant the lifecycle is `UNREGISTERED → REGISTERED → ALLOCATED`:
/// [`login`](Self::login) registers, and the first successful
/// [`request_allocation`](Self::request_allocation) allocates. Nothing moves a
/// participant backwards.
///
/// The service is `Sync` whenever its store and random source are, and can be
/// shared behind an `Arc` between concurrent requests.
pub struct AllocationService<S, R> {
    store: S,
    allocator: PoolAllocator<R>,
}

impl<S, R> AllocationService<S, R>
where
    S: IdentityStore,
    R: RandSource,
{
    pub const fn new(store: S, config: AllocatorConfig, rng: R) -> Self {
        Self {
            store,
            allocator: PoolAllocator::new(config, rng),
        }
    }

    /// Registers `code` if needed and returns its record. Idempotent.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidIdentityCode`] before the store is touched.
    /// - [`Error::StoreUnavailable`] on a storage fault.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn login(&self, code: &str) -> Result<Participant> {
        let code = IdentityCode::parse(code)?;
        self.store.ensure(&code)
    }

    /// Returns the record for `code` without registering it.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidIdentityCode`] before the store is touched.
    /// - [`Error::StoreUnavailable`] on a storage fault.
    pub fn participant(&self, code: &str) -> Result<Option<Participant>> {
        let code = IdentityCode::parse(code)?;
        self.store.participant(&code)
    }

    /// Allocates a token to `code`, exactly once.
    ///
    /// Returns [`Allocation::Allocated`] the first time and
    /// [`Allocation::AlreadyAllocated`] on every later call, including a
    /// concurrent call that lost the race.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidIdentityCode`] before the store is touched.
    /// - [`Error::UnknownParticipant`] if `code` never logged in.
    /// - [`Error::PoolExhausted`] if every token is held.
    /// - [`Error::StoreUnavailable`] on a storage fault.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn request_allocation(&self, code: &str) -> Result<Allocation> {
        let code = IdentityCode::parse(code)?;

        let participant =
            self.store
                .participant(&code)?
                .ok_or_else(|| Error::UnknownParticipant {
                    code: code.to_string(),
                })?;

        if let Some(token) = participant.token {
            #[cfg(feature = "tracing")]
            tracing::debug!(%token, "Participant already allocated");
            return Ok(Allocation::AlreadyAllocated { token });
        }

        self.allocator.allocate(&self.store, &code)
    }

    /// Number of tokens nobody holds yet: `N - assigned`.
    ///
    /// A snapshot; concurrent allocations may change it immediately.
    ///
    /// # Errors
    ///
    /// Fails only when the store is unavailable.
    pub fn remaining(&self) -> Result<usize> {
        let assigned = self.store.count_assigned()?;
        Ok(self.pool_size().saturating_sub(assigned))
    }

    /// Total pool size `N`.
    pub fn pool_size(&self) -> usize {
        self.alphabet().len()
    }

    pub const fn alphabet(&self) -> &Alphabet {
        self.allocator.alphabet()
    }

    pub const fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, ThreadRandom, Token};
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread::scope;

    fn service_over<S: IdentityStore>(store: S, alphabet: &str) -> AllocationService<S, ThreadRandom> {
        AllocationService::new(
            store,
            AllocatorConfig::new(alphabet.parse().unwrap()),
            ThreadRandom,
        )
    }

    fn service(alphabet: &str) -> AllocationService<MemoryStore, ThreadRandom> {
        service_over(MemoryStore::new(), alphabet)
    }

    fn nth_code(i: usize) -> String {
        format!("{i:05}")
    }

    fn run_scenario_abc<S: IdentityStore>(service: &AllocationService<S, ThreadRandom>) {
        for i in 1..=4 {
            service.login(&nth_code(i)).unwrap();
        }
        assert_eq!(service.remaining().unwrap(), 3);

        let mut tokens = HashSet::new();
        for i in 1..=3 {
            let allocation = service.request_allocation(&nth_code(i)).unwrap();
            assert!(allocation.is_new());
            assert!(service.alphabet().contains(allocation.token()));
            tokens.insert(allocation.token());
        }
        assert_eq!(tokens.len(), 3);
        assert_eq!(service.remaining().unwrap(), 0);

        assert_eq!(
            service.request_allocation(&nth_code(4)),
            Err(Error::PoolExhausted { pool_size: 3 })
        );
        assert_eq!(service.login(&nth_code(4)).unwrap().token, None);
        assert_eq!(service.remaining().unwrap(), 0);
    }

    fn run_concurrent_full_pool<S: IdentityStore + Sync>(service: &AllocationService<S, ThreadRandom>) {
        let n = service.pool_size();
        for i in 0..n {
            service.login(&nth_code(i)).unwrap();
        }

        let barrier = Barrier::new(n);
        let tokens = Mutex::new(Vec::with_capacity(n));
        scope(|s| {
            for i in 0..n {
                let barrier = &barrier;
                let tokens = &tokens;
                s.spawn(move || {
                    barrier.wait();
                    let allocation = service.request_allocation(&nth_code(i)).unwrap();
                    assert!(allocation.is_new());
                    tokens.lock().unwrap().push(allocation.token());
                });
            }
        });

        let tokens = tokens.into_inner().unwrap();
        let distinct: HashSet<Token> = tokens.iter().copied().collect();
        assert_eq!(tokens.len(), n);
        assert_eq!(distinct.len(), n);
        assert!(distinct.iter().all(|t| service.alphabet().contains(*t)));
        assert_eq!(service.remaining().unwrap(), 0);
    }

    #[test]
    fn login_is_idempotent() {
        let service = service("ABC");
        let first = service.login("00001").unwrap();
        let second = service.login("00001").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.token, None);
        assert_eq!(service.store().len().unwrap(), 1);
    }

    #[test]
    fn login_reports_allocated_token() {
        let service = service("ABC");
        service.login("00001").unwrap();
        let token = service.request_allocation("00001").unwrap().token();
        assert_eq!(service.login("00001").unwrap().token, Some(token));
        assert_eq!(service.participant("00001").unwrap().unwrap().token, Some(token));
    }

    #[test]
    fn invalid_codes_never_reach_the_store() {
        let service = service("ABC");
        for bad in ["", "0001", "000001"] {
            assert!(matches!(
                service.login(bad),
                Err(Error::InvalidIdentityCode { .. })
            ));
            assert!(matches!(
                service.request_allocation(bad),
                Err(Error::InvalidIdentityCode { .. })
            ));
            assert!(matches!(
                service.participant(bad),
                Err(Error::InvalidIdentityCode { .. })
            ));
        }
        assert!(service.store().is_empty().unwrap());
    }

    #[test]
    fn allocation_requires_login() {
        let service = service("ABC");
        assert_eq!(
            service.request_allocation("00001"),
            Err(Error::UnknownParticipant {
                code: "00001".to_string()
            })
        );
        assert_eq!(service.participant("00001").unwrap(), None);
        assert_eq!(service.remaining().unwrap(), 3);
    }

    #[test]
    fn second_request_is_already_allocated() {
        let service = service("ABC");
        service.login("00001").unwrap();

        let first = service.request_allocation("00001").unwrap();
        let second = service.request_allocation("00001").unwrap();
        assert!(first.is_new());
        assert_eq!(
            second,
            Allocation::AlreadyAllocated {
                token: first.token()
            }
        );
        assert_eq!(service.remaining().unwrap(), 2);
    }

    #[test]
    fn remaining_tracks_assigned_count() {
        let service = service("ABCDEFGH");
        for i in 0..5 {
            service.login(&nth_code(i)).unwrap();
            service.request_allocation(&nth_code(i)).unwrap();
            let assigned = service.store().count_assigned().unwrap();
            assert_eq!(service.remaining().unwrap(), service.pool_size() - assigned);
            assert_eq!(assigned, i + 1);
        }
    }

    #[test]
    fn scenario_abc_memory() {
        run_scenario_abc(&service("ABC"));
    }

    #[test]
    fn concurrent_full_pool_memory() {
        run_concurrent_full_pool(&service("ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"));
    }

    #[test]
    fn concurrent_requests_for_same_code() {
        const THREADS: usize = 8;
        let service = service("ABCDEFGHIJ");
        service.login("00001").unwrap();

        let barrier = Barrier::new(THREADS);
        let results = Arc::new(Mutex::new(Vec::new()));
        scope(|s| {
            for _ in 0..THREADS {
                let barrier = &barrier;
                let service = &service;
                let results = Arc::clone(&results);
                s.spawn(move || {
                    barrier.wait();
                    let allocation = service.request_allocation("00001").unwrap();
                    results.lock().unwrap().push(allocation);
                });
            }
        });

        let results = results.lock().unwrap();
        let new: Vec<_> = results.iter().filter(|a| a.is_new()).collect();
        assert_eq!(new.len(), 1);
        let token = new[0].token();
        assert!(results.iter().all(|a| a.token() == token));
        assert_eq!(service.store().count_assigned().unwrap(), 1);
    }

    #[cfg(feature = "redb")]
    fn redb_service(alphabet: &str) -> (tempfile::TempDir, AllocationService<crate::RedbStore, ThreadRandom>) {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::RedbStore::open(dir.path().join("identities.redb")).unwrap();
        (dir, service_over(store, alphabet))
    }

    #[cfg(feature = "redb")]
    #[test]
    fn scenario_abc_redb() {
        let (_dir, service) = redb_service("ABC");
        run_scenario_abc(&service);
    }

    #[cfg(feature = "redb")]
    #[test]
    fn concurrent_full_pool_redb() {
        let (_dir, service) = redb_service("ABCDEFGHIJKLMNOP");
        run_concurrent_full_pool(&service);
    }

    proptest! {
        #[test]
        fn login_is_idempotent_for_any_code(code in "\\PC{5}") {
            let service = service("AB");
            let first = service.login(&code).unwrap();
            let second = service.login(&code).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.code.as_str(), code.as_str());
            prop_assert_eq!(first.token, None);
        }

        #[test]
        fn wrong_length_codes_are_rejected(code in "\\PC{0,4}|\\PC{6,10}") {
            let service = service("AB");
            let is_invalid = matches!(
                service.login(&code),
                Err(Error::InvalidIdentityCode { .. })
            );
            prop_assert!(is_invalid);
        }
    }
}
