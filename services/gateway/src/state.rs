use crate::rate_limit::RateLimiter;
use chrono::TimeDelta;
use persistence::FsyncPolicy;
use std::path::Path;
use std::sync::Arc;
use vending_engine::{
    AccountService, Catalog, CredentialHasher, JwtTokens, LedgerStore, MemoryLedger,
    MemorySessionStore, PurchaseEngine, SaltedSha256, SessionAuthority, SessionStore, SharedClock,
    StoreError,
};

/// Store handles shared by every service
#[derive(Clone)]
pub struct Stores {
    pub ledger: Arc<dyn LedgerStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            ledger: Arc::new(MemoryLedger::new()),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }

    /// Journaled stores, one journal directory each under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            ledger: Arc::new(MemoryLedger::open(
                &data_dir.join("ledger"),
                FsyncPolicy::EveryWrite,
            )?),
            sessions: Arc::new(MemorySessionStore::open(
                &data_dir.join("sessions"),
                FsyncPolicy::EveryWrite,
            )?),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
    pub max_age_secs: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<Catalog>,
    pub purchases: Arc<PurchaseEngine>,
    pub sessions: Arc<SessionAuthority>,
    pub rate_limiter: Arc<RateLimiter>,
    pub cookie: CookieSettings,
}

impl AppState {
    pub fn new(
        stores: Stores,
        token_secret: &[u8],
        session_ttl: TimeDelta,
        clock: SharedClock,
        cookie_secure: bool,
    ) -> Self {
        let hasher: Arc<dyn CredentialHasher> = Arc::new(SaltedSha256::default());
        Self::with_hasher(stores, hasher, token_secret, session_ttl, clock, cookie_secure)
    }

    pub fn with_hasher(
        stores: Stores,
        hasher: Arc<dyn CredentialHasher>,
        token_secret: &[u8],
        session_ttl: TimeDelta,
        clock: SharedClock,
        cookie_secure: bool,
    ) -> Self {
        let sessions = SessionAuthority::new(
            stores.sessions.clone(),
            stores.ledger.clone(),
            hasher.clone(),
            Arc::new(JwtTokens::new(token_secret)),
            clock.clone(),
        )
        .with_ttl(session_ttl);

        Self {
            accounts: Arc::new(AccountService::new(
                stores.ledger.clone(),
                hasher,
                clock.clone(),
            )),
            catalog: Arc::new(Catalog::new(stores.ledger.clone(), clock)),
            purchases: Arc::new(PurchaseEngine::new(stores.ledger)),
            sessions: Arc::new(sessions),
            rate_limiter: Arc::new(RateLimiter::new()),
            cookie: CookieSettings {
                secure: cookie_secure,
                max_age_secs: session_ttl.num_seconds(),
            },
        }
    }
}
