//! Session Authority
//!
//! Every account holds at most one live session. A login that finds a live
//! session is refused: no session record is written and no session token
//! leaves the authority. Instead the caller gets a short-lived termination
//! token, which can only be used to end the existing sessions.
//!
//! State per account:
//!
//! ```text
//! NoSession ──login──▶ Active ──terminate_all / logout / expiry──▶ NoSession
//!                      Active ──login──▶ Active (ActiveSessionConflict)
//! ```

use crate::credentials::CredentialHasher;
use crate::store::{LedgerStore, SessionStore, StoreError};
use crate::token::{Claims, TokenScope, TokenService};
use crate::SharedClock;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::account::Account;
use types::errors::VendingError;
use types::ids::{AccountId, TokenId};
use types::session::Session;

/// Session token handed to the client after its record was stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub account_id: AccountId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Standing of a presented token against the session table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    /// Unreadable, forged, or not a session token
    Invalid,
    Expired,
    /// Well-formed, but the account holds no session
    NoSession,
    Current,
    /// The account holds a different session
    Superseded,
}

impl SessionCheck {
    /// A stale token belongs to a session that was replaced; the client
    /// should drop it.
    pub fn is_stale(self) -> bool {
        matches!(self, SessionCheck::Superseded)
    }
}

pub struct SessionAuthority {
    sessions: Arc<dyn SessionStore>,
    ledger: Arc<dyn LedgerStore>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenService>,
    clock: SharedClock,
    ttl: TimeDelta,
    termination_ttl: TimeDelta,
    /// Checked against when the email is unknown, so that branch costs as
    /// much as a wrong password.
    dummy_digest: String,
}

impl SessionAuthority {
    pub const DEFAULT_TTL: TimeDelta = TimeDelta::hours(24);
    pub const TERMINATION_TTL: TimeDelta = TimeDelta::minutes(5);

    pub fn new(
        sessions: Arc<dyn SessionStore>,
        ledger: Arc<dyn LedgerStore>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenService>,
        clock: SharedClock,
    ) -> Self {
        let dummy_digest = hasher.hash("no such account");
        Self {
            sessions,
            ledger,
            hasher,
            tokens,
            clock,
            ttl: Self::DEFAULT_TTL,
            termination_ttl: Self::TERMINATION_TTL,
            dummy_digest,
        }
    }

    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn login(&self, email: &str, password: &str) -> Result<IssuedSession, VendingError> {
        let email = email.trim().to_lowercase();
        let account = match self.ledger.account_by_email(&email) {
            Ok(account) => account,
            Err(StoreError::NotFound { .. }) => {
                let _ = self.hasher.verify(password, &self.dummy_digest);
                return Err(VendingError::InvalidCredential);
            }
            Err(other) => return Err(other.into()),
        };
        if !self.hasher.verify(password, &account.credential_digest) {
            debug!(account_id = %account.account_id, "password rejected");
            return Err(VendingError::InvalidCredential);
        }

        let now = self.clock.utc();
        let expires_at = now + self.ttl;
        let token = self.issue(&account, TokenScope::Session, now, expires_at)?;
        let session = Session {
            account_id: account.account_id,
            token: token.clone(),
            created_at: now,
            expires_at,
        };

        match self.sessions.insert_if_vacant(session, now)? {
            None => {
                info!(account_id = %account.account_id, "session opened");
                Ok(IssuedSession {
                    account_id: account.account_id,
                    token,
                    expires_at,
                })
            }
            Some(existing) => {
                warn!(
                    account_id = %account.account_id,
                    existing_since = %existing.created_at,
                    "login refused, session already active"
                );
                let termination_token = self.issue(
                    &account,
                    TokenScope::Terminate,
                    now,
                    now + self.termination_ttl,
                )?;
                Err(VendingError::ActiveSessionConflict { termination_token })
            }
        }
    }

    /// End every session of the account; returns how many were removed.
    pub fn terminate_all(&self, account_id: &AccountId) -> Result<usize, VendingError> {
        let removed = self.sessions.remove(account_id)?.map_or(0, |_| 1);
        info!(%account_id, removed, "sessions terminated");
        Ok(removed)
    }

    /// Remove the stored session only if `token` is that session's token.
    pub fn logout(&self, token: &str) -> Result<bool, VendingError> {
        let Ok(claims) = self.tokens.decode(token) else {
            return Ok(false);
        };
        let removed = self.sessions.remove_if_token(&claims.sub, token)?;
        debug!(account_id = %claims.sub, removed, "logout");
        Ok(removed)
    }

    pub fn is_active(&self, token: &str) -> Result<SessionCheck, VendingError> {
        let Ok(claims) = self.tokens.decode(token) else {
            return Ok(SessionCheck::Invalid);
        };
        let now = self.clock.utc();
        if is_expired(&claims, now) {
            return Ok(SessionCheck::Expired);
        }
        if claims.scope != TokenScope::Session {
            return Ok(SessionCheck::Invalid);
        }
        Ok(match self.sessions.get(&claims.sub, now)? {
            None => SessionCheck::NoSession,
            Some(session) if session.matches(token) => SessionCheck::Current,
            Some(_) => SessionCheck::Superseded,
        })
    }

    /// Claims of a token that is the account's current session.
    pub fn authenticate(&self, token: &str) -> Result<Claims, VendingError> {
        let claims = self.verified(token)?;
        if claims.scope != TokenScope::Session {
            return Err(VendingError::InvalidToken);
        }
        match self.sessions.get(&claims.sub, self.clock.utc())? {
            Some(session) if session.matches(token) => Ok(claims),
            _ => Err(VendingError::InvalidToken),
        }
    }

    /// Account whose sessions `token` may end: either the current session
    /// token or an unexpired termination token from a refused login.
    /// A superseded session token is refused.
    pub fn authorize_termination(&self, token: &str) -> Result<AccountId, VendingError> {
        let claims = self.verified(token)?;
        match claims.scope {
            TokenScope::Terminate => Ok(claims.sub),
            TokenScope::Session => self.authenticate(token).map(|claims| claims.sub),
        }
    }

    pub fn purge_expired(&self) -> Result<usize, VendingError> {
        let purged = self.sessions.purge_expired(self.clock.utc())?;
        if purged > 0 {
            debug!(purged, "expired sessions purged");
        }
        Ok(purged)
    }

    fn verified(&self, token: &str) -> Result<Claims, VendingError> {
        let claims = self.tokens.decode(token)?;
        if is_expired(&claims, self.clock.utc()) {
            return Err(VendingError::ExpiredToken);
        }
        Ok(claims)
    }

    fn issue(
        &self,
        account: &Account,
        scope: TokenScope,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, VendingError> {
        self.tokens.issue(&Claims {
            sub: account.account_id,
            email: account.email.clone(),
            role: account.role,
            scope,
            jti: TokenId::new(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        })
    }
}

fn is_expired(claims: &Claims, now: DateTime<Utc>) -> bool {
    now.timestamp() >= claims.exp
}
