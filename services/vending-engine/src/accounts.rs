//! Signup, balance maintenance and profile lookup

use crate::credentials::CredentialHasher;
use crate::store::{LedgerStore, StoreError};
use crate::SharedClock;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::info;
use types::account::{Account, Role};
use types::errors::VendingError;
use types::ids::AccountId;
use types::numeric::{Cents, MAX_BALANCE};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z ]{3,20}$").expect("valid username regex"));

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Account as shown to its owner; never carries the credential digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountProfile {
    pub account_id: AccountId,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountProfile {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.account_id,
            email: account.email,
            username: account.username,
            role: account.role,
            balance: account.balance,
            created_at: account.created_at,
        }
    }
}

pub struct AccountService {
    ledger: Arc<dyn LedgerStore>,
    hasher: Arc<dyn CredentialHasher>,
    clock: SharedClock,
}

impl AccountService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        hasher: Arc<dyn CredentialHasher>,
        clock: SharedClock,
    ) -> Self {
        Self {
            ledger,
            hasher,
            clock,
        }
    }

    pub fn signup(&self, request: SignupRequest) -> Result<AccountProfile, VendingError> {
        let email = request.email.trim().to_lowercase();
        let username = request.username.trim();
        validate_signup(&email, username, &request.password)?;

        let digest = self.hasher.hash(&request.password);
        let account = Account::new(&email, username, request.role, digest, self.clock.utc());
        let profile = AccountProfile::from(account.clone());

        match self.ledger.insert_account(account) {
            Ok(()) => {}
            Err(StoreError::DuplicateKey { .. }) => {
                return Err(VendingError::AccountExists { email });
            }
            Err(other) => return Err(other.into()),
        }

        info!(account_id = %profile.account_id, role = %profile.role, "account created");
        Ok(profile)
    }

    /// Replace the balance with `amount`.
    pub fn deposit(&self, account_id: &AccountId, amount: Cents) -> Result<Cents, VendingError> {
        if !amount.is_coin_aligned() {
            return Err(VendingError::InvalidInput(format!(
                "deposit {} is not a multiple of 5 cents",
                amount
            )));
        }
        if amount > MAX_BALANCE {
            return Err(VendingError::InvalidInput(format!(
                "deposit {} exceeds the {} limit",
                amount, MAX_BALANCE
            )));
        }
        let account = self.ledger.set_balance(account_id, amount)?;
        info!(%account_id, balance = account.balance.value(), "balance set");
        Ok(account.balance)
    }

    pub fn reset(&self, account_id: &AccountId) -> Result<Cents, VendingError> {
        let account = self.ledger.account(account_id)?;
        if !account.is_buyer() {
            return Err(VendingError::unauthorized("only buyers can reset a balance"));
        }
        let account = self.ledger.set_balance(account_id, Cents::ZERO)?;
        info!(%account_id, "balance reset");
        Ok(account.balance)
    }

    pub fn profile(&self, account_id: &AccountId) -> Result<AccountProfile, VendingError> {
        Ok(self.ledger.account(account_id)?.into())
    }
}

fn validate_signup(email: &str, username: &str, password: &str) -> Result<(), VendingError> {
    if !EMAIL_RE.is_match(email) {
        return Err(VendingError::InvalidInput("email is not valid".into()));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(VendingError::InvalidInput(
            "username must be 3 to 20 letters or spaces".into(),
        ));
    }
    let strong = password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric());
    if !strong {
        return Err(VendingError::InvalidInput(
            "password needs 8 characters with upper and lower case, a digit and a symbol".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::SaltedSha256;
    use crate::store::MemoryLedger;
    use mockable::DefaultClock;
    use types::numeric::COIN_UNIT;

    fn service() -> (AccountService, Arc<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new());
        let service = AccountService::new(
            ledger.clone(),
            Arc::new(SaltedSha256::new(1)),
            Arc::new(DefaultClock),
        );
        (service, ledger)
    }

    fn request(email: &str, role: Role) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            username: "Jane Doe".into(),
            password: "Str0ng!pw".into(),
            role,
        }
    }

    #[test]
    fn test_signup_normalizes_email_and_hides_digest() {
        let (service, ledger) = service();
        let profile = service.signup(request("  Jane@Example.COM ", Role::Buyer)).unwrap();
        assert_eq!(profile.email, "jane@example.com");
        assert_eq!(profile.balance, Cents::ZERO);

        let stored = ledger.account(&profile.account_id).unwrap();
        assert!(stored.credential_digest.starts_with("sha256$"));
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("sha256$"));
    }

    #[test]
    fn test_duplicate_email() {
        let (service, _) = service();
        service.signup(request("a@x.io", Role::Buyer)).unwrap();
        assert_eq!(
            service.signup(request("A@x.io", Role::Seller)).unwrap_err(),
            VendingError::AccountExists {
                email: "a@x.io".into()
            }
        );
    }

    #[test]
    fn test_signup_validation() {
        let (service, _) = service();
        let cases = [
            SignupRequest { email: "not-an-email".into(), ..request("", Role::Buyer) },
            SignupRequest { username: "Al".into(), ..request("b@x.io", Role::Buyer) },
            SignupRequest { username: "R2 D2".into(), ..request("b@x.io", Role::Buyer) },
            SignupRequest { password: "short1!".into(), ..request("b@x.io", Role::Buyer) },
            SignupRequest { password: "nosymbol1A".into(), ..request("b@x.io", Role::Buyer) },
            SignupRequest { password: "NOLOWER1!".into(), ..request("b@x.io", Role::Buyer) },
        ];
        for case in cases {
            assert!(
                matches!(service.signup(case.clone()), Err(VendingError::InvalidInput(_))),
                "accepted {case:?}"
            );
        }
    }

    #[test]
    fn test_deposit_replaces_balance() {
        let (service, _) = service();
        let id = service.signup(request("c@x.io", Role::Buyer)).unwrap().account_id;
        assert_eq!(service.deposit(&id, Cents::new(100)).unwrap(), Cents::new(100));
        assert_eq!(service.deposit(&id, Cents::new(35)).unwrap(), Cents::new(35));
        assert_eq!(service.profile(&id).unwrap().balance, Cents::new(35));
    }

    #[test]
    fn test_deposit_rejects_uneven_amount() {
        let (service, _) = service();
        let id = service.signup(request("d@x.io", Role::Buyer)).unwrap().account_id;
        assert!(matches!(
            service.deposit(&id, Cents::new(17)),
            Err(VendingError::InvalidInput(_))
        ));
        assert_eq!(service.profile(&id).unwrap().balance, Cents::ZERO);
    }

    #[test]
    fn test_deposit_limit() {
        let (service, _) = service();
        let id = service.signup(request("g@x.io", Role::Buyer)).unwrap().account_id;
        assert_eq!(service.deposit(&id, MAX_BALANCE).unwrap(), MAX_BALANCE);

        let over = Cents::new(MAX_BALANCE.value() + COIN_UNIT);
        assert!(matches!(
            service.deposit(&id, over),
            Err(VendingError::InvalidInput(_))
        ));
        let huge = Cents::new(u64::MAX - u64::MAX % COIN_UNIT);
        assert!(matches!(
            service.deposit(&id, huge),
            Err(VendingError::InvalidInput(_))
        ));
        assert_eq!(service.profile(&id).unwrap().balance, MAX_BALANCE);
    }

    #[test]
    fn test_reset_is_buyer_only() {
        let (service, _) = service();
        let buyer = service.signup(request("e@x.io", Role::Buyer)).unwrap().account_id;
        let seller = service.signup(request("f@x.io", Role::Seller)).unwrap().account_id;
        service.deposit(&buyer, Cents::new(50)).unwrap();

        assert_eq!(service.reset(&buyer).unwrap(), Cents::ZERO);
        assert!(matches!(
            service.reset(&seller),
            Err(VendingError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_profile_of_unknown_account() {
        let (service, _) = service();
        assert!(matches!(
            service.profile(&AccountId::new()),
            Err(VendingError::NotFound { .. })
        ));
    }
}
