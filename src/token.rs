//! Anti-forgery tokens.
//!
//! A token is minted when a page renders a form, stored in the caller's
//! session scope, echoed back in a hidden field, and compared on
//! submission. A submission whose token does not match the session's is
//! not one our own page produced.
//!
//! Validity is binary: absence and mismatch both read as `false`, with
//! no detail about which check failed.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use sha1::{Digest, Sha1};

use crate::store::{FormSource, TokenStore};

/// Characters the random seed is drawn from.
const SEED_CHARS: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ:;.,<>?/~!@#$%^&*()_+";

/// Length of the random seed fed into the digest.
const SEED_LEN: usize = 15;

/// Install-wide default salt mixed into every minted token. Production
/// deployments should override it via [`TokenManager::salt`].
const DEFAULT_SALT: &str = "mK4vR9zQpXw2cTbE7uYhNaL0eGdJs3fCoZir8nWq1xSV";

/// Names locating one token domain within a session.
///
/// Distinct scopes are independent: a manager for one scope never reads
/// or replaces tokens held under another, which lets one session carry
/// several token domains at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenScope {
    /// Name of the per-session mapping holding the token fields.
    pub namespace: String,
    /// Field under which the issued token is stored.
    pub session_field: String,
    /// Form field a submission is expected to echo the token in.
    pub form_field: String,
}

impl Default for TokenScope {
    fn default() -> Self {
        Self {
            namespace: "XSRF_TOKENS".to_string(),
            session_field: "XSRF_TOKEN".to_string(),
            form_field: "XSRF_TOKEN".to_string(),
        }
    }
}

/// An issued anti-forgery token: 40 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares against an untrusted candidate in constant time.
    ///
    /// Runtime depends only on the candidate's length, never on where
    /// the first mismatching byte sits.
    pub fn verify(&self, candidate: &str) -> bool {
        let ours = self.0.as_bytes();
        let theirs = candidate.as_bytes();
        ours.len() == theirs.len()
            && ours
                .iter()
                .zip(theirs)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }

    /// Mints a fresh token: a seed of [`SEED_LEN`] random characters,
    /// the wall clock, one more random draw, and `salt`, digested to a
    /// fixed 40-character hex string.
    fn mint(salt: &str) -> Self {
        let mut rng = rand::thread_rng();
        let seed: String = (0..SEED_LEN)
            .map(|_| SEED_CHARS[rng.gen_range(0..SEED_CHARS.len())] as char)
            .collect();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let extra: u32 = rng.gen();

        let mut hasher = Sha1::new();
        hasher.update(seed.as_bytes());
        hasher.update(now.to_string().as_bytes());
        hasher.update(extra.to_string().as_bytes());
        hasher.update(salt.as_bytes());
        Token(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues and checks tokens for one [`TokenScope`].
///
/// Holds handles to the session-scoped store and the submitted form
/// rather than reading any ambient request state.
pub struct TokenManager<'a, S, F> {
    store: &'a S,
    form: &'a F,
    scope: TokenScope,
    salt: String,
}

impl<'a, S: TokenStore, F: FormSource> TokenManager<'a, S, F> {
    /// Creates a manager with the default scope and salt.
    pub fn new(store: &'a S, form: &'a F) -> Self {
        Self::with_scope(store, form, TokenScope::default())
    }

    /// Creates a manager over an explicit scope, making sure the scope's
    /// namespace exists in `store` without overwriting an existing one.
    pub fn with_scope(store: &'a S, form: &'a F, scope: TokenScope) -> Self {
        store.ensure(&scope.namespace);
        Self {
            store,
            form,
            scope,
            salt: DEFAULT_SALT.to_string(),
        }
    }

    /// Replaces the install-wide salt mixed into minted tokens.
    pub fn salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    /// Mints a token and stores it, silently replacing any prior token
    /// for this scope.
    ///
    /// One slot per scope, last write wins: two pages racing to render
    /// forms for the same session each overwrite the other, and only the
    /// last issued token validates.
    pub fn generate(&self) -> Token {
        let token = Token::mint(&self.salt);
        self.store.put(
            &self.scope.namespace,
            &self.scope.session_field,
            token.as_str().to_string(),
        );
        token
    }

    /// The currently issued token, when one exists. Never mints.
    pub fn current(&self) -> Option<Token> {
        self.store
            .get(&self.scope.namespace, &self.scope.session_field)
            .map(Token)
    }

    /// True when the submission carries the token field and a session
    /// token is issued.
    pub fn is_set(&self) -> bool {
        self.form.field(&self.scope.form_field).is_some() && self.current().is_some()
    }

    /// True when both tokens are present and equal.
    ///
    /// The comparison is constant-time; see [`Token::verify`].
    pub fn is_valid(&self) -> bool {
        match (self.current(), self.form.field(&self.scope.form_field)) {
            (Some(issued), Some(submitted)) => issued.verify(&submitted),
            _ => false,
        }
    }

    /// Removes the issued token, reporting whether one was present.
    pub fn destroy(&self) -> bool {
        self.store
            .remove(&self.scope.namespace, &self.scope.session_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FormFields, MemoryStore};

    #[test]
    fn minted_tokens_are_forty_hex_chars() {
        let token = Token::mint(DEFAULT_SALT);

        assert_eq!(token.as_str().len(), 40);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(token.as_str(), token.as_str().to_ascii_lowercase());
    }

    #[test]
    fn successive_mints_differ() {
        let a = Token::mint(DEFAULT_SALT);
        let b = Token::mint(DEFAULT_SALT);

        assert_ne!(a, b);
    }

    #[test]
    fn verify_accepts_only_an_exact_match() {
        let token = Token::mint(DEFAULT_SALT);
        let mut twisted = token.as_str().to_string();
        let last = if twisted.pop() == Some('0') { '1' } else { '0' };
        twisted.push(last);

        assert!(token.verify(token.as_str()));
        assert!(!token.verify(&twisted));
        assert!(!token.verify(&token.as_str()[..39]));
        assert!(!token.verify(""));
    }

    #[test]
    fn no_token_is_issued_until_generate() {
        let store = MemoryStore::new();
        let form = FormFields::new();
        let manager = TokenManager::new(&store, &form);

        assert_eq!(manager.current(), None);
        assert!(!manager.is_set());
        assert!(!manager.is_valid());
    }

    #[test]
    fn matching_submission_validates() {
        let store = MemoryStore::new();
        let mut form = FormFields::new();
        let issued = TokenManager::new(&store, &form).generate();
        form.set("XSRF_TOKEN", issued.as_str());

        let manager = TokenManager::new(&store, &form);
        assert!(manager.is_set());
        assert!(manager.is_valid());
    }

    #[test]
    fn mismatched_submission_is_set_but_invalid() {
        let store = MemoryStore::new();
        let mut form = FormFields::new();
        TokenManager::new(&store, &form).generate();
        form.set("XSRF_TOKEN", "1234567890123456789012345678901234567890");

        let manager = TokenManager::new(&store, &form);
        assert!(manager.is_set());
        assert!(!manager.is_valid());
    }

    #[test]
    fn missing_submission_never_validates() {
        let store = MemoryStore::new();
        let form = FormFields::new();
        let manager = TokenManager::new(&store, &form);
        manager.generate();

        assert!(!manager.is_set());
        assert!(!manager.is_valid());
    }

    #[test]
    fn regeneration_invalidates_the_older_form() {
        let store = MemoryStore::new();
        let form = FormFields::new();
        let manager = TokenManager::new(&store, &form);
        let first = manager.generate();
        let second = manager.generate();

        assert_ne!(first, second);

        let mut stale = FormFields::new();
        stale.set("XSRF_TOKEN", first.as_str());
        assert!(!TokenManager::new(&store, &stale).is_valid());

        let mut fresh = FormFields::new();
        fresh.set("XSRF_TOKEN", second.as_str());
        assert!(TokenManager::new(&store, &fresh).is_valid());
    }

    #[test]
    fn destroy_reports_once() {
        let store = MemoryStore::new();
        let form = FormFields::new();
        let manager = TokenManager::new(&store, &form);
        manager.generate();

        assert!(manager.destroy());
        assert!(!manager.destroy());
        assert_eq!(manager.current(), None);
        assert!(!manager.is_set());
    }

    #[test]
    fn scopes_do_not_observe_each_other() {
        let store = MemoryStore::new();
        let form = FormFields::new();

        let checkout = TokenScope {
            namespace: "CHECKOUT_TOKENS".to_string(),
            ..TokenScope::default()
        };
        let profile = TokenScope {
            namespace: "PROFILE_TOKENS".to_string(),
            ..TokenScope::default()
        };

        let checkout_mgr = TokenManager::with_scope(&store, &form, checkout);
        let profile_mgr = TokenManager::with_scope(&store, &form, profile);

        checkout_mgr.generate();
        assert_eq!(profile_mgr.current(), None);
        assert!(!profile_mgr.destroy());
        assert!(checkout_mgr.current().is_some());
    }

    #[test]
    fn custom_field_names_are_honored() {
        let store = MemoryStore::new();
        let mut form = FormFields::new();

        let scope = TokenScope {
            namespace: "T".to_string(),
            session_field: "S".to_string(),
            form_field: "F".to_string(),
        };
        let issued = TokenManager::with_scope(&store, &form, scope.clone()).generate();
        form.set("F", issued.as_str());

        let manager = TokenManager::with_scope(&store, &form, scope);
        assert!(manager.is_valid());
        assert_eq!(store.get("T", "S"), Some(issued.as_str().to_string()));
    }

    #[test]
    fn custom_salt_still_mints_well_formed_tokens() {
        let store = MemoryStore::new();
        let form = FormFields::new();
        let manager = TokenManager::new(&store, &form).salt("per-install secret");

        let token = manager.generate();
        assert_eq!(token.as_str().len(), 40);
        assert_eq!(manager.current(), Some(token));
    }
}
