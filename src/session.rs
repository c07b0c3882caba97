use tracing::{debug, info, warn};

use crate::api::AuthBackend;
use crate::error::{Error, Result};
use crate::models::{AuthResponse, Credentials, PasswordReset, SignupForm, User};
use crate::storage::SessionStorage;

/// Whether protected commands may run.
///
/// `Uninitialized` means restoration has not been attempted yet; guards must
/// not treat it as a logout.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Uninitialized,
    Unauthenticated,
    Authenticated { token: String, user: User },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }
}

pub struct SessionStore {
    storage: SessionStorage,
    state: AuthState,
}

impl SessionStore {
    pub fn new(storage: SessionStorage) -> Self {
        Self {
            storage,
            state: AuthState::Uninitialized,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            AuthState::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    /// The bearer token for a protected call.
    pub fn guard(&self) -> Result<&str> {
        match &self.state {
            AuthState::Authenticated { token, .. } => Ok(token),
            AuthState::Uninitialized => Err(Error::Auth("session has not been restored yet".to_string())),
            AuthState::Unauthenticated => Err(Error::Auth("not logged in; run 'jobwise login' first".to_string())),
        }
    }

    pub fn login(&mut self, auth: &dyn AuthBackend, credentials: &Credentials) -> Result<User> {
        credentials.validate()?;
        let response = auth.login(credentials)?;
        self.establish(response)
    }

    pub fn signup(&mut self, auth: &dyn AuthBackend, form: &SignupForm) -> Result<User> {
        form.validate()?;
        let response = auth.signup(form)?;
        self.establish(response)
    }

    fn establish(&mut self, response: AuthResponse) -> Result<User> {
        let user_json = serde_json::to_string(&response.user)
            .map_err(|e| Error::Storage(std::io::Error::other(e)))?;
        if let Err(e) = self.storage.save(&response.token, &user_json) {
            self.discard_stored();
            return Err(e);
        }

        info!(username = %response.user.username, "logged in");
        let user = response.user.clone();
        self.state = AuthState::Authenticated {
            token: response.token,
            user: response.user,
        };
        Ok(user)
    }

    /// Clears storage and memory. Never fails; a storage error is logged.
    pub fn logout(&mut self) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "failed to clear stored session");
        }
        if self.state.is_authenticated() {
            info!("logged out");
        }
        self.state = AuthState::Unauthenticated;
    }

    /// Reads the stored session at startup. Returns true when a session was
    /// restored, which is the caller's cue to refresh the user record.
    pub fn restore_session(&mut self) -> bool {
        self.state = match self.read_stored() {
            Some((token, user)) => {
                debug!(username = %user.username, "restored session");
                AuthState::Authenticated { token, user }
            }
            None => AuthState::Unauthenticated,
        };
        self.state.is_authenticated()
    }

    /// Reconciles memory with storage without a network call. Only acts when
    /// memory says unauthenticated but storage holds a valid session.
    pub fn check_auth_status(&mut self) -> bool {
        if !self.state.is_authenticated() {
            if let Some((token, user)) = self.read_stored() {
                debug!(username = %user.username, "reconciled session from storage");
                self.state = AuthState::Authenticated { token, user };
            } else if self.state == AuthState::Uninitialized {
                self.state = AuthState::Unauthenticated;
            }
        }
        self.state.is_authenticated()
    }

    /// Valid stored credentials, or `None`. Anything unreadable or half
    /// present is wiped so the slot never holds a partial session.
    fn read_stored(&self) -> Option<(String, User)> {
        let (token, user_json) = match self.storage.load() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "stored session unreadable; clearing");
                self.discard_stored();
                return None;
            }
        };

        match (token, user_json) {
            (Some(token), Some(user_json)) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) => Some((token.trim().to_string(), user)),
                Err(e) => {
                    warn!(error = %e, "stored user record is corrupted; clearing");
                    self.discard_stored();
                    None
                }
            },
            (None, None) => None,
            _ => {
                warn!("stored session is incomplete; clearing");
                self.discard_stored();
                None
            }
        }
    }

    fn discard_stored(&self) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "failed to clear stored session");
        }
    }

    /// Best-effort refresh of the user record. A failure leaves the restored
    /// session untouched.
    pub fn refresh_user(&mut self, auth: &dyn AuthBackend) {
        let AuthState::Authenticated { token, user } = &mut self.state else {
            return;
        };
        match auth.me(token) {
            Ok(fresh) => {
                match serde_json::to_string(&fresh) {
                    Ok(json) => {
                        if let Err(e) = self.storage.save_user(&json) {
                            warn!(error = %e, "failed to persist refreshed user");
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to serialize refreshed user"),
                }
                *user = fresh;
            }
            Err(e) => warn!(error = %e, "failed to refresh user data"),
        }
    }

    pub fn security_question(&self, auth: &dyn AuthBackend, username: &str) -> Result<String> {
        if username.trim().is_empty() {
            return Err(Error::Validation("username is required".to_string()));
        }
        auth.security_question(username.trim())
    }

    pub fn reset_password(&self, auth: &dyn AuthBackend, reset: &PasswordReset) -> Result<()> {
        if reset.security_answer.trim().is_empty() {
            return Err(Error::Validation("security answer is required".to_string()));
        }
        if reset.new_password.is_empty() {
            return Err(Error::Validation("new password is required".to_string()));
        }
        auth.reset_password(reset)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// In-memory auth service. Accepts one username/password pair.
    pub struct FakeAuth {
        pub me_fails: Cell<bool>,
        pub me_calls: Cell<usize>,
        pub fresh_name: RefCell<String>,
    }

    impl FakeAuth {
        pub fn new() -> Self {
            Self {
                me_fails: Cell::new(false),
                me_calls: Cell::new(0),
                fresh_name: RefCell::new("Ada Lovelace".to_string()),
            }
        }
    }

    pub fn ada() -> User {
        User {
            id: "u1".to_string(),
            username: "ada".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    impl AuthBackend for FakeAuth {
        fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
            if credentials.username == "ada" && credentials.password == "secret" {
                Ok(AuthResponse {
                    token: "tok-ada".to_string(),
                    user: ada(),
                })
            } else {
                Err(Error::Auth("Invalid credentials".to_string()))
            }
        }

        fn signup(&self, form: &SignupForm) -> Result<AuthResponse> {
            Ok(AuthResponse {
                token: format!("tok-{}", form.username),
                user: User {
                    id: "u2".to_string(),
                    username: form.username.clone(),
                    name: form.name.clone(),
                    email: form.email.clone(),
                },
            })
        }

        fn me(&self, _token: &str) -> Result<User> {
            self.me_calls.set(self.me_calls.get() + 1);
            if self.me_fails.get() {
                return Err(Error::Network("connection refused".to_string()));
            }
            Ok(User {
                name: self.fresh_name.borrow().clone(),
                ..ada()
            })
        }

        fn security_question(&self, username: &str) -> Result<String> {
            if username == "ada" {
                Ok("First pet?".to_string())
            } else {
                Err(Error::Auth("User not found".to_string()))
            }
        }

        fn reset_password(&self, reset: &PasswordReset) -> Result<()> {
            if reset.security_answer == "Rex" {
                Ok(())
            } else {
                Err(Error::Auth("Incorrect answer".to_string()))
            }
        }
    }

    pub fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_starts_uninitialized_and_guard_distinguishes_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SessionStore::new(SessionStorage::new(dir.path()));

        assert_eq!(*session.state(), AuthState::Uninitialized);
        let err = session.guard().unwrap_err();
        assert!(err.to_string().contains("not been restored"));

        assert!(!session.restore_session());
        assert_ne!(*session.state(), AuthState::Uninitialized);
        let err = session.guard().unwrap_err();
        assert!(err.to_string().contains("not logged in"));
    }

    #[test]
    fn test_login_persists_and_opens_guard() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        let mut session = SessionStore::new(storage.clone());
        session.restore_session();

        let user = session.login(&FakeAuth::new(), &creds("ada", "secret")).unwrap();
        assert_eq!(user.username, "ada");
        assert_eq!(session.guard().unwrap(), "tok-ada");

        let (token, user_json) = storage.load().unwrap();
        assert_eq!(token.as_deref(), Some("tok-ada"));
        assert!(user_json.unwrap().contains("\"username\":\"ada\""));
    }

    #[test]
    fn test_invalid_login_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        let mut session = SessionStore::new(storage.clone());
        session.restore_session();

        let err = session.login(&FakeAuth::new(), &creds("ada", "wrong")).unwrap_err();
        assert!(err.is_auth());
        assert!(session.guard().is_err());
        assert_eq!(storage.load().unwrap(), (None, None));
    }

    #[test]
    fn test_unwritable_storage_fails_login_as_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("not-a-dir");
        std::fs::write(&blocked, b"").unwrap();
        let mut session = SessionStore::new(SessionStorage::new(&blocked));
        session.restore_session();

        let err = session.login(&FakeAuth::new(), &creds("ada", "secret")).unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert!(!session.state().is_authenticated());
    }

    #[test]
    fn test_blank_credentials_never_reach_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SessionStore::new(SessionStorage::new(dir.path()));
        let err = session.login(&FakeAuth::new(), &creds("", "secret")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_restore_reads_both_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        storage.save("tok", &serde_json::to_string(&ada()).unwrap()).unwrap();

        let mut session = SessionStore::new(storage);
        assert!(session.restore_session());
        assert_eq!(session.user(), Some(&ada()));
        assert_eq!(session.guard().unwrap(), "tok");
    }

    #[test]
    fn test_restore_clears_corrupted_user() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        storage.save("tok", "{not json").unwrap();

        let mut session = SessionStore::new(storage.clone());
        assert!(!session.restore_session());
        assert_eq!(*session.state(), AuthState::Unauthenticated);
        assert_eq!(storage.load().unwrap(), (None, None));
    }

    #[test]
    fn test_restore_clears_partial_session() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        storage.save_user(&serde_json::to_string(&ada()).unwrap()).unwrap();

        let mut session = SessionStore::new(storage.clone());
        assert!(!session.restore_session());
        assert_eq!(storage.load().unwrap(), (None, None));
    }

    #[test]
    fn test_refresh_failure_keeps_session() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        storage.save("tok", &serde_json::to_string(&ada()).unwrap()).unwrap();
        let mut session = SessionStore::new(storage);
        session.restore_session();

        let auth = FakeAuth::new();
        auth.me_fails.set(true);
        session.refresh_user(&auth);

        assert_eq!(auth.me_calls.get(), 1);
        assert_eq!(session.user(), Some(&ada()));
    }

    #[test]
    fn test_refresh_success_replaces_user_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        storage.save("tok", &serde_json::to_string(&ada()).unwrap()).unwrap();
        let mut session = SessionStore::new(storage.clone());
        session.restore_session();

        session.refresh_user(&FakeAuth::new());

        assert_eq!(session.user().unwrap().name, "Ada Lovelace");
        let (_, user_json) = storage.load().unwrap();
        assert!(user_json.unwrap().contains("Ada Lovelace"));
    }

    #[test]
    fn test_check_auth_status_reconciles_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        let mut session = SessionStore::new(storage.clone());
        session.restore_session();
        assert!(!session.state().is_authenticated());

        // Another process logged in behind our back
        storage.save("tok2", &serde_json::to_string(&ada()).unwrap()).unwrap();
        assert!(session.check_auth_status());
        assert_eq!(session.guard().unwrap(), "tok2");

        // Idempotent
        assert!(session.check_auth_status());
        assert_eq!(session.guard().unwrap(), "tok2");
    }

    #[test]
    fn test_logout_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        let mut session = SessionStore::new(storage.clone());
        session.login(&FakeAuth::new(), &creds("ada", "secret")).unwrap();

        session.logout();
        session.logout();

        assert_eq!(*session.state(), AuthState::Unauthenticated);
        assert_eq!(storage.load().unwrap(), (None, None));
    }

    #[test]
    fn test_forgot_password_flow() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionStore::new(SessionStorage::new(dir.path()));
        let auth = FakeAuth::new();

        assert_eq!(session.security_question(&auth, "ada").unwrap(), "First pet?");
        assert!(session.security_question(&auth, " ").is_err());

        let reset = PasswordReset {
            username: "ada".to_string(),
            security_answer: "Rex".to_string(),
            new_password: "new".to_string(),
        };
        assert!(session.reset_password(&auth, &reset).is_ok());
        assert!(!session.state().is_authenticated());
    }
}
