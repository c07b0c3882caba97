use std::path::Path;

use tracing::warn;

use crate::analytics::{Analytics, Period};
use crate::api::{ApiClient, AuthBackend, JobsBackend};
use crate::error::{Error, Result};
use crate::feedback::{MatchReport, ResumeReview};
use crate::jobs::JobStore;
use crate::models::{Credentials, Job, JobPatch, NewJob, PasswordReset, SignupForm, User};
use crate::notify::Notifier;
use crate::pipeline::JobStatus;
use crate::session::SessionStore;
use crate::storage::SessionStorage;

/// Session and job cache wired together.
///
/// The session gates the job store: every session transition is followed by
/// a job sync, and any protected call rejected as unauthenticated forces a
/// logout.
pub struct App<'n, B> {
    backend: B,
    session: SessionStore,
    jobs: JobStore<'n>,
}

impl<'n, B: AuthBackend + JobsBackend> App<'n, B> {
    pub fn new(backend: B, storage: SessionStorage, notifier: &'n dyn Notifier) -> Self {
        Self {
            backend,
            session: SessionStore::new(storage),
            jobs: JobStore::new(notifier),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn jobs(&self) -> &JobStore<'n> {
        &self.jobs
    }

    /// Startup: restore the stored session, then refresh the user record on a
    /// best-effort basis. Jobs are not fetched here; commands that read the
    /// cache call `load_jobs` themselves.
    pub fn restore(&mut self) -> bool {
        let restored = self.session.restore_session();
        if restored {
            self.session.refresh_user(&self.backend);
        }
        restored
    }

    /// The job fetch that follows a login is reported through the notifier on
    /// failure but does not undo the login.
    pub fn login(&mut self, credentials: &Credentials) -> Result<User> {
        let user = self.session.login(&self.backend, credentials)?;
        self.sync_jobs();
        Ok(user)
    }

    pub fn signup(&mut self, form: &SignupForm) -> Result<User> {
        let user = self.session.signup(&self.backend, form)?;
        self.sync_jobs();
        Ok(user)
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.sync_jobs();
    }

    pub fn security_question(&self, username: &str) -> Result<String> {
        self.session.security_question(&self.backend, username)
    }

    pub fn reset_password(&self, reset: &PasswordReset) -> Result<()> {
        self.session.reset_password(&self.backend, reset)
    }

    fn sync_jobs(&mut self) {
        if let Err(e) = self.jobs.sync_with(self.session.state(), &self.backend) {
            warn!(error = %e, "job sync after session change failed");
        }
    }

    /// Token for a protected call. Reconciles with storage first, like a
    /// route guard re-checking before it redirects.
    pub fn guard(&mut self) -> Result<String> {
        if !self.session.state().is_authenticated() {
            self.session.check_auth_status();
        }
        self.session.guard().map(str::to_string)
    }

    fn checked<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(Error::Auth(reason)) = &result {
            warn!(reason = %reason, "token rejected; logging out");
            self.logout();
        }
        result
    }

    pub fn load_jobs(&mut self) -> Result<()> {
        let token = self.guard()?;
        let result = self.jobs.refresh(&self.backend, &token);
        self.checked(result)
    }

    pub fn add_job(&mut self, job: &NewJob) -> Result<Job> {
        let token = self.guard()?;
        let result = self.jobs.add(&self.backend, &token, job).cloned();
        self.checked(result)
    }

    pub fn update_job(&mut self, job: &Job) -> Result<Job> {
        let token = self.guard()?;
        let result = self.jobs.update(&self.backend, &token, job).cloned();
        self.checked(result)
    }

    pub fn edit_job(&mut self, id: &str, patch: &JobPatch) -> Result<Job> {
        let current = self
            .jobs
            .get(id)
            .ok_or_else(|| Error::Validation(format!("no job with id '{}'", id)))?;
        let updated = patch.apply(current);
        self.update_job(&updated)
    }

    pub fn move_job(&mut self, id: &str, status: JobStatus) -> Result<Job> {
        let token = self.guard()?;
        let result = self.jobs.move_to(&self.backend, &token, id, status).cloned();
        self.checked(result)
    }

    pub fn remove_job(&mut self, id: &str) -> Result<()> {
        let token = self.guard()?;
        let result = self.jobs.remove(&self.backend, &token, id);
        self.checked(result)
    }
}

/// Endpoints that only the real client serves.
impl App<'_, ApiClient> {
    pub fn analytics(&mut self, period: Period) -> Result<Analytics> {
        let token = self.guard()?;
        let result = self.backend.analytics(&token, period);
        self.checked(result)
    }

    /// Uploads go out with the session token when there is one.
    pub fn resume_feedback(&mut self, resume: &Path) -> Result<ResumeReview> {
        let token = self.guard().ok();
        let result = self.backend.resume_feedback(token.as_deref(), resume);
        self.checked(result)
    }

    pub fn match_documents(&mut self, resume: &Path, jd: &Path) -> Result<MatchReport> {
        let token = self.guard().ok();
        let result = self.backend.match_documents(token.as_deref(), resume, jd);
        self.checked(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::tests::{FakeJobs, acme};
    use crate::models::AuthResponse;
    use crate::notify::Recorder;
    use crate::session::tests::{FakeAuth, creds};

    struct FakeBackend {
        auth: FakeAuth,
        jobs: FakeJobs,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                auth: FakeAuth::new(),
                jobs: FakeJobs::new(),
            }
        }
    }

    impl AuthBackend for FakeBackend {
        fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
            self.auth.login(credentials)
        }
        fn signup(&self, form: &SignupForm) -> Result<AuthResponse> {
            self.auth.signup(form)
        }
        fn me(&self, token: &str) -> Result<User> {
            self.auth.me(token)
        }
        fn security_question(&self, username: &str) -> Result<String> {
            self.auth.security_question(username)
        }
        fn reset_password(&self, reset: &PasswordReset) -> Result<()> {
            self.auth.reset_password(reset)
        }
    }

    impl JobsBackend for FakeBackend {
        fn list_jobs(&self, token: &str) -> Result<Vec<Job>> {
            if token == "revoked" {
                return Err(Error::Auth("jwt expired".to_string()));
            }
            self.jobs.list_jobs(token)
        }
        fn create_job(&self, token: &str, job: &NewJob) -> Result<Job> {
            self.jobs.create_job(token, job)
        }
        fn update_job(&self, token: &str, job: &Job) -> Result<Job> {
            self.jobs.update_job(token, job)
        }
        fn delete_job(&self, token: &str, id: &str) -> Result<()> {
            self.jobs.delete_job(token, id)
        }
    }

    #[test]
    fn test_login_then_protected_access() {
        let dir = tempfile::tempdir().unwrap();
        let notes = Recorder::new();
        let backend = FakeBackend::new();
        backend.jobs.seed("tok-ada", acme());
        let mut app = App::new(backend, SessionStorage::new(dir.path()), &notes);
        app.restore();

        assert!(app.guard().is_err());
        app.login(&creds("ada", "secret")).unwrap();

        assert_eq!(app.guard().unwrap(), "tok-ada");
        assert_eq!(app.jobs().list().len(), 1);
    }

    #[test]
    fn test_failed_login_keeps_protected_commands_closed() {
        let dir = tempfile::tempdir().unwrap();
        let notes = Recorder::new();
        let mut app = App::new(FakeBackend::new(), SessionStorage::new(dir.path()), &notes);
        app.restore();

        assert!(app.login(&creds("ada", "nope")).unwrap_err().is_auth());
        assert!(app.add_job(&acme()).unwrap_err().is_auth());
        assert_eq!(app.backend.jobs.calls.get(), 0);
    }

    #[test]
    fn test_logout_empties_job_list() {
        let dir = tempfile::tempdir().unwrap();
        let notes = Recorder::new();
        let mut app = App::new(FakeBackend::new(), SessionStorage::new(dir.path()), &notes);
        app.restore();
        app.login(&creds("ada", "secret")).unwrap();
        app.add_job(&acme()).unwrap();
        app.add_job(&acme()).unwrap();
        assert_eq!(app.jobs().list().len(), 2);

        app.logout();

        assert!(app.jobs().list().is_empty());
        assert!(!app.session().state().is_authenticated());
    }

    #[test]
    fn test_rejected_token_forces_logout() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        storage
            .save("revoked", &serde_json::to_string(&crate::session::tests::ada()).unwrap())
            .unwrap();
        let notes = Recorder::new();
        let mut app = App::new(FakeBackend::new(), storage.clone(), &notes);
        assert!(app.restore());

        let err = app.load_jobs().unwrap_err();

        assert!(err.is_auth());
        assert!(!app.session().state().is_authenticated());
        assert_eq!(storage.load().unwrap(), (None, None));
    }

    #[test]
    fn test_restore_refreshes_user_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path());
        storage
            .save("tok-ada", &serde_json::to_string(&crate::session::tests::ada()).unwrap())
            .unwrap();
        let notes = Recorder::new();
        let backend = FakeBackend::new();
        backend.auth.me_fails.set(true);
        let mut app = App::new(backend, storage, &notes);

        assert!(app.restore());
        assert!(app.session().state().is_authenticated());
        assert_eq!(app.backend.auth.me_calls.get(), 1);
    }

    #[test]
    fn test_edit_and_move_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let notes = Recorder::new();
        let mut app = App::new(FakeBackend::new(), SessionStorage::new(dir.path()), &notes);
        app.restore();
        app.login(&creds("ada", "secret")).unwrap();
        let id = app.add_job(&acme()).unwrap().id;

        let patch = JobPatch {
            notes: Some("Referred by Bob".to_string()),
            ..Default::default()
        };
        assert_eq!(app.edit_job(&id, &patch).unwrap().notes, "Referred by Bob");

        app.move_job(&id, JobStatus::Interview).unwrap();
        assert_eq!(app.jobs().by_status(JobStatus::Interview).len(), 1);
        assert!(app.jobs().by_status(JobStatus::Applied).is_empty());

        app.remove_job(&id).unwrap();
        assert!(app.jobs().get(&id).is_none());
        assert!(app.edit_job(&id, &patch).is_err());
    }

    #[test]
    fn test_switching_account_never_shows_previous_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let notes = Recorder::new();
        let mut app = App::new(FakeBackend::new(), SessionStorage::new(dir.path()), &notes);
        app.restore();
        app.login(&creds("ada", "secret")).unwrap();
        app.add_job(&acme()).unwrap();
        app.backend.jobs.offline.set(true);

        let form = SignupForm {
            username: "bob".to_string(),
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "hunter2".to_string(),
            security_question: "First pet?".to_string(),
            security_answer: "Rex".to_string(),
        };
        app.signup(&form).unwrap();

        assert_eq!(app.session().user().unwrap().username, "bob");
        assert_eq!(app.guard().unwrap(), "tok-bob");
        assert!(app.jobs().list().is_empty());
    }
}
