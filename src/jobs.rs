use tracing::{debug, error};

use crate::api::JobsBackend;
use crate::error::{Error, Result};
use crate::models::{Job, NewJob};
use crate::notify::Notifier;
use crate::pipeline::{self, JobStatus};
use crate::reminders;
use crate::session::AuthState;

/// The current session's jobs, kept in step with the backend.
///
/// Every write goes to the backend first; the cache only changes once the
/// backend has confirmed it. A failed call is reported once through the
/// notifier and then returned so the caller can abort its own flow.
pub struct JobStore<'n> {
    jobs: Vec<Job>,
    /// Token the cached jobs were loaded under.
    owner: Option<String>,
    notifier: &'n dyn Notifier,
}

impl<'n> JobStore<'n> {
    pub fn new(notifier: &'n dyn Notifier) -> Self {
        Self {
            jobs: Vec::new(),
            owner: None,
            notifier,
        }
    }

    pub fn list(&self) -> &[Job] {
        &self.jobs
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    /// Pure filter over the cache; no request is made.
    pub fn by_status(&self, status: JobStatus) -> Vec<&Job> {
        pipeline::bucket(&self.jobs, status)
    }

    pub fn recent(&self, limit: usize) -> Vec<&Job> {
        reminders::recent_jobs(&self.jobs, limit)
    }

    pub fn clear(&mut self) {
        if !self.jobs.is_empty() {
            debug!(count = self.jobs.len(), "clearing job cache");
        }
        self.jobs.clear();
        self.owner = None;
    }

    /// Drops jobs cached under another token before acting for `token`.
    fn scope_to(&mut self, token: &str) {
        if self.owner.as_deref() != Some(token) {
            self.clear();
            self.owner = Some(token.to_string());
        }
    }

    /// Follow a session transition: refetch on login, empty on logout, so one
    /// account's jobs are never shown to the next.
    pub fn sync_with(&mut self, state: &AuthState, backend: &dyn JobsBackend) -> Result<()> {
        match state {
            AuthState::Authenticated { token, .. } => self.refresh(backend, token),
            AuthState::Unauthenticated | AuthState::Uninitialized => {
                self.clear();
                Ok(())
            }
        }
    }

    /// Full refetch. On failure the cache keeps what it held for the same
    /// token; a different token never sees it.
    pub fn refresh(&mut self, backend: &dyn JobsBackend, token: &str) -> Result<()> {
        self.scope_to(token);
        match backend.list_jobs(token) {
            Ok(jobs) => {
                debug!(count = jobs.len(), "loaded jobs");
                self.jobs = jobs;
                Ok(())
            }
            Err(e) => Err(self.report("Failed to load jobs", e)),
        }
    }

    pub fn add(&mut self, backend: &dyn JobsBackend, token: &str, job: &NewJob) -> Result<&Job> {
        job.validate()?;
        self.scope_to(token);
        match backend.create_job(token, job) {
            Ok(created) => {
                debug!(id = %created.id, company = %created.company, "job added");
                self.jobs.push(created);
                self.notifier.success("Job added successfully!");
                let last = self.jobs.len() - 1;
                Ok(&self.jobs[last])
            }
            Err(e) => Err(self.report("Failed to add job", e)),
        }
    }

    /// Sends the full record. The cached copy is replaced with what the
    /// backend returned, which may move it to another pipeline bucket. Only
    /// jobs already in this session's cache can be updated.
    pub fn update(&mut self, backend: &dyn JobsBackend, token: &str, job: &Job) -> Result<&Job> {
        job.validate()?;
        self.scope_to(token);
        let Some(idx) = self.jobs.iter().position(|j| j.id == job.id) else {
            return Err(Error::Validation(format!("no job with id '{}' in this session", job.id)));
        };
        match backend.update_job(token, job) {
            Ok(updated) => {
                debug!(id = %updated.id, status = %updated.status, "job updated");
                self.jobs[idx] = updated;
                self.notifier.success("Job updated successfully!");
                Ok(&self.jobs[idx])
            }
            Err(e) => Err(self.report("Failed to update job", e)),
        }
    }

    /// Convenience for a pure status move; still sends the full record.
    pub fn move_to(&mut self, backend: &dyn JobsBackend, token: &str, id: &str, status: JobStatus) -> Result<&Job> {
        let mut job = self
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("no job with id '{}' in this session", id)))?;
        job.status = status;
        self.update(backend, token, &job)
    }

    pub fn remove(&mut self, backend: &dyn JobsBackend, token: &str, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(Error::Validation("job has no identifier and cannot be deleted".to_string()));
        }
        self.scope_to(token);
        match backend.delete_job(token, id) {
            Ok(()) => {
                debug!(id, "job removed");
                self.jobs.retain(|job| job.id != id);
                self.notifier.success("Job removed successfully!");
                Ok(())
            }
            Err(e) => Err(self.report("Failed to delete job", e)),
        }
    }

    fn report(&self, message: &str, err: Error) -> Error {
        error!(error = %err, "{}", message);
        self.notifier.failure(message);
        err
    }
}
