use std::path::Path;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::analytics::{Analytics, Period};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::feedback::{MatchReport, ResumeReview, check_upload};
use crate::models::{AuthResponse, Credentials, Job, NewJob, PasswordReset, SignupForm, User};

// --- Collaborator traits ---

/// The authentication service: issues tokens and validates credentials.
pub trait AuthBackend {
    fn login(&self, credentials: &Credentials) -> Result<AuthResponse>;
    fn signup(&self, form: &SignupForm) -> Result<AuthResponse>;
    fn me(&self, token: &str) -> Result<User>;
    fn security_question(&self, username: &str) -> Result<String>;
    fn reset_password(&self, reset: &PasswordReset) -> Result<()>;
}

/// The job collection endpoint, scoped by the bearer token's user.
pub trait JobsBackend {
    fn list_jobs(&self, token: &str) -> Result<Vec<Job>>;
    fn create_job(&self, token: &str, job: &NewJob) -> Result<Job>;
    fn update_job(&self, token: &str, job: &Job) -> Result<Job>;
    fn delete_job(&self, token: &str, id: &str) -> Result<()>;
}

// --- HTTP implementation ---

#[derive(Debug, Deserialize)]
struct MeResponse {
    user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecurityQuestionResponse {
    security_question: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            base_url: config.api_url.clone(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, request: RequestBuilder, what: &str, credentials_check: bool) -> Result<Response> {
        let response = request.send().map_err(|e| match Error::from(e) {
            Error::Network(msg) => Error::Network(format!("{}: {}", what, msg)),
            other => other,
        })?;
        check_status(response, what, credentials_check)
    }

    pub fn analytics(&self, token: &str, period: Period) -> Result<Analytics> {
        let request = self
            .client
            .get(self.url("/api/jobs/analytics"))
            .query(&[("period", period.as_str())])
            .bearer_auth(token);
        let response = self.send(request, "load analytics", false)?;
        decode(response, "analytics")
    }

    pub fn resume_feedback(&self, token: Option<&str>, resume: &Path) -> Result<ResumeReview> {
        check_upload(resume)?;
        let form = multipart::Form::new()
            .file("resume", resume)
            .map_err(|e| Error::Validation(format!("cannot read {}: {}", resume.display(), e)))?;
        let mut request = self.client.post(self.url("/api/resume-feedback")).multipart(form);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = self.send(request, "resume feedback", false)?;
        decode(response, "resume feedback")
    }

    pub fn match_documents(&self, token: Option<&str>, resume: &Path, jd: &Path) -> Result<MatchReport> {
        check_upload(resume)?;
        check_upload(jd)?;
        let form = multipart::Form::new()
            .file("resume", resume)
            .and_then(|form| form.file("jd", jd))
            .map_err(|e| Error::Validation(format!("cannot read upload: {}", e)))?;
        let mut request = self.client.post(self.url("/api/match")).multipart(form);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = self.send(request, "resume/JD match", false)?;
        decode(response, "match")
    }
}

impl AuthBackend for ApiClient {
    fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
        let request = self.client.post(self.url("/api/auth/login")).json(credentials);
        let response = self.send(request, "login", true)?;
        let auth: AuthResponse = decode(response, "login")?;
        validate_auth(auth)
    }

    fn signup(&self, form: &SignupForm) -> Result<AuthResponse> {
        let request = self.client.post(self.url("/api/auth/signup")).json(form);
        let response = self.send(request, "signup", true)?;
        let auth: AuthResponse = decode(response, "signup")?;
        validate_auth(auth)
    }

    fn me(&self, token: &str) -> Result<User> {
        let request = self.client.get(self.url("/api/auth/me")).bearer_auth(token);
        let response = self.send(request, "load profile", false)?;
        let me: MeResponse = decode(response, "profile")?;
        Ok(me.user)
    }

    fn security_question(&self, username: &str) -> Result<String> {
        let request = self
            .client
            .get(self.url("/api/auth/security-question"))
            .query(&[("username", username)]);
        let response = self.send(request, "security question", true)?;
        let body: SecurityQuestionResponse = decode(response, "security question")?;
        Ok(body.security_question)
    }

    fn reset_password(&self, reset: &PasswordReset) -> Result<()> {
        let request = self.client.post(self.url("/api/auth/forgot-password")).json(reset);
        self.send(request, "password reset", true)?;
        Ok(())
    }
}

impl JobsBackend for ApiClient {
    fn list_jobs(&self, token: &str) -> Result<Vec<Job>> {
        let request = self.client.get(self.url("/api/jobs")).bearer_auth(token);
        let response = self.send(request, "load jobs", false)?;
        let jobs: Vec<Job> = decode(response, "job list")?;
        jobs.into_iter().map(validate_job).collect()
    }

    fn create_job(&self, token: &str, job: &NewJob) -> Result<Job> {
        let request = self.client.post(self.url("/api/jobs")).bearer_auth(token).json(job);
        let response = self.send(request, "add job", false)?;
        validate_job(decode(response, "created job")?)
    }

    fn update_job(&self, token: &str, job: &Job) -> Result<Job> {
        let request = self
            .client
            .put(self.url(&format!("/api/jobs/{}", job.id)))
            .bearer_auth(token)
            .json(job);
        let response = self.send(request, "update job", false)?;
        let updated = validate_job(decode(response, "updated job")?)?;
        if updated.id != job.id {
            return Err(Error::Network(format!(
                "backend returned job '{}' for an update of '{}'",
                updated.id, job.id
            )));
        }
        Ok(updated)
    }

    fn delete_job(&self, token: &str, id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/api/jobs/{}", id)))
            .bearer_auth(token);
        self.send(request, "delete job", false)?;
        Ok(())
    }
}

// --- Response checks ---

/// 401/403 always mean the token is no good. When `credentials_check` is set
/// (login, signup, password recovery) any other 4xx is also a credential
/// rejection rather than a transport failure.
fn check_status(response: Response, what: &str, credentials_check: bool) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        debug!(%status, what, "request succeeded");
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let detail = error_detail(&body).unwrap_or_else(|| status.to_string());
    warn!(%status, what, detail = %detail, "request rejected");

    let is_auth = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || (credentials_check && status.is_client_error());
    if is_auth {
        Err(Error::Auth(detail))
    } else {
        Err(Error::Network(format!("{} failed with status {}: {}", what, status, detail)))
    }
}

fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.message.or(parsed.error).filter(|m| !m.trim().is_empty())
}

fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let body = response.text()?;
    parse_body(&body, what)
}

fn parse_body<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::Network(format!("malformed {} response: {}", what, e)))
}

fn validate_job(job: Job) -> Result<Job> {
    if job.id.trim().is_empty() {
        return Err(Error::Network("malformed job response: missing identifier".to_string()));
    }
    Ok(job)
}

fn validate_auth(auth: AuthResponse) -> Result<AuthResponse> {
    if auth.token.trim().is_empty() {
        return Err(Error::Network("malformed auth response: empty token".to_string()));
    }
    Ok(auth)
}
