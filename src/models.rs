use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::JobStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    Internship,
    #[serde(rename = "Full-Time")]
    FullTime,
    #[serde(rename = "IT + FT")]
    InternshipPlusFullTime,
    #[serde(rename = "IT + PBC")]
    InternshipPlusPbc,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::Internship,
        JobType::FullTime,
        JobType::InternshipPlusFullTime,
        JobType::InternshipPlusPbc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Internship => "Internship",
            JobType::FullTime => "Full-Time",
            JobType::InternshipPlusFullTime => "IT + FT",
            JobType::InternshipPlusPbc => "IT + PBC",
        }
    }
}

impl std::str::FromStr for JobType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace(' ', "");
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str().to_lowercase().replace(' ', "") == wanted)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "unknown job type '{}' (expected Internship, Full-Time, IT + FT or IT + PBC)",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkMode {
    OnCampus,
    OffCampus,
}

impl WorkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkMode::OnCampus => "on-campus",
            WorkMode::OffCampus => "off-campus",
        }
    }
}

impl std::str::FromStr for WorkMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "on-campus" | "on" | "oncampus" => Ok(WorkMode::OnCampus),
            "off-campus" | "off" | "offcampus" => Ok(WorkMode::OffCampus),
            other => Err(Error::Validation(format!(
                "unknown mode '{}' (expected on-campus or off-campus)",
                other
            ))),
        }
    }
}

/// A tracked application as stored by the backend.
///
/// `id` is assigned by the backend and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "_id")]
    pub id: String,
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub pay: String,
    #[serde(with = "date_format")]
    pub date_applied: NaiveDate,
    #[serde(default, with = "optional_date_format", skip_serializing_if = "Option::is_none")]
    pub interview_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "empty_job_type_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub job_type: Option<JobType>,
    pub status: JobStatus,
    pub mode: WorkMode,
    #[serde(default)]
    pub notes: String,
}

/// A job that has not been sent to the backend yet, so it has no identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub company: String,
    pub role: String,
    pub pay: String,
    #[serde(with = "date_format")]
    pub date_applied: NaiveDate,
    #[serde(default, with = "optional_date_format", skip_serializing_if = "Option::is_none")]
    pub interview_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<JobType>,
    pub status: JobStatus,
    pub mode: WorkMode,
    pub notes: String,
}

impl NewJob {
    pub fn new(company: &str, role: &str, date_applied: NaiveDate) -> Self {
        Self {
            company: company.to_string(),
            role: role.to_string(),
            pay: String::new(),
            date_applied,
            interview_date: None,
            job_type: None,
            status: JobStatus::Applied,
            mode: WorkMode::OnCampus,
            notes: String::new(),
        }
    }

    /// Required-field check run before anything is sent.
    pub fn validate(&self) -> Result<()> {
        if self.company.trim().is_empty() {
            return Err(Error::Validation("company is required".to_string()));
        }
        if self.role.trim().is_empty() {
            return Err(Error::Validation("role is required".to_string()));
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn with_id(self, id: String) -> Job {
        Job {
            id,
            company: self.company,
            role: self.role,
            pay: self.pay,
            date_applied: self.date_applied,
            interview_date: self.interview_date,
            job_type: self.job_type,
            status: self.status,
            mode: self.mode,
            notes: self.notes,
        }
    }
}

impl Job {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation(
                "job has no identifier and cannot be modified".to_string(),
            ));
        }
        if self.company.trim().is_empty() {
            return Err(Error::Validation("company is required".to_string()));
        }
        if self.role.trim().is_empty() {
            return Err(Error::Validation("role is required".to_string()));
        }
        Ok(())
    }
}

/// Optional overrides applied on top of an existing record.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub company: Option<String>,
    pub role: Option<String>,
    pub pay: Option<String>,
    pub date_applied: Option<NaiveDate>,
    /// `Some(None)` clears the interview date.
    pub interview_date: Option<Option<NaiveDate>>,
    pub job_type: Option<Option<JobType>>,
    pub status: Option<JobStatus>,
    pub mode: Option<WorkMode>,
    pub notes: Option<String>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self.company.is_none()
            && self.role.is_none()
            && self.pay.is_none()
            && self.date_applied.is_none()
            && self.interview_date.is_none()
            && self.job_type.is_none()
            && self.status.is_none()
            && self.mode.is_none()
            && self.notes.is_none()
    }

    pub fn apply(&self, job: &Job) -> Job {
        let mut updated = job.clone();
        if let Some(company) = &self.company {
            updated.company = company.clone();
        }
        if let Some(role) = &self.role {
            updated.role = role.clone();
        }
        if let Some(pay) = &self.pay {
            updated.pay = pay.clone();
        }
        if let Some(date) = self.date_applied {
            updated.date_applied = date;
        }
        if let Some(date) = self.interview_date {
            updated.interview_date = date;
        }
        if let Some(job_type) = self.job_type {
            updated.job_type = job_type;
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        if let Some(mode) = self.mode {
            updated.mode = mode;
        }
        if let Some(notes) = &self.notes {
            updated.notes = notes.clone();
        }
        updated
    }
}

// --- Auth payloads ---

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::Validation("username is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(Error::Validation("password is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub security_question: String,
    pub security_answer: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("username", &self.username),
            ("name", &self.name),
            ("email", &self.email),
            ("password", &self.password),
            ("security question", &self.security_question),
            ("security answer", &self.security_answer),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("{} is required", field)));
            }
        }
        if !self.email.contains('@') {
            return Err(Error::Validation(format!("'{}' is not an email address", self.email)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub username: String,
    pub security_answer: String,
    pub new_password: String,
}

fn empty_job_type_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<JobType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Dates travel as `YYYY-MM-DD`; full ISO timestamps are accepted on input
/// and truncated to their calendar date.
pub mod date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveDate, String> {
        let trimmed = raw.trim();
        let day = trimmed.get(..10).unwrap_or(trimmed);
        NaiveDate::parse_from_str(day, FORMAT).map_err(|e| format!("invalid date '{}': {}", raw, e))
    }
}

pub mod optional_date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => super::date_format::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::date_format::parse(s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
