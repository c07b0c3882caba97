use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;
use crate::models::Job;

/// Where an application currently sits.
///
/// The states are flat and any state may move to any other; moves only
/// happen through an explicit edit of the job's status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Applied,
    Interview,
    Offered,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Applied,
        JobStatus::Interview,
        JobStatus::Offered,
        JobStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Applied => "applied",
            JobStatus::Interview => "interview",
            JobStatus::Offered => "offered",
            JobStatus::Rejected => "rejected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Interview => "Interview",
            JobStatus::Offered => "Offered",
            JobStatus::Rejected => "Rejected",
        }
    }

    /// Membership test for a pipeline bucket.
    pub fn holds(&self, job: &Job) -> bool {
        job.status == *self
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "unknown status '{}' (expected applied, interview, offered or rejected)",
                    s
                ))
            })
    }
}

/// Every job filtered into its bucket, in cache order.
pub fn bucket<'a>(jobs: &'a [Job], status: JobStatus) -> Vec<&'a Job> {
    jobs.iter().filter(|job| status.holds(job)).collect()
}

/// A snapshot of the whole pipeline, one bucket per status.
#[derive(Debug)]
pub struct Board<'a> {
    buckets: [(JobStatus, Vec<&'a Job>); 4],
}

impl<'a> Board<'a> {
    pub fn from_jobs(jobs: &'a [Job]) -> Self {
        Self {
            buckets: JobStatus::ALL.map(|status| (status, bucket(jobs, status))),
        }
    }

    pub fn jobs(&self, status: JobStatus) -> &[&'a Job] {
        self.buckets
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, jobs)| jobs.as_slice())
            .unwrap_or(&[])
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs(status).len()
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|(_, jobs)| jobs.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (JobStatus, &[&'a Job])> {
        self.buckets.iter().map(|(status, jobs)| (*status, jobs.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewJob;
    use chrono::NaiveDate;

    fn job(id: &str, status: JobStatus) -> Job {
        let mut new = NewJob::new("Acme", "Engineer", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        new.status = status;
        new.with_id(id.to_string())
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("Interview".parse::<JobStatus>().unwrap(), JobStatus::Interview);
        assert_eq!(" offered ".parse::<JobStatus>().unwrap(), JobStatus::Offered);
        assert!("ghosted".parse::<JobStatus>().is_err());
        assert_eq!(JobStatus::Rejected.to_string(), "rejected");
        assert_eq!(JobStatus::Applied.label(), "Applied");
    }

    #[test]
    fn test_board_places_each_job_in_exactly_one_bucket() {
        let jobs = vec![
            job("1", JobStatus::Applied),
            job("2", JobStatus::Interview),
            job("3", JobStatus::Applied),
            job("4", JobStatus::Rejected),
        ];
        let board = Board::from_jobs(&jobs);

        assert_eq!(board.total(), jobs.len());
        assert_eq!(board.count(JobStatus::Applied), 2);
        assert_eq!(board.count(JobStatus::Offered), 0);
        for j in &jobs {
            let holding: Vec<JobStatus> = board
                .iter()
                .filter(|(_, bucket)| bucket.iter().any(|b| b.id == j.id))
                .map(|(status, _)| status)
                .collect();
            assert_eq!(holding, vec![j.status]);
        }
    }

    #[test]
    fn test_bucket_keeps_cache_order() {
        let jobs = vec![
            job("b", JobStatus::Offered),
            job("a", JobStatus::Offered),
        ];
        let ids: Vec<&str> = bucket(&jobs, JobStatus::Offered).iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
