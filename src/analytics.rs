use std::fmt;

use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Last30Days,
    Last90Days,
    AllTime,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Last30Days => "last30days",
            Period::Last90Days => "last90days",
            Period::AllTime => "alltime",
        }
    }
}

impl std::str::FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "last30days" | "30d" | "30" => Ok(Period::Last30Days),
            "last90days" | "90d" | "90" => Ok(Period::Last90Days),
            "alltime" | "all" => Ok(Period::AllTime),
            _ => Err(Error::Validation(format!(
                "unknown period '{}' (expected last30days, last90days or alltime)",
                s
            ))),
        }
    }
}

/// A figure the backend sends either as a JSON number or as text such as
/// `"42.5%"` or `"7 days"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Number(f64),
    Text(String),
}

impl Metric {
    /// Numeric value, reading the leading number out of text forms.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Metric::Number(n) => Some(*n),
            Metric::Text(s) => {
                let s = s.trim();
                let end = s
                    .char_indices()
                    .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-')))
                    .map(|(i, _)| i)
                    .unwrap_or(s.len());
                s[..end].parse().ok()
            }
        }
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Number(0.0)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Metric::Number(n) => write!(f, "{:.1}", n),
            Metric::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(default)]
    pub total_applications: Metric,
    #[serde(default)]
    pub interview_rate: Metric,
    #[serde(default)]
    pub offer_rate: Metric,
    #[serde(default)]
    pub avg_response_time: Metric,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusCount {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimePoint {
    pub date: String,
    #[serde(default)]
    pub count: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleBreakdown {
    pub name: String,
    #[serde(default)]
    pub applied: f64,
    #[serde(default)]
    pub interview: f64,
    #[serde(default)]
    pub offered: f64,
}

/// Aggregates computed by the backend. Nothing here is derived client-side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub status_distribution: Vec<StatusCount>,
    #[serde(default)]
    pub time_data: Vec<TimePoint>,
    #[serde(default)]
    pub role_data: Vec<RoleBreakdown>,
}

impl Analytics {
    pub fn status_count(&self, name: &str) -> f64 {
        self.status_distribution
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.value)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    pub title: &'static str,
    pub description: &'static str,
}

/// Advice derived from the backend's figures.
pub fn insights(data: &Analytics) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(rate) = data.summary.interview_rate.as_f64() {
        if rate > 30.0 {
            insights.push(Insight {
                title: "Strong interview conversion rate",
                description: "Your application-to-interview rate is above average. Keep up the good work!",
            });
        } else if rate < 15.0 {
            insights.push(Insight {
                title: "Consider improving application targeting",
                description: "Your interview rate is below average. Consider focusing on roles that better match your skills.",
            });
        }
    }

    if let Some(rate) = data.summary.offer_rate.as_f64() {
        if rate > 20.0 {
            insights.push(Insight {
                title: "Excellent offer conversion rate",
                description: "You're converting interviews to offers at a high rate. Your interview skills are strong!",
            });
        } else if rate < 5.0 {
            insights.push(Insight {
                title: "Interview preparation opportunity",
                description: "Consider practicing common interview questions and improving your interview skills.",
            });
        }
    }

    if let Some(days) = data.summary.avg_response_time.as_f64() {
        if days.trunc() > 14.0 {
            insights.push(Insight {
                title: "Long response times",
                description: "Companies are taking longer to respond. Consider following up after 1-2 weeks.",
            });
        }
    }

    let applied = data.status_count("Applied");
    let interview = data.status_count("Interview");
    if applied > 0.0 && interview > 0.0 && interview / applied > 0.4 {
        insights.push(Insight {
            title: "High interview conversion",
            description: "You're getting interviews for a large portion of your applications. Your resume is working well!",
        });
    }

    insights
}
