mod analytics;
mod api;
mod app;
mod config;
mod error;
mod feedback;
mod jobs;
mod models;
mod notify;
mod pipeline;
mod reminders;
mod session;
mod storage;
mod tui;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use analytics::Period;
use api::ApiClient;
use app::App;
use config::Config;
use feedback::{FeedbackSections, SectionBody, Slot, render_body};
use models::{Credentials, Job, JobPatch, JobType, NewJob, PasswordReset, SignupForm, WorkMode};
use notify::{ConsoleNotifier, Notifier, Recorder};
use pipeline::JobStatus;
use storage::SessionStorage;

#[derive(Parser)]
#[command(name = "jobwise")]
#[command(about = "Track job applications through the hiring pipeline")]
struct Cli {
    /// Backend base URL (overrides JOBWISE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        username: String,

        #[arg(long, env = "JOBWISE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and log in
    Signup {
        username: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "JOBWISE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Security question used for password recovery
        #[arg(long)]
        question: String,

        #[arg(long)]
        answer: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Show the security question, or reset the password when answered
    ForgotPassword {
        username: String,

        #[arg(long)]
        answer: Option<String>,

        #[arg(long, env = "JOBWISE_NEW_PASSWORD", hide_env_values = true)]
        new_password: Option<String>,
    },

    /// Track a new application
    Add {
        company: String,

        role: String,

        /// Date applied (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        interview: Option<NaiveDate>,

        #[arg(long, default_value = "")]
        pay: String,

        /// Internship, Full-Time, "IT + FT" or "IT + PBC"
        #[arg(short = 't', long)]
        job_type: Option<JobType>,

        #[arg(short, long, default_value = "applied")]
        status: JobStatus,

        /// on-campus or off-campus
        #[arg(short, long, default_value = "on-campus")]
        mode: WorkMode,

        #[arg(short, long, default_value = "")]
        notes: String,
    },

    /// List applications
    List {
        /// Filter by status (applied, interview, offered, rejected)
        #[arg(short, long)]
        status: Option<JobStatus>,
    },

    /// Show one application
    Show {
        id: String,
    },

    /// Change fields of an application
    Edit {
        id: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        pay: Option<String>,

        #[arg(short, long)]
        date: Option<NaiveDate>,

        #[arg(long, conflicts_with = "clear_interview")]
        interview: Option<NaiveDate>,

        #[arg(long)]
        clear_interview: bool,

        #[arg(short = 't', long)]
        job_type: Option<JobType>,

        #[arg(short, long)]
        status: Option<JobStatus>,

        #[arg(short, long)]
        mode: Option<WorkMode>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Move an application to another pipeline stage
    Move {
        id: String,

        status: JobStatus,
    },

    /// Delete an application
    Rm {
        id: String,
    },

    /// Browse the pipeline interactively
    Board,

    /// Most recent applications
    Recent {
        #[arg(short, long, default_value_t = reminders::RECENT_LIMIT)]
        limit: usize,
    },

    /// Interviews in the next seven days
    Upcoming,

    /// Application statistics computed by the backend
    Analytics {
        /// last30days, last90days or alltime
        #[arg(short, long, default_value = "last30days")]
        period: Period,
    },

    /// Get AI feedback on a resume PDF
    ResumeFeedback {
        file: PathBuf,
    },

    /// Score a resume PDF against a job description PDF
    Match {
        resume: PathBuf,

        jd: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "jobwise=debug" } else { "jobwise=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.api_url.as_deref())?;
    let client = ApiClient::new(&config).context("Failed to build HTTP client")?;
    let storage = SessionStorage::new(config.data_dir.clone());

    let console = ConsoleNotifier;
    let recorder = Recorder::new();
    let notifier: &dyn Notifier = match cli.command {
        Commands::Board => &recorder,
        _ => &console,
    };

    let mut app = App::new(client, storage, notifier);
    app.restore();

    match cli.command {
        Commands::Login { username, password } => {
            let user = app.login(&Credentials { username, password })?;
            println!("Logged in as {}.", user.username);
        }

        Commands::Signup {
            username,
            name,
            email,
            password,
            question,
            answer,
        } => {
            let form = SignupForm {
                username,
                name,
                email,
                password,
                security_question: question,
                security_answer: answer,
            };
            let user = app.signup(&form)?;
            println!("Account created. Logged in as {}.", user.username);
        }

        Commands::Logout => {
            app.logout();
            println!("Logged out.");
        }

        Commands::Whoami => match app.session().user() {
            Some(user) => {
                println!("User #{}", user.id);
                println!("Username: {}", user.username);
                if !user.name.is_empty() {
                    println!("Name: {}", user.name);
                }
                if !user.email.is_empty() {
                    println!("Email: {}", user.email);
                }
            }
            None => println!("Not logged in."),
        },

        Commands::ForgotPassword {
            username,
            answer,
            new_password,
        } => match answer {
            None => {
                let question = app.security_question(&username)?;
                println!("Security question: {}", question);
                println!("Answer it with: jobwise forgot-password {} --answer <ANSWER>", username);
            }
            Some(security_answer) => {
                let new_password = new_password
                    .ok_or_else(|| anyhow!("--new-password (or JOBWISE_NEW_PASSWORD) is required with --answer"))?;
                app.reset_password(&PasswordReset {
                    username,
                    security_answer,
                    new_password,
                })?;
                println!("Password reset. You can now log in.");
            }
        },

        Commands::Add {
            company,
            role,
            date,
            interview,
            pay,
            job_type,
            status,
            mode,
            notes,
        } => {
            let mut job = NewJob::new(&company, &role, date.unwrap_or_else(|| chrono::Local::now().date_naive()));
            job.interview_date = interview;
            job.pay = pay;
            job.job_type = job_type;
            job.status = status;
            job.mode = mode;
            job.notes = notes;
            let created = app.add_job(&job)?;
            println!("ID: {}", created.id);
        }

        Commands::List { status } => {
            app.load_jobs()?;
            let jobs: Vec<&Job> = match status {
                Some(status) => app.jobs().by_status(status),
                None => app.jobs().list().iter().collect(),
            };
            print_jobs(&jobs);
        }

        Commands::Show { id } => {
            app.load_jobs()?;
            match app.jobs().get(&id) {
                Some(job) => print_job(job),
                None => println!("Job '{}' not found.", id),
            }
        }

        Commands::Edit {
            id,
            company,
            role,
            pay,
            date,
            interview,
            clear_interview,
            job_type,
            status,
            mode,
            notes,
        } => {
            let patch = JobPatch {
                company,
                role,
                pay,
                date_applied: date,
                interview_date: if clear_interview { Some(None) } else { interview.map(Some) },
                job_type: job_type.map(Some),
                status,
                mode,
                notes,
            };
            if patch.is_empty() {
                println!("Nothing to change.");
                return Ok(());
            }
            app.load_jobs()?;
            let updated = app.edit_job(&id, &patch)?;
            print_job(&updated);
        }

        Commands::Move { id, status } => {
            app.load_jobs()?;
            let moved = app.move_job(&id, status)?;
            println!("{} | {} is now {}.", moved.company, moved.role, moved.status.label());
        }

        Commands::Rm { id } => {
            app.load_jobs()?;
            app.remove_job(&id)?;
        }

        Commands::Board => {
            app.load_jobs()?;
            tui::run_board(&mut app, &recorder)?;
        }

        Commands::Recent { limit } => {
            app.load_jobs()?;
            print_jobs(&app.jobs().recent(limit));
        }

        Commands::Upcoming => {
            app.load_jobs()?;
            let now = chrono::Local::now().naive_local();
            let upcoming = reminders::upcoming_interviews(app.jobs().list(), now);
            if upcoming.is_empty() {
                println!("No interviews in the next {} days.", reminders::LOOKAHEAD_DAYS);
            } else {
                println!("{:<12} {:<24} {:<30}", "DATE", "COMPANY", "ROLE");
                println!("{}", "-".repeat(68));
                for job in upcoming {
                    let date = job.interview_date.map(|d| d.to_string()).unwrap_or_default();
                    println!(
                        "{:<12} {:<24} {:<30}",
                        date,
                        truncate(&job.company, 22),
                        truncate(&job.role, 28)
                    );
                }
            }
        }

        Commands::Analytics { period } => {
            let data = app.analytics(period)?;
            print_analytics(&data, period);
        }

        Commands::ResumeFeedback { file } => {
            let review = app
                .resume_feedback(&file)
                .with_context(|| format!("Failed to get feedback for {}", file.display()))?;
            print_resume_review(&review);
        }

        Commands::Match { resume, jd } => {
            let report = app.match_documents(&resume, &jd).context("Failed to match resume")?;
            print_match(&report);
        }
    }

    Ok(())
}

fn print_jobs(jobs: &[&Job]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }
    println!(
        "{:<26} {:<10} {:<20} {:<24} {:<11} {:<11}",
        "ID", "STATUS", "COMPANY", "ROLE", "APPLIED", "INTERVIEW"
    );
    println!("{}", "-".repeat(107));
    for job in jobs {
        println!(
            "{:<26} {:<10} {:<20} {:<24} {:<11} {:<11}",
            truncate(&job.id, 24),
            job.status,
            truncate(&job.company, 18),
            truncate(&job.role, 22),
            job.date_applied,
            job.interview_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }
}

fn print_job(job: &Job) {
    println!("Job {}", job.id);
    println!("Company: {}", job.company);
    println!("Role: {}", job.role);
    println!("Status: {}", job.status.label());
    if !job.pay.is_empty() {
        println!("Pay: {}", job.pay);
    }
    println!("Applied: {}", job.date_applied);
    if let Some(date) = job.interview_date {
        println!("Interview: {}", date);
    }
    if let Some(job_type) = job.job_type {
        println!("Type: {}", job_type.as_str());
    }
    println!("Mode: {}", job.mode.as_str());
    if !job.notes.is_empty() {
        println!("\n--- Notes ---\n{}", job.notes);
    }
}

fn print_analytics(data: &analytics::Analytics, period: Period) {
    println!("Analytics ({})", period.as_str());
    println!("  Total applications: {}", data.summary.total_applications);
    println!("  Interview rate:     {}%", data.summary.interview_rate);
    println!("  Offer rate:         {}%", data.summary.offer_rate);
    println!("  Avg response time:  {} days", data.summary.avg_response_time);

    if !data.status_distribution.is_empty() {
        println!("\n{:<12} {:>6}", "STATUS", "COUNT");
        println!("{}", "-".repeat(19));
        for status in &data.status_distribution {
            println!("{:<12} {:>6}", status.name, status.value);
        }
    }

    if !data.time_data.is_empty() {
        println!("\n{:<12} {:>6}", "DATE", "COUNT");
        println!("{}", "-".repeat(19));
        for point in &data.time_data {
            println!("{:<12} {:>6}", truncate(&point.date, 12), point.count);
        }
    }

    if !data.role_data.is_empty() {
        println!("\n{:<24} {:>8} {:>10} {:>8}", "ROLE", "APPLIED", "INTERVIEW", "OFFERED");
        println!("{}", "-".repeat(53));
        for role in &data.role_data {
            println!(
                "{:<24} {:>8} {:>10} {:>8}",
                truncate(&role.name, 22),
                role.applied,
                role.interview,
                role.offered
            );
        }
    }

    let insights = analytics::insights(data);
    if !insights.is_empty() {
        println!("\nInsights:");
        for insight in insights {
            println!("  {}", insight.title);
            for line in textwrap::fill(insight.description, 74).lines() {
                println!("    {}", line);
            }
        }
    }
}

fn print_list(title: &str, items: &[String]) {
    println!("\n{}", title);
    if items.is_empty() {
        println!("  (none)");
        return;
    }
    for item in items {
        let wrapped = textwrap::fill(item, 74);
        let mut lines = wrapped.lines();
        if let Some(first) = lines.next() {
            println!("  * {}", first);
        }
        for line in lines {
            println!("    {}", line);
        }
    }
}

fn print_paragraph(title: &str, text: &str) {
    println!("\n{}", title);
    if text.trim().is_empty() {
        println!("  (none)");
        return;
    }
    for line in textwrap::fill(text.trim(), 76).lines() {
        println!("  {}", line);
    }
}

fn print_resume_review(review: &feedback::ResumeReview) {
    let feedback = &review.feedback;
    print_paragraph("Overall Impression", &feedback.overall_impression);
    print_list("Strengths", &feedback.strengths);
    print_list("Areas for Improvement", &feedback.areas_for_improvement);
    print_list("Section Feedback", &feedback.section_feedback);
    print_list("Suggestions", &feedback.suggestions);
    print_paragraph("ATS Readability", &feedback.ats_readability);
    if !review.static_feedback.is_empty() {
        print_list("Quick Checks", &review.static_feedback);
    }
}

fn print_sections(sections: &FeedbackSections) {
    for slot in Slot::ALL {
        match render_body(sections.get(slot)) {
            SectionBody::Empty => print_paragraph(slot.title(), ""),
            SectionBody::Paragraph(text) => print_paragraph(slot.title(), &text),
            SectionBody::Bullets(items) => print_list(slot.title(), &items),
        }
    }
}

fn print_match(report: &feedback::MatchReport) {
    println!("Match score: {}%", report.match_score);
    print_list("Matched Skills", &report.matched_skills);
    print_list("Missing Skills", &report.missing_skills);
    print_list("Skills in Job Description", &report.jd_skills);
    let sections = report.sections();
    if sections.is_empty() {
        print_paragraph("Feedback", &report.feedback);
    } else {
        print_sections(&sections);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
