use crate::infra::{seed_employer, seed_password, SEED_EMPLOYER_EMAIL};
use chrono::{Duration, Utc};
use clap::Args;
use job_board::board::{
    ApplicationStatus, CandidateDashboard, EmployerDashboard, ImportSummary, InterviewDraft,
    InterviewType, JobCsvImporter, JobFilters, JobListing, NewApplication, Registration,
    ServiceError, StatusUpdate, UserType,
};
use job_board::error::AppError;
use job_board::JobBoard;
use std::io::Cursor;
use std::path::PathBuf;

const DEMO_PROJECT_KEY: &str = "demo-project-key";
const SAMPLE_JOBS: &str = include_str!("../data/sample_jobs.csv");

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Load jobs from this CSV instead of the bundled sample
    #[arg(long, value_name = "PATH")]
    pub(crate) jobs_csv: Option<PathBuf>,
    /// Keyword used for the search step
    #[arg(long, default_value = "rust")]
    pub(crate) search: String,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Job CSV export to load
    #[arg(long, value_name = "PATH")]
    pub(crate) csv: PathBuf,
    /// Employer account the imported jobs are posted under
    #[arg(long, default_value = SEED_EMPLOYER_EMAIL)]
    pub(crate) employer_email: String,
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let board = JobBoard::in_memory(DEMO_PROJECT_KEY);
    let employer = seed_employer(&board, &args.employer_email, &seed_password(None))?;
    let summary = JobCsvImporter::from_path(&args.csv, &board, &employer)?;

    println!(
        "Imported {} jobs from {} ({} companies created)",
        summary.jobs.len(),
        args.csv.display(),
        summary.companies_created
    );
    print_import(&summary);
    Ok(())
}

fn print_import(summary: &ImportSummary) {
    for job in &summary.jobs {
        println!(
            "- [{}] {} | {} | {} / {}{}",
            job.status,
            job.title,
            job.location,
            job.employment_type,
            job.experience_level,
            if job.remote_allowed { " | remote" } else { "" }
        );
    }
}

fn print_listing(listing: &JobListing) {
    let company = listing
        .company
        .as_ref()
        .map(|company| company.name.as_str())
        .unwrap_or("unknown company");
    let salary = match (listing.job.salary_min, listing.job.salary_max) {
        (Some(min), Some(max)) => format!("{min:.0}-{max:.0}"),
        (Some(min), None) => format!("from {min:.0}"),
        (None, Some(max)) => format!("up to {max:.0}"),
        (None, None) => "salary not listed".to_string(),
    };
    println!(
        "  - {} @ {} | {} | {} | {} applications",
        listing.job.title, company, listing.job.location, salary, listing.applications_count
    );
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { jobs_csv, search } = args;
    let board = JobBoard::in_memory(DEMO_PROJECT_KEY);

    println!("Job board walkthrough");
    let employer = seed_employer(&board, "hiring@northwind.example", &seed_password(None))?;
    let summary = match &jobs_csv {
        Some(path) => JobCsvImporter::from_path(path, &board, &employer)?,
        None => JobCsvImporter::from_reader(Cursor::new(SAMPLE_JOBS), &board, &employer)?,
    };
    println!(
        "- Employer posted {} jobs across {} companies",
        summary.jobs.len(),
        summary.companies_created
    );

    let listings = board.jobs.list(&JobFilters::default())?;
    println!("Public listing ({} active):", listings.len());
    for listing in &listings {
        print_listing(listing);
    }

    let matches = board.jobs.list(&JobFilters {
        search: Some(search.clone()),
        ..JobFilters::default()
    })?;
    println!("Search '{}' ({} matches):", search, matches.len());
    for listing in &matches {
        print_listing(listing);
    }

    let Some(target) = matches.first().or(listings.first()) else {
        println!("No active jobs to apply to");
        return Ok(());
    };
    let job_id = target.job.id.clone();

    let candidate = board.identity.register(Registration {
        email: "ada@candidates.example".to_string(),
        password: "analytical-engine".to_string(),
        password_confirm: "analytical-engine".to_string(),
        user_type: UserType::Candidate,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
    })?;

    let application = board.applications.create(
        &candidate,
        NewApplication {
            job_id: job_id.clone(),
            cover_letter: Some("I would love to work on your storage engine.".to_string()),
            ..NewApplication::default()
        },
    )?;
    println!(
        "\nCandidate applied to '{}' -> {}",
        target.job.title, application.status
    );

    match board.applications.create(
        &candidate,
        NewApplication {
            job_id: job_id.clone(),
            ..NewApplication::default()
        },
    ) {
        Err(ServiceError::AlreadyApplied(_)) => println!("  Second application refused"),
        Err(err) => println!("  Second application failed: {}", err),
        Ok(_) => println!("  Second application unexpectedly accepted"),
    }

    board.applications.update_status(
        &employer,
        &application.id,
        StatusUpdate {
            status: ApplicationStatus::Reviewing,
            notes: Some("Strong systems background".to_string()),
        },
    )?;
    let shortlisted = board.applications.update_status(
        &employer,
        &application.id,
        StatusUpdate {
            status: ApplicationStatus::Interview,
            notes: None,
        },
    )?;
    println!(
        "Employer moved the application to {} (notes: {})",
        shortlisted.status,
        shortlisted.notes.as_deref().unwrap_or("none")
    );

    let interview = board.interviews.schedule(
        &employer,
        InterviewDraft {
            application_id: application.id.clone(),
            interview_type: InterviewType::Technical,
            scheduled_at: Utc::now() + Duration::days(3),
            duration_minutes: 90,
            notes: Some("Pairing session on the ingestion pipeline".to_string()),
        },
    )?;
    println!(
        "Employer scheduled a {} interview for {} ({} min)",
        interview.interview_type,
        interview.scheduled_at.format("%Y-%m-%d %H:%M UTC"),
        interview.duration_minutes
    );

    let dashboard = EmployerDashboard::load(&board, &employer)?;
    println!("\nEmployer dashboard");
    println!(
        "- {} active jobs | {} applications | {} pending review | {} hired",
        dashboard.stats.active_jobs,
        dashboard.stats.total_applications,
        dashboard.stats.pending_review,
        dashboard.stats.hired
    );
    for received in &dashboard.applications {
        let applicant = received
            .applicant
            .as_ref()
            .map(|profile| profile.full_name())
            .unwrap_or_else(|| "unknown applicant".to_string());
        println!(
            "  - {} for {} -> {}",
            applicant, received.job.job.title, received.application.status
        );
    }

    let candidate_view = CandidateDashboard::load(&board, &candidate)?;
    println!("\nCandidate dashboard");
    match serde_json::to_string_pretty(&candidate_view.stats) {
        Ok(json) => println!("{}", json),
        Err(err) => println!("  Stats unavailable: {}", err),
    }

    Ok(())
}
