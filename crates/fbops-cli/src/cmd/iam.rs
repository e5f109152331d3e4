use crate::output::print_table;
use clap::builder::NonEmptyStringValueParser;
use clap::Subcommand;
use fbops_core::iam::{self, ReconcileReport, RoleProfile};
use fbops_core::project;
use fbops_core::runner::{CommandRunner, SystemRunner};

#[derive(Subcommand)]
pub enum IamSubcommand {
    /// CI builder account that deploys App Hosting backends
    Builder {
        /// Service account email, or bare name in the active project
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        sa: String,

        /// Print commands without executing
        #[arg(long)]
        dry_run: bool,
    },
    /// Cloud Functions runtime account
    Functions {
        /// Service account email, or bare name in the active project
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        sa: String,

        /// Print commands without executing
        #[arg(long)]
        dry_run: bool,
    },
    /// The project's default compute account (<number>-compute@developer.gserviceaccount.com)
    DefaultCompute {
        /// Print commands without executing
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(subcmd: IamSubcommand) -> anyhow::Result<()> {
    let runner = SystemRunner;
    let project_id = project::resolve_active_project(&runner)?;
    println!("Targeting Project: {project_id}");

    let (email, profile, dry_run) = match subcmd {
        IamSubcommand::Builder { sa, dry_run } => (
            project::expand_service_account_email(&sa, &project_id),
            iam::BUILDER,
            dry_run,
        ),
        IamSubcommand::Functions { sa, dry_run } => (
            project::expand_service_account_email(&sa, &project_id),
            iam::FUNCTIONS,
            dry_run,
        ),
        IamSubcommand::DefaultCompute { dry_run } => {
            let number = project::resolve_project_number(&runner, &project_id)?;
            println!("Project Number: {number}");
            (project::default_compute_email(&number), iam::DEFAULT_COMPUTE, dry_run)
        }
    };

    reconcile(&runner, &project_id, &email, &profile, dry_run)
}

fn reconcile(
    runner: &dyn CommandRunner,
    project_id: &str,
    email: &str,
    profile: &RoleProfile,
    dry_run: bool,
) -> anyhow::Result<()> {
    println!("Service Account: {email}");

    let report = {
        let mut stdout = std::io::stdout().lock();
        iam::reconcile(runner, project_id, email, profile, dry_run, &mut stdout)?
    };

    println!();
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &ReconcileReport) {
    let added = if report.dry_run { "would add" } else { "added" };
    let rows: Vec<Vec<String>> = report
        .skipped
        .iter()
        .map(|r| vec![r.clone(), "present".to_string()])
        .chain(report.added.iter().map(|r| vec![r.clone(), added.to_string()]))
        .collect();
    print_table(&["ROLE", "STATUS"], rows);
}
