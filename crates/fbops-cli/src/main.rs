mod cmd;
mod output;
mod root;

use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand};
use cmd::iam::IamSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fbops",
    about = "Operational tooling for Firebase App Hosting, Google Cloud IAM and local emulators",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for the newest App Hosting rollout of a backend to finish
    VerifyRollout {
        /// Google Cloud project id
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        project: String,

        /// App Hosting location (e.g. us-central1)
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        location: String,

        /// App Hosting backend id
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        backend: String,

        /// Give up after this many seconds
        #[arg(long, default_value_t = fbops_core::rollout::DEFAULT_TIMEOUT_SECS,
              value_parser = clap::value_parser!(u64).range(1..))]
        timeout: u64,

        /// App Hosting API base URL
        #[arg(long, hide = true, env = "FBOPS_APP_HOSTING_ENDPOINT",
              default_value = fbops_core::app_hosting::DEFAULT_ENDPOINT)]
        endpoint: String,
    },

    /// Grant the roles a service account needs (additive, idempotent)
    SetupIam {
        #[command(subcommand)]
        subcommand: IamSubcommand,
    },

    /// Create a service account if it does not exist
    CreateSa {
        /// Service account email, or bare name in the active project
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        sa: String,

        /// Display name for a newly created account
        #[arg(long, default_value = fbops_core::service_account::DEFAULT_DISPLAY_NAME)]
        display_name: String,

        /// Print commands without executing
        #[arg(long)]
        dry_run: bool,
    },

    /// Kill processes holding dev-server and emulator ports
    KillPorts {
        /// Firebase config to read emulator ports from
        #[arg(long, default_value = fbops_core::config::FIREBASE_CONFIG_FILE)]
        config: PathBuf,

        /// Print kill commands without executing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show what the local Emulator Hub reports
    InspectEmulators {
        /// Emulator Hub address (host:port)
        #[arg(long, env = "FIREBASE_EMULATOR_HUB",
              default_value = fbops_core::emulators::DEFAULT_HUB)]
        hub: String,
    },

    /// Pack workspace packages into an app for standalone deployment
    PrepareDeploy {
        /// App directory name under apps/
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        app: String,

        /// Comma-separated packages (e.g. @packages/ui,@packages/core)
        #[arg(long)]
        packages: String,

        /// Workspace root (default: auto-detect from pnpm-workspace.yaml or .git/)
        #[arg(long, env = "FBOPS_ROOT")]
        root: Option<PathBuf>,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit 1 like every other failure; --help/--version exit 0.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::VerifyRollout {
            project,
            location,
            backend,
            timeout,
            endpoint,
        } => cmd::rollout::run(project, location, backend, timeout, &endpoint),
        Commands::SetupIam { subcommand } => cmd::iam::run(subcommand),
        Commands::CreateSa {
            sa,
            display_name,
            dry_run,
        } => cmd::service_account::run(&sa, &display_name, dry_run),
        Commands::KillPorts { config, dry_run } => cmd::ports::run(&config, dry_run),
        Commands::InspectEmulators { hub } => cmd::emulators::run(&hub),
        Commands::PrepareDeploy {
            app,
            packages,
            root,
        } => {
            let root = root::resolve_root(root.as_deref());
            cmd::prepare::run(&root, &app, &packages)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
