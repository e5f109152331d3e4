use fbops_core::project;
use fbops_core::runner::SystemRunner;
use fbops_core::service_account;

pub fn run(sa: &str, display_name: &str, dry_run: bool) -> anyhow::Result<()> {
    let runner = SystemRunner;
    let project_id = project::resolve_active_project(&runner)?;
    println!("Targeting Project: {project_id}");

    let email = project::expand_service_account_email(sa, &project_id);
    println!("Service Account Email: {email}");

    let mut stdout = std::io::stdout().lock();
    service_account::ensure(&runner, &project_id, &email, display_name, dry_run, &mut stdout)?;
    Ok(())
}
