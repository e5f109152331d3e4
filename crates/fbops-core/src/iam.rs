//! Additive IAM role reconciliation for a single service account.
//!
//! The reconciler reads the project's IAM policy, works out which of a fixed
//! role profile the principal is missing, and issues one
//! `gcloud projects add-iam-policy-binding` per missing role. Roles are never
//! removed. A failed policy read is logged and treated as "no roles bound" so
//! a flaky read path never blocks the catch-up.

use serde::Deserialize;
use std::io::Write;

use crate::error::Result;
use crate::runner::{CliCommand, CommandRunner};

// ---------------------------------------------------------------------------
// Role profiles
// ---------------------------------------------------------------------------

/// An immutable, ordered set of roles one entry point requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleProfile {
    pub name: &'static str,
    pub roles: &'static [&'static str],
}

/// Roles for the CI builder service account that deploys App Hosting.
pub const BUILDER: RoleProfile = RoleProfile {
    name: "builder",
    roles: &[
        "roles/firebase.admin",
        "roles/serviceusage.serviceUsageAdmin",
        "roles/cloudbuild.builds.editor",
        "roles/iam.serviceAccountUser",
        "roles/run.admin",
        "roles/artifactregistry.admin",
        "roles/storage.admin",
        "roles/logging.logWriter",
        "roles/secretmanager.secretAccessor",
        "roles/iam.serviceAccountCreator",
        "roles/resourcemanager.projectIamAdmin",
        "roles/developerconnect.readTokenAccessor",
    ],
};

/// Roles for the Cloud Functions runtime service account.
pub const FUNCTIONS: RoleProfile = RoleProfile {
    name: "functions",
    roles: &[
        "roles/logging.logWriter",
        "roles/artifactregistry.reader",
        "roles/firebase.sdkAdminServiceAgent",
        "roles/secretmanager.secretAccessor",
        "roles/iam.serviceAccountTokenCreator",
        "roles/pubsub.publisher",
    ],
};

/// Roles for the project's default compute service account.
pub const DEFAULT_COMPUTE: RoleProfile = RoleProfile {
    name: "default-compute",
    roles: &["roles/cloudfunctions.admin", "roles/iam.serviceAccountUser"],
};

// ---------------------------------------------------------------------------
// Policy model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IamPolicy {
    #[serde(default)]
    pub bindings: Vec<RoleBinding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleBinding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
}

pub fn member_for(email: &str) -> String {
    format!("serviceAccount:{email}")
}

impl IamPolicy {
    /// Roles bound to the service account `email`, in policy order.
    pub fn roles_for(&self, email: &str) -> Vec<String> {
        let member = member_for(email);
        self.bindings
            .iter()
            .filter(|b| b.members.iter().any(|m| *m == member))
            .map(|b| b.role.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// gcloud calls
// ---------------------------------------------------------------------------

pub fn get_policy_command(project_id: &str) -> CliCommand {
    CliCommand::new("gcloud").args(["projects", "get-iam-policy", project_id, "--format=json"])
}

pub fn add_binding_command(project_id: &str, email: &str, role: &str) -> CliCommand {
    CliCommand::new("gcloud").args([
        "projects".to_string(),
        "add-iam-policy-binding".to_string(),
        project_id.to_string(),
        format!("--member={}", member_for(email)),
        format!("--role={role}"),
        "--quiet".to_string(),
        "--condition=None".to_string(),
    ])
}

/// Roles currently bound to `email`. Any failure yields an empty list.
pub fn existing_roles(runner: &dyn CommandRunner, project_id: &str, email: &str) -> Vec<String> {
    let fetched = runner
        .capture(&get_policy_command(project_id))
        .and_then(|out| Ok(serde_json::from_str::<IamPolicy>(&out)?));
    match fetched {
        Ok(policy) => policy.roles_for(email),
        Err(e) => {
            tracing::warn!("Failed to fetch existing IAM policy: {e}");
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

/// What a reconcile pass did, role by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub skipped: Vec<String>,
    pub added: Vec<String>,
    pub dry_run: bool,
}

/// Bind every role in `profile` that `email` does not already hold.
///
/// Binding calls run strictly in profile order. The first failing call
/// aborts the pass; rerunning is safe because bound roles are skipped.
pub fn reconcile(
    runner: &dyn CommandRunner,
    project_id: &str,
    email: &str,
    profile: &RoleProfile,
    dry_run: bool,
    out: &mut dyn Write,
) -> Result<ReconcileReport> {
    let existing = existing_roles(runner, project_id, email);
    writeln!(out, "Existing roles: {}", existing.join(", "))?;

    let mut report = ReconcileReport {
        dry_run,
        ..Default::default()
    };

    for role in profile.roles {
        if existing.iter().any(|r| r == role) {
            writeln!(out, "Role {role} already exists. Skipping.")?;
            report.skipped.push(role.to_string());
            continue;
        }

        let cmd = add_binding_command(project_id, email, role);
        if dry_run {
            writeln!(out, "[DRY RUN] {cmd}")?;
        } else {
            writeln!(out, "Executing: {cmd}")?;
            out.flush()?;
            runner.run(&cmd)?;
        }
        report.added.push(role.to_string());
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FbopsError;
    use crate::testing::{command_failed, output_of, Mode, ScriptedRunner};
    use std::cell::RefCell;
    use std::rc::Rc;

    const EMAIL: &str = "builder@proj.iam.gserviceaccount.com";

    fn policy_json(roles: &[&str]) -> String {
        let bindings: Vec<serde_json::Value> = roles
            .iter()
            .map(|r| serde_json::json!({ "role": r, "members": [member_for(EMAIL)] }))
            .collect();
        serde_json::json!({
            "bindings": bindings,
            "etag": "BwX=",
            "version": 1
        })
        .to_string()
    }

    /// A runner backed by a mutable policy: add-binding calls update it.
    fn stateful_runner(initial: &[&str]) -> (ScriptedRunner, Rc<RefCell<Vec<String>>>) {
        let bound = Rc::new(RefCell::new(
            initial.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        ));
        let state = Rc::clone(&bound);
        let runner = ScriptedRunner::new(move |cmd| {
            if cmd.mentions("get-iam-policy") {
                let roles = state.borrow();
                let refs: Vec<&str> = roles.iter().map(|s| s.as_str()).collect();
                return Ok(policy_json(&refs));
            }
            if cmd.mentions("add-iam-policy-binding") {
                let role = cmd
                    .args
                    .iter()
                    .find_map(|a| a.strip_prefix("--role="))
                    .unwrap()
                    .to_string();
                state.borrow_mut().push(role);
            }
            Ok(String::new())
        });
        (runner, bound)
    }

    #[test]
    fn roles_for_filters_by_member() {
        let policy: IamPolicy = serde_json::from_str(
            r#"{"bindings":[
                {"role":"roles/run.admin","members":["serviceAccount:builder@proj.iam.gserviceaccount.com"]},
                {"role":"roles/owner","members":["user:someone@example.com"]},
                {"role":"roles/viewer"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(policy.roles_for(EMAIL), vec!["roles/run.admin"]);
    }

    #[test]
    fn policy_without_bindings_parses_empty() {
        let policy: IamPolicy = serde_json::from_str(r#"{"etag":"x"}"#).unwrap();
        assert!(policy.roles_for(EMAIL).is_empty());
    }

    #[test]
    fn add_binding_command_shape() {
        let cmd = add_binding_command("proj", EMAIL, "roles/run.admin");
        assert_eq!(
            cmd.to_string(),
            "gcloud projects add-iam-policy-binding proj \
             --member=serviceAccount:builder@proj.iam.gserviceaccount.com \
             --role=roles/run.admin --quiet --condition=None"
        );
    }

    #[test]
    fn skips_already_bound_role() {
        let (runner, _) = stateful_runner(&["roles/firebase.admin"]);
        let mut out = Vec::<u8>::new();
        let report = reconcile(&runner, "proj", EMAIL, &BUILDER, false, &mut out).unwrap();
        let text = output_of(out);

        assert!(text.contains("Role roles/firebase.admin already exists. Skipping."));
        assert_eq!(report.skipped, vec!["roles/firebase.admin"]);
        assert_eq!(report.added.len(), BUILDER.roles.len() - 1);
        assert!(runner
            .calls_with(Mode::Run)
            .iter()
            .all(|c| !c.mentions("roles/firebase.admin")));
    }

    #[test]
    fn second_run_issues_no_mutations() {
        let (runner, _) = stateful_runner(&[]);
        reconcile(&runner, "proj", EMAIL, &FUNCTIONS, false, &mut Vec::<u8>::new()).unwrap();
        assert_eq!(runner.calls_with(Mode::Run).len(), FUNCTIONS.roles.len());

        let before = runner.calls_with(Mode::Run).len();
        let report = reconcile(&runner, "proj", EMAIL, &FUNCTIONS, false, &mut Vec::<u8>::new()).unwrap();
        assert_eq!(runner.calls_with(Mode::Run).len(), before);
        assert!(report.added.is_empty());
        assert_eq!(report.skipped.len(), FUNCTIONS.roles.len());
    }

    #[test]
    fn dry_run_prints_without_mutating() {
        let (runner, bound) = stateful_runner(&[]);
        let mut out = Vec::<u8>::new();
        let report =
            reconcile(&runner, "proj", EMAIL, &DEFAULT_COMPUTE, true, &mut out).unwrap();
        let text = output_of(out);

        assert!(runner.calls_with(Mode::Run).is_empty());
        assert!(bound.borrow().is_empty());
        assert!(report.dry_run);
        assert_eq!(report.added, DEFAULT_COMPUTE.roles);
        assert!(text.contains("[DRY RUN] gcloud projects add-iam-policy-binding proj"));
        assert!(text.contains("--role=roles/cloudfunctions.admin"));
    }

    #[test]
    fn policy_read_failure_proceeds_with_no_roles() {
        let runner = ScriptedRunner::new(|cmd| {
            if cmd.mentions("get-iam-policy") {
                Err(command_failed(cmd))
            } else {
                Ok(String::new())
            }
        });
        let report = reconcile(&runner, "proj", EMAIL, &DEFAULT_COMPUTE, false, &mut Vec::<u8>::new())
            .unwrap();
        assert_eq!(report.added.len(), 2);
        assert_eq!(runner.calls_with(Mode::Run).len(), 2);
    }

    #[test]
    fn malformed_policy_json_proceeds_with_no_roles() {
        let runner = ScriptedRunner::new(|_| Ok("not json".into()));
        assert!(existing_roles(&runner, "proj", EMAIL).is_empty());
    }

    #[test]
    fn binding_failure_aborts_remaining_roles() {
        let runner = ScriptedRunner::new(|cmd| {
            if cmd.mentions("get-iam-policy") {
                return Ok(policy_json(&[]));
            }
            if cmd.mentions("roles/serviceusage.serviceUsageAdmin") {
                return Err(command_failed(cmd));
            }
            Ok(String::new())
        });
        let err = reconcile(&runner, "proj", EMAIL, &BUILDER, false, &mut Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, FbopsError::CommandFailed { .. }));
        // firebase.admin succeeded, serviceUsageAdmin failed, nothing after.
        assert_eq!(runner.calls_with(Mode::Run).len(), 2);
    }

    #[test]
    fn profiles_have_no_duplicate_roles() {
        for profile in [BUILDER, FUNCTIONS, DEFAULT_COMPUTE] {
            let mut roles = profile.roles.to_vec();
            roles.sort();
            roles.dedup();
            assert_eq!(roles.len(), profile.roles.len(), "{}", profile.name);
        }
    }
}
