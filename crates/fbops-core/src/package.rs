//! Pack workspace packages into an app so it deploys without the monorepo.
//!
//! App Hosting builds each app in isolation, so `workspace:*` dependencies
//! cannot resolve. For every requested package this packs a tarball into
//! `apps/<app>/pkg-lib/` under a stable name and re-adds it to the app as a
//! file dependency.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{FbopsError, Result};
use crate::runner::{CliCommand, CommandRunner};

pub const APPS_DIR: &str = "apps";
pub const PKG_LIB_DIR: &str = "pkg-lib";

pub fn app_dir(root: &Path, app: &str) -> PathBuf {
    root.join(APPS_DIR).join(app)
}

pub fn lib_dir(root: &Path, app: &str) -> PathBuf {
    app_dir(root, app).join(PKG_LIB_DIR)
}

/// `@packages/ui` lives in `packages/ui`; anything else is a root-relative path.
pub fn package_dir(root: &Path, package: &str) -> PathBuf {
    match package.strip_prefix("@packages/") {
        Some(rest) => root.join("packages").join(rest),
        None => root.join(package),
    }
}

/// Tarball stem pnpm uses for a package name: `@packages/ui` → `packages-ui`.
pub fn sanitized_name(package: &str) -> String {
    package.replacen('@', "", 1).replacen('/', "-", 1)
}

/// Split a comma-separated package list, dropping blanks.
pub fn parse_package_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn pack_command(lib: &Path, package_dir: &Path) -> CliCommand {
    CliCommand::new("npx").args([
        "-y".to_string(),
        "pnpm".to_string(),
        "pack".to_string(),
        "--pack-destination".to_string(),
        lib.display().to_string(),
        "--dir".to_string(),
        package_dir.display().to_string(),
    ])
}

pub fn add_command(app: &str, app_dir: &Path, tarball: &str) -> CliCommand {
    CliCommand::new("npx")
        .args([
            "-y".to_string(),
            "pnpm".to_string(),
            "--filter".to_string(),
            app.to_string(),
            "add".to_string(),
            format!("./{PKG_LIB_DIR}/{tarball}"),
        ])
        .current_dir(app_dir)
}

/// The freshly packed `<stem>-<version>.tgz`, excluding an earlier renamed
/// `<stem>.tgz`.
fn find_packed(lib: &Path, stem: &str) -> Result<Option<String>> {
    let target = format!("{stem}.tgz");
    let mut found: Vec<String> = std::fs::read_dir(lib)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|f| f.starts_with(stem) && f.ends_with(".tgz") && *f != target)
        .collect();
    found.sort();
    Ok(found.into_iter().next())
}

/// Pack each package into `apps/<app>/pkg-lib` and add it to the app.
///
/// Returns the renamed tarball paths. The first failure aborts.
pub fn prepare_app(
    runner: &dyn CommandRunner,
    root: &Path,
    app: &str,
    packages: &[String],
    out: &mut dyn Write,
) -> Result<Vec<PathBuf>> {
    writeln!(out, "Preparing deployment for app: {app}")?;
    writeln!(out, "Packages to pack: {}", packages.join(", "))?;

    let app_path = app_dir(root, app);
    let lib = lib_dir(root, app);
    std::fs::create_dir_all(&lib)?;

    let mut packed = Vec::new();
    for package in packages {
        let pkg_path = package_dir(root, package);
        if !pkg_path.is_dir() {
            return Err(FbopsError::PackageNotFound(pkg_path.display().to_string()));
        }

        writeln!(out, "Packing {package}...")?;
        runner.capture(&pack_command(&lib, &pkg_path))?;

        let stem = sanitized_name(package);
        let tarball = format!("{stem}.tgz");
        let source = find_packed(&lib, &stem)?.ok_or_else(|| FbopsError::PackedArchiveMissing {
            package: package.clone(),
            dir: lib.display().to_string(),
        })?;

        let dest = lib.join(&tarball);
        std::fs::rename(lib.join(&source), &dest)?;
        writeln!(out, "Packed to {}", dest.display())?;

        writeln!(out, "Updating {app} package.json...")?;
        runner.capture(&add_command(app, &app_path, &tarball))?;
        writeln!(out, "Successfully added {package} to {app}.")?;
        packed.push(dest);
    }

    writeln!(out, "Preparation complete.")?;
    Ok(packed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{command_failed, Mode, ScriptedRunner};
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("packages/ui")).unwrap();
        std::fs::create_dir_all(dir.path().join("apps/web")).unwrap();
        dir
    }

    /// Simulates `pnpm pack` by dropping a versioned tarball in the destination.
    fn packing_runner() -> ScriptedRunner {
        ScriptedRunner::new(|cmd| {
            if let Some(pos) = cmd.args.iter().position(|a| a == "--pack-destination") {
                let dest = PathBuf::from(&cmd.args[pos + 1]);
                std::fs::write(dest.join("packages-ui-0.1.0.tgz"), b"tgz").unwrap();
            }
            Ok(String::new())
        })
    }

    #[test]
    fn name_mapping() {
        assert_eq!(sanitized_name("@packages/ui"), "packages-ui");
        assert_eq!(sanitized_name("packages/ui"), "packages-ui");
        let root = Path::new("/repo");
        assert_eq!(package_dir(root, "@packages/ui"), root.join("packages/ui"));
        assert_eq!(package_dir(root, "packages/ui"), root.join("packages/ui"));
    }

    #[test]
    fn package_list_parsing() {
        assert_eq!(
            parse_package_list("@packages/ui, packages/core,,"),
            vec!["@packages/ui", "packages/core"]
        );
    }

    #[test]
    fn packs_renames_and_adds() {
        let ws = workspace();
        let runner = packing_runner();

        let packed = prepare_app(
            &runner,
            ws.path(),
            "web",
            &["@packages/ui".to_string()],
            &mut Vec::<u8>::new(),
        )
        .unwrap();

        let expected = ws.path().join("apps/web/pkg-lib/packages-ui.tgz");
        assert_eq!(packed, vec![expected.clone()]);
        assert!(expected.exists());
        assert!(!ws.path().join("apps/web/pkg-lib/packages-ui-0.1.0.tgz").exists());

        let calls = runner.calls_with(Mode::Capture);
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1].args,
            vec!["-y", "pnpm", "--filter", "web", "add", "./pkg-lib/packages-ui.tgz"]
        );
        assert_eq!(calls[1].current_dir.as_deref(), Some(ws.path().join("apps/web").as_path()));
    }

    #[test]
    fn repeat_run_replaces_previous_tarball() {
        let ws = workspace();
        let runner = packing_runner();
        let pkgs = ["@packages/ui".to_string()];
        prepare_app(&runner, ws.path(), "web", &pkgs, &mut Vec::<u8>::new()).unwrap();
        prepare_app(&runner, ws.path(), "web", &pkgs, &mut Vec::<u8>::new()).unwrap();

        let names: Vec<String> = std::fs::read_dir(ws.path().join("apps/web/pkg-lib"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["packages-ui.tgz"]);
    }

    #[test]
    fn missing_package_dir_fails_before_packing() {
        let ws = workspace();
        let runner = packing_runner();
        let err = prepare_app(
            &runner,
            ws.path(),
            "web",
            &["@packages/missing".to_string()],
            &mut Vec::<u8>::new(),
        )
        .unwrap_err();
        assert!(matches!(err, FbopsError::PackageNotFound(_)));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn pack_without_output_is_missing_archive() {
        let ws = workspace();
        let runner = ScriptedRunner::new(|_| Ok(String::new()));
        let err = prepare_app(
            &runner,
            ws.path(),
            "web",
            &["@packages/ui".to_string()],
            &mut Vec::<u8>::new(),
        )
        .unwrap_err();
        assert!(matches!(err, FbopsError::PackedArchiveMissing { .. }));
    }

    #[test]
    fn pack_failure_propagates() {
        let ws = workspace();
        let runner = ScriptedRunner::new(|cmd| Err(command_failed(cmd)));
        let err = prepare_app(
            &runner,
            ws.path(),
            "web",
            &["@packages/ui".to_string()],
            &mut Vec::<u8>::new(),
        )
        .unwrap_err();
        assert!(matches!(err, FbopsError::CommandFailed { .. }));
    }
}
