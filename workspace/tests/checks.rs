#![allow(missing_docs, reason = "this is a test crate")]

use std::process::Command;
use std::str::FromStr;

use camino::Utf8Path;
use cargo_metadata::{Metadata, MetadataCommand, Package};
use libtest_mimic::{Failed, Trial};

trait CommandExt {
    /// Runs a command, maybe capturing output from it and returning as `Failed`.
    fn run_as_test(&mut self, capture: bool) -> Result<(), Failed>;
}

impl CommandExt for Command {
    fn run_as_test(&mut self, capture: bool) -> Result<(), Failed> {
        let (status, output) = if capture {
            let output = self.output()?;
            let mut text = String::from_utf8(output.stdout)?;
            text.push_str(&String::from_utf8(output.stderr)?);
            (output.status, text)
        } else {
            (self.status()?, String::new())
        };

        if status.success() {
            return Ok(());
        }
        let mut message = format!("Running {self:?} {status}");
        if !output.is_empty() {
            message.push_str("\n==== output ====\n");
            message.push_str(&output);
        }
        Err(message.into())
    }
}

/// Reads a manifest and returns `lints.workspace`.
fn workspace_lints(manifest_path: &Utf8Path) -> Result<bool, Failed> {
    let manifest = toml::Table::from_str(&std::fs::read_to_string(manifest_path)?)?;
    Ok(manifest
        .get("lints")
        .and_then(|lints| lints.get("workspace"))
        .and_then(toml::Value::as_bool)
        .unwrap_or(false))
}

/// Returns the packages that are members of the workspace.
fn members(metadata: &Metadata) -> Vec<&Package> {
    metadata
        .packages
        .iter()
        .filter(|package| metadata.workspace_members.contains(&package.id))
        .collect()
}

/// Checks applied to every member crate.
fn package_trials(metadata: &Metadata, package: &Package, capture: bool) -> Vec<Trial> {
    let name = package.name.to_string();
    let mut trials = vec![Trial::test(format!("{name}::workspace-lints"), {
        let manifest_path = package.manifest_path.clone();
        move || {
            workspace_lints(&manifest_path)?
                .then_some(())
                .ok_or_else(|| "Missing `lints.workspace = true`".into())
        }
    })];

    // `publish = false` shows up as an empty registry list.
    let publishable = |package: &Package| {
        package
            .publish
            .as_ref()
            .is_none_or(|registries| !registries.is_empty())
    };
    if publishable(package) {
        let unpublishable: Vec<String> = package
            .dependencies
            .iter()
            .filter(|dependency| {
                members(metadata)
                    .iter()
                    .any(|member| *member.name == dependency.name && !publishable(*member))
            })
            .map(|dependency| dependency.name.clone())
            .collect();
        trials.push(Trial::test(format!("{name}::publishable"), move || {
            if unpublishable.is_empty() {
                Ok(())
            } else {
                let message = format!("has non-publish dependencies: {unpublishable:?}");
                Err(message.into())
            }
        }));
    }

    let miri = package
        .metadata
        .pointer("/workspace-checks/miri")
        .and_then(|miri| miri.as_bool())
        .unwrap_or(true);
    if miri {
        trials.push(
            Trial::test(format!("{name}::miri"), {
                let dir = package.manifest_path.parent().map(Utf8Path::to_owned);
                move || {
                    Command::new("cargo")
                        .args(["miri", "test", "--all-features"])
                        .current_dir(dir.ok_or("manifest without directory")?)
                        .run_as_test(capture)
                }
            })
            .with_ignored_flag(true),
        );
    }

    trials
}

/// Tool checks over the whole workspace, only run when ignored tests are requested.
fn tool_trials(root: &Utf8Path, capture: bool) -> Vec<Trial> {
    let tool = |name: &str, args: &'static [&'static str]| {
        let root = root.to_owned();
        Trial::test(format!("workspace::{name}"), move || {
            Command::new("cargo")
                .args(args)
                .current_dir(&root)
                .run_as_test(capture)
        })
        .with_ignored_flag(true)
    };

    vec![
        tool(
            "clippy",
            &[
                "clippy",
                "--all-targets",
                "--workspace",
                "--all-features",
                "--",
                "-Dwarnings",
            ],
        ),
        tool("fmt", &["fmt", "--all", "--check"]),
        tool(
            "doc",
            &["doc", "--no-deps", "--workspace", "--all-features"],
        ),
    ]
}

fn main() -> std::process::ExitCode {
    let args = libtest_mimic::Arguments::from_args();
    let capture = !args.nocapture;

    let root = Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("the workspace crate lives inside the workspace");
    let metadata = MetadataCommand::new()
        .manifest_path(root.join("Cargo.toml"))
        .no_deps()
        .exec()
        .expect("the workspace manifest should be valid");

    let trials: Vec<Trial> = members(&metadata)
        .into_iter()
        .flat_map(|package| package_trials(&metadata, package, capture))
        .chain(tool_trials(root, capture))
        .collect();

    libtest_mimic::run(&args, trials).exit_code()
}
