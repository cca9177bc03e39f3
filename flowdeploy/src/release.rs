//! Release tagging and change analysis backed by Git
//!
//! Versions live in annotated tags named `<git-safe-base-name>-v<semver>`.
//! Change analysis materializes the entity's file from the production branch
//! and from the current branch and runs the same structural comparator the
//! backup auditor uses.

use crate::audit::diff_workflows;
use crate::config::DeployConfig;
use crate::error::{FlowDeployError, Result};
use crate::names::NameCodec;
use crate::workflow::Workflow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

/// The branch holding the production copies of exported workflows
pub const PRODUCTION_BRANCH: &str = "production";

/// A dot-separated release version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
}

impl Version {
    /// The version suggested when no release exists yet
    pub const INITIAL: Version = Version {
        major: 1,
        minor: 0,
        patch: 0,
    };

    /// The next patch release after this one
    pub fn next_patch(&self) -> Version {
        Version {
            major: self.major,
            minor: self.minor,
            patch: self.patch + 1,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = FlowDeployError;

    /// Parse `v1.2.3`, `1.2` or `2`; missing segments are zero
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches(['v', 'V']);
        if trimmed.is_empty() {
            return Err(FlowDeployError::Other(format!("Invalid version '{s}'")));
        }
        let mut components = [0u64; 3];
        for (i, part) in trimmed.splitn(3, '.').enumerate() {
            components[i] = part
                .parse()
                .map_err(|_| FlowDeployError::Other(format!("Invalid version '{s}'")))?;
        }
        Ok(Version {
            major: components[0],
            minor: components[1],
            patch: components[2],
        })
    }
}

/// Suggest the next version: `v1.0.0` when none exists, otherwise a patch
/// bump preserving major and minor.
pub fn suggest_next_version(current: Option<&Version>) -> Version {
    match current {
        Some(version) => version.next_patch(),
        None => Version::INITIAL,
    }
}

/// Lowercase a base name into a tag-safe slug: runs of characters outside
/// `[a-z0-9]` become single dashes.
pub fn git_safe_name(base_name: &str) -> String {
    let mut result = String::with_capacity(base_name.len());
    let mut prev_dash = true;
    for c in base_name.chars() {
        if c.is_ascii_alphanumeric() {
            result.extend(c.to_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            result.push('-');
            prev_dash = true;
        }
    }
    result.trim_end_matches('-').to_string()
}

/// Derives version tags from Git history and drives tag/branch creation
pub struct ReleaseCoordinator {
    codec: NameCodec,
    work_dir: PathBuf,
}

impl ReleaseCoordinator {
    /// Build a coordinator for a Git working directory.
    ///
    /// Fails when the directory is not inside a Git repository.
    pub fn new(config: &DeployConfig, work_dir: &Path) -> Result<Self> {
        let coordinator = Self {
            codec: NameCodec::new(config),
            work_dir: work_dir.to_path_buf(),
        };
        coordinator.git(&["rev-parse", "--git-dir"]).map_err(|_| {
            FlowDeployError::Other(format!(
                "'{}' is not inside a git repository",
                work_dir.display()
            ))
        })?;
        Ok(coordinator)
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .current_dir(&self.work_dir)
            .args(args)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FlowDeployError::git_command_failed(
                args.join(" "),
                output.status.code().unwrap_or(-1),
                &stderr,
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// The highest released version for a base name, from tags matching
    /// `<git-safe-name>-*`. No tags means no releases, not an error.
    pub fn current_version(&self, base_name: &str) -> Result<Option<Version>> {
        let prefix = format!("{}-", git_safe_name(base_name));
        let pattern = format!("{prefix}*");
        let stdout = self.git(&["tag", "-l", &pattern])?;

        let mut best: Option<Version> = None;
        for tag in stdout.lines() {
            let Some(suffix) = tag.strip_prefix(&prefix) else {
                continue;
            };
            // Tags with unparsable suffixes are not releases of this scheme
            if let Ok(version) = suffix.parse::<Version>() {
                best = Some(match best {
                    Some(current) if current >= version => current,
                    _ => version,
                });
            }
        }
        Ok(best)
    }

    /// Create an annotated release tag for a base name
    pub fn create_tag(&self, base_name: &str, version: &Version, message: &str) -> Result<String> {
        let tag = format!("{}-{}", git_safe_name(base_name), version);
        self.git(&["tag", "-a", &tag, "-m", message])?;
        Ok(tag)
    }

    /// Create a branch at the current HEAD
    pub fn create_branch(&self, name: &str) -> Result<()> {
        self.git(&["branch", name])?;
        Ok(())
    }

    /// Push a ref (tag or branch) to origin
    pub fn push_ref(&self, reference: &str) -> Result<()> {
        self.git(&["push", "origin", reference])?;
        Ok(())
    }

    /// Files changed between two refs
    pub fn changed_files(&self, ref_a: &str, ref_b: &str) -> Result<Vec<String>> {
        let stdout = self.git(&["diff", "--name-only", ref_a, ref_b])?;
        Ok(stdout.lines().map(str::to_string).collect())
    }

    /// Render a human-readable changelog for a base name against the
    /// production branch.
    ///
    /// A workflow with no production-branch copy is reported as new; anything
    /// else goes through the structural comparator.
    pub fn analyze_changes(&self, base_name: &str, version: &Version) -> Result<String> {
        let rel_path = format!("workflows/{}", self.codec.file_name(base_name));

        let production = self.show_file(PRODUCTION_BRANCH, &rel_path)?;
        let current = match self.show_file("HEAD", &rel_path)? {
            Some(content) => content,
            // Not committed yet: fall back to the working tree
            None => std::fs::read_to_string(self.work_dir.join(&rel_path)).map_err(|_| {
                FlowDeployError::Other(format!(
                    "No copy of '{rel_path}' found on HEAD or in the working tree"
                ))
            })?,
        };

        let mut report = format!("# {base_name} {version}\n\n");
        match production {
            None => {
                report.push_str("New workflow: no production copy exists yet.\n");
            }
            Some(production) => {
                let before: Workflow = serde_json::from_str(&production).map_err(|e| {
                    FlowDeployError::Other(format!("Production copy of '{rel_path}': {e}"))
                })?;
                let after: Workflow = serde_json::from_str(&current).map_err(|e| {
                    FlowDeployError::Other(format!("Current copy of '{rel_path}': {e}"))
                })?;

                let changes = diff_workflows(&before, &after);
                if changes.is_empty() {
                    report.push_str("No structural changes.\n");
                } else {
                    for change in &changes {
                        report.push_str(&format!("- {}\n", change.describe()));
                    }
                }
            }
        }
        Ok(report)
    }

    /// Contents of a file in a ref's tree, or `None` when the ref or path
    /// does not exist there
    fn show_file(&self, reference: &str, rel_path: &str) -> Result<Option<String>> {
        match self.git(&["show", &format!("{reference}:{rel_path}")]) {
            Ok(content) => Ok(Some(content)),
            Err(FlowDeployError::GitCommandFailed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
