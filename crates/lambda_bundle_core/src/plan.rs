use serde::Serialize;

use crate::layout::ResolvedLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStep {
    CleanStaging,
    InstallDependencies,
    CopyEntryPoint,
    CopyAssets,
    WriteArchive,
    RemoveStaging,
}

impl BuildStep {
    pub const ALL: [BuildStep; 6] = [
        Self::CleanStaging,
        Self::InstallDependencies,
        Self::CopyEntryPoint,
        Self::CopyAssets,
        Self::WriteArchive,
        Self::RemoveStaging,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::CleanStaging => "Prepare staging directory",
            Self::InstallDependencies => "Install dependencies",
            Self::CopyEntryPoint => "Copy entry point",
            Self::CopyAssets => "Copy static assets",
            Self::WriteArchive => "Write archive",
            Self::RemoveStaging => "Remove staging directory",
        }
    }

    pub fn describe(self, layout: &ResolvedLayout) -> String {
        match self {
            Self::CleanStaging => format!(
                "remove and recreate {}",
                layout.staging_dir.display()
            ),
            Self::InstallDependencies => format!(
                "install packages listed in {} into {}",
                layout.manifest.display(),
                layout.staging_dir.display()
            ),
            Self::CopyEntryPoint => format!(
                "copy {} to {}",
                layout.entry_point.display(),
                layout.staged_entry_point().display()
            ),
            Self::CopyAssets => format!(
                "copy {} recursively to {}",
                layout.assets_dir.display(),
                layout.staged_assets_dir().display()
            ),
            Self::WriteArchive => format!(
                "zip contents of {} into {}",
                layout.staging_dir.display(),
                layout.output_archive.display()
            ),
            Self::RemoveStaging => format!("remove {}", layout.staging_dir.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub step: BuildStep,
    pub label: &'static str,
    pub description: String,
}

/// The ordered steps a package run performs for `layout`.
///
/// With `keep_staging` the final removal is left out of the plan; the
/// staging directory is still removed if an earlier step fails.
pub fn build_plan(layout: &ResolvedLayout, keep_staging: bool) -> Vec<PlannedStep> {
    BuildStep::ALL
        .into_iter()
        .filter(|step| !(keep_staging && *step == BuildStep::RemoveStaging))
        .map(|step| PlannedStep {
            step,
            label: step.label(),
            description: step.describe(layout),
        })
        .collect()
}
