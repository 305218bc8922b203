use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::exit;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use lambda_bundle_core::layout::{
    BundleLayout, DEFAULT_ASSETS_DIR, DEFAULT_ENTRY_POINT, DEFAULT_MANIFEST,
    DEFAULT_OUTPUT_ARCHIVE, DEFAULT_STAGING_DIR,
};
use lambda_bundle_core::plan::build_plan;
use lambda_bundle_pipeline::adapters::archive::{list_entries, ArchiveCompression};
use lambda_bundle_pipeline::adapters::installer::{InstallerKind, PipInstaller};
use lambda_bundle_pipeline::error::BundleError;
use lambda_bundle_pipeline::orchestrator::{load_manifest, run_bundle, BundleOptions};
use serde_json::json;
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "lambda-bundle",
    version,
    about = "Package a Python function, its dependencies and static assets into a zip",
    long_about = "Installs the manifest's dependencies into a staging directory, copies the\n\
                  entry point and the static assets next to them, zips the result and removes\n\
                  the staging directory. With no subcommand a full package run is performed."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    layout: LayoutArgs,

    #[command(flatten)]
    package: PackageArgs,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the archive (the default when no subcommand is given)
    Package,
    /// Validate the layout and print the steps a package run would perform
    Plan,
    /// List the entries of an archive
    Inspect {
        /// Archive to list; defaults to the configured output archive
        archive: Option<PathBuf>,
    },
}

#[derive(Args)]
struct LayoutArgs {
    /// Directory that relative paths are resolved against
    #[arg(long, global = true, env = "LAMBDA_BUNDLE_PROJECT_DIR", default_value = ".")]
    project_dir: PathBuf,
    /// Dependency manifest handed to the installer
    #[arg(long, global = true, env = "LAMBDA_BUNDLE_MANIFEST", default_value = DEFAULT_MANIFEST)]
    manifest: PathBuf,
    /// Application entry point copied to the archive root
    #[arg(long, global = true, env = "LAMBDA_BUNDLE_ENTRY_POINT", default_value = DEFAULT_ENTRY_POINT)]
    entry_point: PathBuf,
    /// Static asset directory copied into the archive under its own name
    #[arg(long, global = true, env = "LAMBDA_BUNDLE_ASSETS_DIR", default_value = DEFAULT_ASSETS_DIR)]
    assets_dir: PathBuf,
    /// Ephemeral directory the bundle is assembled in
    #[arg(long, global = true, env = "LAMBDA_BUNDLE_STAGING_DIR", default_value = DEFAULT_STAGING_DIR)]
    staging_dir: PathBuf,
    /// Archive to write
    #[arg(short, long, global = true, env = "LAMBDA_BUNDLE_OUTPUT", default_value = DEFAULT_OUTPUT_ARCHIVE)]
    output: PathBuf,
}

#[derive(Args)]
struct PackageArgs {
    /// How the package installer is invoked
    #[arg(value_enum, long, global = true, env = "LAMBDA_BUNDLE_INSTALLER", default_value_t = Installer::Pip)]
    installer: Installer,
    /// Executable to run instead of the installer's default program
    #[arg(long, global = true, env = "LAMBDA_BUNDLE_INSTALLER_PROGRAM")]
    installer_program: Option<String>,
    /// Pass --quiet to the installer
    #[arg(long, global = true)]
    quiet_installer: bool,
    /// Compression applied to archive entries
    #[arg(value_enum, long, global = true, default_value_t = Compression::Deflated)]
    compression: Compression,
    /// Leave the staging directory in place after a successful run
    #[arg(long, global = true)]
    keep_staging: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Installer {
    /// `pip install ...`
    Pip,
    /// `pip3 install ...`
    Pip3,
    /// `python3 -m pip install ...`
    PythonModule,
}

impl From<Installer> for InstallerKind {
    fn from(value: Installer) -> Self {
        match value {
            Installer::Pip => Self::Pip,
            Installer::Pip3 => Self::Pip3,
            Installer::PythonModule => Self::PythonModule,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Compression {
    Deflated,
    Stored,
}

impl From<Compression> for ArchiveCompression {
    fn from(value: Compression) -> Self {
        match value {
            Compression::Deflated => Self::Deflated,
            Compression::Stored => Self::Stored,
        }
    }
}

impl LayoutArgs {
    fn to_layout(&self) -> BundleLayout {
        BundleLayout {
            project_dir: self.project_dir.clone(),
            manifest: self.manifest.clone(),
            entry_point: self.entry_point.clone(),
            assets_dir: self.assets_dir.clone(),
            staging_dir: self.staging_dir.clone(),
            output_archive: self.output.clone(),
        }
    }
}

impl PackageArgs {
    fn installer(&self) -> PipInstaller {
        let installer = PipInstaller::new(self.installer.into()).quiet(self.quiet_installer);
        match &self.installer_program {
            Some(program) => installer.with_program(program.clone()),
            None => installer,
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}

// ── commands ───────────────────────────────────────────────────────

fn package(cli: &Cli) -> Result<()> {
    let options = BundleOptions {
        layout: cli.layout.to_layout(),
        compression: cli.package.compression.into(),
        keep_staging: cli.package.keep_staging,
    };
    let report = run_bundle(&options, &cli.package.installer())?;

    if cli.json {
        print_json(&serde_json::to_value(&report).context("failed to serialize report")?)?;
    } else {
        eprintln!(
            "\nPackaged artifact:\n- {} (sha256 {})",
            report.archive.path.display(),
            report.archive.sha256
        );
    }
    Ok(())
}

fn plan(cli: &Cli) -> Result<()> {
    let layout = cli.layout.to_layout().resolve().map_err(BundleError::from)?;
    let manifest = load_manifest(&layout)?;
    let steps = build_plan(&layout, cli.package.keep_staging);

    if cli.json {
        return print_json(&json!({
            "layout": layout,
            "requirements": manifest.requirements().count(),
            "steps": steps,
        }));
    }

    for (index, planned) in steps.iter().enumerate() {
        println!("{}. {}: {}", index + 1, planned.label, planned.description);
    }
    Ok(())
}

fn inspect(cli: &Cli, archive: Option<&PathBuf>) -> Result<()> {
    let path = match archive {
        Some(path) => path.clone(),
        None => {
            cli.layout
                .to_layout()
                .resolve()
                .map_err(BundleError::from)?
                .output_archive
        }
    };
    let entries = list_entries(&path)?;

    if cli.json {
        return print_json(&json!({ "archive": path, "entries": entries }));
    }

    for entry in &entries {
        println!("{}", entry.name);
    }
    println!("{} entries", entries.len());
    Ok(())
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        None | Some(Commands::Package) => package(&cli),
        Some(Commands::Plan) => plan(&cli),
        Some(Commands::Inspect { archive }) => inspect(&cli, archive.as_ref()),
    };

    if let Err(error) = result {
        tracing::error!("{error:#}");
        let code = error
            .downcast_ref::<BundleError>()
            .map(BundleError::exit_code)
            .unwrap_or(1);
        exit(code);
    }
}
