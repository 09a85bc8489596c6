//! BAIN wizard installer - command line entry point
//!
//! Offline tooling around the wizard installer library: archive inspection,
//! requirement checks and building install trees from recorded decisions.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use bain_wizard::archive::{discover_subpackages, find_wizard_base, image_entries, GamebryoDataChecker};
use bain_wizard::cli::{Cli, Commands};
use bain_wizard::config::InstallerSettings;
use bain_wizard::context::VersionRequirements;
use bain_wizard::requirements::{check_requirements, Facet, StaticEnvironment};
use bain_wizard::state::CompletedRun;
use bain_wizard::transform::ArchiveTransformer;
use bain_wizard::tree::{write_tree, DirectorySource, FileTree};

/// Initialize logging: `RUST_LOG` overrides the default `info` level
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { archive } => inspect(&settings, &archive),
        Commands::Check {
            game,
            script_extender,
            graphics_extender,
            wrye_bash,
            installed_game,
            installed_script_extender,
        } => {
            let requirements = VersionRequirements {
                game,
                script_extender,
                graphics_extender,
                wrye_bash,
            };
            let mut environment = settings.environment.clone().unwrap_or_default();
            if installed_game.is_some() {
                environment.game_version = installed_game;
            }
            if installed_script_extender.is_some() {
                environment.script_extender_version = installed_script_extender;
            }
            check(&requirements, &environment)
        }
        Commands::Apply {
            archive,
            decisions,
            output,
        } => apply(&settings, &archive, &decisions, &output),
        Commands::Validate { file } => validate(&file),
    }
}

fn load_settings(path: Option<&Path>) -> Result<InstallerSettings> {
    let Some(path) = path else {
        return Ok(InstallerSettings::default());
    };
    info!("Loading settings from {:?}", path);
    let settings = InstallerSettings::load_from_file(path)?;
    settings
        .validate()
        .with_context(|| format!("Invalid settings in {:?}", path))?;
    Ok(settings)
}

fn load_archive(archive: &Path) -> Result<FileTree> {
    FileTree::from_directory(archive)
        .with_context(|| format!("Failed to read archive directory {:?}", archive))
}

fn inspect(settings: &InstallerSettings, archive: &Path) -> Result<()> {
    let tree = load_archive(archive)?;
    let Some(base) = find_wizard_base(&tree) else {
        bail!("No wizard.txt found in {:?}", archive);
    };

    let base_name = if base.name().is_empty() { "." } else { base.name() };
    println!("Wizard base: {}", base_name);

    let subpackages = discover_subpackages(base, &GamebryoDataChecker::default());
    println!("Sub-packages ({}):", subpackages.len());
    for package in &subpackages {
        println!("  {} ({} files)", package.name(), package.files().len());
        for plugin in package.plugins(&settings.transform.plugin_extensions) {
            println!("    - {}", plugin);
        }
    }

    let images = image_entries(base, &settings.image_extensions);
    println!("Images ({}):", images.len());
    for image in images {
        println!("  {}", image);
    }
    Ok(())
}

fn check(requirements: &VersionRequirements, environment: &StaticEnvironment) -> Result<()> {
    let status = check_requirements(requirements, environment);
    for facet in Facet::all() {
        let required = facet.required(requirements).unwrap_or("-");
        let installed = facet
            .installed(environment)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let mark = if status.facet(facet) { "✓" } else { "✗" };
        println!("{} {}: required {}, installed {}", mark, facet, required, installed);
    }

    if status.all_satisfied() {
        println!("All requirements are met");
    } else {
        println!("Requirements are not met, installation would need confirmation");
    }
    Ok(())
}

fn apply(settings: &InstallerSettings, archive: &Path, decisions: &Path, output: &Path) -> Result<()> {
    let tree = load_archive(archive)?;
    let Some(base) = find_wizard_base(&tree) else {
        bail!("No wizard.txt found in {:?}", archive);
    };

    let content = fs::read_to_string(decisions)
        .with_context(|| format!("Failed to read decisions from {:?}", decisions))?;
    let run: CompletedRun =
        serde_json::from_str(&content).context("Failed to parse decisions JSON")?;

    let source = DirectorySource::new(archive);
    let transformed = ArchiveTransformer::new(&settings.transform, &source)
        .transform(base, &run)
        .context("Failed to build the install tree")?;
    println!("{}", transformed.report.summary());

    if let Err(e) = write_tree(&transformed.tree, &source, output) {
        error!("Writing {:?} failed: {}", output, e);
        return Err(e).with_context(|| format!("Failed to write install tree to {:?}", output));
    }
    info!("Install tree written to {:?}", output);
    println!("✓ Install tree written to {:?}", output);
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    info!("Validating settings file: {:?}", path);
    let settings = InstallerSettings::load_from_file(path)?;
    match settings.validate() {
        Ok(()) => {
            println!("✓ Settings file is valid: {:?}", path);
            Ok(())
        }
        Err(e) => {
            error!("Settings validation failed: {}", e);
            eprintln!("✗ Settings validation failed: {}", e);
            std::process::exit(1);
        }
    }
}
