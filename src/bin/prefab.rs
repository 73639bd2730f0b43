//! prefab CLI - declarative code fabrication from YAML DAO definitions
//!
//! Assembles a fabrication tree for every `*.prefab.definition.yml` below a
//! project's `src/` directory and renders the supporting actors into `fab/`.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use prefab::{assemble, FabricatedEntity, Generator, PrefabError, ProjectConfig, SpecLoader};

const LOG_ENV: &str = "PREFAB_LOG";

#[derive(Parser)]
#[command(name = "prefab")]
#[command(version, about = "Declarative code fabrication from YAML DAO definitions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fabricate every DAO definition of a project
    Generate {
        /// Project root (contains composer.json and src/)
        #[arg(short, long, default_value = ".")]
        project_dir: PathBuf,

        /// Path to prefab.yaml (default: <project-dir>/prefab.yaml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Template directory holding Actor/... templates
        #[arg(short, long)]
        templates: Option<PathBuf>,

        /// Output directory for fabricated actors
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of entities fabricated at once
        #[arg(short, long)]
        workers: Option<usize>,

        /// Project name (overrides prefab.yaml and composer.json)
        #[arg(long)]
        project_name: Option<String>,
    },

    /// Print the fabrication tree of one definition
    Assemble {
        /// Path to a *.prefab.definition.yml file
        definition: PathBuf,

        /// Project name used in namespaces
        #[arg(long)]
        project_name: String,

        /// Write the tree to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Load and assemble every definition without writing anything
    Validate {
        /// Project root (contains composer.json and src/)
        #[arg(short, long, default_value = ".")]
        project_dir: PathBuf,

        /// Path to prefab.yaml (default: <project-dir>/prefab.yaml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Project name (overrides prefab.yaml and composer.json)
        #[arg(long)]
        project_name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            project_dir,
            config,
            templates,
            output,
            workers,
            project_name,
        } => generate(project_dir, config, templates, output, workers, project_name).await,
        Commands::Assemble {
            definition,
            project_name,
            out,
        } => assemble_definition(definition, project_name, out),
        Commands::Validate {
            project_dir,
            config,
            project_name,
        } => validate(project_dir, config, project_name),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_config(project_dir: &Path, config: Option<PathBuf>) -> Result<ProjectConfig, PrefabError> {
    match config {
        Some(path) => ProjectConfig::from_file(path),
        None => ProjectConfig::discover(project_dir),
    }
}

/// Fabricate every definition of the project
async fn generate(
    project_dir: PathBuf,
    config: Option<PathBuf>,
    templates: Option<PathBuf>,
    output: Option<PathBuf>,
    workers: Option<usize>,
    project_name: Option<String>,
) -> Result<(), String> {
    let mut config = load_config(&project_dir, config).map_err(|e| e.to_string())?;
    if let Some(templates) = templates {
        config.paths.templates = templates.to_string_lossy().into_owned();
    }
    if let Some(output) = output {
        config.paths.output = output.to_string_lossy().into_owned();
    }
    if let Some(workers) = workers {
        config.workers = workers.max(1);
    }
    if project_name.is_some() {
        config.project_name = project_name;
    }

    let progress = Arc::new(|fabricated: &FabricatedEntity| {
        println!("  ✓ Fabricated {} ({} files)", fabricated.directory.display(), fabricated.files.len());
    });
    let generator = Generator::new(project_dir.clone(), config).with_commit_hook(progress);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n⚠ Interrupted, finishing entities already in progress...");
            ctrl_c.cancel();
        }
    });

    println!("🔧 Fabricating {}...", project_dir.display());
    let report = generator.generate(&cancel).await.map_err(|e| e.to_string())?;

    println!("  ℹ Project name: {}", report.project_name);
    println!("  ℹ {} entities fabricated", report.build.completed.len());
    if !report.skeleton_files.is_empty() {
        println!("  ✓ Copied {} skeleton files", report.skeleton_files.len());
    }
    if !report.fabrication_files.is_empty() {
        println!("  ✓ Wrote {} fabrication trees", report.fabrication_files.len());
    }
    for (definition, error) in &report.definition_failures {
        println!("  ✗ {}: {}", definition.display(), error);
    }
    for (entity, error) in &report.build.failed {
        println!("  ✗ {}: {}", entity, error);
    }
    for entity in &report.build.skipped {
        println!("  ⚠ Skipped {}", entity);
    }
    println!("  ℹ {} service definitions for the container builder", report.service_definitions.len());

    if !report.is_success() {
        return Err(format!(
            "{} definitions and {} entities failed, {} skipped",
            report.definition_failures.len(),
            report.build.failed.len(),
            report.build.skipped.len()
        ));
    }

    println!("✨ Fabrication complete!");
    Ok(())
}

/// Print or write the fabrication tree of one definition
fn assemble_definition(definition: PathBuf, project_name: String, out: Option<PathBuf>) -> Result<(), String> {
    let record = SpecLoader::new(project_name)
        .load(&definition)
        .map_err(|e| e.to_string())?;
    let yaml = assemble(&record)
        .and_then(|tree| tree.to_yaml())
        .map_err(|e| e.to_string())?;

    match out {
        Some(path) => {
            prefab::fs_utils::write_file(&path, yaml).map_err(|e| e.to_string())?;
            println!("  ✓ Generated {}", path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}

/// Load and assemble without writing
fn validate(project_dir: PathBuf, config: Option<PathBuf>, project_name: Option<String>) -> Result<(), String> {
    let mut config = load_config(&project_dir, config).map_err(|e| e.to_string())?;
    if project_name.is_some() {
        config.project_name = project_name;
    }

    println!("🔍 Validating definitions in {}...", project_dir.display());
    let generator = Generator::new(project_dir, config);
    let project_name = generator.project_name().map_err(|e| e.to_string())?;
    let assembly = generator.assemble_all(&project_name).map_err(|e| e.to_string())?;

    for entity in &assembly.entities {
        println!(
            "  ✓ {} ({} supporting actors)",
            entity.definition.display(),
            entity.tree.supporting_actors.len()
        );
    }
    for (definition, error) in &assembly.failed {
        println!("  ✗ {}: {}", definition.display(), error);
    }

    if !assembly.failed.is_empty() {
        return Err(format!("{} definitions failed validation", assembly.failed.len()));
    }

    println!("✨ All {} definitions are valid", assembly.entities.len());
    Ok(())
}
