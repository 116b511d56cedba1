//! nativeload CLI - inspect platforms and extract native bundles
//!
//! Commands:
//! - `nativeload platforms` - List the recognized standard platforms
//! - `nativeload resolve` - Print the resolved OS and architecture
//! - `nativeload locate` - Print a bundle's archive name and staging path
//! - `nativeload extract` - Extract a bundle and publish the search path

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use nativeload::{
    Architecture, BundleId, EnvSearchPath, LibraryRegistry, OperatingSystem, Platform,
    StagingLayout,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "nativeload")]
#[command(author, version, about = "Native library bundle extraction tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BundleArgs {
    /// Path, relative to the resources root, containing the library bundles
    #[arg(short = 'p', long, default_value = "")]
    resource_path: String,

    /// Base name of the library bundles; bundles must be named
    /// {name}-{os}-{arch}.zip
    #[arg(short = 'l', long)]
    lib_name: String,

    /// Directory containing the packaged bundle archives
    #[arg(long, default_value = ".")]
    resources: PathBuf,

    /// Staging root directory (default: the system temporary directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Subpath inserted between the staging root and the platform directories
    #[arg(long)]
    subpath: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the recognized standard platforms
    Platforms {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the resolved OS and architecture
    Resolve {
        /// Raw OS name to resolve (default: the current host's)
        #[arg(long)]
        os: Option<String>,

        /// Raw architecture name to resolve (default: the current host's)
        #[arg(long)]
        arch: Option<String>,
    },

    /// Print the computed archive name and staging path for a bundle
    Locate {
        #[command(flatten)]
        bundle: BundleArgs,
    },

    /// Extract a bundle and publish the staging directories
    Extract {
        #[command(flatten)]
        bundle: BundleArgs,

        /// Environment variable holding the native-library search path
        #[arg(long, default_value = "NATIVE_LIBRARY_PATH")]
        path_var: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Platforms { json } => platforms(json)?,
        Commands::Resolve { os, arch } => resolve(os.as_deref(), arch.as_deref()),
        Commands::Locate { bundle } => locate(&bundle)?,
        Commands::Extract { bundle, path_var } => {
            if let Err(err) = extract(&bundle, &path_var) {
                // Failure message goes to stdout, exit code signals the error.
                println!("{err:#}");
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn platforms(json: bool) -> anyhow::Result<()> {
    if json {
        let value = serde_json::json!({
            "operating_systems": OperatingSystem::all()
                .iter()
                .map(|os| os.native_str().to_string())
                .collect::<Vec<_>>(),
            "architectures": Architecture::all()
                .iter()
                .map(|arch| serde_json::json!({
                    "name": arch.canonical_name(),
                    "description": arch.description(),
                    "aliases": arch.aliases(),
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Operating systems:");
    for os in OperatingSystem::all() {
        println!("  {}", os.native_str());
    }
    println!("Architectures:");
    for arch in Architecture::all() {
        let aliases = arch.aliases();
        if aliases.is_empty() {
            println!("  {:10} {}", arch.canonical_name(), arch.description());
        } else {
            println!(
                "  {:10} {} (aliases: {})",
                arch.canonical_name(),
                arch.description(),
                aliases.join(", ")
            );
        }
    }
    Ok(())
}

fn resolve(os: Option<&str>, arch: Option<&str>) {
    let raw_os = os.unwrap_or(std::env::consts::OS);
    let raw_arch = arch.unwrap_or(std::env::consts::ARCH);

    println!(
        "OS:   {}",
        OperatingSystem::resolve(Some(raw_os)).native_str()
    );
    match Architecture::resolve(Some(raw_arch)) {
        Some(arch) => println!("Arch: {}", arch.canonical_name()),
        None => println!("Arch: unresolved ({raw_arch})"),
    }
}

fn current_platform() -> anyhow::Result<Platform> {
    Platform::current().with_context(|| {
        format!(
            "unable to determine canonical architecture for \"{}\"",
            std::env::consts::ARCH
        )
    })
}

fn staging_layout(args: &BundleArgs) -> StagingLayout {
    let layout = match &args.root {
        Some(root) => StagingLayout::new(root),
        None => StagingLayout::default(),
    };
    match &args.subpath {
        Some(subpath) => layout.with_subpath(subpath),
        None => layout,
    }
}

fn locate(args: &BundleArgs) -> anyhow::Result<()> {
    let platform = current_platform()?;
    let bundle = BundleId::new(&args.resource_path, &args.lib_name)?;

    println!(
        "Native Lib Archive: {}",
        bundle.archive_resource_name(&platform)
    );
    println!(
        "Staging Directory:  {}",
        staging_layout(args).dir_for(&platform).display()
    );
    Ok(())
}

fn extract(args: &BundleArgs, path_var: &str) -> anyhow::Result<()> {
    let platform = current_platform()?;
    let bundle = BundleId::new(&args.resource_path, &args.lib_name)?;

    let registry = LibraryRegistry::new(
        args.resources.clone(),
        staging_layout(args),
        platform,
        Arc::new(EnvSearchPath::new(path_var)),
    );

    registry
        .extract_and_publish(&bundle)
        .with_context(|| format!("Error extracting native libraries [{bundle}]"))?;

    println!("Extracted:          {bundle}");
    println!(
        "Staging Directory:  {}",
        registry.staging_dir().display()
    );
    Ok(())
}
