use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use anvil::config::Config;
use anvil::host::{ComposedHost, PluginHost};
use anvil::plugins::{ApplicationPart, NativeModuleLoader, PartOrigin, Route};

/// Anvil - load isolated plugin modules and compose their parts and resources
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to scan for plugin modules
    #[arg(short, long)]
    plugins_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print the startup report as JSON
    #[arg(long)]
    json: bool,

    /// Write the bytes of a static resource to stdout
    #[arg(long, value_name = "RESOURCE")]
    get: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Diagnostics go to stderr so --get output stays clean
    let log_level = if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        Config::load_from_file(config_path)?
    } else {
        Config::load_default()?
    };

    if let Some(dir) = args.plugins_dir {
        config.plugins.directory = Some(dir);
    }

    let home = ApplicationPart::host(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        vec![Route {
            path: "/".to_string(),
            handler: "Home.Index".to_string(),
        }],
    );

    let host = PluginHost::new(config, Box::new(NativeModuleLoader))?
        .with_static_part(home)
        .configure_extensibility()?
        .configure_request_pipeline();

    if let Some(resource) = args.get {
        let Some(bytes) = host.lookup_resource(&resource) else {
            eprintln!("Resource not found: {resource}");
            std::process::exit(1);
        };
        std::io::stdout()
            .write_all(&bytes)
            .context("Failed to write resource")?;
        return Ok(());
    }

    if args.json {
        let json = serde_json::to_string_pretty(host.report())
            .context("Failed to serialize startup report")?;
        println!("{json}");
    } else {
        print_summary(&host);
    }

    Ok(())
}

fn print_summary(host: &ComposedHost) {
    println!("Plugin directory: {}", host.report().scan_root.display());

    println!("\nParts:");
    for part in host.parts().iter() {
        let origin = match &part.origin {
            PartOrigin::Static => "static".to_string(),
            PartOrigin::Dynamic { path, .. } => path.display().to_string(),
        };
        println!("  {} {} ({})", part.name, part.version, origin);
        for route in &part.routes {
            println!("    {} -> {}", route.path, route.handler);
        }
    }

    println!("\nResource providers (lookup order):");
    for (idx, name) in host.resources().member_names().iter().enumerate() {
        println!("  {}. {}", idx + 1, name);
    }

    let failed: Vec<_> = host.report().failed().collect();
    if !failed.is_empty() {
        println!("\nFailed bundles:");
        for outcome in failed {
            println!(
                "  {}: {}",
                outcome.bundle.module().display(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
