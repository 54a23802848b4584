//! Command-line interface for soapwire

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::sync::Arc;

#[cfg(feature = "cli")]
use soapwire::encoding::{decode, Decoded};
#[cfg(feature = "cli")]
use soapwire::envelope::parse_envelope;
#[cfg(feature = "cli")]
use soapwire::loaders::Loader;
#[cfg(feature = "cli")]
use soapwire::wsdl::{SchemaModel, TypeKind, WsdlParser};
#[cfg(feature = "cli")]
use soapwire::SoapConfig;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "soapwire")]
#[command(author, version, about = "SOAP 1.1 and WSDL 1.1 inspection tool", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON configuration file (limits, server and client settings)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarize a WSDL document
    Inspect {
        /// Path to the WSDL file
        #[arg(value_name = "WSDL")]
        wsdl: PathBuf,

        /// Dump the whole model as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the resolved wire description of one operation
    Operation {
        /// Path to the WSDL file
        #[arg(value_name = "WSDL")]
        wsdl: PathBuf,

        /// Operation name
        #[arg(value_name = "NAME")]
        name: String,

        /// Prefer ports of this service
        #[arg(short, long)]
        service: Option<String>,
    },

    /// Decode a SOAP envelope and print its body as JSON
    Envelope {
        /// Path to the envelope file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => match SoapConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => SoapConfig::default(),
    };

    let result = match cli.command {
        Commands::Inspect { wsdl, json } => cmd_inspect(&config, &wsdl, json),
        Commands::Operation {
            wsdl,
            name,
            service,
        } => cmd_operation(&config, &wsdl, &name, service.as_deref()),
        Commands::Envelope { file } => cmd_envelope(&config, &file),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn load_model(
    config: &SoapConfig,
    path: &Path,
) -> Result<SchemaModel, Box<dyn std::error::Error>> {
    let location = fs::canonicalize(path)?;
    let loader = Loader::new().with_limits(config.limits.clone());
    let parser = WsdlParser::new()
        .with_resolver(Arc::new(loader))
        .with_limits(config.limits.clone());
    Ok(parser.parse_location(&location.to_string_lossy())?)
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    config: &SoapConfig,
    path: &Path,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = load_model(config, path)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&model)?);
        return Ok(());
    }

    println!("soapwire v{}", soapwire::VERSION);
    println!();
    println!("WSDL Information:");
    match &model.target_namespace {
        Some(ns) => println!("  Target Namespace: {}", ns),
        None => println!("  Target Namespace: (none)"),
    }
    println!("  Schema Namespace: {}", model.xsd_namespace);
    if !model.imports.is_empty() {
        println!("  Imports: {}", model.imports.len());
    }

    println!("\n=== Services ===");
    for service in model.services.values() {
        println!("  {}", service.name);
        if let Some(doc) = &service.documentation {
            println!("    {}", doc);
        }
        for port in service.ports.values() {
            println!(
                "    {} -> {} ({:?}) {}",
                port.name,
                port.binding,
                port.kind,
                port.address.as_deref().unwrap_or("-")
            );
            if let Some(doc) = &port.documentation {
                println!("      {}", doc);
            }
        }
    }

    println!("\n=== Operations ===");
    for name in model.operation_names() {
        match model.find_operation(name, None) {
            Ok(op) => {
                println!("  {} [{}/{}]", name, op.style, op.input.use_);
                if let Some(doc) = &op.documentation {
                    println!("    {}", doc);
                }
            }
            Err(e) => println!("  {} ({})", name, e),
        }
    }

    println!("\n=== Types ===");
    for ty in model.complex_types.values() {
        let kind = match ty.kind {
            TypeKind::Struct => format!("struct, {} members", ty.elements.len()),
            TypeKind::Array => format!(
                "array of {}",
                ty.array_item_type
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "anyType".to_string())
            ),
            TypeKind::Scalar => "scalar".to_string(),
        };
        println!("  {} ({})", ty.name, kind);
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_operation(
    config: &SoapConfig,
    path: &Path,
    name: &str,
    service: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = load_model(config, path)?;
    let operation = model.find_operation(name, service)?;
    println!("{}", serde_json::to_string_pretty(&operation)?);
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_envelope(config: &SoapConfig, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    let envelope = parse_envelope(&bytes, &config.limits)?;

    for header in &envelope.headers {
        let value = decode(&header.value, false)?;
        eprintln!("header {}: {:?}", header.name, value);
    }

    let body = match envelope.body.as_slice() {
        [] => {
            println!("null");
            return Ok(());
        }
        [only] => only.value.clone(),
        entries => soapwire::ValueTree::structure(
            None,
            entries
                .iter()
                .map(|e| (e.name.clone(), e.value.clone()))
                .collect(),
        ),
    };

    match decode(&body, false)? {
        Decoded::Value(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Decoded::Fault(fault) => {
            println!("{}", fault);
            std::process::exit(2);
        }
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
