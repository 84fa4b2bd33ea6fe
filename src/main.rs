use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Report, Result};
use opsctl::application::purge::PurgeOrchestrator;
use opsctl::application::registration::PaymentRegistrar;
use opsctl::domain::endpoint::{Endpoint, EndpointDefaults};
use opsctl::domain::service::{INVOICING, ServiceRegistry};
use opsctl::error::OpsError;
use opsctl::infrastructure::woorl::WoorlGateway;
use opsctl::interfaces::csv::payment_reader::PaymentReader;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Exit status of a purge that ran out of attempts.
const EXIT_INCOMPLETE: u8 = 2;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// woorl command line; may be a wrapper such as "docker run --rm woorl"
    #[arg(long, env = "WOORL", default_value = "woorl", global = true)]
    woorl: String,

    /// Log debug output, including every woorl command line
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove every object from the domain config repository
    Purge {
        /// Maximum number of checkout-and-remove passes
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        attempts: u32,

        /// Dominant address (default: $FISTFUL_IPADDR or fistful_server)
        #[arg(short = 'a', long)]
        ip_addr: Option<String>,

        /// Dominant port (default: $FISTFUL_PORT or 8022)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create invoices and register payments from a CSV file
    RegisterPayments {
        /// CSV file with one payment per row
        csv_file: PathBuf,

        /// Hellgate host (default: $HELLGATE or hellgate)
        #[arg(long)]
        hellgate_host: Option<String>,

        /// Hellgate port (default: $HELLGATE_PORT or 8022)
        #[arg(long)]
        hellgate_port: Option<u16>,

        /// Path to payment_processing.thrift
        #[arg(long)]
        damsel_proto: Option<PathBuf>,

        /// Print requests without executing them
        #[arg(long)]
        dry_run: bool,

        /// Skip invoice creation, only register payments
        #[arg(long)]
        skip_invoice_creation: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = ServiceRegistry::builtin();

    match cli.command {
        Commands::Purge {
            attempts,
            ip_addr,
            port,
        } => {
            let endpoint = Endpoint::resolve(ip_addr, port, &EndpointDefaults::FISTFUL);
            let gateway = WoorlGateway::new(Arc::new(registry), endpoint, &cli.woorl);
            purge(gateway, attempts).await
        }
        Commands::RegisterPayments {
            csv_file,
            hellgate_host,
            hellgate_port,
            damsel_proto,
            dry_run,
            skip_invoice_creation,
        } => {
            let registry = match damsel_proto {
                Some(schema) => registry.with_schema(INVOICING, schema)?,
                None => registry,
            };
            let endpoint = Endpoint::resolve(hellgate_host, hellgate_port, &EndpointDefaults::HELLGATE);
            let gateway =
                WoorlGateway::new(Arc::new(registry), endpoint, &cli.woorl).dry_run(dry_run);
            register_payments(gateway, csv_file, skip_invoice_creation).await
        }
    }
}

async fn purge(gateway: WoorlGateway, attempts: u32) -> Result<ExitCode> {
    let orchestrator = PurgeOrchestrator::new(Box::new(gateway));

    match orchestrator.purge(attempts).await {
        Ok(report) => {
            println!("{report}");
            println!("Done.");
            if report.is_complete() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(EXIT_INCOMPLETE))
            }
        }
        Err(e) => {
            // A rejected strict call ends the program with woorl's own status.
            if let OpsError::CallFailed { status, .. } = &e {
                let status = *status;
                eprintln!("{:?}", Report::new(e));
                std::process::exit(status);
            }
            Err(e.into())
        }
    }
}

async fn register_payments(
    gateway: WoorlGateway,
    csv_file: PathBuf,
    skip_invoice_creation: bool,
) -> Result<ExitCode> {
    tracing::info!(endpoint = ?gateway.endpoint(), "registering payments");

    let file = File::open(&csv_file).into_diagnostic()?;
    let mut reader = PaymentReader::new(file);
    let headers = reader.headers()?;
    tracing::debug!(columns = %headers.join(", "), "CSV columns");

    let registrar =
        PaymentRegistrar::new(Box::new(gateway)).skip_invoice_creation(skip_invoice_creation);
    let summary = registrar.register_all(reader.rows()).await?;

    println!("{}", "=".repeat(60));
    println!("{summary}");
    println!("{}", "=".repeat(60));

    if summary.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
