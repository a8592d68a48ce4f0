use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use zerossl_http_issuer::core::config::IssuerConfig;
use zerossl_http_issuer::core::logging::{DEFAULT_LOG_FILE, LogOptions, Logging};
use zerossl_http_issuer::issuance::{IssuanceOptions, PollPolicy, ZeroSslClient, run_issuance};

/// Request a ZeroSSL certificate and complete HTTP file validation.
#[derive(Parser, Debug)]
#[command(name = "zerossl-http-issuer", version, about)]
struct Args {
    /// Domain the certificate is issued for.
    #[arg(long)]
    domain: String,

    /// Path to a PEM-encoded certificate signing request.
    #[arg(long)]
    csr_path: PathBuf,

    /// Web root that serves `.well-known/pki-validation/`.
    #[arg(long)]
    project_dir: PathBuf,

    /// Directory receiving certificate.crt and ca_bundle.crt.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Log file, rotated to `<file>.1` on start.
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log at debug level. RUST_LOG takes precedence when set.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let logging = match Logging::init(&LogOptions {
        file: args.log_file.clone(),
        verbose: args.verbose,
    }) {
        Ok(logging) => logging,
        Err(err) => {
            eprintln!("failed to initialize logging: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    info!("[logging] writing logs to {}", logging.file().display());

    let code = match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    };
    logging.flush();
    code
}

async fn run(args: Args) -> Result<()> {
    let config = IssuerConfig::from_env().context("failed to load configuration")?;
    let client = ZeroSslClient::new(&config).context("failed to create ZeroSSL client")?;
    info!("[issuance] requesting certificate for {}", args.domain);

    let options = IssuanceOptions {
        domain: args.domain,
        csr_path: args.csr_path,
        project_dir: args.project_dir,
        output_dir: args.output_dir,
        poll: PollPolicy::default(),
    };
    let outcome = run_issuance(&client, &options).await?;

    info!(
        "[issuance] certificate {} issued; challenge file {} can be removed",
        outcome.certificate_id,
        outcome.challenge_path.display()
    );
    for file in &outcome.files {
        info!("[issuance] {}: {}", file.label, file.path);
    }
    Ok(())
}
