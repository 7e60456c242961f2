// ABOUTME: sms-api-server binary: parses flags, starts the SMPP session and serves the HTTP API
// ABOUTME: Exits 0 on --version or graceful shutdown and 1 on any startup failure

use sms_api_server::config::{Args, Credentials, GatewayConfig, VERSION};
use sms_api_server::server::{init_tracing, Server, ServerError, ShutdownSignal};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Args = argh::from_env();

    if args.version {
        println!("sms-api-server {VERSION}");
        return ExitCode::SUCCESS;
    }

    if let Err(error) = init_tracing(args.log_timestamp) {
        eprintln!("sms-api-server: {error}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => {
            info!("sms-api-server stopped");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, "sms-api-server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let config = GatewayConfig::from_args(args, Credentials::from_env())?;
    info!(version = VERSION, listen = %config.listen, "starting sms-api-server");

    let signal = ShutdownSignal::install()?;
    let server = Server::connect(config)?;
    server.run(signal.recv()).await
}
