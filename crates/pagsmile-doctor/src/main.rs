mod origin;
mod params;

use clap::{Parser, Subcommand};

/// pagsmile-doctor - checks for a relay deployment and its card payments.
#[derive(Parser, Debug)]
#[command(name = "pagsmile-doctor")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the parameters submit-card-pay requires, common causes of error 40001 and an example body
    Params,

    /// Check that a running relay sends an Origin header to the gateway
    Origin {
        /// Base URL of the relay
        #[arg(default_value = "http://localhost:3000", env = "RELAY_URL")]
        base_url: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Params => {
            params::print_report();
            Ok(())
        }
        Commands::Origin { base_url } => origin::run(&base_url).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
