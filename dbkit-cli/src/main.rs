use clap::{Parser, Subcommand};

mod ping;

use ping::{Target, run_ping};

#[derive(Parser, Debug)]
#[command(name = "dbkit", version)]
#[command(about = "dbkit CLI - connectivity checks for PostgreSQL, Redis and ClickHouse")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect using the environment configuration and report the server
    Ping {
        #[arg(value_enum)]
        target: Target,
    },
}

#[tokio::main]
async fn main() {
    // Initialize JSON logging once.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ping { target } => match run_ping(target).await {
            Ok(summary) => println!("{summary}"),
            Err(e) => {
                tracing::error!(error = %e, backend = ?target, "Ping failed");
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_targets_parse() {
        for (arg, expected) in [
            ("postgres", Target::Postgres),
            ("redis", Target::Redis),
            ("clickhouse", Target::Clickhouse),
        ] {
            let cli = Cli::try_parse_from(["dbkit", "ping", arg]).unwrap();
            let Commands::Ping { target } = cli.command;
            assert_eq!(target, expected);
        }
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        assert!(Cli::try_parse_from(["dbkit", "ping", "mysql"]).is_err());
        assert!(Cli::try_parse_from(["dbkit", "ping"]).is_err());
    }
}
