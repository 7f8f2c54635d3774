use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "recon",
    about = "Contact identity reconciliation",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the identify server
    Serve(ServeArgs),
    /// Feed newline-delimited identify requests through an in-memory store
    Replay(ReplayArgs),
    /// Parse a server configuration file and print the effective settings
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Overrides `bind_addr` from the configuration
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct ReplayArgs {
    /// File with one JSON request per line
    pub file: PathBuf,
    /// Audit the resulting contacts after the replay
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve_defaults() {
        let cli = Cli::try_parse_from(["recon", "serve"]).unwrap();
        match cli.command {
            Command::Serve(args) => {
                assert!(args.config.is_none());
                assert!(args.bind.is_none());
            }
            _ => panic!("expected serve"),
        }
        assert!(!cli.verbose);
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn parse_serve_with_bind() {
        let cli = Cli::try_parse_from([
            "recon", "serve", "--config", "recon.toml", "--bind", "0.0.0.0:8080",
        ])
        .unwrap();
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.config, Some(PathBuf::from("recon.toml")));
                assert_eq!(args.bind.map(|a| a.port()), Some(8080));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn parse_serve_rejects_bad_bind() {
        assert!(Cli::try_parse_from(["recon", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_replay() {
        let cli = Cli::try_parse_from([
            "recon", "replay", "requests.ndjson", "--verify", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Replay(args) => {
                assert_eq!(args.file, PathBuf::from("requests.ndjson"));
                assert!(args.verify);
            }
            _ => panic!("expected replay"),
        }
    }

    #[test]
    fn parse_check_config() {
        let cli = Cli::try_parse_from(["recon", "-v", "check-config", "recon.toml"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::CheckConfig(_)));
    }

    #[test]
    fn replay_requires_file() {
        assert!(Cli::try_parse_from(["recon", "replay"]).is_err());
    }
}
