use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let directives = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, directives.as_deref()))
        .with_writer(std::io::stderr)
        .init();
    commands::run_command(cli)
}

/// `RUST_LOG` directives when set and valid, otherwise `debug` with
/// `--verbose` and `info` without.
fn log_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_flag_sets_default_level() {
        assert_eq!(log_filter(false, None).to_string(), "info");
        assert_eq!(log_filter(true, None).to_string(), "debug");
        assert_eq!(log_filter(true, Some("  ")).to_string(), "debug");
    }

    #[test]
    fn rust_log_directives_take_precedence() {
        assert_eq!(
            log_filter(true, Some("recon_store=trace")).to_string(),
            "recon_store=trace"
        );
    }
}
