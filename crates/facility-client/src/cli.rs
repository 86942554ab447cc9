//! Command-line interface definition.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// facility - Book lecture theatres, tutorial rooms and labs over UDP
#[derive(Debug, Parser)]
#[command(name = "facility")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "FACILITY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Output replies as JSON
    #[arg(long)]
    pub json: bool,

    // --- Connection flags ---
    /// Server host name or address
    #[arg(long, env = "FACILITY_HOST")]
    pub host: Option<String>,

    /// Server UDP port
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Seconds to wait for each reply before resending
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Sends per request, the first one included
    #[arg(long)]
    pub attempts: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the reservation server in the foreground
    Server {
        /// Address to bind
        #[arg(long)]
        bind: Option<IpAddr>,

        /// UDP port to listen on
        #[arg(long)]
        listen_port: Option<u16>,
    },

    /// List the facilities the server knows about
    Facilities,

    /// Show free slots for one or more days (0 = Sunday ... 6 = Saturday)
    Availability {
        facility: String,

        #[arg(required = true, allow_negative_numbers = true)]
        days: Vec<i32>,
    },

    /// Book a facility, times as D/HH/mm
    Book {
        facility: String,
        start: String,
        end: String,
    },

    /// Shift an existing booking by a number of minutes
    Update {
        confirmation_id: String,

        #[arg(allow_negative_numbers = true)]
        offset: i32,
    },

    /// Watch a facility and print every update until the interval ends
    Observe {
        facility: String,

        /// Minutes to keep watching
        minutes: i32,
    },

    /// Check that the server answers
    Ping,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_negative_offset() {
        let cli = Cli::try_parse_from(["facility", "update", "abc", "-30"]).unwrap();
        match cli.command {
            Command::Update {
                confirmation_id,
                offset,
            } => {
                assert_eq!(confirmation_id, "abc");
                assert_eq!(offset, -30);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn availability_requires_days() {
        assert!(Cli::try_parse_from(["facility", "availability", "LT1"]).is_err());
        let cli =
            Cli::try_parse_from(["facility", "--json", "availability", "LT1", "0", "6"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Availability { ref days, .. } if days == &[0, 6]));
    }

    #[test]
    fn connection_overrides() {
        let cli = Cli::try_parse_from([
            "facility",
            "--host",
            "10.1.1.1",
            "-p",
            "3000",
            "--attempts",
            "2",
            "ping",
        ])
        .unwrap();
        assert_eq!(cli.host.as_deref(), Some("10.1.1.1"));
        assert_eq!(cli.port, Some(3000));
        assert_eq!(cli.attempts, Some(2));
        assert!(cli.timeout.is_none());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
