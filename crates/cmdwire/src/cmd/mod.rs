use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use cmdwire_channel::ChannelConfig;
use cmdwire_transport::{Endpoint, DEFAULT_HOST, DEFAULT_PORT};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod probe;
pub mod respond;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one command and print the normalized response.
    Send(SendArgs),
    /// Check that the peer accepts connections.
    Probe(ProbeArgs),
    /// Act as the peer: answer every command with a canned reply.
    Respond(RespondArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, target: &TargetArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, target, format),
        Command::Probe(args) => probe::run(args, target, format),
        Command::Respond(args) => respond::run(args, target, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the peer listens and how long to wait for it.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Peer host.
    #[arg(long, env = "CMDWIRE_HOST", default_value = DEFAULT_HOST, global = true)]
    pub host: String,
    /// Peer port.
    #[arg(long, env = "CMDWIRE_PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,
    /// Connect timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub connect_timeout: String,
    /// Time allowed for the whole response to arrive (e.g. 30s, 500ms).
    #[arg(long, default_value = "30s", global = true)]
    pub receive_timeout: String,
}

impl TargetArgs {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn channel_config(&self) -> CliResult<ChannelConfig> {
        Ok(ChannelConfig::new(self.endpoint())
            .with_connect_timeout(parse_duration(&self.connect_timeout)?)
            .with_receive_timeout(parse_duration(&self.receive_timeout)?))
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Command name (the envelope's "type").
    pub command: String,
    /// Params as a JSON object.
    #[arg(long, conflicts_with = "params_file")]
    pub params: Option<String>,
    /// Read params from a JSON file.
    #[arg(long, value_name = "PATH", conflicts_with = "params")]
    pub params_file: Option<PathBuf>,
    /// Validate params against <DIR>/<command>.schema.json before sending.
    #[arg(long, value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {}

#[derive(Args, Debug)]
pub struct RespondArgs {
    /// JSON document written back for every command.
    #[arg(long)]
    pub reply: String,
    /// Exit after answering N commands.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn channel_config_uses_target_args() {
        let target = TargetArgs {
            host: "localhost".to_string(),
            port: 7001,
            connect_timeout: "250ms".to_string(),
            receive_timeout: "2s".to_string(),
        };
        let config = target.channel_config().unwrap();
        assert_eq!(config.endpoint, Endpoint::new("localhost", 7001));
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.frame.receive_timeout, Duration::from_secs(2));
    }
}
