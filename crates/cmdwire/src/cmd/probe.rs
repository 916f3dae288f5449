use cmdwire_channel::Channel;
use serde::Serialize;

use crate::cmd::{ProbeArgs, TargetArgs};
use crate::exit::{channel_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct ProbeOutput {
    endpoint: String,
    reachable: bool,
    connect_latency_ms: f64,
}

pub fn run(_args: ProbeArgs, target: &TargetArgs, format: OutputFormat) -> CliResult<i32> {
    let config = target.channel_config()?;
    let endpoint = config.endpoint.to_string();
    let mut channel = Channel::new(config);

    let latency = channel
        .probe()
        .map_err(|err| channel_error("probe failed", err))?;

    let out = ProbeOutput {
        endpoint,
        reachable: true,
        connect_latency_ms: (latency.as_secs_f64() * 1000.0 * 100.0).round() / 100.0,
    };
    let row = vec![
        out.endpoint.clone(),
        out.reachable.to_string(),
        format!("{:.2}", out.connect_latency_ms),
    ];
    print_record(&out, &["ENDPOINT", "REACHABLE", "LATENCY (ms)"], row, format);
    Ok(SUCCESS)
}
