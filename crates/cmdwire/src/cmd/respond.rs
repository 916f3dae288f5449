use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cmdwire_frame::{CommandEnvelope, FrameConfig, FrameError, FrameReader, FrameWriter};
use cmdwire_transport::{CommandStream, LoopbackListener};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cmd::{parse_duration, RespondArgs, TargetArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_record, render_value, OutputFormat};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Serialize)]
struct RequestOutput {
    peer: String,
    command: String,
    params: Map<String, Value>,
}

pub fn run(args: RespondArgs, target: &TargetArgs, format: OutputFormat) -> CliResult<i32> {
    let reply = parse_reply(&args.reply)?;
    let frame_config = FrameConfig {
        receive_timeout: parse_duration(&target.receive_timeout)?,
        ..FrameConfig::default()
    };

    let listener = LoopbackListener::bind(&target.endpoint())
        .map_err(|err| transport_error("bind failed", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| transport_error("bind failed", err))?;
    tracing::info!(endpoint = %listener.endpoint(), "responding to commands");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut answered = 0usize;
    while running.load(Ordering::SeqCst) && args.count.is_none_or(|count| answered < count) {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(err) if err.io_kind() == Some(io::ErrorKind::WouldBlock) => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
                continue;
            }
            Err(err) => return Err(transport_error("accept failed", err)),
        };

        match answer(&stream, peer, &reply, &frame_config) {
            Ok(request) => {
                answered += 1;
                let row = vec![
                    request.peer.clone(),
                    request.command.clone(),
                    render_value(&Value::Object(request.params.clone())),
                ];
                print_record(&request, &["PEER", "COMMAND", "PARAMS"], row, format);
            }
            Err(FrameError::ClosedBeforeData) => {
                tracing::debug!(%peer, "connection closed without a command");
            }
            Err(err) => {
                tracing::warn!(%peer, error = %err, "failed answering command");
            }
        }
        stream.close();
    }

    Ok(SUCCESS)
}

fn answer(
    stream: &CommandStream,
    peer: SocketAddr,
    reply: &[u8],
    config: &FrameConfig,
) -> Result<RequestOutput, FrameError> {
    stream
        .as_tcp()
        .set_nonblocking(false)
        .map_err(FrameError::Io)?;
    let reader_stream = stream.try_clone().map_err(|err| io::Error::other(err.to_string()))?;
    let writer_stream = stream.try_clone().map_err(|err| io::Error::other(err.to_string()))?;

    let mut reader = FrameReader::with_config(reader_stream, config.clone());
    let frame = reader.read_frame()?;
    let envelope = CommandEnvelope::decode(&frame.payload)?;
    tracing::info!(%peer, command = %envelope.name, "answering command");

    let mut writer = FrameWriter::with_config(writer_stream, config.clone());
    writer.write_document(reply)?;
    writer.flush()?;

    Ok(RequestOutput {
        peer: peer.to_string(),
        command: envelope.name,
        params: envelope.params,
    })
}

fn parse_reply(reply: &str) -> CliResult<Vec<u8>> {
    let value: Value = serde_json::from_str(reply)
        .map_err(|err| CliError::new(USAGE, format!("--reply is not valid JSON: {err}")))?;
    serde_json::to_vec(&value).map_err(|err| frame_error("--reply", FrameError::Json(err)))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_is_re_encoded_compactly() {
        let reply = parse_reply("{ \"status\" : \"success\" }").unwrap();
        assert_eq!(reply, br#"{"status":"success"}"#);
    }

    #[test]
    fn invalid_reply_is_a_usage_error() {
        assert_eq!(parse_reply("{oops").unwrap_err().code, USAGE);
    }
}
