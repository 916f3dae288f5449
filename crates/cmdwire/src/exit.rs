use std::fmt;
use std::io;

use cmdwire_channel::ChannelError;
use cmdwire_frame::FrameError;
use cmdwire_schema::SchemaError;
use cmdwire_transport::TransportError;

// Exit codes. 1 and 2 describe the peer's answer; the rest describe why
// there was no usable answer.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const UNRECOGNIZED: i32 = 2;
pub const UNAVAILABLE: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => UNAVAILABLE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Unresolved(_) => CliError::new(UNAVAILABLE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ClosedBeforeData | FrameError::ConnectionClosed => {
            CliError::new(UNAVAILABLE, format!("{context}: {err}"))
        }
        FrameError::TimeoutNoValidFrame { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        FrameError::Incomplete { .. }
        | FrameError::DocumentTooLarge { .. }
        | FrameError::InvalidEnvelope(_)
        | FrameError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

pub fn schema_error(context: &str, err: SchemaError) -> CliError {
    match err {
        SchemaError::LoadFailed(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Unavailable { .. } | ChannelError::ClosedBeforeData => {
            CliError::new(UNAVAILABLE, format!("{context}: {err}"))
        }
        ChannelError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ChannelError::Incomplete { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ChannelError::Transport(err) => transport_error(context, err),
        ChannelError::Frame(err) => frame_error(context, err),
        ChannelError::Schema(err) => schema_error(context, err),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn channel_errors_map_to_distinct_codes() {
        let refused = ChannelError::Unavailable {
            addr: "127.0.0.1:6400".to_string(),
            source: TransportError::Connect {
                addr: "127.0.0.1:6400".to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            },
        };
        assert_eq!(channel_error("send", refused).code, UNAVAILABLE);
        assert_eq!(
            channel_error("send", ChannelError::ClosedBeforeData).code,
            UNAVAILABLE
        );
        assert_eq!(
            channel_error(
                "send",
                ChannelError::Timeout {
                    received: 4,
                    elapsed: Duration::from_secs(1)
                }
            )
            .code,
            TIMEOUT
        );
        assert_eq!(
            channel_error("send", ChannelError::Incomplete { received: 4 }).code,
            DATA_INVALID
        );
    }

    #[test]
    fn envelope_errors_are_data_invalid() {
        let err = channel_error(
            "send",
            ChannelError::Frame(FrameError::InvalidEnvelope("empty command name".into())),
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("send: "));
    }
}
