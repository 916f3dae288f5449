use std::time::Duration;

use cmdwire_frame::FrameConfig;
use cmdwire_transport::{Endpoint, SocketOptions, DEFAULT_CONNECT_TIMEOUT};

/// Configuration for a [`Channel`](crate::Channel).
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Where the peer listens. Default: `127.0.0.1:6400`.
    pub endpoint: Endpoint,
    /// Bound on the TCP connect. Default: 5s.
    pub connect_timeout: Duration,
    /// Options applied to every new socket.
    pub socket: SocketOptions,
    /// Response reading (chunk size, receive deadline, size cap).
    pub frame: FrameConfig,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            socket: SocketOptions::default(),
            frame: FrameConfig::default(),
        }
    }
}

impl ChannelConfig {
    /// Default configuration for a specific endpoint.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.frame.receive_timeout = timeout;
        self
    }

    pub fn with_socket_options(mut self, socket: SocketOptions) -> Self {
        self.socket = socket;
        self
    }

    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }
}
