//! Scripted stand-in for the listening peer.

use std::net::SocketAddr;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cmdwire_frame::{CommandEnvelope, FrameConfig, FrameReader, FrameWriter};
use cmdwire_transport::{Endpoint, LoopbackListener};

/// What the peer does with one accepted connection.
pub(crate) enum PeerAction {
    /// Read the request, write these bytes, close.
    Reply(Vec<u8>),
    /// Read the request, write the pieces with a pause between each, close.
    ReplyInPieces(Vec<Vec<u8>>, Duration),
    /// Read the request, close without writing.
    CloseSilently,
    /// Read the request, write a fragment, then hold the connection open.
    Stall(Vec<u8>, Duration),
    /// Wait, then drop the connection without reading the request.
    DropUnread(Duration),
}

/// One request the peer received.
pub(crate) struct Received {
    pub envelope: CommandEnvelope,
    pub from: SocketAddr,
}

/// Start a peer that handles one connection per action, in order.
pub(crate) fn spawn_peer(actions: Vec<PeerAction>) -> (Endpoint, JoinHandle<Vec<Received>>) {
    let listener = LoopbackListener::bind(&Endpoint::new("127.0.0.1", 0)).unwrap();
    let endpoint = listener.endpoint();

    let handle = thread::spawn(move || {
        let mut received = Vec::new();
        for action in actions {
            let (stream, from) = listener.accept().unwrap();
            if let PeerAction::DropUnread(wait) = action {
                thread::sleep(wait);
                drop(stream);
                continue;
            }
            let config = FrameConfig {
                receive_timeout: Duration::from_secs(5),
                ..FrameConfig::default()
            };
            let mut reader = FrameReader::with_config(stream.try_clone().unwrap(), config);
            let request = reader.read_frame().unwrap();
            received.push(Received {
                envelope: CommandEnvelope::decode(&request.payload).unwrap(),
                from,
            });

            let mut writer = FrameWriter::new(stream.try_clone().unwrap());
            match action {
                PeerAction::Reply(bytes) => writer.write_document(&bytes).unwrap(),
                PeerAction::ReplyInPieces(pieces, pause) => {
                    for piece in pieces {
                        writer.write_document(&piece).unwrap();
                        thread::sleep(pause);
                    }
                }
                PeerAction::CloseSilently | PeerAction::DropUnread(_) => {}
                PeerAction::Stall(fragment, hold) => {
                    writer.write_document(&fragment).unwrap();
                    thread::sleep(hold);
                }
            }
            stream.close();
        }
        received
    });

    (endpoint, handle)
}

/// An endpoint with nothing listening on it.
pub(crate) fn dead_endpoint() -> Endpoint {
    let listener = LoopbackListener::bind(&Endpoint::new("127.0.0.1", 0)).unwrap();
    listener.endpoint()
}
