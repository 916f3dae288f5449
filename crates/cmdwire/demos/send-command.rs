//! Send one command to a peer and print the normalized response.
//!
//! Usage: cargo run --example send-command -- <command> [params-json]
//!
//! Pair it with `cmdwire respond --reply '{"status":"success","result":1}'`.

use cmdwire::channel::{ChannelConfig, ChannelHandle, Response};
use cmdwire::transport::{Endpoint, DEFAULT_PORT};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "ping".to_string());
    let params: serde_json::Value = match args.next() {
        Some(text) => serde_json::from_str(&text)?,
        None => serde_json::Value::Null,
    };

    let port = std::env::var("CMDWIRE_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let handle = ChannelHandle::new(ChannelConfig::new(Endpoint::new("127.0.0.1", port)));

    match handle.send_value(&command, params) {
        Ok(Response::Ok { data }) => println!("ok: {data}"),
        Ok(Response::Err { message, data }) => {
            println!("error: {message}");
            for (key, value) in data {
                println!("  {key}: {value}");
            }
        }
        Ok(Response::Unrecognized(doc)) => println!("unrecognized: {doc}"),
        Err(err) if err.is_unavailable() => {
            eprintln!("peer is not running: {err}");
            std::process::exit(3);
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}
