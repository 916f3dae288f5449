use std::fs;
use std::sync::Arc;

use cmdwire_channel::{ChannelHandle, Response};
use cmdwire_schema::{RegistryConfig, SchemaRegistry};
use serde_json::Value;

use crate::cmd::{SendArgs, TargetArgs};
use crate::exit::{
    channel_error, io_error, schema_error, CliError, CliResult, FAILURE, SUCCESS, UNRECOGNIZED,
    USAGE,
};
use crate::output::{print_response, OutputFormat};

pub fn run(args: SendArgs, target: &TargetArgs, format: OutputFormat) -> CliResult<i32> {
    let params = resolve_params(&args)?;

    let mut handle = ChannelHandle::new(target.channel_config()?);
    if let Some(dir) = &args.schema_dir {
        let registry = SchemaRegistry::from_directory_with_config(dir, RegistryConfig::strict())
            .map_err(|err| schema_error("schema load failed", err))?;
        handle = handle.with_schema_registry(Arc::new(registry));
    }

    let response = handle
        .send_value(&args.command, params)
        .map_err(|err| channel_error(&format!("{} failed", args.command), err))?;

    print_response(&response, format);
    Ok(exit_code(&response))
}

fn resolve_params(args: &SendArgs) -> CliResult<Value> {
    if let Some(json) = &args.params {
        return serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--params is not valid JSON: {err}")));
    }
    if let Some(path) = &args.params_file {
        let text = fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return serde_json::from_str(&text).map_err(|err| {
            CliError::new(
                USAGE,
                format!("{} is not valid JSON: {err}", path.display()),
            )
        });
    }
    Ok(Value::Null)
}

fn exit_code(response: &Response) -> i32 {
    match response.success() {
        Some(true) => SUCCESS,
        Some(false) => FAILURE,
        None => UNRECOGNIZED,
    }
}
