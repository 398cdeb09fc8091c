use frameport_channel::inbound::decode_payload;
use frameport_codec::{CodecOptions, JsonEncoder};
use frameport_context::RawPayload;

use crate::cmd::DecodeArgs;
use crate::exit::{codec_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{or_dash, print_json, print_table, EventOutput, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let options = CodecOptions {
        lazy_eval: Some(!args.strip_function_bodies),
        ..CodecOptions::default()
    };
    let envelope = decode_payload(&RawPayload::Text(args.wire), &JsonEncoder, &options)
        .map_err(|err| codec_error("decode failed", err))?
        .ok_or_else(|| CliError::new(FAILURE, "input is not a frameport envelope"))?;

    let mut event = envelope.event;
    if envelope.ref_id.is_some() {
        event.ref_id = envelope.ref_id;
    }
    let output = EventOutput::from_event(&event);

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => print_table(
            &["TYPE", "ARGS", "REF ID"],
            vec![vec![
                output.event_type.clone(),
                output.args_preview(),
                or_dash(output.ref_id.as_deref()),
            ]],
        ),
        OutputFormat::Pretty => println!(
            "type={} args={} refId={}",
            output.event_type,
            output.args_preview(),
            or_dash(output.ref_id.as_deref())
        ),
    }

    Ok(SUCCESS)
}
