use frameport_codec::{CodecOptions, Encoder, Envelope, Event, JsonEncoder, Value};
use serde::Serialize;

use crate::cmd::EncodeArgs;
use crate::exit::{codec_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_json, print_table, EventOutput, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput<'a> {
    event: EventOutput,
    size: usize,
    wire: &'a str,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let event = Event::new(args.event_type.clone(), parse_args(&args.args)?);
    let options = CodecOptions {
        max_depth: args.max_depth,
        space: args.space,
        ..CodecOptions::default()
    };
    let envelope = Envelope::new(event, args.ref_id.clone());
    let wire = envelope
        .to_value()
        .and_then(|value| JsonEncoder.encode(&value, &options))
        .map_err(|err| codec_error("encode failed", err))?;

    match format {
        OutputFormat::Json => print_json(&EncodeOutput {
            event: EventOutput::from_event(&envelope.event),
            size: wire.len(),
            wire: &wire,
        }),
        OutputFormat::Table => {
            let event = EventOutput::from_event(&envelope.event);
            print_table(
                &["TYPE", "ARGS", "SIZE", "WIRE"],
                vec![vec![
                    event.event_type.clone(),
                    event.args_preview(),
                    wire.len().to_string(),
                    wire.clone(),
                ]],
            );
        }
        OutputFormat::Pretty => println!("{wire}"),
    }

    Ok(SUCCESS)
}

fn parse_args(raw: &[String]) -> CliResult<Vec<Value>> {
    raw.iter()
        .enumerate()
        .map(|(index, arg)| {
            serde_json::from_str::<serde_json::Value>(arg)
                .map(Value::from)
                .map_err(|err| {
                    CliError::new(USAGE, format!("--arg #{} is not valid JSON: {err}", index + 1))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_arguments_in_order() {
        let args = parse_args(&["\"intro\"".to_string(), "{\"n\":1}".to_string()]).unwrap();
        assert_eq!(args[0], Value::from("intro"));
        assert_eq!(args[1].get("n"), Some(&Value::from(1_i64)));
    }

    #[test]
    fn rejects_invalid_argument() {
        let err = parse_args(&["1".to_string(), "{nope".to_string()]).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("--arg #2"));
    }
}
