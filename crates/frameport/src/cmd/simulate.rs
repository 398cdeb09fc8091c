//! In-memory host/frame session.
//!
//! The frame starts detached and sends `--events` notifications that have
//! nowhere to go. It is then embedded as the primary peer, but not yet marked
//! loaded, so the host's first message reaches it only through the
//! declared-peer fallback. Receiving that message connects the frame, which
//! flushes its backlog to the host in order.

use std::cell::RefCell;
use std::rc::Rc;

use frameport_channel::config::{
    DEFAULT_LOADED_ATTRIBUTE, DEFAULT_PEER_ATTRIBUTE, DEFAULT_PRIMARY_FRAME_ID,
};
use frameport_channel::{create_transport, Delivery, SendOptions};
use frameport_codec::{Event, Value};
use frameport_context::{FrameSpec, MemoryWindow};
use futures_util::FutureExt;
use serde::Serialize;
use tracing::debug;

use crate::cmd::SimulateArgs;
use crate::exit::{context_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{or_dash, print_json, print_table, EventOutput, OutputFormat};

#[derive(Debug, Serialize)]
struct TranscriptEntry {
    step: usize,
    receiver: &'static str,
    event: EventOutput,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    transcript: Vec<TranscriptEntry>,
    buffered_before_load: usize,
    host_connected: bool,
    frame_connected: bool,
}

type Transcript = Rc<RefCell<Vec<TranscriptEntry>>>;

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let report = simulate(&args)?;

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            let rows = report
                .transcript
                .iter()
                .map(|entry| {
                    vec![
                        entry.step.to_string(),
                        entry.receiver.to_string(),
                        entry.event.event_type.clone(),
                        entry.event.args_preview(),
                        or_dash(entry.event.source.as_deref()),
                        or_dash(entry.event.ref_id.as_deref()),
                    ]
                })
                .collect();
            print_table(&["STEP", "RECEIVER", "TYPE", "ARGS", "SOURCE", "REF ID"], rows);
            println!(
                "buffered before load: {}, host connected: {}, frame connected: {}",
                report.buffered_before_load, report.host_connected, report.frame_connected
            );
        }
        OutputFormat::Pretty => {
            for entry in &report.transcript {
                println!(
                    "#{} {} <- {} {} (source={}, refId={})",
                    entry.step,
                    entry.receiver,
                    entry.event.event_type,
                    entry.event.args_preview(),
                    or_dash(entry.event.source.as_deref()),
                    or_dash(entry.event.ref_id.as_deref()),
                );
            }
            println!(
                "buffered before load: {}, host connected: {}, frame connected: {}",
                report.buffered_before_load, report.host_connected, report.frame_connected
            );
        }
    }

    Ok(SUCCESS)
}

fn simulate(args: &SimulateArgs) -> CliResult<SimulationReport> {
    let host = MemoryWindow::new(&args.host_url)
        .map_err(|err| context_error("invalid host address", err))?;
    let frame_url = host
        .url()
        .join(&frame_path(args.ref_id.as_deref()))
        .map_err(|err| CliError::new(USAGE, format!("invalid frame address: {err}")))?;
    let frame = MemoryWindow::new(frame_url.as_str())
        .map_err(|err| context_error("invalid frame address", err))?;

    let host_transport = create_transport("host", host.clone())
        .map_err(|err| transport_error("host transport", err))?;
    let frame_transport = create_transport("embedded", frame.clone())
        .map_err(|err| transport_error("frame transport", err))?;

    let transcript: Transcript = Rc::new(RefCell::new(Vec::new()));
    host_transport.set_handler(recorder(&transcript, "host"));
    frame_transport.set_handler(recorder(&transcript, "frame"));

    let backlog: Vec<Delivery> = (1..=args.events)
        .map(|n| {
            frame_transport.send(
                Event::new("storyRendered", vec![Value::from(n as u64)]),
                SendOptions::default(),
            )
        })
        .collect();
    let buffered_before_load = frame_transport.buffered();
    debug!(buffered = buffered_before_load, "frame backlog queued");

    host.attach_frame(
        &frame,
        FrameSpec::new(DEFAULT_PRIMARY_FRAME_ID).attribute(DEFAULT_PEER_ATTRIBUTE, "true"),
    );
    settle(
        host_transport.send(
            Event::new("setCurrentStory", vec![Value::from("intro")]),
            SendOptions::to_target(DEFAULT_PRIMARY_FRAME_ID),
        ),
        "setCurrentStory",
    )?;
    frame.dispatch_pending();

    host.set_frame_attribute(DEFAULT_PRIMARY_FRAME_ID, DEFAULT_LOADED_ATTRIBUTE, "");
    host.dispatch_pending();

    for (index, delivery) in backlog.into_iter().enumerate() {
        settle(delivery, &format!("storyRendered #{}", index + 1))?;
    }

    settle(
        host_transport.send(
            Event::new("forceRemount", Vec::new()),
            SendOptions::to_target(DEFAULT_PRIMARY_FRAME_ID),
        ),
        "forceRemount",
    )?;
    frame.dispatch_pending();

    let transcript = transcript.take();
    Ok(SimulationReport {
        transcript,
        buffered_before_load,
        host_connected: host_transport.is_connected(),
        frame_connected: frame_transport.is_connected(),
    })
}

fn frame_path(ref_id: Option<&str>) -> String {
    match ref_id {
        Some(ref_id) => format!("iframe.html?refId={ref_id}"),
        None => "iframe.html".to_string(),
    }
}

fn recorder(transcript: &Transcript, receiver: &'static str) -> impl Fn(Event) + 'static {
    let transcript = Rc::clone(transcript);
    move |event| {
        let mut entries = transcript.borrow_mut();
        let step = entries.len() + 1;
        entries.push(TranscriptEntry {
            step,
            receiver,
            event: EventOutput::from_event(&event),
        });
    }
}

/// A delivery that is still pending at this point is a simulation bug.
fn settle(delivery: Delivery, what: &str) -> CliResult<()> {
    match delivery.now_or_never() {
        Some(result) => result.map_err(|err| transport_error(what, err)),
        None => Err(CliError::new(
            INTERNAL,
            format!("{what}: still buffered after the session settled"),
        )),
    }
}
