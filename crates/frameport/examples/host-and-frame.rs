//! A host document and one embedded frame exchanging events in memory.
//!
//! Run with `cargo run --example host-and-frame`.

use frameport::channel::config::{
    DEFAULT_LOADED_ATTRIBUTE, DEFAULT_PEER_ATTRIBUTE, DEFAULT_PRIMARY_FRAME_ID,
};
use frameport::channel::{create_transport, SendOptions};
use frameport::codec::{Event, Value};
use frameport::context::{FrameSpec, MemoryWindow};
use futures_util::FutureExt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let host = MemoryWindow::new("http://localhost:6006/")?;
    let frame = MemoryWindow::new("http://localhost:6006/iframe.html?refId=demo")?;

    let manager = create_transport("host", host.clone())?;
    let preview = create_transport("embedded", frame.clone())?;

    manager.set_handler(|event| {
        println!(
            "host <- {} {:?} from {}",
            event.event_type,
            event.args,
            event.source.as_deref().unwrap_or("?")
        );
    });
    preview.set_handler(|event| println!("frame <- {} {:?}", event.event_type, event.args));

    // The frame is not embedded yet, so this waits in its buffer.
    let ready = preview.send(Event::new("previewReady", Vec::new()), SendOptions::default());
    println!("frame buffered: {:?}", preview.buffered_event_types());

    host.attach_frame(
        &frame,
        FrameSpec::new(DEFAULT_PRIMARY_FRAME_ID)
            .attribute(DEFAULT_PEER_ATTRIBUTE, "true")
            .attribute(DEFAULT_LOADED_ATTRIBUTE, ""),
    );

    let _ = manager.send(
        Event::new("setCurrentStory", vec![Value::from("button--primary")]),
        SendOptions::to_target(DEFAULT_PRIMARY_FRAME_ID),
    );
    frame.dispatch_pending();
    host.dispatch_pending();

    println!("frame delivery: {:?}", ready.now_or_never());
    println!(
        "connected: host={} frame={}",
        manager.is_connected(),
        preview.is_connected()
    );
    Ok(())
}
