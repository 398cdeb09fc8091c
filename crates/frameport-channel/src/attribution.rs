//! Source attribution for inbound messages.
//!
//! An embedded context has exactly one possible sender (its parent), so the
//! origin the environment reports is trusted as-is. A host may have many
//! frames and must work out which one sent the message: first by comparing
//! frame content handles against the sender handle, then, when no handle
//! matches (cross-origin frames refuse the comparison), by comparing each
//! frame's configured address origin against the reported origin.

use frameport_context::{BrowsingContext, FrameElement, MessageEvent};
use tracing::{trace, warn};
use url::Url;

use crate::config::TransportConfig;
use crate::role::Role;

/// Attribute `message` to a trusted source, or `None` if no peer matches.
pub fn attribute_source<C: BrowsingContext + ?Sized>(
    config: &TransportConfig,
    context: &C,
    message: &MessageEvent,
) -> Option<String> {
    match config.role {
        Role::Embedded => Some(message.origin.clone()).filter(|origin| !origin.is_empty()),
        Role::Host => host_source(config, context, message),
    }
}

/// Resolve `src` against `base` and keep only `scheme://host[:port]/path`.
pub fn normalize_address(src: &str, base: &Url) -> Option<String> {
    let url = base.join(src).ok()?;
    if url.cannot_be_a_base() {
        return Some(format!("{}:{}", url.scheme(), url.path()));
    }
    let port = url.port().map(|port| format!(":{port}")).unwrap_or_default();
    Some(format!(
        "{}://{}{}{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        port,
        url.path()
    ))
}

fn host_source<C: BrowsingContext + ?Sized>(
    config: &TransportConfig,
    context: &C,
    message: &MessageEvent,
) -> Option<String> {
    let base = context.location();
    let peers: Vec<FrameElement> = context
        .frames()
        .into_iter()
        .filter(|frame| frame.has_attribute(&config.markers.peer_attribute))
        .collect();

    let mut candidates: Vec<&FrameElement> = match message.source {
        Some(sender) => peers
            .iter()
            .filter(|frame| match frame.is_content_of(sender) {
                Ok(matched) => matched,
                Err(err) => {
                    trace!(frame = ?frame.id(), error = %err, "handle comparison unavailable");
                    false
                }
            })
            .collect(),
        None => Vec::new(),
    };

    if candidates.is_empty() {
        candidates = peers
            .iter()
            .filter(|frame| frame_origin(frame, &base).as_deref() == Some(message.origin.as_str()))
            .collect();
    }

    let first = candidates.first()?;
    if candidates.len() > 1 {
        warn!(
            origin = %message.origin,
            candidates = candidates.len(),
            "found multiple candidates for event source, using the first"
        );
    }
    normalize_address(first.src()?, &base)
}

fn frame_origin(frame: &FrameElement, base: &Url) -> Option<String> {
    let url = base.join(frame.src()?).ok()?;
    Some(url.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use frameport_context::{ContextId, FrameSpec, MemoryWindow, RawPayload};

    use super::*;
    use crate::config::DEFAULT_PEER_ATTRIBUTE;

    fn window(address: &str) -> MemoryWindow {
        MemoryWindow::new(address).unwrap()
    }

    fn message(origin: &str, source: Option<ContextId>) -> MessageEvent {
        MessageEvent {
            data: RawPayload::Text(String::new()),
            origin: origin.to_string(),
            source,
        }
    }

    fn peer(id: &str) -> FrameSpec {
        FrameSpec::new(id).attribute(DEFAULT_PEER_ATTRIBUTE, "true")
    }

    #[test]
    fn normalizes_relative_and_absolute_addresses() {
        let base = Url::parse("http://localhost:6006/?path=/story/a").unwrap();
        assert_eq!(
            normalize_address("iframe.html?id=a#x", &base).as_deref(),
            Some("http://localhost:6006/iframe.html")
        );
        assert_eq!(
            normalize_address("https://cdn.example:443/p/index.html", &base).as_deref(),
            Some("https://cdn.example/p/index.html")
        );
        assert_eq!(
            normalize_address("http://127.0.0.1:9009/iframe.html", &base).as_deref(),
            Some("http://127.0.0.1:9009/iframe.html")
        );
    }

    #[test]
    fn normalizes_local_file_addresses() {
        let base = Url::parse("file:///tmp/story/index.html").unwrap();
        assert_eq!(
            normalize_address("iframe.html?id=a", &base).as_deref(),
            Some("file:///tmp/story/iframe.html")
        );
        assert_eq!(
            normalize_address("file:///tmp/story/iframe.html", &base).as_deref(),
            Some("file:///tmp/story/iframe.html")
        );
    }

    #[test]
    fn embedded_trusts_reported_origin() {
        let config = TransportConfig::new(Role::Embedded);
        let frame = window("http://localhost:6006/iframe.html");

        let source = attribute_source(
            &config,
            &frame,
            &message("http://anything.example", Some(ContextId::next())),
        );
        assert_eq!(source.as_deref(), Some("http://anything.example"));

        assert!(attribute_source(&config, &frame, &message("", None)).is_none());
    }

    #[test]
    fn host_matches_sender_handle() {
        let config = TransportConfig::new(Role::Host);
        let host = window("http://localhost:6006/");
        let first = window("http://localhost:6006/iframe.html");
        let second = window("http://localhost:6006/other.html");
        host.attach_frame(&first, peer("first").src("iframe.html?id=x"));
        host.attach_frame(&second, peer("second"));

        let source = attribute_source(
            &config,
            &host,
            &message("http://localhost:6006", Some(second.id())),
        );
        assert_eq!(source.as_deref(), Some("http://localhost:6006/other.html"));
    }

    #[test]
    fn host_falls_back_to_origin_when_handle_does_not_match() {
        let config = TransportConfig::new(Role::Host);
        let host = window("http://localhost:6006/");
        let child = window("http://127.0.0.1:9009/iframe.html");
        host.attach_frame(&child, peer("preview").cross_origin());

        // Sender handle is unknown; the origin identifies the frame.
        let stray = window("http://127.0.0.1:9009/popup.html");
        let source = attribute_source(
            &config,
            &host,
            &message("http://127.0.0.1:9009", Some(stray.id())),
        );
        assert_eq!(source.as_deref(), Some("http://127.0.0.1:9009/iframe.html"));

        // Same outcome when the handle comparison itself is blocked.
        let source = attribute_source(
            &config,
            &host,
            &message("http://127.0.0.1:9009", Some(child.id())),
        );
        assert_eq!(source.as_deref(), Some("http://127.0.0.1:9009/iframe.html"));
    }

    #[test]
    fn host_ambiguous_origin_picks_first() {
        let config = TransportConfig::new(Role::Host);
        let host = window("http://localhost:6006/");
        let a = window("http://localhost:6006/a.html");
        let b = window("http://localhost:6006/b.html");
        host.attach_frame(&a, peer("a"));
        host.attach_frame(&b, peer("b"));

        let source = attribute_source(&config, &host, &message("http://localhost:6006", None));
        assert_eq!(source.as_deref(), Some("http://localhost:6006/a.html"));
    }

    #[test]
    fn host_without_match_has_no_source() {
        let config = TransportConfig::new(Role::Host);
        let host = window("http://localhost:6006/");
        let child = window("http://localhost:6006/iframe.html");
        host.attach_frame(&child, peer("preview"));
        let undeclared = window("http://evil.example/x.html");
        host.attach_frame(&undeclared, FrameSpec::new("ads"));

        assert!(attribute_source(
            &config,
            &host,
            &message("http://evil.example", Some(undeclared.id()))
        )
        .is_none());
    }
}
