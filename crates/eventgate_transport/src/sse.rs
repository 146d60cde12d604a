//! Streaming endpoint
//!
//! `GET /events?type=<category>` registers the caller with the broker and
//! turns its delivery queue into a Server-Sent Events body. Each delivered
//! frame becomes one event block:
//!
//! ```text
//! event: <category>
//! data: <payload>
//!
//! ```
//!
//! The `event:` line is left out for messages without a category, so
//! browsers dispatch them as plain `message` events.
//!
//! Teardown: when the client goes away the server drops the response body,
//! which drops the `Subscription` inside it and deregisters the client. When
//! the broker closes the queue first, the stream ends on its own and
//! deregisters through the same one-shot guard.

use std::convert::Infallible;

use async_stream::stream;
use axum::extract::{FromRequestParts, Query, State};
use axum::http::header::CONNECTION;
use axum::http::request::Parts;
use axum::http::{HeaderValue, Version};
use axum::response::{IntoResponse, Response};
use axum::response::sse::{Event, KeepAlive, Sse};
use eventgate_broker::Subscription;
use eventgate_client::{Category, Frame};
use futures_util::Stream;
use tracing::{debug, info};

use crate::auth::StreamCaller;
use crate::error::ApiError;
use crate::message::StreamParams;
use crate::server::AppState;

/// Guard extractor: the request's HTTP version can carry an open-ended
/// streamed body. HTTP/1.0 has neither chunked encoding nor persistent
/// connections, so it is refused outright. Holds the accepted version.
#[derive(Debug, Clone, Copy)]
pub struct StreamingTransport(pub Version);

impl<S> FromRequestParts<S> for StreamingTransport
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if parts.version <= Version::HTTP_10 {
            return Err(ApiError::StreamingUnsupported);
        }
        Ok(StreamingTransport(parts.version))
    }
}

pub async fn stream_events(
    StreamingTransport(version): StreamingTransport,
    StreamCaller(identity): StreamCaller,
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Result<Response, ApiError> {
    let category = Category::from_query(params.category.as_deref());
    let subscription = state.broker.subscribe(identity.subject, category)?;
    info!(
        "{} streaming {} for {}",
        subscription.id(),
        subscription.info().category,
        subscription.info().subject
    );

    let sse = Sse::new(event_stream(subscription));
    let mut response = match state.keep_alive {
        Some(interval) => sse
            .keep_alive(KeepAlive::new().interval(interval))
            .into_response(),
        None => sse.into_response(),
    };

    // Connection-specific headers are not allowed on HTTP/2 and later.
    if version == Version::HTTP_11 {
        response
            .headers_mut()
            .insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    }
    Ok(response)
}

fn event_stream(mut subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    stream! {
        while let Some(frame) = subscription.recv().await {
            yield Ok(to_event(&frame));
        }
        debug!("Finished serving events to {}", subscription.id());
        subscription.close();
    }
}

/// SSE rendering of a frame. Line breaks inside the payload become separate
/// `data:` lines; an event name that could break the framing is dropped.
pub fn to_event(frame: &Frame) -> Event {
    let mut event = Event::default();
    if let Some(name) = frame.event.as_deref() {
        if !name.contains(['\r', '\n']) {
            event = event.event(name);
        }
    }
    event.data(frame.data.replace("\r\n", "\n").replace('\r', "\n"))
}
