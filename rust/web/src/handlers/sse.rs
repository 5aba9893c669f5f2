use super::{run_blocking, session_error};
use crate::events::{DraftEvent, EventSubscription};
use crate::session::{SessionError, SessionManager};
use crate::store::SessionId;
use futures_util::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use warp::http;
use warp::reply::{self, Response};
use warp::sse;
use warp::Reply;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// `GET /events/{session_id}`: joins the room and streams every event as
/// an SSE frame named after the event.
pub async fn stream_events(session_id: SessionId, sessions: Arc<SessionManager>) -> Response {
    let lookup_id = session_id.clone();
    let exists = run_blocking(Arc::clone(&sessions), move |sessions| {
        sessions.exists(&lookup_id)
    })
    .await;
    match exists {
        Ok(true) => {}
        Ok(false) => return session_error(SessionError::NotFound(session_id)),
        Err(err) => return session_error(err),
    }

    let subscription = sessions.bus().subscribe(session_id);
    let keep_alive = sse::keep_alive()
        .interval(KEEP_ALIVE_INTERVAL)
        .text(":keep-alive\n");

    let reply = sse::reply(keep_alive.stream(subscription_stream(subscription)));
    reply::with_header(reply, http::header::CACHE_CONTROL, "no-cache").into_response()
}

// The subscription travels with the stream, so the viewer leaves the room
// when the client disconnects and warp drops the body.
fn subscription_stream(
    subscription: EventSubscription,
) -> impl Stream<Item = Result<sse::Event, Infallible>> + Send + 'static {
    let mut subscription = subscription;
    let (_, placeholder_rx) = mpsc::channel(1);
    let receiver = std::mem::replace(&mut subscription.receiver, placeholder_rx);
    let subscription = Arc::new(subscription);

    ReceiverStream::new(receiver).map(move |event| {
        let _membership = Arc::clone(&subscription);
        Ok(render_event(&event))
    })
}

fn render_event(event: &DraftEvent) -> sse::Event {
    sse::Event::default()
        .event(event.name())
        .data(event.payload().to_string())
}
