use actix::Addr;
use actix_web::web::Bytes;
use futures_util::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use super::bus::{Delivery, Disconnect, NotificationBus, SessionId};

/// How often an idle session writes a comment frame. A write to a dead
/// connection fails, the response stream is dropped and the session leaves
/// the bus.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

const HEARTBEAT_FRAME: &str = ": ping\n\n";

/// Receiving end of one live session, rendered as SSE frames.
///
/// Dropping the stream (client went away) tells the bus to forget the session.
pub struct SessionStream {
    session_id: SessionId,
    outbox: mpsc::UnboundedReceiver<Delivery>,
    heartbeat: Interval,
    bus: Addr<NotificationBus>,
}

impl SessionStream {
    pub(super) fn new(
        session_id: SessionId,
        outbox: mpsc::UnboundedReceiver<Delivery>,
        bus: Addr<NotificationBus>,
        heartbeat_every: Duration,
    ) -> Self {
        let mut heartbeat = time::interval_at(Instant::now() + heartbeat_every, heartbeat_every);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { session_id, outbox, heartbeat, bus }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

impl Stream for SessionStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Poll::Ready(delivery) = self.outbox.poll_recv(cx) {
            // a real frame proves liveness as well as a ping
            self.heartbeat.reset();
            return Poll::Ready(delivery.map(|d| Ok(Bytes::from(d.to_sse_frame()))));
        }

        match self.heartbeat.poll_tick(cx) {
            Poll::Ready(_) => Poll::Ready(Some(Ok(Bytes::from_static(HEARTBEAT_FRAME.as_bytes())))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.bus.do_send(Disconnect { session_id: self.session_id });
    }
}
