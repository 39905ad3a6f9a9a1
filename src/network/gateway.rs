//! TCP gateway: accepts connections and bridges them to the dispatch
//! loop as line events.

use crate::state::Event;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Longest accepted input line; clients sending more are cut off.
const MAX_LINE_LENGTH: usize = 1024;

/// The listening side of the server.
pub struct Gateway {
    listener: TcpListener,
    events: mpsc::Sender<Event>,
    outbound_queue: usize,
}

impl Gateway {
    pub async fn bind(
        addr: &str,
        events: mpsc::Sender<Event>,
        outbound_queue: usize,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %addr, "Listening");
        Ok(Self {
            listener,
            events,
            outbound_queue,
        })
    }

    /// Accept connections until the process ends.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(addr = %addr, "Accepted connection");
                    let events = self.events.clone();
                    let queue = self.outbound_queue;
                    tokio::spawn(serve(stream, events, queue));
                }
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                }
            }
        }
    }
}

/// Per-connection plumbing: a writer task draining the outbound queue
/// and a read loop feeding decoded lines into dispatch.
async fn serve(stream: TcpStream, events: mpsc::Sender<Event>, queue: usize) {
    let conn = Uuid::new_v4();
    let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let (mut sink, mut lines) = framed.split();

    let (outbound, mut outbound_rx) = mpsc::channel::<String>(queue);
    if events
        .send(Event::Connected { conn, outbound })
        .await
        .is_err()
    {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(line) = outbound_rx.recv().await {
            if sink.send(line).await.is_err() {
                break;
            }
        }
    });

    while let Some(item) = lines.next().await {
        match item {
            Ok(line) => {
                if events.send(Event::Line { conn, line }).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(conn = %conn, error = %e, "Read error");
                break;
            }
        }
    }

    let _ = events.send(Event::Disconnected { conn }).await;
    // The dispatch side drops its sender on disconnect; give the writer
    // a moment to flush what's queued, then stop it.
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), writer).await;
}
