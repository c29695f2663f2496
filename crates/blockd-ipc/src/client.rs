//! IPC client implementation

use blockd_api::{Command, Event, Request, Response};
use std::collections::VecDeque;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

use crate::{IpcError, IpcResult};

/// One line from the server
enum Incoming {
    Response(Response),
    Event(Event),
}

/// IPC Client for connecting to blockdd
pub struct IpcClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_request_id: u64,
    /// Events that arrived while waiting for a response
    pending_events: VecDeque<Event>,
}

impl IpcClient {
    /// Connect to blockdd
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            next_request_id: 1,
            pending_events: VecDeque::new(),
        })
    }

    /// Send a command and wait for its response
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let request = Request::new(request_id, command);
        let mut json = serde_json::to_string(&request)?;
        json.push('\n');

        self.writer.write_all(json.as_bytes()).await?;

        loop {
            match read_incoming(&mut self.reader).await? {
                Incoming::Response(response) if response.request_id == request_id => {
                    return Ok(response);
                }
                Incoming::Response(other) => {
                    return Err(IpcError::InvalidMessage(format!(
                        "response for request {} while waiting for {}",
                        other.request_id, request_id
                    )));
                }
                Incoming::Event(event) => self.pending_events.push_back(event),
            }
        }
    }

    /// Subscribe to events and consume this client to return an event stream
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        let response = self.send(Command::SubscribeEvents).await?;

        if let Err(e) = response.into_result() {
            return Err(IpcError::ServerError(e.message));
        }

        Ok(EventStream {
            reader: self.reader,
            _writer: self.writer,
            pending: self.pending_events,
        })
    }
}

/// Stream of events from blockdd
pub struct EventStream {
    reader: BufReader<OwnedReadHalf>,
    /// Held open; the server drops a client once its write side closes
    _writer: OwnedWriteHalf,
    pending: VecDeque<Event>,
}

impl EventStream {
    /// Wait for the next event
    pub async fn next(&mut self) -> IpcResult<Event> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }

        loop {
            if let Incoming::Event(event) = read_incoming(&mut self.reader).await? {
                return Ok(event);
            }
        }
    }
}

async fn read_incoming(reader: &mut BufReader<OwnedReadHalf>) -> IpcResult<Incoming> {
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return parse_incoming(trimmed);
        }
    }
}

/// Responses carry a `request_id`; events never do
fn parse_incoming(line: &str) -> IpcResult<Incoming> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    if value.get("request_id").is_some() {
        Ok(Incoming::Response(serde_json::from_value(value)?))
    } else {
        Ok(Incoming::Event(serde_json::from_value(value)?))
    }
}
