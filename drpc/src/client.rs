// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The client's concurrent dispatch engine: sequence assignment, the pending
//! call registry, single-writer discipline on the wire, the reader loop, and
//! shutdown.

use std::collections::HashMap;
use std::io::{BufReader, BufWriter};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, warn};

use crate::frame;
use crate::header::{RequestHeader, ResponseHeader};
use crate::payload::Payload;
use crate::transport::Duplex;
use crate::{checksum, Error};

/// Frame-level read/write specialized for the request/response shape.
/// `new` wraps a connection; `split` hands out independently-owned halves so
/// the send path and the reader loop can run on different threads without
/// contending on a shared borrow.
pub struct ClientCodec<S: Duplex> {
    reader: BufReader<S>,
    writer: BufWriter<S>,
    conn: S,
}

impl<S: Duplex> ClientCodec<S> {
    pub fn new(conn: S) -> std::io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(conn.try_clone()?),
            writer: BufWriter::new(conn.try_clone()?),
            conn,
        })
    }

    pub fn write_request(&mut self, header: &RequestHeader, body: &[u8]) -> Result<(), Error> {
        frame::send(&mut self.writer, &header.marshal())?;
        frame::send(&mut self.writer, body)?;
        self.writer.flush().map_err(Error::Io)
    }

    pub fn read_response_header(&mut self) -> Result<ResponseHeader, Error> {
        let data = frame::recv(&mut self.reader)?;
        ResponseHeader::unmarshal(&data)
    }

    pub fn read_response_body(&mut self) -> Result<Vec<u8>, Error> {
        frame::recv(&mut self.reader)
    }

    pub fn close(&self) -> Result<(), Error> {
        self.conn.shutdown().map_err(Error::Io)
    }

    fn split(self) -> (WriteHalf<S>, BufReader<S>) {
        (
            WriteHalf {
                writer: self.writer,
                conn: self.conn,
            },
            self.reader,
        )
    }
}

struct WriteHalf<S: Duplex> {
    writer: BufWriter<S>,
    conn: S,
}

impl<S: Duplex> WriteHalf<S> {
    fn write_request(&mut self, header: &RequestHeader, body: &[u8]) -> Result<(), Error> {
        frame::send(&mut self.writer, &header.marshal())?;
        frame::send(&mut self.writer, body)?;
        self.writer.flush().map_err(Error::Io)
    }
}

/// A completion callback for one pending call: given the raw response body
/// (or the error that ended the connection), unmarshal into the caller's
/// reply type and signal its `Call`. Type-erased so calls of different reply
/// types can share one pending map.
type Completion = Box<dyn FnOnce(Result<Vec<u8>, Error>) + Send>;

struct ClientState {
    seq: u64,
    pending: HashMap<u64, Completion>,
    closing: bool,
    shutdown: bool,
}

/// A single outstanding invocation. Resolve it with [`Call::done`] (blocking)
/// or by polling the inner channel yourself.
pub struct Call<R> {
    pub service_method: String,
    done: Receiver<Result<R, Error>>,
}

impl<R> Call<R> {
    /// Blocks until the call completes, returning its result exactly once.
    pub fn done(self) -> Result<R, Error> {
        self.done.recv().unwrap_or(Err(Error::Shutdown))
    }
}

/// A client connection able to multiplex any number of concurrent calls.
/// `send-lock` (the `Mutex` guarding the writer) serializes wire writes and
/// the closing/shutdown check; `state-lock` protects `seq`, `pending`,
/// `closing`, `shutdown`. When both are needed, send-lock is acquired first,
/// except during shutdown, which takes the same order to stay deadlock-free.
pub struct Client<S: Duplex> {
    send: Mutex<WriteHalf<S>>,
    state: Mutex<ClientState>,
    shutdown_conn: S,
}

impl<S: Duplex> Client<S> {
    /// Wraps `conn`, starting the reader loop on its own thread.
    pub fn new(conn: S) -> std::io::Result<Arc<Self>> {
        let codec = ClientCodec::new(conn)?;
        let shutdown_conn = codec.conn.try_clone()?;
        let (write_half, reader) = codec.split();

        let client = Arc::new(Self {
            send: Mutex::new(write_half),
            state: Mutex::new(ClientState {
                seq: 0,
                pending: HashMap::new(),
                closing: false,
                shutdown: false,
            }),
            shutdown_conn,
        });

        let reader_client = Arc::clone(&client);
        thread::spawn(move || reader_loop(reader_client, reader));

        Ok(client)
    }

    /// Asynchronous call: returns a [`Call`] whose completion arrives exactly
    /// once, whether by a matched response, a local failure, or shutdown.
    pub fn go<A, R>(&self, service_method: &str, args: &A) -> Call<R>
    where
        A: Payload,
        R: Payload + Send + 'static,
    {
        let (tx, rx) = sync_channel(1);
        self.send_call(service_method, args, tx);
        Call {
            service_method: service_method.to_string(),
            done: rx,
        }
    }

    /// Synchronous convenience: `self.go(...).done()`.
    pub fn call<A, R>(&self, service_method: &str, args: &A) -> Result<R, Error>
    where
        A: Payload,
        R: Payload + Send + 'static,
    {
        self.go(service_method, args).done()
    }

    /// Marks the client as closing and shuts the connection down. Safe to
    /// call concurrently with in-flight calls; every pending call observes
    /// the shutdown sweep started by the reader loop. Idempotent-by-error:
    /// calling twice returns [`Error::Shutdown`] on the second call.
    pub fn close(&self) -> Result<(), Error> {
        {
            let mut state = self.state.lock().unwrap();
            if state.closing {
                return Err(Error::Shutdown);
            }
            state.closing = true;
        }
        self.shutdown_conn.shutdown().map_err(Error::Io)
    }

    fn send_call<A, R>(&self, service_method: &str, args: &A, tx: SyncSender<Result<R, Error>>)
    where
        A: Payload,
        R: Payload + Send + 'static,
    {
        // send-lock first, per the client's lock ordering rule.
        let mut writer = self.send.lock().unwrap();

        let id = {
            let mut state = self.state.lock().unwrap();
            if state.closing || state.shutdown {
                let _ = tx.send(Err(Error::Shutdown));
                return;
            }
            let id = state.seq;
            state.seq += 1;
            id
        };

        // A marshal failure never reaches the wire and never consumes a
        // pending-map slot; it fails the call locally but must still signal
        // completion exactly once.
        let body = match args.marshal() {
            Ok(body) => body,
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        };

        let header = RequestHeader {
            id,
            method: service_method.to_string(),
            checksum: checksum(&body),
        };

        // Registered before the write: the reader loop may assume every
        // pending ID either has a forthcoming response or is cleared by the
        // shutdown sweep.
        {
            let mut state = self.state.lock().unwrap();
            state.pending.insert(
                id,
                Box::new(move |result: Result<Vec<u8>, Error>| {
                    let _ = tx.send(result.and_then(|body| R::unmarshal(&body)));
                }),
            );
        }

        if let Err(e) = writer.write_request(&header, &body) {
            warn!("rpc: failed to write request, err: {e}");
            let mut state = self.state.lock().unwrap();
            if let Some(complete) = state.pending.remove(&id) {
                drop(state);
                complete(Err(e));
            }
        }
    }
}

/// Runs on its own thread for the life of the client: reads responses,
/// correlates each to its pending `Call` by ID, and signals completion.
/// On any frame-level or checksum failure, enters the shutdown path.
fn reader_loop<S: Duplex>(client: Arc<Client<S>>, mut reader: BufReader<S>) {
    let cause = loop {
        let header = match read_response_header(&mut reader) {
            Ok(header) => header,
            Err(e) => break e,
        };

        let body = match frame::recv(&mut reader) {
            Ok(body) => body,
            Err(e) => break e,
        };

        if header.checksum != checksum(&body) {
            warn!("rpc: response checksum mismatch");
            break Error::ChecksumMismatch;
        }

        let complete = {
            let mut state = client.state.lock().unwrap();
            state.pending.remove(&header.id)
        };

        match complete {
            Some(complete) => {
                if header.error.is_empty() {
                    complete(Ok(body));
                } else {
                    complete(Err(Error::Handler(header.error)));
                }
            }
            None => debug!("rpc: discarding response for unknown or late id {}", header.id),
        }
    };

    shutdown_sweep(&client, cause);
}

fn read_response_header<S: Duplex>(reader: &mut BufReader<S>) -> Result<ResponseHeader, Error> {
    let data = frame::recv(reader)?;
    ResponseHeader::unmarshal(&data)
}

/// Fences new sends and the reader from each other, normalizes the
/// termination cause, and fails every remaining pending call with it.
fn shutdown_sweep<S: Duplex>(client: &Client<S>, cause: Error) {
    let _send_guard = client.send.lock().unwrap();
    let mut state = client.state.lock().unwrap();

    state.shutdown = true;
    let closing = state.closing;

    let cause = match cause {
        Error::UnexpectedEof if closing => Error::Shutdown,
        other => other,
    };

    for (_, complete) in state.pending.drain() {
        complete(Err(cause.clone()));
    }

    if !matches!(cause, Error::Shutdown) && !closing {
        warn!("rpc: client protocol error: {cause}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;
    use crate::pipe;
    use crate::server::{serve_conn, Server};
    use std::sync::Arc as StdArc;

    #[derive(Debug, PartialEq)]
    struct U32Pair(u32, u32);

    impl Payload for U32Pair {
        fn marshal(&self) -> Result<Vec<u8>, Error> {
            let mut buf = Vec::with_capacity(8);
            buf.extend_from_slice(&self.0.to_le_bytes());
            buf.extend_from_slice(&self.1.to_le_bytes());
            Ok(buf)
        }

        fn unmarshal(data: &[u8]) -> Result<Self, Error> {
            if data.len() != 8 {
                return Err(Error::Unmarshal("expected 8 bytes".into()));
            }
            Ok(Self(
                u32::from_le_bytes(data[0..4].try_into().unwrap()),
                u32::from_le_bytes(data[4..8].try_into().unwrap()),
            ))
        }
    }

    #[derive(Debug, PartialEq)]
    struct U32(u32);

    impl Payload for U32 {
        fn marshal(&self) -> Result<Vec<u8>, Error> {
            Ok(self.0.to_le_bytes().to_vec())
        }

        fn unmarshal(data: &[u8]) -> Result<Self, Error> {
            if data.len() != 4 {
                return Err(Error::Unmarshal("expected 4 bytes".into()));
            }
            Ok(Self(u32::from_le_bytes(data.try_into().unwrap())))
        }
    }

    fn add_server() -> StdArc<Server> {
        let server = StdArc::new(Server::new());
        server
            .register("Math.Add", |body| {
                let args = U32Pair::unmarshal(body)?;
                U32(args.0 + args.1).marshal()
            })
            .unwrap();
        server
    }

    #[test]
    fn call_roundtrip() {
        let (client_end, server_end) = pipe::pipe().unwrap();
        let server = add_server();
        thread::spawn(move || serve_conn(&server, server_end));

        let client = Client::new(client_end).unwrap();
        let reply: U32 = client.call("Math.Add", &U32Pair(1, 2)).unwrap();
        assert_eq!(reply, U32(3));
    }

    #[test]
    fn unknown_method_reports_error_without_killing_connection() {
        let (client_end, server_end) = pipe::pipe().unwrap();
        let server = add_server();
        thread::spawn(move || serve_conn(&server, server_end));

        let client = Client::new(client_end).unwrap();
        let err = client
            .call::<_, U32>("Math.Div", &U32Pair(1, 2))
            .unwrap_err();
        assert!(err.to_string().starts_with("can't find method"));

        // the connection must still be usable afterwards
        let reply: U32 = client.call("Math.Add", &U32Pair(4, 5)).unwrap();
        assert_eq!(reply, U32(9));
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let (client_end, server_end) = pipe::pipe().unwrap();
        let server = add_server();
        thread::spawn(move || serve_conn(&server, server_end));

        let client = Client::new(client_end).unwrap();
        let mut calls = Vec::new();
        for i in 0..10u32 {
            calls.push(client.go::<_, U32>("Math.Add", &U32Pair(i, i)));
        }
        for call in calls {
            call.done().unwrap();
        }
    }

    #[test]
    fn close_fails_every_pending_call() {
        let (client_end, server_end) = pipe::pipe().unwrap();
        // Held but never served: writes buffer harmlessly in the kernel, and
        // nothing ever answers, so every call is still pending when we close.
        let _server_end = server_end;

        let client = Client::new(client_end).unwrap();
        let calls: Vec<Call<U32>> = (0..10)
            .map(|i| client.go("Math.Add", &U32Pair(i, i)))
            .collect();

        client.close().unwrap();

        for call in calls {
            let err = call.done().unwrap_err();
            assert!(matches!(err, Error::Shutdown | Error::UnexpectedEof));
        }

        assert!(matches!(client.close(), Err(Error::Shutdown)));
    }
}
