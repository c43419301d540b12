// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The accept loop, per-connection serve loop, and method dispatch.
//!
//! Handlers run inline on the connection's own thread (there is no worker
//! pool). Requests on one connection are processed serially; connections run
//! fully in parallel with each other.

use std::io::{BufReader, BufWriter};
use std::net::TcpListener;
use std::sync::Arc;

use log::{debug, warn};

use crate::frame;
use crate::header::{RequestHeader, ResponseHeader};
use crate::registry::ServiceRegistry;
use crate::transport::Duplex;
use crate::{checksum, Error};

/// Mirrors the client's `ClientCodec`: frame-level read/write specialized for
/// the request/response shape, over any [`Duplex`] transport.
pub struct ServerCodec<S: Duplex> {
    reader: BufReader<S>,
    writer: BufWriter<S>,
    conn: S,
    closed: bool,
}

impl<S: Duplex> ServerCodec<S> {
    pub fn new(conn: S) -> std::io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(conn.try_clone()?),
            writer: BufWriter::new(conn.try_clone()?),
            conn,
            closed: false,
        })
    }

    pub fn read_request_header(&mut self) -> Result<RequestHeader, Error> {
        let data = frame::recv(&mut self.reader)?;
        RequestHeader::unmarshal(&data)
    }

    pub fn read_request_body(&mut self) -> Result<Vec<u8>, Error> {
        frame::recv(&mut self.reader)
    }

    pub fn write_response(&mut self, header: &ResponseHeader, body: &[u8]) -> Result<(), Error> {
        frame::send(&mut self.writer, &header.marshal())?;
        frame::send(&mut self.writer, body)?;
        self.writer.flush().map_err(Error::Io)
    }

    pub fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.conn.shutdown().map_err(Error::Io)
    }
}

impl<S: Duplex> Drop for ServerCodec<S> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// The server-side runtime: an accept loop plus a [`ServiceRegistry`] shared
/// by every connection's dispatch.
#[derive(Default)]
pub struct Server {
    registry: ServiceRegistry,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `service_method` ("Service.Method").
    pub fn register(
        &self,
        service_method: &str,
        handler: impl Fn(&[u8]) -> Result<Vec<u8>, Error> + Send + Sync + 'static,
    ) -> Result<(), Error> {
        self.registry.register(service_method, handler)
    }
}

/// Repeatedly accepts a connection and spawns an independent thread to serve
/// it. Accept errors are logged and the loop continues; the listener is
/// assumed self-healing.
pub fn serve(server: Arc<Server>, listener: TcpListener) {
    loop {
        match listener.accept() {
            Ok((stream, addr)) => {
                debug!("accepted connection from {addr}");
                let server = Arc::clone(&server);
                std::thread::spawn(move || serve_conn(&server, stream));
            }
            Err(e) => warn!("rpc: error accepting connection: {e}"),
        }
    }
}

/// Wraps `stream` in a [`ServerCodec`] and serves it to completion.
pub fn serve_conn<S: Duplex>(server: &Server, stream: S) {
    match ServerCodec::new(stream) {
        Ok(codec) => serve_codec(server, codec),
        Err(e) => warn!("rpc: failed to wrap connection: {e}"),
    }
}

/// Sequential per-connection loop: read a request, dispatch it, write a
/// response, repeat until an unrecoverable I/O error ends the connection.
/// The codec is closed exactly once, on return.
pub fn serve_codec<S: Duplex>(server: &Server, mut codec: ServerCodec<S>) {
    loop {
        let header = match codec.read_request_header() {
            Ok(header) => header,
            Err(e) => {
                debug!("rpc: connection closed while reading request header: {e}");
                break;
            }
        };

        match dispatch(server, &mut codec, &header) {
            Ok(()) => {}
            Err(e) => {
                warn!("rpc: failed to send response: {e}");
                break;
            }
        }
    }
    let _ = codec.close();
}

/// Reads the request body unconditionally (so the stream stays framed even
/// on a lookup failure), resolves the handler, checks the checksum, invokes
/// the handler, and writes the response. Only a write failure is returned to
/// the caller as fatal; every other failure is projected into the response's
/// `Error` field.
fn dispatch<S: Duplex>(
    server: &Server,
    codec: &mut ServerCodec<S>,
    header: &RequestHeader,
) -> Result<(), Error> {
    let handler = server.registry.resolve(&header.method);

    // The body is always read, lookup failure or not, so the stream stays
    // framed for the next request. A frame-level failure here is fatal to
    // the connection and propagates straight out, taking priority over any
    // later checksum mismatch (the first error wins).
    let body = codec.read_request_body()?;

    let (reply, error) = match handler {
        Err(lookup_err) => (Vec::new(), Some(lookup_err)),
        Ok(handler) => {
            if header.checksum != checksum(&body) {
                (Vec::new(), Some(Error::ChecksumMismatch))
            } else {
                match handler(&body) {
                    Ok(reply) => (reply, None),
                    Err(e) => (Vec::new(), Some(e)),
                }
            }
        }
    };

    let response = ResponseHeader {
        id: header.id,
        error: error.map(|e| e.to_string()).unwrap_or_default(),
        checksum: checksum(&reply),
    };

    codec.write_response(&response, &reply)
}
