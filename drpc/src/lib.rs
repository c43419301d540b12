// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! A compact, length-prefixed RPC runtime.
//!
//! `drpc` dispatches named `Service.Method` calls over any bidirectional,
//! ordered, reliable byte stream. The wire format is two varint-length-prefixed
//! frames per message (header, then body); the client multiplexes any number
//! of concurrent calls onto a single connection by correlating responses to
//! requests via a monotonically increasing sequence ID.
//!
//! This crate is the core: the wire protocol, the header codec, and the
//! client/server dispatch engines. It does not define a concrete payload
//! encoding (see [`Payload`]) or acquire transports; callers bring their own
//! `Read + Write` stream and their own request/reply types.

pub mod client;
pub mod frame;
pub mod header;
pub mod payload;
pub mod pipe;
pub mod registry;
pub mod server;
pub mod transport;

use std::fmt;

pub use client::{Call, Client};
pub use header::{RequestHeader, ResponseHeader};
pub use payload::Payload;
pub use registry::{Handler, ServiceRegistry};
pub use server::Server;

/// Errors that can arise anywhere in the RPC runtime: on the wire, in the
/// header codec, in the service registry, or from user-supplied marshaling.
#[derive(Debug)]
pub enum Error {
    /// The client is closing or has already shut down.
    Shutdown,

    /// The peer closed the connection mid-stream, without a user-requested
    /// `Client::close`.
    UnexpectedEof,

    /// A `RequestHeader` or `ResponseHeader` ran past the end of its frame
    /// while decoding.
    MalformedHeader,

    /// A length-prefixed frame could not be read in full.
    MalformedFrame,

    /// The CRC-32 recorded in a header didn't match the body that followed it.
    ChecksumMismatch,

    /// `Service.Method` named a service with no registered methods.
    UnknownService(String),

    /// `Service.Method` named a method not registered on that service.
    UnknownMethod(String),

    /// `Service.Method` was registered more than once.
    DuplicateRegistration(String),

    /// `serviceMethod` passed to `register`/`resolve` had no `.` separator.
    IllFormedMethod(String),

    /// User-supplied `Payload::marshal` failed.
    Marshal(String),

    /// User-supplied `Payload::unmarshal` failed.
    Unmarshal(String),

    /// A handler returned an application-level error; carried in the
    /// response's `Error` field on the wire, never fatal to the connection.
    Handler(String),

    /// Underlying I/O failure.
    Io(std::io::Error),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => write!(f, "connection is shut down"),
            Self::UnexpectedEof => write!(f, "unexpected EOF"),
            Self::MalformedHeader => write!(f, "malformed header"),
            Self::MalformedFrame => write!(f, "malformed frame"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::UnknownService(name) => write!(f, "can't find service: {name}"),
            Self::UnknownMethod(name) => write!(f, "can't find method: {name}"),
            Self::DuplicateRegistration(name) => write!(f, "{name} has been registered"),
            Self::IllFormedMethod(name) => {
                write!(f, "rpc: service/method request ill-formed: {name}")
            }
            Self::Marshal(msg) => write!(f, "marshal failed: {msg}"),
            Self::Unmarshal(msg) => write!(f, "unmarshal failed: {msg}"),
            Self::Handler(msg) => write!(f, "{msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Self::Shutdown => Self::Shutdown,
            Self::UnexpectedEof => Self::UnexpectedEof,
            Self::MalformedHeader => Self::MalformedHeader,
            Self::MalformedFrame => Self::MalformedFrame,
            Self::ChecksumMismatch => Self::ChecksumMismatch,
            Self::UnknownService(s) => Self::UnknownService(s.clone()),
            Self::UnknownMethod(s) => Self::UnknownMethod(s.clone()),
            Self::DuplicateRegistration(s) => Self::DuplicateRegistration(s.clone()),
            Self::IllFormedMethod(s) => Self::IllFormedMethod(s.clone()),
            Self::Marshal(s) => Self::Marshal(s.clone()),
            Self::Unmarshal(s) => Self::Unmarshal(s.clone()),
            Self::Handler(s) => Self::Handler(s.clone()),
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
        }
    }
}

/// CRC-32 (IEEE polynomial 0xEDB88320, zlib variant) over the given bytes.
/// Exposed so callers hand-crafting frames (tests, alternative codecs) can
/// compute the same checksum the client and server use internally.
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}
