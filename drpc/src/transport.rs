// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The bidirectional, ordered, reliable byte stream the core runs over.
//!
//! The core never opens or authenticates connections; it only needs to split
//! a stream into an independently-owned read half and write half (so the
//! reader loop and the sending path can each hold buffered wrappers without
//! fighting over a borrow) and to shut the whole connection down exactly
//! once. [`std::net::TcpStream`] and [`std::os::unix::net::UnixStream`] both
//! already support this via their inherent `try_clone`/`shutdown` methods;
//! this trait just names the contract so the client/server engines can stay
//! generic over the transport.

use std::io::{Read, Write};
use std::net::Shutdown;

pub trait Duplex: Read + Write + Send + Sized + 'static {
    /// Returns an independent handle to the same underlying connection.
    fn try_clone(&self) -> std::io::Result<Self>;

    /// Shuts down both halves of the connection. Affects every clone.
    fn shutdown(&self) -> std::io::Result<()>;
}

impl Duplex for std::net::TcpStream {
    fn try_clone(&self) -> std::io::Result<Self> {
        std::net::TcpStream::try_clone(self)
    }

    fn shutdown(&self) -> std::io::Result<()> {
        std::net::TcpStream::shutdown(self, Shutdown::Both)
    }
}

impl Duplex for std::os::unix::net::UnixStream {
    fn try_clone(&self) -> std::io::Result<Self> {
        std::os::unix::net::UnixStream::try_clone(self)
    }

    fn shutdown(&self) -> std::io::Result<()> {
        std::os::unix::net::UnixStream::shutdown(self, Shutdown::Both)
    }
}

impl Duplex for crate::pipe::Endpoint {
    fn try_clone(&self) -> std::io::Result<Self> {
        crate::pipe::Endpoint::try_clone(self)
    }

    fn shutdown(&self) -> std::io::Result<()> {
        crate::pipe::Endpoint::shutdown(self)
    }
}
