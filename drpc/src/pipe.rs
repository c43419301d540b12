// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! A "pipe", constructed using socketpair(2), that can be used for testing
//! client and server behavior without binding a real listening socket.

use nix::sys::socket::{self, socketpair, AddressFamily, Shutdown, SockFlag, SockType};

pub struct Endpoint {
    fd: std::os::fd::OwnedFd,
}

/// Returns a pair of connected, bidirectional endpoints.
pub fn pipe() -> std::io::Result<(Endpoint, Endpoint)> {
    let (a, b) = socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        None,
        SockFlag::empty(),
    )?;

    Ok((Endpoint { fd: a }, Endpoint { fd: b }))
}

impl std::io::Read for Endpoint {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(nix::unistd::read(&self.fd, buf)?)
    }
}

impl std::io::Write for Endpoint {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(nix::unistd::write(&self.fd, buf)?)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Endpoint {
    /// Duplicates the underlying file descriptor so reader and writer halves
    /// can be owned by different threads.
    pub fn try_clone(&self) -> std::io::Result<Endpoint> {
        Ok(Endpoint {
            fd: self.fd.try_clone()?,
        })
    }

    /// Shuts down both directions of the socket. Affects every clone sharing
    /// this file descriptor's underlying socket.
    pub fn shutdown(&self) -> std::io::Result<()> {
        Ok(socket::shutdown(&self.fd, Shutdown::Both)?)
    }
}
