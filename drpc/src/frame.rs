// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Length-prefixed frame I/O: `uvarint(len(data)) ∥ data`.
//!
//! A zero-length payload is encoded as the single zero varint byte with no
//! payload bytes following. Two frames compose one message: the header frame,
//! then the body frame.

use std::io::{self, ErrorKind, Read, Write};

use crate::Error;

/// Maximum encoded length of a base-128 uvarint for a 64-bit value.
const MAX_VARINT_LEN_64: usize = 10;

/// Encodes `value` as a base-128 little-endian uvarint (7 bits per byte, high
/// bit set on every byte but the last) and returns the number of bytes
/// written into `out`.
pub fn put_uvarint(out: &mut [u8; MAX_VARINT_LEN_64], mut value: u64) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        out[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    out[i] = value as u8;
    i + 1
}

/// Decodes a uvarint from the front of `data`, returning the value and the
/// number of bytes consumed, or `None` if `data` ran out before a
/// continuation bit cleared.
pub fn read_uvarint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &b) in data.iter().enumerate().take(MAX_VARINT_LEN_64) {
        value |= u64::from(b & 0x7f) << (7 * i);
        if b & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

/// Reads a uvarint one byte at a time from `r`. Requires a reader that won't
/// block forever on a short read past EOF; buffered readers are expected to
/// support this since decoding must inspect bytes individually.
fn read_uvarint_from<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut value: u64 = 0;
    let mut byte = [0u8; 1];
    for i in 0..MAX_VARINT_LEN_64 {
        r.read_exact(&mut byte)?;
        value |= u64::from(byte[0] & 0x7f) << (7 * i);
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(io::Error::new(ErrorKind::InvalidData, "uvarint too long"))
}

/// Emits `uvarint(len(data))` followed by `data`. Retries on
/// [`ErrorKind::Interrupted`]; any other write failure is returned verbatim.
pub fn send<W: Write>(w: &mut W, data: &[u8]) -> Result<(), Error> {
    let mut size = [0u8; MAX_VARINT_LEN_64];
    let n = put_uvarint(&mut size, data.len() as u64);
    write_all_retrying(w, &size[..n])?;
    if !data.is_empty() {
        write_all_retrying(w, data)?;
    }
    Ok(())
}

fn write_all_retrying<W: Write>(w: &mut W, mut data: &[u8]) -> io::Result<()> {
    while !data.is_empty() {
        match w.write(data) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "failed to write whole frame",
                ))
            }
            Ok(n) => data = &data[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Reads a uvarint length, then that many bytes. Returns an empty buffer when
/// length is zero.
pub fn recv<R: Read>(r: &mut R) -> Result<Vec<u8>, Error> {
    let len = read_uvarint_from(r).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(e)
        }
    })?;

    if len == 0 {
        return Ok(Vec::new());
    }

    let mut data = vec![0u8; len as usize];
    r.read_exact(&mut data).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::MalformedFrame
        } else {
            Error::Io(e)
        }
    })?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uvarint_roundtrip() {
        for value in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut buf = [0u8; MAX_VARINT_LEN_64];
            let n = put_uvarint(&mut buf, value);
            let (decoded, consumed) = read_uvarint(&buf[..n]).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, n);
        }
    }

    #[test]
    fn frame_roundtrip_empty() {
        let mut buf = Vec::new();
        send(&mut buf, &[]).unwrap();
        let mut cursor = buf.as_slice();
        let data = recv(&mut cursor).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn frame_roundtrip_nonempty() {
        let payload = b"the quick brown fox".to_vec();
        let mut buf = Vec::new();
        send(&mut buf, &payload).unwrap();
        let mut cursor = buf.as_slice();
        let data = recv(&mut cursor).unwrap();
        assert_eq!(data, payload);
    }

    #[test]
    fn short_read_is_malformed_frame() {
        // Claims a 10-byte payload but supplies none.
        let mut buf = Vec::new();
        let mut size = [0u8; MAX_VARINT_LEN_64];
        let n = put_uvarint(&mut size, 10);
        buf.extend_from_slice(&size[..n]);

        let mut cursor = buf.as_slice();
        match recv(&mut cursor) {
            Err(Error::MalformedFrame) | Err(Error::UnexpectedEof) => {}
            other => panic!("expected a framing error, got {other:?}"),
        }
    }
}
