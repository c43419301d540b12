// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! `RequestHeader` / `ResponseHeader` wire encoding.
//!
//! ```text
//! RequestHeader:  uvarint(ID) ∥ uvarint(len(Method)) ∥ Method ∥ u32_le(Checksum)
//! ResponseHeader: uvarint(ID) ∥ uvarint(len(Error))  ∥ Error  ∥ u32_le(Checksum)
//! ```

use crate::frame::{put_uvarint, read_uvarint};
use crate::Error;

/// Worst-case size of the two uvarints and the trailing checksum in a header,
/// not counting the variable-length string field. Used to presize the
/// marshal buffer before trimming it to the bytes actually written.
const MAX_HEADER_PREFIX: usize = 10 + 10 + 4;

/// A client-assigned request header: sequence ID, `Service.Method` name, and
/// the CRC-32 of the request body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestHeader {
    pub id: u64,
    pub method: String,
    pub checksum: u32,
}

impl RequestHeader {
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = vec![0u8; MAX_HEADER_PREFIX + self.method.len()];
        let idx = write_header(&mut buf, self.id, self.method.as_bytes(), self.checksum);
        buf.truncate(idx);
        buf
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self, Error> {
        let (id, method_bytes, checksum) = read_header(data)?;
        let method =
            String::from_utf8(method_bytes.to_vec()).map_err(|_| Error::MalformedHeader)?;
        Ok(Self {
            id,
            method,
            checksum,
        })
    }
}

/// A server-produced response header: echoed request ID, the handler's error
/// message (empty on success), and the CRC-32 of the response body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseHeader {
    pub id: u64,
    pub error: String,
    pub checksum: u32,
}

impl ResponseHeader {
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = vec![0u8; MAX_HEADER_PREFIX + self.error.len()];
        let idx = write_header(&mut buf, self.id, self.error.as_bytes(), self.checksum);
        buf.truncate(idx);
        buf
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self, Error> {
        let (id, error_bytes, checksum) = read_header(data)?;
        let error = String::from_utf8(error_bytes.to_vec()).map_err(|_| Error::MalformedHeader)?;
        Ok(Self { id, error, checksum })
    }
}

fn write_header(buf: &mut [u8], id: u64, field: &[u8], checksum: u32) -> usize {
    let mut idx = 0;
    let mut varint = [0u8; 10];

    let n = put_uvarint(&mut varint, id);
    buf[idx..idx + n].copy_from_slice(&varint[..n]);
    idx += n;

    let n = put_uvarint(&mut varint, field.len() as u64);
    buf[idx..idx + n].copy_from_slice(&varint[..n]);
    idx += n;
    buf[idx..idx + field.len()].copy_from_slice(field);
    idx += field.len();

    buf[idx..idx + 4].copy_from_slice(&checksum.to_le_bytes());
    idx += 4;
    idx
}

fn read_header(data: &[u8]) -> Result<(u64, &[u8], u32), Error> {
    let (id, n) = read_uvarint(data).ok_or(Error::MalformedHeader)?;
    let mut idx = n;

    let (len, n) = read_uvarint(&data[idx..]).ok_or(Error::MalformedHeader)?;
    idx += n;
    let len = len as usize;

    let field_end = idx.checked_add(len).ok_or(Error::MalformedHeader)?;
    let field = data.get(idx..field_end).ok_or(Error::MalformedHeader)?;
    idx = field_end;

    let checksum_end = idx.checked_add(4).ok_or(Error::MalformedHeader)?;
    let checksum_bytes: [u8; 4] = data
        .get(idx..checksum_end)
        .ok_or(Error::MalformedHeader)?
        .try_into()
        .map_err(|_| Error::MalformedHeader)?;
    let checksum = u32::from_le_bytes(checksum_bytes);

    Ok((id, field, checksum))
}
