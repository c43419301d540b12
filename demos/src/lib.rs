// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Request/reply types for the two worked demo services, `Hello.SayHello`
//! and `Math.Add`. Grounded in the upstream project's own hand-written
//! (non-generated) example codecs; the encoding here is deliberately simple
//! since the core crate is agnostic to payload format (any encoding the
//! caller likes works), this one just needs to be exercised end to end.

use drpc::{Error, Payload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloRequest {
    pub name: String,
}

impl Payload for HelloRequest {
    fn marshal(&self) -> Result<Vec<u8>, Error> {
        Ok(self.name.clone().into_bytes())
    }

    fn unmarshal(data: &[u8]) -> Result<Self, Error> {
        let name = String::from_utf8(data.to_vec()).map_err(|e| Error::Unmarshal(e.to_string()))?;
        Ok(Self { name })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloReply {
    pub reply: String,
}

impl Payload for HelloReply {
    fn marshal(&self) -> Result<Vec<u8>, Error> {
        Ok(self.reply.clone().into_bytes())
    }

    fn unmarshal(data: &[u8]) -> Result<Self, Error> {
        let reply = String::from_utf8(data.to_vec()).map_err(|e| Error::Unmarshal(e.to_string()))?;
        Ok(Self { reply })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathRequest {
    pub a: i32,
    pub b: i32,
}

impl Payload for MathRequest {
    fn marshal(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::with_capacity(8);
        buf.extend_from_slice(&self.a.to_le_bytes());
        buf.extend_from_slice(&self.b.to_le_bytes());
        Ok(buf)
    }

    fn unmarshal(data: &[u8]) -> Result<Self, Error> {
        if data.len() != 8 {
            return Err(Error::Unmarshal(format!(
                "MathRequest needs 8 bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            a: i32::from_le_bytes(data[0..4].try_into().unwrap()),
            b: i32::from_le_bytes(data[4..8].try_into().unwrap()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathReply {
    pub c: i32,
}

impl Payload for MathReply {
    fn marshal(&self) -> Result<Vec<u8>, Error> {
        Ok(self.c.to_le_bytes().to_vec())
    }

    fn unmarshal(data: &[u8]) -> Result<Self, Error> {
        if data.len() != 4 {
            return Err(Error::Unmarshal(format!(
                "MathReply needs 4 bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            c: i32::from_le_bytes(data.try_into().unwrap()),
        })
    }
}
