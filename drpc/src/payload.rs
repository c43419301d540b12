// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The core never touches user types directly. A [`Payload`] is the
//! bytes-in/bytes-out contract a caller's request and reply types implement;
//! the core only ever sees the marshaled bytes.

use crate::Error;

/// User-supplied marshaling for a request or reply type. Analogous to the
/// original implementation's `Serializer` interface (`Marshal`/`Unmarshal`).
pub trait Payload: Sized {
    fn marshal(&self) -> Result<Vec<u8>, Error>;
    fn unmarshal(data: &[u8]) -> Result<Self, Error>;
}

impl Payload for Vec<u8> {
    fn marshal(&self) -> Result<Vec<u8>, Error> {
        Ok(self.clone())
    }

    fn unmarshal(data: &[u8]) -> Result<Self, Error> {
        Ok(data.to_vec())
    }
}

impl Payload for () {
    fn marshal(&self) -> Result<Vec<u8>, Error> {
        Ok(Vec::new())
    }

    fn unmarshal(_data: &[u8]) -> Result<Self, Error> {
        Ok(())
    }
}
