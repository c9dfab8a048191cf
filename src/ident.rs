//! Request identifier generation.
//!
//! Identifiers are version-4 UUIDs built from 16 bytes of OS entropy. The
//! entropy read is deliberately fallible: if the source cannot supply the
//! full 16 bytes, the request fails with `EntropyUnavailable` rather than
//! falling back to anything weaker.

use uuid::Uuid;

use crate::errors::BuildError;

/// Generate one unique request identifier.
///
/// Renders as the canonical lowercase `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx`
/// form: byte 6's top nibble is stamped to `0100` (version 4) and byte 8's
/// top two bits to `10` (RFC 4122 variant) by the builder.
pub fn generate() -> Result<Uuid, BuildError> {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes).map_err(BuildError::EntropyUnavailable)?;
    Ok(uuid::Builder::from_random_bytes(bytes).into_uuid())
}
