//! Debug formatting utilities.

use std::fmt::{self, Debug, Formatter};

/// Formats bytes as a `0x`-prefixed hex string.
pub struct Hex<'a>(pub &'a [u8]);

impl Debug for Hex<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&crate::hex::encode(self.0))
    }
}
