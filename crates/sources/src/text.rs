//! Text files exported by other tools.

use std::borrow::Cow;
use std::io;
use std::path::Path;

use tracing::warn;

/// Read a file as text. Bytes that are not UTF-8 (Latin-1 exports, mostly)
/// become U+FFFD instead of failing the read.
pub fn read_lossy(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8_lossy(&bytes) {
        Cow::Borrowed(text) => text.to_string(),
        Cow::Owned(text) => {
            warn!(path = %path.display(), "file is not valid UTF-8, invalid bytes replaced");
            text
        }
    })
}
