use serde::de::DeserializeOwned;
use std::io::{self, Read};

use super::InputFormat;

/// Deserialise piped stdin as JSON or YAML.
/// Returns None when stdin is a terminal or nothing was piped.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    if text.trim().is_empty() {
        return Ok(None);
    }

    InputFormat::sniff(&text).parse(&text, "stdin").map(Some)
}
