use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Error, Result};

/// Decodes a contents-API payload. GitHub wraps base64 bodies at 60
/// columns, so whitespace is stripped before decoding. Any encoding other
/// than base64 is returned unchanged.
pub fn decode_file_content(content: &str, encoding: &str) -> Result<String> {
    if !encoding.eq_ignore_ascii_case("base64") {
        return Ok(content.to_string());
    }

    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::ParseError(format!("Invalid base64 file content: {}", e)))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
