//! Reversible encoding of a source URL into a single path-safe token.
//!
//! The token is standard base64 of the URL's UTF-8 bytes with `+` and the `=`
//! padding both written as `-`, and `/` written as `_`. Because `-` stands for
//! two different characters, decoding tries every padding split the token
//! allows (most padding first) and keeps the first one that yields an
//! absolute URL.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use url::Url;

use crate::domain::errors::DecodeError;

const MAX_PADDING: usize = 2;

/// Encode a URL into a path-safe token. Total for any input string.
pub fn encode(url: &str) -> String {
    STANDARD
        .encode(url.as_bytes())
        .chars()
        .map(|c| match c {
            '+' | '=' => '-',
            '/' => '_',
            other => other,
        })
        .collect()
}

/// Decode a token back to the URL text it was produced from.
pub fn decode(token: &str) -> Result<String, DecodeError> {
    decode_url(token).map(|(text, _)| text)
}

/// Decode a token, returning both the original text and the parsed URL.
pub fn decode_url(token: &str) -> Result<(String, Url), DecodeError> {
    let mut best_error = DecodeError::InvalidBase64(format!("{token:?} has no valid padding"));

    for candidate in candidates(token) {
        match decode_candidate(&candidate) {
            Ok(decoded) => return Ok(decoded),
            Err(err) if err.depth() >= best_error.depth() => best_error = err,
            Err(_) => {}
        }
    }

    Err(best_error)
}

/// Check that `text` is an absolute URL with a scheme and a host.
pub fn parse_absolute(text: &str) -> Result<Url, DecodeError> {
    let url = Url::parse(text).map_err(|e| DecodeError::InvalidUrl(e.to_string()))?;
    if url.cannot_be_a_base() || url.host_str().is_none_or(str::is_empty) {
        return Err(DecodeError::InvalidUrl(format!("{text:?} has no host")));
    }
    Ok(url)
}

fn decode_candidate(candidate: &str) -> Result<(String, Url), DecodeError> {
    let bytes = STANDARD
        .decode(candidate)
        .map_err(|e| DecodeError::InvalidBase64(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
    let url = parse_absolute(&text)?;
    Ok((text, url))
}

/// Standard-alphabet spellings of `token`, one per plausible padding length.
fn candidates(token: &str) -> Vec<String> {
    let body = token.replace('_', "/");
    let trailing = body.bytes().rev().take_while(|b| *b == b'-').count();

    (0..=trailing.min(MAX_PADDING))
        .rev()
        .map(|padding| {
            let (data, pad) = body.split_at(body.len() - padding);
            let mut candidate = data.replace('-', "+");
            candidate.push_str(&"=".repeat(pad.len()));
            candidate
        })
        .filter(|candidate| candidate.len() % 4 == 0)
        .collect()
}
