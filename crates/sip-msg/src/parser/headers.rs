// message-header = field-name HCOLON field-value CRLF, with LWS folding

use nom::sequence::pair;

use super::{hcolon, is_wsp, token, trim_lws};
use crate::error::{ParseError, Result};

/// One header line as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHeader<'a> {
    pub name: &'a [u8],
    /// Value with surrounding whitespace and the line terminator removed
    pub body: &'a [u8],
    /// Whole line(s) including the terminating CRLF
    pub raw: &'a [u8],
}

fn line_end(input: &[u8], from: usize) -> usize {
    input[from..]
        .iter()
        .position(|&c| c == b'\n')
        .map_or(input.len(), |p| from + p + 1)
}

/// Split everything after the first line into header lines and the body.
///
/// A missing blank line is tolerated (the body is then empty); folded
/// continuation lines stay part of the header they continue.
pub fn split_headers(input: &[u8]) -> Result<(Vec<RawHeader<'_>>, &[u8])> {
    let mut headers = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];
        if rest.starts_with(b"\r\n") {
            return Ok((headers, &input[pos + 2..]));
        }
        if rest.starts_with(b"\n") {
            return Ok((headers, &input[pos + 1..]));
        }

        let mut end = line_end(input, pos);
        while end < input.len() && is_wsp(input[end]) {
            end = line_end(input, end);
        }

        let raw = &input[pos..end];
        let (value, (name, _)) = pair(token, hcolon)(raw)
            .map_err(|_| ParseError::Header(String::from_utf8_lossy(trim_lws(raw)).into_owned()))?;
        headers.push(RawHeader {
            name,
            body: trim_lws(value),
            raw,
        });
        pos = end;
    }

    Ok((headers, &input[input.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        let input = b"Call-ID: abc\r\nCSeq: 1 INVITE\r\n\r\nbody";
        let (headers, body) = split_headers(input).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].name, b"Call-ID");
        assert_eq!(headers[0].body, b"abc");
        assert_eq!(headers[0].raw, b"Call-ID: abc\r\n");
        assert_eq!(headers[1].body, b"1 INVITE");
        assert_eq!(body, b"body");
    }

    #[test]
    fn test_folded_line() {
        let input = b"Route: <sip:a;lr>,\r\n       <sip:b;lr>\r\nMax-Forwards: 70\r\n\r\n";
        let (headers, body) = split_headers(input).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].body, b"<sip:a;lr>,\r\n       <sip:b;lr>");
        assert!(headers[0].raw.ends_with(b"<sip:b;lr>\r\n"));
        assert!(body.is_empty());
    }

    #[test]
    fn test_missing_colon() {
        assert!(matches!(split_headers(b"Garbage\r\n\r\n"), Err(ParseError::Header(_))));
    }

    #[test]
    fn test_no_blank_line() {
        let (headers, body) = split_headers(b"To: <sip:x@y>\r\n").unwrap();
        assert_eq!(headers.len(), 1);
        assert!(body.is_empty());
    }
}
