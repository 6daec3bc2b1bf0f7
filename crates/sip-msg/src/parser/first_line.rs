// Request-Line  =  Method SP Request-URI SP SIP-Version CRLF
// Status-Line   =  SIP-Version SP Status-Code SP Reason-Phrase CRLF

use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_till1, take_while_m_n};
use nom::combinator::{all_consuming, map, map_res, opt, rest};
use nom::sequence::{preceded, tuple};

use super::{ParseResult, token};
use crate::error::{ParseError, Result};
use crate::message::FirstLine;

fn sip_version(input: &[u8]) -> ParseResult<&[u8]> {
    tag_no_case(b"SIP/2.0")(input)
}

fn status_code(input: &[u8]) -> ParseResult<u16> {
    map_res(take_while_m_n(3, 3, |c: u8| c.is_ascii_digit()), |d: &[u8]| {
        // three ASCII digits always fit
        std::str::from_utf8(d)
            .map_err(|_| ())
            .and_then(|s| s.parse::<u16>().map_err(|_| ()))
    })(input)
}

fn request_line(input: &[u8]) -> ParseResult<FirstLine<'_>> {
    map(
        tuple((token, tag(b" "), take_till1(|c| c == b' '), tag(b" "), sip_version)),
        |(method, _, uri, _, _)| FirstLine::Request { method, uri },
    )(input)
}

fn status_line(input: &[u8]) -> ParseResult<FirstLine<'_>> {
    map(
        tuple((sip_version, tag(b" "), status_code, opt(preceded(tag(b" "), rest)))),
        |(_, _, code, reason)| FirstLine::Reply {
            code,
            reason: reason.unwrap_or(b""),
        },
    )(input)
}

/// Parse a first line with its line terminator already removed
pub fn parse_first_line(line: &[u8]) -> Result<FirstLine<'_>> {
    all_consuming(alt((status_line, request_line)))(line)
        .map(|(_, first)| first)
        .map_err(|_| ParseError::FirstLine(String::from_utf8_lossy(line).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_line() {
        let first = parse_first_line(b"INVITE sip:bob@b.example SIP/2.0").unwrap();
        assert_eq!(
            first,
            FirstLine::Request { method: b"INVITE", uri: b"sip:bob@b.example" }
        );
    }

    #[test]
    fn test_status_line() {
        let first = parse_first_line(b"SIP/2.0 486 Busy Here").unwrap();
        assert_eq!(first, FirstLine::Reply { code: 486, reason: b"Busy Here" });
    }

    #[test]
    fn test_status_line_without_reason() {
        let first = parse_first_line(b"SIP/2.0 100").unwrap();
        assert_eq!(first, FirstLine::Reply { code: 100, reason: b"" });
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_first_line(b"HELLO").is_err());
        assert!(parse_first_line(b"SIP/2.0 20 OK").is_err());
    }
}
