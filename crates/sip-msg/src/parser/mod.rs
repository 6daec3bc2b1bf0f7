//! nom building blocks for the line scanner.

pub mod first_line;
pub mod headers;

use nom::IResult;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::combinator::recognize;
use nom::sequence::tuple;

// Type alias for parser result
pub type ParseResult<'a, O> = IResult<&'a [u8], O>;

pub(crate) fn is_wsp(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

// token = 1*(alphanum / "-" / "." / "!" / "%" / "*" / "_" / "+" / "`" / "'" / "~")
pub(crate) fn is_token_char(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, b'-' | b'.' | b'!' | b'%' | b'*' | b'_' | b'+' | b'`' | b'\'' | b'~')
}

pub fn token(input: &[u8]) -> ParseResult<&[u8]> {
    take_while1(is_token_char)(input)
}

pub fn hcolon(input: &[u8]) -> ParseResult<&[u8]> {
    // HCOLON = *( SP / HTAB ) ":" SWS
    recognize(tuple((take_while(is_wsp), tag(b":"), take_while(is_wsp))))(input)
}

/// Trim leading and trailing linear white space, including folded CRLFs
pub fn trim_lws(s: &[u8]) -> &[u8] {
    let is_lws = |c: &u8| matches!(*c, b' ' | b'\t' | b'\r' | b'\n');
    let start = s.iter().position(|c| !is_lws(c)).unwrap_or(s.len());
    let end = s.iter().rposition(|c| !is_lws(c)).map_or(start, |p| p + 1);
    &s[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hcolon_variants() {
        assert_eq!(hcolon(b": value").unwrap(), (&b"value"[..], &b": "[..]));
        assert_eq!(hcolon(b" \t:value").unwrap().0, b"value");
        assert!(hcolon(b"value").is_err());
    }

    #[test]
    fn test_trim_lws() {
        assert_eq!(trim_lws(b"  a b \r\n"), b"a b");
        assert_eq!(trim_lws(b"\r\n "), b"");
        assert_eq!(trim_lws(b""), b"");
    }
}
