//! To / From / Contact bodies and CSeq.

use std::borrow::Cow;

use crate::error::{ParseError, Result};
use crate::parser::trim_lws;
use crate::uri::{find_not_quoted, split_params};

/// `[display-name] <uri> *(;param)` or `uri *(;param)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAddr<'a> {
    /// Whole body as received, trimmed
    pub body: &'a [u8],
    pub display: Option<&'a [u8]>,
    /// URI without angle brackets
    pub uri: &'a [u8],
    /// Header parameters after the URI, leading `;` included
    pub params: &'a [u8],
    pub tag: Option<&'a [u8]>,
}

impl<'a> NameAddr<'a> {
    pub fn parse(body: &'a [u8]) -> Result<Self> {
        let body = trim_lws(body);
        if body.is_empty() {
            return Err(ParseError::InvalidValue {
                header: "name-addr",
                reason: "empty".to_string(),
            });
        }

        let (display, uri, params) = match find_not_quoted(body, b'<') {
            Some(lt) => {
                let gt = body[lt..]
                    .iter()
                    .position(|&c| c == b'>')
                    .map(|p| lt + p)
                    .ok_or(ParseError::Unterminated("angle bracket"))?;
                let display = trim_lws(&body[..lt]);
                let display = (!display.is_empty()).then_some(display);
                (display, &body[lt + 1..gt], &body[gt + 1..])
            }
            None => {
                // addr-spec form: parameters belong to the header, not the URI
                let semi = find_not_quoted(body, b';').unwrap_or(body.len());
                (None, &body[..semi], &body[semi..])
            }
        };

        let tag = split_params(params)
            .find(|(name, _)| name.eq_ignore_ascii_case(b"tag"))
            .and_then(|(_, value)| value);

        Ok(NameAddr { body, display, uri, params, tag })
    }

    /// The body with its `;tag=` parameter cut out.
    ///
    /// Borrowed when no splicing is needed.
    pub fn without_tag(&self) -> Cow<'a, [u8]> {
        let Some(tag) = self.tag else {
            return Cow::Borrowed(self.body);
        };
        // Offsets of the tag value inside body; the param starts at the `;`
        // preceding "tag".
        let base = self.body.as_ptr() as usize;
        let value_start = tag.as_ptr() as usize - base;
        let value_end = value_start + tag.len();
        let param_start = self.body[..value_start]
            .iter()
            .rposition(|&c| c == b';')
            .unwrap_or(value_start);

        let head = trim_lws(&self.body[..param_start]);
        let tail = &self.body[value_end..];
        if tail.is_empty() {
            Cow::Borrowed(head)
        } else {
            let mut spliced = Vec::with_capacity(head.len() + tail.len());
            spliced.extend_from_slice(head);
            spliced.extend_from_slice(tail);
            Cow::Owned(spliced)
        }
    }
}

/// `CSeq: <number> <method>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CSeqView<'a> {
    pub number: u32,
    pub method: &'a [u8],
    /// The digits as they appear on the wire
    pub number_raw: &'a [u8],
}

impl<'a> CSeqView<'a> {
    pub fn parse(body: &'a [u8]) -> Result<Self> {
        let body = trim_lws(body);
        let digits = body.iter().take_while(|c| c.is_ascii_digit()).count();
        let invalid = |reason: &str| ParseError::InvalidValue {
            header: "CSeq",
            reason: reason.to_string(),
        };
        if digits == 0 {
            return Err(invalid("missing sequence number"));
        }
        let number_raw = &body[..digits];
        let number = std::str::from_utf8(number_raw)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| invalid("sequence number out of range"))?;
        let method = trim_lws(&body[digits..]);
        if method.is_empty() {
            return Err(invalid("missing method"));
        }
        Ok(CSeqView { number, method, number_raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_addr_with_display() {
        let na = NameAddr::parse(b"\"Bob <B>\" <sip:bob@b.example;transport=tcp>;tag=a6c85cf").unwrap();
        assert_eq!(na.display, Some(&b"\"Bob <B>\""[..]));
        assert_eq!(na.uri, b"sip:bob@b.example;transport=tcp");
        assert_eq!(na.tag, Some(&b"a6c85cf"[..]));
    }

    #[test]
    fn test_addr_spec_params_are_header_params() {
        let na = NameAddr::parse(b"sip:alice@a.example;tag=88sja8x").unwrap();
        assert_eq!(na.uri, b"sip:alice@a.example");
        assert_eq!(na.tag, Some(&b"88sja8x"[..]));
        assert_eq!(na.display, None);
    }

    #[test]
    fn test_without_tag_trailing() {
        let na = NameAddr::parse(b"<sip:bob@b.example>;tag=xyz").unwrap();
        assert_eq!(&*na.without_tag(), b"<sip:bob@b.example>");
        assert!(matches!(na.without_tag(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_without_tag_in_the_middle() {
        let na = NameAddr::parse(b"<sip:bob@b.example>;tag=xyz;x-foo=1").unwrap();
        assert_eq!(&*na.without_tag(), b"<sip:bob@b.example>;x-foo=1");
    }

    #[test]
    fn test_without_tag_absent() {
        let na = NameAddr::parse(b" <sip:bob@b.example> ").unwrap();
        assert_eq!(&*na.without_tag(), b"<sip:bob@b.example>");
    }

    #[test]
    fn test_unterminated_bracket() {
        assert_eq!(
            NameAddr::parse(b"<sip:bob@b.example;tag=1").unwrap_err(),
            ParseError::Unterminated("angle bracket")
        );
    }

    #[test]
    fn test_cseq() {
        let cseq = CSeqView::parse(b" 42  BYE ").unwrap();
        assert_eq!(cseq.number, 42);
        assert_eq!(cseq.method, b"BYE");
        assert_eq!(cseq.number_raw, b"42");
        assert!(CSeqView::parse(b"INVITE").is_err());
        assert!(CSeqView::parse(b"12").is_err());
        assert!(CSeqView::parse(b"99999999999 INVITE").is_err());
    }
}
