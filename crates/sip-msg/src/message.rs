//! The borrowed message view.

use std::fmt;

use crate::error::{ParseError, Result};
use crate::name_addr::CSeqView;
use crate::parser::first_line::parse_first_line;
use crate::parser::headers::split_headers;

/// Header names the transaction core looks at; everything else is `Other`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    Via,
    From,
    To,
    CallId,
    CSeq,
    Contact,
    Route,
    RecordRoute,
    MaxForwards,
    ContentLength,
    Other,
}

impl HeaderKind {
    /// Classify a header name, accepting compact forms
    pub fn from_name(name: &[u8]) -> Self {
        let eq = |n: &str| name.eq_ignore_ascii_case(n.as_bytes());
        if eq("via") || eq("v") {
            HeaderKind::Via
        } else if eq("from") || eq("f") {
            HeaderKind::From
        } else if eq("to") || eq("t") {
            HeaderKind::To
        } else if eq("call-id") || eq("i") {
            HeaderKind::CallId
        } else if eq("cseq") {
            HeaderKind::CSeq
        } else if eq("contact") || eq("m") {
            HeaderKind::Contact
        } else if eq("route") {
            HeaderKind::Route
        } else if eq("record-route") {
            HeaderKind::RecordRoute
        } else if eq("max-forwards") {
            HeaderKind::MaxForwards
        } else if eq("content-length") || eq("l") {
            HeaderKind::ContentLength
        } else {
            HeaderKind::Other
        }
    }

    fn label(self) -> &'static str {
        match self {
            HeaderKind::Via => "Via",
            HeaderKind::From => "From",
            HeaderKind::To => "To",
            HeaderKind::CallId => "Call-ID",
            HeaderKind::CSeq => "CSeq",
            HeaderKind::Contact => "Contact",
            HeaderKind::Route => "Route",
            HeaderKind::RecordRoute => "Record-Route",
            HeaderKind::MaxForwards => "Max-Forwards",
            HeaderKind::ContentLength => "Content-Length",
            HeaderKind::Other => "other",
        }
    }
}

impl fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Request line or status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstLine<'a> {
    Request { method: &'a [u8], uri: &'a [u8] },
    Reply { code: u16, reason: &'a [u8] },
}

/// One header instance. All slices point into the message buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderField<'a> {
    pub kind: HeaderKind,
    pub name: &'a [u8],
    pub body: &'a [u8],
    /// The complete header line(s), CRLF included
    pub raw: &'a [u8],
}

/// A parsed SIP message borrowing from its receive buffer
#[derive(Debug, Clone)]
pub struct SipMsg<'a> {
    pub buf: &'a [u8],
    pub first_line: FirstLine<'a>,
    pub headers: Vec<HeaderField<'a>>,
    pub body: &'a [u8],
}

impl<'a> SipMsg<'a> {
    /// Scan `buf` into first line, header lines and body.
    ///
    /// Only line structure is checked; header values are tokenized on demand
    /// by the helpers in this crate.
    pub fn scan(buf: &'a [u8]) -> Result<Self> {
        if buf.is_empty() {
            return Err(ParseError::Empty);
        }
        let nl = buf.iter().position(|&c| c == b'\n').unwrap_or(buf.len());
        let line = &buf[..nl];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let first_line = parse_first_line(line)?;

        let rest = if nl < buf.len() { &buf[nl + 1..] } else { &buf[buf.len()..] };
        let (raw_headers, body) = split_headers(rest)?;
        let headers = raw_headers
            .into_iter()
            .map(|h| HeaderField {
                kind: HeaderKind::from_name(h.name),
                name: h.name,
                body: h.body,
                raw: h.raw,
            })
            .collect();

        Ok(SipMsg { buf, first_line, headers, body })
    }

    pub fn is_request(&self) -> bool {
        matches!(self.first_line, FirstLine::Request { .. })
    }

    /// Status code for replies
    pub fn status(&self) -> Option<u16> {
        match self.first_line {
            FirstLine::Reply { code, .. } => Some(code),
            FirstLine::Request { .. } => None,
        }
    }

    /// Method for requests
    pub fn method(&self) -> Option<&'a [u8]> {
        match self.first_line {
            FirstLine::Request { method, .. } => Some(method),
            FirstLine::Reply { .. } => None,
        }
    }

    /// Request-URI for requests
    pub fn ruri(&self) -> Option<&'a [u8]> {
        match self.first_line {
            FirstLine::Request { uri, .. } => Some(uri),
            FirstLine::Reply { .. } => None,
        }
    }

    /// First instance of a header
    pub fn header(&self, kind: HeaderKind) -> Option<&HeaderField<'a>> {
        self.headers.iter().find(|h| h.kind == kind)
    }

    /// Every instance of a header, in message order
    pub fn headers_of(&self, kind: HeaderKind) -> impl Iterator<Item = &HeaderField<'a>> + '_ {
        self.headers.iter().filter(move |h| h.kind == kind)
    }

    /// First instance of a header, or an error naming it
    pub fn require(&self, kind: HeaderKind) -> Result<&HeaderField<'a>> {
        self.header(kind).ok_or_else(|| ParseError::InvalidValue {
            header: kind.label(),
            reason: "header missing".to_string(),
        })
    }

    pub fn to(&self) -> Option<&HeaderField<'a>> {
        self.header(HeaderKind::To)
    }

    pub fn from(&self) -> Option<&HeaderField<'a>> {
        self.header(HeaderKind::From)
    }

    pub fn call_id(&self) -> Option<&HeaderField<'a>> {
        self.header(HeaderKind::CallId)
    }

    pub fn contact(&self) -> Option<&HeaderField<'a>> {
        self.header(HeaderKind::Contact)
    }

    /// Parsed CSeq, if the header is present
    pub fn cseq(&self) -> Option<Result<CSeqView<'a>>> {
        self.header(HeaderKind::CSeq).map(|h| CSeqView::parse(h.body))
    }

    pub fn vias(&self) -> impl Iterator<Item = &HeaderField<'a>> + '_ {
        self.headers_of(HeaderKind::Via)
    }

    pub fn routes(&self) -> impl Iterator<Item = &HeaderField<'a>> + '_ {
        self.headers_of(HeaderKind::Route)
    }

    pub fn record_routes(&self) -> impl Iterator<Item = &HeaderField<'a>> + '_ {
        self.headers_of(HeaderKind::RecordRoute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVITE: &[u8] = b"INVITE sip:bob@b.example SIP/2.0\r\n\
v: SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bKabc\r\n\
Via: SIP/2.0/UDP 10.0.0.2:5060;branch=z9hG4bKdef\r\n\
f: <sip:alice@a.example>;tag=1928\r\n\
To: <sip:bob@b.example>\r\n\
i: a84b4c76e66710\r\n\
CSeq: 314159 INVITE\r\n\
Contact: <sip:alice@10.0.0.1>\r\n\
Content-Length: 4\r\n\
\r\n\
v=0\n";

    #[test]
    fn test_scan_request() {
        let msg = SipMsg::scan(INVITE).unwrap();
        assert!(msg.is_request());
        assert_eq!(msg.method(), Some(&b"INVITE"[..]));
        assert_eq!(msg.ruri(), Some(&b"sip:bob@b.example"[..]));
        assert_eq!(msg.vias().count(), 2);
        assert_eq!(msg.from().unwrap().name, b"f");
        assert_eq!(msg.call_id().unwrap().body, b"a84b4c76e66710");
        let cseq = msg.cseq().unwrap().unwrap();
        assert_eq!(cseq.number, 314159);
        assert_eq!(cseq.method, b"INVITE");
        assert_eq!(msg.body, b"v=0\n");
    }

    #[test]
    fn test_raw_lines_cover_crlf() {
        let msg = SipMsg::scan(INVITE).unwrap();
        assert_eq!(msg.to().unwrap().raw, b"To: <sip:bob@b.example>\r\n");
    }

    #[test]
    fn test_require_names_missing_header() {
        let msg = SipMsg::scan(b"SIP/2.0 200 OK\r\n\r\n").unwrap();
        let err = msg.require(HeaderKind::CSeq).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidValue { header: "CSeq", reason: "header missing".into() }
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(SipMsg::scan(b"").unwrap_err(), ParseError::Empty);
    }
}
