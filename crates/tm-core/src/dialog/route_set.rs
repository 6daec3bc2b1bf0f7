//! Route sets: deep copies of Route / Record-Route entries.

use sipr_sip_msg::uri::has_lr_param;
use sipr_sip_msg::{HeaderKind, RouteToken, SipMsg, parse_rr};

use super::Dialog;
use crate::arena::{SharedArena, ShmBuf, ShmStr};
use crate::builder::{CRLF, ROUTE_PREFIX, ROUTE_SEPARATOR};
use crate::error::Result;

/// One hop, owned independently of the message it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Name-addr with rr-params, as printed in Route headers
    pub text: ShmStr,
    /// URI inside the brackets; shares `text`'s allocation
    pub uri: ShmStr,
}

impl RouteEntry {
    pub fn dup(token: &RouteToken<'_>, arena: &SharedArena) -> Result<Self> {
        let text = arena.dup(token.text)?;
        let start = token.uri.as_ptr() as usize - token.text.as_ptr() as usize;
        let uri = text.slice(start..start + token.uri.len());
        Ok(RouteEntry { text, uri })
    }

    /// Whether the hop is a loose router
    pub fn is_loose(&self) -> bool {
        has_lr_param(&self.uri)
    }
}

/// Which headers a route set is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    RecordRoute,
    Route,
}

/// Order of the resulting set relative to the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOrder {
    Normal,
    /// Used by the UAC, which sees Record-Route in the callee's order
    Reverse,
}

/// Copy every entry of every `source` header of `msg`.
///
/// Either the whole set is returned or nothing is kept.
pub fn get_route_set(
    msg: &SipMsg<'_>,
    source: RouteSource,
    order: RouteOrder,
    arena: &SharedArena,
) -> Result<Vec<RouteEntry>> {
    let kind = match source {
        RouteSource::RecordRoute => HeaderKind::RecordRoute,
        RouteSource::Route => HeaderKind::Route,
    };

    let mut set = Vec::new();
    for header in msg.headers_of(kind) {
        for token in parse_rr(header.body)? {
            set.push(RouteEntry::dup(&token, arena)?);
        }
    }
    if order == RouteOrder::Reverse {
        set.reverse();
    }
    Ok(set)
}

impl Dialog {
    fn printed_routes(&self) -> &[RouteEntry] {
        match self.hooks.first_route {
            Some(first) => self.route_set.get(first..).unwrap_or(&[]),
            None => &[],
        }
    }

    /// Length of the Route header [`Dialog::print_routeset`] writes; 0 when
    /// requests in this dialog carry no Route header
    pub fn calculate_routeset_length(&self) -> usize {
        let routes = self.printed_routes();
        let mut hops = routes.len();
        let mut len: usize = routes.iter().map(|r| r.text.len()).sum();
        if let Some(last) = &self.hooks.last_route {
            hops += 1;
            len += last.len() + 2;
        }
        if hops == 0 {
            return 0;
        }
        ROUTE_PREFIX.len() + len + ROUTE_SEPARATOR.len() * (hops - 1) + CRLF.len()
    }

    /// Write `Route: <hop>,\r\n       <hop>...\r\n`, the remote target
    /// closing the list when the next hop is a strict router
    pub fn print_routeset(&self, buf: &mut ShmBuf) -> Result<()> {
        let routes = self.printed_routes();
        if routes.is_empty() && self.hooks.last_route.is_none() {
            return Ok(());
        }
        buf.put(ROUTE_PREFIX)?;
        for (i, route) in routes.iter().enumerate() {
            if i > 0 {
                buf.put(ROUTE_SEPARATOR)?;
            }
            buf.put(&route.text)?;
        }
        if let Some(last) = &self.hooks.last_route {
            if !routes.is_empty() {
                buf.put(ROUTE_SEPARATOR)?;
            }
            buf.put(b"<")?;
            buf.put(last)?;
            buf.put(b">")?;
        }
        buf.put(CRLF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TmError;

    const REPLY: &[u8] = b"SIP/2.0 200 OK\r\n\
Record-Route: <sip:p3.example;lr>\r\n\
Record-Route: <sip:p2.example;lr>, \"Edge\" <sip:p1.example;lr>;foo=bar\r\n\
\r\n";

    #[test]
    fn test_normal_and_reverse() {
        let msg = SipMsg::scan(REPLY).unwrap();
        let arena = SharedArena::unbounded();

        let normal = get_route_set(&msg, RouteSource::RecordRoute, RouteOrder::Normal, &arena).unwrap();
        let uris: Vec<&[u8]> = normal.iter().map(|r| r.uri.as_bytes()).collect();
        assert_eq!(uris, vec![&b"sip:p3.example;lr"[..], b"sip:p2.example;lr", b"sip:p1.example;lr"]);
        assert_eq!(normal[2].text, b"\"Edge\" <sip:p1.example;lr>;foo=bar");

        let reverse = get_route_set(&msg, RouteSource::RecordRoute, RouteOrder::Reverse, &arena).unwrap();
        assert_eq!(reverse[0].uri, b"sip:p1.example;lr");
        assert!(reverse.iter().all(RouteEntry::is_loose));
    }

    #[test]
    fn test_entries_outlive_message() {
        let arena = SharedArena::unbounded();
        let set = {
            let owned = REPLY.to_vec();
            let msg = SipMsg::scan(&owned).unwrap();
            get_route_set(&msg, RouteSource::RecordRoute, RouteOrder::Normal, &arena).unwrap()
        };
        assert_eq!(set[1].text, b"<sip:p2.example;lr>");
    }

    #[test]
    fn test_failure_keeps_nothing() {
        let msg = SipMsg::scan(REPLY).unwrap();
        let arena = SharedArena::new(30);
        let err = get_route_set(&msg, RouteSource::RecordRoute, RouteOrder::Normal, &arena).unwrap_err();
        assert!(matches!(err, TmError::AllocationFailure { .. }));
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_route_source() {
        let msg = SipMsg::scan(b"BYE sip:b@b.example SIP/2.0\r\nRoute: <sip:r1;lr>\r\n\r\n").unwrap();
        let arena = SharedArena::unbounded();
        assert_eq!(get_route_set(&msg, RouteSource::Route, RouteOrder::Normal, &arena).unwrap().len(), 1);
        assert!(get_route_set(&msg, RouteSource::RecordRoute, RouteOrder::Normal, &arena).unwrap().is_empty());
    }
}
