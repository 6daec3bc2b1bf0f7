//! Route / Record-Route bodies.
//!
//! ```text
//! Route        =  "Route" HCOLON route-param *(COMMA route-param)
//! route-param  =  name-addr *( SEMI rr-param )
//! ```

use crate::error::{ParseError, Result};
use crate::parser::trim_lws;
use crate::uri::{find_not_quoted, split_unquoted};

/// One route entry, borrowed from the header body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteToken<'a> {
    /// The entry as written: display name, `<uri>` and rr-params
    pub text: &'a [u8],
    /// URI inside the angle brackets
    pub uri: &'a [u8],
}

/// Split a Route or Record-Route body into its entries, in order.
///
/// Bare addr-specs are accepted for robustness; their URI ends at the first
/// unquoted `;`.
pub fn parse_rr(body: &[u8]) -> Result<Vec<RouteToken<'_>>> {
    let body = trim_lws(body);
    if body.is_empty() {
        return Err(ParseError::Empty);
    }

    split_unquoted(body, b',')
        .into_iter()
        .map(|part| {
            let text = trim_lws(part);
            if text.is_empty() {
                return Err(ParseError::InvalidValue {
                    header: "Route",
                    reason: "empty entry".to_string(),
                });
            }
            let uri = match find_not_quoted(text, b'<') {
                Some(lt) => {
                    let gt = text[lt..]
                        .iter()
                        .position(|&c| c == b'>')
                        .ok_or(ParseError::Unterminated("angle bracket"))?;
                    &text[lt + 1..lt + gt]
                }
                None => &text[..find_not_quoted(text, b';').unwrap_or(text.len())],
            };
            Ok(RouteToken { text, uri })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rr_multiple() {
        let tokens = parse_rr(b"<sip:p1.example;lr>, \"Edge\" <sip:p2.example;lr>;x=1").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, b"<sip:p1.example;lr>");
        assert_eq!(tokens[0].uri, b"sip:p1.example;lr");
        assert_eq!(tokens[1].text, b"\"Edge\" <sip:p2.example;lr>;x=1");
        assert_eq!(tokens[1].uri, b"sip:p2.example;lr");
    }

    #[test]
    fn test_parse_rr_folded() {
        let tokens = parse_rr(b"<sip:a;lr>,\r\n       <sip:b;lr>").unwrap();
        assert_eq!(tokens[1].text, b"<sip:b;lr>");
    }

    #[test]
    fn test_parse_rr_errors() {
        assert_eq!(parse_rr(b"  ").unwrap_err(), ParseError::Empty);
        assert!(parse_rr(b"<sip:a;lr>,,<sip:b>").is_err());
        assert_eq!(parse_rr(b"<sip:a;lr").unwrap_err(), ParseError::Unterminated("angle bracket"));
    }

    #[test]
    fn test_parse_rr_addr_spec() {
        let tokens = parse_rr(b"sip:p1.example;lr").unwrap();
        assert_eq!(tokens[0].uri, b"sip:p1.example");
    }
}
