//! URI helpers that work on raw bytes.

use crate::parser::trim_lws;

/// Position of the first `c` outside a double-quoted string.
///
/// Backslash escapes inside quotes are honoured.
pub fn find_not_quoted(s: &[u8], c: u8) -> Option<usize> {
    let mut quoted = false;
    let mut escaped = false;
    for (i, &b) in s.iter().enumerate() {
        if quoted {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                quoted = false;
            }
            continue;
        }
        if b == b'"' {
            quoted = true;
        } else if b == c {
            return Some(i);
        }
    }
    None
}

/// Strip a `name-addr` down to its URI.
///
/// Only values ending in `>` are touched: everything up to the first unquoted
/// `<` and the closing `>` are dropped. Anything else comes back unchanged.
pub fn get_raw_uri(s: &[u8]) -> &[u8] {
    if s.last() != Some(&b'>') {
        return s;
    }
    match find_not_quoted(s, b'<') {
        Some(lt) => &s[lt + 1..s.len() - 1],
        None => {
            tracing::warn!(value = %String::from_utf8_lossy(s), "no '<' found in name-addr");
            s
        }
    }
}

/// Split `s` on `sep` occurring outside quotes and angle brackets
pub fn split_unquoted(s: &[u8], sep: u8) -> Vec<&[u8]> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, &b) in s.iter().enumerate() {
        if quoted {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                quoted = false;
            }
            continue;
        }
        match b {
            b'"' => quoted = true,
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            _ if b == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Iterate `;name[=value]` parameters. Empty segments are skipped.
pub fn split_params(params: &[u8]) -> impl Iterator<Item = (&[u8], Option<&[u8]>)> {
    split_unquoted(params, b';').into_iter().filter_map(|p| {
        let p = trim_lws(p);
        if p.is_empty() {
            return None;
        }
        Some(match p.iter().position(|&c| c == b'=') {
            Some(eq) => (trim_lws(&p[..eq]), Some(trim_lws(&p[eq + 1..]))),
            None => (p, None),
        })
    })
}

/// The `;param` section of a URI (after the host part, before `?headers`)
pub fn uri_params(uri: &[u8]) -> &[u8] {
    let uri = get_raw_uri(trim_lws(uri));
    let end = uri.iter().position(|&c| c == b'?').unwrap_or(uri.len());
    let uri = &uri[..end];
    let host_start = uri.iter().position(|&c| c == b'@').map_or(0, |p| p + 1);
    match uri[host_start..].iter().position(|&c| c == b';') {
        Some(p) => &uri[host_start + p..],
        None => &uri[uri.len()..],
    }
}

/// Value of URI parameter `name`; `Some(b"")` for a flag parameter
pub fn uri_param<'a>(uri: &'a [u8], name: &str) -> Option<&'a [u8]> {
    split_params(uri_params(uri))
        .find(|(n, _)| n.eq_ignore_ascii_case(name.as_bytes()))
        .map(|(n, v)| v.unwrap_or(&n[n.len()..]))
}

/// Whether the URI carries the loose-routing `lr` parameter
pub fn has_lr_param(uri: &[u8]) -> bool {
    uri_param(uri, "lr").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_not_quoted() {
        assert_eq!(find_not_quoted(b"\"a<b\" <sip:x>", b'<'), Some(6));
        assert_eq!(find_not_quoted(b"\"a\\\"<\" <sip:x>", b'<'), Some(7));
        assert_eq!(find_not_quoted(b"sip:x", b'<'), None);
    }

    #[test]
    fn test_get_raw_uri() {
        assert_eq!(get_raw_uri(b"<sip:p1.example;lr>"), b"sip:p1.example;lr");
        assert_eq!(get_raw_uri(b"\"Bob\" <sip:bob@b.example>"), b"sip:bob@b.example");
        assert_eq!(get_raw_uri(b"sip:bob@b.example"), b"sip:bob@b.example");
        assert_eq!(get_raw_uri(b"<sip:p1>;lr"), b"<sip:p1>;lr");
    }

    #[test]
    fn test_lr_detection() {
        assert!(has_lr_param(b"sip:p1.example;lr"));
        assert!(has_lr_param(b"sip:p1.example;transport=udp;lr=on"));
        assert!(has_lr_param(b"<sip:p1.example;LR>"));
        assert!(!has_lr_param(b"sip:p1.example"));
        assert!(!has_lr_param(b"sip:lr;x@p1.example"));
        assert!(!has_lr_param(b"sip:p1.example?lr=1"));
    }

    #[test]
    fn test_uri_param_value() {
        assert_eq!(uri_param(b"sip:h;transport=tcp;ttl=3", "ttl"), Some(&b"3"[..]));
        assert_eq!(uri_param(b"sip:h;lr", "lr"), Some(&b""[..]));
        assert_eq!(uri_param(b"sip:h", "lr"), None);
    }

    #[test]
    fn test_split_unquoted() {
        let parts = split_unquoted(b"<sip:a,b>, \"x,y\" <sip:c>", b',');
        assert_eq!(parts, vec![&b"<sip:a,b>"[..], &b" \"x,y\" <sip:c>"[..]]);
    }
}
