//! Request-URI and next hop of in-dialog requests (RFC 3261 12.2.1.1).

use sipr_sip_msg::uri::get_raw_uri;

use super::{Dialog, RouteEntry};
use crate::arena::ShmStr;

/// Where the next in-dialog request goes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hooks {
    /// Request-URI, without display name or brackets
    pub request_uri: Option<ShmStr>,
    /// Where the request is physically sent
    pub next_hop: Option<ShmStr>,
    /// Index of the first route set entry printed in the Route header
    pub first_route: Option<usize>,
    /// Appended to the Route header after the route set (strict routing)
    pub last_route: Option<ShmStr>,
}

fn raw(uri: &ShmStr) -> ShmStr {
    uri.slice_ref(get_raw_uri(uri))
}

impl Hooks {
    pub fn compute(
        route_set: &[RouteEntry],
        remote_target: Option<&ShmStr>,
        remote_uri: &ShmStr,
    ) -> Hooks {
        let target = remote_target.unwrap_or(remote_uri);
        match route_set.first() {
            // loose router: the target stays in the Request-URI
            Some(first) if first.is_loose() => Hooks {
                request_uri: Some(raw(target)),
                next_hop: Some(raw(&first.uri)),
                first_route: Some(0),
                last_route: None,
            },
            // strict router: it takes the Request-URI, the target goes last
            Some(first) => Hooks {
                request_uri: Some(raw(&first.uri)),
                next_hop: Some(raw(&first.uri)),
                first_route: (route_set.len() > 1).then_some(1),
                last_route: remote_target.cloned(),
            },
            None => Hooks {
                request_uri: Some(raw(target)),
                next_hop: Some(raw(target)),
                first_route: None,
                last_route: None,
            },
        }
    }
}

impl Dialog {
    /// Recompute [`Dialog::hooks`]; needed after the route set or the
    /// remote target changed
    pub fn calculate_hooks(&mut self) {
        self.hooks = Hooks::compute(&self.route_set, self.remote_target.as_ref(), &self.remote_uri);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::SharedArena;

    fn route(text: &'static [u8]) -> RouteEntry {
        let tokens = sipr_sip_msg::parse_rr(text).unwrap();
        RouteEntry::dup(&tokens[0], &SharedArena::unbounded()).unwrap()
    }

    #[test]
    fn test_loose() {
        let set = vec![route(b"<sip:p1.example;lr>"), route(b"<sip:p2.example;lr>")];
        let target = ShmStr::from_static(b"sip:bob@10.0.0.2");
        let hooks = Hooks::compute(&set, Some(&target), &ShmStr::from_static(b"sip:bob@b.example"));

        assert_eq!(hooks.request_uri.unwrap(), b"sip:bob@10.0.0.2");
        assert_eq!(hooks.next_hop.unwrap(), b"sip:p1.example;lr");
        assert_eq!(hooks.first_route, Some(0));
        assert!(hooks.last_route.is_none());
    }

    #[test]
    fn test_strict() {
        let set = vec![route(b"<sip:p1.example>"), route(b"<sip:p2.example;lr>")];
        let target = ShmStr::from_static(b"sip:bob@10.0.0.2");
        let hooks = Hooks::compute(&set, Some(&target), &ShmStr::from_static(b"sip:bob@b.example"));

        assert_eq!(hooks.request_uri.unwrap(), b"sip:p1.example");
        assert_eq!(hooks.next_hop.unwrap(), b"sip:p1.example");
        assert_eq!(hooks.first_route, Some(1));
        assert_eq!(hooks.last_route.unwrap(), b"sip:bob@10.0.0.2");
    }

    #[test]
    fn test_no_routes_falls_back_to_remote_uri() {
        let hooks = Hooks::compute(&[], None, &ShmStr::from_static(b"\"Bob\" <sip:bob@b.example>"));
        assert_eq!(hooks.request_uri.unwrap(), b"sip:bob@b.example");
        assert_eq!(hooks.next_hop.unwrap(), b"sip:bob@b.example");
        assert_eq!(hooks.first_route, None);
    }
}
