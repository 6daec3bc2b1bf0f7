//! Via header of locally built requests.

use sipr_sip_msg::parser::trim_lws;
use sipr_sip_msg::uri::{find_not_quoted, split_params, split_unquoted};

use crate::transport::SocketInfo;

/// `Via: SIP/2.0/<PROTO> <host>:<port>;branch=<branch>\r\n`
pub fn via_builder(sock: &SocketInfo, branch: &str) -> String {
    format!("Via: SIP/2.0/{} {};branch={}\r\n", sock.proto, sock.hostport(), branch)
}

/// Branch parameter of the topmost via in a Via header body
pub fn via_branch(body: &[u8]) -> Option<&[u8]> {
    let first = *split_unquoted(body, b',').first()?;
    let first = trim_lws(first);
    let params = &first[find_not_quoted(first, b';')?..];
    split_params(params)
        .find(|(name, _)| name.eq_ignore_ascii_case(b"branch"))
        .and_then(|(_, value)| value)
}
