use sipr_sip_msg::SipMsg;

use super::{MessageBuilder, SIP_VERSION};
use crate::arena::ShmStr;
use crate::error::{Result, TmError};

impl MessageBuilder {
    /// Copy of `request` for one fork branch: new Request-URI, our `via` on
    /// top, everything after the first line unchanged
    pub fn build_forward(&self, request: &[u8], uri: &[u8], via: &str) -> Result<ShmStr> {
        let msg = SipMsg::scan(request)?;
        let method = msg
            .method()
            .ok_or_else(|| TmError::ProtocolViolation("cannot forward a reply".to_string()))?;
        let rest = match request.iter().position(|&c| c == b'\n') {
            Some(nl) => &request[nl + 1..],
            None => &request[request.len()..],
        };

        let len = method.len() + 1 + uri.len() + SIP_VERSION.len() + via.len() + rest.len();
        let mut buf = self.arena.alloc(len)?;
        buf.put(method)?;
        buf.put(b" ")?;
        buf.put(uri)?;
        buf.put(SIP_VERSION)?;
        buf.put(via.as_bytes())?;
        buf.put(rest)?;
        buf.finish()
    }
}
