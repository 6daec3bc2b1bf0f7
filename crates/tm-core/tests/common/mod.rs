//! Shared fixtures for the tm-core integration tests
#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use sipr_infra_common::{LoggingConfig, setup_logging};
use sipr_sip_msg::{NameAddr, SipMsg};
use sipr_tm_core::builder::via_branch;
use sipr_tm_core::{
    Destination, ForkTable, LiteralResolver, Proto, SocketInfo, TmConfig, TransactionManager,
    Transport, TransportError,
};

pub const INVITE: &[u8] = b"INVITE sip:bob@b.example SIP/2.0\r\n\
Via: SIP/2.0/UDP 10.0.0.5:5060;branch=z9hG4bKcaller1\r\n\
Max-Forwards: 70\r\n\
From: \"Alice\" <sip:alice@a.example>;tag=ft1\r\n\
To: <sip:bob@b.example>\r\n\
Call-ID: call-1@10.0.0.5\r\n\
CSeq: 1 INVITE\r\n\
Contact: <sip:alice@10.0.0.5>\r\n\
Content-Length: 0\r\n\
\r\n";

pub const OPTIONS: &[u8] = b"OPTIONS sip:bob@b.example SIP/2.0\r\n\
Via: SIP/2.0/UDP 10.0.0.5:5060;branch=z9hG4bKcaller2\r\n\
From: <sip:alice@a.example>;tag=ft2\r\n\
To: <sip:bob@b.example>\r\n\
Call-ID: call-2@10.0.0.5\r\n\
CSeq: 7 OPTIONS\r\n\
Content-Length: 0\r\n\
\r\n";

/// Remembers every buffer handed to it
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Destination, Vec<u8>)>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(Destination, Vec<u8>)> {
        self.sent.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn last(&self) -> (Destination, Vec<u8>) {
        self.sent.lock().last().cloned().expect("nothing was sent")
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl Transport for RecordingTransport {
    fn send(&self, dest: &Destination, buf: &[u8]) -> Result<(), TransportError> {
        self.sent.lock().push((*dest, buf.to_vec()));
        Ok(())
    }
}

/// Refuses every send
pub struct FailingTransport;

impl Transport for FailingTransport {
    fn send(&self, dest: &Destination, _buf: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::SendFailed { dest: *dest, reason: "network unreachable".to_string() })
    }
}

/// Install the shared subscriber once; later calls just get an error back
pub fn init_tracing() {
    let _ = setup_logging(&LoggingConfig::for_tests(tracing::Level::DEBUG));
}

pub fn local_sock() -> SocketInfo {
    SocketInfo::new("10.0.0.1:5060".parse().unwrap(), Proto::Udp)
}

pub fn udp(addr: &str) -> Destination {
    Destination::new(addr.parse().unwrap(), Proto::Udp)
}

pub fn caller() -> Destination {
    udp("10.0.0.5:5060")
}

pub fn manager_with(config: TmConfig, transport: Arc<dyn Transport>) -> TransactionManager {
    init_tracing();
    TransactionManager::new(config, local_sock(), transport, Arc::new(LiteralResolver)).unwrap()
}

pub fn manager(transport: Arc<dyn Transport>) -> TransactionManager {
    manager_with(TmConfig::default(), transport)
}

/// Fork table sending to each of `uris`, resolved literally
pub fn forks(config: &TmConfig, uris: &[&'static str]) -> ForkTable {
    let mut table = ForkTable::new(config.max_branches);
    for uri in uris {
        let dest = sipr_tm_core::Resolver::resolve(&LiteralResolver, uri.as_bytes()).unwrap();
        table.add(dest, Bytes::from_static(uri.as_bytes()), true).unwrap();
    }
    table
}

/// A reply to `request` echoing its Vias, From, To, Call-ID and CSeq
pub fn reply_to(request: &[u8], code: u16, reason: &str, to_tag: Option<&str>) -> Vec<u8> {
    let msg = SipMsg::scan(request).unwrap();
    let mut out = format!("SIP/2.0 {code} {reason}\r\n").into_bytes();
    for via in msg.vias() {
        out.extend_from_slice(via.raw);
    }
    out.extend_from_slice(msg.from().unwrap().raw);
    let to = msg.to().unwrap();
    match to_tag {
        Some(tag) if NameAddr::parse(to.body).unwrap().tag.is_none() => {
            out.extend_from_slice(b"To: ");
            out.extend_from_slice(to.body);
            out.extend_from_slice(format!(";tag={tag}\r\n").as_bytes());
        }
        _ => out.extend_from_slice(to.raw),
    }
    out.extend_from_slice(msg.call_id().unwrap().raw);
    out.extend_from_slice(msg.header(sipr_sip_msg::HeaderKind::CSeq).unwrap().raw);
    out.extend_from_slice(b"Content-Length: 0\r\n\r\n");
    out
}

/// Same reply with the CSeq method replaced, as a reply to our CANCEL
pub fn cancel_reply(request: &[u8], code: u16) -> Vec<u8> {
    let reply = text(&reply_to(request, code, "OK", None));
    let msg = SipMsg::scan(request).unwrap();
    let cseq = msg.cseq().unwrap().unwrap();
    reply
        .replace(
            &format!("CSeq: {} {}", cseq.number, text(cseq.method)),
            &format!("CSeq: {} CANCEL", cseq.number),
        )
        .into_bytes()
}

/// Branch parameter of the topmost Via
pub fn top_branch(buf: &[u8]) -> String {
    let msg = SipMsg::scan(buf).unwrap();
    text(via_branch(msg.vias().next().unwrap().body).unwrap())
}

pub fn text(b: &[u8]) -> String {
    String::from_utf8_lossy(b).into_owned()
}
