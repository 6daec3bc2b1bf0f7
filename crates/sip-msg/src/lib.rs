//! Borrowed views over SIP messages.
//!
//! The transaction core never owns the messages it inspects. A full SIP parser
//! (outside this workspace) hands it a [`SipMsg`] whose every slice points into
//! the receive buffer; anything that must outlive that buffer is deep-copied by
//! the consumer. The same view type is produced by [`SipMsg::scan`], a header
//! line scanner used to re-read buffers the core built itself (for example the
//! Route headers of a forwarded request when a CANCEL is generated).
//!
//! Besides the message view the crate carries the small tokenizers the
//! transaction and dialog code depend on:
//!
//! - [`NameAddr`]: display name, URI and tag of a To/From/Contact body
//! - [`CSeqView`]: sequence number and method
//! - [`rr::parse_rr`]: splits Route / Record-Route bodies into entries
//! - [`uri`]: quote-aware search, `<...>` stripping and `lr` detection
//!
//! # Example
//!
//! ```
//! use sipr_sip_msg::{HeaderKind, NameAddr, SipMsg};
//!
//! let raw = b"SIP/2.0 200 OK\r\n\
//!             To: <sip:bob@b.example>;tag=9fx\r\n\
//!             Record-Route: <sip:p1.example;lr>, <sip:p2.example;lr>\r\n\
//!             \r\n";
//! let msg = SipMsg::scan(raw).unwrap();
//! assert_eq!(msg.status(), Some(200));
//!
//! let to = NameAddr::parse(msg.header(HeaderKind::To).unwrap().body).unwrap();
//! assert_eq!(to.tag, Some(&b"9fx"[..]));
//! assert_eq!(msg.record_routes().count(), 1);
//! ```

pub mod error;
pub mod message;
pub mod name_addr;
pub mod parser;
pub mod rr;
pub mod uri;

pub use error::{ParseError, Result};
pub use message::{FirstLine, HeaderField, HeaderKind, SipMsg};
pub use name_addr::{CSeqView, NameAddr};
pub use rr::{RouteToken, parse_rr};
