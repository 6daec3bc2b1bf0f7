//! The destination set: extra branches appended while a request is being
//! routed, and the Contact list printed from them for redirects.

use bytes::{BufMut, Bytes};
use tracing::{debug, warn};

use crate::arena::ScratchArena;
use crate::error::{Result, TmError};

const CONTACT_PREFIX: &[u8] = b"Contact: ";
const CONTACT_DELIM: &[u8] = b", ";
const CONTACT_TERMINATOR: &[u8] = b"\r\n ";

/// The URI a request is currently aimed at
#[derive(Debug, Clone, Copy)]
pub struct RequestTarget<'a> {
    /// Request-URI as received
    pub ruri: &'a [u8],
    /// Request-URI rewritten during routing, if any
    pub new_uri: Option<&'a [u8]>,
}

impl<'a> RequestTarget<'a> {
    pub fn new(ruri: &'a [u8]) -> Self {
        RequestTarget { ruri, new_uri: None }
    }

    pub fn rewritten(mut self, uri: &'a [u8]) -> Self {
        self.new_uri = Some(uri);
        self
    }

    pub fn current(&self) -> &'a [u8] {
        self.new_uri.unwrap_or(self.ruri)
    }
}

/// Additional branches of the request being processed.
///
/// Holds at most `max_branches - 1` URIs; the remaining fork slot belongs to
/// the request's own target.
#[derive(Debug)]
pub struct BranchSet {
    branches: Vec<Vec<u8>>,
    cursor: usize,
    max_branches: usize,
    max_uri_size: usize,
    max_dset_len: usize,
}

impl BranchSet {
    pub fn new(max_branches: usize, max_uri_size: usize, max_dset_len: usize) -> Self {
        BranchSet {
            branches: Vec::with_capacity(max_branches.saturating_sub(1)),
            cursor: 0,
            max_branches,
            max_uri_size,
            max_dset_len,
        }
    }

    /// Rewind [`BranchSet::next_branch`] to the first branch
    pub fn init_iterator(&mut self) {
        self.cursor = 0;
    }

    pub fn next_branch(&mut self) -> Option<&[u8]> {
        let branch = self.branches.get(self.cursor)?;
        self.cursor += 1;
        Some(branch)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.branches.iter().map(Vec::as_slice)
    }

    /// Add a branch; without `uri` the request's current target is used.
    ///
    /// Nothing changes when the set is full or the URI does not fit.
    pub fn append_branch(&mut self, uri: Option<&[u8]>, target: &RequestTarget<'_>) -> Result<()> {
        let limit = self.max_branches.saturating_sub(1);
        if self.branches.len() >= limit {
            warn!(limit, "branch set full");
            return Err(TmError::CapacityExceeded { what: "branch set", limit });
        }
        let uri = uri.unwrap_or_else(|| target.current());
        let max = self.max_uri_size.saturating_sub(1);
        if uri.len() > max {
            warn!(len = uri.len(), max, "branch uri too long");
            return Err(TmError::UriTooLong { len: uri.len(), max });
        }
        self.branches.push(uri.to_vec());
        debug!(count = self.branches.len(), "branch appended");
        Ok(())
    }

    pub fn clear(&mut self) {
        self.branches.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Length of the Contact header `create_dset` would print
    pub fn dset_len(&self, primary: Option<&[u8]>) -> Option<usize> {
        let count = self.branches.len() + usize::from(primary.is_some());
        if count == 0 {
            return None;
        }
        let uris: usize =
            primary.map_or(0, <[u8]>::len) + self.branches.iter().map(Vec::len).sum::<usize>();
        Some(CONTACT_PREFIX.len() + uris + CONTACT_DELIM.len() * (count - 1) + CONTACT_TERMINATOR.len())
    }

    /// Print `Contact: <primary>, <branch>, ...\r\n `.
    ///
    /// `None` when there is nothing to print, when the text would exceed the
    /// configured capacity, or when the scratch arena is exhausted.
    pub fn create_dset(&self, primary: Option<&[u8]>, scratch: &mut ScratchArena) -> Option<Bytes> {
        let len = self.dset_len(primary)?;
        if len > self.max_dset_len {
            warn!(len, max = self.max_dset_len, "contact set too long");
            return None;
        }
        let mut buf = match scratch.alloc(len) {
            Ok(buf) => buf,
            Err(e) => {
                warn!(error = %e, "no scratch memory for contact set");
                return None;
            }
        };

        buf.put_slice(CONTACT_PREFIX);
        let mut first = true;
        for uri in primary.into_iter().chain(self.iter()) {
            if !first {
                buf.put_slice(CONTACT_DELIM);
            }
            buf.put_slice(uri);
            first = false;
        }
        buf.put_slice(CONTACT_TERMINATOR);

        debug_assert_eq!(buf.len(), len);
        Some(buf.freeze())
    }
}
