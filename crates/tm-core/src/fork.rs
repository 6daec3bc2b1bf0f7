//! Per-transaction fork table.
//!
//! Index 0 is the request's own target. Additional branches follow in the
//! order they were appended. The last index of the table is reserved for a
//! "no reply" branch: a branch that is never sent anywhere but keeps the
//! transaction waiting for its final-response timer.

use bytes::Bytes;
use tracing::warn;

use crate::dset::{BranchSet, RequestTarget};
use crate::error::{Result, TmError};
use crate::transport::{Destination, Resolver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkEntry {
    /// `None` only for the no-reply branch
    pub dest: Option<Destination>,
    pub uri: Bytes,
    /// Whether `uri` differs from the request's original Request-URI
    pub owns_uri: bool,
}

#[derive(Debug)]
pub struct ForkTable {
    entries: Vec<ForkEntry>,
    no_reply: Option<ForkEntry>,
    capacity: usize,
}

impl ForkTable {
    pub fn new(capacity: usize) -> Self {
        ForkTable {
            entries: Vec::with_capacity(capacity),
            no_reply: None,
            capacity,
        }
    }

    /// Build the table for `target` and every branch in `branches`.
    ///
    /// URIs that do not resolve are skipped; a table without any resolvable
    /// entry is an error.
    pub fn from_branch_set(
        capacity: usize,
        target: &RequestTarget<'_>,
        branches: &BranchSet,
        resolver: &dyn Resolver,
    ) -> Result<Self> {
        let mut table = ForkTable::new(capacity);
        let candidates = std::iter::once((target.current(), target.new_uri.is_some()))
            .chain(branches.iter().map(|uri| (uri, uri != target.ruri)));

        for (uri, owns_uri) in candidates {
            match resolver.resolve(uri) {
                Some(dest) => {
                    table.add(dest, Bytes::copy_from_slice(uri), owns_uri)?;
                }
                None => warn!(uri = %String::from_utf8_lossy(uri), "branch target does not resolve"),
            }
        }

        if table.entries.is_empty() {
            return Err(TmError::NoDestination(
                String::from_utf8_lossy(target.current()).into_owned(),
            ));
        }
        Ok(table)
    }

    /// Put the request's own target at index 0, replacing any earlier one
    pub fn set_default(&mut self, dest: Destination, uri: Bytes, owns_uri: bool) -> Result<()> {
        let entry = ForkEntry { dest: Some(dest), uri, owns_uri };
        match self.entries.first_mut() {
            Some(first) => *first = entry,
            None if self.capacity > 1 => self.entries.push(entry),
            None => {
                return Err(TmError::CapacityExceeded { what: "fork table", limit: 0 });
            }
        }
        Ok(())
    }

    /// Append a branch; the reserved slot is never handed out here
    pub fn add(&mut self, dest: Destination, uri: Bytes, owns_uri: bool) -> Result<usize> {
        let limit = self.capacity.saturating_sub(1);
        if self.entries.len() >= limit {
            return Err(TmError::CapacityExceeded { what: "fork table", limit });
        }
        self.entries.push(ForkEntry { dest: Some(dest), uri, owns_uri });
        Ok(self.entries.len() - 1)
    }

    /// Occupy the reserved no-reply slot
    pub fn reserve_no_reply(&mut self, uri: Bytes) -> usize {
        self.no_reply = Some(ForkEntry { dest: None, uri, owns_uri: false });
        self.no_reply_index()
    }

    pub fn no_reply_index(&self) -> usize {
        self.capacity.saturating_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&ForkEntry> {
        if index == self.no_reply_index() {
            return self.no_reply.as_ref();
        }
        self.entries.get(index)
    }

    /// Branches in fork order, the no-reply branch last
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ForkEntry)> {
        let reserved = self.no_reply_index();
        self.entries
            .iter()
            .enumerate()
            .chain(self.no_reply.iter().map(move |e| (reserved, e)))
    }

    pub fn len(&self) -> usize {
        self.entries.len() + usize::from(self.no_reply.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.no_reply = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{LiteralResolver, Proto};

    fn dest(port: u16) -> Destination {
        Destination::new(([10, 0, 0, 1], port).into(), Proto::Udp)
    }

    #[test]
    fn test_reserved_slot_not_allocatable() {
        let mut table = ForkTable::new(3);
        assert_eq!(table.add(dest(1), Bytes::from_static(b"sip:a"), false).unwrap(), 0);
        assert_eq!(table.add(dest(2), Bytes::from_static(b"sip:b"), true).unwrap(), 1);
        assert!(matches!(
            table.add(dest(3), Bytes::from_static(b"sip:c"), true),
            Err(TmError::CapacityExceeded { limit: 2, .. })
        ));
        assert_eq!(table.reserve_no_reply(Bytes::from_static(b"sip:vm")), 2);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(2).unwrap().dest, None);
        let order: Vec<usize> = table.iter().map(|(i, _)| i).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_set_default_replaces_index_zero() {
        let mut table = ForkTable::new(3);
        table.set_default(dest(1), Bytes::from_static(b"sip:a"), false).unwrap();
        table.add(dest(2), Bytes::from_static(b"sip:b"), true).unwrap();
        table.set_default(dest(9), Bytes::from_static(b"sip:z"), true).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0).unwrap().uri, Bytes::from_static(b"sip:z"));
        assert!(ForkTable::new(1).set_default(dest(1), Bytes::new(), false).is_err());
    }

    #[test]
    fn test_from_branch_set() {
        let mut branches = BranchSet::new(4, 128, 4096);
        let target = RequestTarget::new(b"sip:bob@10.0.0.1");
        branches.append_branch(Some(b"sip:bob@10.0.0.2:5070"), &target).unwrap();
        branches.append_branch(Some(b"sip:bob@unresolvable.example"), &target).unwrap();

        let table = ForkTable::from_branch_set(4, &target, &branches, &LiteralResolver).unwrap();
        assert_eq!(table.len(), 2);
        let first = table.get(0).unwrap();
        assert_eq!(first.uri, Bytes::from_static(b"sip:bob@10.0.0.1"));
        assert!(!first.owns_uri);
        let second = table.get(1).unwrap();
        assert_eq!(second.dest.unwrap().addr.port(), 5070);
        assert!(second.owns_uri);
    }

    #[test]
    fn test_nothing_resolves() {
        let branches = BranchSet::new(4, 128, 4096);
        let target = RequestTarget::new(b"sip:bob@b.example");
        assert!(matches!(
            ForkTable::from_branch_set(4, &target, &branches, &LiteralResolver),
            Err(TmError::NoDestination(_))
        ));
    }
}
