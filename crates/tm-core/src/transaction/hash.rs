//! The transaction table.
//!
//! Buckets are locked individually; a bucket lock is never held while a cell
//! lock or a timer list lock is taken.

use std::hash::{DefaultHasher, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;
use sipr_sip_msg::parser::trim_lws;

use super::cell::{Cell, CellId};
use crate::builder::branch::{BranchKey, parse_branch};

#[derive(Default)]
struct Bucket {
    cells: Vec<Arc<Cell>>,
    next_label: u32,
}

pub struct HashTable {
    buckets: Vec<Mutex<Bucket>>,
}

impl HashTable {
    pub fn new(size: usize) -> Self {
        HashTable {
            buckets: (0..size.max(1)).map(|_| Mutex::new(Bucket::default())).collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket of the transaction with this Call-ID and CSeq number
    pub fn hash(&self, call_id: &[u8], cseq_number: &[u8]) -> u32 {
        let mut hasher = DefaultHasher::new();
        hasher.write(trim_lws(call_id));
        hasher.write(trim_lws(cseq_number));
        (hasher.finish() % self.buckets.len() as u64) as u32
    }

    /// Next free label in bucket `hash_index`
    pub fn next_id(&self, hash_index: u32) -> CellId {
        let mut bucket = self.buckets[hash_index as usize % self.buckets.len()].lock();
        let label = bucket.next_label;
        bucket.next_label = bucket.next_label.wrapping_add(1);
        CellId { hash_index, label }
    }

    fn bucket(&self, hash_index: u32) -> Option<&Mutex<Bucket>> {
        self.buckets.get(hash_index as usize)
    }

    pub fn insert(&self, cell: Arc<Cell>) {
        if let Some(bucket) = self.bucket(cell.id.hash_index) {
            bucket.lock().cells.push(cell);
        }
    }

    /// Take `cell` out of the table; `false` if it was not there
    pub fn remove(&self, cell: &Cell) -> bool {
        let Some(bucket) = self.bucket(cell.id.hash_index) else {
            return false;
        };
        let mut bucket = bucket.lock();
        match bucket.cells.iter().position(|c| std::ptr::eq(c.as_ref(), cell)) {
            Some(pos) => {
                bucket.cells.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, id: CellId) -> Option<Arc<Cell>> {
        let bucket = self.bucket(id.hash_index)?.lock();
        bucket.cells.iter().find(|c| c.id == id).cloned()
    }

    pub fn lookup_md5(&self, hash_index: u32, md5: &str) -> Option<Arc<Cell>> {
        let bucket = self.bucket(hash_index)?.lock();
        bucket.cells.iter().find(|c| c.md5 == md5).cloned()
    }

    /// Transaction and branch index a reply's top Via branch belongs to
    pub fn match_branch(&self, branch_param: &[u8]) -> Option<(Arc<Cell>, usize)> {
        let parsed = parse_branch(branch_param)?;
        let cell = match parsed.key {
            BranchKey::Label(label) => self.lookup(CellId { hash_index: parsed.hash_index, label }),
            BranchKey::Md5(ref md5) => self.lookup_md5(parsed.hash_index, md5),
        }?;
        Some((cell, parsed.branch))
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().cells.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
