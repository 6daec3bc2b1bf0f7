//! A deadline-ordered doubly linked list stored in a slot arena.
//!
//! Nodes never move; they are addressed by slot index and a generation that
//! is bumped every time the slot is vacated. A [`TimerLink`] taken when a
//! payload was queued therefore stops matching as soon as that payload left
//! the list, which makes `remove` idempotent.

use parking_lot::Mutex;
use tokio::time::Instant;

use super::types::TimerListId;

/// Handle to a queued payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerLink {
    pub list: TimerListId,
    slot: u32,
    generation: u32,
}

struct Node<T> {
    payload: T,
    deadline: Instant,
    prev: Option<u32>,
    next: Option<u32>,
}

enum Slot<T> {
    Occupied { generation: u32, node: Node<T> },
    Vacant { generation: u32, next_free: Option<u32> },
}

struct ListInner<T> {
    slots: Vec<Slot<T>>,
    free: Option<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl<T> ListInner<T> {
    fn node(&self, idx: u32) -> Option<&Node<T>> {
        match self.slots.get(idx as usize) {
            Some(Slot::Occupied { node, .. }) => Some(node),
            _ => None,
        }
    }

    fn node_mut(&mut self, idx: u32) -> Option<&mut Node<T>> {
        match self.slots.get_mut(idx as usize) {
            Some(Slot::Occupied { node, .. }) => Some(node),
            _ => None,
        }
    }

    fn alloc_slot(&mut self, node: Node<T>) -> (u32, u32) {
        match self.free {
            Some(idx) => {
                let slot = &mut self.slots[idx as usize];
                let (generation, next_free) = match slot {
                    Slot::Vacant { generation, next_free } => (*generation, *next_free),
                    // free list only links vacant slots
                    Slot::Occupied { generation, .. } => (*generation, None),
                };
                *slot = Slot::Occupied { generation, node };
                self.free = next_free;
                (idx, generation)
            }
            None => {
                let idx = self.slots.len() as u32;
                self.slots.push(Slot::Occupied { generation: 0, node });
                (idx, 0)
            }
        }
    }

    fn unlink(&mut self, idx: u32) -> Option<T> {
        let (prev, next) = {
            let node = self.node(idx)?;
            (node.prev, node.next)
        };
        match prev {
            Some(p) => {
                if let Some(n) = self.node_mut(p) {
                    n.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        let generation = match &self.slots[idx as usize] {
            Slot::Occupied { generation, .. } => generation.wrapping_add(1),
            Slot::Vacant { generation, .. } => *generation,
        };
        let old = std::mem::replace(
            &mut self.slots[idx as usize],
            Slot::Vacant { generation, next_free: self.free },
        );
        self.free = Some(idx);
        self.len -= 1;
        match old {
            Slot::Occupied { node, .. } => Some(node.payload),
            Slot::Vacant { .. } => None,
        }
    }
}

/// One independently locked timer list
pub struct TimerList<T> {
    id: TimerListId,
    inner: Mutex<ListInner<T>>,
}

impl<T> TimerList<T> {
    pub fn new(id: TimerListId) -> Self {
        TimerList {
            id,
            inner: Mutex::new(ListInner {
                slots: Vec::new(),
                free: None,
                head: None,
                tail: None,
                len: 0,
            }),
        }
    }

    pub fn id(&self) -> TimerListId {
        self.id
    }

    /// Queue `payload` to fire at `deadline`.
    ///
    /// Normally this is a tail append; a deadline earlier than the tail's is
    /// walked back into place.
    pub fn insert(&self, payload: T, deadline: Instant) -> TimerLink {
        let mut inner = self.inner.lock();

        let mut after = inner.tail;
        while let Some(idx) = after {
            match inner.node(idx) {
                Some(node) if node.deadline > deadline => after = node.prev,
                _ => break,
            }
        }
        let before = match after {
            Some(idx) => inner.node(idx).and_then(|n| n.next),
            None => inner.head,
        };

        let (slot, generation) = inner.alloc_slot(Node {
            payload,
            deadline,
            prev: after,
            next: before,
        });
        match after {
            Some(idx) => {
                if let Some(n) = inner.node_mut(idx) {
                    n.next = Some(slot);
                }
            }
            None => inner.head = Some(slot),
        }
        match before {
            Some(idx) => {
                if let Some(n) = inner.node_mut(idx) {
                    n.prev = Some(slot);
                }
            }
            None => inner.tail = Some(slot),
        }
        inner.len += 1;

        TimerLink { list: self.id, slot, generation }
    }

    /// Unlink the payload behind `link`. Stale links return `None`.
    pub fn remove(&self, link: TimerLink) -> Option<T> {
        if link.list != self.id {
            return None;
        }
        let mut inner = self.inner.lock();
        let queued = matches!(
            inner.slots.get(link.slot as usize),
            Some(Slot::Occupied { generation, .. }) if *generation == link.generation
        );
        if queued { inner.unlink(link.slot) } else { None }
    }

    /// Whether `link` still refers to a queued payload
    pub fn contains(&self, link: TimerLink) -> bool {
        if link.list != self.id {
            return false;
        }
        let inner = self.inner.lock();
        matches!(
            inner.slots.get(link.slot as usize),
            Some(Slot::Occupied { generation, .. }) if *generation == link.generation
        )
    }

    /// Unlink every payload due at `now`, in deadline order.
    ///
    /// The lock is held only while unlinking; the caller owns the returned
    /// payloads outright.
    pub fn expire(&self, now: Instant) -> Vec<T> {
        let mut inner = self.inner.lock();
        let mut due = Vec::new();
        while let Some(head) = inner.head {
            match inner.node(head) {
                Some(node) if node.deadline <= now => {}
                _ => break,
            }
            match inner.unlink(head) {
                Some(payload) => due.push(payload),
                None => break,
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deadline of the head element
    pub fn next_deadline(&self) -> Option<Instant> {
        let inner = self.inner.lock();
        inner.head.and_then(|h| inner.node(h)).map(|n| n.deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_expire_in_order() {
        let list = TimerList::new(TimerListId::Fr);
        let t0 = Instant::now();
        list.insert("a", t0 + Duration::from_millis(10));
        list.insert("b", t0 + Duration::from_millis(20));
        list.insert("c", t0 + Duration::from_millis(30));

        assert_eq!(list.expire(t0 + Duration::from_millis(5)), Vec::<&str>::new());
        assert_eq!(list.expire(t0 + Duration::from_millis(20)), vec!["a", "b"]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.next_deadline(), Some(t0 + Duration::from_millis(30)));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let list = TimerList::new(TimerListId::Wait);
        let t0 = Instant::now();
        let a = list.insert(1, t0);
        let b = list.insert(2, t0);
        assert_eq!(list.remove(a), Some(1));
        assert_eq!(list.remove(a), None);
        assert!(!list.contains(a));
        assert!(list.contains(b));

        // slot of `a` gets reused; the old link must not reach the new payload
        let c = list.insert(3, t0);
        assert_eq!(list.remove(a), None);
        assert_eq!(list.expire(t0), vec![2, 3]);
        assert_eq!(list.remove(c), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_link_from_other_list_ignored() {
        let fr = TimerList::new(TimerListId::Fr);
        let wait: TimerList<()> = TimerList::new(TimerListId::Wait);
        let link = fr.insert((), Instant::now());
        assert_eq!(wait.remove(link), None);
        assert_eq!(fr.len(), 1);
    }

    #[test]
    fn test_out_of_order_insert_is_sorted() {
        let list = TimerList::new(TimerListId::Delete);
        let t0 = Instant::now();
        list.insert(3, t0 + Duration::from_millis(30));
        list.insert(1, t0 + Duration::from_millis(10));
        list.insert(2, t0 + Duration::from_millis(20));
        assert_eq!(list.expire(t0 + Duration::from_secs(1)), vec![1, 2, 3]);
    }

    #[test]
    fn test_remove_middle_keeps_links() {
        let list = TimerList::new(TimerListId::RtT2);
        let t0 = Instant::now();
        list.insert('x', t0);
        let mid = list.insert('y', t0);
        list.insert('z', t0);
        assert_eq!(list.remove(mid), Some('y'));
        assert_eq!(list.expire(t0), vec!['x', 'z']);
    }
}
