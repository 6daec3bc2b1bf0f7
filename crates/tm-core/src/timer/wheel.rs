use tokio::time::Instant;
use tracing::trace;

use super::list::{TimerLink, TimerList};
use super::types::{TimerListId, TimerSettings};

/// The full set of transaction timer lists.
///
/// The wheel only queues and expires payloads; what a payload means is up to
/// the dispatcher that drains [`TimerWheel::expire`].
pub struct TimerWheel<T> {
    settings: TimerSettings,
    lists: Vec<TimerList<T>>,
}

impl<T> TimerWheel<T> {
    pub fn new(settings: TimerSettings) -> Self {
        TimerWheel {
            settings,
            lists: TimerListId::ALL.iter().map(|&id| TimerList::new(id)).collect(),
        }
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn list(&self, id: TimerListId) -> &TimerList<T> {
        &self.lists[id.index()]
    }

    /// Queue `payload` on `id`, due one list timeout after `now`
    pub fn schedule(&self, id: TimerListId, payload: T, now: Instant) -> TimerLink {
        let deadline = now + id.timeout(&self.settings);
        trace!(list = %id, "timer scheduled");
        self.list(id).insert(payload, deadline)
    }

    /// Remove a queued payload. Calling this for a link that already fired
    /// or was stopped is a no-op.
    pub fn stop(&self, link: TimerLink) -> Option<T> {
        self.list(link.list).remove(link)
    }

    /// Drain everything due at `now`, list by list
    pub fn expire(&self, now: Instant) -> Vec<(TimerListId, T)> {
        let mut due = Vec::new();
        for list in &self.lists {
            let id = list.id();
            due.extend(list.expire(now).into_iter().map(|p| (id, p)));
        }
        due
    }

    pub fn len(&self, id: TimerListId) -> usize {
        self.list(id).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_schedule_uses_list_timeout() {
        let wheel = TimerWheel::new(TimerSettings::default());
        let t0 = Instant::now();
        wheel.schedule(TimerListId::RtT1To1, "retr", t0);
        wheel.schedule(TimerListId::Wait, "wait", t0);

        assert!(wheel.expire(t0 + Duration::from_millis(499)).is_empty());
        assert_eq!(
            wheel.expire(t0 + Duration::from_millis(500)),
            vec![(TimerListId::RtT1To1, "retr")]
        );
        assert_eq!(wheel.expire(t0 + Duration::from_secs(5)), vec![(TimerListId::Wait, "wait")]);
    }

    #[test]
    fn test_stop_twice() {
        let wheel = TimerWheel::new(TimerSettings::default());
        let link = wheel.schedule(TimerListId::Fr, 7u32, Instant::now());
        assert_eq!(wheel.stop(link), Some(7));
        assert_eq!(wheel.stop(link), None);
        assert_eq!(wheel.len(TimerListId::Fr), 0);
    }
}
