//! Ordering guard for overlapping fetches.
//!
//! Every fetch takes a [`Ticket`] before it is sent. A response is only applied
//! when its ticket is newer than the one behind the current state, so a slow,
//! stale response can never overwrite fresher data.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

/// Latest state of one view plus the sequence it was fetched under.
/// Replaced wholesale, never edited in place.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    issued: u64,
    applied: Option<Ticket>,
    value: Option<T>,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            issued: 0,
            applied: None,
            value: None,
        }
    }
}

impl<T> Snapshot<T> {
    /// Ticket for a new request. Strictly increasing.
    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    /// Stores `value` if `ticket` is newer than the applied one. Returns whether it did.
    pub fn apply(&mut self, ticket: Ticket, value: T) -> bool {
        if self.applied.is_some_and(|applied| applied >= ticket) {
            return false;
        }
        self.applied = Some(ticket);
        self.value = Some(value);
        true
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// True while a request newer than the applied state is outstanding.
    pub fn is_pending(&self) -> bool {
        self.applied.map_or(self.issued > 0, |Ticket(n)| n < self.issued)
    }
}
