//! In-flight remote calls keyed by correlation token.
//!
//! One token, one waiter, one resolution: `complete` removes the entry before
//! handing back the waiter, so a duplicate reply finds nothing and is a
//! no-op. Waiter types are generic so the table stays testable without an
//! actor runtime.

use std::collections::HashMap;

#[derive(Debug)]
pub struct PendingCalls<W> {
    entries: HashMap<String, W>,
}

impl<W> PendingCalls<W> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a waiter for `token`. Tokens are minted fresh per call, so a
    /// collision would be a bug; the old waiter is returned if one existed.
    pub fn register(&mut self, token: String, waiter: W) -> Option<W> {
        self.entries.insert(token, waiter)
    }

    /// Remove and return the waiter for `token`. `None` for unknown or
    /// already-resolved tokens; the caller treats that as a no-op.
    pub fn complete(&mut self, token: &str) -> Option<W> {
        self.entries.remove(token)
    }

    /// Drain every waiter whose call was already written to the wire, keeping
    /// the ones whose envelope still sits in the outbound queue (those will
    /// be transmitted after reconnect).
    pub fn take_sent(&mut self, mut still_queued: impl FnMut(&str) -> bool) -> Vec<W> {
        let orphaned: Vec<String> = self
            .entries
            .keys()
            .filter(|token| !still_queued(token))
            .cloned()
            .collect();
        orphaned
            .into_iter()
            .filter_map(|token| self.entries.remove(&token))
            .collect()
    }

    /// Drain every waiter. Used on explicit teardown.
    pub fn take_all(&mut self) -> Vec<W> {
        self.entries.drain().map(|(_, waiter)| waiter).collect()
    }
}

impl<W> Default for PendingCalls<W> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_is_at_most_once() {
        let mut table = PendingCalls::<u32>::new();
        assert!(table.register("tok1".to_string(), 10).is_none());

        assert_eq!(table.complete("tok1"), Some(10));
        // A duplicate reply for the same token is a no-op.
        assert_eq!(table.complete("tok1"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn unknown_token_is_a_noop() {
        let mut table = PendingCalls::<u32>::new();
        table.register("tok1".to_string(), 1);
        assert_eq!(table.complete("other"), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn take_sent_keeps_queued_calls() {
        let mut table = PendingCalls::<u32>::new();
        table.register("sent1".to_string(), 1);
        table.register("queued1".to_string(), 2);
        table.register("sent2".to_string(), 3);

        let mut failed = table.take_sent(|token| token == "queued1");
        failed.sort_unstable();
        assert_eq!(failed, vec![1, 3]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.complete("queued1"), Some(2));
    }

    #[test]
    fn take_all_drains_everything() {
        let mut table = PendingCalls::<u32>::new();
        table.register("a".to_string(), 1);
        table.register("b".to_string(), 2);

        let mut all = table.take_all();
        all.sort_unstable();
        assert_eq!(all, vec![1, 2]);
        assert!(table.is_empty());
    }
}
