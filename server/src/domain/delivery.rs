//! Online-delivery hub (C3)
//!
//! Per the design note against two parallel maps, a user's mailbox and live
//! subscription are collapsed into one entry: an unbounded channel. Sending
//! into it *is* enqueueing to the mailbox; the monitor RPC handler reading
//! from it *is* the subscription. A closed or absent channel means the user
//! is offline, with no separate "is connected" flag to fall out of sync.
//!
//! The channel itself is the notification primitive: `recv()` suspends
//! until a message arrives or the sender is dropped, so the monitor loop
//! never busy-polls.

use dashmap::DashMap;
use tokio::sync::mpsc;

use chat_proto::Message;

pub struct DeliveryHub {
    sessions: DashMap<String, mpsc::UnboundedSender<Message>>,
}

impl DeliveryHub {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Attach a new live subscription for `user`. Any prior subscription's
    /// sender is dropped here, which closes its receiver and ends its
    /// monitor loop (single-subscription invariant).
    pub fn attach(&self, user: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.insert(user.to_string(), tx);
        rx
    }

    /// Remove the subscription for `user` if it is still the one installed
    /// by `attach`'s caller (avoids detaching a newer subscription that
    /// already replaced this one).
    pub fn detach(&self, user: &str, tx: &mpsc::UnboundedSender<Message>) {
        if let Some(entry) = self.sessions.get(user) {
            if entry.same_channel(tx) {
                drop(entry);
                self.sessions.remove(user);
            }
        }
    }

    /// Try to push directly to an online subscriber. Returns `true` if the
    /// message was handed off; `false` means the caller should persist it
    /// as pending instead.
    pub fn try_deliver(&self, recipient: &str, message: Message) -> bool {
        match self.sessions.get(recipient) {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }
}

impl Default for DeliveryHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(body: &str) -> Message {
        Message {
            id: 0,
            sender: "alice".to_string(),
            recipient: "bob".to_string(),
            body: body.to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            source: 0,
        }
    }

    #[tokio::test]
    async fn delivers_to_live_subscriber() {
        let hub = DeliveryHub::new();
        let mut rx = hub.attach("bob");

        assert!(hub.try_deliver("bob", msg("hi")));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.body, "hi");
    }

    #[tokio::test]
    async fn offline_recipient_is_not_delivered() {
        let hub = DeliveryHub::new();
        assert!(!hub.try_deliver("bob", msg("hi")));
    }

    #[tokio::test]
    async fn reattaching_ends_the_prior_subscription() {
        let hub = DeliveryHub::new();
        let mut first = hub.attach("bob");
        let _second = hub.attach("bob");

        assert_eq!(first.recv().await, None);
    }

    #[tokio::test]
    async fn detach_is_a_noop_for_a_superseded_subscription() {
        let hub = DeliveryHub::new();
        let first_rx = hub.attach("bob");
        let first_tx = {
            // Re-derive a sender handle equivalent to the one installed for "bob".
            hub.sessions.get("bob").unwrap().clone()
        };
        drop(first_rx);

        let _second = hub.attach("bob");
        hub.detach("bob", &first_tx);

        // "bob" is still deliverable because detach only matched the stale sender.
        assert!(hub.try_deliver("bob", msg("hi")));
    }
}
