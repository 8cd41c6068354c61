//! Notification messages (§4.7): the payload a `Publish` response carries,
//! and the bounded retransmit queue subscriptions keep them in.

use std::collections::VecDeque;

use crate::types::{DataValue, UtcTime};

use crate::core::DEFAULT_MAX_RETRANSMISSION_QUEUE_SIZE;

/// One monitored item's contribution to a notification message.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemNotification {
    /// The reporting item's id.
    pub client_handle: u32,
    /// The sampled value.
    pub value: DataValue,
}

/// A status change carried out-of-band from data notifications (e.g.
/// subscription timeout, transfer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChangeNotification {
    /// The status explaining the change.
    pub status: crate::core::StatusCode,
}

/// The body of one `Publish` response: either data-change notifications or
/// a status change, never both (§4.7 models a keep-alive as a
/// `NotificationMessage` with an empty notification list).
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationPayload {
    /// Zero or more monitored item notifications. Empty means keep-alive.
    DataChange(Vec<MonitoredItemNotification>),
    /// A status change (e.g. `GoodSubscriptionTransferred`, `BadTimeout`).
    StatusChange(StatusChangeNotification),
}

/// One complete notification message, numbered by its own sequence number
/// independent of the secure channel's chunk sequence numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    /// This message's sequence number within its subscription.
    pub sequence_number: u32,
    /// When the message was published.
    pub publish_time: UtcTime,
    /// The payload.
    pub payload: NotificationPayload,
}

impl NotificationMessage {
    /// True if this message carries no data (a pure keep-alive).
    pub fn is_keep_alive(&self) -> bool {
        matches!(&self.payload, NotificationPayload::DataChange(items) if items.is_empty())
    }
}

/// A bounded FIFO of sent notification messages kept for `Republish`,
/// dropping the oldest entry once full (§4.7:
/// "bounded by max-retransmission-queue-size, dropping oldest when full").
pub struct RetransmitQueue {
    messages: VecDeque<NotificationMessage>,
    capacity: usize,
}

impl Default for RetransmitQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRANSMISSION_QUEUE_SIZE)
    }
}

impl RetransmitQueue {
    /// A queue bounded to `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self { messages: VecDeque::new(), capacity: capacity.max(1) }
    }

    /// Append a message, evicting the oldest if at capacity.
    pub fn push(&mut self, message: NotificationMessage) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Find a previously sent message by its sequence number, for
    /// `Republish`.
    pub fn find(&self, sequence_number: u32) -> Option<&NotificationMessage> {
        self.messages.iter().find(|m| m.sequence_number == sequence_number)
    }

    /// Remove every entry whose sequence number is in `acked`, returning the
    /// sequence numbers that were *not* found (unmatched acks).
    pub fn acknowledge(&mut self, acked: &[u32]) -> Vec<u32> {
        let mut unmatched = Vec::new();
        for &sequence_number in acked {
            let before = self.messages.len();
            self.messages.retain(|m| m.sequence_number != sequence_number);
            if self.messages.len() == before {
                unmatched.push(sequence_number);
            }
        }
        unmatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sequence_number: u32) -> NotificationMessage {
        NotificationMessage {
            sequence_number,
            publish_time: UtcTime(0),
            payload: NotificationPayload::DataChange(Vec::new()),
        }
    }

    #[test]
    fn keep_alive_is_an_empty_data_change() {
        assert!(message(1).is_keep_alive());
    }

    #[test]
    fn queue_evicts_oldest_past_capacity() {
        let mut queue = RetransmitQueue::new(2);
        queue.push(message(1));
        queue.push(message(2));
        queue.push(message(3));
        assert!(queue.find(1).is_none());
        assert!(queue.find(2).is_some());
        assert!(queue.find(3).is_some());
    }

    #[test]
    fn acknowledge_removes_matched_and_reports_unmatched() {
        let mut queue = RetransmitQueue::new(10);
        queue.push(message(1));
        queue.push(message(2));
        let unmatched = queue.acknowledge(&[1, 99]);
        assert_eq!(unmatched, vec![99]);
        assert!(queue.find(1).is_none());
        assert!(queue.find(2).is_some());
    }
}
