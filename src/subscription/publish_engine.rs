//! The publish engine (§4.7): matches queued `PublishRequest`s against
//! subscriptions with notifications ready, handles acknowledgements,
//! `Republish`, and `TransferSubscriptions`.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::core::{StatusCode, SubscriptionError};

use super::notification::{NotificationMessage, NotificationPayload, StatusChangeNotification};
use super::subscription::Subscription;

/// Result of matching one queued `PublishRequest` against a ready
/// subscription.
pub struct PublishResult {
    /// The request handle the response answers.
    pub request_handle: u64,
    /// Which subscription the notification belongs to.
    pub subscription_id: u32,
    /// The notification message to send.
    pub notification: NotificationMessage,
    /// Per-acknowledgement results, in the same order as the request's ack
    /// array — `Ok(())` for a matched ack, `Err(BadSequenceNumberUnknown)`
    /// otherwise (§4.7 "Acknowledgements").
    pub ack_results: Vec<Result<(), SubscriptionError>>,
    /// True if more notifications are ready but no further request was
    /// queued to carry them yet.
    pub more_notifications: bool,
}

/// Per-session publish request queue plus the subscriptions it owns,
/// matched together on each tick.
#[derive(Default)]
pub struct PublishEngine {
    subscriptions: HashMap<u32, Subscription>,
    pending_requests: VecDeque<(u64, Vec<(u32, u32)>)>,
    /// Subscriptions that hit their lifetime count and terminated, waiting
    /// for any PublishRequest to carry their `Bad_Timeout` status change.
    expired: VecDeque<(u32, NotificationMessage)>,
}

impl PublishEngine {
    /// A publish engine with no subscriptions and an empty request queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription with this engine.
    pub fn add_subscription(&mut self, subscription: Subscription) {
        self.subscriptions.insert(subscription.id, subscription);
    }

    /// Remove and return a subscription (e.g. for `TransferSubscriptions`).
    pub fn take_subscription(&mut self, subscription_id: u32) -> Option<Subscription> {
        self.subscriptions.remove(&subscription_id)
    }

    /// Queue an incoming `PublishRequest`, carrying `request_handle` and its
    /// (subscriptionId, sequenceNumber) acknowledgements.
    pub fn queue_publish_request(&mut self, request_handle: u64, acks: Vec<(u32, u32)>) {
        self.pending_requests.push_back((request_handle, acks));
    }

    fn apply_acks(&mut self, acks: &[(u32, u32)]) -> Vec<Result<(), SubscriptionError>> {
        let mut results = Vec::with_capacity(acks.len());
        for &(subscription_id, sequence_number) in acks {
            let Some(subscription) = self.subscriptions.get_mut(&subscription_id) else {
                results.push(Err(SubscriptionError::UnknownSubscription(subscription_id)));
                continue;
            };
            let unmatched = subscription.retransmit_queue.acknowledge(&[sequence_number]);
            if unmatched.is_empty() {
                results.push(Ok(()));
            } else {
                results.push(Err(SubscriptionError::SequenceNumberUnknown));
            }
        }
        results
    }

    /// Run one tick across every subscription, dequeuing the oldest pending
    /// `PublishRequest` for each subscription that has something ready
    /// (notification or expired lifetime), applying its acknowledgements.
    pub fn tick(&mut self, now: Instant, mut sample: impl FnMut(u32, &crate::subscription::MonitoredItem) -> crate::types::DataValue) -> Vec<PublishResult> {
        let mut results = Vec::new();

        while let Some((subscription_id, notification)) = self.expired.pop_front() {
            let Some((request_handle, acks)) = self.pending_requests.pop_front() else {
                self.expired.push_front((subscription_id, notification));
                break;
            };
            let ack_results = self.apply_acks(&acks);
            results.push(PublishResult {
                request_handle,
                subscription_id,
                notification,
                ack_results,
                more_notifications: false,
            });
        }

        let subscription_ids: Vec<u32> = self.subscriptions.keys().copied().collect();

        for subscription_id in subscription_ids {
            let notification = {
                let subscription = self.subscriptions.get_mut(&subscription_id).expect("just listed");
                subscription.tick(now, |item| sample(subscription_id, item))
            };

            let mut delivered = false;
            if let Some(notification) = notification {
                if let Some((request_handle, acks)) = self.pending_requests.pop_front() {
                    let ack_results = self.apply_acks(&acks);
                    results.push(PublishResult {
                        request_handle,
                        subscription_id,
                        notification,
                        ack_results,
                        more_notifications: false,
                    });
                    delivered = true;
                } else if let Some(subscription) = self.subscriptions.get_mut(&subscription_id) {
                    subscription.has_pending_notifications = true;
                }
            }

            let Some(subscription) = self.subscriptions.get_mut(&subscription_id) else {
                continue;
            };
            if delivered {
                subscription.on_publish_response_sent();
            } else if let Some(expiry_notification) = subscription.on_publish_cycle_without_response() {
                self.subscriptions.remove(&subscription_id);
                self.expired.push_back((subscription_id, expiry_notification));
            }
        }

        results
    }

    /// `Republish`: return the stored notification message with
    /// `sequence_number` from `subscription_id`'s retransmit queue, or
    /// `BadMessageNotAvailable`.
    pub fn republish(&self, subscription_id: u32, sequence_number: u32) -> Result<NotificationMessage, SubscriptionError> {
        let subscription = self
            .subscriptions
            .get(&subscription_id)
            .ok_or(SubscriptionError::UnknownSubscription(subscription_id))?;
        subscription
            .retransmit_queue
            .find(sequence_number)
            .cloned()
            .ok_or(SubscriptionError::MessageNotAvailable)
    }

    /// `TransferSubscriptions`: move a subscription to `new_owner_session`.
    /// Returns a `StatusChangeNotification(GoodSubscriptionTransferred)` for
    /// the previous owner if it is still reachable (the caller decides how
    /// to deliver it — e.g. via that session's own pending Publish).
    pub fn transfer_subscription(
        &mut self,
        subscription_id: u32,
        new_owner_session: Vec<u8>,
    ) -> Result<NotificationMessage, SubscriptionError> {
        let subscription = self
            .subscriptions
            .get_mut(&subscription_id)
            .ok_or(SubscriptionError::UnknownSubscription(subscription_id))?;
        subscription.owner_session = new_owner_session;
        Ok(NotificationMessage {
            sequence_number: 0,
            publish_time: crate::types::UtcTime::from_system_time(std::time::SystemTime::now()),
            payload: NotificationPayload::StatusChange(StatusChangeNotification {
                status: StatusCode::GoodSubscriptionTransferred,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataValue, NodeId, Variant};
    use std::time::Duration;

    fn make_subscription(id: u32) -> Subscription {
        let mut sub = Subscription::new(id, b"sess".to_vec(), Duration::from_millis(1), 5, 100, 10);
        sub.add_item(crate::subscription::MonitoredItem::new(1, NodeId::null(), Duration::from_millis(1)));
        sub
    }

    #[test]
    fn tick_matches_queued_request_to_ready_subscription() {
        let mut engine = PublishEngine::new();
        engine.add_subscription(make_subscription(1));
        engine.queue_publish_request(7, Vec::new());

        let results = engine.tick(Instant::now(), |_, _| DataValue::new(Variant::from(1i32)));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].request_handle, 7);
        assert_eq!(results[0].subscription_id, 1);
    }

    #[test]
    fn tick_without_a_queued_request_marks_pending() {
        let mut engine = PublishEngine::new();
        engine.add_subscription(make_subscription(1));

        let results = engine.tick(Instant::now(), |_, _| DataValue::new(Variant::from(1i32)));
        assert!(results.is_empty());
        assert!(engine.subscriptions.get(&1).unwrap().has_pending_notifications);
    }

    #[test]
    fn subscription_expires_after_lifetime_count_cycles_with_no_response() {
        let mut engine = PublishEngine::new();
        engine.add_subscription(Subscription::new(1, b"sess".to_vec(), Duration::from_millis(1), 1000, 2, 10));

        let now = Instant::now();
        assert!(engine.tick(now, |_, _| DataValue::new(Variant::from(1i32))).is_empty());
        assert!(engine.tick(now, |_, _| DataValue::new(Variant::from(1i32))).is_empty());
        assert!(engine.subscriptions.get(&1).is_none());

        engine.queue_publish_request(42, Vec::new());
        let results = engine.tick(now, |_, _| DataValue::new(Variant::from(1i32)));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].request_handle, 42);
        match &results[0].notification.payload {
            NotificationPayload::StatusChange(change) => assert_eq!(change.status, StatusCode::BadTimeout),
            _ => panic!("expected status change"),
        }
    }

    #[test]
    fn republish_returns_message_not_available_when_absent() {
        let mut engine = PublishEngine::new();
        engine.add_subscription(make_subscription(1));
        let err = engine.republish(1, 999).unwrap_err();
        assert_eq!(err, SubscriptionError::MessageNotAvailable);
    }

    #[test]
    fn transfer_moves_ownership_and_emits_status_change() {
        let mut engine = PublishEngine::new();
        engine.add_subscription(make_subscription(1));
        let message = engine.transfer_subscription(1, b"new-session".to_vec()).unwrap();
        assert!(matches!(message.payload, NotificationPayload::StatusChange(_)));
        assert_eq!(engine.subscriptions.get(&1).unwrap().owner_session, b"new-session");
    }
}
