//! Subscriptions (§4.7): periodic sampling tick, keep-alive, and lifetime
//! expiry, built on top of monitored items and the retransmit queue.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::StatusCode;
use crate::types::UtcTime;

use super::monitored_item::{MonitoredItem, MonitoringMode};
use super::notification::{
    MonitoredItemNotification, NotificationMessage, NotificationPayload, RetransmitQueue, StatusChangeNotification,
};

/// A subscription: a publishing interval, keep-alive/lifetime counters, and
/// the monitored items reporting through it.
pub struct Subscription {
    /// Unique id, scoped to the server.
    pub id: u32,
    /// The session that currently owns this subscription.
    pub owner_session: Vec<u8>,
    /// How often the periodic tick fires.
    pub publishing_interval: Duration,
    /// Keep-alive messages are sent after this many ticks with nothing to
    /// report.
    pub max_keep_alive_count: u32,
    /// The subscription terminates after this many ticks with no
    /// successful publish response.
    pub lifetime_count: u32,
    keep_alive_counter: u32,
    lifetime_counter: u32,
    next_sequence_number: u32,
    items: HashMap<u32, MonitoredItem>,
    pub retransmit_queue: RetransmitQueue,
    /// Set once a tick produces notifications but no `PublishRequest` was
    /// available to carry them; the next successful response must set
    /// `more_notifications`.
    pub has_pending_notifications: bool,
}

impl Subscription {
    /// A fresh subscription with no monitored items.
    pub fn new(
        id: u32,
        owner_session: Vec<u8>,
        publishing_interval: Duration,
        max_keep_alive_count: u32,
        lifetime_count: u32,
        retransmit_queue_size: usize,
    ) -> Self {
        Self {
            id,
            owner_session,
            publishing_interval,
            max_keep_alive_count,
            lifetime_count,
            keep_alive_counter: 0,
            lifetime_counter: 0,
            next_sequence_number: 1,
            items: HashMap::new(),
            retransmit_queue: RetransmitQueue::new(retransmit_queue_size),
            has_pending_notifications: false,
        }
    }

    /// Add a monitored item.
    pub fn add_item(&mut self, item: MonitoredItem) {
        self.items.insert(item.id, item);
    }

    /// Remove a monitored item.
    pub fn remove_item(&mut self, item_id: u32) -> Option<MonitoredItem> {
        self.items.remove(&item_id)
    }

    /// Access a monitored item by id.
    pub fn item_mut(&mut self, item_id: u32) -> Option<&mut MonitoredItem> {
        self.items.get_mut(&item_id)
    }

    fn next_sequence_number(&mut self) -> u32 {
        let seq = self.next_sequence_number;
        self.next_sequence_number = self.next_sequence_number.wrapping_add(1).max(1);
        seq
    }

    /// Run one publishing-interval tick (§4.7 "Periodic tick", steps 1-3):
    /// sample due items (honoring `SetTriggering` force-reports), build a
    /// notification message if anything reported, otherwise advance the
    /// keep-alive counter and emit an empty message once it reaches
    /// `max_keep_alive_count`.
    ///
    /// `sample` supplies the current value for one item; in a real server
    /// this reads the address space, here it is the caller's hook.
    pub fn tick(&mut self, now: Instant, mut sample: impl FnMut(&MonitoredItem) -> crate::types::DataValue) -> Option<NotificationMessage> {
        let due_ids: Vec<u32> = self
            .items
            .values()
            .filter(|item| item.mode != MonitoringMode::Disabled && item.is_due(now))
            .map(|item| item.id)
            .collect();

        let mut forced: Vec<u32> = Vec::new();
        for &id in &due_ids {
            if let Some(item) = self.items.get(&id) {
                forced.extend(item.triggers.iter().copied());
            }
        }

        let mut to_sample: Vec<u32> = due_ids;
        for id in forced {
            if !to_sample.contains(&id) {
                to_sample.push(id);
            }
        }

        let mut notifications = Vec::new();
        for id in to_sample {
            let value = if let Some(item) = self.items.get(&id) {
                sample(item)
            } else {
                continue;
            };
            if let Some(item) = self.items.get_mut(&id) {
                if let Some(reported) = item.sample(value, now) {
                    notifications.push(MonitoredItemNotification { client_handle: id, value: reported });
                }
            }
        }

        if !notifications.is_empty() {
            self.keep_alive_counter = 0;
            let message = NotificationMessage {
                sequence_number: self.next_sequence_number(),
                publish_time: UtcTime::from_system_time(std::time::SystemTime::now()),
                payload: NotificationPayload::DataChange(notifications),
            };
            self.retransmit_queue.push(message.clone());
            Some(message)
        } else {
            self.keep_alive_counter += 1;
            if self.keep_alive_counter >= self.max_keep_alive_count {
                self.keep_alive_counter = 0;
                Some(NotificationMessage {
                    sequence_number: self.next_sequence_number(),
                    publish_time: UtcTime::from_system_time(std::time::SystemTime::now()),
                    payload: NotificationPayload::DataChange(Vec::new()),
                })
            } else {
                None
            }
        }
    }

    /// Record that a publishing cycle passed with no successful publish
    /// response (no `PublishRequest` was available); returns a
    /// `StatusChangeNotification(BadTimeout)` once the lifetime count is
    /// reached (§4.7 step 5).
    pub fn on_publish_cycle_without_response(&mut self) -> Option<NotificationMessage> {
        self.lifetime_counter += 1;
        if self.lifetime_counter >= self.lifetime_count {
            Some(NotificationMessage {
                sequence_number: self.next_sequence_number(),
                publish_time: UtcTime::from_system_time(std::time::SystemTime::now()),
                payload: NotificationPayload::StatusChange(StatusChangeNotification { status: StatusCode::BadTimeout }),
            })
        } else {
            None
        }
    }

    /// Reset the lifetime counter after a successful publish response.
    pub fn on_publish_response_sent(&mut self) {
        self.lifetime_counter = 0;
    }
}

/// Tunable parameters for creating a subscription: the requested publishing
/// interval, keep-alive and lifetime counts, and retransmit queue size
/// (§4.7 "CreateSubscription"), subject to server revision the same way
/// [`crate::client::ClientConfig`]'s session timeout is.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// How often the periodic tick fires.
    pub publishing_interval: Duration,
    /// Keep-alive messages are sent after this many ticks with nothing to
    /// report.
    pub max_keep_alive_count: u32,
    /// The subscription terminates after this many ticks with no
    /// successful publish response.
    pub lifetime_count: u32,
    /// Maximum number of notifications retained for `Republish`.
    pub retransmit_queue_size: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            publishing_interval: Duration::from_millis(1000),
            max_keep_alive_count: 10,
            lifetime_count: 30,
            retransmit_queue_size: 100,
        }
    }
}

impl SubscriptionConfig {
    /// Build a fresh subscription with `id`, owned by `owner_session`.
    pub fn build(&self, id: u32, owner_session: Vec<u8>) -> Subscription {
        Subscription::new(
            id,
            owner_session,
            self.publishing_interval,
            self.max_keep_alive_count,
            self.lifetime_count,
            self.retransmit_queue_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataValue, NodeId};

    fn item(id: u32) -> MonitoredItem {
        MonitoredItem::new(id, NodeId::null(), Duration::from_millis(1))
    }

    #[test]
    fn tick_with_due_item_produces_a_data_change_notification() {
        let mut sub = Subscription::new(1, b"sess".to_vec(), Duration::from_millis(10), 5, 100, 10);
        sub.add_item(item(1));
        let now = Instant::now();
        let message = sub.tick(now, |_| DataValue::new(crate::types::Variant::from(42i32))).unwrap();
        match message.payload {
            NotificationPayload::DataChange(items) => assert_eq!(items.len(), 1),
            _ => panic!("expected data change"),
        }
    }

    #[test]
    fn tick_with_nothing_due_increments_keep_alive_until_threshold() {
        let mut sub = Subscription::new(1, b"sess".to_vec(), Duration::from_secs(10), 2, 100, 10);
        let mut disabled = item(1);
        disabled.mode = MonitoringMode::Disabled;
        sub.add_item(disabled);
        let now = Instant::now();
        assert!(sub.tick(now, |_| DataValue::default()).is_none());
        let message = sub.tick(now, |_| DataValue::default()).unwrap();
        assert!(message.is_keep_alive());
    }

    #[test]
    fn lifetime_expiry_emits_bad_timeout_status_change() {
        let mut sub = Subscription::new(1, b"sess".to_vec(), Duration::from_secs(1), 1000, 2, 10);
        assert!(sub.on_publish_cycle_without_response().is_none());
        let message = sub.on_publish_cycle_without_response().unwrap();
        match message.payload {
            NotificationPayload::StatusChange(change) => assert_eq!(change.status, StatusCode::BadTimeout),
            _ => panic!("expected status change"),
        }
    }

    #[test]
    fn subscription_config_build_carries_its_own_parameters() {
        let config = SubscriptionConfig {
            publishing_interval: Duration::from_millis(250),
            max_keep_alive_count: 4,
            lifetime_count: 12,
            retransmit_queue_size: 20,
        };
        let sub = config.build(9, b"sess".to_vec());
        assert_eq!(sub.id, 9);
        assert_eq!(sub.publishing_interval, Duration::from_millis(250));
        assert_eq!(sub.lifetime_count, 12);
    }

    #[test]
    fn triggering_forces_a_sampling_mode_item_to_report() {
        let mut sub = Subscription::new(1, b"sess".to_vec(), Duration::from_millis(10), 5, 100, 10);
        let mut triggering = item(1);
        triggering.add_trigger(2);
        sub.add_item(triggering);
        let mut linked = item(2);
        linked.mode = MonitoringMode::Sampling;
        sub.add_item(linked);

        let now = Instant::now();
        let message = sub.tick(now, |_| DataValue::new(crate::types::Variant::from(1i32))).unwrap();
        match message.payload {
            NotificationPayload::DataChange(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected data change"),
        }
    }
}
