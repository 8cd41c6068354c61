//! Subscription and monitored-item engine (C7, §4.7).

mod monitored_item;
mod notification;
mod publish_engine;
mod subscription;

pub use monitored_item::{MonitoredItem, MonitoringMode};
pub use notification::{
    MonitoredItemNotification, NotificationMessage, NotificationPayload, RetransmitQueue, StatusChangeNotification,
};
pub use publish_engine::{PublishEngine, PublishResult};
pub use subscription::{Subscription, SubscriptionConfig};
