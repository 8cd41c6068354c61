//! Monitored items (§4.7): per-item sampling, queuing, and triggering.

use std::time::{Duration, Instant};

use crate::types::{DataValue, NodeId};

/// An item's reporting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringMode {
    /// No sampling, no reporting.
    Disabled,
    /// Sample on each interval but never queue a notification.
    Sampling,
    /// Sample and queue notifications for the next Publish.
    Reporting,
}

/// One monitored node/attribute, sampled on its own interval (here modeled
/// as ticking in lockstep with the owning subscription's publishing
/// interval, the common case for single-attribute monitoring).
pub struct MonitoredItem {
    /// Unique id within the owning subscription.
    pub id: u32,
    /// The node (and, implicitly, attribute) being monitored.
    pub node_id: NodeId,
    /// Current monitoring mode.
    pub mode: MonitoringMode,
    /// Minimum interval between samples.
    pub sampling_interval: Duration,
    /// Last time this item was sampled.
    last_sampled: Option<Instant>,
    /// Most recently sampled value, re-sent on transfer with initial values.
    pub last_value: Option<DataValue>,
    /// Ids of items this one triggers via `SetTriggering` — when this item
    /// reports, every linked item reports too even if it is only Sampling.
    pub triggers: Vec<u32>,
}

impl MonitoredItem {
    /// Create a new item in `Reporting` mode with no prior sample.
    pub fn new(id: u32, node_id: NodeId, sampling_interval: Duration) -> Self {
        Self {
            id,
            node_id,
            mode: MonitoringMode::Reporting,
            sampling_interval,
            last_sampled: None,
            last_value: None,
            triggers: Vec::new(),
        }
    }

    /// True if `now` is at or past the next due sample, per
    /// `sampling_interval`.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_sampled {
            None => true,
            Some(last) => now.duration_since(last) >= self.sampling_interval,
        }
    }

    /// Record a fresh sample. Returns `Some(value)` if the item is enabled
    /// (`Sampling` or `Reporting`) and the value should be considered for
    /// queuing (`Reporting`) or just tracked as last-known (`Sampling`).
    pub fn sample(&mut self, value: DataValue, now: Instant) -> Option<DataValue> {
        self.last_sampled = Some(now);
        if self.mode == MonitoringMode::Disabled {
            return None;
        }
        self.last_value = Some(value.clone());
        if self.mode == MonitoringMode::Reporting {
            Some(value)
        } else {
            None
        }
    }

    /// Link another item to be force-reported whenever this one reports
    /// (§4.7: "SetTriggering links items so that a triggering-item report
    /// forces its linked items to report even in Sampling mode").
    pub fn add_trigger(&mut self, triggered_item_id: u32) {
        if !self.triggers.contains(&triggered_item_id) {
            self.triggers.push(triggered_item_id);
        }
    }

    /// Remove a previously added trigger link.
    pub fn remove_trigger(&mut self, triggered_item_id: u32) {
        self.triggers.retain(|id| *id != triggered_item_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_item_never_samples_a_value() {
        let mut item = MonitoredItem::new(1, NodeId::null(), Duration::from_millis(1));
        item.mode = MonitoringMode::Disabled;
        let result = item.sample(DataValue::default(), Instant::now());
        assert!(result.is_none());
        assert!(item.last_value.is_none());
    }

    #[test]
    fn sampling_mode_tracks_last_value_without_reporting() {
        let mut item = MonitoredItem::new(1, NodeId::null(), Duration::from_millis(1));
        item.mode = MonitoringMode::Sampling;
        let result = item.sample(DataValue::default(), Instant::now());
        assert!(result.is_none());
        assert!(item.last_value.is_some());
    }

    #[test]
    fn reporting_mode_returns_the_sampled_value() {
        let mut item = MonitoredItem::new(1, NodeId::null(), Duration::from_millis(1));
        let result = item.sample(DataValue::default(), Instant::now());
        assert!(result.is_some());
    }

    #[test]
    fn due_check_respects_sampling_interval() {
        let mut item = MonitoredItem::new(1, NodeId::null(), Duration::from_secs(10));
        let start = Instant::now();
        assert!(item.is_due(start));
        item.sample(DataValue::default(), start);
        assert!(!item.is_due(start + Duration::from_secs(1)));
        assert!(item.is_due(start + Duration::from_secs(11)));
    }

    #[test]
    fn trigger_links_are_deduplicated_and_removable() {
        let mut item = MonitoredItem::new(1, NodeId::null(), Duration::from_millis(1));
        item.add_trigger(2);
        item.add_trigger(2);
        assert_eq!(item.triggers, vec![2]);
        item.remove_trigger(2);
        assert!(item.triggers.is_empty());
    }
}
