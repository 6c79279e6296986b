//! Contact events (manifold and contact point lifecycle)

use glam::Vec3;

use crate::body::BodyHandle;
use crate::manifold::{ContactId, ManifoldHandle};

/// Type of contact event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEventType {
    /// A manifold started tracking a body pair
    ManifoldCreated,
    /// A manifold stopped tracking a body pair
    ManifoldDestroyed,
    /// A contact point was added to a manifold
    PointCreated,
    /// A contact point was evicted or replaced
    PointDestroyed,
}

/// Snapshot of a contact point
#[derive(Debug, Clone, Copy)]
pub struct ContactData {
    /// Contact point identity
    pub id: ContactId,
    /// Pivot in body A's object space
    pub pivot_a: Vec3,
    /// Contact normal (pointing from body B to body A)
    pub normal: Vec3,
    /// Signed separation
    pub distance: f32,
    /// Accumulated normal impulse
    pub impulse: f32,
}

/// A lifecycle event of a manifold or one of its points
#[derive(Debug, Clone)]
pub struct ContactEvent {
    /// Manifold the event belongs to
    pub manifold: ManifoldHandle,
    /// First body
    pub body_a: BodyHandle,
    /// Second body
    pub body_b: BodyHandle,
    /// Event type
    pub event_type: ContactEventType,
    /// The point, for point events
    pub contact: Option<ContactData>,
}

impl ContactEvent {
    /// Check if this is a point creation event
    pub fn is_point_created(&self) -> bool {
        self.event_type == ContactEventType::PointCreated
    }

    /// Check if this is a point destruction event
    pub fn is_point_destroyed(&self) -> bool {
        self.event_type == ContactEventType::PointDestroyed
    }
}

/// Receiver of contact events
pub trait ContactEventHandler {
    /// Called for every lifecycle event
    fn on_contact_event(&mut self, event: &ContactEvent);

    /// Called when a manifold's points were created, refreshed or removed
    fn on_manifold_changed(&mut self, _manifold: ManifoldHandle) {}
}

/// Default event handler that collects events into a buffer
#[derive(Debug, Default)]
pub struct EventCollector {
    /// Events since the last clear
    pub events: Vec<ContactEvent>,
    /// Manifolds marked as changed since the last clear, without duplicates
    pub changed: Vec<ManifoldHandle>,
}

impl EventCollector {
    /// Create a new event collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all collected events
    pub fn clear(&mut self) {
        self.events.clear();
        self.changed.clear();
    }

    /// Take all collected events
    pub fn drain(&mut self) -> Vec<ContactEvent> {
        self.changed.clear();
        std::mem::take(&mut self.events)
    }

    /// Point creation events
    pub fn points_created(&self) -> impl Iterator<Item = &ContactEvent> {
        self.events.iter().filter(|e| e.is_point_created())
    }

    /// Point destruction events
    pub fn points_destroyed(&self) -> impl Iterator<Item = &ContactEvent> {
        self.events.iter().filter(|e| e.is_point_destroyed())
    }

    /// Whether `manifold` was marked as changed
    pub fn is_changed(&self, manifold: ManifoldHandle) -> bool {
        self.changed.contains(&manifold)
    }
}

impl ContactEventHandler for EventCollector {
    fn on_contact_event(&mut self, event: &ContactEvent) {
        self.events.push(event.clone());
    }

    fn on_manifold_changed(&mut self, manifold: ManifoldHandle) {
        if !self.changed.contains(&manifold) {
            self.changed.push(manifold);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: ContactEventType) -> ContactEvent {
        ContactEvent {
            manifold: ManifoldHandle::new(0, 0),
            body_a: BodyHandle::new(0, 0),
            body_b: BodyHandle::new(1, 0),
            event_type,
            contact: None,
        }
    }

    #[test]
    fn test_collector_filters() {
        let mut collector = EventCollector::new();
        collector.on_contact_event(&event(ContactEventType::PointCreated));
        collector.on_contact_event(&event(ContactEventType::PointDestroyed));
        collector.on_contact_event(&event(ContactEventType::PointCreated));

        assert_eq!(collector.points_created().count(), 2);
        assert_eq!(collector.points_destroyed().count(), 1);
    }

    #[test]
    fn test_changed_marks_are_unique() {
        let mut collector = EventCollector::new();
        let m = ManifoldHandle::new(3, 1);
        collector.on_manifold_changed(m);
        collector.on_manifold_changed(m);
        assert_eq!(collector.changed.len(), 1);
        assert!(collector.is_changed(m));

        assert!(collector.drain().is_empty());
        assert!(!collector.is_changed(m));
    }
}
