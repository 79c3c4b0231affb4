//! Free-detection registry owned by one assignment run.
//!
//! A detection is either free or consumed by exactly one object. The
//! orchestrator seeds the registry from the existing observation map and hands
//! it by reference to each object's turn; nothing else mutates it.

use crate::types::{DetectionId, ObjectId, ObservationMap};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct DetectionRegistry {
    owners: HashMap<DetectionId, ObjectId>,
}

impl DetectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks every detection already held in `observations` as consumed.
    pub fn from_observations(observations: &ObservationMap) -> Self {
        let mut registry = Self::new();
        for (object_id, list) in observations {
            for obs in list {
                registry.consume(&obs.detection_id, object_id);
            }
        }
        registry
    }

    pub fn is_free(&self, detection_id: &str) -> bool {
        !self.owners.contains_key(detection_id)
    }

    pub fn owner(&self, detection_id: &str) -> Option<&str> {
        self.owners.get(detection_id).map(String::as_str)
    }

    /// Records `object_id` as the owner. Returns the previous owner if the
    /// detection was already consumed by another object.
    pub fn consume(&mut self, detection_id: &str, object_id: &str) -> Option<ObjectId> {
        match self.owners.get(detection_id) {
            Some(owner) if owner != object_id => Some(owner.clone()),
            Some(_) => None,
            None => {
                self.owners
                    .insert(detection_id.to_string(), object_id.to_string());
                None
            }
        }
    }

    pub fn consumed_count(&self) -> usize {
        self.owners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_is_exclusive() {
        let mut reg = DetectionRegistry::new();
        assert!(reg.is_free("d1"));
        assert_eq!(reg.consume("d1", "obj-1"), None);
        assert!(!reg.is_free("d1"));
        assert_eq!(reg.consume("d1", "obj-1"), None);
        assert_eq!(reg.consume("d1", "obj-2"), Some("obj-1".to_string()));
        assert_eq!(reg.owner("d1"), Some("obj-1"));
    }
}
