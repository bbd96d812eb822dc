// libs/realtime-cell/src/services/session.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{ChangeEvent, EntityKind};

/// An admin session's local materialized view of the event stream.
///
/// Updates apply as a keyed merge by (entity, id), last-write-wins on the
/// event timestamp. Applying the same event twice, or redelivery after a
/// reconnect, yields the identical state - never duplicate rows or
/// double-counted badges. Stale events (older than the row already held)
/// are ignored.
#[derive(Debug, Default)]
pub struct SessionView {
    rows: HashMap<(EntityKind, Uuid), ViewRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub updated_at: DateTime<Utc>,
    pub payload: Value,
}

impl SessionView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &ChangeEvent) {
        let key = (event.entity, event.entity_id);

        if event.is_deletion() {
            self.rows.remove(&key);
            return;
        }

        match self.rows.get(&key) {
            Some(existing) if existing.updated_at > event.updated_at => {
                // Out-of-order redelivery of an older state; keep ours.
            }
            _ => {
                self.rows.insert(
                    key,
                    ViewRow {
                        updated_at: event.updated_at,
                        payload: event.payload.clone(),
                    },
                );
            }
        }
    }

    pub fn rows_of(&self, entity: EntityKind) -> Vec<&ViewRow> {
        let mut rows: Vec<&ViewRow> = self
            .rows
            .iter()
            .filter(|((kind, _), _)| *kind == entity)
            .map(|(_, row)| row)
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        rows
    }

    pub fn get(&self, entity: EntityKind, id: Uuid) -> Option<&ViewRow> {
        self.rows.get(&(entity, id))
    }

    /// Unread badge for a dashboard section: derived from the `is_read`
    /// flag carried in the payload, never from event arrival order.
    pub fn unread_count(&self, entity: EntityKind) -> usize {
        self.rows
            .iter()
            .filter(|((kind, _), _)| *kind == entity)
            .filter(|(_, row)| {
                row.payload
                    .get("is_read")
                    .and_then(Value::as_bool)
                    .map(|read| !read)
                    .unwrap_or(false)
            })
            .count()
    }

    /// Opening the owning view clears its badge locally; the server-side
    /// `is_read` flags are cleared through the mark-read operation.
    pub fn open_view(&mut self, entity: EntityKind) {
        for ((kind, _), row) in self.rows.iter_mut() {
            if *kind == entity {
                if let Some(flag) = row.payload.get_mut("is_read") {
                    *flag = Value::Bool(true);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(id: Uuid, at: DateTime<Utc>, payload: Value) -> ChangeEvent {
        ChangeEvent::new(EntityKind::Appointment, id, at, payload)
    }

    #[test]
    fn applying_the_same_event_twice_is_idempotent() {
        let id = Uuid::new_v4();
        let ev = event(id, Utc::now(), json!({"status": "pending", "is_read": false}));

        let mut once = SessionView::new();
        once.apply(&ev);

        let mut twice = SessionView::new();
        twice.apply(&ev);
        twice.apply(&ev);

        assert_eq!(once.len(), 1);
        assert_eq!(twice.len(), 1);
        assert_eq!(
            once.get(EntityKind::Appointment, id),
            twice.get(EntityKind::Appointment, id)
        );
        assert_eq!(twice.unread_count(EntityKind::Appointment), 1);
    }

    #[test]
    fn stale_redelivery_does_not_overwrite_newer_state() {
        let id = Uuid::new_v4();
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::seconds(5);

        let mut view = SessionView::new();
        view.apply(&event(id, later, json!({"status": "confirmed"})));
        view.apply(&event(id, earlier, json!({"status": "pending"})));

        let row = view.get(EntityKind::Appointment, id).unwrap();
        assert_eq!(row.payload["status"], "confirmed");
    }

    #[test]
    fn deletion_tombstone_removes_the_row_idempotently() {
        let id = Uuid::new_v4();
        let created = Utc::now();

        let mut view = SessionView::new();
        view.apply(&event(id, created, json!({"status": "pending"})));

        let tombstone = ChangeEvent::deleted(
            EntityKind::Appointment,
            id,
            created + chrono::Duration::seconds(1),
        );
        view.apply(&tombstone);
        view.apply(&tombstone);

        assert!(view.is_empty());
    }

    #[test]
    fn unread_badge_clears_when_view_is_opened_not_on_arrival() {
        let mut view = SessionView::new();
        let base = Utc::now();
        for i in 0..3 {
            view.apply(&event(
                Uuid::new_v4(),
                base + chrono::Duration::seconds(i),
                json!({"is_read": false}),
            ));
        }
        assert_eq!(view.unread_count(EntityKind::Appointment), 3);

        view.open_view(EntityKind::Appointment);
        assert_eq!(view.unread_count(EntityKind::Appointment), 0);
    }

    #[test]
    fn events_for_different_entities_do_not_collide() {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut view = SessionView::new();
        view.apply(&ChangeEvent::new(EntityKind::Patient, id, now, json!({"name": "A"})));
        view.apply(&ChangeEvent::new(EntityKind::Inquiry, id, now, json!({"is_read": false})));

        assert_eq!(view.len(), 2);
        assert_eq!(view.unread_count(EntityKind::Inquiry), 1);
        assert_eq!(view.unread_count(EntityKind::Patient), 0);
    }
}
