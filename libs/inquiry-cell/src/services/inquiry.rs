// libs/inquiry-cell/src/services/inquiry.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use realtime_cell::{ChangeEvent, EntityKind, RealtimeBroadcaster};

use crate::models::{Inquiry, InquiryError};

pub struct InquiryService {
    inquiries: RwLock<HashMap<Uuid, Inquiry>>,
    broadcaster: Arc<RealtimeBroadcaster>,
}

impl InquiryService {
    pub fn new(broadcaster: Arc<RealtimeBroadcaster>) -> Self {
        Self {
            inquiries: RwLock::new(HashMap::new()),
            broadcaster,
        }
    }

    pub async fn submit(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<Inquiry, InquiryError> {
        let name = name.trim();
        let message = message.trim();
        if name.is_empty() {
            return Err(InquiryError::Validation("Name is required".to_string()));
        }
        if message.is_empty() {
            return Err(InquiryError::Validation("Message is required".to_string()));
        }

        let inquiry = Inquiry {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.trim().to_string(),
            phone: phone.trim().to_string(),
            message: message.to_string(),
            is_read: false,
            created_at: now,
        };

        self.inquiries
            .write()
            .await
            .insert(inquiry.id, inquiry.clone());
        info!("New inquiry {} from {}", inquiry.id, inquiry.name);
        self.publish(&inquiry);
        Ok(inquiry)
    }

    pub async fn mark_read(&self, id: Uuid) -> Result<Inquiry, InquiryError> {
        let mut inquiries = self.inquiries.write().await;
        let inquiry = inquiries.get_mut(&id).ok_or(InquiryError::NotFound)?;
        inquiry.is_read = true;
        let snapshot = inquiry.clone();
        drop(inquiries);
        self.publish(&snapshot);
        Ok(snapshot)
    }

    /// Newest first, matching the dashboard ordering.
    pub async fn list(&self) -> Vec<Inquiry> {
        let mut all: Vec<Inquiry> = self.inquiries.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    pub async fn unread_count(&self) -> usize {
        self.inquiries
            .read()
            .await
            .values()
            .filter(|i| !i.is_read)
            .count()
    }

    fn publish(&self, inquiry: &Inquiry) {
        match serde_json::to_value(inquiry) {
            Ok(payload) => {
                self.broadcaster.publish(ChangeEvent::new(
                    EntityKind::Inquiry,
                    inquiry.id,
                    Utc::now(),
                    payload,
                ));
            }
            Err(e) => warn!("Failed to serialize inquiry {}: {}", inquiry.id, e),
        }
    }
}
