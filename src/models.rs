use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ALL_CATEGORIES: &str = "All";
pub const DEFAULT_CATEGORY: &str = "Community";

pub const CATEGORIES: [&str; 8] = [
    "Music",
    "Technology",
    "Business",
    "Food & Drink",
    "Arts",
    "Sports",
    "Health",
    "Community",
];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

impl Faq {
    pub fn new(question: &str, answer: &str) -> Self {
        Self {
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: NaiveDate, // serialized as YYYY-MM-DD, so date order == string order
    pub time: String,
    pub location: String,
    pub address: String,
    pub attendees: u32,
    pub capacity: u32,
    pub category: String,
    pub price: f64,
    pub is_free: bool,
    pub image: String,
    pub featured: bool,
    pub status: EventStatus,
    pub organizer: String,
    pub organizer_id: String,
    pub created_at: String,
    #[serde(default)]
    pub faqs: Vec<Faq>,
    #[serde(default)]
    pub what_to_expect: Vec<String>,
}

impl Event {
    /// Price used for display and revenue; free events always cost nothing.
    pub fn effective_price(&self) -> f64 {
        if self.is_free {
            0.0
        } else {
            self.price
        }
    }

    pub fn spots_left(&self) -> u32 {
        self.capacity.saturating_sub(self.attendees)
    }

    pub fn is_sold_out(&self) -> bool {
        self.attendees >= self.capacity
    }

    pub fn revenue(&self) -> f64 {
        f64::from(self.attendees) * self.effective_price()
    }

    pub fn is_published(&self) -> bool {
        self.status == EventStatus::Published
    }
}

/// Payload accepted by `EventStore::create`. The store assigns `id`,
/// `created_at` and `attendees`; nothing else is checked on its side.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: String,
    pub location: String,
    pub address: String,
    pub capacity: u32,
    pub category: String,
    pub price: f64,
    pub is_free: bool,
    pub image: String,
    pub featured: bool,
    pub status: EventStatus,
    pub organizer: String,
    pub organizer_id: String,
    #[serde(default)]
    pub faqs: Vec<Faq>,
    #[serde(default)]
    pub what_to_expect: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

impl NewEvent {
    /// Required-field check for forms. Run it before `create`; the store
    /// itself accepts whatever it is given.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.location.trim().is_empty() {
            missing.push("location");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }

    pub fn with_defaults(mut self) -> Self {
        if self.category.trim().is_empty() {
            self.category = DEFAULT_CATEGORY.to_string();
        }
        if self.is_free {
            self.price = 0.0;
        }
        if self.image.trim().is_empty() {
            self.image = "/placeholder.svg".to_string();
        }
        self
    }

    pub(crate) fn materialize(self, id: String, created_at: String) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            date: self.date,
            time: self.time,
            location: self.location,
            address: self.address,
            attendees: 0,
            capacity: self.capacity,
            category: self.category,
            price: self.price,
            is_free: self.is_free,
            image: self.image,
            featured: self.featured,
            status: self.status,
            organizer: self.organizer,
            organizer_id: self.organizer_id,
            created_at,
            faqs: self.faqs,
            what_to_expect: self.what_to_expect,
        }
    }
}
