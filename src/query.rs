use std::{cmp::Ordering, collections::BTreeMap, str::FromStr};

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Event, ALL_CATEGORIES};

/// `None`, `""` and the "All" sentinel mean "no category filter"; anything
/// else must equal the event's category exactly.
pub fn category_matches(event: &Event, category: Option<&str>) -> bool {
    match category {
        None | Some("") | Some(ALL_CATEGORIES) => true,
        Some(category) => event.category == category,
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Filters for the discovery page. Blank criteria match everything; the
/// rest are ANDed together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchCriteria<'a> {
    pub query: &'a str,
    pub category: Option<&'a str>,
    pub location: Option<&'a str>,
}

impl<'a> SearchCriteria<'a> {
    pub fn new(query: &'a str, category: Option<&'a str>, location: Option<&'a str>) -> Self {
        Self {
            query,
            category,
            location,
        }
    }

    pub fn matcher(&self) -> impl Fn(&Event) -> bool + 'a {
        let query = self.query.trim().to_lowercase();
        let location = self.location.unwrap_or("").trim().to_lowercase();
        let category = self.category;
        move |event: &Event| {
            let matches_query = query.is_empty()
                || contains_ci(&event.title, &query)
                || contains_ci(&event.description, &query);
            let matches_location = location.is_empty() || contains_ci(&event.location, &location);
            matches_query && matches_location && category_matches(event, category)
        }
    }
}

pub fn search(events: &[Event], criteria: &SearchCriteria<'_>) -> Vec<Event> {
    let matcher = criteria.matcher();
    events.iter().filter(|&event| matcher(event)).cloned().collect()
}

/// Events on or after `today`, earliest first; same-day events keep their
/// stored order.
pub fn upcoming_on(events: &[Event], today: NaiveDate) -> Vec<Event> {
    let mut upcoming: Vec<Event> = events.iter().filter(|e| e.date >= today).cloned().collect();
    upcoming.sort_by_key(|e| e.date);
    upcoming
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Date,
    Popular,
    PriceLow,
    PriceHigh,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "date" => Ok(Self::Date),
            "popular" => Ok(Self::Popular),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

fn cmp_price(a: &Event, b: &Event) -> Ordering {
    a.effective_price()
        .partial_cmp(&b.effective_price())
        .unwrap_or(Ordering::Equal)
}

/// Stable sort; ties keep their incoming order.
pub fn sort_events(events: &mut [Event], order: SortBy) {
    match order {
        SortBy::Date => events.sort_by_key(|e| e.date),
        SortBy::Popular => events.sort_by(|a, b| b.attendees.cmp(&a.attendees)),
        SortBy::PriceLow => events.sort_by(cmp_price),
        SortBy::PriceHigh => events.sort_by(|a, b| cmp_price(b, a)),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OrganizerStats {
    pub total_events: usize,
    pub total_attendees: u64,
    pub total_revenue: f64,
    /// Attendees over total capacity, rounded to a whole percent.
    pub fill_rate_percent: u32,
}

pub fn organizer_stats<'a, I>(events: I) -> OrganizerStats
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut stats = OrganizerStats::default();
    let mut capacity: u64 = 0;
    for event in events {
        stats.total_events += 1;
        stats.total_attendees += u64::from(event.attendees);
        stats.total_revenue += event.revenue();
        capacity += u64::from(event.capacity);
    }
    if capacity > 0 {
        stats.fill_rate_percent =
            ((stats.total_attendees as f64 / capacity as f64) * 100.0).round() as u32;
    }
    stats
}

pub fn category_counts(events: &[Event]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(event.category.clone()).or_insert(0) += 1;
    }
    counts
}
