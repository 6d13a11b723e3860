use chrono::NaiveDate;

use crate::models::{Event, EventStatus, Faq};

const TECH_IMAGE: &str = "/assets/event-tech.jpg";
const JAZZ_IMAGE: &str = "/assets/event-jazz.jpg";

struct Listing<'a> {
    id: &'a str,
    title: &'a str,
    description: &'a str,
    date: (i32, u32, u32),
    time: &'a str,
    location: &'a str,
    address: &'a str,
    attendees: u32,
    capacity: u32,
    category: &'a str,
    price: f64,
    image: &'a str,
    featured: bool,
    organizer: &'a str,
    organizer_id: &'a str,
    created_at: &'a str,
    faqs: &'a [(&'a str, &'a str)],
    what_to_expect: &'a [&'a str],
}

/// Sample listings written to an empty store: paid and free, one featured,
/// four distinct categories.
pub fn seed_events() -> Vec<Event> {
    vec![
        sample_event(Listing {
            id: "1",
            title: "Tech Summit 2025",
            description: "Join the biggest technology conference of the year featuring industry leaders, innovative workshops, and networking opportunities.",
            date: (2025, 2, 15),
            time: "09:00",
            location: "San Francisco, CA",
            address: "Moscone Center, 747 Howard St",
            attendees: 847,
            capacity: 1000,
            category: "Technology",
            price: 299.0,
            image: TECH_IMAGE,
            featured: true,
            organizer: "TechEvents Inc.",
            organizer_id: "org-1",
            created_at: "2025-01-01",
            faqs: &[
                ("What should I bring?", "Please bring a valid ID and your ticket (digital or printed)."),
                ("Is parking available?", "Yes, there is ample parking available at the venue."),
                ("Can I get a refund?", "Refunds are available up to 7 days before the event."),
            ],
            what_to_expect: &[
                "Expert-led sessions and workshops",
                "Networking opportunities with industry leaders",
                "Interactive activities and demonstrations",
                "Exclusive access to resources and materials",
            ],
        }),
        sample_event(Listing {
            id: "2",
            title: "Jazz Night Under the Stars",
            description: "An unforgettable evening of smooth jazz performances in a beautiful open-air setting.",
            date: (2025, 2, 20),
            time: "19:00",
            location: "Central Park, NYC",
            address: "Central Park Bandshell",
            attendees: 320,
            capacity: 500,
            category: "Music",
            price: 45.0,
            image: JAZZ_IMAGE,
            featured: false,
            organizer: "Jazz Foundation",
            organizer_id: "org-2",
            created_at: "2025-01-05",
            faqs: &[
                ("What should I bring?", "Bring a blanket or lawn chair for seating."),
                ("Is food available?", "Food trucks will be on site."),
                ("What if it rains?", "The event will be moved to the indoor venue nearby."),
            ],
            what_to_expect: &[
                "Live jazz performances from renowned artists",
                "Open-air venue with stunning views",
                "Food and beverage options",
                "VIP seating available",
            ],
        }),
        sample_event(Listing {
            id: "3",
            title: "Startup Pitch Competition",
            description: "Watch innovative startups pitch their ideas to top investors and industry experts.",
            date: (2025, 3, 1),
            time: "14:00",
            location: "Austin, TX",
            address: "Capital Factory, 701 Brazos St",
            attendees: 234,
            capacity: 300,
            category: "Business",
            price: 75.0,
            image: TECH_IMAGE,
            featured: false,
            organizer: "StartupHub",
            organizer_id: "org-1",
            created_at: "2025-01-10",
            faqs: &[
                ("Can I pitch my startup?", "Applications for pitching closed on Feb 15."),
                ("Will there be networking?", "Yes, there's a networking session after the pitches."),
            ],
            what_to_expect: &[
                "10 startup pitches",
                "Q&A sessions with investors",
                "Networking opportunities",
                "Awards ceremony",
            ],
        }),
        sample_event(Listing {
            id: "4",
            title: "Gourmet Food Festival",
            description: "Experience culinary delights from world-renowned chefs at this exclusive food festival.",
            date: (2025, 3, 10),
            time: "11:00",
            location: "Los Angeles, CA",
            address: "Grand Park, 200 N Grand Ave",
            attendees: 1200,
            capacity: 2000,
            category: "Food & Drink",
            price: 0.0,
            image: JAZZ_IMAGE,
            featured: false,
            organizer: "LA Food Council",
            organizer_id: "org-3",
            created_at: "2025-01-15",
            faqs: &[
                ("Is it family-friendly?", "Yes, this is a family-friendly event."),
                ("Are samples free?", "Entry is free, but food samples are pay-as-you-go."),
            ],
            what_to_expect: &[
                "50+ food vendors",
                "Live cooking demonstrations",
                "Celebrity chef appearances",
                "Kids' cooking classes",
            ],
        }),
    ]
}

fn sample_event(listing: Listing<'_>) -> Event {
    let (year, month, day) = listing.date;
    Event {
        id: listing.id.to_string(),
        title: listing.title.to_string(),
        description: listing.description.to_string(),
        date: NaiveDate::from_ymd_opt(year, month, day).expect("valid seed date"),
        time: listing.time.to_string(),
        location: listing.location.to_string(),
        address: listing.address.to_string(),
        attendees: listing.attendees,
        capacity: listing.capacity,
        category: listing.category.to_string(),
        price: listing.price,
        is_free: listing.price == 0.0,
        image: listing.image.to_string(),
        featured: listing.featured,
        status: EventStatus::Published,
        organizer: listing.organizer.to_string(),
        organizer_id: listing.organizer_id.to_string(),
        created_at: listing.created_at.to_string(),
        faqs: listing
            .faqs
            .iter()
            .map(|(question, answer)| Faq::new(question, answer))
            .collect(),
        what_to_expect: listing
            .what_to_expect
            .iter()
            .map(|item| item.to_string())
            .collect(),
    }
}
