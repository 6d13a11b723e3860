use serde::Serialize;

use crate::models::{Event, EventStatus, ValidationError};
use crate::store::{CancelError, PersistWarning, Receipt, RegisterError, RegisterOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Default,
    Destructive,
    Warning,
}

/// A short, non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notice {
    fn new(title: &str, description: impl Into<String>, variant: Variant) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant,
        }
    }

    pub fn event_not_found() -> Self {
        Self::new(
            "Event not found",
            "This event does not exist or has been removed.",
            Variant::Destructive,
        )
    }

    pub fn from_validation(err: &ValidationError) -> Self {
        let ValidationError::MissingFields(fields) = err;
        Self::new(
            "Missing fields",
            format!("Please fill in all required fields: {}.", fields.join(", ")),
            Variant::Destructive,
        )
    }

    pub fn for_created(event: &Event) -> Self {
        match event.status {
            EventStatus::Draft => Self::new(
                "Draft saved",
                "Your event has been saved as a draft.",
                Variant::Default,
            ),
            EventStatus::Published => {
                Self::new("Event published!", "Your event is now live.", Variant::Default)
            }
        }
    }

    pub fn for_register(
        event: &Event,
        result: &Result<Receipt<RegisterOutcome>, RegisterError>,
    ) -> Self {
        match result {
            Ok(receipt) => match &receipt.warning {
                Some(warning) if !warning.saved() => Self::for_persist_warning(warning),
                _ => match receipt.value {
                    RegisterOutcome::Registered => Self::new(
                        "Registration successful!",
                        format!("You're now registered for {}", event.title),
                        Variant::Default,
                    ),
                    RegisterOutcome::AlreadyRegistered => Self::new(
                        "Already registered",
                        format!("You're already registered for {}", event.title),
                        Variant::Default,
                    ),
                },
            },
            Err(RegisterError::SoldOut(_)) => Self::new(
                "Registration failed",
                "This event is at full capacity.",
                Variant::Destructive,
            ),
            Err(RegisterError::NotFound(_)) => Self::event_not_found(),
        }
    }

    pub fn for_cancel(event: &Event, result: &Result<Receipt<()>, CancelError>) -> Self {
        match result {
            Ok(Receipt {
                warning: Some(warning),
                ..
            }) if !warning.saved() => Self::for_persist_warning(warning),
            Ok(_) => Self::new(
                "Registration cancelled",
                format!("Your registration for {} has been cancelled", event.title),
                Variant::Default,
            ),
            Err(CancelError::NotRegistered(_)) => Self::new(
                "Cancellation failed",
                "Unable to cancel your registration.",
                Variant::Destructive,
            ),
        }
    }

    pub fn for_persist_warning(warning: &PersistWarning) -> Self {
        match warning {
            PersistWarning::LostUpdate { .. } => Self::new(
                "Changes merged over newer data",
                "Events were changed in another window; your latest changes replaced them.",
                Variant::Warning,
            ),
            PersistWarning::WriteFailed(_)
            | PersistWarning::ReadOnly
            | PersistWarning::Unverified => Self::new(
                "Changes not saved",
                "Your change was applied but could not be saved and will be lost on reload.",
                Variant::Warning,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_events;

    fn jazz() -> Event {
        seed_events().remove(1)
    }

    #[test]
    fn register_notices() {
        let event = jazz();
        let ok = Ok(Receipt {
            value: RegisterOutcome::Registered,
            warning: None,
        });
        let notice = Notice::for_register(&event, &ok);
        assert_eq!(notice.title, "Registration successful!");
        assert_eq!(
            notice.description,
            "You're now registered for Jazz Night Under the Stars"
        );

        let sold_out = Err(RegisterError::SoldOut(event.id.clone()));
        let notice = Notice::for_register(&event, &sold_out);
        assert_eq!(notice.title, "Registration failed");
        assert_eq!(notice.description, "This event is at full capacity.");
        assert_eq!(notice.variant, Variant::Destructive);
    }

    #[test]
    fn unsaved_change_surfaces_as_warning() {
        let event = jazz();
        let result = Ok(Receipt {
            value: (),
            warning: Some(PersistWarning::WriteFailed("quota".into())),
        });
        let notice = Notice::for_cancel(&event, &result);
        assert_eq!(notice.title, "Changes not saved");
        assert_eq!(notice.variant, Variant::Warning);

        let unverified = Ok(Receipt {
            value: (),
            warning: Some(PersistWarning::Unverified),
        });
        assert_eq!(
            Notice::for_cancel(&event, &unverified).title,
            "Changes not saved"
        );

        let lost = Ok(Receipt {
            value: (),
            warning: Some(PersistWarning::LostUpdate {
                expected: 1,
                found: 2,
            }),
        });
        assert_eq!(
            Notice::for_cancel(&event, &lost).title,
            "Registration cancelled"
        );
    }

    #[test]
    fn cancel_failure_and_create_notices() {
        let mut event = jazz();
        let notice = Notice::for_cancel(&event, &Err(CancelError::NotRegistered("2".into())));
        assert_eq!(notice.title, "Cancellation failed");

        let missing = ValidationError::MissingFields(vec!["title"]);
        assert_eq!(
            Notice::from_validation(&missing).description,
            "Please fill in all required fields: title."
        );

        assert_eq!(Notice::for_created(&event).title, "Event published!");
        event.status = EventStatus::Draft;
        assert_eq!(Notice::for_created(&event).title, "Draft saved");
    }
}
