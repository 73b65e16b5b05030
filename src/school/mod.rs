//! School records
//!
//! Types for the `schools` table and for the raw form a client submits.
//! A [`SchoolForm`] only becomes a [`NewSchool`] after every field passed
//! validation, so nothing unvalidated can reach the repository.

mod validation;

pub use validation::{is_allowed_image_type, ALLOWED_IMAGE_TYPES};

use serde::Serialize;

/// Text fields accepted by `POST /schools`, in form order.
pub const TEXT_FIELDS: [&str; 6] = ["name", "address", "city", "state", "contact", "email_id"];

/// A validated school, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSchool {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: String,
    pub email_id: String,
}

/// Public listing view of a stored school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolSummary {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    /// Public path of the stored image, empty when the school has none.
    pub image: String,
}

/// One rejected field and the reason shown to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Text parts of a submission as received, before validation.
#[derive(Debug, Default, Clone)]
pub struct SchoolForm {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub contact: Option<String>,
    pub email_id: Option<String>,
}

impl SchoolForm {
    /// Store a text part. A repeated part keeps its first value.
    /// Returns false for names that are not school fields.
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "address" => &mut self.address,
            "city" => &mut self.city,
            "state" => &mut self.state,
            "contact" => &mut self.contact,
            "email_id" => &mut self.email_id,
            _ => return false,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
        true
    }

    /// Check every field and report all failures at once.
    pub fn validate(self) -> Result<NewSchool, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = validation::check_name(self.name, &mut errors);
        let address = validation::check_address(self.address, &mut errors);
        let city = validation::check_region("city", "City", self.city, &mut errors);
        let state = validation::check_region("state", "State", self.state, &mut errors);
        let contact = validation::check_contact(self.contact, &mut errors);
        let email_id = validation::check_email(self.email_id, &mut errors);

        match (name, address, city, state, contact, email_id) {
            (Some(name), Some(address), Some(city), Some(state), Some(contact), Some(email_id))
                if errors.is_empty() =>
            {
                Ok(NewSchool {
                    name,
                    address,
                    city,
                    state,
                    contact,
                    email_id,
                })
            }
            _ => Err(errors),
        }
    }
}
