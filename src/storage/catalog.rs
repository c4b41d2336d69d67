//! Default schema catalog for trip-planning data

use crate::schema::{FieldType, Schema, SchemaError, SchemaRegistry};

pub const USERS: &str = "users";
pub const TRIPS: &str = "trips";
pub const SCHEDULE_ITEMS: &str = "schedule_items";
pub const CONTACTS: &str = "contacts";
pub const ITEM_TYPES: &str = "item_types";

fn text(names: &[&'static str]) -> Vec<(&'static str, FieldType)> {
    names.iter().map(|n| (*n, FieldType::Text)).collect()
}

/// Login accounts; `hash` and `salt` are hex strings
pub fn users() -> Result<Schema, SchemaError> {
    Schema::define(
        USERS,
        text(&["username", "fname", "lname", "createdAt", "hash", "salt"]),
        Some("username"),
    )
}

pub fn trips() -> Result<Schema, SchemaError> {
    Schema::define(
        TRIPS,
        text(&["tripId", "owner", "title", "destination", "startDate", "endDate"]),
        Some("tripId"),
    )
}

/// Appointments and other timed entries belonging to a trip
pub fn schedule_items() -> Result<Schema, SchemaError> {
    Schema::define(
        SCHEDULE_ITEMS,
        text(&[
            "itemId",
            "tripId",
            "itemType",
            "title",
            "location",
            "startTime",
            "endTime",
            "notes",
        ]),
        Some("itemId"),
    )
}

pub fn contacts() -> Result<Schema, SchemaError> {
    let mut fields = text(&["contactId", "owner", "name", "phone", "email"]);
    fields.push(("emergency", FieldType::Boolean));
    Schema::define(CONTACTS, fields, Some("contactId"))
}

/// Lookup table of schedule item kinds (flight, hotel, ...)
pub fn item_types() -> Result<Schema, SchemaError> {
    Schema::define(ITEM_TYPES, text(&["typeName", "description"]), Some("typeName"))
}

/// Registry holding every schema of the default catalog
pub fn default_registry() -> Result<SchemaRegistry, SchemaError> {
    SchemaRegistry::from_schemas([users()?, trips()?, schedule_items()?, contacts()?, item_types()?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = default_registry().unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, [USERS, TRIPS, SCHEDULE_ITEMS, CONTACTS, ITEM_TYPES]);
        assert!(registry.iter().all(|s| s.key_field().is_some()));
    }

    #[test]
    fn test_contacts_emergency_is_boolean() {
        let schema = contacts().unwrap();
        let emergency = &schema.fields()[schema.position("emergency").unwrap()];
        assert_eq!(emergency.field_type, FieldType::Boolean);
    }
}
