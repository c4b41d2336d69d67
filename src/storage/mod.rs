//! Storage Layer - SQLite-backed record persistence
//!
//! System of record is a single SQLite file with one table per declared
//! schema. The default catalog declares:
//! - users(username, fname, lname, createdAt, hash, salt)
//! - trips(tripId, owner, title, destination, startDate, endDate)
//! - schedule_items(itemId, tripId, itemType, title, location, startTime, endTime, notes)
//! - contacts(contactId, owner, name, phone, email, emergency)
//! - item_types(typeName, description)

pub mod catalog;
pub mod sqlite;

pub use sqlite::{Record, RecordStore, StoreState, StoreStats};
