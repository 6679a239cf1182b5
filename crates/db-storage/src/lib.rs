//! Contains the database ORM and database migrations for the RSVP controller.
//! Builds upon rsvp-database.

#[macro_use]
extern crate diesel;

#[macro_use]
mod macros;
mod schema;

pub mod migrations;
pub mod parties;
pub mod people;
