//! Front door for the fridge: HTTP API, chat bot loop and upload handling.
pub mod api;
pub mod bot;
pub mod uploads;
