//! Core types and decision logic for the Almanac school calendar.
//!
//! Has no HTTP or database dependencies. It owns
//! the role model, session tokens, the event schema and its validator, and the
//! authorization gate. Storage backends implement [`store::CalendarStore`].

pub mod account;
pub mod credential;
pub mod error;
pub mod event;
pub mod gate;
pub mod id;
pub mod identity;
pub mod role;
pub mod store;
pub mod token;
pub mod validate;

pub use error::{Error, Result};
