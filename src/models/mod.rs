//! Data models for userdesk.
//!
//! This module contains the user record and the pagination types shared by
//! storage, services and the HTTP layer.

mod page;
mod user;

pub use page::{Page, PageRequest};
pub use user::{NewUser, User, UserChanges, UserId};
