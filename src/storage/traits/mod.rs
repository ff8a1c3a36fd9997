//! Storage backend traits.

mod users;

pub use users::UserStore;
