//! Business logic services.
//!
//! Services validate input, hash passwords and orchestrate the user store.

mod password;
mod users;
pub mod validation;

pub use password::PasswordHasher;
pub use users::{
    DEFAULT_PER_PAGE, DELETE_FAILED_MESSAGE, Outcome, REGISTERED_MESSAGE, RegisterRequest,
    UPDATED_MESSAGE, UpdateUserRequest, UserService,
};
pub use validation::{ValidationErrors, is_valid_email};
