pub mod app_state;
pub mod current_user;
pub mod page;

pub use app_state::AppState;
pub use current_user::{CurrentUser, UserRole};
pub use page::{NewPage, Page};
