pub mod helpers;
pub mod system;
pub mod wizard;
