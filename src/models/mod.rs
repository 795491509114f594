pub mod appointment;
pub mod audit;
pub mod user;

pub use appointment::*;
pub use audit::*;
pub use user::*;
