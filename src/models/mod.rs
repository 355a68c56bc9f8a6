pub mod enums;
pub mod user;
pub mod profile;
pub mod disease;
pub mod appointment;
pub mod test_result;
pub mod statistics;
pub mod communication;

pub use user::*;
pub use profile::*;
pub use disease::*;
pub use appointment::*;
pub use test_result::*;
pub use statistics::*;
pub use communication::*;
