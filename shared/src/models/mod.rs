//! Domain models for the MBG nutrition monitor

mod akg;
mod daily_menu;
mod food_type;
mod menu;
mod user;

pub use akg::*;
pub use daily_menu::*;
pub use food_type::*;
pub use menu::*;
pub use user::*;
