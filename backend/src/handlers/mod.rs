//! HTTP handlers for the MBG nutrition monitor API

pub mod akg;
pub mod auth;
pub mod daily_menu;
pub mod dashboard;
pub mod detection;
pub mod food_type;
pub mod health;
pub mod menu;
pub mod nutrition;
pub mod profile;
pub mod upload;

pub use akg::*;
pub use auth::*;
pub use daily_menu::*;
pub use dashboard::*;
pub use detection::*;
pub use food_type::*;
pub use health::*;
pub use menu::*;
pub use nutrition::*;
pub use profile::*;
pub use upload::*;
