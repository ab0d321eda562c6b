//! Business logic services for the MBG nutrition monitor

pub mod akg;
pub mod auth;
pub mod daily_menu;
pub mod dashboard;
pub mod detection;
pub mod food_type;
pub mod menu;
pub mod nutrition;
pub mod profile;
pub mod upload;

pub use akg::AkgService;
pub use auth::AuthService;
pub use daily_menu::DailyMenuService;
pub use dashboard::DashboardService;
pub use detection::DetectionService;
pub use food_type::FoodTypeService;
pub use menu::MenuService;
pub use nutrition::NutritionService;
pub use profile::ProfileService;
pub use upload::UploadService;
