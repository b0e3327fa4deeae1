pub mod classifier;
pub mod db;
pub mod memory;
pub mod notifier;
pub mod qr;
pub mod singular;

pub use classifier::FoodClassifierAdapter;
pub use db::DbAdapter;
pub use memory::MemoryDbAdapter;
pub use notifier::HttpNotificationAdapter;
pub use qr::SvgQrRenderer;
pub use singular::InflectorSingularizer;
