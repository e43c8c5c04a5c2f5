pub mod assets;
pub mod health;

pub use assets::assets_router;
pub use health::health_router;
