//! Document schemas, one module per entity kind

pub mod app;
pub mod board;
pub mod room;
pub mod user;

pub use app::{App, AppType, AppTypeRegistry, FieldType, Position, Rotation, Size};
pub use board::Board;
pub use room::Room;
pub use user::{User, UserRole};
