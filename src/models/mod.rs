mod connection;
mod message;
mod user;

pub use connection::Connection;
pub use message::Message;
pub use user::{User, UserPublic};
