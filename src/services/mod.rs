pub mod auth_service;
pub mod encryption;
pub mod message_service;
pub mod presence;
pub mod room_access;
