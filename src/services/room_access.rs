use crate::error::AppError;
use crate::rooms::Room;

/// Decide whether `user_id` / `username` may read or write `room_id`.
///
/// Direct rooms admit only their two endpoints; anything that is not a
/// direct room is an open channel. A string shaped like a direct room
/// but with a broken pair is a client error, not a channel.
pub fn ensure_room_access(room_id: &str, user_id: i64, username: &str) -> Result<(), AppError> {
    let room = Room::parse(room_id)?;
    let allowed = match &room {
        Room::DirectById { .. } => room.includes_id(user_id),
        Room::DirectByName { .. } => room.includes_name(username),
        Room::Channel(_) => true,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dm_member_is_allowed() {
        assert!(ensure_room_access("dmid:3:5", 5, "eve").is_ok());
        assert!(ensure_room_access("dmid:5:9", 5, "eve").is_ok());
    }

    #[test]
    fn dm_outsider_is_forbidden() {
        assert!(matches!(
            ensure_room_access("dmid:1:2", 5, "eve"),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn legacy_dm_checks_username() {
        assert!(ensure_room_access("dm:eve:frank", 5, "eve").is_ok());
        assert!(matches!(
            ensure_room_access("dm:frank:george", 5, "eve"),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn channels_are_open_to_everyone() {
        assert!(ensure_room_access("local", 5, "eve").is_ok());
        assert!(ensure_room_access("general", 1, "alice").is_ok());
    }

    #[test]
    fn malformed_dm_shape_is_a_client_error() {
        assert!(matches!(
            ensure_room_access("dmid:abc:def", 5, "eve"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            ensure_room_access("dmid:4:4", 4, "dana"),
            Err(AppError::BadRequest(_))
        ));
    }
}
