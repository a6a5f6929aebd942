//! Room addressing.
//!
//! A room identifier is an opaque string on the wire. Three shapes exist:
//!
//! - `dmid:<a>:<b>`: direct message between two user ids, `a < b` numerically.
//!   This is the canonical form for the unordered pair; canonicalization never
//!   produces `dmid:<b>:<a>`.
//! - `dm:<name1>:<name2>`: legacy direct message keyed by usernames,
//!   lexicographic order. Kept only for rooms persisted before the id scheme.
//! - anything else: a shared channel with no membership restriction.
//!
//! All shape checks go through [`Room::parse`] so the rules live in one place.

use thiserror::Error;

pub const DM_BY_ID_PREFIX: &str = "dmid:";
pub const DM_BY_NAME_PREFIX: &str = "dm:";

/// Recipient sentinel for rooms that are not direct messages.
pub const NO_PEER: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("a direct message needs two distinct participants")]
    SelfPair,

    #[error("malformed direct-message room id (expected 'dmid:<a>:<b>')")]
    InvalidFormat,

    #[error("sender is not a participant of this direct message")]
    NotAParticipant,
}

/// Parsed form of a room identifier.
///
/// For `DirectById`, `a < b` holds whenever the value came out of
/// [`Room::parse`] or [`canonical_dm_by_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Room {
    DirectById { a: i64, b: i64 },
    DirectByName { a: String, b: String },
    Channel(String),
}

impl Room {
    /// Classify a raw room identifier.
    ///
    /// A string with the `dmid:` shape (prefix plus exactly two colons) that
    /// does not parse as two distinct integers is an error, not a channel:
    /// it names the id scheme but violates it. Everything that matches
    /// neither DM shape is a channel.
    pub fn parse(raw: &str) -> Result<Room, RoomError> {
        if is_dm_by_ids(raw) {
            let (a, b) = parse_dm_ids(raw)?;
            return Ok(Room::DirectById { a, b });
        }
        if is_dm_by_name(raw) {
            let mut parts = raw.splitn(3, ':');
            let _prefix = parts.next();
            match (parts.next(), parts.next()) {
                (Some(n1), Some(n2)) if !n1.is_empty() && !n2.is_empty() => {
                    return Ok(Room::DirectByName {
                        a: n1.to_string(),
                        b: n2.to_string(),
                    });
                }
                _ => return Err(RoomError::InvalidFormat),
            }
        }
        Ok(Room::Channel(raw.to_string()))
    }

    /// Whether the given user id is an endpoint of this room.
    ///
    /// Channels have no membership; every id is a participant.
    pub fn includes_id(&self, user_id: i64) -> bool {
        match self {
            Room::DirectById { a, b } => user_id == *a || user_id == *b,
            Room::DirectByName { .. } => false,
            Room::Channel(_) => true,
        }
    }

    /// Whether the given username is an endpoint of a legacy name-keyed DM.
    pub fn includes_name(&self, username: &str) -> bool {
        match self {
            Room::DirectByName { a, b } => username == a || username == b,
            Room::DirectById { .. } => false,
            Room::Channel(_) => true,
        }
    }

    /// The other endpoint of an id-keyed DM, if `user_id` is a member.
    pub fn peer_of(&self, user_id: i64) -> Option<i64> {
        match self {
            Room::DirectById { a, b } if user_id == *a => Some(*b),
            Room::DirectById { a, b } if user_id == *b => Some(*a),
            _ => None,
        }
    }
}

/// Canonical DM room id for two user ids: `dmid:<min>:<max>`.
///
/// Commutative: `canonical_dm_by_id(x, y) == canonical_dm_by_id(y, x)`.
pub fn canonical_dm_by_id(id1: i64, id2: i64) -> Result<String, RoomError> {
    if id1 == id2 {
        return Err(RoomError::SelfPair);
    }
    let (a, b) = if id1 < id2 { (id1, id2) } else { (id2, id1) };
    Ok(format!("{DM_BY_ID_PREFIX}{a}:{b}"))
}

/// Legacy canonical DM room id for two usernames: `dm:<min>:<max>`
/// (lexicographic).
pub fn canonical_dm_by_name(name1: &str, name2: &str) -> String {
    let (a, b) = if name1 <= name2 {
        (name1, name2)
    } else {
        (name2, name1)
    };
    format!("{DM_BY_NAME_PREFIX}{a}:{b}")
}

/// True iff `room_id` has the id-keyed DM shape: `dmid:` prefix and exactly
/// two `:` separators total.
pub fn is_dm_by_ids(room_id: &str) -> bool {
    room_id.starts_with(DM_BY_ID_PREFIX) && room_id.matches(':').count() == 2
}

/// True iff `room_id` has the legacy name-keyed DM shape.
pub fn is_dm_by_name(room_id: &str) -> bool {
    room_id.starts_with(DM_BY_NAME_PREFIX)
        && !room_id.starts_with(DM_BY_ID_PREFIX)
        && room_id.matches(':').count() == 2
}

/// Extract the two endpoint ids from an id-keyed DM room.
///
/// Fails with [`RoomError::InvalidFormat`] unless the string is exactly
/// `dmid:<a>:<b>` with two distinct integers.
pub fn parse_dm_ids(room_id: &str) -> Result<(i64, i64), RoomError> {
    let rest = room_id
        .strip_prefix(DM_BY_ID_PREFIX)
        .ok_or(RoomError::InvalidFormat)?;
    let mut parts = rest.split(':');
    let a: i64 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(RoomError::InvalidFormat)?;
    let b: i64 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(RoomError::InvalidFormat)?;
    if parts.next().is_some() {
        return Err(RoomError::InvalidFormat);
    }
    if a == b {
        return Err(RoomError::InvalidFormat);
    }
    Ok((a, b))
}

/// The counterpart of `sender_id` in an id-keyed DM room.
///
/// [`RoomError::NotAParticipant`] here means the caller skipped the access
/// check: it is a logic error, not bad user input.
pub fn peer_id_for_sender(room_id: &str, sender_id: i64) -> Result<i64, RoomError> {
    let (a, b) = parse_dm_ids(room_id)?;
    if sender_id == a {
        Ok(b)
    } else if sender_id == b {
        Ok(a)
    } else {
        Err(RoomError::NotAParticipant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_by_id_is_commutative() {
        assert_eq!(
            canonical_dm_by_id(3, 7).unwrap(),
            canonical_dm_by_id(7, 3).unwrap()
        );
        assert_eq!(canonical_dm_by_id(3, 7).unwrap(), "dmid:3:7");
        assert_eq!(canonical_dm_by_id(42, 1).unwrap(), "dmid:1:42");
    }

    #[test]
    fn canonical_by_id_rejects_self_pair() {
        assert_eq!(canonical_dm_by_id(5, 5), Err(RoomError::SelfPair));
        assert_eq!(canonical_dm_by_id(0, 0), Err(RoomError::SelfPair));
    }

    #[test]
    fn canonical_by_name_orders_lexicographically() {
        assert_eq!(canonical_dm_by_name("bob", "alice"), "dm:alice:bob");
        assert_eq!(canonical_dm_by_name("alice", "bob"), "dm:alice:bob");
    }

    #[test]
    fn shape_predicates() {
        assert!(is_dm_by_ids("dmid:3:7"));
        assert!(!is_dm_by_ids("dmid:3:7:9"));
        assert!(!is_dm_by_ids("dm:alice:bob"));
        assert!(!is_dm_by_ids("local"));

        assert!(is_dm_by_name("dm:alice:bob"));
        assert!(!is_dm_by_name("dmid:3:7"));
        assert!(!is_dm_by_name("dm:alice:bob:extra"));
        assert!(!is_dm_by_name("local"));
    }

    #[test]
    fn parse_dm_ids_round_trip() {
        assert_eq!(parse_dm_ids("dmid:3:7").unwrap(), (3, 7));
        let room = canonical_dm_by_id(9, 3).unwrap();
        assert_eq!(parse_dm_ids(&room).unwrap(), (3, 9));
    }

    #[test]
    fn parse_dm_ids_rejects_bad_shapes() {
        assert_eq!(parse_dm_ids("dm:alice:bob"), Err(RoomError::InvalidFormat));
        assert_eq!(parse_dm_ids("dmid:abc:def"), Err(RoomError::InvalidFormat));
        assert_eq!(parse_dm_ids("dmid:3:"), Err(RoomError::InvalidFormat));
        assert_eq!(parse_dm_ids("dmid:3:7:9"), Err(RoomError::InvalidFormat));
        assert_eq!(parse_dm_ids("dmid:4:4"), Err(RoomError::InvalidFormat));
        assert_eq!(parse_dm_ids("local"), Err(RoomError::InvalidFormat));
    }

    #[test]
    fn peer_resolution() {
        assert_eq!(peer_id_for_sender("dmid:3:7", 3).unwrap(), 7);
        assert_eq!(peer_id_for_sender("dmid:3:7", 7).unwrap(), 3);
        assert_eq!(
            peer_id_for_sender("dmid:3:7", 5),
            Err(RoomError::NotAParticipant)
        );
        assert_eq!(
            peer_id_for_sender("not-a-dm", 3),
            Err(RoomError::InvalidFormat)
        );
    }

    #[test]
    fn parse_classifies_rooms() {
        assert_eq!(Room::parse("dmid:3:7").unwrap(), Room::DirectById { a: 3, b: 7 });
        assert_eq!(
            Room::parse("dm:alice:bob").unwrap(),
            Room::DirectByName {
                a: "alice".into(),
                b: "bob".into()
            }
        );
        assert_eq!(
            Room::parse("local").unwrap(),
            Room::Channel("local".into())
        );
        // Wrong colon count means "not a DM shape", so these are channels.
        assert_eq!(
            Room::parse("dmid:3:7:9").unwrap(),
            Room::Channel("dmid:3:7:9".into())
        );
        // The dmid shape with unparseable endpoints is an error, not a channel.
        assert_eq!(Room::parse("dmid:abc:def"), Err(RoomError::InvalidFormat));
        assert_eq!(Room::parse("dmid:4:4"), Err(RoomError::InvalidFormat));
    }

    #[test]
    fn membership_helpers() {
        let dm = Room::parse("dmid:3:9").unwrap();
        assert!(dm.includes_id(3));
        assert!(dm.includes_id(9));
        assert!(!dm.includes_id(5));
        assert_eq!(dm.peer_of(3), Some(9));
        assert_eq!(dm.peer_of(9), Some(3));
        assert_eq!(dm.peer_of(5), None);

        let legacy = Room::parse("dm:eve:frank").unwrap();
        assert!(legacy.includes_name("eve"));
        assert!(legacy.includes_name("frank"));
        assert!(!legacy.includes_name("george"));
        assert_eq!(legacy.peer_of(1), None);

        let channel = Room::parse("local").unwrap();
        assert!(channel.includes_id(12345));
        assert!(channel.includes_name("anyone"));
        assert_eq!(channel.peer_of(12345), None);
    }
}
