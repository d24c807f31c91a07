//! Peer id encoding and entity-to-row conversion.
//!
//! Entities are cached under a *marked* id that encodes the peer category in
//! the number itself: users keep their id, basic chats are negated and
//! channels are stored as `-(CHANNEL_MARK + id)`. Callers that only know the
//! raw id can match all three encodings with [`marked_ids`].

use super::types::{EntityRow, InputPeer};

/// Offset added to channel ids before negation.
pub const CHANNEL_MARK: i64 = 1_000_000_000_000;

/// Largest raw id a basic chat can have.
const MAX_CHAT_ID: i64 = 9_999_999_999;

/// Largest raw id a channel can have.
const MAX_CHANNEL_ID: i64 = 9_999_999_999_999;

/// The category of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerKind {
    User,
    Chat,
    Channel,
}

/// A raw peer id tagged with its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerId {
    User(i64),
    Chat(i64),
    Channel(i64),
}

/// Encode a peer id with its category.
///
/// Chat and channel ids outside their raw range are assumed to be marked
/// already and are resolved first, so marking is idempotent. Returns `None`
/// when the marked id does not fit in an `i64`.
pub fn get_peer_id(peer: PeerId) -> Option<i64> {
    match peer {
        PeerId::User(id) => Some(id),
        PeerId::Chat(mut id) => {
            if !(0 < id && id <= MAX_CHAT_ID) {
                id = resolve_id(id).0;
            }
            id.checked_neg()
        }
        PeerId::Channel(mut id) => {
            if !(0 < id && id <= MAX_CHANNEL_ID) {
                id = resolve_id(id).0;
            }
            id.checked_add(CHANNEL_MARK)?.checked_neg()
        }
    }
}

/// Decode a marked id into its raw id and category.
pub fn resolve_id(marked_id: i64) -> (i64, PeerKind) {
    if marked_id >= 0 {
        return (marked_id, PeerKind::User);
    }

    // `unsigned_abs` keeps `i64::MIN` representable; both results fit in an `i64`.
    let id = marked_id.unsigned_abs();
    let mark = CHANNEL_MARK.unsigned_abs();
    if id > mark {
        ((id - mark) as i64, PeerKind::Channel)
    } else {
        (id as i64, PeerKind::Chat)
    }
}

/// The user, chat and channel encodings of a raw id, in that order.
///
/// Encodings that overflow are left out.
pub fn marked_ids(raw_id: i64) -> Vec<i64> {
    [
        PeerId::User(raw_id),
        PeerId::Chat(raw_id),
        PeerId::Channel(raw_id),
    ]
    .into_iter()
    .filter_map(get_peer_id)
    .collect()
}

/// Build the request-ready peer for a cached `(marked_id, access_hash)` pair.
pub fn input_peer(marked_id: i64, access_hash: i64) -> InputPeer {
    match resolve_id(marked_id) {
        (user_id, PeerKind::User) => InputPeer::User {
            user_id,
            access_hash,
        },
        (chat_id, PeerKind::Chat) => InputPeer::Chat { chat_id },
        (channel_id, PeerKind::Channel) => InputPeer::Channel {
            channel_id,
            access_hash,
        },
    }
}

/// A user as seen in an update or response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub access_hash: Option<i64>,
    /// The logged-in account itself.
    pub is_self: bool,
    /// Minimal constructor whose access hash cannot be used for requests.
    pub min: bool,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A basic group chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
    pub title: String,
}

/// A channel or supergroup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    pub id: i64,
    pub access_hash: Option<i64>,
    pub min: bool,
    pub username: Option<String>,
    pub title: String,
}

/// Any peer an entity cache can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peer {
    User(User),
    Chat(Chat),
    Channel(Channel),
}

impl Peer {
    /// The marked id of this peer, `None` if it cannot be encoded.
    pub fn marked_id(&self) -> Option<i64> {
        match self {
            Peer::User(user) => get_peer_id(PeerId::User(user.id)),
            Peer::Chat(chat) => get_peer_id(PeerId::Chat(chat.id)),
            Peer::Channel(channel) => get_peer_id(PeerId::Channel(channel.id)),
        }
    }

    /// Human readable name: `first last` for users, the title otherwise.
    pub fn display_name(&self) -> String {
        match self {
            Peer::User(user) => match (user.first_name.as_deref(), user.last_name.as_deref()) {
                (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                    format!("{first} {last}")
                }
                (Some(first), _) if !first.is_empty() => first.to_string(),
                (_, Some(last)) if !last.is_empty() => last.to_string(),
                _ => String::new(),
            },
            Peer::Chat(chat) => chat.title.clone(),
            Peer::Channel(channel) => channel.title.clone(),
        }
    }

    /// Convert the peer into a cacheable row.
    ///
    /// Returns `None` for peers that cannot be addressed later: the
    /// logged-in user, `min` constructors, users or channels without an
    /// access hash and ids that cannot be marked.
    pub fn to_row(&self) -> Option<EntityRow> {
        let (hash, username, phone) = match self {
            Peer::User(user) => {
                if user.is_self || user.min {
                    return None;
                }
                (user.access_hash?, user.username.clone(), user.phone.clone())
            }
            Peer::Chat(_) => (0, None, None),
            Peer::Channel(channel) => {
                if channel.min {
                    return None;
                }
                (channel.access_hash?, channel.username.clone(), None)
            }
        };

        let name = Some(self.display_name()).filter(|name| !name.is_empty());
        Some(EntityRow {
            id: self.marked_id()?,
            hash,
            username: username
                .filter(|username| !username.is_empty())
                .map(|username| username.to_lowercase()),
            phone,
            name,
        })
    }
}

/// Normalize a phone number key.
///
/// Strips `+`, parentheses, dashes and whitespace; returns `None` unless
/// only digits remain.
pub fn parse_phone(text: &str) -> Option<String> {
    let digits: String = text
        .chars()
        .filter(|c| !matches!(c, '+' | '(' | ')' | '-') && !c.is_whitespace())
        .collect();
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

/// Extract a lower-cased username from `@name`, `t.me/name` style links or a bare name.
///
/// Invite links and invalid usernames yield `None`.
pub fn parse_username(text: &str) -> Option<String> {
    let mut rest = text.trim();

    if let Some(stripped) = rest.strip_prefix('@') {
        rest = stripped;
    } else {
        let without_scheme = rest
            .strip_prefix("https://")
            .or_else(|| rest.strip_prefix("http://"))
            .unwrap_or(rest);
        let without_www = without_scheme
            .strip_prefix("www.")
            .unwrap_or(without_scheme);
        let link_path = ["telegram.me/", "telegram.dog/", "t.me/"]
            .iter()
            .find_map(|host| without_www.strip_prefix(host));
        if let Some(path) = link_path {
            if path.starts_with('+') || path.starts_with("joinchat/") {
                return None;
            }
            rest = path.strip_prefix('@').unwrap_or(path).trim_end_matches('/');
        }
    }

    if is_valid_username(rest) {
        Some(rest.to_lowercase())
    } else {
        None
    }
}

/// Usernames start with a letter, end with a letter or digit, are 3 to 32
/// characters of letters, digits and underscores, and never contain `__`.
fn is_valid_username(name: &str) -> bool {
    let bytes = name.as_bytes();
    if !(3..=32).contains(&bytes.len()) {
        return false;
    }
    let first = bytes[0];
    let last = bytes[bytes.len() - 1];
    first.is_ascii_alphabetic()
        && last.is_ascii_alphanumeric()
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_')
        && !name.contains("__")
}
