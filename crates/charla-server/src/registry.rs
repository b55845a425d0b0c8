//! Room registry: the process-wide map of connected sessions.
//!
//! ## Responsibilities
//!
//! - Membership: register on arrival, unregister on teardown
//! - Attributes: name and room, mutated atomically with their
//!   uniqueness checks
//! - Broadcast: deliver a line to every occupant of a room, sealed
//!   once per recipient with that recipient's key
//!
//! ## Design
//!
//! One `std::sync::Mutex` serializes every read and write; cross-room
//! uniqueness checks need a consistent view of the whole map, so there is
//! deliberately no finer-grained locking. Critical sections only touch the
//! map: the actual sends go through each session's unbounded outbound
//! channel after the lock is released, so blocking I/O can never happen
//! under the lock.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use charla_crypto::KEY_LENGTH;
use charla_proto::{MsgType, seal_line};
use tokio::sync::mpsc::UnboundedSender;

/// Room every session starts in.
pub(crate) const DEFAULT_ROOM: &str = "lobby";

/// One registered session.
struct SessionEntry {
    name: String,
    room: String,
    key: [u8; KEY_LENGTH],
    outbound: UnboundedSender<Bytes>,
}

/// Snapshot of one session's public attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Connection id the session is keyed by.
    pub id: u64,
    /// Current display name.
    pub name: String,
    /// Current room.
    pub room: String,
}

/// Final attributes of a session removed from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartedSession {
    /// Display name at the moment of removal.
    pub name: String,
    /// Room at the moment of removal.
    pub room: String,
}

/// Errors from registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The requested name is already held by another session in the room.
    #[error("name '{name}' is already in use in room '{room}'")]
    NameInUse {
        /// The conflicting name.
        name: String,
        /// The room the conflict was found in.
        room: String,
    },

    /// No session with the given id is registered.
    #[error("unknown session {0}")]
    UnknownSession(u64),
}

/// The shared registry of connected sessions.
pub struct Registry {
    sessions: Mutex<HashMap<u64, SessionEntry>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { sessions: Mutex::new(HashMap::new()) }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, SessionEntry>> {
        // a poisoned lock only means another handler panicked mid-section;
        // the map itself is always left consistent
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn name_taken_locked(
        sessions: &HashMap<u64, SessionEntry>,
        name: &str,
        room: &str,
        exclude: Option<u64>,
    ) -> bool {
        sessions
            .iter()
            .any(|(id, entry)| exclude != Some(*id) && entry.name == name && entry.room == room)
    }

    /// Inserts a session with its default name and room.
    ///
    /// Returns the assigned display name, `usuario<id>`.
    pub fn register(
        &self,
        id: u64,
        key: [u8; KEY_LENGTH],
        outbound: UnboundedSender<Bytes>,
    ) -> String {
        let name = format!("usuario{id}");
        let entry =
            SessionEntry { name: name.clone(), room: DEFAULT_ROOM.to_owned(), key, outbound };
        self.lock().insert(id, entry);
        name
    }

    /// Removes a session, returning its final attributes.
    ///
    /// Idempotent: removing an absent session returns `None`. Callers
    /// broadcast the departure notice *after* this returns, so the departed
    /// session can never be a recipient of its own notice.
    pub fn unregister(&self, id: u64) -> Option<DepartedSession> {
        self.lock()
            .remove(&id)
            .map(|entry| DepartedSession { name: entry.name, room: entry.room })
    }

    /// Checks whether `name` is held by some other session in `room`.
    ///
    /// Case-sensitive exact match on both fields. `exclude` lets a session
    /// ignore itself when re-checking its own name.
    pub fn is_name_taken(&self, name: &str, room: &str, exclude: Option<u64>) -> bool {
        Self::name_taken_locked(&self.lock(), name, room, exclude)
    }

    /// Renames a session, atomically with the uniqueness check.
    ///
    /// Returns the previous name on success.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NameInUse`] if another session in the same room
    /// already holds `new_name`; [`RegistryError::UnknownSession`] if the
    /// session is not registered.
    pub fn rename(&self, id: u64, new_name: &str) -> Result<String, RegistryError> {
        let mut sessions = self.lock();

        let room = sessions.get(&id).ok_or(RegistryError::UnknownSession(id))?.room.clone();
        if Self::name_taken_locked(&sessions, new_name, &room, Some(id)) {
            return Err(RegistryError::NameInUse { name: new_name.to_owned(), room });
        }

        let entry = sessions.get_mut(&id).ok_or(RegistryError::UnknownSession(id))?;
        Ok(std::mem::replace(&mut entry.name, new_name.to_owned()))
    }

    /// Moves a session to another room, atomically with the check that its
    /// own name is free there.
    ///
    /// Returns the pre-mutation room name, captured under the lock, so the
    /// caller can address the leave notice to the room the session actually
    /// left.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NameInUse`] if the session's name is taken in the
    /// target room; [`RegistryError::UnknownSession`] if the session is not
    /// registered.
    pub fn move_room(&self, id: u64, new_room: &str) -> Result<String, RegistryError> {
        let mut sessions = self.lock();

        let name = sessions.get(&id).ok_or(RegistryError::UnknownSession(id))?.name.clone();
        if Self::name_taken_locked(&sessions, &name, new_room, Some(id)) {
            return Err(RegistryError::NameInUse { name, room: new_room.to_owned() });
        }

        let entry = sessions.get_mut(&id).ok_or(RegistryError::UnknownSession(id))?;
        Ok(std::mem::replace(&mut entry.room, new_room.to_owned()))
    }

    /// Delivers `text` to every occupant of `room`, except `exclude`.
    ///
    /// Each recipient holds its own symmetric key, so the line is sealed
    /// once per recipient; a single ciphertext can never be shared. The
    /// recipient snapshot is taken under the lock, the sends happen after
    /// it is released. Returns the number of queued deliveries.
    pub fn broadcast(
        &self,
        room: &str,
        exclude: Option<u64>,
        kind: MsgType,
        text: &str,
    ) -> usize {
        let recipients: Vec<([u8; KEY_LENGTH], UnboundedSender<Bytes>)> = {
            let sessions = self.lock();
            sessions
                .iter()
                .filter(|(id, entry)| exclude != Some(**id) && entry.room == room)
                .map(|(_, entry)| (entry.key, entry.outbound.clone()))
                .collect()
        };

        let mut delivered = 0;
        for (key, outbound) in recipients {
            if outbound.send(seal_line(kind, text, &key)).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Snapshots every session's public attributes.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.lock()
            .iter()
            .map(|(id, entry)| SessionInfo {
                id: *id,
                name: entry.name.clone(),
                room: entry.room.clone(),
            })
            .collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("session_count", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use charla_crypto::KEY_LENGTH;
    use charla_proto::{FrameHeader, open_line};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;

    fn key_for(id: u64) -> [u8; KEY_LENGTH] {
        [id as u8; KEY_LENGTH]
    }

    fn add_session(registry: &Registry, id: u64) -> (String, UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let name = registry.register(id, key_for(id), tx);
        (name, rx)
    }

    fn recv_text(rx: &mut UnboundedReceiver<Bytes>, id: u64) -> (MsgType, String) {
        let frame = rx.try_recv().expect("a queued frame");
        let header = FrameHeader::from_bytes(&frame[..FrameHeader::SIZE]).expect("header");
        let kind = MsgType::from_u8(header.msg_type).expect("known type");
        let mut payload = frame[FrameHeader::SIZE..].to_vec();
        assert_eq!(payload.len(), header.length.get() as usize);
        (kind, open_line(&mut payload, &key_for(id)))
    }

    #[test]
    fn register_assigns_default_name_and_room() {
        let registry = Registry::new();
        let (name, _rx) = add_session(&registry, 7);

        assert_eq!(name, "usuario7");
        let sessions = registry.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].room, "lobby");
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = Registry::new();
        let (_, _rx) = add_session(&registry, 1);

        let gone = registry.unregister(1).expect("first removal");
        assert_eq!(gone, DepartedSession { name: "usuario1".into(), room: "lobby".into() });
        assert!(registry.unregister(1).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn name_check_is_case_sensitive_and_room_scoped() {
        let registry = Registry::new();
        let (_, _rx1) = add_session(&registry, 1);
        registry.rename(1, "bob").expect("rename");

        assert!(registry.is_name_taken("bob", "lobby", None));
        assert!(!registry.is_name_taken("Bob", "lobby", None));
        assert!(!registry.is_name_taken("bob", "otra", None));
        assert!(!registry.is_name_taken("bob", "lobby", Some(1)));
    }

    #[test]
    fn rename_rejects_conflict_in_same_room() {
        let registry = Registry::new();
        let (_, _rx1) = add_session(&registry, 1);
        let (_, _rx2) = add_session(&registry, 2);
        registry.rename(1, "bob").expect("rename");

        let err = registry.rename(2, "bob").expect_err("conflict");
        assert_eq!(err, RegistryError::NameInUse { name: "bob".into(), room: "lobby".into() });
    }

    #[test]
    fn same_name_is_allowed_across_rooms() {
        let registry = Registry::new();
        let (_, _rx1) = add_session(&registry, 1);
        let (_, _rx2) = add_session(&registry, 2);
        registry.rename(1, "bob").expect("rename");
        registry.move_room(1, "x").expect("move");

        registry.rename(2, "bob").expect("same name, different room");
    }

    #[test]
    fn move_room_rejects_taken_own_name() {
        let registry = Registry::new();
        let (_, _rx1) = add_session(&registry, 1);
        let (_, _rx2) = add_session(&registry, 2);
        registry.rename(1, "bob").expect("rename");
        registry.move_room(1, "x").expect("move");
        registry.rename(2, "bob").expect("rename");

        let err = registry.move_room(2, "x").expect_err("own name taken in target");
        assert_eq!(err, RegistryError::NameInUse { name: "bob".into(), room: "x".into() });

        // the failed move left the session where it was
        let info = registry.sessions().into_iter().find(|s| s.id == 2).expect("session 2");
        assert_eq!(info.room, "lobby");
    }

    #[test]
    fn move_room_returns_previous_room() {
        let registry = Registry::new();
        let (_, _rx) = add_session(&registry, 1);

        let old = registry.move_room(1, "x").expect("move");
        assert_eq!(old, "lobby");
        let old = registry.move_room(1, "y").expect("move");
        assert_eq!(old, "x");
    }

    #[test]
    fn mutations_on_unknown_sessions_fail() {
        let registry = Registry::new();
        assert_eq!(registry.rename(9, "bob"), Err(RegistryError::UnknownSession(9)));
        assert_eq!(registry.move_room(9, "x"), Err(RegistryError::UnknownSession(9)));
    }

    #[test]
    fn broadcast_seals_per_recipient_and_excludes_sender() {
        let registry = Registry::new();
        let (_, mut rx1) = add_session(&registry, 1);
        let (_, mut rx2) = add_session(&registry, 2);

        let delivered = registry.broadcast("lobby", Some(1), MsgType::Chat, "[ana] hola\n");
        assert_eq!(delivered, 1);
        assert!(rx1.try_recv().is_err());

        let (kind, text) = recv_text(&mut rx2, 2);
        assert_eq!(kind, MsgType::Chat);
        assert_eq!(text, "[ana] hola\n");
    }

    #[test]
    fn broadcast_ciphertexts_differ_between_recipients() {
        let registry = Registry::new();
        let (_, mut rx1) = add_session(&registry, 1);
        let (_, mut rx2) = add_session(&registry, 2);

        registry.broadcast("lobby", None, MsgType::Server, "[SERVER] prueba.\n");

        let frame1 = rx1.try_recv().expect("frame for 1");
        let frame2 = rx2.try_recv().expect("frame for 2");
        assert_ne!(frame1, frame2);
    }

    #[test]
    fn broadcast_to_empty_room_delivers_nothing() {
        let registry = Registry::new();
        let (_, mut rx) = add_session(&registry, 1);

        let delivered = registry.broadcast("vacia", None, MsgType::Chat, "hola\n");
        assert_eq!(delivered, 0);
        assert!(rx.try_recv().is_err());
    }
}
