//! Per-connection session state and command dispatch.
//!
//! A `Session` owns one user's name, room, and symmetric key, and turns
//! each decrypted line into registry operations and replies. All of its
//! methods are synchronous: replies and broadcasts go through unbounded
//! channels, so dispatch never blocks and can be tested without a socket.
//!
//! Dropping a `Session` is the teardown path. The `Drop` impl removes the
//! registry entry and announces the departure, so an erroring or panicking
//! connection task can never leave a stale entry behind.

use std::sync::Arc;

use bytes::Bytes;
use charla_crypto::KEY_LENGTH;
use charla_proto::{MsgType, seal_line};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    commands::{Command, is_reserved_name, parse_command},
    registry::{Registry, RegistryError},
};

/// One connected user's server-side state.
pub(crate) struct Session {
    registry: Arc<Registry>,
    id: u64,
    name: String,
    room: String,
    key: [u8; KEY_LENGTH],
    outbound: UnboundedSender<Bytes>,
}

impl Session {
    /// Registers a new session and runs the arrival protocol: a private
    /// welcome line, then a join announcement to the rest of the room.
    pub(crate) fn register(
        registry: Arc<Registry>,
        id: u64,
        key: [u8; KEY_LENGTH],
        outbound: UnboundedSender<Bytes>,
    ) -> Self {
        let name = registry.register(id, key, outbound.clone());
        let session = Self {
            registry,
            id,
            name,
            room: crate::registry::DEFAULT_ROOM.to_owned(),
            key,
            outbound,
        };

        session
            .send_system(&format!("buenas {}, estás en la sala '{}'.\n", session.name, session.room));
        session.registry.broadcast(
            &session.room,
            Some(session.id),
            MsgType::Server,
            &format!("[SERVER] {} se ha unido.\n", session.name),
        );

        session
    }

    /// The session's symmetric key.
    pub(crate) fn key(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Dispatches one decrypted line.
    pub(crate) fn handle_line(&mut self, line: &str) {
        let line = line.strip_suffix('\n').unwrap_or(line);
        if line.is_empty() {
            return;
        }

        if line.starts_with('/') {
            match parse_command(line) {
                Command::Nick(Some(name)) => self.cmd_nick(name),
                Command::Nick(None) => self.send_system("[SERVER] uso: /nick <nombre>.\n"),
                Command::Join(Some(room)) => self.cmd_join(room),
                Command::Join(None) => self.send_system("[SERVER] uso: /join <sala>.\n"),
                Command::Unknown => self.send_system("[SERVER] comando desconocido.\n"),
            }
        } else {
            self.registry.broadcast(
                &self.room,
                Some(self.id),
                MsgType::Chat,
                &format!("[{}] {line}\n", self.name),
            );
        }
    }

    fn cmd_nick(&mut self, new_name: &str) {
        if is_reserved_name(new_name) {
            self.send_system("[SERVER] buen intento.\n");
            return;
        }
        if new_name == self.name {
            self.send_system("[SERVER] ya tienes ese nombre.\n");
            return;
        }

        match self.registry.rename(self.id, new_name) {
            Ok(old_name) => {
                self.name = new_name.to_owned();
                self.send_system(&format!("[SERVER] ahora eres {}.\n", self.name));
                self.registry.broadcast(
                    &self.room,
                    Some(self.id),
                    MsgType::Server,
                    &format!("[SERVER] {old_name} ahora es {}.\n", self.name),
                );
            },
            Err(RegistryError::NameInUse { .. }) => {
                self.send_system(&format!(
                    "[SERVER] el nombre '{new_name}' ya está en uso en esta sala.\n"
                ));
            },
            Err(RegistryError::UnknownSession(id)) => {
                tracing::error!(conn_id = id, "rename for a session missing from the registry");
            },
        }
    }

    fn cmd_join(&mut self, new_room: &str) {
        if new_room == self.room {
            self.send_system("[SERVER] ya estás en esa sala.\n");
            return;
        }

        match self.registry.move_room(self.id, new_room) {
            Ok(old_room) => {
                self.room = new_room.to_owned();
                self.registry.broadcast(
                    &old_room,
                    Some(self.id),
                    MsgType::Server,
                    &format!("[SERVER] {} se ha pirado.\n", self.name),
                );
                self.registry.broadcast(
                    &self.room,
                    Some(self.id),
                    MsgType::Server,
                    &format!("[SERVER] {} se ha unido.\n", self.name),
                );
                self.send_system(&format!("[SERVER] ahora estás en la sala '{}'.\n", self.room));
            },
            Err(RegistryError::NameInUse { .. }) => {
                self.send_system(&format!(
                    "[SERVER] tu nombre '{}' ya está cogido en la sala '{new_room}'.\n",
                    self.name
                ));
            },
            Err(RegistryError::UnknownSession(id)) => {
                tracing::error!(conn_id = id, "move for a session missing from the registry");
            },
        }
    }

    fn send_system(&self, text: &str) {
        // receiver gone means the writer task already exited; the receive
        // loop will notice on its own
        let _ = self.outbound.send(seal_line(MsgType::Server, text, &self.key));
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(gone) = self.registry.unregister(self.id) {
            self.registry.broadcast(
                &gone.room,
                None,
                MsgType::Server,
                &format!("[SERVER] {} se ha pirado.\n", gone.name),
            );
        }
    }
}
