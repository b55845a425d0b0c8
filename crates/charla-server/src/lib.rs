//! Charla chat server.
//!
//! A multi-room text chat service over TCP. Every connection first performs
//! an ephemeral Diffie-Hellman exchange to derive a per-session stream key;
//! all traffic after that travels as sealed frames. Users pick a name with
//! `/nick`, change rooms with `/join`, and everything else they type is
//! relayed to the other occupants of their room.
//!
//! ## Architecture
//!
//! ```text
//! charla-server
//!   ├─ Server      (listener: accepts, spawns one task per connection)
//!   ├─ handler     (handshake + receive loop + writer task)
//!   ├─ Session     (per-connection state and command dispatch)
//!   └─ Registry    (the one piece of shared state: who is where,
//!                   guarded by a single mutex)
//! ```
//!
//! Each connection's socket and key are owned exclusively by its own task;
//! the registry is the only thing tasks share. Broadcasts snapshot their
//! recipients under the registry lock and deliver through per-connection
//! channels after releasing it, so a slow client never stalls the registry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod commands;
mod error;
mod handler;
mod registry;
mod server;
mod session;

pub use error::{HandshakeError, ServerError};
pub use registry::{DepartedSession, Registry, RegistryError, SessionInfo};
pub use server::{Server, ServerConfig};
