//! Registry invariant under randomized operation sequences.
//!
//! Within one room no two sessions may ever hold the same display name.
//! The registry enforces this at rename/move time; this test hammers the
//! mutation surface with arbitrary interleavings and checks the invariant
//! after every step.

use std::collections::HashSet;

use charla_server::Registry;
use proptest::prelude::*;
use tokio::sync::mpsc;

const NAME_POOL: &[&str] = &["ana", "bob", "carmen", "dora"];
const ROOM_POOL: &[&str] = &["lobby", "x", "y"];

#[derive(Debug, Clone)]
enum Op {
    Register(u64),
    Rename(u64, usize),
    Move(u64, usize),
    Unregister(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..8).prop_map(Op::Register),
        (0u64..8, 0usize..NAME_POOL.len()).prop_map(|(id, n)| Op::Rename(id, n)),
        (0u64..8, 0usize..ROOM_POOL.len()).prop_map(|(id, r)| Op::Move(id, r)),
        (0u64..8).prop_map(Op::Unregister),
    ]
}

proptest! {
    #[test]
    fn no_room_ever_holds_duplicate_names(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let registry = Registry::new();
        let mut receivers = Vec::new();
        let mut registered = HashSet::new();

        for op in ops {
            match op {
                Op::Register(id) => {
                    if registered.insert(id) {
                        let (tx, rx) = mpsc::unbounded_channel();
                        registry.register(id, [id as u8; 32], tx);
                        receivers.push(rx);
                    }
                },
                Op::Rename(id, n) => {
                    // rejections are expected; the invariant below is what matters
                    let _ = registry.rename(id, NAME_POOL[n]);
                },
                Op::Move(id, r) => {
                    let _ = registry.move_room(id, ROOM_POOL[r]);
                },
                Op::Unregister(id) => {
                    registry.unregister(id);
                    registered.remove(&id);
                },
            }

            let mut seen = HashSet::new();
            for session in registry.sessions() {
                prop_assert!(
                    seen.insert((session.name.clone(), session.room.clone())),
                    "duplicate name '{}' in room '{}'",
                    session.name,
                    session.room,
                );
            }
        }
    }
}
