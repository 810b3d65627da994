//! Model-based property tests: a single-threaded sequence of gate calls must
//! agree with a plain map model of the protocol.

use proptest::prelude::*;
use std::collections::HashMap;
use storescope_gate::{GateError, KeyState, ScopeGate};

#[derive(Debug, Clone)]
enum Op {
    Start(u8),
    Wait(u8),
    Done(u8),
    Reset,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..6).prop_map(Op::Start),
        3 => (0u8..6).prop_map(Op::Done),
        2 => (0u8..6).prop_map(Op::Wait),
        1 => Just(Op::Reset),
    ]
}

proptest! {
    #[test]
    fn gate_matches_model(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let gate: ScopeGate<u8> = ScopeGate::new();
        let mut model: HashMap<u8, KeyState> = HashMap::new();

        for op in ops {
            match op {
                Op::Start(key) => {
                    let expected = !model.contains_key(&key);
                    if expected {
                        model.insert(key, KeyState::Running);
                    }
                    prop_assert_eq!(gate.should_start(&key), expected);
                }
                Op::Wait(key) => {
                    // A running key would block forever on one thread.
                    if model.get(&key) != Some(&KeyState::Running) {
                        prop_assert!(!gate.should_wait(&key));
                    }
                }
                Op::Done(key) => {
                    let result = gate.done(&key);
                    match model.get_mut(&key) {
                        Some(state) => {
                            *state = KeyState::Done;
                            prop_assert!(result.is_ok());
                        }
                        None => {
                            let is_not_started = matches!(result, Err(GateError::NotStarted { .. }));
                            prop_assert!(is_not_started);
                        }
                    }
                }
                Op::Reset => {
                    gate.reset();
                    model.clear();
                }
            }

            prop_assert_eq!(gate.len(), model.len());
            let running = model.values().filter(|s| **s == KeyState::Running).count();
            prop_assert_eq!(gate.running_len(), running);
            for (key, state) in &model {
                prop_assert_eq!(gate.state(key), Some(*state));
            }
        }
    }
}
