use super::{CallProvider, TransportError};
use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

// For testing purposes: a scripted CallProvider keyed by contract address and
// 4-byte function selector.

#[derive(Debug, Clone)]
enum MockBehavior {
    Respond(Bytes),
    NodeError(String),
    TransportFailure,
}

#[derive(Debug, Default)]
pub struct MockCallProvider {
    behaviors: Mutex<HashMap<(Address, [u8; 4]), MockBehavior>>,
    fail_all_transport: Mutex<bool>,
}

impl MockCallProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful return payload for `(contract, selector)`.
    pub fn respond(&self, to: Address, selector: [u8; 4], ret: Bytes) {
        self.behaviors
            .lock()
            .expect("mock lock poisoned")
            .insert((to, selector), MockBehavior::Respond(ret));
    }

    /// Script a node-reported call failure (the "venue answered but the call
    /// reverted" class).
    pub fn fail_with_node_error(&self, to: Address, selector: [u8; 4], message: &str) {
        self.behaviors
            .lock()
            .expect("mock lock poisoned")
            .insert((to, selector), MockBehavior::NodeError(message.to_string()));
    }

    /// Script a transport-level failure for `(contract, selector)`.
    pub fn fail_with_transport_error(&self, to: Address, selector: [u8; 4]) {
        self.behaviors
            .lock()
            .expect("mock lock poisoned")
            .insert((to, selector), MockBehavior::TransportFailure);
    }

    /// Simulate the node being unreachable for every call.
    pub fn fail_all_transport(&self) {
        *self.fail_all_transport.lock().expect("mock lock poisoned") = true;
    }
}

#[async_trait]
impl CallProvider for MockCallProvider {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, TransportError> {
        if *self.fail_all_transport.lock().expect("mock lock poisoned") {
            return Err(TransportError::Timeout(Duration::from_secs(0)));
        }
        let selector: [u8; 4] = data
            .get(0..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| TransportError::MalformedResponse("calldata too short".into()))?;
        let behavior = self
            .behaviors
            .lock()
            .expect("mock lock poisoned")
            .get(&(to, selector))
            .cloned();
        match behavior {
            Some(MockBehavior::Respond(ret)) => Ok(ret),
            Some(MockBehavior::NodeError(message)) => {
                Err(TransportError::Node { code: 3, message })
            }
            Some(MockBehavior::TransportFailure) => {
                Err(TransportError::Timeout(Duration::from_secs(0)))
            }
            None => Err(TransportError::Node {
                code: 3,
                message: format!("no scripted response for {to:#x} selector {selector:02x?}"),
            }),
        }
    }
}

/// ABI-encodes a single 32-byte word holding an address.
pub fn word_address(value: Address) -> Vec<u8> {
    let mut word = vec![0u8; 12];
    word.extend_from_slice(value.as_slice());
    word
}

/// ABI-encodes a single 32-byte word holding an unsigned integer.
pub fn word_u256(value: U256) -> Vec<u8> {
    value.to_be_bytes::<32>().to_vec()
}

/// ABI-encodes a single 32-byte word holding a signed integer (sign-extended).
pub fn word_i256(value: i64) -> Vec<u8> {
    alloy_primitives::I256::try_from(value)
        .expect("i64 always fits I256")
        .to_be_bytes::<32>()
        .to_vec()
}

/// Concatenates words into a return payload.
pub fn return_data(words: &[Vec<u8>]) -> Bytes {
    let mut out = Vec::with_capacity(words.len() * 32);
    for word in words {
        out.extend_from_slice(word);
    }
    out.into()
}

/// ABI-encodes a `uint256[]` return value (offset, length, elements).
pub fn return_u256_array(values: &[U256]) -> Bytes {
    let mut words = vec![word_u256(U256::from(32u8)), word_u256(U256::from(values.len()))];
    for v in values {
        words.push(word_u256(*v));
    }
    return_data(&words)
}
