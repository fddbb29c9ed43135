//! Use-case taxonomy selecting which default serialization context applies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Subsystem a serialization operation is performed for.
///
/// The set is closed: environments keep exactly one context slot per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    /// Peer-to-peer messaging between nodes
    P2p,
    /// Server side of the RPC interface
    RpcServer,
    /// Client side of the RPC interface
    RpcClient,
    /// Durable storage
    Storage,
    /// Test harnesses
    Testing,
}

impl UseCase {
    /// Every use case, in environment slot order
    pub const ALL: [UseCase; 5] = [
        UseCase::P2p,
        UseCase::RpcServer,
        UseCase::RpcClient,
        UseCase::Storage,
        UseCase::Testing,
    ];
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UseCase::P2p => write!(f, "P2P"),
            UseCase::RpcServer => write!(f, "RPCServer"),
            UseCase::RpcClient => write!(f, "RPCClient"),
            UseCase::Storage => write!(f, "Storage"),
            UseCase::Testing => write!(f, "Testing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_use_cases_are_distinct() {
        let set: std::collections::HashSet<_> = UseCase::ALL.iter().collect();
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_use_case_serde_names() {
        let json = serde_json::to_string(&UseCase::RpcServer).unwrap();
        assert_eq!(json, "\"rpc_server\"");

        let parsed: UseCase = serde_json::from_str("\"p2p\"").unwrap();
        assert_eq!(parsed, UseCase::P2p);
    }
}
