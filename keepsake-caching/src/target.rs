//! Contract for objects whose calls can be cached

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::store::CallValue;

/// A target whose methods can be invoked by name.
///
/// The class cache lower-cases method names before calling `invoke`, so
/// implementations match on lower-case names.
#[async_trait]
pub trait CacheTarget: Send + Sync {
    /// Type name used in the callable identity
    fn type_name(&self) -> &str;

    /// Invoke `method` with `args`
    async fn invoke(&self, method: &str, args: &[CallValue]) -> anyhow::Result<CallValue>;
}

/// Named members shared by all users of a target, read and written without caching
pub trait StaticMembers: Send + Sync {
    fn get_member(&self, name: &str) -> Option<CallValue>;

    fn set_member(&self, name: &str, value: CallValue);

    fn has_member(&self, name: &str) -> bool {
        self.get_member(name).is_some()
    }

    /// Remove a member, returning its previous value
    fn remove_member(&self, name: &str) -> Option<CallValue>;
}

/// Lock-guarded member table targets can embed to implement [`StaticMembers`]
#[derive(Debug, Default)]
pub struct MemberTable {
    members: RwLock<HashMap<String, CallValue>>,
}

impl MemberTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StaticMembers for MemberTable {
    fn get_member(&self, name: &str) -> Option<CallValue> {
        self.members.read().get(name).cloned()
    }

    fn set_member(&self, name: &str, value: CallValue) {
        self.members.write().insert(name.to_string(), value);
    }

    fn has_member(&self, name: &str) -> bool {
        self.members.read().contains_key(name)
    }

    fn remove_member(&self, name: &str) -> Option<CallValue> {
        self.members.write().remove(name)
    }
}
