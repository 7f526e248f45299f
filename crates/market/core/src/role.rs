//! Roles.
//!
//! Maps the logical roles acting on the market to accounts and, where available, to their
//! signing keys.

use std::{collections::HashMap, fmt, str::FromStr};

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use apus_rpc::Identity;

use crate::config::SettingsError;

/// A logical identity acting on the contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Owner of the market contract; registers and schedules clients.
    Owner,
    /// Prover operator; wires the proof task contract.
    Provider,
    /// End user of the market.
    User,
}

impl Role {
    /// All roles, in display order.
    pub const ALL: [Role; 3] = [Role::Owner, Role::Provider, Role::User];

    /// The lowercase name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Provider => "provider",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The address to private key table.
///
/// Entries are keyed by the address derived from each key, so a key is only ever returned for
/// the account it actually controls.
#[derive(Clone, Default)]
pub struct KeyRing {
    keys: HashMap<Address, PrivateKeySigner>,
    order: Vec<Address>,
}

impl KeyRing {
    /// Builds a key ring from hex encoded private keys.
    pub fn from_hex_keys<'a>(
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, SettingsError> {
        let mut ring = Self::default();
        for (index, key) in keys.into_iter().enumerate() {
            let signer = PrivateKeySigner::from_str(key.trim())
                .map_err(|source| SettingsError::InvalidPrivateKey { index, source })?;
            ring.insert(signer);
        }
        Ok(ring)
    }

    /// Adds a key, replacing any key already held for the same address.
    pub fn insert(&mut self, signer: PrivateKeySigner) {
        let address = signer.address();
        if self.keys.insert(address, signer).is_none() {
            self.order.push(address);
        }
    }

    /// Returns the key controlling `address`, if held.
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&PrivateKeySigner> {
        self.keys.get(address)
    }

    /// The address of the first key added.
    #[must_use]
    pub fn first_address(&self) -> Option<Address> {
        self.order.first().copied()
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing").field("addresses", &self.order).finish()
    }
}

/// The account behind each role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleBook {
    /// Owner of the market contract.
    pub owner: Address,
    /// Prover operator.
    pub provider: Address,
    /// End user.
    pub user: Address,
}

impl RoleBook {
    /// The same account for every role.
    #[must_use]
    pub const fn single(address: Address) -> Self {
        Self { owner: address, provider: address, user: address }
    }

    /// The account configured for `role`.
    #[must_use]
    pub const fn address(&self, role: Role) -> Address {
        match role {
            Role::Owner => self.owner,
            Role::Provider => self.provider,
            Role::User => self.user,
        }
    }
}

/// Resolves roles to identities.
#[derive(Debug, Clone)]
pub struct RoleResolver {
    book: RoleBook,
    keys: KeyRing,
}

impl RoleResolver {
    /// Create a new [`RoleResolver`].
    #[must_use]
    pub fn new(book: RoleBook, keys: KeyRing) -> Self {
        Self { book, keys }
    }

    /// The accounts behind the roles.
    #[must_use]
    pub fn book(&self) -> &RoleBook {
        &self.book
    }

    /// Resolves `role` to its address and key.
    ///
    /// Never fails: a role whose account has no key resolves with no signer, and any attempt to
    /// submit with it is rejected before reaching the network.
    #[must_use]
    pub fn resolve(&self, role: Role) -> Identity {
        let address = self.book.address(role);
        Identity::new(role.as_str(), address, self.keys.get(&address).cloned())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use super::*;

    const KEY: &str = "0x91c6c377cc072cd187fed1caaa6527896f58f10cb20667235c87b07c64b33955";
    const OTHER: Address = address!("0x863c9b8159B3F95687a600B1b21aE159618b31b1");

    fn signer() -> PrivateKeySigner {
        KEY.parse().unwrap()
    }

    #[test]
    fn test_resolve_returns_key_for_mapped_address() {
        let keys = KeyRing::from_hex_keys([KEY]).unwrap();
        let owner = signer().address();
        let resolver = RoleResolver::new(RoleBook { owner, provider: owner, user: OTHER }, keys);

        for role in [Role::Owner, Role::Provider] {
            let identity = resolver.resolve(role);
            assert_eq!(identity.role, role.as_str());
            assert_eq!(identity.address, owner);
            assert_eq!(identity.signer.unwrap().address(), owner);
        }
    }

    #[test]
    fn test_resolve_yields_no_key_for_unmapped_address() {
        let keys = KeyRing::from_hex_keys([KEY]).unwrap();
        let resolver = RoleResolver::new(RoleBook::single(OTHER), keys);

        for role in Role::ALL {
            let identity = resolver.resolve(role);
            assert_eq!(identity.address, OTHER);
            assert!(identity.signer.is_none());
            assert!(identity.signer().is_err());
        }
    }

    #[test]
    fn test_key_ring_accepts_keys_without_prefix_and_dedups() {
        let bare = KEY.trim_start_matches("0x");
        let keys = KeyRing::from_hex_keys([KEY, bare]).unwrap();
        assert_eq!(keys.order.len(), 1);
        assert_eq!(keys.keys.len(), 1);
        assert_eq!(keys.first_address(), Some(signer().address()));
    }

    #[test]
    fn test_key_ring_rejects_garbage() {
        let err = KeyRing::from_hex_keys([KEY, "0xnotakey"]).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidPrivateKey { index: 1, .. }));
    }

    #[test]
    fn test_key_ring_debug_hides_keys() {
        let keys = KeyRing::from_hex_keys([KEY]).unwrap();
        assert!(!format!("{keys:?}").contains("91c6c377"));
    }
}
