//! Role-based access control
//!
//! Privileged entry points ask for a [`Capability`]; roles map to a fixed
//! capability set and addresses are granted roles at deployment time.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{ProtocolError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Multisig; can do everything
    Governance,
    /// Strategy operator; can unwind and sweep
    Strategist,
    /// Automation; can push idle funds and harvest
    Keeper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Earn,
    Harvest,
    WithdrawAll,
    Sweep,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Earn => write!(f, "earn"),
            Capability::Harvest => write!(f, "harvest"),
            Capability::WithdrawAll => write!(f, "withdraw all"),
            Capability::Sweep => write!(f, "sweep"),
        }
    }
}

impl Role {
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Governance => &[
                Capability::Earn,
                Capability::Harvest,
                Capability::WithdrawAll,
                Capability::Sweep,
            ],
            Role::Strategist => &[Capability::WithdrawAll, Capability::Sweep],
            Role::Keeper => &[Capability::Earn, Capability::Harvest],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    grants: HashMap<Role, HashSet<Address>>,
}

impl AccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, role: Role, account: Address) {
        self.grants.entry(role).or_default().insert(account);
    }

    pub fn revoke(&mut self, role: Role, account: Address) {
        if let Some(members) = self.grants.get_mut(&role) {
            members.remove(&account);
        }
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.grants
            .get(&role)
            .map(|members| members.contains(&account))
            .unwrap_or(false)
    }

    pub fn can(&self, account: Address, capability: Capability) -> bool {
        self.grants.iter().any(|(role, members)| {
            members.contains(&account) && role.capabilities().contains(&capability)
        })
    }

    pub fn require(&self, account: Address, capability: Capability) -> Result<()> {
        if self.can(account, capability) {
            Ok(())
        } else {
            Err(ProtocolError::missing_capability(account, capability))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_capabilities() {
        let gov = Address::with_last_byte(1);
        let strategist = Address::with_last_byte(2);
        let keeper = Address::with_last_byte(3);
        let stranger = Address::with_last_byte(4);

        let mut acl = AccessControl::new();
        acl.grant(Role::Governance, gov);
        acl.grant(Role::Strategist, strategist);
        acl.grant(Role::Keeper, keeper);

        assert!(acl.can(gov, Capability::Sweep));
        assert!(acl.can(strategist, Capability::WithdrawAll));
        assert!(!acl.can(strategist, Capability::Earn));
        assert!(acl.can(keeper, Capability::Harvest));
        assert!(!acl.can(keeper, Capability::WithdrawAll));
        assert!(!acl.can(stranger, Capability::Earn));
    }

    #[test]
    fn test_require_and_revoke() {
        let keeper = Address::with_last_byte(3);
        let mut acl = AccessControl::new();
        acl.grant(Role::Keeper, keeper);
        assert!(acl.require(keeper, Capability::Earn).is_ok());

        acl.revoke(Role::Keeper, keeper);
        let err = acl.require(keeper, Capability::Earn).unwrap_err();
        assert_eq!(err.kind(), "PERMISSION_DENIED");
        assert!(!acl.has_role(Role::Keeper, keeper));
    }
}
