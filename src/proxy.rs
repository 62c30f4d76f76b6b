//! Upgrade Proxy
//!
//! Routes requests to the current [`StoreLogic`] while the storage itself
//! stays with the host. Two privileged operations exist, both under the
//! admin tag: switching the implementation and handing over the admin role.
//!
//! ## Segregation of duties
//! ```text
//!                 │ admin tag (0x00) │ read / write tags
//! ────────────────┼──────────────────┼──────────────────
//!  admin          │ allowed          │ AdminAccess error
//!  anyone else    │ AdminAccess error│ forwarded
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;

use crate::error::{Result, StoreError};
use crate::protocol::{AdminCommand, RequestTag};
use crate::store::StoreLogic;

/// Proxy state: admin identity, current implementation, deployed implementations
pub struct UpgradeProxy {
    /// The only identity allowed to issue admin commands
    admin: Address,

    /// Address requests are currently forwarded to
    implementation: Address,

    /// Every implementation deployed so far, keyed by address
    registry: HashMap<Address, Arc<dyn StoreLogic>>,
}

impl UpgradeProxy {
    /// Create a proxy pointing at `logic` deployed at `implementation`
    pub fn new(admin: Address, implementation: Address, logic: Arc<dyn StoreLogic>) -> Self {
        let mut registry = HashMap::new();
        registry.insert(implementation, logic);

        Self {
            admin,
            implementation,
            registry,
        }
    }

    /// Make an implementation available at `address`
    ///
    /// Deployed implementations are immutable; an occupied address is rejected.
    pub fn deploy(&mut self, address: Address, logic: Arc<dyn StoreLogic>) -> Result<()> {
        if address == Address::ZERO {
            return Err(StoreError::Implementation(
                "cannot deploy at the zero address".to_string(),
            ));
        }
        if self.registry.contains_key(&address) {
            return Err(StoreError::Implementation(format!(
                "an implementation is already deployed at {}",
                address
            )));
        }

        tracing::info!(%address, name = logic.name(), "Implementation deployed");
        self.registry.insert(address, logic);
        Ok(())
    }

    /// Check that `caller` may issue a request carrying `tag`
    pub fn authorize(&self, caller: &Address, tag: RequestTag) -> Result<()> {
        let is_admin = *caller == self.admin;
        match (tag.is_admin(), is_admin) {
            (true, true) | (false, false) => Ok(()),
            (true, false) => Err(StoreError::AdminAccess(format!(
                "{} is not the proxy admin",
                caller
            ))),
            (false, true) => Err(StoreError::AdminAccess(
                "the proxy admin may not read or write feeds".to_string(),
            )),
        }
    }

    /// Execute a privileged command on behalf of `caller`
    pub fn execute_admin(&mut self, caller: &Address, command: AdminCommand) -> Result<()> {
        self.check_admin(caller, &command)?;
        self.apply_admin(command)
    }

    /// Check that `command` would succeed for `caller` without changing anything
    pub fn check_admin(&self, caller: &Address, command: &AdminCommand) -> Result<()> {
        self.authorize(caller, RequestTag::Admin)?;

        if let AdminCommand::UpgradeTo(address) = command {
            if !self.is_deployed(address) {
                return Err(StoreError::Implementation(format!(
                    "no implementation deployed at {}",
                    address
                )));
            }
        }
        Ok(())
    }

    /// Apply an admin command without the caller check (journal replay)
    pub(crate) fn apply_admin(&mut self, command: AdminCommand) -> Result<()> {
        match command {
            AdminCommand::UpgradeTo(address) => self.upgrade_to(address),
            AdminCommand::ChangeAdmin(address) => {
                tracing::info!(old = %self.admin, new = %address, "Proxy admin changed");
                self.admin = address;
                Ok(())
            }
        }
    }

    fn upgrade_to(&mut self, address: Address) -> Result<()> {
        let logic = self.registry.get(&address).ok_or_else(|| {
            StoreError::Implementation(format!("no implementation deployed at {}", address))
        })?;

        tracing::info!(
            from = %self.implementation,
            to = %address,
            name = logic.name(),
            "Proxy upgraded"
        );
        self.implementation = address;
        Ok(())
    }

    /// The implementation requests are currently forwarded to
    pub fn logic(&self) -> Result<Arc<dyn StoreLogic>> {
        self.registry.get(&self.implementation).cloned().ok_or_else(|| {
            StoreError::Implementation(format!(
                "no implementation deployed at {}",
                self.implementation
            ))
        })
    }

    /// Current implementation address
    pub fn implementation(&self) -> Address {
        self.implementation
    }

    /// Current admin identity
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Is an implementation deployed at `address`
    pub fn is_deployed(&self, address: &Address) -> bool {
        self.registry.contains_key(address)
    }
}

impl fmt::Debug for UpgradeProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeProxy")
            .field("admin", &self.admin)
            .field("implementation", &self.implementation)
            .field("deployed", &self.registry.len())
            .finish()
    }
}
