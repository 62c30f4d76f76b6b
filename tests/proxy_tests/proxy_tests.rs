//! Tests for the upgrade proxy
//!
//! These tests verify:
//! - Segregation between the admin tag and read/write tags
//! - Upgrading only to deployed implementations
//! - Deployment rules
//! - Admin handover

use std::sync::Arc;

use alloy_primitives::Address;
use feedstore::error::StoreError;
use feedstore::protocol::{AdminCommand, RequestTag};
use feedstore::proxy::UpgradeProxy;
use feedstore::store::{StandardLogic, StoreLogic};

// =============================================================================
// Helper Functions
// =============================================================================

fn admin() -> Address {
    Address::with_last_byte(0xad)
}

fn user() -> Address {
    Address::with_last_byte(0x11)
}

fn v1() -> Address {
    Address::with_last_byte(0x01)
}

fn v2() -> Address {
    Address::with_last_byte(0x02)
}

fn logic(name: &str) -> Arc<dyn StoreLogic> {
    Arc::new(StandardLogic::new(name))
}

fn setup_proxy() -> UpgradeProxy {
    UpgradeProxy::new(admin(), v1(), logic("v1"))
}

const NON_ADMIN_TAGS: [RequestTag; 7] = [
    RequestTag::Write,
    RequestTag::LatestRound,
    RequestTag::LatestSingleFeed,
    RequestTag::LatestSingleFeedAndRound,
    RequestTag::LatestFeed,
    RequestTag::LatestFeedAndRound,
    RequestTag::FeedAtRound,
];

// =============================================================================
// Segregation Tests
// =============================================================================

#[test]
fn test_admin_may_only_use_admin_tag() {
    let proxy = setup_proxy();

    assert!(proxy.authorize(&admin(), RequestTag::Admin).is_ok());
    for tag in NON_ADMIN_TAGS {
        assert!(matches!(
            proxy.authorize(&admin(), tag),
            Err(StoreError::AdminAccess(_))
        ));
    }
}

#[test]
fn test_others_may_not_use_admin_tag() {
    let proxy = setup_proxy();

    assert!(matches!(
        proxy.authorize(&user(), RequestTag::Admin),
        Err(StoreError::AdminAccess(_))
    ));
    for tag in NON_ADMIN_TAGS {
        assert!(proxy.authorize(&user(), tag).is_ok());
    }
}

#[test]
fn test_non_admin_command_rejected() {
    let mut proxy = setup_proxy();
    proxy.deploy(v2(), logic("v2")).unwrap();

    let result = proxy.execute_admin(&user(), AdminCommand::UpgradeTo(v2()));
    assert!(matches!(result, Err(StoreError::AdminAccess(_))));
    assert_eq!(proxy.implementation(), v1());

    let result = proxy.execute_admin(&user(), AdminCommand::ChangeAdmin(user()));
    assert!(matches!(result, Err(StoreError::AdminAccess(_))));
    assert_eq!(proxy.admin(), admin());
}

// =============================================================================
// Upgrade Tests
// =============================================================================

#[test]
fn test_upgrade_to_deployed_implementation() {
    let mut proxy = setup_proxy();
    assert_eq!(proxy.logic().unwrap().name(), "v1");

    proxy.deploy(v2(), logic("v2")).unwrap();
    proxy
        .execute_admin(&admin(), AdminCommand::UpgradeTo(v2()))
        .unwrap();

    assert_eq!(proxy.implementation(), v2());
    assert_eq!(proxy.logic().unwrap().name(), "v2");

    // The previous implementation stays deployed and can be returned to
    proxy
        .execute_admin(&admin(), AdminCommand::UpgradeTo(v1()))
        .unwrap();
    assert_eq!(proxy.logic().unwrap().name(), "v1");
}

#[test]
fn test_upgrade_to_undeployed_address_rejected() {
    let mut proxy = setup_proxy();

    let result = proxy.execute_admin(&admin(), AdminCommand::UpgradeTo(v2()));
    assert!(matches!(result, Err(StoreError::Implementation(_))));

    let result = proxy.execute_admin(&admin(), AdminCommand::UpgradeTo(Address::ZERO));
    assert!(matches!(result, Err(StoreError::Implementation(_))));

    assert_eq!(proxy.implementation(), v1());
}

#[test]
fn test_check_admin_changes_nothing() {
    let mut proxy = setup_proxy();
    proxy.deploy(v2(), logic("v2")).unwrap();

    assert!(proxy
        .check_admin(&admin(), &AdminCommand::UpgradeTo(v2()))
        .is_ok());
    assert!(proxy
        .check_admin(&admin(), &AdminCommand::ChangeAdmin(user()))
        .is_ok());
    assert!(matches!(
        proxy.check_admin(&user(), &AdminCommand::UpgradeTo(v2())),
        Err(StoreError::AdminAccess(_))
    ));
    assert!(matches!(
        proxy.check_admin(&admin(), &AdminCommand::UpgradeTo(Address::with_last_byte(0x99))),
        Err(StoreError::Implementation(_))
    ));

    assert_eq!(proxy.implementation(), v1());
    assert_eq!(proxy.admin(), admin());
}

// =============================================================================
// Deployment Tests
// =============================================================================

#[test]
fn test_deploy_rules() {
    let mut proxy = setup_proxy();

    assert!(proxy.is_deployed(&v1()));
    assert!(!proxy.is_deployed(&v2()));

    assert!(matches!(
        proxy.deploy(v1(), logic("other")),
        Err(StoreError::Implementation(_))
    ));
    assert!(matches!(
        proxy.deploy(Address::ZERO, logic("zero")),
        Err(StoreError::Implementation(_))
    ));

    proxy.deploy(v2(), logic("v2")).unwrap();
    assert!(proxy.is_deployed(&v2()));
    assert_eq!(proxy.implementation(), v1());
}

// =============================================================================
// Admin Handover Tests
// =============================================================================

#[test]
fn test_change_admin() {
    let mut proxy = setup_proxy();
    let new_admin = Address::with_last_byte(0xae);

    proxy
        .execute_admin(&admin(), AdminCommand::ChangeAdmin(new_admin))
        .unwrap();
    assert_eq!(proxy.admin(), new_admin);

    // The old admin becomes an ordinary caller
    assert!(proxy.authorize(&admin(), RequestTag::LatestRound).is_ok());
    assert!(proxy.authorize(&admin(), RequestTag::Admin).is_err());

    // The new admin is segregated
    assert!(proxy.authorize(&new_admin, RequestTag::Admin).is_ok());
    assert!(proxy.authorize(&new_admin, RequestTag::Write).is_err());
}
