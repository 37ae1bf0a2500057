use crate::test::TestSetup;
use crate::*;
use soroban_sdk::{testutils::Address as _, IntoVal};

struct RbacSetup<'a> {
    s: TestSetup<'a>,
    operator: Address,
    pauser: Address,
    viewer: Address,
}

impl<'a> RbacSetup<'a> {
    fn new() -> Self {
        let s = TestSetup::new();
        let operator = Address::generate(&s.env);
        let pauser = Address::generate(&s.env);
        let viewer = Address::generate(&s.env);
        s.escrow.grant_role(&s.admin, &operator, &Role::Operator);
        s.escrow.grant_role(&s.admin, &pauser, &Role::Pauser);
        s.escrow.grant_role(&s.admin, &viewer, &Role::Viewer);
        Self {
            s,
            operator,
            pauser,
            viewer,
        }
    }
}

#[test]
fn test_roles_are_assigned() {
    let r = RbacSetup::new();
    assert_eq!(r.s.escrow.get_role(&r.operator), Some(Role::Operator));
    assert_eq!(r.s.escrow.get_role(&r.pauser), Some(Role::Pauser));
    assert!(r.s.escrow.has_role(&r.viewer, &Role::Viewer));
    assert!(!r.s.escrow.has_role(&r.viewer, &Role::Operator));
    assert_eq!(r.s.escrow.get_role(&r.s.depositor), None);
}

#[test]
fn test_grant_emits_audit_event() {
    let s = TestSetup::new();
    let target = Address::generate(&s.env);
    s.escrow.grant_role(&s.admin, &target, &Role::Operator);
    assert!(s.emitted((symbol_short!("rbac"), symbol_short!("grant")).into_val(&s.env)));

    s.escrow.revoke_role(&s.admin, &target);
    assert!(s.emitted((symbol_short!("rbac"), symbol_short!("revoke")).into_val(&s.env)));
    assert_eq!(s.escrow.get_role(&target), None);
}

#[test]
fn test_operator_cannot_pause_until_made_pauser() {
    let s = TestSetup::new();
    let x = Address::generate(&s.env);

    s.escrow.grant_role(&s.admin, &x, &Role::Operator);
    assert_eq!(
        s.escrow.try_pause_contract(&x),
        Err(Ok(Error::Unauthorized))
    );
    assert!(!s.escrow.is_paused());

    s.escrow.grant_role(&s.admin, &x, &Role::Pauser);
    s.escrow.pause_contract(&x);
    assert!(s.escrow.is_paused());
}

#[test]
fn test_pauser_cannot_unpause() {
    let r = RbacSetup::new();
    r.s.escrow.pause_contract(&r.pauser);
    assert_eq!(
        r.s.escrow.try_unpause_contract(&r.pauser),
        Err(Ok(Error::Unauthorized))
    );
    r.s.escrow.unpause_contract(&r.s.admin);
    assert!(!r.s.escrow.is_paused());
}

#[test]
fn test_only_admin_manages_roles() {
    let r = RbacSetup::new();
    let target = Address::generate(&r.s.env);

    for caller in [&r.operator, &r.pauser, &r.viewer] {
        assert_eq!(
            r.s.escrow.try_grant_role(caller, &target, &Role::Operator),
            Err(Ok(Error::Unauthorized))
        );
        assert_eq!(
            r.s.escrow.try_revoke_role(caller, &r.operator),
            Err(Ok(Error::Unauthorized))
        );
    }
    assert_eq!(r.s.escrow.get_role(&target), None);
    assert_eq!(r.s.escrow.get_role(&r.operator), Some(Role::Operator));
}

#[test]
fn test_revoked_operator_loses_release() {
    let r = RbacSetup::new();
    r.s.lock(1, 100);
    r.s.escrow.revoke_role(&r.s.admin, &r.operator);
    assert_eq!(
        r.s.escrow
            .try_release_funds(&r.operator, &1, &r.s.contributor),
        Err(Ok(Error::Unauthorized))
    );
}

#[test]
fn test_viewer_has_no_write_access() {
    let r = RbacSetup::new();
    r.s.lock(1, 100);
    assert_eq!(
        r.s.escrow.try_release_funds(&r.viewer, &1, &r.s.contributor),
        Err(Ok(Error::Unauthorized))
    );
    assert_eq!(
        r.s.escrow.try_pause_contract(&r.viewer),
        Err(Ok(Error::Unauthorized))
    );
}

#[test]
fn test_last_admin_cannot_be_removed() {
    let s = TestSetup::new();
    assert_eq!(
        s.escrow.try_revoke_role(&s.admin, &s.admin),
        Err(Ok(Error::LastAdmin))
    );
    assert_eq!(
        s.escrow.try_grant_role(&s.admin, &s.admin, &Role::Operator),
        Err(Ok(Error::LastAdmin))
    );

    let second = Address::generate(&s.env);
    s.escrow.grant_role(&s.admin, &second, &Role::Admin);
    s.escrow.grant_role(&second, &s.admin, &Role::Operator);
    assert_eq!(s.escrow.get_role(&s.admin), Some(Role::Operator));
    assert_eq!(
        s.escrow.try_revoke_role(&second, &second),
        Err(Ok(Error::LastAdmin))
    );
}
