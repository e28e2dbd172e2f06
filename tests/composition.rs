//! End-to-end composition: materialize, resolve, apply.

use cms_stack::config::parse_config;
use cms_stack::grants::{resolve_grants, GrantLevel};
use cms_stack::integration::IntegrationMode;
use cms_stack::routing::{HttpMethod::*, Materializer, RouteEntry, RouteSpec};
use cms_stack::{compose, CompositionError};

mod common;
use common::{Call, RecordingProvisioner};

#[test]
fn test_scenario_resources_and_multipart() {
    let catalog = common::catalog();
    let entries = [
        RouteEntry::new(RouteSpec::new("resources", [Get, Put, Delete]), "H1"),
        RouteEntry::new(RouteSpec::new("multipart", [Post]), "H2"),
    ];

    let out = Materializer::new(&catalog, IntegrationMode::PassThrough)
        .materialize("api", &entries)
        .unwrap();
    let grants = resolve_grants(&out.pairs);

    assert_eq!(out.surface.bindings.len(), 2);
    assert_eq!(out.surface.method_count(), 5);
    assert_eq!(grants["H1"].level, GrantLevel::ReadWrite);
    assert_eq!(grants["H2"].level, GrantLevel::ReadWrite);
}

#[test]
fn test_scenario_downloader() {
    let catalog = common::catalog();
    let entries = [RouteEntry::new(RouteSpec::new("downloader", [Get]), "H1")];

    let out = Materializer::new(&catalog, IntegrationMode::PassThrough)
        .materialize("api", &entries)
        .unwrap();
    let grants = resolve_grants(&out.pairs);

    assert_eq!(out.surface.bindings.len(), 1);
    assert_eq!(out.surface.method_count(), 1);
    assert_eq!(grants["H1"].level, GrantLevel::Read);
    assert!(!grants.contains_key("H2"));
}

#[test]
fn test_scenario_duplicate_resources() {
    let catalog = common::catalog();
    let entries = [
        RouteEntry::new(RouteSpec::new("resources", [Get]), "H1"),
        RouteEntry::new(RouteSpec::new("resources", [Put]), "H1"),
    ];

    let err = Materializer::new(&catalog, IntegrationMode::PassThrough)
        .materialize("api", &entries)
        .unwrap_err();
    assert_eq!(err, CompositionError::DuplicateRoute { name: "resources".into() });
}

#[test]
fn test_materialization_is_idempotent() {
    let catalog = common::catalog();
    let entries = [
        RouteEntry::new(
            RouteSpec::new("resources", [Get, Put]).with_child(RouteSpec::new("{key}", [Delete])),
            "H1",
        ),
        RouteEntry::new(RouteSpec::new("multipart", [Post]), "H2"),
    ];
    let materializer = Materializer::new(&catalog, IntegrationMode::FormEncoded);

    let first = materializer.materialize("api", &entries).unwrap();
    let second = materializer.materialize("api", &entries).unwrap();
    assert_eq!(first, second);
    assert_eq!(resolve_grants(&first.pairs), resolve_grants(&second.pairs));
}

#[test]
fn test_grandchild_rejected_during_compose() {
    let config = parse_config(
        r#"
        [[handlers]]
        name = "h"

        [[routes]]
        name = "a"
        methods = ["GET"]
        handler = "h"

        [routes.child]
        name = "b"
        methods = ["GET"]

        [routes.child.child]
        name = "c"
        methods = ["GET"]
        "#,
    )
    .unwrap();

    assert_eq!(
        compose(&config).unwrap_err(),
        CompositionError::UnsupportedNesting { route: "a/b".into() }
    );
}

#[test]
fn test_unrouted_handler_gets_no_grant() {
    let mut config = common::profile("cms");
    config.handlers.push(toml::from_str("name = \"idle\"").unwrap());

    let plan = compose(&config).unwrap();
    assert_eq!(plan.grant_level("idle"), None);

    let mut provisioner = RecordingProvisioner::default();
    plan.apply(&mut provisioner).unwrap();
    assert!(provisioner.calls.contains(&Call::Handler("idle".into())));
    assert!(!provisioner
        .calls
        .iter()
        .any(|c| matches!(c, Call::Grant(name, _) if name == "idle")));
}

#[test]
fn test_apply_order() {
    let plan = compose(&common::profile("downloader")).unwrap();
    let mut provisioner = RecordingProvisioner::default();
    let applied = plan.apply(&mut provisioner).unwrap();

    assert_eq!(
        provisioner.calls,
        vec![
            Call::Bucket(plan.bucket.id.clone()),
            Call::Handler("s3-download".into()),
            Call::Surface("cmsApiGateway-ApiGtw".into()),
            Call::Grant("s3-download".into(), "read".into()),
        ]
    );
    assert_eq!(applied.handlers.len(), 1);
}

#[test]
fn test_apply_stops_on_rejection() {
    let plan = compose(&common::profile("cms")).unwrap();
    let mut provisioner = RecordingProvisioner {
        reject_handler: Some("s3-multipart".into()),
        ..Default::default()
    };

    assert!(plan.apply(&mut provisioner).is_err());
    assert!(!provisioner.calls.iter().any(|c| matches!(c, Call::Surface(_) | Call::Grant(..))));
}
