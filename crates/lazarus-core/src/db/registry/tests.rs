use super::*;
use lazarus_schema::node::{DeletePolicyDef, FieldKind, ForeignPathDef};

fn user() -> TypeDef {
    TypeDef::new("User")
        .field("name", FieldKind::Text)
        .on_delete(DeletePolicyDef::new().clean_foreign("Shop", ForeignPathDef::path("owner")))
}

fn shop() -> TypeDef {
    TypeDef::new("Shop")
        .field("title", FieldKind::Text)
        .field("owner", FieldKind::reference("User"))
}

#[test]
fn build_derives_reverse_edges() {
    let registry = Registry::builder()
        .register(user())
        .register(shop())
        .build()
        .expect("registry should build");

    let edges = registry.edges_into("User").expect("User is registered");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source_type, "Shop");
    assert_eq!(edges[0].field_path, "owner");
    assert!(
        registry
            .edges_into("Shop")
            .expect("Shop is registered")
            .is_empty()
    );

    let policy = registry.try_get("User").expect("User is registered").policy();
    assert_eq!(policy.foreign[0].target_type, "Shop");
    assert!(!policy.guard.is_active());
}

#[test]
fn edges_are_available_while_registering() {
    let builder = RegistryBuilder::new().register(shop());

    assert_eq!(builder.edges_into("User").len(), 1);
}

#[test]
fn unknown_names_fail_at_call_time() {
    let registry = Registry::builder()
        .register(user())
        .register(shop())
        .build()
        .expect("registry should build");

    assert!(!registry.is_known_type("Ghost"));
    let err = registry.edges_into("Ghost").expect_err("unknown type must fail");
    assert_eq!(err.messages(), vec!["unknown type 'Ghost'".to_string()]);
}

#[test]
fn build_reports_every_configuration_error() {
    let err = Registry::builder()
        .register(
            TypeDef::new("User").on_delete(
                DeletePolicyDef::new()
                    .clean_foreign("Ghost", ForeignPathDef::path("owner"))
                    .clean_foreign("Shop", ForeignPathDef::path("ownr"))
                    .error_on_referenced_except(["Phantom"]),
            ),
        )
        .register(shop())
        .register(shop())
        .register(TypeDef::new("Post").field("author", FieldKind::reference("Author")))
        .build()
        .expect_err("misconfigured registry must not build");

    let messages = err.messages();
    assert_eq!(messages.len(), 5, "unexpected report: {messages:#?}");
    assert!(messages.iter().any(|m| m.contains("registered twice")));
    assert!(messages.iter().any(|m| m.contains("unknown type 'Author'")));
    assert!(messages.iter().any(|m| m.contains("unknown type 'Ghost'")));
    assert!(messages.iter().any(|m| m.contains("'ownr' does not exist")));
    assert!(messages.iter().any(|m| m.contains("unknown type 'Phantom'")));
}

#[test]
fn invalid_definitions_are_reported_under_their_type() {
    let err = Registry::builder()
        .register(TypeDef::new("User").field("deletedAt", FieldKind::Timestamp))
        .build()
        .expect_err("reserved field name must be rejected");

    assert!(err.messages()[0].starts_with("User: "));
}

#[test]
fn into_builder_extends_a_registry() {
    let registry = Registry::builder()
        .register(TypeDef::new("User").field("name", FieldKind::Text))
        .build()
        .expect("registry should build");

    let registry = registry
        .into_builder()
        .register(shop())
        .build()
        .expect("extended registry should build");

    assert_eq!(registry.type_names().collect::<Vec<_>>(), vec!["Shop", "User"]);
    assert_eq!(
        registry.edges_into("User").expect("User is registered").len(),
        1
    );
}
