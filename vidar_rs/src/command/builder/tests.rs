use std::fs;

use serde_json::json;
use tempfile::tempdir;
use vidar_common::OptionKind;

use super::*;

fn noop() -> HandlerMap {
    HandlerMap::new().fallback(|_| async { Ok(()) })
}

fn build(builder: CommandBuilder) -> ConfigResult<Arc<CommandSpec>> {
    builder.action(|_| async { Ok(()) })
}

fn people() -> CommandBuilder {
    CommandBuilder::new("people", "Manage people")
        .argument("group add <name> <age: int>")
        .argument("group get <name>")
}

#[test]
fn declarations_build_the_tree() {
    let spec = build(people()).unwrap();
    let group = spec.tree().subgroup("group").unwrap();
    assert_eq!(group.description, PLACEHOLDER_DESCRIPTION);
    let names: Vec<&str> = group.subcommands.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["add", "get"]);

    let add = spec.arguments(&PathKey::nested("group", "add")).unwrap();
    assert_eq!(add.len(), 2);
    assert_eq!(add[1].name, "age");
    assert_eq!(add[1].datatype, ArgType::Integer);
    assert!(add.iter().all(|a| a.required));
    assert_eq!(spec.arguments(&PathKey::nested("group", "get")).unwrap().len(), 1);
}

#[test]
fn undeclared_paths_get_placeholder_nodes() {
    let spec = build(
        CommandBuilder::new("subc", "Subcommands")
            .argument("set <color> [msg]")
            .argument("get")
            .argument("admin reset <who: user>"),
    )
    .unwrap();
    let tree = spec.tree();
    assert_eq!(tree.subcommand("set").unwrap().description, PLACEHOLDER_DESCRIPTION);
    assert_eq!(tree.subcommand("get").unwrap().description, PLACEHOLDER_DESCRIPTION);
    let admin = tree.subgroup("admin").unwrap();
    assert_eq!(admin.subcommand("reset").unwrap().description, PLACEHOLDER_DESCRIPTION);

    let err = build(CommandBuilder::new("subc", "Subcommands").argument("Get")).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidName { .. }));
}

#[test]
fn redeclaring_a_path_is_a_duplicate() {
    let err = build(people().argument("group add")).unwrap_err();
    assert_eq!(err, ConfigError::duplicate("subcommand", "group add"));

    let err = build(people().argument("group add <name>")).unwrap_err();
    assert_eq!(err, ConfigError::duplicate("argument", "group add name"));
}

#[test]
fn arguments_attach_to_declared_subcommands() {
    let spec = build(
        CommandBuilder::new("subc", "Subcommands")
            .subcommand("set", "Set a color")
            .argument("set <color: red|green|blue>")
            .argument("clear"),
    )
    .unwrap();
    let set = spec.tree().subcommand("set").unwrap();
    assert_eq!(set.description, "Set a color");
    assert_eq!(set.arguments[0].choices.len(), 3);
    assert!(spec.tree().subcommand("clear").unwrap().arguments.is_empty());
}

#[test]
fn first_error_wins() {
    let err = build(
        CommandBuilder::new("poisoned", "Broken")
            .argument("<unclosed")
            .subcommand("Upper", "Invalid too")
            .require("@"),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Grammar { .. }), "{err}");
}

#[test]
fn names_are_validated() {
    assert!(matches!(
        build(CommandBuilder::new("Ping", "Uppercase")),
        Err(ConfigError::InvalidName { .. })
    ));
    assert!(matches!(
        build(CommandBuilder::new("ping", "ok").subgroup("Admin", "Uppercase")),
        Err(ConfigError::InvalidName { .. })
    ));
    assert!(matches!(
        build(CommandBuilder::new("ping", "")),
        Err(ConfigError::BelowMinimum { .. })
    ));
}

#[test]
fn required_cannot_follow_optional() {
    let err = build(CommandBuilder::new("order", "Ordering").argument("[a] <b>")).unwrap_err();
    assert!(matches!(err, ConfigError::Predicate(ref msg) if msg.contains("'b'")));

    let err = build(
        CommandBuilder::new("order", "Ordering")
            .argument("[a]")
            .argument("<b>"),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Predicate(_)));
}

#[test]
fn root_arguments_exclude_children() {
    let err = build(
        CommandBuilder::new("mixed", "Mixed")
            .argument("<a>")
            .subcommand("sub", "A subcommand"),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Predicate(_)));

    let err = build(
        CommandBuilder::new("mixed", "Mixed")
            .subcommand("sub", "A subcommand")
            .argument("<a>"),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Predicate(_)));
}

#[test]
fn subcommand_cannot_become_a_group() {
    let err = build(
        CommandBuilder::new("nest", "Nesting")
            .subcommand("get", "Get")
            .subcommand("get more", "More"),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Predicate(ref msg) if msg.contains("'get'")));
}

#[test]
fn docs_resolve_references() {
    let fr: BTreeMap<String, String> = [
        (DEFAULT_KEY.to_string(), "Fetch one".to_string()),
        ("fr".to_string(), "Obtenir une personne".to_string()),
    ]
    .into();
    let spec = build(
        people()
            .docs([
                (DEFAULT_KEY, "People tools"),
                ("group", "Group things"),
                ("group add", "Add someone"),
                ("group add <name: string>", "Their name"),
            ])
            .docs([("group get", DocEntry::Localized(fr))]),
    )
    .unwrap();

    assert_eq!(spec.description(), "People tools");
    let group = spec.tree().subgroup("group").unwrap();
    assert_eq!(group.description, "Group things");
    let add = group.subcommand("add").unwrap();
    assert_eq!(add.description, "Add someone");
    assert_eq!(add.argument("name").unwrap().description, "Their name");
    assert_eq!(add.argument("age").unwrap().description, PLACEHOLDER_DESCRIPTION);

    let get = group.subcommand("get").unwrap();
    assert_eq!(get.description, "Fetch one");
    assert_eq!(get.localizations["fr"], "Obtenir une personne");
}

#[test]
fn docs_for_missing_targets_fail() {
    let err = build(people().docs([("group remove", "Nothing here")])).unwrap_err();
    assert_eq!(
        err,
        ConfigError::not_found("documentation reference", "group remove")
    );

    let err = build(people().docs([("group add <nickname>", "Nope")])).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

#[test]
fn docs_load_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.yaml");
    fs::write(
        &path,
        "group add: Add someone\n\"group add name\":\n  $default: Their name\n  de: Ihr Name\n",
    )
    .unwrap();

    let spec = build(people().docs_file(&path)).unwrap();
    let add = spec.tree().subgroup("group").unwrap().subcommand("add").unwrap();
    assert_eq!(add.description, "Add someone");
    let name = add.argument("name").unwrap();
    assert_eq!(name.description, "Their name");
    assert_eq!(name.localizations["de"], "Ihr Name");

    let err = build(people().docs_file(dir.path().join("missing.json"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn localizations_need_known_locales() {
    let spec = build(CommandBuilder::new("ping", "Pong").localize("fr", "Répond pong")).unwrap();
    assert_eq!(spec.localizations()["fr"], "Répond pong");
    assert_eq!(spec.payload().description_localizations["fr"], "Répond pong");

    let err = build(CommandBuilder::new("ping", "Pong").localize("klingon", "Qapla")).unwrap_err();
    assert_eq!(err, ConfigError::not_found("locale", "klingon"));
}

#[test]
fn handler_routes_must_exist() {
    let err = people()
        .actions(HandlerMap::new().route("group remove", |_| async { Ok(()) }))
        .unwrap_err();
    assert_eq!(err, ConfigError::not_found("handler route", "group remove"));

    let err = people()
        .actions(noop().fallback(|_| async { Ok(()) }))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Duplicate { .. }));

    let spec = people()
        .actions(noop().route("group", |_| async { Ok(()) }))
        .unwrap();
    match spec.handler() {
        Handler::Routes(table) => assert_eq!(table.len(), 2),
        Handler::Single(_) => panic!("expected a route table"),
    }
}

#[test]
fn autocomplete_needs_a_starred_argument() {
    let err = build(
        CommandBuilder::new("hero", "Heroes")
            .argument("<hero>")
            .autocomplete("hero", |_| async { Ok(Vec::new()) }),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Predicate(ref msg) if msg.contains("'*'")));

    let err = build(
        CommandBuilder::new("hero", "Heroes")
            .argument("<*hero>")
            .autocomplete("villain", |_| async { Ok(Vec::new()) }),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));

    let err = build(
        CommandBuilder::new("hero", "Heroes")
            .argument("<*hero>")
            .autocomplete_all(|_| async { Ok(Vec::new()) })
            .autocomplete_all(|_| async { Ok(Vec::new()) }),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Duplicate { .. }));

    let spec = build(
        CommandBuilder::new("hero", "Heroes")
            .argument("<*hero>")
            .autocomplete("<*hero: string>", |_| async { Ok(Vec::new()) }),
    )
    .unwrap();
    assert!(spec.autocomplete_for(&PathKey::root(), "hero").is_some());
    assert!(spec.autocomplete_for(&PathKey::root(), "other").is_none());
}

#[test]
fn typed_choices_decide_the_datatype() {
    let spec = build(
        CommandBuilder::new("dice", "Roll dice").argument_with(
            ArgumentOptions::new("<sides>")
                .with_description("Number of sides")
                .with_choices([4i64, 6, 20]),
        ),
    )
    .unwrap();
    let sides = &spec.tree().arguments[0];
    assert_eq!(sides.datatype, ArgType::Integer);
    assert_eq!(sides.description, "Number of sides");
    assert_eq!(sides.choices[2], ChoiceValue::Integer(20));

    let err = build(CommandBuilder::new("dice", "Roll dice").argument_with(
        ArgumentOptions::new("<sides: int>").with_choices(["four", "six"]),
    ))
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidType { .. }));

    let err = build(CommandBuilder::new("dice", "Roll dice").argument_with(
        ArgumentOptions::new("<sides>")
            .with_choices([4i64, 6])
            .with_autocomplete(true),
    ))
    .unwrap_err();
    assert!(matches!(err, ConfigError::Exclusive { .. }));
}

#[test]
fn explicit_bounds_follow_the_datatype() {
    let spec = build(
        CommandBuilder::new("scale", "Scale a value").argument_with(
            ArgumentOptions::new("[ratio: float]")
                .with_min(0.5)
                .with_max(2i64),
        ),
    )
    .unwrap();
    let ratio = &spec.tree().arguments[0];
    assert_eq!(ratio.min, Some(Number::Float(0.5)));
    assert_eq!(ratio.max, Some(Number::Float(2.0)));
    assert!(!ratio.required);

    let spec = build(
        CommandBuilder::new("say", "Say something").argument_with(
            ArgumentOptions::new("<text>")
                .with_min_length(2)
                .with_max_length(200),
        ),
    )
    .unwrap();
    assert_eq!(spec.tree().arguments[0].max_length, Some(200));

    let err = build(
        CommandBuilder::new("say", "Say something")
            .argument_with(ArgumentOptions::new("<text>").with_min(1i64)),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Predicate(_)), "{err}");
}

#[test]
fn requirements_split_into_permissions_and_roles() {
    let spec = build(
        CommandBuilder::new("purge", "Delete messages")
            .requires(["MANAGE_GUILD", "@Moderator", "Helper"])
            .channels(["mod-log", "123"])
            .guild("Dev Lab"),
    )
    .unwrap();
    assert_eq!(
        spec.permissions().iter().copied().collect::<Vec<_>>(),
        vec![Permission::ManageGuild]
    );
    assert_eq!(
        spec.roles().iter().cloned().collect::<Vec<_>>(),
        vec!["Helper".to_string(), "Moderator".to_string()]
    );
    assert_eq!(spec.channels().len(), 2);
    assert!(!spec.is_global());
    assert_eq!(
        spec.payload().default_member_permissions.as_deref(),
        Some(Permission::ManageGuild.bit().to_string().as_str())
    );
}

#[test]
fn payload_matches_the_wire_schema() {
    let spec = build(
        CommandBuilder::new("subc", "Subcommands")
            .argument("set <color: red|green|blue> [count: 1 <= x <= 5]")
            .argument("clear"),
    )
    .unwrap();
    let value = serde_json::to_value(spec.payload()).unwrap();
    assert_eq!(
        value,
        json!({
            "name": "subc",
            "type": 1,
            "description": "Subcommands",
            "options": [
                {
                    "type": 1,
                    "name": "set",
                    "description": PLACEHOLDER_DESCRIPTION,
                    "options": [
                        {
                            "type": 3,
                            "name": "color",
                            "description": PLACEHOLDER_DESCRIPTION,
                            "required": true,
                            "choices": [
                                {"name": "red", "value": "red"},
                                {"name": "green", "value": "green"},
                                {"name": "blue", "value": "blue"}
                            ]
                        },
                        {
                            "type": 4,
                            "name": "count",
                            "description": PLACEHOLDER_DESCRIPTION,
                            "min_value": 1,
                            "max_value": 5
                        }
                    ]
                },
                {
                    "type": 1,
                    "name": "clear",
                    "description": PLACEHOLDER_DESCRIPTION
                }
            ]
        })
    );
    assert_eq!(spec.payload().options[0].kind, OptionKind::SubCommand);
}

#[test]
fn registry_builders_register_on_seal() {
    let registry = Registry::new();
    let spec = registry
        .command("ping", "Pong")
        .action(|_| async { Ok(()) })
        .unwrap();
    assert!(Arc::ptr_eq(&spec, &registry.get("ping").unwrap()));

    let standalone = build(CommandBuilder::new("pong", "Ping")).unwrap();
    assert_eq!(standalone.name(), "pong");
    assert!(registry.get("pong").is_none());
}
