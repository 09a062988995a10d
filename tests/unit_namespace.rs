mod support;

use std::collections::BTreeMap;

use dcec::prenex::Bindings;
use dcec::{DcecError, Discovered, Namespace, Signature};
use support::{base_namespace, namespace_with};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn base_namespace_declares_the_sort_hierarchy() {
    let ns = base_namespace();
    for sort in [
        "Object",
        "Agent",
        "Self",
        "ActionType",
        "Event",
        "Action",
        "Moment",
        "Boolean",
        "Fluent",
        "Numeric",
        "Set",
    ] {
        assert!(ns.has_sort(sort), "missing sort {sort}");
    }
    assert_eq!(ns.overloads("lessOrEqual").len(), 2);
    assert!(ns.has_function("union"));
}

#[test]
fn compatibility_is_reflexive() {
    let ns = base_namespace();
    for (sort, _) in ns.sorts() {
        assert_eq!(ns.is_compatible(sort, sort), (true, 0));
    }
}

#[test]
fn compatibility_counts_parent_hops() {
    let ns = namespace_with(&[
        "typedef Animal Object",
        "typedef Dog Animal",
        "typedef Puppy Dog",
    ]);
    assert_eq!(ns.is_compatible("Agent", "Object"), (true, 1));
    assert_eq!(ns.is_compatible("Self", "Agent"), (true, 1));
    assert_eq!(ns.is_compatible("Action", "Event"), (true, 1));
    assert_eq!(ns.is_compatible("Puppy", "Object"), (true, 3));
    assert!(!ns.is_compatible("Moment", "Agent").0);
    assert!(!ns.is_compatible("Object", "Agent").0);
}

#[test]
fn wildcard_is_compatible_with_everything() {
    let ns = base_namespace();
    assert_eq!(ns.is_compatible("?", "Boolean"), (true, 0));
    assert_eq!(ns.distance("?", "Moment"), Some(0));
}

#[test]
fn related_checks_both_directions() {
    let ns = base_namespace();
    assert!(ns.related("Object", "Agent"));
    assert!(ns.related("Agent", "Object"));
    assert!(!ns.related("Agent", "Moment"));
}

#[test]
fn register_sort_requires_declared_parents() {
    let mut ns = base_namespace();
    let err = ns
        .register_sort("Ghost", &["Spirit"])
        .expect_err("undeclared parent");
    assert_eq!(
        err,
        DcecError::UndeclaredParent {
            sort: "Ghost".to_string(),
            parent: "Spirit".to_string(),
        }
    );
    assert_eq!(err.code(), "E-SORT");
    assert!(!ns.has_sort("Ghost"));
}

#[test]
fn register_sort_keeps_the_first_declaration() {
    let mut ns = base_namespace();
    ns.register_sort("Agent", &["Moment"]).expect("no-op");
    assert_eq!(ns.sort_parents("Agent"), Some(strings(&["Object"]).as_slice()));
}

#[test]
fn register_atomic_rejects_a_second_sort() {
    let mut ns = base_namespace();
    ns.register_atomic("john", "Agent").expect("first");
    ns.register_atomic("john", "Agent").expect("same sort again");
    let err = ns.register_atomic("john", "Moment").expect_err("conflict");
    assert_eq!(
        err,
        DcecError::AtomicConflict {
            name: "john".to_string(),
            existing: "Agent".to_string(),
            requested: "Moment".to_string(),
        }
    );
    assert_eq!(ns.atomic_sort("john"), Some("Agent"));
}

#[test]
fn register_function_deduplicates_signatures() {
    let mut ns = base_namespace();
    ns.register_function("likes", "Boolean", &["Agent", "Agent"]);
    ns.register_function("likes", "Boolean", &["Agent", "Agent"]);
    assert_eq!(ns.overloads("likes").len(), 1);
    ns.register_function("likes", "Boolean", &["Agent", "Object"]);
    assert_eq!(ns.overloads("likes").len(), 2);
}

#[test]
fn declare_reads_every_prototype_form() {
    let ns = namespace_with(&[
        "typedef Animal Object",
        "Agent john",
        "mary Agent",
        "Boolean likes(Agent, Agent)",
        "Numeric weight Animal",
    ]);
    assert_eq!(ns.sort_parents("Animal"), Some(strings(&["Object"]).as_slice()));
    assert_eq!(ns.atomic_sort("john"), Some("Agent"));
    assert_eq!(ns.atomic_sort("mary"), Some("Agent"));
    assert_eq!(
        ns.overloads("likes"),
        &[Signature::new("Boolean", strings(&["Agent", "Agent"]))]
    );
    assert_eq!(
        ns.overloads("weight"),
        &[Signature::new("Numeric", strings(&["Animal"]))]
    );
}

#[test]
fn declare_accepts_typedef_in_any_case() {
    let ns = namespace_with(&["TYPEDEF Plant Object"]);
    assert!(ns.has_sort("Plant"));
}

#[test]
fn declare_rejects_malformed_prototypes() {
    let mut ns = base_namespace();
    for text in [
        "",
        "hello",
        "typedef",
        "Agent Moment",
        "foo bar",
        "Bogus thing Agent",
        "Boolean Agent Object",
        "Boolean f Ghost",
    ] {
        let err = ns.declare(text).expect_err(text);
        assert_eq!(err.code(), "E-PROTOTYPE", "{text}: {err}");
    }
}

#[test]
fn declare_reports_undeclared_parents_as_sort_errors() {
    let mut ns = base_namespace();
    let err = ns.declare("typedef Ghost Spirit").expect_err("undeclared parent");
    assert!(matches!(err, DcecError::UndeclaredParent { .. }));
}

#[test]
fn absorb_merges_discovered_declarations() {
    let mut ns = base_namespace();
    let mut quantifiers = Bindings::default();
    quantifiers.bind("x", "QUANT0");
    let discovered = Discovered {
        atomics: BTreeMap::from([
            ("john".to_string(), strings(&["Agent", "Object"])),
            ("QUANT0".to_string(), strings(&["Moment"])),
        ]),
        functions: BTreeMap::from([(
            "likes".to_string(),
            vec![Signature::new("Boolean", strings(&["Agent", "Agent"]))],
        )]),
        quantifiers,
        next_quantifier: 1,
    };

    ns.absorb(&discovered).expect("absorb");
    assert_eq!(ns.atomic_sort("john"), Some("Agent"));
    assert_eq!(ns.atomic_sort("QUANT0"), Some("Moment"));
    assert_eq!(ns.overloads("likes").len(), 1);
    assert_eq!(ns.surface_name("QUANT0"), Some("x"));
    assert_eq!(ns.next_quantifier_index(), 1);
    assert!(ns.name_in_use("QUANT0"));
}

#[test]
fn absorb_never_turns_a_function_into_an_atomic() {
    let mut ns = base_namespace();
    let discovered = Discovered {
        atomics: BTreeMap::from([("implies".to_string(), strings(&["Boolean"]))]),
        ..Discovered::default()
    };
    ns.absorb(&discovered).expect("absorb");
    assert_eq!(ns.atomic_sort("implies"), None);
}

#[test]
fn absorb_rejects_unrelated_candidates_without_changes() {
    let mut ns = namespace_with(&["Agent john"]);
    let before = ns.clone();

    let discovered = Discovered {
        atomics: BTreeMap::from([
            ("mary".to_string(), strings(&["Agent"])),
            ("john".to_string(), strings(&["Moment"])),
        ]),
        ..Discovered::default()
    };
    let err = ns.absorb(&discovered).expect_err("conflict");
    assert!(matches!(err, DcecError::AtomicConflict { .. }));
    assert_eq!(ns, before);

    let discovered = Discovered {
        atomics: BTreeMap::from([("t".to_string(), strings(&["Moment", "Agent"]))]),
        ..Discovered::default()
    };
    assert!(ns.absorb(&discovered).is_err());
    assert_eq!(ns, before);
}

#[test]
fn absorb_rejects_unresolved_return_sorts() {
    let mut ns = base_namespace();
    let discovered = Discovered {
        functions: BTreeMap::from([(
            "f".to_string(),
            vec![Signature::new("?", strings(&["Agent"]))],
        )]),
        ..Discovered::default()
    };
    let err = ns.absorb(&discovered).expect_err("wildcard return");
    assert_eq!(err, DcecError::UnresolvedInlineReturnType("f".to_string()));
    assert!(!ns.has_function("f"));
}

#[test]
fn display_lists_sorts_functions_and_atomics() {
    let ns = namespace_with(&["Agent john"]);
    let text = ns.to_string();
    assert!(text.contains("sort Agent < Object\n"));
    assert!(text.contains("function implies (Boolean, Boolean) -> Boolean\n"));
    assert!(text.contains("atomic john: Agent\n"));
}

#[test]
fn empty_namespace_knows_nothing() {
    let ns = Namespace::new();
    assert!(!ns.has_sort("Object"));
    assert!(ns.overloads("implies").is_empty());
    assert_eq!(ns.to_string(), "");
}
