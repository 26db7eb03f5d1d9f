//! # Scenario Tests
//!
//! End-to-end checks of composite writes and traversals through the
//! public API, on both in-memory and file-backed stores.

use scholia_core::research::{
    AffiliationFields, ArticleFields, PersonFields, ReferenceFields, ReferenceInput,
    SignatureFields, SignatureInput,
};
use scholia_core::{
    ArticleInput, EntityRole, Id, KnowledgeBase, NamedFields, RelFamily, ScholiaError, StoreRead,
};

// =============================================================================
// HELPERS
// =============================================================================

struct People {
    authors: Vec<Id>,
    affiliations: Vec<Id>,
}

fn people(kb: &mut KnowledgeBase, count: usize) -> People {
    let mut authors = Vec::new();
    let mut affiliations = Vec::new();
    for i in 0..count {
        authors.push(
            kb.add_author(PersonFields {
                name: format!("Author {}", i),
                email: Some(format!("author{}@example.org", i)),
            })
            .expect("author"),
        );
        affiliations.push(
            kb.add_affiliation(AffiliationFields {
                name: format!("Lab {}", i),
                country: None,
            })
            .expect("affiliation"),
        );
    }
    People {
        authors,
        affiliations,
    }
}

fn two_reference_article(key: &str, people: &People) -> ArticleInput {
    let references = (0..2)
        .map(|i| ReferenceInput {
            fields: ReferenceFields {
                title: format!("Reference {}", i),
                year: Some(1990 + i as i32),
            },
            signatures: vec![SignatureInput {
                fields: SignatureFields {
                    display: format!("A. {}", i),
                    email: None,
                },
                author_id: people.authors[i].clone(),
                affiliation_id: Some(people.affiliations[i].clone()),
            }],
        })
        .collect();
    ArticleInput {
        key: key.to_string(),
        fields: ArticleFields {
            title: "Typed graphs for research notes".to_string(),
            year: Some(2021),
            venue: Some("Workshop".to_string()),
            doi: None,
        },
        domains: Vec::new(),
        references,
    }
}

// =============================================================================
// ARTICLE COMPOSITE WRITE
// =============================================================================

#[test]
fn article_reads_back_from_relations() {
    let mut kb = KnowledgeBase::in_memory().expect("kb");
    let people = people(&mut kb, 2);
    let id = kb
        .add_article(two_reference_article("graphs2021", &people))
        .expect("add article");

    let view = kb.get_article(&id).expect("get").expect("present");
    assert_eq!(view.key, "graphs2021");
    assert_eq!(view.references.len(), 2);
    for (i, reference) in view.references.iter().enumerate() {
        assert_eq!(reference.signatures.len(), 1);
        let signature = &reference.signatures[0];
        assert_eq!(signature.author_id.as_ref(), Some(&people.authors[i]));
        assert_eq!(signature.affiliation_id.as_ref(), Some(&people.affiliations[i]));
    }
}

#[test]
fn article_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("kb.redb");
    let id = {
        let mut kb = KnowledgeBase::open(&path).expect("open");
        let people = people(&mut kb, 2);
        kb.add_article(two_reference_article("persisted", &people))
            .expect("add")
    };
    let kb = KnowledgeBase::open(&path).expect("reopen");
    let view = kb.get_article(&id).expect("get").expect("present");
    assert_eq!(view.references.len(), 2);
    assert_eq!(view.fields.venue.as_deref(), Some("Workshop"));
}

// =============================================================================
// TRANSACTION ATOMICITY
// =============================================================================

#[test]
fn failed_article_write_leaves_nothing_behind() {
    let mut kb = KnowledgeBase::in_memory().expect("kb");
    let people = people(&mut kb, 2);
    let before = kb.store().counts().expect("counts");

    let mut input = two_reference_article("broken", &people);
    input.references[1].signatures[0].author_id = Id::new("no-such-author");
    let result = kb.add_article(input);
    assert!(matches!(result, Err(ScholiaError::PreconditionFailed(_))));

    assert_eq!(kb.store().counts().expect("counts"), before);
    let catalog = kb.catalog();
    assert!(kb.store().nodes_by_type(catalog.article.id()).expect("q").is_empty());
    assert!(kb.store().nodes_by_type(catalog.reference.id()).expect("q").is_empty());
    assert!(kb.store().nodes_by_type(catalog.signature.id()).expect("q").is_empty());
}

// =============================================================================
// CASCADING DELETE
// =============================================================================

#[test]
fn deleting_a_problem_leaves_no_residual_rels() {
    let mut kb = KnowledgeBase::in_memory().expect("kb");
    let problem = kb.add_problem(NamedFields::new("shortest path")).expect("problem");
    let d1 = kb
        .add_definition(&problem, NamedFields::new("single source"))
        .expect("d1");
    let d2 = kb
        .add_definition(&problem, NamedFields::new("all pairs"))
        .expect("d2");
    kb.add_contribution(&d1, NamedFields::new("label setting"))
        .expect("contribution");

    assert!(kb.delete_problem(&problem).expect("delete"));

    let catalog = kb.catalog().clone();
    let store = kb.store();
    for relation in catalog.relations() {
        for node in [&problem, &d1, &d2] {
            assert!(
                store
                    .rels_by_from(RelFamily::Instance, relation.id(), node)
                    .expect("q")
                    .is_empty()
            );
            assert!(
                store
                    .rels_by_to(RelFamily::Instance, relation.id(), node)
                    .expect("q")
                    .is_empty()
            );
        }
    }
    assert!(kb.definitions_and_solutions(&problem).expect("walk").is_empty());
}

// =============================================================================
// DUAL-LAYER RESOLUTION
// =============================================================================

#[test]
fn abstract_and_real_entities_resolve_by_name() {
    let mut kb = KnowledgeBase::in_memory().expect("kb");
    let e1 = kb
        .add_entity(EntityRole::Abstract, NamedFields::new("X"))
        .expect("e1");
    let a1 = kb
        .add_entity(EntityRole::Algorithm, NamedFields::new("X"))
        .expect("a1");
    let o1 = kb
        .add_entity(EntityRole::Object, NamedFields::new("X"))
        .expect("o1");
    kb.add_entity(EntityRole::Object, NamedFields::new("Y"))
        .expect("unrelated");

    let mut reals: Vec<Id> = kb
        .find_real_entities(&e1)
        .expect("reals")
        .into_iter()
        .map(|n| n.id)
        .collect();
    reals.sort();
    let mut expected = vec![a1.clone(), o1];
    expected.sort();
    assert_eq!(reals, expected);

    let found = kb.find_abstract_entity(&a1).expect("abstract").expect("some");
    assert_eq!(found.id, e1);
}

#[test]
fn improvement_path_crosses_layers() {
    let mut kb = KnowledgeBase::in_memory().expect("kb");
    let target = kb
        .add_entity(EntityRole::Abstract, NamedFields::new("Dijkstra"))
        .expect("target");
    let origin = kb
        .add_entity(EntityRole::Abstract, NamedFields::new("BFS"))
        .expect("origin");
    let real = kb
        .add_entity(EntityRole::Algorithm, NamedFields::new("Dijkstra"))
        .expect("real");
    let origin_real = kb
        .add_entity(EntityRole::Algorithm, NamedFields::new("BFS"))
        .expect("origin real");
    let improvement = kb
        .link_improvement(NamedFields::new("weights"), &target, &[origin.clone()])
        .expect("improvement");

    let graph = kb.improvement_path(&real).expect("walk");
    for id in [&real, &target, &improvement, &origin, &origin_real] {
        assert!(graph.contains_node(id), "missing {}", id);
    }
    let kinds: Vec<&str> = graph.edges.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(kinds, ["instanceOf", "advance", "origin", "instanceOf"]);
}

// =============================================================================
// CYCLE TERMINATION
// =============================================================================

#[test]
fn evolution_cycle_terminates() {
    let mut kb = KnowledgeBase::in_memory().expect("kb");
    let ids: Vec<Id> = ["A", "B", "C"]
        .into_iter()
        .map(|name| {
            kb.add_entity(EntityRole::Abstract, NamedFields::new(name))
                .expect("entity")
        })
        .collect();
    kb.link_evolution(&ids[0], &ids[1]).expect("a->b");
    kb.link_evolution(&ids[1], &ids[2]).expect("b->c");
    kb.link_evolution(&ids[2], &ids[0]).expect("c->a");

    let graph = kb.evolution_chain(&ids[0]).expect("chain");
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 3);
    assert!(
        graph
            .edges
            .iter()
            .any(|e| e.from == ids[2] && e.to == ids[0] && e.kind == "evolve")
    );
}

#[test]
fn neighborhood_labels_each_relation() {
    let mut kb = KnowledgeBase::in_memory().expect("kb");
    let people = people(&mut kb, 2);
    let id = kb
        .add_article(two_reference_article("hood", &people))
        .expect("add");
    let view = kb.get_article(&id).expect("get").expect("present");
    let signature = &view.references[0].signatures[0].id;

    let graph = kb.neighborhood(signature).expect("neighborhood");
    let mut labels: Vec<&str> = graph
        .nodes
        .iter()
        .filter_map(|n| n.label.as_deref())
        .collect();
    labels.sort_unstable();
    assert_eq!(labels, ["affiliatedWith", "authoredBy", "signs"]);
}
