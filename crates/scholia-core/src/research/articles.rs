//! Articles, their references, and the signatures on each reference.
//!
//! An article is written as one composite: the article node, its domain
//! tags, then per reference the reference node, its `cites` rel, and per
//! signature the signature node with its `signs`, `authoredBy` and
//! optional `affiliatedWith` rels. References are named
//! `{article}_ref_{index}` and signatures `{reference}_sig_{index}`;
//! reading them back sorted by that index restores the input order.

use super::catalog::{ArticleFields, ReferenceFields, SignatureFields};
use super::{KnowledgeBase, require_of, sources, targets};
use crate::session::read_fields;
use crate::storage::{NodeRecord, RelFamily, StoreRead, StoreWrite};
use crate::types::{Id, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// INPUT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInput {
    #[serde(flatten)]
    pub fields: SignatureFields,
    pub author_id: Id,
    #[serde(default)]
    pub affiliation_id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceInput {
    #[serde(flatten)]
    pub fields: ReferenceFields,
    #[serde(default)]
    pub signatures: Vec<SignatureInput>,
}

/// A complete article as submitted for writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleInput {
    /// Node name of the article, unique among articles.
    pub key: String,
    #[serde(flatten)]
    pub fields: ArticleFields,
    /// Domain node ids to tag the article with.
    #[serde(default)]
    pub domains: Vec<Id>,
    #[serde(default)]
    pub references: Vec<ReferenceInput>,
}

// =============================================================================
// VIEW
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureView {
    pub id: Id,
    #[serde(flatten)]
    pub fields: SignatureFields,
    pub author_id: Option<Id>,
    pub affiliation_id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceView {
    pub id: Id,
    #[serde(flatten)]
    pub fields: ReferenceFields,
    pub signatures: Vec<SignatureView>,
}

/// An article read back from its relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
    pub id: Id,
    pub key: String,
    #[serde(flatten)]
    pub fields: ArticleFields,
    pub domains: Vec<Id>,
    pub references: Vec<ReferenceView>,
}

const REFERENCE_MARK: &str = "_ref_";
const SIGNATURE_MARK: &str = "_sig_";

fn reference_name(article: &Id, index: usize) -> String {
    format!("{}{}{:04}", article, REFERENCE_MARK, index)
}

fn signature_name(reference: &Id, index: usize) -> String {
    format!("{}{}{:04}", reference, SIGNATURE_MARK, index)
}

/// Order nodes by the numeric index after the last `mark` in their name.
fn sort_by_index(nodes: &mut [NodeRecord], mark: &str) {
    nodes.sort_by_cached_key(|node| {
        let index = node
            .name
            .rsplit_once(mark)
            .and_then(|(_, index)| index.parse::<usize>().ok());
        (index, node.name.clone())
    });
}

/// Target of the first `rel_type` rel leaving `from`.
fn first_target<S: StoreRead + ?Sized>(store: &S, rel_type: &Id, from: &Id) -> Result<Option<Id>> {
    Ok(store
        .rels_by_from(RelFamily::Instance, rel_type, from)?
        .into_iter()
        .next()
        .map(|rel| rel.toid))
}

impl<S: StoreWrite> KnowledgeBase<S> {
    /// Write an article with all its references and signatures.
    ///
    /// Fails with `PreconditionFailed`, writing nothing, if the key is
    /// taken or a referenced author, affiliation or domain is missing.
    pub fn add_article(&mut self, input: ArticleInput) -> Result<Id> {
        let catalog = &self.catalog;
        let ArticleInput {
            key,
            fields,
            domains,
            references,
        } = input;
        let article = self.session.write(|tx| {
            let article = tx.create(&catalog.article, &key, fields)?;
            let article = article.id().clone();
            for domain in &domains {
                tx.link(&catalog.tagged_with, &article, domain)?;
            }
            for (index, reference) in references.into_iter().enumerate() {
                let node = tx.create(
                    &catalog.reference,
                    &reference_name(&article, index),
                    reference.fields,
                )?;
                let node = node.id().clone();
                tx.link(&catalog.cites, &article, &node)?;
                for (index, signature) in reference.signatures.into_iter().enumerate() {
                    let sig = tx.create(
                        &catalog.signature,
                        &signature_name(&node, index),
                        signature.fields,
                    )?;
                    let sig = sig.id().clone();
                    tx.link(&catalog.signs, &sig, &node)?;
                    tx.link(&catalog.authored_by, &sig, &signature.author_id)?;
                    if let Some(affiliation) = &signature.affiliation_id {
                        tx.link(&catalog.affiliated_with, &sig, affiliation)?;
                    }
                }
            }
            Ok(article)
        })?;
        info!(article = %article, key = %key, "article added");
        Ok(article)
    }

    /// Read an article back. `None` if `id` is not an article.
    pub fn get_article(&self, id: &Id) -> Result<Option<ArticleView>> {
        let store = self.session.store();
        let registry = self.session.registry();
        let catalog = &self.catalog;
        let Some(node) = store.node_by_id(id)? else {
            return Ok(None);
        };
        if &node.type_id != catalog.article.id() {
            return Ok(None);
        }

        let mut cited = targets(store, &catalog.cites, id)?;
        sort_by_index(&mut cited, REFERENCE_MARK);
        let mut references = Vec::new();
        for reference in cited {
            let mut signed = sources(store, &catalog.signs, &reference.id)?;
            sort_by_index(&mut signed, SIGNATURE_MARK);
            let mut signatures = Vec::new();
            for signature in signed {
                signatures.push(SignatureView {
                    author_id: first_target(store, catalog.authored_by.id(), &signature.id)?,
                    affiliation_id: first_target(
                        store,
                        catalog.affiliated_with.id(),
                        &signature.id,
                    )?,
                    fields: read_fields(store, registry, &signature)?,
                    id: signature.id,
                });
            }
            references.push(ReferenceView {
                fields: read_fields(store, registry, &reference)?,
                id: reference.id,
                signatures,
            });
        }
        let domains = targets(store, &catalog.tagged_with, id)?
            .into_iter()
            .map(|domain| domain.id)
            .collect();

        Ok(Some(ArticleView {
            fields: read_fields(store, registry, &node)?,
            id: node.id,
            key: node.name,
            domains,
            references,
        }))
    }

    /// Every article, ordered by id.
    pub fn articles(&self) -> Result<Vec<NodeRecord>> {
        self.store().nodes_by_type(self.catalog.article.id())
    }

    /// Replace an article's own fields. References are untouched.
    pub fn update_article(&mut self, id: &Id, fields: ArticleFields) -> Result<()> {
        let catalog = &self.catalog;
        self.session.write(|tx| {
            require_of(tx.store(), id, &catalog.article)?;
            tx.replace(id, fields)
        })?;
        info!(article = %id, "article updated");
        Ok(())
    }

    /// Delete an article with its references and their signatures, and
    /// every rel touching any of them. Authors, affiliations and domains
    /// stay. Returns `false` if the article does not exist.
    pub fn delete_article(&mut self, id: &Id) -> Result<bool> {
        let catalog = &self.catalog;
        let deleted = self.session.write(|tx| {
            if tx.store().node_by_id(id)?.is_none() {
                return Ok(false);
            }
            require_of(tx.store(), id, &catalog.article)?;
            for reference in targets(tx.store(), &catalog.cites, id)? {
                for signature in sources(tx.store(), &catalog.signs, &reference.id)? {
                    tx.detach(&signature.id)?;
                    tx.delete_node(&signature.id)?;
                }
                tx.detach(&reference.id)?;
                tx.delete_node(&reference.id)?;
            }
            tx.detach(id)?;
            tx.delete_node(id)
        })?;
        if deleted {
            info!(article = %id, "article deleted");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::{NamedFields, PersonFields};
    use crate::types::ScholiaError;

    fn signature(display: &str, author: &Id, affiliation: Option<&Id>) -> SignatureInput {
        SignatureInput {
            fields: SignatureFields {
                display: display.to_string(),
                email: None,
            },
            author_id: author.clone(),
            affiliation_id: affiliation.cloned(),
        }
    }

    fn reference(title: &str, signatures: Vec<SignatureInput>) -> ReferenceInput {
        ReferenceInput {
            fields: ReferenceFields {
                title: title.to_string(),
                year: Some(2001),
            },
            signatures,
        }
    }

    fn article(key: &str, references: Vec<ReferenceInput>) -> ArticleInput {
        ArticleInput {
            key: key.to_string(),
            fields: ArticleFields {
                title: format!("On {}", key),
                year: Some(2020),
                venue: None,
                doi: None,
            },
            domains: Vec::new(),
            references,
        }
    }

    fn author(kb: &mut KnowledgeBase, name: &str) -> Id {
        kb.add_author(PersonFields {
            name: name.to_string(),
            email: None,
        })
        .expect("author")
    }

    #[test]
    fn index_order_survives_wider_indexes() {
        let article = Id::new("a");
        let mut nodes: Vec<NodeRecord> = [10_000, 9_999, 2, 10]
            .into_iter()
            .map(|index| NodeRecord {
                id: Id::new(format!("n{}", index)),
                type_id: Id::new("reference"),
                name: reference_name(&article, index),
                attr: String::new(),
            })
            .collect();
        sort_by_index(&mut nodes, REFERENCE_MARK);
        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["a_ref_0002", "a_ref_0010", "a_ref_9999", "a_ref_10000"]);
    }

    #[test]
    fn references_come_back_in_input_order() {
        let mut kb = KnowledgeBase::in_memory().expect("kb");
        let ada = author(&mut kb, "Ada");
        let refs: Vec<ReferenceInput> = (0..12)
            .map(|i| reference(&format!("ref {}", i), vec![signature("A.", &ada, None)]))
            .collect();
        let id = kb.add_article(article("order", refs)).expect("add");
        let view = kb.get_article(&id).expect("get").expect("present");
        let titles: Vec<String> = view
            .references
            .iter()
            .map(|r| r.fields.title.clone())
            .collect();
        let expected: Vec<String> = (0..12).map(|i| format!("ref {}", i)).collect();
        assert_eq!(titles, expected);
        assert!(view.references[0].signatures[0].affiliation_id.is_none());
    }

    #[test]
    fn duplicate_key_writes_nothing() {
        let mut kb = KnowledgeBase::in_memory().expect("kb");
        let ada = author(&mut kb, "Ada");
        kb.add_article(article("dup", vec![reference("r", vec![signature("A.", &ada, None)])]))
            .expect("first");
        let before = kb.store().counts().expect("counts");
        let again = kb.add_article(article("dup", vec![reference("other", Vec::new())]));
        assert!(matches!(again, Err(ScholiaError::PreconditionFailed(_))));
        assert_eq!(kb.store().counts().expect("counts"), before);
    }

    #[test]
    fn update_replaces_fields_only() {
        let mut kb = KnowledgeBase::in_memory().expect("kb");
        let ada = author(&mut kb, "Ada");
        let id = kb
            .add_article(article("upd", vec![reference("r", vec![signature("A.", &ada, None)])]))
            .expect("add");
        let mut fields = kb.get_article(&id).expect("get").expect("present").fields;
        fields.doi = Some("10.1000/xyz".to_string());
        kb.update_article(&id, fields.clone()).expect("update");

        let view = kb.get_article(&id).expect("get").expect("present");
        assert_eq!(view.fields, fields);
        assert_eq!(view.references.len(), 1);
    }

    #[test]
    fn update_missing_or_foreign_node_fails() {
        let mut kb = KnowledgeBase::in_memory().expect("kb");
        let ada = author(&mut kb, "Ada");
        let fields = article("x", Vec::new()).fields;
        assert!(matches!(
            kb.update_article(&Id::new("ghost"), fields.clone()),
            Err(ScholiaError::PreconditionFailed(_))
        ));
        assert!(matches!(
            kb.update_article(&ada, fields),
            Err(ScholiaError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn delete_keeps_shared_records() {
        let mut kb = KnowledgeBase::in_memory().expect("kb");
        let ada = author(&mut kb, "Ada");
        let graphs = kb.add_domain(NamedFields::new("graphs")).expect("domain");
        let mut input = article("del", vec![reference("r", vec![signature("A.", &ada, None)])]);
        input.domains.push(graphs.clone());
        let id = kb.add_article(input).expect("add");

        assert!(kb.delete_article(&id).expect("delete"));
        assert!(!kb.delete_article(&id).expect("second delete"));
        assert!(kb.get_article(&id).expect("get").is_none());
        assert!(kb.articles().expect("list").is_empty());

        let counts = kb.store().counts().expect("counts");
        assert_eq!(counts.rels, 0);
        assert_eq!(counts.nodes, 2);
        assert!(kb.store().node_by_id(&ada).expect("q").is_some());
        assert!(kb.store().node_by_id(&graphs).expect("q").is_some());
    }

    #[test]
    fn input_parses_from_json() {
        let raw = r#"{
            "key": "smith2020",
            "title": "Graphs",
            "year": 2020,
            "references": [
                {"title": "Trees", "signatures": [{"display": "J. Doe", "authorId": "abc"}]}
            ]
        }"#;
        let input: ArticleInput = serde_json::from_str(raw).expect("json");
        assert_eq!(input.fields.title, "Graphs");
        assert_eq!(input.references[0].signatures[0].author_id, Id::new("abc"));
        assert!(input.domains.is_empty());
    }
}
