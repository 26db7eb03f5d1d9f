//! The research catalog: every concept, entity role and relation of the
//! knowledge base, declared once and registered in dependency order.

use crate::primitives::{PrimitiveKind, Value};
use crate::schema::{
    ConceptFields, SchemaRegistry, TypeDef, optional_number, optional_text, required_text,
};
use crate::traversal::{ImprovementSchema, RelationLabel, SolutionSchema};
use crate::types::{Result, ScholiaError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

// =============================================================================
// ATTRIBUTE LAYOUTS
// =============================================================================

type Layout = &'static [(&'static str, bool, PrimitiveKind)];

const ARTICLE: Layout = &[
    ("title", true, PrimitiveKind::String),
    ("year", false, PrimitiveKind::Number),
    ("venue", false, PrimitiveKind::String),
    ("doi", false, PrimitiveKind::String),
];

const REFERENCE: Layout = &[
    ("title", true, PrimitiveKind::String),
    ("year", false, PrimitiveKind::Number),
];

const SIGNATURE: Layout = &[
    ("display", true, PrimitiveKind::String),
    ("email", false, PrimitiveKind::String),
];

const PERSON: Layout = &[
    ("name", true, PrimitiveKind::String),
    ("email", false, PrimitiveKind::String),
];

const AFFILIATION: Layout = &[
    ("name", true, PrimitiveKind::String),
    ("country", false, PrimitiveKind::String),
];

/// Shared by domains and every entity-like concept. `name` comes first:
/// it is the join key between abstract and real entities.
const NAMED: Layout = &[
    ("name", true, PrimitiveKind::String),
    ("description", false, PrimitiveKind::String),
];

// =============================================================================
// ENTITY ROLES
// =============================================================================

/// The concepts taking part in abstract/real resolution, plus improvements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityRole {
    Abstract,
    Object,
    Algorithm,
    Problem,
    Definition,
    Contribution,
    Improvement,
}

impl EntityRole {
    pub const ALL: [Self; 7] = [
        Self::Abstract,
        Self::Object,
        Self::Algorithm,
        Self::Problem,
        Self::Definition,
        Self::Contribution,
        Self::Improvement,
    ];

    /// Concept typename of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Abstract => "entity",
            Self::Object => "object",
            Self::Algorithm => "algorithm",
            Self::Problem => "problem",
            Self::Definition => "definition",
            Self::Contribution => "contribution",
            Self::Improvement => "improvement",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == raw)
            .ok_or_else(|| ScholiaError::InvalidType(format!("unknown entity role '{}'", raw)))
    }

    /// Whether nodes of this role realize an abstract entity.
    #[must_use]
    pub const fn is_real(self) -> bool {
        !matches!(self, Self::Abstract | Self::Improvement)
    }
}

impl fmt::Display for EntityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Registered handles for every research type.
#[derive(Debug, Clone)]
pub struct ResearchCatalog {
    pub article: TypeDef,
    pub reference: TypeDef,
    pub signature: TypeDef,
    pub author: TypeDef,
    pub affiliation: TypeDef,
    pub domain: TypeDef,
    pub entity: TypeDef,
    pub object: TypeDef,
    pub algorithm: TypeDef,
    pub problem: TypeDef,
    pub definition: TypeDef,
    pub contribution: TypeDef,
    pub improvement: TypeDef,

    pub cites: TypeDef,
    pub signs: TypeDef,
    pub authored_by: TypeDef,
    pub affiliated_with: TypeDef,
    pub tagged_with: TypeDef,
    pub evolve: TypeDef,
    pub refine: TypeDef,
    pub solution_to: TypeDef,
    pub advance: TypeDef,
    pub origin: TypeDef,

    real_concepts: Vec<TypeDef>,
}

/// Registers `"{concept}.{field}"` attributes ahead of their concept.
fn concept(registry: &mut SchemaRegistry, typename: &str, layout: Layout) -> Result<TypeDef> {
    let mut attributes = Vec::with_capacity(layout.len());
    for &(field, required, kind) in layout {
        let attr = TypeDef::attribute(&format!("{}.{}", typename, field), required, kind)?;
        attributes.push(registry.register(attr)?);
    }
    let refs: Vec<&TypeDef> = attributes.iter().collect();
    registry.register(TypeDef::concept(typename, &refs)?)
}

fn rel(
    registry: &mut SchemaRegistry,
    typename: &str,
    from: &TypeDef,
    to: &TypeDef,
) -> Result<TypeDef> {
    registry.register(TypeDef::instance_rel(typename, from, to, &[])?)
}

impl ResearchCatalog {
    /// Register the whole catalog. Registering twice into the same
    /// registry is a no-op.
    pub fn register(registry: &mut SchemaRegistry) -> Result<Self> {
        let article = concept(registry, "article", ARTICLE)?;
        let reference = concept(registry, "reference", REFERENCE)?;
        let signature = concept(registry, "signature", SIGNATURE)?;
        let author = concept(registry, "author", PERSON)?;
        let affiliation = concept(registry, "affiliation", AFFILIATION)?;
        let domain = concept(registry, "domain", NAMED)?;
        let entity = concept(registry, EntityRole::Abstract.as_str(), NAMED)?;
        let object = concept(registry, EntityRole::Object.as_str(), NAMED)?;
        let algorithm = concept(registry, EntityRole::Algorithm.as_str(), NAMED)?;
        let problem = concept(registry, EntityRole::Problem.as_str(), NAMED)?;
        let definition = concept(registry, EntityRole::Definition.as_str(), NAMED)?;
        let contribution = concept(registry, EntityRole::Contribution.as_str(), NAMED)?;
        let improvement = concept(registry, EntityRole::Improvement.as_str(), NAMED)?;

        let real_concepts = vec![
            object.clone(),
            algorithm.clone(),
            problem.clone(),
            definition.clone(),
            contribution.clone(),
        ];
        for real in &real_concepts {
            registry.register(TypeDef::entity(real.typename(), real)?)?;
        }

        let catalog = Self {
            cites: rel(registry, "cites", &article, &reference)?,
            signs: rel(registry, "signs", &signature, &reference)?,
            authored_by: rel(registry, "authoredBy", &signature, &author)?,
            affiliated_with: rel(registry, "affiliatedWith", &signature, &affiliation)?,
            tagged_with: rel(registry, "taggedWith", &article, &domain)?,
            evolve: rel(registry, "evolve", &entity, &entity)?,
            refine: rel(registry, "refine", &definition, &problem)?,
            solution_to: rel(registry, "solutionTo", &contribution, &definition)?,
            advance: rel(registry, "advance", &improvement, &entity)?,
            origin: rel(registry, "origin", &improvement, &entity)?,
            article,
            reference,
            signature,
            author,
            affiliation,
            domain,
            entity,
            object,
            algorithm,
            problem,
            definition,
            contribution,
            improvement,
            real_concepts,
        };
        debug!(types = registry.len(), "research catalog registered");
        Ok(catalog)
    }

    /// Concept of an entity role.
    #[must_use]
    pub fn concept_of(&self, role: EntityRole) -> &TypeDef {
        match role {
            EntityRole::Abstract => &self.entity,
            EntityRole::Object => &self.object,
            EntityRole::Algorithm => &self.algorithm,
            EntityRole::Problem => &self.problem,
            EntityRole::Definition => &self.definition,
            EntityRole::Contribution => &self.contribution,
            EntityRole::Improvement => &self.improvement,
        }
    }

    /// Every instance relation, in declaration order.
    #[must_use]
    pub fn relations(&self) -> [&TypeDef; 10] {
        [
            &self.cites,
            &self.signs,
            &self.authored_by,
            &self.affiliated_with,
            &self.tagged_with,
            &self.evolve,
            &self.refine,
            &self.solution_to,
            &self.advance,
            &self.origin,
        ]
    }

    #[must_use]
    pub fn improvement_schema(&self) -> ImprovementSchema {
        ImprovementSchema {
            abstract_concept: self.entity.id().clone(),
            real_concepts: self.real_concepts.iter().map(|c| c.id().clone()).collect(),
            advance: self.advance.id().clone(),
            origin: self.origin.id().clone(),
        }
    }

    #[must_use]
    pub fn solution_schema(&self) -> SolutionSchema {
        SolutionSchema {
            refine: self.refine.id().clone(),
            solution_to: self.solution_to.id().clone(),
        }
    }

    /// Every relation, labelled by its typename.
    #[must_use]
    pub fn neighborhood_relations(&self) -> Vec<RelationLabel> {
        self.relations()
            .into_iter()
            .map(|def| RelationLabel::new(def.id().clone(), def.typename()))
            .collect()
    }
}

// =============================================================================
// FIELD RECORDS
// =============================================================================

fn text_or_void(value: Option<String>) -> Value {
    value.map_or(Value::Void, Value::Text)
}

fn year_or_void(year: Option<i32>) -> Value {
    year.map_or(Value::Void, |y| Value::Number(f64::from(y)))
}

/// A stored year must be a whole number inside the `i32` range.
fn optional_year(values: &[Value], index: usize) -> Result<Option<i32>> {
    let range = f64::from(i32::MIN)..=f64::from(i32::MAX);
    match optional_number(values, index, "year")? {
        None => Ok(None),
        Some(y) if y.fract() == 0.0 && range.contains(&y) => Ok(Some(y as i32)),
        Some(y) => Err(ScholiaError::Decode(format!(
            "field 'year' (position {}) holds {}, not a whole year",
            index, y
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleFields {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
}

impl ConceptFields for ArticleFields {
    const FIELDS: &'static [&'static str] = &["title", "year", "venue", "doi"];

    fn into_values(self) -> Vec<Value> {
        vec![
            Value::Text(self.title),
            year_or_void(self.year),
            text_or_void(self.venue),
            text_or_void(self.doi),
        ]
    }

    fn from_values(values: &[Value]) -> Result<Self> {
        Ok(Self {
            title: required_text(values, 0, "title")?,
            year: optional_year(values, 1)?,
            venue: optional_text(values, 2, "venue")?,
            doi: optional_text(values, 3, "doi")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFields {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
}

impl ConceptFields for ReferenceFields {
    const FIELDS: &'static [&'static str] = &["title", "year"];

    fn into_values(self) -> Vec<Value> {
        vec![Value::Text(self.title), year_or_void(self.year)]
    }

    fn from_values(values: &[Value]) -> Result<Self> {
        Ok(Self {
            title: required_text(values, 0, "title")?,
            year: optional_year(values, 1)?,
        })
    }
}

/// An author name as printed on one reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureFields {
    pub display: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl ConceptFields for SignatureFields {
    const FIELDS: &'static [&'static str] = &["display", "email"];

    fn into_values(self) -> Vec<Value> {
        vec![Value::Text(self.display), text_or_void(self.email)]
    }

    fn from_values(values: &[Value]) -> Result<Self> {
        Ok(Self {
            display: required_text(values, 0, "display")?,
            email: optional_text(values, 1, "email")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonFields {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl ConceptFields for PersonFields {
    const FIELDS: &'static [&'static str] = &["name", "email"];

    fn into_values(self) -> Vec<Value> {
        vec![Value::Text(self.name), text_or_void(self.email)]
    }

    fn from_values(values: &[Value]) -> Result<Self> {
        Ok(Self {
            name: required_text(values, 0, "name")?,
            email: optional_text(values, 1, "email")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliationFields {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
}

impl ConceptFields for AffiliationFields {
    const FIELDS: &'static [&'static str] = &["name", "country"];

    fn into_values(self) -> Vec<Value> {
        vec![Value::Text(self.name), text_or_void(self.country)]
    }

    fn from_values(values: &[Value]) -> Result<Self> {
        Ok(Self {
            name: required_text(values, 0, "name")?,
            country: optional_text(values, 1, "country")?,
        })
    }
}

/// Fields of domains, abstract and real entities, and improvements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NamedFields {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl ConceptFields for NamedFields {
    const FIELDS: &'static [&'static str] = &["name", "description"];

    fn into_values(self) -> Vec<Value> {
        vec![Value::Text(self.name), text_or_void(self.description)]
    }

    fn from_values(values: &[Value]) -> Result<Self> {
        Ok(Self {
            name: required_text(values, 0, "name")?,
            description: optional_text(values, 1, "description")?,
        })
    }
}
