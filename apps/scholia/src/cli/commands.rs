//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Composite writes print an [`Outcome`] and still return the error, so
//! the process exits non-zero on failure.

use scholia_core::research::{AffiliationFields, ArticleFields, ArticleView, PersonFields};
use scholia_core::{
    ArticleInput, EntityRole, Id, KnowledgeBase, NamedFields, Outcome, ScholiaError, StoreRead,
    Subgraph, TypeClass, traversal,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::info;

type CliResult<T = ()> = Result<T, ScholiaError>;

// =============================================================================
// FILE LIMITS AND VALIDATION
// =============================================================================

/// Maximum size of a JSON input file (16 MB).
const MAX_INPUT_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Resolve an input path and check it is a regular file within the size limit.
fn validate_input_file(path: &Path) -> CliResult<PathBuf> {
    let canonical = path.canonicalize().map_err(|e| {
        ScholiaError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    if !canonical.is_file() {
        return Err(ScholiaError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| ScholiaError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_INPUT_FILE_SIZE {
        return Err(ScholiaError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_INPUT_FILE_SIZE
        )));
    }
    Ok(canonical)
}

/// Resolve an output path whose parent directory must exist.
fn validate_output_path(path: &Path) -> CliResult<PathBuf> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        ScholiaError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    let filename = path
        .file_name()
        .ok_or_else(|| ScholiaError::IoError("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

/// Parse a JSON input file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let path = validate_input_file(path)?;
    let data = std::fs::read(&path)
        .map_err(|e| ScholiaError::IoError(format!("Cannot read '{}': {}", path.display(), e)))?;
    serde_json::from_slice(&data).map_err(|e| {
        ScholiaError::SerializationError(format!("Invalid JSON in '{}': {}", path.display(), e))
    })
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Print the outcome of a write, with `extra` fields merged in on success.
fn report<T>(
    json_mode: bool,
    action: &str,
    result: CliResult<T>,
    extra: impl FnOnce(&T) -> serde_json::Value,
) -> CliResult<T> {
    let outcome = Outcome::from_result(&result);
    if json_mode {
        let mut value = serde_json::to_value(&outcome).unwrap_or_default();
        if let (Ok(done), Some(map)) = (&result, value.as_object_mut()) {
            if let serde_json::Value::Object(fields) = extra(done) {
                map.extend(fields);
            }
        }
        print_json(&value);
    } else {
        match &result {
            Ok(_) => println!("{}: ok", action),
            Err(e) => println!("{}: failed ({})", action, e),
        }
    }
    result
}

fn report_created(json_mode: bool, action: &str, result: CliResult<Id>) -> CliResult {
    let id = report(json_mode, action, result, |id| serde_json::json!({ "id": id }))?;
    if !json_mode {
        println!("Id: {}", id);
    }
    Ok(())
}

fn report_deleted(json_mode: bool, action: &str, result: CliResult<bool>) -> CliResult {
    let deleted = report(json_mode, action, result, |deleted| {
        serde_json::json!({ "deleted": deleted })
    })?;
    if !json_mode && !deleted {
        println!("Nothing to delete");
    }
    Ok(())
}

fn print_subgraph(json_mode: bool, title: &str, graph: &Subgraph) {
    if json_mode {
        print_json(graph);
        return;
    }
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));
    println!("Nodes ({}):", graph.nodes.len());
    for node in &graph.nodes {
        match &node.label {
            Some(label) => println!("  [{}] {} {}", label, node.id, node.name),
            None => println!("  {} {}", node.id, node.name),
        }
    }
    println!("Edges ({}):", graph.edges.len());
    for edge in &graph.edges {
        println!("  {} -[{}]-> {}", edge.from, edge.kind, edge.to);
    }
}

fn print_article(view: &ArticleView) {
    println!("{} ({})", view.fields.title, view.key);
    println!("Id:      {}", view.id);
    if let Some(year) = view.fields.year {
        println!("Year:    {}", year);
    }
    if let Some(venue) = &view.fields.venue {
        println!("Venue:   {}", venue);
    }
    if let Some(doi) = &view.fields.doi {
        println!("DOI:     {}", doi);
    }
    for domain in &view.domains {
        println!("Domain:  {}", domain);
    }
    println!("References ({}):", view.references.len());
    for reference in &view.references {
        println!("  - {} [{}]", reference.fields.title, reference.id);
        for signature in &reference.signatures {
            let author = signature
                .author_id
                .as_ref()
                .map_or_else(|| "-".to_string(), Id::to_string);
            let affiliation = signature
                .affiliation_id
                .as_ref()
                .map_or_else(|| "-".to_string(), Id::to_string);
            println!(
                "      {} (author {}, affiliation {})",
                signature.fields.display, author, affiliation
            );
        }
    }
}

fn named(name: String, description: Option<String>) -> NamedFields {
    NamedFields { name, description }
}

/// Open the knowledge base, installing the schema if needed.
pub fn open(db_path: &Path) -> CliResult<KnowledgeBase> {
    KnowledgeBase::open(db_path)
}

// =============================================================================
// DATABASE COMMANDS
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(db_path: &Path, force: bool) -> CliResult {
    if db_path.exists() {
        if !force {
            return Err(ScholiaError::PreconditionFailed(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path).map_err(|e| {
            ScholiaError::IoError(format!("Cannot remove '{}': {}", db_path.display(), e))
        })?;
    }
    let kb = open(db_path)?;
    let counts = kb.store().counts()?;
    info!(database = %db_path.display(), types = counts.types, "database initialized");
    println!("Initialized new database at {:?} ({} types)", db_path, counts.types);
    Ok(())
}

/// Show record counts.
pub fn cmd_status(db_path: &Path, json_mode: bool) -> CliResult {
    let kb = open(db_path)?;
    let counts = kb.store().counts()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": db_path.to_string_lossy(),
            "counts": counts,
        }));
        return Ok(());
    }

    println!("Scholia Status");
    println!("==============");
    println!("Database:   {:?}", db_path);
    println!();
    println!("Types:      {}", counts.types);
    println!("Attributes: {}", counts.attributes);
    println!("Nodes:      {}", counts.nodes);
    println!("Rels:       {}", counts.rels);
    println!("Type rels:  {}", counts.type_rels);
    Ok(())
}

/// List every installed type.
pub fn cmd_schema(db_path: &Path, json_mode: bool) -> CliResult {
    let kb = open(db_path)?;
    let registry = kb.session().registry();

    if json_mode {
        let types: Vec<_> = registry
            .iter()
            .map(|def| {
                serde_json::json!({
                    "id": def.id(),
                    "typeclass": def.typeclass().as_str(),
                    "typename": def.typename(),
                })
            })
            .collect();
        print_json(&types);
        return Ok(());
    }

    for class in TypeClass::ALL {
        let defs: Vec<_> = registry.iter().filter(|def| def.typeclass() == class).collect();
        if defs.is_empty() {
            continue;
        }
        println!("{} ({})", class, defs.len());
        for def in defs {
            println!("  {:<24} {}", def.typename(), def.id());
        }
    }
    Ok(())
}

/// Copy the database to `output`.
pub fn cmd_backup(db_path: &Path, json_mode: bool, output: &Path) -> CliResult {
    let output = validate_output_path(output)?;
    let kb = open(db_path)?;
    let bytes = kb.store().backup(&output)?;
    if json_mode {
        print_json(&serde_json::json!({ "output": output, "bytes": bytes }));
    } else {
        println!("Backed up {} bytes to {:?}", bytes, output);
    }
    Ok(())
}

// =============================================================================
// RECORD COMMANDS
// =============================================================================

pub fn cmd_add_author(
    db_path: &Path,
    json_mode: bool,
    name: String,
    email: Option<String>,
) -> CliResult {
    let mut kb = open(db_path)?;
    let result = kb.add_author(PersonFields { name, email });
    report_created(json_mode, "add author", result)
}

pub fn cmd_add_affiliation(
    db_path: &Path,
    json_mode: bool,
    name: String,
    country: Option<String>,
) -> CliResult {
    let mut kb = open(db_path)?;
    let result = kb.add_affiliation(AffiliationFields { name, country });
    report_created(json_mode, "add affiliation", result)
}

pub fn cmd_add_domain(
    db_path: &Path,
    json_mode: bool,
    name: String,
    description: Option<String>,
) -> CliResult {
    let mut kb = open(db_path)?;
    let result = kb.add_domain(named(name, description));
    report_created(json_mode, "add domain", result)
}

pub fn cmd_add_entity(
    db_path: &Path,
    json_mode: bool,
    role: EntityRole,
    name: String,
    description: Option<String>,
) -> CliResult {
    let mut kb = open(db_path)?;
    let result = kb.add_entity(role, named(name, description));
    report_created(json_mode, &format!("add {}", role), result)
}

// =============================================================================
// ARTICLE COMMANDS
// =============================================================================

/// Add an article from a JSON file shaped like [`ArticleInput`].
pub fn cmd_add_article(db_path: &Path, json_mode: bool, file: &Path) -> CliResult {
    let input: ArticleInput = read_json(file)?;
    let mut kb = open(db_path)?;
    let result = kb.add_article(input);
    report_created(json_mode, "add article", result)
}

pub fn cmd_article(db_path: &Path, json_mode: bool, id: &str) -> CliResult {
    let kb = open(db_path)?;
    let view = kb
        .get_article(&Id::new(id))?
        .ok_or_else(|| ScholiaError::NotFound(format!("article {}", id)))?;
    if json_mode {
        print_json(&view);
    } else {
        print_article(&view);
    }
    Ok(())
}

pub fn cmd_update_article(db_path: &Path, json_mode: bool, id: &str, file: &Path) -> CliResult {
    let fields: ArticleFields = read_json(file)?;
    let mut kb = open(db_path)?;
    let result = kb.update_article(&Id::new(id), fields);
    report(json_mode, "update article", result, |()| serde_json::json!({}))
}

pub fn cmd_delete_article(db_path: &Path, json_mode: bool, id: &str) -> CliResult {
    let mut kb = open(db_path)?;
    let result = kb.delete_article(&Id::new(id));
    report_deleted(json_mode, "delete article", result)
}

// =============================================================================
// PROBLEM AND ENTITY RELATION COMMANDS
// =============================================================================

pub fn cmd_add_definition(
    db_path: &Path,
    json_mode: bool,
    problem: &str,
    name: String,
    description: Option<String>,
) -> CliResult {
    let mut kb = open(db_path)?;
    let result = kb.add_definition(&Id::new(problem), named(name, description));
    report_created(json_mode, "add definition", result)
}

pub fn cmd_add_contribution(
    db_path: &Path,
    json_mode: bool,
    definition: &str,
    name: String,
    description: Option<String>,
) -> CliResult {
    let mut kb = open(db_path)?;
    let result = kb.add_contribution(&Id::new(definition), named(name, description));
    report_created(json_mode, "add contribution", result)
}

pub fn cmd_delete_problem(db_path: &Path, json_mode: bool, id: &str) -> CliResult {
    let mut kb = open(db_path)?;
    let result = kb.delete_problem(&Id::new(id));
    report_deleted(json_mode, "delete problem", result)
}

pub fn cmd_link_evolution(db_path: &Path, json_mode: bool, from: &str, to: &str) -> CliResult {
    let mut kb = open(db_path)?;
    let result = kb.link_evolution(&Id::new(from), &Id::new(to));
    report_created(json_mode, "link evolution", result)
}

pub fn cmd_add_improvement(
    db_path: &Path,
    json_mode: bool,
    name: String,
    description: Option<String>,
    target: &str,
    origins: &[String],
) -> CliResult {
    let origins: Vec<Id> = origins.iter().map(|o| Id::new(o.as_str())).collect();
    let mut kb = open(db_path)?;
    let result = kb.link_improvement(named(name, description), &Id::new(target), &origins);
    report_created(json_mode, "add improvement", result)
}

// =============================================================================
// TRAVERSAL COMMANDS
// =============================================================================

/// Follow the relation named `rel` outwards from `start`.
pub fn cmd_chain(db_path: &Path, json_mode: bool, start: &str, rel: &str) -> CliResult {
    let kb = open(db_path)?;
    let rel_type = kb.session().registry().require(TypeClass::InstanceRel, rel)?;
    let graph = traversal::evolution_chain(kb.store(), &Id::new(start), rel_type.id())?;
    print_subgraph(json_mode, &format!("Chain over '{}'", rel), &graph);
    Ok(())
}

pub fn cmd_improvements(db_path: &Path, json_mode: bool, entity: &str) -> CliResult {
    let kb = open(db_path)?;
    let graph = kb.improvement_path(&Id::new(entity))?;
    print_subgraph(json_mode, "Improvement path", &graph);
    Ok(())
}

pub fn cmd_solutions(db_path: &Path, json_mode: bool, problem: &str) -> CliResult {
    let kb = open(db_path)?;
    let graph = kb.definitions_and_solutions(&Id::new(problem))?;
    print_subgraph(json_mode, "Definitions and solutions", &graph);
    Ok(())
}

pub fn cmd_neighbors(db_path: &Path, json_mode: bool, node: &str) -> CliResult {
    let kb = open(db_path)?;
    let graph = kb.neighborhood(&Id::new(node))?;
    print_subgraph(json_mode, "Neighborhood", &graph);
    Ok(())
}
