//! In-memory implementation of Collection for testing and development
//!
//! Behaves like a small embedded document store: documents are JSON objects
//! identified by `_id`, filters support equality, comparison operators,
//! compiled patterns and `$and`/`$or`, and updates accept either modifier
//! documents or full replacements.

use crate::core::collection::{
    Collection, Cursor, Document, ID_FIELD, RemoveOptions, UpdateOptions, UpdateResult,
};
use crate::core::error::{StoreError, StoreResult};
use crate::core::filter::{Condition, Filter, Operand};
use crate::core::query::{Projection, SortDirection, SortSpec};
use async_trait::async_trait;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// In-memory collection
///
/// Useful for testing and development. Uses RwLock for thread-safe access;
/// clones share the same documents.
#[derive(Clone, Default)]
pub struct InMemoryCollection {
    documents: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection seeded with `documents`; missing `_id`s are generated
    pub fn with_documents(documents: Vec<Document>) -> Self {
        let documents = documents
            .into_iter()
            .map(|mut doc| {
                ensure_id(&mut doc);
                doc
            })
            .collect();
        Self {
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    /// Copy of every stored document, in insertion order
    pub fn snapshot(&self) -> StoreResult<Vec<Document>> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<Document>>> {
        self.documents.read().map_err(|e| StoreError::Unavailable {
            message: format!("failed to acquire read lock: {}", e),
        })
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Vec<Document>>> {
        self.documents.write().map_err(|e| StoreError::Unavailable {
            message: format!("failed to acquire write lock: {}", e),
        })
    }
}

#[async_trait]
impl Collection for InMemoryCollection {
    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        let documents = self.read()?;
        let mut count = 0;
        for doc in documents.iter() {
            if matches(doc, filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn find(&self, cursor: Cursor) -> StoreResult<Vec<Document>> {
        let mut found = Vec::new();
        for doc in self.read()?.iter() {
            if matches(doc, &cursor.filter)? {
                found.push(doc.clone());
            }
        }

        if let Some(sort) = &cursor.sort {
            found.sort_by(|a, b| compare_documents(a, b, sort));
        }

        let skip = cursor.skip.map_or(0, to_usize);
        let limit = cursor.limit.map_or(usize::MAX, to_usize);
        let page = found.into_iter().skip(skip).take(limit);

        match &cursor.projection {
            Some(projection) => {
                let mode = ProjectionMode::from_projection(projection);
                page.map(|doc| mode.apply(doc)).collect()
            }
            None => Ok(page.collect()),
        }
    }

    async fn insert(&self, mut document: Document) -> StoreResult<Document> {
        ensure_id(&mut document);

        let mut documents = self.write()?;
        check_unique_id(&documents, &document)?;
        documents.push(document.clone());

        Ok(document)
    }

    async fn update(
        &self,
        filter: &Filter,
        update: &Document,
        options: UpdateOptions,
    ) -> StoreResult<UpdateResult> {
        let kind = UpdateKind::classify(update)?;
        let mut documents = self.write()?;

        let mut targets = Vec::new();
        for (index, doc) in documents.iter().enumerate() {
            if matches(doc, filter)? {
                targets.push(index);
                if !options.multi {
                    break;
                }
            }
        }

        if !targets.is_empty() {
            // Compute every new version first so a failing update changes nothing
            let mut updated = Vec::with_capacity(targets.len());
            for &index in &targets {
                updated.push((index, kind.apply_to_existing(&documents[index])?));
            }
            for (index, doc) in updated {
                documents[index] = doc;
            }
            return Ok(UpdateResult {
                count: targets.len() as u64,
                upserted: None,
            });
        }

        if !options.upsert {
            return Ok(UpdateResult::default());
        }

        let mut inserted = match kind {
            UpdateKind::Replacement(replacement) => replacement.clone(),
            UpdateKind::Modifiers(modifiers) => apply_modifiers(equality_seed(filter)?, modifiers)?,
        };
        ensure_id(&mut inserted);
        check_unique_id(&documents, &inserted)?;
        documents.push(inserted.clone());

        Ok(UpdateResult {
            count: 1,
            upserted: Some(inserted),
        })
    }

    async fn remove(&self, filter: &Filter, options: RemoveOptions) -> StoreResult<u64> {
        let mut documents = self.write()?;

        let mut targets = Vec::new();
        for (index, doc) in documents.iter().enumerate() {
            if matches(doc, filter)? {
                targets.push(index);
                if !options.multi {
                    break;
                }
            }
        }

        for &index in targets.iter().rev() {
            documents.remove(index);
        }

        Ok(targets.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

fn ensure_id(doc: &mut Document) {
    if doc.get(ID_FIELD).is_none_or(Value::is_null) {
        doc.insert(
            ID_FIELD.to_string(),
            Value::String(Uuid::new_v4().simple().to_string()),
        );
    }
}

fn check_unique_id(documents: &[Document], doc: &Document) -> StoreResult<()> {
    let id = doc.get(ID_FIELD);
    if documents.iter().any(|d| d.get(ID_FIELD) == id) {
        let id = match id {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        return Err(StoreError::DuplicateId { id });
    }
    Ok(())
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Resolve a dotted path (`address.city`, `tags.0`)
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_path(doc: &mut Document, path: &str, value: Value) -> StoreResult<()> {
    let mut parts: Vec<&str> = path.split('.').collect();
    let last = parts.pop().unwrap_or(path);

    let mut current = doc;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Document::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::invalid_update(format!(
                    "cannot create field '{}' inside a non-object",
                    path
                )));
            }
        };
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn remove_path(doc: &mut Document, path: &str) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else {
        return;
    };

    let mut current = doc;
    for part in parts {
        match current.get_mut(part) {
            Some(Value::Object(map)) => current = map,
            _ => return,
        }
    }
    current.remove(last);
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

fn matches(doc: &Document, filter: &Filter) -> StoreResult<bool> {
    for (field, condition) in filter.clauses() {
        let satisfied = match condition {
            Condition::Equals(expected) => value_matches(lookup(doc, field), expected),
            Condition::Operators(operators) => {
                let actual = lookup(doc, field);
                let mut all = true;
                for (operator, operand) in operators {
                    if !operator_matches(actual, operator, operand)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            Condition::Any(branches) => {
                let mut any = false;
                for branch in branches {
                    if matches(doc, branch)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            Condition::All(branches) => {
                let mut all = true;
                for branch in branches {
                    if !matches(doc, branch)? {
                        all = false;
                        break;
                    }
                }
                all
            }
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality, where an array field matches if any element does
fn value_matches(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(actual) => values_equal(actual, expected),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn operator_matches(
    actual: Option<&Value>,
    operator: &str,
    operand: &Operand,
) -> StoreResult<bool> {
    let value = match operand {
        Operand::Pattern(pattern) => {
            if operator != "$regex" {
                return Err(StoreError::InvalidQuery {
                    message: format!("pattern used with operator '{}'", operator),
                });
            }
            return Ok(any_element(actual, |v| {
                v.as_str().is_some_and(|s| pattern.is_match(s))
            }));
        }
        Operand::Value(value) => value,
    };

    let result = match operator {
        "$eq" => value_matches(actual, value),
        "$ne" => !value_matches(actual, value),
        "$gt" => compares(actual, value, |o| o == Ordering::Greater),
        "$gte" => compares(actual, value, |o| o != Ordering::Less),
        "$lt" => compares(actual, value, |o| o == Ordering::Less),
        "$lte" => compares(actual, value, |o| o != Ordering::Greater),
        "$in" => in_list(actual, operator, value)?,
        "$nin" => !in_list(actual, operator, value)?,
        "$exists" => actual.is_some() == is_truthy(value),
        "$regex" => {
            return Err(StoreError::InvalidQuery {
                message: "$regex operand was not compiled".to_string(),
            });
        }
        other => {
            return Err(StoreError::InvalidQuery {
                message: format!("unknown operator '{}'", other),
            });
        }
    };
    Ok(result)
}

fn any_element(actual: Option<&Value>, predicate: impl Fn(&Value) -> bool) -> bool {
    match actual {
        None => false,
        Some(Value::Array(items)) => items.iter().any(&predicate),
        Some(value) => predicate(value),
    }
}

fn compares(actual: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    any_element(actual, |v| comparable(v, operand).is_some_and(&accept))
}

/// Ordering between values of the same kind; `None` across kinds
fn comparable(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn in_list(actual: Option<&Value>, operator: &str, list: &Value) -> StoreResult<bool> {
    let Value::Array(candidates) = list else {
        return Err(StoreError::InvalidQuery {
            message: format!("'{}' expects an array", operator),
        });
    };
    Ok(candidates.iter().any(|c| value_matches(actual, c)))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

fn compare_documents(a: &Document, b: &Document, sort: &SortSpec) -> Ordering {
    for (field, direction) in sort.iter() {
        let ordering = compare_for_sort(lookup(a, field), lookup(b, field));
        let ordering = match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Missing and null first, then numbers, strings, booleans, arrays, objects
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Bool(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => comparable(x, y).unwrap_or_else(|| rank(a).cmp(&rank(b))),
        _ => rank(a).cmp(&rank(b)),
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

enum ProjectionMode {
    Include { fields: Vec<String>, keep_id: bool },
    Exclude(Vec<String>),
}

impl ProjectionMode {
    fn from_projection(projection: &Projection) -> Self {
        let projection = projection.normalized();
        let keep_id = projection.get(ID_FIELD) != Some(false);
        let fields: Vec<(&str, bool)> = projection
            .iter()
            .filter(|(field, _)| *field != ID_FIELD)
            .collect();

        if fields.iter().any(|(_, include)| *include) {
            return ProjectionMode::Include {
                fields: fields.iter().map(|(f, _)| f.to_string()).collect(),
                keep_id,
            };
        }

        let mut excluded: Vec<String> = fields.iter().map(|(f, _)| f.to_string()).collect();
        if !keep_id {
            excluded.push(ID_FIELD.to_string());
        }
        ProjectionMode::Exclude(excluded)
    }

    fn apply(&self, mut doc: Document) -> StoreResult<Document> {
        match self {
            ProjectionMode::Include { fields, keep_id } => {
                let mut projected = Document::new();
                if *keep_id {
                    if let Some(id) = doc.remove(ID_FIELD) {
                        projected.insert(ID_FIELD.to_string(), id);
                    }
                }
                for field in fields {
                    if let Some(value) = projected_value(&doc, field)? {
                        set_path(&mut projected, field, value).map_err(|_| {
                            StoreError::InvalidProjection {
                                message: format!("path collision at '{}'", field),
                            }
                        })?;
                    }
                }
                Ok(projected)
            }
            ProjectionMode::Exclude(fields) => {
                for field in fields {
                    remove_path(&mut doc, field);
                }
                Ok(doc)
            }
        }
    }
}

/// Value at an inclusion path; only embedded objects may be traversed
fn projected_value(doc: &Document, path: &str) -> StoreResult<Option<Value>> {
    let mut parts = path.split('.');
    let Some(mut current) = parts.next().and_then(|first| doc.get(first)) else {
        return Ok(None);
    };
    for part in parts {
        current = match current {
            Value::Object(map) => match map.get(part) {
                Some(value) => value,
                None => return Ok(None),
            },
            Value::Array(_) => {
                return Err(StoreError::InvalidProjection {
                    message: format!("cannot project '{}' through an array", path),
                });
            }
            _ => return Ok(None),
        };
    }
    Ok(Some(current.clone()))
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

enum UpdateKind<'a> {
    Modifiers(&'a Document),
    Replacement(&'a Document),
}

impl<'a> UpdateKind<'a> {
    fn classify(update: &'a Document) -> StoreResult<Self> {
        let modifiers = update.keys().filter(|k| k.starts_with('$')).count();
        if modifiers == 0 {
            Ok(UpdateKind::Replacement(update))
        } else if modifiers == update.len() {
            Ok(UpdateKind::Modifiers(update))
        } else {
            Err(StoreError::invalid_update(
                "cannot mix modifiers and plain fields",
            ))
        }
    }

    fn apply_to_existing(&self, doc: &Document) -> StoreResult<Document> {
        let id = doc.get(ID_FIELD).cloned();
        let updated = match self {
            UpdateKind::Replacement(replacement) => {
                let mut updated = (*replacement).clone();
                if updated.get(ID_FIELD).is_none() {
                    if let Some(id) = &id {
                        updated.insert(ID_FIELD.to_string(), id.clone());
                    }
                }
                updated
            }
            UpdateKind::Modifiers(modifiers) => apply_modifiers(doc.clone(), modifiers)?,
        };

        if updated.get(ID_FIELD) != id.as_ref() {
            return Err(StoreError::invalid_update("cannot modify _id"));
        }
        Ok(updated)
    }
}

fn apply_modifiers(mut doc: Document, modifiers: &Document) -> StoreResult<Document> {
    for (modifier, arguments) in modifiers {
        let Value::Object(arguments) = arguments else {
            return Err(StoreError::invalid_update(format!(
                "'{}' expects an object",
                modifier
            )));
        };

        for (path, value) in arguments {
            match modifier.as_str() {
                "$set" => set_path(&mut doc, path, value.clone())?,
                "$unset" => remove_path(&mut doc, path),
                "$inc" => {
                    let incremented = increment(lookup(&doc, path), value, path)?;
                    set_path(&mut doc, path, incremented)?;
                }
                "$push" => {
                    let mut items = match lookup(&doc, path) {
                        None => Vec::new(),
                        Some(Value::Array(items)) => items.clone(),
                        Some(_) => {
                            return Err(StoreError::invalid_update(format!(
                                "cannot push to non-array field '{}'",
                                path
                            )));
                        }
                    };
                    items.push(value.clone());
                    set_path(&mut doc, path, Value::Array(items))?;
                }
                other => {
                    return Err(StoreError::invalid_update(format!(
                        "unknown modifier '{}'",
                        other
                    )));
                }
            }
        }
    }
    Ok(doc)
}

fn increment(current: Option<&Value>, by: &Value, path: &str) -> StoreResult<Value> {
    let Value::Number(by) = by else {
        return Err(StoreError::invalid_update(format!(
            "'$inc' on '{}' needs a number",
            path
        )));
    };

    let current = match current {
        None => return Ok(Value::Number(by.clone())),
        Some(Value::Number(current)) => current,
        Some(_) => {
            return Err(StoreError::invalid_update(format!(
                "cannot increment non-number field '{}'",
                path
            )));
        }
    };

    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::Number(sum.into()));
        }
    }
    let sum = current.as_f64().unwrap_or_default() + by.as_f64().unwrap_or_default();
    Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| StoreError::invalid_update(format!("'$inc' on '{}' overflowed", path)))
}

/// Base document of a modifier upsert: the filter's plain equality clauses
fn equality_seed(filter: &Filter) -> StoreResult<Document> {
    let mut seed = Document::new();
    for (field, condition) in filter.clauses() {
        match condition {
            Condition::Equals(value) => set_path(&mut seed, field, value.clone())?,
            Condition::Operators(operators) => {
                if let Some(Operand::Value(value)) = operators.get("$eq") {
                    set_path(&mut seed, field, value.clone())?;
                }
            }
            Condition::Any(_) | Condition::All(_) => {}
        }
    }
    Ok(seed)
}
