//! Filter evaluation and update application for in-memory documents.
//!
//! Filters use the familiar document syntax: `{ field: value }` for equality,
//! `{ field: { "$op": operand } }` for comparisons, and `$and` / `$or` / `$nor` for
//! composition. Dotted field paths reach into nested documents.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docmap_core::error::{DocumentStoreError, DocumentStoreResult};


/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so that `1`, `1i64` and `1.0` compare equal. Every other
/// BSON type is kept as [`Comparable::Other`], which only equals an identical value and has no
/// ordering.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted path inside a document.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut current = document;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let value = current.get(segment)?;

        if segments.peek().is_none() {
            return Some(value);
        }

        current = value.as_document()?;
    }

    None
}

/// Compares the values found at `path` in two documents, treating a missing value as null.
pub(crate) fn compare_at(left: &Document, right: &Document, path: &str) -> Ordering {
    let left = lookup(left, path)
        .map(Comparable::from)
        .unwrap_or(Comparable::Null);
    let right = lookup(right, path)
        .map(Comparable::from)
        .unwrap_or(Comparable::Null);

    match (&left, &right) {
        (Comparable::Null, Comparable::Null) => Ordering::Equal,
        (Comparable::Null, _) => Ordering::Less,
        (_, Comparable::Null) => Ordering::Greater,
        _ => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns `true` if the document satisfies every clause of `filter`.
    pub fn matches(&self, filter: &Document) -> DocumentStoreResult<bool> {
        for (key, condition) in filter {
            let satisfied = match key.as_str() {
                "$and" => self.sub_filters(key, condition)?.iter().all(|m| *m),
                "$or" => self.sub_filters(key, condition)?.iter().any(|m| *m),
                "$nor" => !self.sub_filters(key, condition)?.iter().any(|m| *m),
                op if op.starts_with('$') => {
                    return Err(DocumentStoreError::Backend(format!("unsupported filter operator {op}")));
                }
                field => self.matches_field(field, condition)?,
            };

            if !satisfied {
                return Ok(false);
            }
        }

        Ok(true)
    }

    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> DocumentStoreResult<Vec<Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).matches(filter)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }

    fn sub_filters(&self, op: &str, condition: &Bson) -> DocumentStoreResult<Vec<bool>> {
        let filters = condition
            .as_array()
            .ok_or_else(|| DocumentStoreError::Backend(format!("{op} expects an array of filters")))?;

        filters
            .iter()
            .map(|filter| match filter {
                Bson::Document(filter) => self.matches(filter),
                _ => Err(DocumentStoreError::Backend(format!("{op} expects an array of filters"))),
            })
            .collect()
    }

    fn matches_field(&self, field: &str, condition: &Bson) -> DocumentStoreResult<bool> {
        let value = lookup(self.document, field);

        let operators = match condition {
            Bson::Document(operators) if operators.keys().all(|k| k.starts_with('$')) && !operators.is_empty() => operators,
            _ => return Ok(equals(value, condition)),
        };

        for (op, operand) in operators {
            let satisfied = match op.as_str() {
                "$eq" => equals(value, operand),
                "$ne" => !equals(value, operand),
                "$gt" => compare(value, operand, |o| o == Ordering::Greater),
                "$gte" => compare(value, operand, |o| o != Ordering::Less),
                "$lt" => compare(value, operand, |o| o == Ordering::Less),
                "$lte" => compare(value, operand, |o| o != Ordering::Greater),
                "$in" => in_list(op, value, operand)?,
                "$nin" => !in_list(op, value, operand)?,
                "$exists" => value.is_some() == is_truthy(operand),
                _ => {
                    return Err(DocumentStoreError::Backend(format!("unsupported filter operator {op}")));
                }
            };

            if !satisfied {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Equality with array semantics: an array field matches if it equals the target or any of its
/// elements does. A missing field matches `null`.
fn equals(value: Option<&Bson>, target: &Bson) -> bool {
    let target = Comparable::from(target);

    match value {
        None => target == Comparable::Null,
        Some(array @ Bson::Array(items)) => {
            Comparable::from(array) == target
                || items.iter().any(|item| Comparable::from(item) == target)
        }
        Some(value) => Comparable::from(value) == target,
    }
}

fn compare(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let Some(value) = value else {
        return false;
    };

    Comparable::from(value)
        .partial_cmp(&Comparable::from(operand))
        .is_some_and(accept)
}

fn in_list(op: &str, value: Option<&Bson>, operand: &Bson) -> DocumentStoreResult<bool> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| DocumentStoreError::Backend(format!("{op} expects an array")))?;

    Ok(candidates.iter().any(|candidate| equals(value, candidate)))
}

pub(crate) fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null => false,
        _ => true,
    }
}

/// Applies an update-operator document to `document`, returning whether anything changed.
///
/// Supports `$set`, `$unset` and `$inc`. Dotted field names address nested documents, and `$set`
/// or `$inc` create missing intermediate documents.
pub(crate) fn apply_update(document: &mut Document, update: &Document) -> DocumentStoreResult<bool> {
    if update.is_empty() || !update.keys().all(|k| k.starts_with('$')) {
        return Err(DocumentStoreError::Backend(
            "update document must contain only update operators".to_string(),
        ));
    }

    let mut changed = false;

    for (op, fields) in update {
        let fields = fields
            .as_document()
            .ok_or_else(|| DocumentStoreError::Backend(format!("{op} expects a document")))?;

        for (field, operand) in fields {
            match op.as_str() {
                "$set" => {
                    if lookup(document, field) != Some(operand) {
                        set_path(document, field, operand.clone())?;
                        changed = true;
                    }
                }
                "$unset" => {
                    changed |= unset_path(document, field);
                }
                "$inc" => {
                    let incremented = increment(lookup(document, field), operand)?;
                    set_path(document, field, incremented)?;
                    changed = true;
                }
                _ => {
                    return Err(DocumentStoreError::Backend(format!("unsupported update operator {op}")));
                }
            }
        }
    }

    Ok(changed)
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> DocumentStoreResult<()> {
    let Some((head, rest)) = path.split_once('.') else {
        document.insert(path, value);
        return Ok(());
    };

    if !document.contains_key(head) {
        document.insert(head, Document::new());
    }

    match document.get_mut(head) {
        Some(Bson::Document(inner)) => set_path(inner, rest, value),
        _ => Err(DocumentStoreError::Backend(format!(
            "cannot create field {rest} inside non-document field {head}"
        ))),
    }
}

fn unset_path(document: &mut Document, path: &str) -> bool {
    match path.split_once('.') {
        None => document.remove(path).is_some(),
        Some((head, rest)) => match document.get_mut(head) {
            Some(Bson::Document(inner)) => unset_path(inner, rest),
            _ => false,
        },
    }
}

/// Adds `by` to `current`. An `i32` sum that overflows is widened to `i64`; an `i64` overflow is
/// an error.
fn increment(current: Option<&Bson>, by: &Bson) -> DocumentStoreResult<Bson> {
    Ok(match (current, by) {
        (None, by) => by.clone(),
        (Some(Bson::Int32(a)), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(*a as i64 + *b as i64),
        },
        (Some(Bson::Int64(a)), Bson::Int64(b)) => Bson::Int64(checked_i64(*a, *b)?),
        (Some(Bson::Int32(a)), Bson::Int64(b)) => Bson::Int64(checked_i64(*a as i64, *b)?),
        (Some(Bson::Int64(a)), Bson::Int32(b)) => Bson::Int64(checked_i64(*a, *b as i64)?),
        (Some(Bson::Double(a)), Bson::Double(b)) => Bson::Double(a + b),
        (Some(Bson::Double(a)), Bson::Int32(b)) => Bson::Double(a + *b as f64),
        (Some(Bson::Double(a)), Bson::Int64(b)) => Bson::Double(a + *b as f64),
        (Some(Bson::Int32(a)), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        (Some(Bson::Int64(a)), Bson::Double(b)) => Bson::Double(*a as f64 + b),
        _ => {
            return Err(DocumentStoreError::Backend("$inc requires numeric values".to_string()));
        }
    })
}

fn checked_i64(a: i64, b: i64) -> DocumentStoreResult<i64> {
    a.checked_add(b)
        .ok_or_else(|| DocumentStoreError::Backend(format!("$inc overflows a 64-bit integer ({a} + {b})")))
}

/// Applies an inclusion or exclusion projection.
///
/// `_id` is kept unless it is explicitly excluded.
pub(crate) fn project(document: Document, projection: &Document) -> Document {
    if projection.is_empty() {
        return document;
    }

    let inclusive = projection
        .iter()
        .any(|(field, flag)| field != "_id" && is_truthy(flag));

    document
        .into_iter()
        .filter(|(field, _)| match projection.get(field) {
            Some(flag) => is_truthy(flag),
            None => !inclusive || field == "_id",
        })
        .collect()
}
