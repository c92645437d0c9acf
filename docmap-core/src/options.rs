//! Find options passed through to the store driver.
//!
//! The repository never reads these options. They travel untouched from the caller to
//! [`StoreDriver::find`](crate::driver::StoreDriver::find) and
//! [`StoreDriver::find_one`](crate::driver::StoreDriver::find_one), and each driver translates
//! them into its own native form.
//!
//! Field names in `sort` and `projection` are given in stored form.
//!
//! ```ignore
//! use docmap::options::{FindOptions, SortDirection};
//!
//! let options = FindOptions::builder()
//!     .sort("usr_name", SortDirection::Asc)
//!     .skip(20)
//!     .limit(10)
//!     .build();
//! ```

use bson::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Returns the conventional numeric form (`1` / `-1`) used in sort documents.
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    /// Sort keys, most significant first.
    pub sort: Vec<Sort>,
    pub projection: Option<Document>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::new()
    }

    /// Renders the sort keys as a sort document, or `None` when no sort was requested.
    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }

        Some(
            self.sort
                .iter()
                .map(|sort| (sort.field.clone(), sort.direction.as_i32().into()))
                .collect()
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    pub fn new() -> Self {
        FindOptionsBuilder { options: FindOptions::default() }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = Some(skip);
        self
    }

    /// Appends a sort key. Keys added first take precedence.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.options.sort.push(Sort { field: field.into(), direction });
        self
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.options.projection = Some(projection);
        self
    }

    pub fn build(self) -> FindOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn test_sort_document_keeps_key_order() {
        let options = FindOptions::builder()
            .sort("usr_name", SortDirection::Asc)
            .sort("age", SortDirection::Desc)
            .build();

        let sort = options.sort_document().unwrap();
        let keys = sort.keys().map(String::as_str).collect::<Vec<_>>();

        assert_eq!(keys, vec!["usr_name", "age"]);
        assert_eq!(sort, doc! { "usr_name": 1, "age": -1 });
    }

    #[test]
    fn test_empty_sort_renders_nothing() {
        assert!(FindOptions::new().sort_document().is_none());
    }
}
