//! Results of introspection queries

use std::ops::Index;

/// Ordered scalar text values from one query against one connection
///
/// Values keep the row order the engine produced them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    rows: Vec<String>,
}

impl QueryResult {
    pub fn new(rows: Vec<String>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.rows.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.rows
    }
}

impl From<Vec<String>> for QueryResult {
    fn from(rows: Vec<String>) -> Self {
        Self::new(rows)
    }
}

impl Index<usize> for QueryResult {
    type Output = String;

    fn index(&self, index: usize) -> &Self::Output {
        &self.rows[index]
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl PartialEq<[&str]> for QueryResult {
    fn eq(&self, other: &[&str]) -> bool {
        self.rows.len() == other.len() && self.rows.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for QueryResult {
    fn eq(&self, other: &[&str; N]) -> bool {
        self == &other[..]
    }
}
