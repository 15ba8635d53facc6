// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Result rows
//!
//! A row can be read positionally or by column name, so callers work the
//! same whether the driver returns tuples or mappings.

use std::borrow::Cow;

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Row with named columns
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Row without column names (tuple mode)
    pub fn tuple(values: Vec<Value>) -> Self {
        Self {
            columns: Vec::new(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Case-insensitive lookup by column name
    pub fn get_named(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
    }

    /// Named column if present, else the value at `index`
    pub fn get_either(&self, column: &str, index: usize) -> Option<&Value> {
        self.get_named(column).or_else(|| self.get(index))
    }

    pub fn text(&self, index: usize) -> Option<Cow<'_, str>> {
        self.get(index).and_then(Value::as_text)
    }

    pub fn text_named(&self, column: &str) -> Option<Cow<'_, str>> {
        self.get_named(column).and_then(Value::as_text)
    }

    /// Every non-null value concatenated, as text
    pub fn joined_text(&self) -> String {
        self.values.iter().filter_map(Value::as_text).collect()
    }
}

impl Serialize for Row {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (i, value) in self.values.iter().enumerate() {
            match self.columns.get(i) {
                Some(name) => map.serialize_entry(name, value)?,
                None => map.serialize_entry(&i.to_string(), value)?,
            }
        }
        map.end()
    }
}

/// Outcome of one statement
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryResult {
    pub rows_affected: u64,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows_affected: 0,
            rows,
        }
    }
}
