//! Tabular query results.
//!
//! A `Frame` is an ordered list of rows sharing one list of column names.
//! Every accessor resolves columns by name and fails with a `FrameError`
//! instead of panicking, so a block that reads a column the store did not
//! return fails on its own.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FrameError;

// =============================================================================
// Scalar values
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Text(_) => "text",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Scalar::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(v) => Value::from(*v),
            Scalar::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Scalar::Null)
    }
}

// =============================================================================
// Frame
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn with_columns(columns: &[&str]) -> Self {
        Self::new(columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn from_rows(columns: &[&str], rows: Vec<Vec<Scalar>>) -> Result<Self, FrameError> {
        let mut frame = Self::with_columns(columns);
        for row in rows {
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    pub fn push_row(&mut self, row: Vec<Scalar>) -> Result<(), FrameError> {
        if row.len() != self.columns.len() {
            return Err(FrameError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, FrameError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| FrameError::MissingColumn(name.to_string()))
    }

    pub fn value(&self, row: usize, column: &str) -> Result<&Scalar, FrameError> {
        let idx = self.column_index(column)?;
        self.rows
            .get(row)
            .map(|r| &r[idx])
            .ok_or(FrameError::RowOutOfRange { row, len: self.rows.len() })
    }

    pub fn f64_at(&self, row: usize, column: &str) -> Result<f64, FrameError> {
        let v = self.value(row, column)?;
        v.as_f64().ok_or_else(|| mismatch(column, "number", v))
    }

    pub fn i64_at(&self, row: usize, column: &str) -> Result<i64, FrameError> {
        let v = self.value(row, column)?;
        v.as_i64().ok_or_else(|| mismatch(column, "integer", v))
    }

    pub fn str_at(&self, row: usize, column: &str) -> Result<&str, FrameError> {
        let v = self.value(row, column)?;
        v.as_str().ok_or_else(|| mismatch(column, "text", v))
    }

    /// Sum of a numeric column. Nulls count as zero.
    pub fn sum(&self, column: &str) -> Result<f64, FrameError> {
        self.sum_where(column, |_, _| Ok(true))
    }

    pub fn sum_where<F>(&self, column: &str, mut keep: F) -> Result<f64, FrameError>
    where
        F: FnMut(&Frame, usize) -> Result<bool, FrameError>,
    {
        let idx = self.column_index(column)?;
        let mut total = 0.0;
        for (i, row) in self.rows.iter().enumerate() {
            if !keep(self, i)? {
                continue;
            }
            match &row[idx] {
                Scalar::Null => {}
                v => total += v.as_f64().ok_or_else(|| mismatch(column, "number", v))?,
            }
        }
        Ok(total)
    }

    /// Stable ascending sort on a numeric column. Nulls go last.
    pub fn sorted_by_number(&self, column: &str) -> Result<Frame, FrameError> {
        let idx = self.column_index(column)?;
        for row in &self.rows {
            let v = &row[idx];
            if !v.is_null() && v.as_f64().is_none() {
                return Err(mismatch(column, "number", v));
            }
        }
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| match (a[idx].as_f64(), b[idx].as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        Ok(Frame { columns: self.columns.clone(), rows })
    }

    /// Stable sort by an integer rank computed per row.
    pub fn sorted_by_rank<F>(&self, mut rank: F) -> Result<Frame, FrameError>
    where
        F: FnMut(&Frame, usize) -> Result<usize, FrameError>,
    {
        let mut ranked = Vec::with_capacity(self.rows.len());
        for i in 0..self.rows.len() {
            ranked.push((rank(self, i)?, i));
        }
        ranked.sort_by_key(|(r, _)| *r);
        let rows = ranked.into_iter().map(|(_, i)| self.rows[i].clone()).collect();
        Ok(Frame { columns: self.columns.clone(), rows })
    }

    pub fn filter<F>(&self, mut keep: F) -> Result<Frame, FrameError>
    where
        F: FnMut(&Frame, usize) -> Result<bool, FrameError>,
    {
        let mut rows = Vec::new();
        for i in 0..self.rows.len() {
            if keep(self, i)? {
                rows.push(self.rows[i].clone());
            }
        }
        Ok(Frame { columns: self.columns.clone(), rows })
    }

    /// Drops every row holding a null in any of `columns`.
    pub fn drop_nulls(&self, columns: &[&str]) -> Result<Frame, FrameError> {
        let idxs = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>, _>>()?;
        self.filter(|f, i| Ok(idxs.iter().all(|&c| !f.rows[i][c].is_null())))
    }

    pub fn head(&self, n: usize) -> Frame {
        Frame {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Appends a column computed from each row.
    pub fn with_column<F>(&self, name: &str, mut compute: F) -> Result<Frame, FrameError>
    where
        F: FnMut(&Frame, usize) -> Result<Scalar, FrameError>,
    {
        let mut out = self.clone();
        let mut values = Vec::with_capacity(self.rows.len());
        for i in 0..self.rows.len() {
            values.push(compute(self, i)?);
        }
        out.columns.push(name.to_string());
        for (row, v) in out.rows.iter_mut().zip(values) {
            row.push(v);
        }
        Ok(out)
    }

    /// Row index of the first row whose text `column` equals `label`.
    pub fn find(&self, column: &str, label: &str) -> Result<Option<usize>, FrameError> {
        let idx = self.column_index(column)?;
        Ok(self.rows.iter().position(|r| r[idx].as_str() == Some(label)))
    }

    /// Rows as JSON objects restricted to `columns`, for chart data.
    pub fn records(&self, columns: &[&str]) -> Result<Vec<Value>, FrameError> {
        let idxs = columns
            .iter()
            .map(|c| self.column_index(c).map(|i| (*c, i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self
            .rows
            .iter()
            .map(|row| {
                let mut m = Map::new();
                for (name, i) in &idxs {
                    m.insert((*name).to_string(), row[*i].to_json());
                }
                Value::Object(m)
            })
            .collect())
    }
}

fn mismatch(column: &str, expected: &'static str, found: &Scalar) -> FrameError {
    FrameError::TypeMismatch {
        column: column.to_string(),
        expected,
        found: found.type_name(),
    }
}
