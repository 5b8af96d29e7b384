//! Tabular data the interpreters read variable values from.
//!
//! The engine only needs random access to dense columns; storage, loading
//! and partitioning belong to the caller. [`Table`] is a simple in-memory
//! implementation and [`ModifiableTable`] is the "what-if" variant used to
//! replace a variable's values, which must never be cached by the batch
//! interpreter.

use crate::EvalError;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for dataset identities
static DATASET_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_id() -> DatasetId {
    DatasetId(DATASET_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Identity of a dataset instance, used to key column caches.
///
/// Two datasets never share an id, even if they hold identical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetId(u64);

/// Declared type of a dataset variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Numeric,
    Categorical,
}

/// Data collaborator contract required by the interpreters.
pub trait Dataset {
    /// Identity of this dataset instance
    fn id(&self) -> DatasetId;

    /// Number of rows; every column has exactly this length
    fn rows(&self) -> usize;

    /// Declared kind of `name`, or `None` if the variable does not exist
    fn variable_kind(&self, name: &str) -> Option<VariableKind>;

    /// Dense numeric column for `name`
    fn double_values(&self, name: &str) -> Option<&[f64]>;

    /// Dense categorical column for `name`
    fn string_values(&self, name: &str) -> Option<&[String]>;

    /// Names of all numeric variables
    fn numeric_variables(&self) -> Vec<&str>;

    /// Mutable datasets can change between calls and must never be cached
    fn is_mutable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
enum Column {
    Numeric(Arc<[f64]>),
    Categorical(Arc<[String]>),
}

impl Column {
    fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Categorical(values) => values.len(),
        }
    }

    fn kind(&self) -> VariableKind {
        match self {
            Column::Numeric(_) => VariableKind::Numeric,
            Column::Categorical(_) => VariableKind::Categorical,
        }
    }
}

/// Column storage shared by [`Table`] and [`ModifiableTable`]
#[derive(Debug, Clone, Default)]
struct Columns {
    rows: usize,
    /// Declaration order, for deterministic iteration
    names: Vec<String>,
    columns: FxHashMap<String, Column>,
}

impl Columns {
    fn double_values(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            Column::Numeric(values) => Some(&values[..]),
            Column::Categorical(_) => None,
        }
    }

    fn string_values(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name)? {
            Column::Categorical(values) => Some(&values[..]),
            Column::Numeric(_) => None,
        }
    }

    fn numeric_variables(&self) -> Vec<&str> {
        self.names
            .iter()
            .filter(|name| self.double_values(name).is_some())
            .map(String::as_str)
            .collect()
    }
}

/// Immutable in-memory dataset.
///
/// Cloning is cheap (columns are shared) and yields the same identity, since
/// the clone can never observe different values.
#[derive(Debug, Clone)]
pub struct Table {
    id: DatasetId,
    data: Columns,
}

impl Table {
    pub fn builder() -> TableBuilder {
        TableBuilder::default()
    }

    /// Shorthand for a table made only of numeric columns
    ///
    /// # Errors
    ///
    /// Same as [`TableBuilder::build`].
    pub fn from_numeric<S: Into<String>>(
        columns: impl IntoIterator<Item = (S, Vec<f64>)>,
    ) -> Result<Self, EvalError> {
        columns
            .into_iter()
            .fold(Table::builder(), |builder, (name, values)| {
                builder.numeric(name, values)
            })
            .build()
    }

    /// Derive a mutable copy that can have variables replaced
    pub fn to_modifiable(&self) -> ModifiableTable {
        ModifiableTable {
            id: next_id(),
            data: self.data.clone(),
        }
    }

    /// Variable names in declaration order
    pub fn variable_names(&self) -> &[String] {
        &self.data.names
    }
}

impl Dataset for Table {
    fn id(&self) -> DatasetId {
        self.id
    }

    fn rows(&self) -> usize {
        self.data.rows
    }

    fn variable_kind(&self, name: &str) -> Option<VariableKind> {
        self.data.columns.get(name).map(Column::kind)
    }

    fn double_values(&self, name: &str) -> Option<&[f64]> {
        self.data.double_values(name)
    }

    fn string_values(&self, name: &str) -> Option<&[String]> {
        self.data.string_values(name)
    }

    fn numeric_variables(&self) -> Vec<&str> {
        self.data.numeric_variables()
    }
}

/// Builder for [`Table`]
#[derive(Debug, Default)]
pub struct TableBuilder {
    columns: Vec<(String, Column)>,
}

impl TableBuilder {
    pub fn numeric(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.columns.push((name.into(), Column::Numeric(values.into())));
        self
    }

    pub fn categorical(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.columns.push((name.into(), Column::Categorical(values.into())));
        self
    }

    /// Validate column lengths and names and build the table.
    ///
    /// # Errors
    ///
    /// - `ColumnLengthMismatch` if columns differ in length
    /// - `DuplicateVariable` if a name is used twice
    pub fn build(self) -> Result<Table, EvalError> {
        let rows = self.columns.first().map_or(0, |(_, column)| column.len());
        let mut data = Columns {
            rows,
            names: Vec::with_capacity(self.columns.len()),
            columns: FxHashMap::default(),
        };

        for (name, column) in self.columns {
            if column.len() != rows {
                return Err(EvalError::ColumnLengthMismatch {
                    name,
                    expected: rows,
                    got: column.len(),
                });
            }
            if data.columns.contains_key(&name) {
                return Err(EvalError::DuplicateVariable { name });
            }
            data.names.push(name.clone());
            data.columns.insert(name, column);
        }

        Ok(Table { id: next_id(), data })
    }
}

/// Dataset whose numeric variables can be replaced in place.
///
/// Used for what-if analyses (e.g. replacing a variable by its mean to
/// measure its impact). Reports itself as mutable, so column caches reload
/// it on every evaluation.
#[derive(Debug, Clone)]
pub struct ModifiableTable {
    id: DatasetId,
    data: Columns,
}

impl ModifiableTable {
    /// Replace the values of a numeric variable.
    ///
    /// # Errors
    ///
    /// - `UnknownVariable` if `name` does not exist
    /// - `VariableNotMutable` if `name` is categorical
    /// - `ColumnLengthMismatch` if `values` has the wrong length
    pub fn replace_variable(&mut self, name: &str, values: Vec<f64>) -> Result<(), EvalError> {
        let rows = self.data.rows;
        let column = self
            .data
            .columns
            .get_mut(name)
            .ok_or_else(|| EvalError::UnknownVariable {
                name: name.to_owned(),
            })?;
        if let Column::Categorical(_) = column {
            return Err(EvalError::VariableNotMutable {
                name: name.to_owned(),
            });
        }
        if values.len() != rows {
            return Err(EvalError::ColumnLengthMismatch {
                name: name.to_owned(),
                expected: rows,
                got: values.len(),
            });
        }
        *column = Column::Numeric(values.into());
        Ok(())
    }
}

impl Dataset for ModifiableTable {
    fn id(&self) -> DatasetId {
        self.id
    }

    fn rows(&self) -> usize {
        self.data.rows
    }

    fn variable_kind(&self, name: &str) -> Option<VariableKind> {
        self.data.columns.get(name).map(Column::kind)
    }

    fn double_values(&self, name: &str) -> Option<&[f64]> {
        self.data.double_values(name)
    }

    fn string_values(&self, name: &str) -> Option<&[String]> {
        self.data.string_values(name)
    }

    fn numeric_variables(&self) -> Vec<&str> {
        self.data.numeric_variables()
    }

    fn is_mutable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::builder()
            .numeric("x", vec![0.0, 1.0, 2.0])
            .categorical("c", vec!["a".into(), "b".into(), "a".into()])
            .build()
            .unwrap()
    }

    #[test]
    fn test_table_lookup() {
        let table = sample();
        assert_eq!(table.rows(), 3);
        assert_eq!(table.double_values("x"), Some(&[0.0, 1.0, 2.0][..]));
        assert_eq!(table.double_values("c"), None);
        assert_eq!(table.string_values("c").map(<[String]>::len), Some(3));
        assert_eq!(table.variable_kind("x"), Some(VariableKind::Numeric));
        assert_eq!(table.variable_kind("c"), Some(VariableKind::Categorical));
        assert_eq!(table.variable_kind("nope"), None);
        assert_eq!(table.numeric_variables(), ["x"]);
        assert!(!table.is_mutable());
    }

    #[test]
    fn test_builder_validation() {
        let err = Table::builder()
            .numeric("x", vec![0.0, 1.0])
            .numeric("y", vec![0.0])
            .build()
            .unwrap_err();
        assert!(matches!(err, EvalError::ColumnLengthMismatch { .. }));

        let err = Table::builder()
            .numeric("x", vec![0.0])
            .numeric("x", vec![1.0])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::DuplicateVariable {
                name: "x".to_owned()
            }
        );
    }

    #[test]
    fn test_identity() {
        let a = sample();
        let b = sample();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
        assert_ne!(a.id(), a.to_modifiable().id());
    }

    #[test]
    fn test_modifiable_replace() {
        let table = sample();
        let mut modifiable = table.to_modifiable();
        assert!(modifiable.is_mutable());

        modifiable
            .replace_variable("x", vec![5.0, 5.0, 5.0])
            .unwrap();
        assert_eq!(modifiable.double_values("x"), Some(&[5.0, 5.0, 5.0][..]));
        // Source table is untouched
        assert_eq!(table.double_values("x"), Some(&[0.0, 1.0, 2.0][..]));

        assert!(matches!(
            modifiable.replace_variable("c", vec![0.0; 3]),
            Err(EvalError::VariableNotMutable { .. })
        ));
        assert!(matches!(
            modifiable.replace_variable("x", vec![0.0; 2]),
            Err(EvalError::ColumnLengthMismatch { .. })
        ));
        assert!(matches!(
            modifiable.replace_variable("zz", vec![0.0; 3]),
            Err(EvalError::UnknownVariable { .. })
        ));
    }
}
