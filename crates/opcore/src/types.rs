//! Declared types of operation inputs and outputs.
//!
//! Types are only compared statically, before a workflow runs. Values are
//! never checked against them at run time.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Null,
    Bool,
    Number,
    String,
    Bytes,
    Json,
    Array,
    Object,
    /// A domain type known only by its name, e.g. `Named("Hamiltonian")`.
    Named(String),
    /// A type referred to by name before it is available (a forward reference).
    Ref(String),
    /// The generic type marker: the type of types.
    Type,
    /// Any one of the listed alternatives.
    Union(Vec<DataType>),
}

impl DataType {
    pub fn named(name: impl Into<String>) -> Self {
        DataType::Named(name.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        DataType::Ref(name.into())
    }

    /// `inner | null`
    pub fn optional(inner: DataType) -> Self {
        DataType::Union(vec![inner, DataType::Null])
    }

    /// Parse a type name as written in workflow definition files.
    ///
    /// Built-in names are matched case-insensitively, `a | b` builds a union
    /// and every other name becomes a [`DataType::Named`] domain type.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name.contains('|') {
            return DataType::Union(name.split('|').map(DataType::parse).collect());
        }
        match name.to_ascii_lowercase().as_str() {
            "null" | "none" => DataType::Null,
            "bool" => DataType::Bool,
            "number" => DataType::Number,
            "string" => DataType::String,
            "bytes" => DataType::Bytes,
            "json" => DataType::Json,
            "array" => DataType::Array,
            "object" => DataType::Object,
            "type" => DataType::Type,
            _ => DataType::Named(name.to_string()),
        }
    }

    /// Name used in error messages and by-name comparisons.
    pub fn name(&self) -> String {
        match self {
            DataType::Null => "null".to_string(),
            DataType::Bool => "bool".to_string(),
            DataType::Number => "number".to_string(),
            DataType::String => "string".to_string(),
            DataType::Bytes => "bytes".to_string(),
            DataType::Json => "json".to_string(),
            DataType::Array => "array".to_string(),
            DataType::Object => "object".to_string(),
            DataType::Named(name) | DataType::Ref(name) => name.clone(),
            DataType::Type => "type".to_string(),
            DataType::Union(members) => members
                .iter()
                .map(DataType::name)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    /// Whether an input declared with `self` may be fed by an output declared
    /// as `produced`.
    ///
    /// - a union input accepts only when [`DataType::Type`] is one of its
    ///   alternatives;
    /// - a by-name producer matches when the names are equal;
    /// - anything else must match exactly.
    pub fn accepts(&self, produced: &DataType) -> bool {
        match (self, produced) {
            (DataType::Union(members), _) => members.contains(&DataType::Type),
            (_, DataType::Ref(name)) => *name == self.name(),
            _ => self == produced,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
