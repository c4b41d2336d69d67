//! Schema declarations - record types as ordered, typed field lists
//!
//! A schema is declared once at startup and never mutated. Declaring it
//! derives the two statements the store needs for every record type:
//! - `CREATE TABLE IF NOT EXISTS` with one column per field
//! - a positional `INSERT` with one `?N` placeholder per field
//!
//! Identifiers are restricted to `[A-Za-z_][A-Za-z0-9_]*` and always quoted
//! in generated SQL, so no caller-supplied text reaches a statement unchecked.
//! SQLite resolves table and column names without regard to ASCII case, so
//! uniqueness checks here do the same.

use std::collections::HashSet;
use std::fmt;

/// Errors raised while declaring schemas or populating a registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema {0} declares no fields")]
    NoFields(String),

    #[error("Schema {schema} declares field {field} more than once")]
    DuplicateField { schema: String, field: String },

    #[error("Key field {field} is not a field of schema {schema}")]
    UnknownKeyField { schema: String, field: String },

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Identifier {0:?} uses the reserved sqlite_ prefix")]
    ReservedIdentifier(String),

    #[error("Schema {0} is already registered")]
    DuplicateSchema(String),
}

/// Declared type of a field.
///
/// Every value is stored and returned as a string; the type only adds
/// column constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Free-form text
    Text,
    /// `"true"` or `"false"`
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Boolean => "boolean",
        }
    }

    /// Column definition for a field of this type (TEXT affinity in both cases)
    fn column_sql(&self, column: &str) -> String {
        match self {
            FieldType::Text => format!("{} TEXT NOT NULL", column),
            FieldType::Boolean => {
                format!("{0} TEXT NOT NULL CHECK ({0} IN ('true', 'false'))", column)
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, typed field of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
}

/// Immutable record type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    key_index: Option<usize>,
    create_sql: String,
    insert_sql: String,
}

impl Schema {
    /// Declare a schema.
    ///
    /// `key_field` names the field the store keeps unique; `None` declares a
    /// schema without a key.
    pub fn define<N>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (N, FieldType)>,
        key_field: Option<&str>,
    ) -> Result<Self, SchemaError>
    where
        N: Into<String>,
    {
        let name = name.into();
        check_identifier(&name)?;

        let fields: Vec<Field> = fields
            .into_iter()
            .map(|(field_name, field_type)| Field {
                name: field_name.into(),
                field_type,
            })
            .collect();

        if fields.is_empty() {
            return Err(SchemaError::NoFields(name));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            check_identifier(&field.name)?;
            if !seen.insert(field.name.to_ascii_lowercase()) {
                return Err(SchemaError::DuplicateField {
                    schema: name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        let key_index = match key_field {
            Some(key) => Some(fields.iter().position(|f| f.name == key).ok_or_else(|| {
                SchemaError::UnknownKeyField {
                    schema: name.clone(),
                    field: key.to_string(),
                }
            })?),
            None => None,
        };

        let create_sql = build_create_statement(&name, &fields, key_index);
        let insert_sql = build_insert_statement(&name, &fields);

        Ok(Self {
            name,
            fields,
            key_index,
            create_sql,
            insert_sql,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Position of a field by name
    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field)
    }

    pub fn key_index(&self) -> Option<usize> {
        self.key_index
    }

    pub fn key_field(&self) -> Option<&Field> {
        self.key_index.map(|i| &self.fields[i])
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this schema
    pub fn create_statement(&self) -> &str {
        &self.create_sql
    }

    /// Positional insert statement, `?1..?N` in field order
    pub fn insert_statement(&self) -> &str {
        &self.insert_sql
    }

    /// Column list in declaration order, quoted
    pub(crate) fn column_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| quote(&f.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Quoted table name
    pub(crate) fn table(&self) -> String {
        quote(&self.name)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.field_type)?;
            if Some(i) == self.key_index {
                write!(f, " [key]")?;
            }
        }
        write!(f, ")")
    }
}

/// Ordered catalog of schemas.
///
/// Populated before the store is constructed; the store takes ownership and
/// only hands out shared references afterwards.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from already declared schemas
    pub fn from_schemas(schemas: impl IntoIterator<Item = Schema>) -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        for schema in schemas {
            registry.register(schema)?;
        }
        Ok(registry)
    }

    /// Add a schema; names must be unique within the registry, ignoring case
    pub fn register(&mut self, schema: Schema) -> Result<&Schema, SchemaError> {
        if self.names().any(|n| n.eq_ignore_ascii_case(schema.name())) {
            return Err(SchemaError::DuplicateSchema(schema.name));
        }
        self.schemas.push(schema);
        Ok(&self.schemas[self.schemas.len() - 1])
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, schema: &Schema) -> bool {
        self.get(schema.name()).is_some_and(|s| s == schema)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn check_identifier(ident: &str) -> Result<(), SchemaError> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(SchemaError::InvalidIdentifier(ident.to_string()));
    }
    if ident.get(..7).is_some_and(|prefix| prefix.eq_ignore_ascii_case("sqlite_")) {
        return Err(SchemaError::ReservedIdentifier(ident.to_string()));
    }
    Ok(())
}

pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident)
}

fn build_create_statement(name: &str, fields: &[Field], key_index: Option<usize>) -> String {
    let columns: Vec<String> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let mut column = field.field_type.column_sql(&quote(&field.name));
            if Some(i) == key_index {
                column.push_str(" UNIQUE");
            }
            column
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote(name),
        columns.join(",\n    ")
    )
}

fn build_insert_statement(name: &str, fields: &[Field]) -> String {
    let columns: Vec<String> = fields.iter().map(|f| quote(&f.name)).collect();
    let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("?{}", i)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(name),
        columns.join(", "),
        placeholders.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Schema {
        Schema::define(
            "users",
            [
                ("username", FieldType::Text),
                ("fname", FieldType::Text),
                ("lname", FieldType::Text),
                ("createdAt", FieldType::Text),
                ("hash", FieldType::Text),
                ("salt", FieldType::Text),
            ],
            Some("username"),
        )
        .unwrap()
    }

    #[test]
    fn test_define_keeps_declaration_order() {
        let schema = users();
        let names: Vec<_> = schema.field_names().collect();
        assert_eq!(names, ["username", "fname", "lname", "createdAt", "hash", "salt"]);
        assert_eq!(schema.key_index(), Some(0));
        assert_eq!(schema.key_field().unwrap().name, "username");
        assert_eq!(schema.position("hash"), Some(4));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = Schema::define(
            "pairs",
            [("a", FieldType::Text), ("a", FieldType::Text)],
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateField { schema: "pairs".into(), field: "a".into() }
        );
    }

    #[test]
    fn test_unknown_key_field_rejected() {
        let err = Schema::define("t", [("a", FieldType::Text)], Some("b")).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownKeyField { .. }));
    }

    #[test]
    fn test_empty_and_invalid_declarations() {
        let empty: [(&str, FieldType); 0] = [];
        assert_eq!(
            Schema::define("t", empty, None).unwrap_err(),
            SchemaError::NoFields("t".into())
        );
        assert!(Schema::define("bad name", [("a", FieldType::Text)], None).is_err());
        assert!(Schema::define("t", [("1a", FieldType::Text)], None).is_err());
        assert!(Schema::define("t", [("a\"; DROP", FieldType::Text)], None).is_err());
    }

    #[test]
    fn test_create_statement() {
        let schema = Schema::define(
            "contacts",
            [("contactId", FieldType::Text), ("emergency", FieldType::Boolean)],
            Some("contactId"),
        )
        .unwrap();
        assert_eq!(
            schema.create_statement(),
            "CREATE TABLE IF NOT EXISTS \"contacts\" (\n    \
             \"contactId\" TEXT NOT NULL UNIQUE,\n    \
             \"emergency\" TEXT NOT NULL CHECK (\"emergency\" IN ('true', 'false'))\n)"
        );
    }

    #[test]
    fn test_keyless_create_statement_has_no_unique() {
        let schema = Schema::define("notes", [("body", FieldType::Text)], None).unwrap();
        assert!(!schema.create_statement().contains("UNIQUE"));
        assert!(schema.key_field().is_none());
    }

    #[test]
    fn test_insert_statement_placeholders() {
        let schema = users();
        assert_eq!(
            schema.insert_statement(),
            "INSERT INTO \"users\" (\"username\", \"fname\", \"lname\", \"createdAt\", \"hash\", \"salt\") \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        );
    }

    #[test]
    fn test_field_names_differing_in_case_rejected() {
        let err = Schema::define(
            "t",
            [("id", FieldType::Text), ("ID", FieldType::Text)],
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateField { schema: "t".into(), field: "ID".into() }
        );
    }

    #[test]
    fn test_reserved_prefix_rejected() {
        for name in ["sqlite_log", "SQLite_master"] {
            assert_eq!(
                Schema::define(name, [("a", FieldType::Text)], None).unwrap_err(),
                SchemaError::ReservedIdentifier(name.into())
            );
        }
        assert!(matches!(
            Schema::define("t", [("sqlite_rowid", FieldType::Text)], None),
            Err(SchemaError::ReservedIdentifier(_))
        ));
        assert!(Schema::define("sqlitelog", [("a", FieldType::Text)], None).is_ok());
    }

    #[test]
    fn test_registry_rejects_duplicate_names() {
        let mut registry = SchemaRegistry::new();
        registry.register(users()).unwrap();
        assert_eq!(
            registry.register(users()).unwrap_err(),
            SchemaError::DuplicateSchema("users".into())
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&users()));
        assert!(registry.get("trips").is_none());
    }

    #[test]
    fn test_registry_names_ignore_case() {
        let notes = Schema::define("notes", [("body", FieldType::Text)], None).unwrap();
        let shouting = Schema::define(
            "NOTES",
            [("title", FieldType::Text), ("owner", FieldType::Text)],
            None,
        )
        .unwrap();

        let mut registry = SchemaRegistry::new();
        registry.register(notes).unwrap();
        assert_eq!(
            registry.register(shouting).unwrap_err(),
            SchemaError::DuplicateSchema("NOTES".into())
        );
        assert_eq!(registry.len(), 1);
    }
}
