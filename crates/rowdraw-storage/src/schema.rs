use rustc_hash::FxHashSet;
use rowdraw_common::error::{Error, Result};
use rowdraw_common::types::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub mode: FieldMode,
    pub description: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, mode: FieldMode) -> Self {
        Self {
            name: name.into(),
            data_type,
            mode,
            description: None,
        }
    }

    pub fn nullable(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, FieldMode::Nullable)
    }

    pub fn required(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, FieldMode::Required)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_nullable(&self) -> bool {
        self.mode == FieldMode::Nullable
    }
}

/// Ordered, typed column list of a relation. Column order is declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn from_fields(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Schema made of the fields at `indices`, in that order.
    pub fn project(&self, indices: &[usize]) -> Result<Schema> {
        indices
            .iter()
            .map(|&i| {
                self.fields.get(i).cloned().ok_or_else(|| {
                    Error::internal(format!(
                        "projection index {} out of range ({} fields)",
                        i,
                        self.fields.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Schema::from_fields)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(Error::schema_mismatch("relation must have at least one column"));
        }
        let mut seen = FxHashSet::default();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(Error::schema_mismatch(format!(
                    "Duplicate field name: {}",
                    field.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Schema {
        Schema::from_fields(vec![
            Field::required("id", DataType::Int64),
            Field::nullable("name", DataType::String),
            Field::nullable("score", DataType::Float64),
        ])
    }

    #[test]
    fn test_field_constructors() {
        let field = Field::required("id", DataType::Int64).with_description("primary key");
        assert_eq!(field.mode, FieldMode::Required);
        assert!(!field.is_nullable());
        assert_eq!(field.description.as_deref(), Some("primary key"));
        assert!(Field::nullable("x", DataType::Bool).is_nullable());
    }

    #[test]
    fn test_field_lookup_is_exact() {
        let schema = users();
        assert_eq!(schema.field_index("name"), Some(1));
        assert_eq!(schema.field_index("NAME"), None);
        assert_eq!(schema.field("score").map(|f| &f.data_type), Some(&DataType::Float64));
        assert_eq!(schema.field_names(), vec!["id", "name", "score"]);
    }

    #[test]
    fn test_project() {
        let schema = users();
        let projected = schema.project(&[2, 0]).unwrap();
        assert_eq!(projected.field_names(), vec!["score", "id"]);
        assert!(schema.project(&[3]).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(users().validate().is_ok());
        assert!(Schema::new().validate().is_err());
        let dup = Schema::from_fields(vec![
            Field::nullable("a", DataType::Int64),
            Field::nullable("a", DataType::String),
        ]);
        assert!(matches!(dup.validate(), Err(Error::SchemaMismatch(_))));
    }
}
