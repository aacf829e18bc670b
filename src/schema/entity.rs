use crate::core::{AttributeType, RecordError, Result, Row, Value};
use serde::{Deserialize, Serialize};

/// One persisted property of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescription {
    pub name: String,
    pub attribute_type: AttributeType,
    #[serde(default = "default_optional")]
    pub optional: bool,
    #[serde(default = "default_value")]
    pub default_value: Value,
}

fn default_optional() -> bool {
    true
}

fn default_value() -> Value {
    Value::Null
}

impl AttributeDescription {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            optional: true,
            default_value: Value::Null,
        }
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn validate(&self, entity: &str, value: &Value) -> Result<()> {
        if value.is_null() {
            if !self.optional {
                return Err(RecordError::ConstraintViolation(format!(
                    "Attribute '{}.{}' cannot be NULL",
                    entity, self.name
                )));
            }
            return Ok(());
        }

        if !self.attribute_type.is_compatible(value) {
            return Err(RecordError::TypeMismatch(format!(
                "Attribute '{}.{}' expects type {}, got {}",
                entity,
                self.name,
                self.attribute_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}

/// Schema of one record type: its name and attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    name: String,
    attributes: Vec<AttributeDescription>,
}

impl EntityDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute, replacing any existing attribute of the same name.
    pub fn attribute(mut self, attribute: AttributeDescription) -> Self {
        self.attributes.retain(|a| a.name != attribute.name);
        self.attributes.push(attribute);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[AttributeDescription] {
        &self.attributes
    }

    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDescription> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    pub fn require_attribute(&self, name: &str) -> Result<&AttributeDescription> {
        self.get_attribute(name)
            .ok_or_else(|| RecordError::UnknownAttribute(name.to_string(), self.name.clone()))
    }

    /// A row holding every attribute's default value.
    pub fn default_row(&self) -> Row {
        self.attributes
            .iter()
            .map(|a| (a.name.clone(), a.default_value.clone()))
            .collect()
    }

    /// Checks a full row against this entity before it is committed.
    pub fn validate_row(&self, row: &Row) -> Result<()> {
        for key in row.keys() {
            self.require_attribute(key)?;
        }
        for attribute in &self.attributes {
            let value = row.get(&attribute.name).unwrap_or(&Value::Null);
            attribute.validate(&self.name, value)?;
        }
        Ok(())
    }

    pub(crate) fn check_well_formed(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RecordError::InvalidSchema(
                "Entity name must not be empty".to_string(),
            ));
        }
        for (idx, attribute) in self.attributes.iter().enumerate() {
            if attribute.name.trim().is_empty() {
                return Err(RecordError::InvalidSchema(format!(
                    "Entity '{}' has an attribute with an empty name",
                    self.name
                )));
            }
            if self.attributes[..idx].iter().any(|a| a.name == attribute.name) {
                return Err(RecordError::InvalidSchema(format!(
                    "Entity '{}' declares attribute '{}' twice",
                    self.name, attribute.name
                )));
            }
            if !attribute.attribute_type.is_compatible(&attribute.default_value) {
                return Err(RecordError::InvalidSchema(format!(
                    "Default value of '{}.{}' is not a {}",
                    self.name, attribute.name, attribute.attribute_type
                )));
            }
        }
        Ok(())
    }
}
