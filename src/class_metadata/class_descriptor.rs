use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::association::AssociationMapping;
use super::errors::MappingError;
use crate::query::value::ParameterType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InheritanceType {
    #[default]
    None,
    SingleTable,
    Joined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TableRef {
    pub name: String,
    pub schema: Option<String>,
    pub quoted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Float,
    String,
    Text,
    Boolean,
    Date,
    Time,
    DateTime,
    Json,
    Guid,
}

impl ColumnType {
    pub fn is_integer_like(&self) -> bool {
        matches!(
            self,
            ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ColumnType::Date | ColumnType::Time | ColumnType::DateTime
        )
    }

    /// Parameter type used when a value is bound against a column of this type
    pub fn binding_type(&self) -> ParameterType {
        match self {
            ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt => {
                ParameterType::Integer
            }
            ColumnType::Decimal | ColumnType::Float => ParameterType::Float,
            ColumnType::Boolean => ParameterType::Boolean,
            ColumnType::Date => ParameterType::Date,
            ColumnType::Time | ColumnType::DateTime => ParameterType::DateTime,
            ColumnType::String | ColumnType::Text | ColumnType::Json | ColumnType::Guid => {
                ParameterType::String
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub field_name: String,
    /// Empty until completed by the naming strategy
    pub column_name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub id: bool,
    pub quoted: bool,
    /// Ancestor whose table stores this column, when copied from a parent
    pub inherited: Option<String>,
    pub declared: Option<String>,
}

impl FieldMapping {
    pub fn new(field_name: impl Into<String>, column_type: ColumnType) -> Self {
        FieldMapping {
            field_name: field_name.into(),
            column_name: String::new(),
            column_type,
            nullable: false,
            unique: false,
            length: None,
            precision: None,
            scale: None,
            id: false,
            quoted: false,
            inherited: None,
            declared: None,
        }
    }

    pub fn column(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = column_name.into();
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn quoted(mut self) -> Self {
        self.quoted = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum IdGenerator {
    /// Identifier supplied by the caller
    #[default]
    Assigned,
    Identity,
    Sequence { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscriminatorColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub length: Option<u32>,
}

impl Default for DiscriminatorColumn {
    fn default() -> Self {
        DiscriminatorColumn {
            name: "dtype".to_string(),
            column_type: ColumnType::String,
            length: Some(255),
        }
    }
}

/// Per-class mapping metadata.
///
/// Descriptors are assembled with [`ClassDescriptor::builder`] and completed
/// by the [`MetadataRegistry`](super::registry::MetadataRegistry): default
/// names, inherited mappings, hierarchy lists and inverse-side links are
/// filled in there. Once registered a descriptor is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub name: String,
    pub root_entity_name: String,
    /// Ancestors, nearest first
    pub parent_classes: Vec<String>,
    /// Every descendant, in registration order
    pub sub_classes: Vec<String>,
    pub inheritance_type: InheritanceType,
    pub table: TableRef,
    pub fields: IndexMap<String, FieldMapping>,
    pub associations: IndexMap<String, AssociationMapping>,
    /// Identifier field names; may name owning to-one associations
    pub identifier: Vec<String>,
    pub id_generator: IdGenerator,
    pub version_field: Option<String>,
    pub discriminator_column: Option<DiscriminatorColumn>,
    pub discriminator_value: Option<String>,
    /// discriminator value -> class name, shared across the hierarchy
    pub discriminator_map: IndexMap<String, String>,
}

impl ClassDescriptor {
    pub fn builder(name: impl Into<String>) -> ClassDescriptorBuilder {
        let name = name.into();
        ClassDescriptorBuilder {
            descriptor: ClassDescriptor {
                root_entity_name: name.clone(),
                name,
                parent_classes: Vec::new(),
                sub_classes: Vec::new(),
                inheritance_type: InheritanceType::None,
                table: TableRef::default(),
                fields: IndexMap::new(),
                associations: IndexMap::new(),
                identifier: Vec::new(),
                id_generator: IdGenerator::Assigned,
                version_field: None,
                discriminator_column: None,
                discriminator_value: None,
                discriminator_map: IndexMap::new(),
            },
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.get(name)
    }

    pub fn association(&self, name: &str) -> Option<&AssociationMapping> {
        self.associations.get(name)
    }

    pub fn get_field(&self, name: &str) -> Result<&FieldMapping, MappingError> {
        self.fields
            .get(name)
            .ok_or_else(|| MappingError::unknown_field(&self.name, name))
    }

    pub fn get_association(&self, name: &str) -> Result<&AssociationMapping, MappingError> {
        self.associations
            .get(name)
            .ok_or_else(|| MappingError::UnknownAssociation {
                class_name: self.name.clone(),
                field: name.to_string(),
            })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn has_association(&self, name: &str) -> bool {
        self.associations.contains_key(name)
    }

    pub fn column_name(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|f| f.column_name.as_str())
    }

    pub fn field_for_column(&self, column: &str) -> Option<&str> {
        self.fields
            .values()
            .find(|f| f.column_name == column)
            .map(|f| f.field_name.as_str())
    }

    pub fn is_root(&self) -> bool {
        self.parent_classes.is_empty()
    }

    pub fn is_inheritance_type_joined(&self) -> bool {
        self.inheritance_type == InheritanceType::Joined
    }

    pub fn is_inheritance_type_single_table(&self) -> bool {
        self.inheritance_type == InheritanceType::SingleTable
    }

    pub fn is_identifier_composite(&self) -> bool {
        self.identifier.len() > 1
    }

    pub fn is_id_generator_identity(&self) -> bool {
        self.id_generator == IdGenerator::Identity
    }

    pub fn is_versioned(&self) -> bool {
        self.version_field.is_some()
    }

    pub fn version_mapping(&self) -> Option<&FieldMapping> {
        self.version_field
            .as_deref()
            .and_then(|name| self.fields.get(name))
    }

    pub fn is_identifier(&self, field: &str) -> bool {
        self.identifier.iter().any(|id| id == field)
    }

    pub fn single_identifier_field(&self) -> Result<&str, MappingError> {
        match self.identifier.as_slice() {
            [single] => Ok(single.as_str()),
            [] => Err(MappingError::MissingIdentifier {
                class_name: self.name.clone(),
            }),
            _ => Err(MappingError::CompositeIdentifier {
                class_name: self.name.clone(),
            }),
        }
    }

    /// Identifier columns in identifier order; derived identities contribute
    /// their join columns.
    pub fn identifier_columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        for id in &self.identifier {
            if let Some(field) = self.fields.get(id) {
                columns.push(field.column_name.clone());
            } else if let Some(assoc) = self.associations.get(id) {
                columns.extend(assoc.join_columns().iter().map(|jc| jc.name.clone()));
            }
        }
        columns
    }

    /// Class whose table stores `field`: the declaring ancestor under joined
    /// inheritance, the class itself otherwise.
    pub fn owning_class_of(&self, field: &str) -> &str {
        if !self.is_inheritance_type_joined() {
            return &self.name;
        }
        if let Some(inherited) = self.fields.get(field).and_then(|f| f.inherited.as_deref()) {
            return inherited;
        }
        if let Some(inherited) = self
            .associations
            .get(field)
            .and_then(|a| a.inherited.as_deref())
        {
            return inherited;
        }
        &self.name
    }

    /// Type of the column backing `field`, for parameter typing
    pub fn binding_type_of(&self, field: &str) -> Option<ParameterType> {
        self.fields.get(field).map(|f| f.column_type.binding_type())
    }

    pub fn has_discriminator(&self) -> bool {
        self.discriminator_column.is_some() && !self.discriminator_map.is_empty()
    }
}

pub struct ClassDescriptorBuilder {
    descriptor: ClassDescriptor,
}

impl ClassDescriptorBuilder {
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.descriptor.table.name = name.into();
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.descriptor.table.schema = Some(schema.into());
        self
    }

    pub fn quoted_table(mut self) -> Self {
        self.descriptor.table.quoted = true;
        self
    }

    pub fn id(mut self, field: FieldMapping) -> Self {
        let mut field = field;
        field.id = true;
        self.descriptor.identifier.push(field.field_name.clone());
        self.descriptor.fields.insert(field.field_name.clone(), field);
        self
    }

    /// Registers an owning to-one association as part of the identifier
    pub fn id_association(mut self, association: AssociationMapping) -> Self {
        let association = association.identifier();
        self.descriptor
            .identifier
            .push(association.field_name.clone());
        self.descriptor
            .associations
            .insert(association.field_name.clone(), association);
        self
    }

    pub fn id_generator(mut self, generator: IdGenerator) -> Self {
        self.descriptor.id_generator = generator;
        self
    }

    pub fn field(mut self, field: FieldMapping) -> Self {
        if self.descriptor.fields.contains_key(&field.field_name) {
            log::warn!(
                "field `{}` registered twice on `{}`, keeping the last mapping",
                field.field_name,
                self.descriptor.name
            );
        }
        self.descriptor.fields.insert(field.field_name.clone(), field);
        self
    }

    pub fn version(mut self, field: FieldMapping) -> Self {
        self.descriptor.version_field = Some(field.field_name.clone());
        self.descriptor.fields.insert(field.field_name.clone(), field);
        self
    }

    pub fn association(mut self, association: AssociationMapping) -> Self {
        self.descriptor
            .associations
            .insert(association.field_name.clone(), association);
        self
    }

    /// Direct parent; the registry resolves the rest of the chain
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.descriptor.parent_classes = vec![parent.into()];
        self
    }

    pub fn inheritance(mut self, inheritance_type: InheritanceType) -> Self {
        self.descriptor.inheritance_type = inheritance_type;
        self
    }

    pub fn discriminator_column(mut self, column: DiscriminatorColumn) -> Self {
        self.descriptor.discriminator_column = Some(column);
        self
    }

    pub fn discriminator_value(mut self, value: impl Into<String>) -> Self {
        self.descriptor.discriminator_value = Some(value.into());
        self
    }

    pub fn build(self) -> ClassDescriptor {
        self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_metadata::association::JoinColumn;

    #[test]
    fn test_identifier_columns_include_derived_identity() {
        let desc = ClassDescriptor::builder("Phone")
            .id(FieldMapping::new("number", ColumnType::String).column("number"))
            .id_association(
                AssociationMapping::many_to_one("user", "User")
                    .join_column(JoinColumn::new("user_id", "id")),
            )
            .build();

        assert!(desc.is_identifier_composite());
        assert_eq!(desc.identifier_columns(), vec!["number", "user_id"]);
        assert!(matches!(
            desc.single_identifier_field(),
            Err(MappingError::CompositeIdentifier { .. })
        ));
    }

    #[test]
    fn test_binding_type_follows_column_type() {
        let desc = ClassDescriptor::builder("User")
            .id(FieldMapping::new("id", ColumnType::Integer).column("id"))
            .field(FieldMapping::new("createdAt", ColumnType::DateTime).column("created_at"))
            .build();

        assert_eq!(desc.binding_type_of("id"), Some(ParameterType::Integer));
        assert_eq!(desc.binding_type_of("createdAt"), Some(ParameterType::DateTime));
        assert_eq!(desc.binding_type_of("missing"), None);
        assert_eq!(desc.field_for_column("created_at"), Some("createdAt"));
    }
}
