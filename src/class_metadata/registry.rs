//! Class descriptor registry.
//!
//! `MetadataRegistry` answers `describe(class)` for the translator and the
//! persisters. All completion work (default names, inheritance, join
//! defaults, inverse-side linking) happens once in
//! [`MetadataRegistryBuilder::build`]; afterwards descriptors are shared
//! read-only.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

use super::association::{AssociationMapping, Cardinality, JoinColumn, OnDelete};
use super::class_descriptor::{ClassDescriptor, InheritanceType};
use super::errors::MappingError;
use super::naming::{short_class_name, DefaultNamingStrategy, JoinKeyRole, NamingStrategy};

#[derive(Debug, Clone)]
pub struct MetadataRegistry {
    classes: HashMap<String, Arc<ClassDescriptor>>,
    naming: Arc<dyn NamingStrategy>,
}

impl MetadataRegistry {
    pub fn builder() -> MetadataRegistryBuilder {
        MetadataRegistryBuilder::new()
    }

    pub fn describe(&self, class_name: &str) -> Result<&ClassDescriptor, MappingError> {
        self.classes
            .get(class_name)
            .map(|d| d.as_ref())
            .ok_or_else(|| MappingError::unknown_class(class_name))
    }

    pub fn describe_shared(&self, class_name: &str) -> Result<Arc<ClassDescriptor>, MappingError> {
        self.classes
            .get(class_name)
            .cloned()
            .ok_or_else(|| MappingError::unknown_class(class_name))
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn naming_strategy(&self) -> &dyn NamingStrategy {
        self.naming.as_ref()
    }
}

pub struct MetadataRegistryBuilder {
    descriptors: IndexMap<String, ClassDescriptor>,
    naming: Arc<dyn NamingStrategy>,
    default_schema: Option<String>,
}

impl Default for MetadataRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataRegistryBuilder {
    pub fn new() -> Self {
        MetadataRegistryBuilder {
            descriptors: IndexMap::new(),
            naming: Arc::new(DefaultNamingStrategy),
            default_schema: None,
        }
    }

    pub fn naming_strategy(mut self, naming: Arc<dyn NamingStrategy>) -> Self {
        self.naming = naming;
        self
    }

    /// Schema for tables and join tables that do not name one
    pub fn default_schema(mut self, schema: Option<String>) -> Self {
        self.default_schema = schema;
        self
    }

    pub fn register(mut self, descriptor: ClassDescriptor) -> Self {
        if self.descriptors.contains_key(&descriptor.name) {
            log::warn!("class `{}` registered twice, replacing", descriptor.name);
        }
        self.descriptors.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn build(self) -> Result<MetadataRegistry, MappingError> {
        let naming = self.naming;
        let mut classes = self.descriptors;

        complete_names(&mut classes, naming.as_ref());
        resolve_hierarchy(&mut classes)?;
        complete_join_mappings(&mut classes, naming.as_ref())?;
        if let Some(schema) = &self.default_schema {
            apply_default_schema(&mut classes, schema);
        }
        copy_inherited_mappings(&mut classes)?;
        link_inverse_sides(&mut classes)?;
        validate(&classes)?;

        log::debug!("Registered {} class descriptors", classes.len());

        Ok(MetadataRegistry {
            classes: classes
                .into_iter()
                .map(|(name, desc)| (name, Arc::new(desc)))
                .collect(),
            naming,
        })
    }
}

fn complete_names(classes: &mut IndexMap<String, ClassDescriptor>, naming: &dyn NamingStrategy) {
    for desc in classes.values_mut() {
        let class_name = desc.name.clone();
        if desc.table.name.is_empty() {
            desc.table.name = naming.class_to_table_name(&class_name);
        }
        for field in desc.fields.values_mut() {
            if field.column_name.is_empty() {
                field.column_name = naming.property_to_column_name(&field.field_name, &class_name);
            }
            field.declared.get_or_insert_with(|| class_name.clone());
        }
        for assoc in desc.associations.values_mut() {
            assoc.source_entity = class_name.clone();
            assoc.declared.get_or_insert_with(|| class_name.clone());
        }
    }
}

fn apply_default_schema(classes: &mut IndexMap<String, ClassDescriptor>, schema: &str) {
    for desc in classes.values_mut() {
        desc.table.schema.get_or_insert_with(|| schema.to_string());
        for assoc in desc.associations.values_mut() {
            if let Some(owning) = assoc.owning_many_to_many_mut() {
                owning
                    .join_table
                    .schema
                    .get_or_insert_with(|| schema.to_string());
            }
        }
    }
}

fn parent_chain(
    classes: &IndexMap<String, ClassDescriptor>,
    class_name: &str,
) -> Result<Vec<String>, MappingError> {
    let mut chain: Vec<String> = Vec::new();
    let mut current = classes
        .get(class_name)
        .and_then(|d| d.parent_classes.first().cloned());

    while let Some(parent) = current {
        let parent_desc = classes.get(&parent).ok_or_else(|| {
            MappingError::unknown_class_with_context(
                parent.as_str(),
                format!("Resolving parent of {}", class_name),
            )
        })?;
        if parent == class_name || chain.contains(&parent) {
            return Err(MappingError::invalid_inheritance(
                class_name,
                format!("cyclic parent chain through `{}`", parent),
            ));
        }
        chain.push(parent.clone());
        current = parent_desc.parent_classes.first().cloned();
    }
    Ok(chain)
}

fn resolve_hierarchy(classes: &mut IndexMap<String, ClassDescriptor>) -> Result<(), MappingError> {
    let names: Vec<String> = classes.keys().cloned().collect();
    let mut chains: HashMap<String, Vec<String>> = HashMap::new();
    for name in &names {
        chains.insert(name.clone(), parent_chain(classes, name)?);
    }

    // discriminator maps are built per root
    let mut maps: HashMap<String, IndexMap<String, String>> = HashMap::new();

    for name in &names {
        let chain = &chains[name];
        let root = chain.last().cloned().unwrap_or_else(|| name.clone());
        let root_desc = &classes[&root];
        let root_type = root_desc.inheritance_type;

        if !chain.is_empty() && root_type == InheritanceType::None {
            return Err(MappingError::invalid_inheritance(
                name.as_str(),
                format!("root class `{}` declares no inheritance strategy", root),
            ));
        }

        let root_table = root_desc.table.clone();
        let root_discriminator = root_desc
            .discriminator_column
            .clone()
            .unwrap_or_default();

        let sub_classes: Vec<String> = names
            .iter()
            .filter(|other| chains[*other].contains(name))
            .cloned()
            .collect();

        let desc = &mut classes[name];
        desc.parent_classes = chain.clone();
        desc.root_entity_name = root.clone();
        desc.inheritance_type = root_type;
        desc.sub_classes = sub_classes;

        if root_type == InheritanceType::None {
            continue;
        }
        if root_type == InheritanceType::SingleTable {
            desc.table = root_table;
        }
        desc.discriminator_column = Some(root_discriminator);

        let value = desc
            .discriminator_value
            .clone()
            .unwrap_or_else(|| short_class_name(name).to_lowercase());
        desc.discriminator_value = Some(value.clone());

        let map = maps.entry(root.clone()).or_default();
        if let Some(existing) = map.insert(value.clone(), name.clone()) {
            return Err(MappingError::invalid_inheritance(
                name.as_str(),
                format!("discriminator value `{}` already used by `{}`", value, existing),
            ));
        }
    }

    for desc in classes.values_mut() {
        if let Some(map) = maps.get(&desc.root_entity_name) {
            desc.discriminator_map = map.clone();
        }
    }
    Ok(())
}

/// Identifier columns of `class_name`, taken from the nearest class in the
/// parent chain that declares an identifier.
fn identifier_columns_of(
    classes: &IndexMap<String, ClassDescriptor>,
    class_name: &str,
) -> Result<Vec<String>, MappingError> {
    let desc = classes
        .get(class_name)
        .ok_or_else(|| MappingError::unknown_class(class_name))?;
    if !desc.identifier.is_empty() {
        return Ok(desc.identifier_columns());
    }
    for parent in &desc.parent_classes {
        if let Some(parent_desc) = classes.get(parent) {
            if !parent_desc.identifier.is_empty() {
                return Ok(parent_desc.identifier_columns());
            }
        }
    }
    Err(MappingError::MissingIdentifier {
        class_name: class_name.to_string(),
    })
}

fn mapped_columns_of(classes: &IndexMap<String, ClassDescriptor>, class_name: &str) -> Vec<String> {
    let mut columns = Vec::new();
    let mut lineage = vec![class_name.to_string()];
    if let Some(desc) = classes.get(class_name) {
        lineage.extend(desc.parent_classes.iter().cloned());
    }
    for name in lineage {
        if let Some(desc) = classes.get(&name) {
            columns.extend(desc.fields.values().map(|f| f.column_name.clone()));
            for assoc in desc.associations.values() {
                columns.extend(assoc.join_columns().iter().map(|jc| jc.name.clone()));
            }
        }
    }
    columns
}

fn complete_join_mappings(
    classes: &mut IndexMap<String, ClassDescriptor>,
    naming: &dyn NamingStrategy,
) -> Result<(), MappingError> {
    let names: Vec<String> = classes.keys().cloned().collect();

    for name in &names {
        let mut completed: Vec<AssociationMapping> = Vec::new();

        for assoc in classes[name].associations.values() {
            if !classes.contains_key(&assoc.target_entity) {
                return Err(MappingError::unknown_class_with_context(
                    assoc.target_entity.as_str(),
                    format!("Resolving target of {}.{}", name, assoc.field_name),
                ));
            }
            let mut assoc = assoc.clone();

            if assoc.is_owning_to_one() {
                let target_columns = identifier_columns_of(classes, &assoc.target_entity)?;
                let mapped = mapped_columns_of(classes, &assoc.target_entity);
                let is_identifier = assoc.is_identifier();
                let target_name = assoc.target_entity.clone();
                let field_column = naming.property_to_column_name(&assoc.field_name, name);
                let default_name = naming.join_column_name(&assoc.field_name, name);

                if let Some(owning) = assoc.owning_to_one_mut() {
                    if owning.join_columns.is_empty() {
                        owning.join_columns = if target_columns.len() == 1 {
                            vec![JoinColumn::new(default_name, target_columns[0].clone())]
                        } else {
                            target_columns
                                .iter()
                                .map(|col| {
                                    JoinColumn::new(format!("{}_{}", field_column, col), col.clone())
                                })
                                .collect()
                        };
                    }
                    for (i, jc) in owning.join_columns.iter_mut().enumerate() {
                        if jc.referenced_column_name.is_empty() {
                            if let Some(col) = target_columns.get(i) {
                                jc.referenced_column_name = col.clone();
                            }
                        }
                        if is_identifier {
                            jc.nullable = false;
                        }
                        if !mapped.contains(&jc.referenced_column_name) {
                            return Err(MappingError::JoinColumnMustPointToMappedField {
                                class_name: name.clone(),
                                column: jc.name.clone(),
                                target: target_name.clone(),
                            });
                        }
                    }
                }
            }

            if assoc.owning_many_to_many().is_some() {
                let source_columns = identifier_columns_of(classes, name)?;
                let target_columns = identifier_columns_of(classes, &assoc.target_entity)?;
                let source = assoc.source_entity.clone();
                let target = assoc.target_entity.clone();
                let field = assoc.field_name.clone();

                if let Some(owning) = assoc.owning_many_to_many_mut() {
                    let table = &mut owning.join_table;
                    let self_referencing = source == target
                        && table.join_columns.is_empty()
                        && table.inverse_join_columns.is_empty();

                    if table.name.is_empty() {
                        table.name = naming.join_table_name(&source, &target, &field);
                    }
                    if table.join_columns.is_empty() {
                        table.join_columns =
                            join_key_columns(naming, &source, &source_columns, self_referencing, JoinKeyRole::Source);
                    }
                    if table.inverse_join_columns.is_empty() {
                        table.inverse_join_columns =
                            join_key_columns(naming, &target, &target_columns, self_referencing, JoinKeyRole::Target);
                    }
                    owning.on_delete_cascade = !table.join_columns.is_empty()
                        && table.join_columns.iter().all(|jc| jc.cascades_on_delete());
                }
            }

            completed.push(assoc);
        }

        let desc = &mut classes[name];
        for assoc in completed {
            desc.associations.insert(assoc.field_name.clone(), assoc);
        }
    }
    Ok(())
}

fn join_key_columns(
    naming: &dyn NamingStrategy,
    entity: &str,
    referenced_columns: &[String],
    self_referencing: bool,
    role: JoinKeyRole,
) -> Vec<JoinColumn> {
    let single = referenced_columns.len() == 1;
    referenced_columns
        .iter()
        .map(|col| {
            let name = match (self_referencing, single) {
                (true, true) => naming.join_key_column_name(entity, Some(col), Some(role)),
                (true, false) => format!(
                    "{}_{}",
                    naming.join_key_column_name(entity, Some(col), None),
                    role.as_suffix()
                ),
                (false, _) => naming.join_key_column_name(entity, Some(col), None),
            };
            JoinColumn::new(name, col.clone())
                .nullable(false)
                .on_delete(OnDelete::Cascade)
        })
        .collect()
}

/// Classes are processed parents first so grandparent mappings are already
/// present on the parent when it is copied.
fn copy_inherited_mappings(
    classes: &mut IndexMap<String, ClassDescriptor>,
) -> Result<(), MappingError> {
    let mut order: Vec<(usize, String)> = classes
        .values()
        .map(|d| (d.parent_classes.len(), d.name.clone()))
        .collect();
    order.sort_by_key(|(depth, _)| *depth);

    for (_, name) in order {
        let Some(parent_name) = classes[&name].parent_classes.first().cloned() else {
            continue;
        };
        let parent = classes[&parent_name].clone();
        let child = &mut classes[&name];

        let mut fields = IndexMap::new();
        for (field_name, field) in &parent.fields {
            if child.fields.contains_key(field_name) {
                return Err(MappingError::invalid_inheritance(
                    name.as_str(),
                    format!("field `{}` redeclares a field of `{}`", field_name, parent_name),
                ));
            }
            let mut field = field.clone();
            field.inherited.get_or_insert_with(|| parent_name.clone());
            fields.insert(field_name.clone(), field);
        }
        fields.extend(child.fields.drain(..));
        child.fields = fields;

        let mut associations = IndexMap::new();
        for (field_name, assoc) in &parent.associations {
            if child.associations.contains_key(field_name) {
                return Err(MappingError::invalid_inheritance(
                    name.as_str(),
                    format!(
                        "association `{}` redeclares an association of `{}`",
                        field_name, parent_name
                    ),
                ));
            }
            let mut assoc = assoc.clone();
            assoc.inherited.get_or_insert_with(|| parent_name.clone());
            associations.insert(field_name.clone(), assoc);
        }
        associations.extend(child.associations.drain(..));
        child.associations = associations;

        if child.identifier.is_empty() {
            child.identifier = parent.identifier.clone();
            child.id_generator = parent.id_generator.clone();
        }
        if child.version_field.is_none() {
            child.version_field = parent.version_field.clone();
        }
    }
    Ok(())
}

fn expected_owning_cardinality(inverse: Cardinality) -> Cardinality {
    match inverse {
        Cardinality::OneToMany => Cardinality::ManyToOne,
        other => other,
    }
}

fn link_inverse_sides(classes: &mut IndexMap<String, ClassDescriptor>) -> Result<(), MappingError> {
    // (class, owning field, inverse field)
    let mut links: Vec<(String, String, String)> = Vec::new();

    for desc in classes.values() {
        for assoc in desc.associations.values().filter(|a| a.inherited.is_none()) {
            let target = classes.get(&assoc.target_entity).ok_or_else(|| {
                MappingError::unknown_class_with_context(
                    assoc.target_entity.as_str(),
                    format!("Resolving target of {}.{}", desc.name, assoc.field_name),
                )
            })?;

            if let Some(mapped_by) = assoc.mapped_by() {
                let invalid = || MappingError::InvalidMappedBy {
                    class_name: desc.name.clone(),
                    field: assoc.field_name.clone(),
                    target: target.name.clone(),
                    mapped_by: mapped_by.to_string(),
                };
                let owning = target.associations.get(mapped_by).ok_or_else(invalid)?;
                if !owning.is_owning_side()
                    || owning.cardinality() != expected_owning_cardinality(assoc.cardinality())
                {
                    return Err(invalid());
                }
                match owning.inversed_by_field() {
                    None => links.push((
                        target.name.clone(),
                        mapped_by.to_string(),
                        assoc.field_name.clone(),
                    )),
                    Some(existing) if existing != assoc.field_name => {
                        return Err(MappingError::InvalidMapping {
                            message: format!(
                                "{}.{} is inversed by `{}` but {}.{} claims to be its inverse side",
                                target.name, mapped_by, existing, desc.name, assoc.field_name
                            ),
                        });
                    }
                    Some(_) => {}
                }
            }

            if let Some(inversed_by) = assoc.inversed_by_field() {
                let inverse = target.associations.get(inversed_by);
                let consistent = inverse
                    .and_then(|inv| inv.mapped_by())
                    .map_or(false, |m| m == assoc.field_name);
                if !consistent {
                    return Err(MappingError::InvalidMapping {
                        message: format!(
                            "{}.{} is inversed by {}.{} which is not mapped by `{}`",
                            desc.name, assoc.field_name, target.name, inversed_by, assoc.field_name
                        ),
                    });
                }
            }
        }
    }

    for (class_name, owning_field, inverse_field) in links {
        let mut affected = vec![class_name.clone()];
        affected.extend(classes[&class_name].sub_classes.iter().cloned());
        for name in affected {
            let Some(assoc) = classes[&name].associations.get_mut(&owning_field) else {
                continue;
            };
            if let Some(owning) = assoc.owning_to_one_mut() {
                owning.inversed_by = Some(inverse_field.clone());
            } else if let Some(owning) = assoc.owning_many_to_many_mut() {
                owning.inversed_by = Some(inverse_field.clone());
            }
        }
    }
    Ok(())
}

fn validate(classes: &IndexMap<String, ClassDescriptor>) -> Result<(), MappingError> {
    for desc in classes.values() {
        if let Some(field) = desc.fields.keys().find(|f| desc.associations.contains_key(*f)) {
            return Err(MappingError::DuplicateFieldName {
                class_name: desc.name.clone(),
                field: field.clone(),
            });
        }

        if desc.identifier.is_empty() {
            return Err(MappingError::MissingIdentifier {
                class_name: desc.name.clone(),
            });
        }
        for id in &desc.identifier {
            let is_field = desc.fields.contains_key(id);
            let is_to_one = desc
                .associations
                .get(id)
                .map_or(false, |a| a.is_owning_to_one());
            if !is_field && !is_to_one {
                return Err(MappingError::unknown_field(&desc.name, id));
            }
        }

        if let Some(version) = &desc.version_field {
            let field = desc.get_field(version)?;
            if !field.column_type.is_integer_like() && !field.column_type.is_temporal() {
                return Err(MappingError::InvalidMapping {
                    message: format!(
                        "version field {}.{} must be an integer or temporal column",
                        desc.name, version
                    ),
                });
            }
        }

        let has_discriminator = desc
            .discriminator_column
            .as_ref()
            .map_or(false, |d| !d.name.is_empty());
        if desc.inheritance_type != InheritanceType::None && !has_discriminator {
            return Err(MappingError::invalid_inheritance(
                desc.name.as_str(),
                "inheritance hierarchy without a discriminator column",
            ));
        }
    }
    Ok(())
}
