//! Association mappings.
//!
//! Each association kind carries only the data that is meaningful for it:
//! a one-to-many never owns join columns, a many-to-one is always the owning
//! side, and only an owning many-to-many has a join table.

use serde::{Deserialize, Serialize};

/// What the database does with referencing rows when the referenced row goes away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinColumn {
    pub name: String,
    pub referenced_column_name: String,
    pub nullable: bool,
    pub unique: bool,
    pub on_delete: Option<OnDelete>,
    /// Render the column name with platform quotes
    #[serde(default)]
    pub quoted: bool,
}

impl JoinColumn {
    pub fn new(name: impl Into<String>, referenced_column_name: impl Into<String>) -> Self {
        JoinColumn {
            name: name.into(),
            referenced_column_name: referenced_column_name.into(),
            nullable: true,
            unique: false,
            on_delete: None,
            quoted: false,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn on_delete(mut self, on_delete: OnDelete) -> Self {
        self.on_delete = Some(on_delete);
        self
    }

    pub fn quoted(mut self) -> Self {
        self.quoted = true;
        self
    }

    pub fn cascades_on_delete(&self) -> bool {
        self.on_delete == Some(OnDelete::Cascade)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinTable {
    /// Empty until the registry fills in the naming strategy default
    pub name: String,
    pub schema: Option<String>,
    pub join_columns: Vec<JoinColumn>,
    pub inverse_join_columns: Vec<JoinColumn>,
    #[serde(default)]
    pub quoted: bool,
}

impl JoinTable {
    pub fn new(name: impl Into<String>) -> Self {
        JoinTable {
            name: name.into(),
            schema: None,
            join_columns: Vec::new(),
            inverse_join_columns: Vec::new(),
            quoted: false,
        }
    }

    pub fn join_column(mut self, column: JoinColumn) -> Self {
        self.join_columns.push(column);
        self
    }

    pub fn inverse_join_column(mut self, column: JoinColumn) -> Self {
        self.inverse_join_columns.push(column);
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

impl Default for JoinTable {
    fn default() -> Self {
        JoinTable::new("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchMode {
    Eager,
    Lazy,
    ExtraLazy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cascade {
    Persist,
    Remove,
    Refresh,
    Detach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByField {
    pub field: String,
    pub direction: OrderDirection,
}

/// Ordering and keying of a collection-valued association
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionOptions {
    pub order_by: Vec<OrderByField>,
    pub index_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwningToOne {
    pub join_columns: Vec<JoinColumn>,
    pub inversed_by: Option<String>,
    /// Part of the owning class identifier (derived identity)
    pub is_identifier: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverseSide {
    pub mapped_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToOneSide {
    Owning(OwningToOne),
    Inverse(InverseSide),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwningManyToMany {
    pub join_table: JoinTable,
    pub inversed_by: Option<String>,
    /// Every join column cascades on delete, the database clears the join table
    #[serde(default)]
    pub on_delete_cascade: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ManyToManySide {
    Owning(OwningManyToMany),
    Inverse(InverseSide),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssociationKind {
    OneToOne {
        side: ToOneSide,
        orphan_removal: bool,
    },
    ManyToOne {
        owning: OwningToOne,
    },
    OneToMany {
        mapped_by: String,
        collection: CollectionOptions,
        orphan_removal: bool,
    },
    ManyToMany {
        side: ManyToManySide,
        collection: CollectionOptions,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationMapping {
    pub field_name: String,
    pub source_entity: String,
    pub target_entity: String,
    pub fetch: FetchMode,
    pub cascade: Vec<Cascade>,
    /// Class the mapping was copied from when inherited
    pub inherited: Option<String>,
    /// Class that originally declared the mapping
    pub declared: Option<String>,
    pub kind: AssociationKind,
}

impl AssociationMapping {
    fn with_kind(
        field_name: impl Into<String>,
        target_entity: impl Into<String>,
        kind: AssociationKind,
    ) -> Self {
        AssociationMapping {
            field_name: field_name.into(),
            source_entity: String::new(),
            target_entity: target_entity.into(),
            fetch: FetchMode::Lazy,
            cascade: Vec::new(),
            inherited: None,
            declared: None,
            kind,
        }
    }

    /// Owning many-to-one; join columns default to `{field}_{referenced}`
    pub fn many_to_one(field_name: impl Into<String>, target_entity: impl Into<String>) -> Self {
        Self::with_kind(
            field_name,
            target_entity,
            AssociationKind::ManyToOne {
                owning: OwningToOne {
                    join_columns: Vec::new(),
                    inversed_by: None,
                    is_identifier: false,
                },
            },
        )
    }

    pub fn one_to_one_owning(
        field_name: impl Into<String>,
        target_entity: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            field_name,
            target_entity,
            AssociationKind::OneToOne {
                side: ToOneSide::Owning(OwningToOne {
                    join_columns: Vec::new(),
                    inversed_by: None,
                    is_identifier: false,
                }),
                orphan_removal: false,
            },
        )
    }

    pub fn one_to_one_inverse(
        field_name: impl Into<String>,
        target_entity: impl Into<String>,
        mapped_by: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            field_name,
            target_entity,
            AssociationKind::OneToOne {
                side: ToOneSide::Inverse(InverseSide {
                    mapped_by: mapped_by.into(),
                }),
                orphan_removal: false,
            },
        )
    }

    pub fn one_to_many(
        field_name: impl Into<String>,
        target_entity: impl Into<String>,
        mapped_by: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            field_name,
            target_entity,
            AssociationKind::OneToMany {
                mapped_by: mapped_by.into(),
                collection: CollectionOptions::default(),
                orphan_removal: false,
            },
        )
    }

    pub fn many_to_many_owning(
        field_name: impl Into<String>,
        target_entity: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            field_name,
            target_entity,
            AssociationKind::ManyToMany {
                side: ManyToManySide::Owning(OwningManyToMany {
                    join_table: JoinTable::default(),
                    inversed_by: None,
                    on_delete_cascade: false,
                }),
                collection: CollectionOptions::default(),
            },
        )
    }

    pub fn many_to_many_inverse(
        field_name: impl Into<String>,
        target_entity: impl Into<String>,
        mapped_by: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            field_name,
            target_entity,
            AssociationKind::ManyToMany {
                side: ManyToManySide::Inverse(InverseSide {
                    mapped_by: mapped_by.into(),
                }),
                collection: CollectionOptions::default(),
            },
        )
    }

    pub fn fetch(mut self, fetch: FetchMode) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn cascade(mut self, ops: &[Cascade]) -> Self {
        self.cascade = ops.to_vec();
        self
    }

    /// Adds a join column to an owning to-one association
    pub fn join_column(mut self, column: JoinColumn) -> Self {
        match self.owning_to_one_mut() {
            Some(owning) => owning.join_columns.push(column),
            None => log::warn!(
                "join column `{}` ignored on `{}`: not an owning to-one association",
                column.name,
                self.field_name
            ),
        }
        self
    }

    pub fn join_table(mut self, join_table: JoinTable) -> Self {
        match &mut self.kind {
            AssociationKind::ManyToMany {
                side: ManyToManySide::Owning(owning),
                ..
            } => owning.join_table = join_table,
            _ => log::warn!(
                "join table `{}` ignored on `{}`: not an owning many-to-many association",
                join_table.name,
                self.field_name
            ),
        }
        self
    }

    pub fn inversed_by(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        match &mut self.kind {
            AssociationKind::OneToOne {
                side: ToOneSide::Owning(owning),
                ..
            }
            | AssociationKind::ManyToOne { owning } => owning.inversed_by = Some(field),
            AssociationKind::ManyToMany {
                side: ManyToManySide::Owning(owning),
                ..
            } => owning.inversed_by = Some(field),
            _ => {}
        }
        self
    }

    /// Marks an owning to-one as part of the source class identifier
    pub fn identifier(mut self) -> Self {
        if let Some(owning) = self.owning_to_one_mut() {
            owning.is_identifier = true;
        }
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        if let Some(collection) = self.collection_mut() {
            collection.order_by.push(OrderByField {
                field: field.into(),
                direction,
            });
        }
        self
    }

    pub fn index_by(mut self, field: impl Into<String>) -> Self {
        if let Some(collection) = self.collection_mut() {
            collection.index_by = Some(field.into());
        }
        self
    }

    pub fn orphan_removal(mut self, enabled: bool) -> Self {
        match &mut self.kind {
            AssociationKind::OneToOne { orphan_removal, .. }
            | AssociationKind::OneToMany { orphan_removal, .. } => *orphan_removal = enabled,
            _ => {}
        }
        self
    }

    pub fn cardinality(&self) -> Cardinality {
        match self.kind {
            AssociationKind::OneToOne { .. } => Cardinality::OneToOne,
            AssociationKind::ManyToOne { .. } => Cardinality::ManyToOne,
            AssociationKind::OneToMany { .. } => Cardinality::OneToMany,
            AssociationKind::ManyToMany { .. } => Cardinality::ManyToMany,
        }
    }

    pub fn is_owning_side(&self) -> bool {
        match &self.kind {
            AssociationKind::OneToOne { side, .. } => matches!(side, ToOneSide::Owning(_)),
            AssociationKind::ManyToOne { .. } => true,
            AssociationKind::OneToMany { .. } => false,
            AssociationKind::ManyToMany { side, .. } => matches!(side, ManyToManySide::Owning(_)),
        }
    }

    pub fn is_to_one(&self) -> bool {
        matches!(
            self.kind,
            AssociationKind::OneToOne { .. } | AssociationKind::ManyToOne { .. }
        )
    }

    pub fn is_to_many(&self) -> bool {
        !self.is_to_one()
    }

    pub fn is_owning_to_one(&self) -> bool {
        self.is_to_one() && self.is_owning_side()
    }

    pub fn is_self_referential(&self) -> bool {
        self.source_entity == self.target_entity
    }

    pub fn is_eager(&self) -> bool {
        self.fetch == FetchMode::Eager
    }

    pub fn is_identifier(&self) -> bool {
        self.owning_to_one().map_or(false, |o| o.is_identifier)
    }

    pub fn owning_to_one(&self) -> Option<&OwningToOne> {
        match &self.kind {
            AssociationKind::OneToOne {
                side: ToOneSide::Owning(owning),
                ..
            }
            | AssociationKind::ManyToOne { owning } => Some(owning),
            _ => None,
        }
    }

    pub(crate) fn owning_to_one_mut(&mut self) -> Option<&mut OwningToOne> {
        match &mut self.kind {
            AssociationKind::OneToOne {
                side: ToOneSide::Owning(owning),
                ..
            }
            | AssociationKind::ManyToOne { owning } => Some(owning),
            _ => None,
        }
    }

    pub fn owning_many_to_many(&self) -> Option<&OwningManyToMany> {
        match &self.kind {
            AssociationKind::ManyToMany {
                side: ManyToManySide::Owning(owning),
                ..
            } => Some(owning),
            _ => None,
        }
    }

    pub(crate) fn owning_many_to_many_mut(&mut self) -> Option<&mut OwningManyToMany> {
        match &mut self.kind {
            AssociationKind::ManyToMany {
                side: ManyToManySide::Owning(owning),
                ..
            } => Some(owning),
            _ => None,
        }
    }

    /// Join columns of an owning to-one; empty for every other kind
    pub fn join_columns(&self) -> &[JoinColumn] {
        self.owning_to_one()
            .map(|o| o.join_columns.as_slice())
            .unwrap_or(&[])
    }

    pub fn join_table_mapping(&self) -> Option<&JoinTable> {
        self.owning_many_to_many().map(|o| &o.join_table)
    }

    pub fn mapped_by(&self) -> Option<&str> {
        match &self.kind {
            AssociationKind::OneToOne {
                side: ToOneSide::Inverse(inverse),
                ..
            }
            | AssociationKind::ManyToMany {
                side: ManyToManySide::Inverse(inverse),
                ..
            } => Some(&inverse.mapped_by),
            AssociationKind::OneToMany { mapped_by, .. } => Some(mapped_by),
            _ => None,
        }
    }

    pub fn inversed_by_field(&self) -> Option<&str> {
        match &self.kind {
            AssociationKind::OneToOne {
                side: ToOneSide::Owning(owning),
                ..
            }
            | AssociationKind::ManyToOne { owning } => owning.inversed_by.as_deref(),
            AssociationKind::ManyToMany {
                side: ManyToManySide::Owning(owning),
                ..
            } => owning.inversed_by.as_deref(),
            _ => None,
        }
    }

    pub fn collection(&self) -> Option<&CollectionOptions> {
        match &self.kind {
            AssociationKind::OneToMany { collection, .. }
            | AssociationKind::ManyToMany { collection, .. } => Some(collection),
            _ => None,
        }
    }

    fn collection_mut(&mut self) -> Option<&mut CollectionOptions> {
        match &mut self.kind {
            AssociationKind::OneToMany { collection, .. }
            | AssociationKind::ManyToMany { collection, .. } => Some(collection),
            _ => None,
        }
    }

    pub fn order_by_fields(&self) -> &[OrderByField] {
        self.collection()
            .map(|c| c.order_by.as_slice())
            .unwrap_or(&[])
    }

    pub fn index_by_field(&self) -> Option<&str> {
        self.collection().and_then(|c| c.index_by.as_deref())
    }

    pub fn is_on_delete_cascade(&self) -> bool {
        self.owning_many_to_many()
            .map_or(false, |o| o.on_delete_cascade)
    }

    /// Class whose table holds the mapping's columns
    pub fn owning_class_name(&self) -> &str {
        self.inherited.as_deref().unwrap_or(&self.source_entity)
    }
}
