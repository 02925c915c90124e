//! Association descriptors and the generated accessor table.
//!
//! Descriptors are created once by the declaration calls in [`registry`] and never
//! change afterwards. They carry model ids, not model references, so a frozen
//! [`Schema`](crate::schema::Schema) can be shared freely between contexts.

pub mod registry;

use crate::naming::{Alias, AliasRole, ResolvedName};
use crate::types::ModelId;
use serde::{Deserialize, Serialize};

/// Kind of declared relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationKind {
    /// One-to-many, owner side; the foreign key lives on the target
    HasMany,
    /// One-to-many, member side; the foreign key lives on the source
    BelongsTo,
    /// Many-to-many through a junction model
    BelongsToMany,
}

impl AssociationKind {
    /// Which alias form keys the association in the registry
    pub fn alias_role(&self) -> AliasRole {
        match self {
            AssociationKind::BelongsTo => AliasRole::Singular,
            AssociationKind::HasMany | AssociationKind::BelongsToMany => AliasRole::Plural,
        }
    }

    pub fn is_multiple(&self) -> bool {
        !matches!(self, AssociationKind::BelongsTo)
    }
}

/// Junction wiring for many-to-many associations.
///
/// Two descriptors may point at the same junction model with swapped keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Junction {
    pub model: ModelId,
    /// Junction column referencing the source
    pub foreign_key: String,
    /// Junction column referencing the target
    pub other_key: String,
}

/// One declared relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub(crate) kind: AssociationKind,
    pub(crate) source: ModelId,
    pub(crate) target: ModelId,
    pub(crate) name: ResolvedName,
    /// has-many: column on target; belongs-to: column on source;
    /// belongs-to-many: junction column referencing the source
    pub(crate) foreign_key: String,
    /// Key on the source the foreign key points at (has-many, belongs-to-many)
    pub(crate) source_key: String,
    /// Key on the target (belongs-to, belongs-to-many)
    pub(crate) target_key: String,
    pub(crate) junction: Option<Junction>,
}

impl Association {
    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    pub fn source(&self) -> ModelId {
        self.source
    }

    pub fn target(&self) -> ModelId {
        self.target
    }

    pub fn is_self_association(&self) -> bool {
        self.source == self.target
    }

    pub fn name(&self) -> &ResolvedName {
        &self.name
    }

    /// Registry and `include` key, with the caller's casing
    pub fn key(&self) -> &str {
        self.name.key(self.kind.alias_role())
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn target_key(&self) -> &str {
        &self.target_key
    }

    pub fn junction(&self) -> Option<&Junction> {
        self.junction.as_ref()
    }

    /// Column that identifies the target: the junction's other key for
    /// many-to-many, the foreign key otherwise
    pub fn foreign_identifier(&self) -> &str {
        match &self.junction {
            Some(junction) => &junction.other_key,
            None => &self.foreign_key,
        }
    }

    /// Generated accessor names for this association
    pub fn accessor_names(&self) -> Vec<(String, AccessorKind)> {
        use AccessorKind::*;
        use AliasRole::{Plural, Singular};

        match self.kind {
            AssociationKind::BelongsTo => vec![
                (self.name.method("get", Singular), Get),
                (self.name.method("set", Singular), Set),
                (self.name.method("create", Singular), Create),
            ],
            AssociationKind::HasMany | AssociationKind::BelongsToMany => vec![
                (self.name.method("get", Plural), Get),
                (self.name.method("set", Plural), Set),
                (self.name.method("add", Singular), Add),
                (self.name.method("add", Plural), AddMultiple),
                (self.name.method("create", Singular), Create),
                (self.name.method("remove", Singular), Remove),
                (self.name.method("remove", Plural), RemoveMultiple),
                (self.name.method("has", Singular), Has),
                (self.name.method("has", Plural), HasMultiple),
                (self.name.method("count", Plural), Count),
            ],
        }
    }
}

/// Operation a generated accessor performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessorKind {
    Get,
    Set,
    Add,
    AddMultiple,
    Create,
    Remove,
    RemoveMultiple,
    Has,
    HasMultiple,
    Count,
}

/// Method-table entry: accessor kind plus the association key it operates on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorEntry {
    pub kind: AccessorKind,
    pub association: String,
}

/// Junction reference for [`registry`] `belongs_to_many`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Through {
    /// Junction model name; synthesized unless a model with this name exists
    Name(String),
    /// Pre-defined junction model, used as-is
    Model(ModelId),
}

impl From<&str> for Through {
    fn from(value: &str) -> Self {
        Through::Name(value.to_string())
    }
}

impl From<String> for Through {
    fn from(value: String) -> Self {
        Through::Name(value)
    }
}

impl From<ModelId> for Through {
    fn from(value: ModelId) -> Self {
        Through::Model(value)
    }
}

/// Declaration options shared by all association kinds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationOptions {
    pub alias: Option<Alias>,
    pub foreign_key: Option<String>,
    pub other_key: Option<String>,
    /// Junction timestamps; defaults to the source model's setting
    pub timestamps: Option<bool>,
}

impl AssociationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: impl Into<Alias>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    pub fn other_key(mut self, other_key: impl Into<String>) -> Self {
        self.other_key = Some(other_key.into());
        self
    }

    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = Some(timestamps);
        self
    }
}
