//! Association Registry: declaration calls on the schema builder.
//!
//! Each declaration validates everything first and only then mutates the
//! builder, so a rejected declaration leaves the registry unchanged.

use super::{
    AccessorEntry, Association, AssociationKind, AssociationOptions, Junction, Through,
};
use crate::error::ModelError;
use crate::naming::{self, AliasRole, NameForms, ResolvedName};
use crate::schema::{Attribute, DataType, SchemaBuilder};
use crate::types::ModelId;
use std::collections::BTreeMap;
use tracing::debug;

impl SchemaBuilder {
    /// Declare `source` has many `target`; the foreign key is added to `target`.
    pub fn has_many(
        &mut self,
        source: ModelId,
        target: ModelId,
        options: AssociationOptions,
    ) -> Result<&Association, ModelError> {
        self.check_ids(source, target)?;
        let name = self.resolve_name(target, &options, AliasRole::Plural);
        let source_key = self.referenced_key(source)?;
        let foreign_key = match options.foreign_key {
            Some(fk) => fk,
            None => {
                let def = self.model(source);
                naming::foreign_key(&def.name_forms.singular, &source_key, def.underscored)
            }
        };

        let association = Association {
            kind: AssociationKind::HasMany,
            source,
            target,
            name,
            foreign_key: foreign_key.clone(),
            source_key: source_key.clone(),
            target_key: self.referenced_key(target)?,
            junction: None,
        };
        self.check_unique(source, &association)?;

        let reference = self.reference_attribute(source, &source_key);
        self.inject_attribute(target, &foreign_key, reference);
        Ok(self.register(association))
    }

    /// Declare `source` belongs to `target`; the foreign key is added to `source`.
    pub fn belongs_to(
        &mut self,
        source: ModelId,
        target: ModelId,
        options: AssociationOptions,
    ) -> Result<&Association, ModelError> {
        self.check_ids(source, target)?;
        let name = self.resolve_name(target, &options, AliasRole::Singular);
        let target_key = self.referenced_key(target)?;
        let foreign_key = match options.foreign_key {
            Some(fk) => fk,
            None => naming::foreign_key(
                &name.alias_singular,
                &target_key,
                self.model(source).underscored,
            ),
        };

        let association = Association {
            kind: AssociationKind::BelongsTo,
            source,
            target,
            name,
            foreign_key: foreign_key.clone(),
            source_key: self.referenced_key(source)?,
            target_key: target_key.clone(),
            junction: None,
        };
        self.check_unique(source, &association)?;

        let reference = self.reference_attribute(target, &target_key);
        self.inject_attribute(source, &foreign_key, reference);
        Ok(self.register(association))
    }

    /// Declare a many-to-many association through a junction model.
    ///
    /// A junction given by name is synthesized with both keys as a composite
    /// primary key, unless a model with that name already exists. An existing
    /// junction keeps its attributes; only missing key columns are added.
    pub fn belongs_to_many(
        &mut self,
        source: ModelId,
        target: ModelId,
        through: impl Into<Through>,
        options: AssociationOptions,
    ) -> Result<&Association, ModelError> {
        self.check_ids(source, target)?;
        let name = self.resolve_name(target, &options, AliasRole::Plural);
        let source_key = self.referenced_key(source)?;
        let target_key = self.referenced_key(target)?;
        let (source_singular, underscored, source_timestamps) = {
            let def = self.model(source);
            (def.name_forms.singular.clone(), def.underscored, def.timestamps)
        };
        let foreign_key = options
            .foreign_key
            .unwrap_or_else(|| naming::foreign_key(&source_singular, &source_key, underscored));
        let other_key = options
            .other_key
            .unwrap_or_else(|| naming::foreign_key(&name.alias_singular, &target_key, underscored));
        if foreign_key == other_key {
            return Err(ModelError::InvalidDefinition(format!(
                "{} and {} share junction key '{}'; pass distinct foreign_key and other_key",
                self.model(source).name,
                name.alias_plural,
                foreign_key
            )));
        }

        let existing = match through.into() {
            Through::Model(id) => {
                if id.0 >= self.models.len() {
                    return Err(ModelError::UnknownModel(format!("{:?}", id)));
                }
                Ok(id)
            }
            Through::Name(junction_name) => match self.model_id(&junction_name) {
                Some(id) => Ok(id),
                None => Err(junction_name),
            },
        };

        // Validate against a placeholder id; the junction is only created below.
        let placeholder = existing.as_ref().copied().unwrap_or(ModelId(self.models.len()));
        let mut association = Association {
            kind: AssociationKind::BelongsToMany,
            source,
            target,
            name,
            foreign_key: foreign_key.clone(),
            source_key: source_key.clone(),
            target_key: target_key.clone(),
            junction: Some(Junction {
                model: placeholder,
                foreign_key: foreign_key.clone(),
                other_key: other_key.clone(),
            }),
        };
        self.check_unique(source, &association)?;

        let source_ref = self.reference_attribute(source, &source_key);
        let target_ref = self.reference_attribute(target, &target_key);
        let junction = match existing {
            Ok(id) => {
                self.inject_attribute(id, &foreign_key, source_ref);
                self.inject_attribute(id, &other_key, target_ref);
                id
            }
            Err(junction_name) => {
                let mut attributes = BTreeMap::new();
                attributes.insert(foreign_key.clone(), source_ref.primary_key());
                attributes.insert(other_key.clone(), target_ref.primary_key());
                let forms = NameForms::new(junction_name.clone(), junction_name.clone());
                let id = self.insert_model(
                    junction_name.clone(),
                    junction_name,
                    forms,
                    attributes,
                    options.timestamps.unwrap_or(source_timestamps),
                    underscored,
                );
                debug!(
                    junction = %self.model(id).name,
                    foreign_key = %foreign_key,
                    other_key = %other_key,
                    "Synthesized junction model"
                );
                id
            }
        };

        if let Some(j) = association.junction.as_mut() {
            j.model = junction;
        }
        Ok(self.register(association))
    }

    fn check_ids(&self, source: ModelId, target: ModelId) -> Result<(), ModelError> {
        self.try_model(source)?;
        self.try_model(target)?;
        Ok(())
    }

    fn resolve_name(
        &self,
        target: ModelId,
        options: &AssociationOptions,
        role: AliasRole,
    ) -> ResolvedName {
        naming::resolve(
            &self.model(target).name_forms,
            options.alias.as_ref(),
            role,
            self.inflection.as_ref(),
        )
    }

    fn referenced_key(&self, id: ModelId) -> Result<String, ModelError> {
        let def = self.model(id);
        def.primary_key()
            .map(str::to_string)
            .ok_or_else(|| ModelError::MissingPrimaryKey(def.name.clone()))
    }

    /// Foreign key column matching the type of the referenced key
    fn reference_attribute(&self, id: ModelId, key: &str) -> Attribute {
        let def = self.model(id);
        let data_type = def
            .attribute(key)
            .map(|attr| attr.data_type)
            .unwrap_or(DataType::Integer);
        Attribute::new(data_type).references(def.table_name.clone(), key)
    }

    fn inject_attribute(&mut self, id: ModelId, column: &str, attribute: Attribute) {
        let def = self.model_mut(id);
        if !def.attributes.contains_key(column) {
            debug!(model = %def.name, column = %column, "Injected foreign key");
            def.attributes.insert(column.to_string(), attribute);
        }
    }

    fn check_unique(&self, source: ModelId, association: &Association) -> Result<(), ModelError> {
        let def = self.model(source);
        let key = association.key();
        if def.associations.contains_key(key) {
            return Err(ModelError::DuplicateAlias {
                model: def.name.clone(),
                alias: key.to_string(),
            });
        }
        for (method, _) in association.accessor_names() {
            if def.accessors.contains_key(&method) {
                return Err(ModelError::DuplicateAccessor {
                    model: def.name.clone(),
                    method,
                });
            }
        }
        Ok(())
    }

    fn register(&mut self, association: Association) -> &Association {
        let key = association.key().to_string();
        let accessors = association.accessor_names();
        let def = self.model_mut(association.source);
        debug!(
            model = %def.name,
            alias = %key,
            kind = ?association.kind,
            foreign_key = %association.foreign_key,
            "Declared association"
        );
        for (method, kind) in accessors {
            def.accessors.insert(
                method,
                AccessorEntry {
                    kind,
                    association: key.clone(),
                },
            );
        }
        def.associations.entry(key).or_insert(association)
    }
}
