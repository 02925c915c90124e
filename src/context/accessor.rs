//! Accessor Synthesizer
//!
//! Accessors are not pre-generated per context. The method table built at
//! declaration time maps a name to `(kind, association)`; calling it on a record
//! produces a [`BoundAssociation`] whose target binding is the record's own
//! binding moved to the target model. Everything the accessor reads or creates
//! therefore carries the record's context.

use super::{Binding, Instance};
use crate::association::{AccessorKind, Association, AssociationKind, Junction};
use crate::error::ModelError;
use crate::query::ModelRef;
use crate::types::{Criteria, Row, Value};
use futures::future::try_join_all;
use tracing::trace;

/// Arguments accepted by [`Instance::call`]
#[derive(Debug, Clone, Default)]
pub enum AccessorArgs {
    #[default]
    None,
    Criteria(Criteria),
    Instance(Instance),
    Instances(Vec<Instance>),
    Values(Row),
}

impl From<Instance> for AccessorArgs {
    fn from(value: Instance) -> Self {
        AccessorArgs::Instance(value)
    }
}

impl From<Vec<Instance>> for AccessorArgs {
    fn from(value: Vec<Instance>) -> Self {
        AccessorArgs::Instances(value)
    }
}

impl From<Criteria> for AccessorArgs {
    fn from(value: Criteria) -> Self {
        AccessorArgs::Criteria(value)
    }
}

impl From<Row> for AccessorArgs {
    fn from(value: Row) -> Self {
        AccessorArgs::Values(value)
    }
}

/// Result of an accessor call made by name
#[derive(Debug, Clone)]
pub enum AccessorOutput {
    /// Singular getter
    One(Option<Instance>),
    /// Plural getter
    Many(Vec<Instance>),
    /// Record produced by a `create` accessor
    Created(Instance),
    /// Owner after a belongs-to `set`
    Updated(Instance),
    Flag(bool),
    Count(u64),
    Done,
}

impl AccessorOutput {
    pub fn into_one(self) -> Option<Instance> {
        match self {
            AccessorOutput::One(instance) => instance,
            AccessorOutput::Created(instance) | AccessorOutput::Updated(instance) => Some(instance),
            AccessorOutput::Many(instances) => instances.into_iter().next(),
            _ => None,
        }
    }

    pub fn into_many(self) -> Vec<Instance> {
        match self {
            AccessorOutput::Many(instances) => instances,
            AccessorOutput::One(instance) => instance.into_iter().collect(),
            AccessorOutput::Created(instance) | AccessorOutput::Updated(instance) => vec![instance],
            _ => Vec::new(),
        }
    }

    pub fn flag(&self) -> Option<bool> {
        match self {
            AccessorOutput::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            AccessorOutput::Count(count) => Some(*count),
            _ => None,
        }
    }
}

/// One association of one record, bound to that record's context
#[derive(Debug)]
pub struct BoundAssociation<'a> {
    owner: &'a Instance,
    association: &'a Association,
    target: Binding,
}

impl<'a> BoundAssociation<'a> {
    pub(super) fn new(owner: &'a Instance, association: &'a Association) -> Self {
        let target = owner.binding.rebind(association.target());
        Self {
            owner,
            association,
            target,
        }
    }

    pub fn association(&self) -> &Association {
        self.association
    }

    /// Related records matching `criteria`
    pub async fn get(&self, criteria: Criteria) -> Result<Vec<Instance>, ModelError> {
        match self.association.kind() {
            AssociationKind::HasMany => {
                let Some(id) = self.owner_key() else {
                    return Ok(Vec::new());
                };
                let criteria = criteria.and(Criteria::new().eq(self.association.foreign_key(), id));
                self.target.select(criteria).await
            }
            AssociationKind::BelongsTo => Ok(self.referenced().await?.into_iter().collect()),
            AssociationKind::BelongsToMany => {
                let ids = self.linked_ids().await?;
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let criteria =
                    criteria.and(Criteria::new().is_in(self.association.target_key(), ids));
                self.target.select(criteria).await
            }
        }
    }

    /// Single related record: the belongs-to target, or the first of a collection
    pub async fn get_one(&self) -> Result<Option<Instance>, ModelError> {
        if self.association.kind() == AssociationKind::BelongsTo {
            return self.referenced().await;
        }
        Ok(self.get(Criteria::new().limit(1)).await?.into_iter().next())
    }

    /// Row the owner's belongs-to foreign key points at.
    ///
    /// The key is read from the stored owner row, so a `set` or `create` made
    /// through this handle (or any other) is seen without a reload.
    async fn referenced(&self) -> Result<Option<Instance>, ModelError> {
        let stored = match self.owner.identity() {
            Ok(_) => self.owner.reload().await?,
            Err(_) => None,
        };
        let owner = stored.as_ref().unwrap_or(self.owner);
        let fk = match owner.get(self.association.foreign_key()) {
            Some(value) if !value.is_null() => value.clone(),
            _ => return Ok(None),
        };
        let criteria = Criteria::new()
            .eq(self.association.target_key(), fk)
            .limit(1);
        Ok(self.target.select(criteria).await?.into_iter().next())
    }

    /// Point a belongs-to foreign key at `target` (or null it) and return the
    /// persisted owner
    pub async fn set_one(&self, target: Option<&Instance>) -> Result<Instance, ModelError> {
        self.expect_kind(AssociationKind::BelongsTo, "set")?;
        let value = match target {
            Some(instance) => {
                self.check(instance)?;
                self.target_key_of(instance)?
            }
            None => Value::Null,
        };

        let mut values = Row::new();
        values.insert(self.association.foreign_key().to_string(), value);
        self.owner
            .binding
            .update_where(self.owner.identity()?, values)
            .await?;

        self.owner
            .reload()
            .await?
            .ok_or_else(|| ModelError::MissingPrimaryKey(self.owner.definition().name().to_string()))
    }

    /// Replace the full membership of a collection association
    pub async fn set(&self, targets: &[Instance]) -> Result<(), ModelError> {
        self.expect_multiple("set")?;
        for instance in targets {
            self.check(instance)?;
        }
        let keep = targets
            .iter()
            .map(|i| self.target_key_of(i))
            .collect::<Result<Vec<_>, _>>()?;

        let current = self.get(Criteria::new()).await?;
        let stale: Vec<Instance> = current
            .into_iter()
            .filter(|i| {
                i.get(self.association.target_key())
                    .map_or(true, |value| !keep.contains(value))
            })
            .collect();

        self.remove(&stale).await?;
        self.add(targets).await
    }

    /// Attach records to a collection association
    pub async fn add(&self, targets: &[Instance]) -> Result<(), ModelError> {
        self.expect_multiple("add")?;
        for instance in targets {
            self.check(instance)?;
        }
        if targets.is_empty() {
            return Ok(());
        }
        let id = self.required_owner_key()?;

        match self.association.junction() {
            None => {
                let updates = targets.iter().map(|instance| {
                    let mut values = Row::new();
                    values.insert(self.association.foreign_key().to_string(), id.clone());
                    async move {
                        let criteria = instance.identity()?;
                        self.target.update_where(criteria, values).await
                    }
                });
                try_join_all(updates).await?;
            }
            Some(junction) => {
                let existing = self.linked_ids().await?;
                let mut missing: Vec<Value> = Vec::new();
                for instance in targets {
                    let key = self.target_key_of(instance)?;
                    if !existing.contains(&key) && !missing.contains(&key) {
                        missing.push(key);
                    }
                }
                let links = self.junction_binding(junction);
                let inserts = missing.into_iter().map(|other| {
                    let mut values = Row::new();
                    values.insert(junction.foreign_key.clone(), id.clone());
                    values.insert(junction.other_key.clone(), other);
                    links.create(values)
                });
                try_join_all(inserts).await?;
            }
        }

        trace!(
            model = %self.owner.definition().name(),
            alias = %self.association.key(),
            count = targets.len(),
            "Attached records"
        );
        Ok(())
    }

    /// Detach records from a collection association
    pub async fn remove(&self, targets: &[Instance]) -> Result<(), ModelError> {
        self.expect_multiple("remove")?;
        for instance in targets {
            self.check(instance)?;
        }
        if targets.is_empty() {
            return Ok(());
        }
        let id = self.required_owner_key()?;

        match self.association.junction() {
            None => {
                let fk = self.association.foreign_key();
                let updates = targets.iter().map(|instance| {
                    let mut values = Row::new();
                    values.insert(fk.to_string(), Value::Null);
                    let id = id.clone();
                    async move {
                        let criteria = instance.identity()?.eq(fk, id);
                        self.target.update_where(criteria, values).await
                    }
                });
                try_join_all(updates).await?;
            }
            Some(junction) => {
                let others = targets
                    .iter()
                    .map(|i| self.target_key_of(i))
                    .collect::<Result<Vec<_>, _>>()?;
                let criteria = Criteria::new()
                    .eq(junction.foreign_key.clone(), id)
                    .is_in(junction.other_key.clone(), others);
                self.junction_binding(junction).delete_where(criteria).await?;
            }
        }
        Ok(())
    }

    /// Create a target record already linked to the owner
    pub async fn create(&self, mut values: Row) -> Result<Instance, ModelError> {
        match self.association.kind() {
            AssociationKind::HasMany => {
                let id = self.required_owner_key()?;
                values.insert(self.association.foreign_key().to_string(), id);
                self.target.create(values).await
            }
            AssociationKind::BelongsTo => {
                let created = self.target.create(values).await?;
                self.set_one(Some(&created)).await?;
                Ok(created)
            }
            AssociationKind::BelongsToMany => {
                let created = self.target.create(values).await?;
                self.add(std::slice::from_ref(&created)).await?;
                Ok(created)
            }
        }
    }

    /// Whether every record in `targets` is attached
    pub async fn has(&self, targets: &[Instance]) -> Result<bool, ModelError> {
        self.expect_multiple("has")?;
        let mut keys: Vec<Value> = Vec::new();
        for instance in targets {
            self.check(instance)?;
            let key = self.target_key_of(instance)?;
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        if keys.is_empty() {
            return Ok(true);
        }
        let expected = keys.len();
        let found = self
            .get(Criteria::new().is_in(self.association.target_key(), keys))
            .await?;
        Ok(found.len() == expected)
    }

    pub async fn count(&self, criteria: Criteria) -> Result<u64, ModelError> {
        Ok(self.get(criteria).await?.len() as u64)
    }

    /// Dispatch a method-table entry
    pub(super) async fn invoke(
        &self,
        method: &str,
        kind: AccessorKind,
        args: AccessorArgs,
    ) -> Result<AccessorOutput, ModelError> {
        trace!(method = %method, alias = %self.association.key(), "Invoking accessor");
        match kind {
            AccessorKind::Get => {
                let criteria = criteria_arg(method, args)?;
                if self.association.kind().is_multiple() {
                    Ok(AccessorOutput::Many(self.get(criteria).await?))
                } else {
                    Ok(AccessorOutput::One(self.get_one().await?))
                }
            }
            AccessorKind::Set if !self.association.kind().is_multiple() => {
                let target = match args {
                    AccessorArgs::None => None,
                    AccessorArgs::Instance(instance) => Some(instance),
                    _ => return Err(invalid(method, "expected a record or nothing")),
                };
                Ok(AccessorOutput::Updated(self.set_one(target.as_ref()).await?))
            }
            AccessorKind::Set => {
                let targets = match args {
                    AccessorArgs::None => Vec::new(),
                    other => instances_arg(method, other)?,
                };
                self.set(&targets).await?;
                Ok(AccessorOutput::Done)
            }
            AccessorKind::Add | AccessorKind::AddMultiple => {
                self.add(&instances_arg(method, args)?).await?;
                Ok(AccessorOutput::Done)
            }
            AccessorKind::Remove | AccessorKind::RemoveMultiple => {
                self.remove(&instances_arg(method, args)?).await?;
                Ok(AccessorOutput::Done)
            }
            AccessorKind::Create => {
                let values = match args {
                    AccessorArgs::None => Row::new(),
                    AccessorArgs::Values(values) => values,
                    _ => return Err(invalid(method, "expected attribute values")),
                };
                Ok(AccessorOutput::Created(self.create(values).await?))
            }
            AccessorKind::Has | AccessorKind::HasMultiple => {
                let targets = instances_arg(method, args)?;
                Ok(AccessorOutput::Flag(self.has(&targets).await?))
            }
            AccessorKind::Count => {
                let criteria = criteria_arg(method, args)?;
                Ok(AccessorOutput::Count(self.count(criteria).await?))
            }
        }
    }

    /// Reject records of another model or bound to another context
    fn check(&self, instance: &Instance) -> Result<(), ModelError> {
        if instance.model_id() != self.association.target() {
            return Err(invalid(
                self.association.key(),
                &format!(
                    "expected a {} record, got {}",
                    self.target.definition().name(),
                    instance.definition().name()
                ),
            ));
        }
        if let (Some(ours), Some(theirs)) = (self.owner.ctx(), instance.ctx()) {
            if !ours.same(theirs) {
                return Err(ModelError::ContextMismatch {
                    model: self.owner.definition().name().to_string(),
                    alias: self.association.key().to_string(),
                });
            }
        }
        Ok(())
    }

    fn expect_kind(&self, kind: AssociationKind, verb: &str) -> Result<(), ModelError> {
        if self.association.kind() != kind {
            return Err(invalid(
                verb,
                &format!(
                    "not supported on {:?} association {}",
                    self.association.kind(),
                    self.association.key()
                ),
            ));
        }
        Ok(())
    }

    fn expect_multiple(&self, verb: &str) -> Result<(), ModelError> {
        if !self.association.kind().is_multiple() {
            return Err(invalid(
                verb,
                &format!("{} is single-valued", self.association.key()),
            ));
        }
        Ok(())
    }

    fn owner_key(&self) -> Option<Value> {
        self.owner
            .get(self.association.source_key())
            .filter(|value| !value.is_null())
            .cloned()
    }

    fn required_owner_key(&self) -> Result<Value, ModelError> {
        self.owner_key()
            .ok_or_else(|| ModelError::MissingPrimaryKey(self.owner.definition().name().to_string()))
    }

    fn target_key_of(&self, instance: &Instance) -> Result<Value, ModelError> {
        instance
            .get(self.association.target_key())
            .filter(|value| !value.is_null())
            .cloned()
            .ok_or_else(|| ModelError::MissingPrimaryKey(instance.definition().name().to_string()))
    }

    fn junction_binding(&self, junction: &Junction) -> Binding {
        self.owner.binding.rebind(junction.model)
    }

    /// Target keys linked to the owner through the junction
    async fn linked_ids(&self) -> Result<Vec<Value>, ModelError> {
        let (Some(junction), Some(id)) = (self.association.junction(), self.owner_key()) else {
            return Ok(Vec::new());
        };
        let criteria = Criteria::new().eq(junction.foreign_key.clone(), id);
        let links = self.junction_binding(junction).select(criteria).await?;

        let mut ids: Vec<Value> = Vec::new();
        for link in links {
            if let Some(value) = link.get(&junction.other_key).filter(|v| !v.is_null()) {
                if !ids.contains(value) {
                    ids.push(value.clone());
                }
            }
        }
        Ok(ids)
    }
}

fn invalid(method: &str, message: &str) -> ModelError {
    ModelError::InvalidArguments {
        method: method.to_string(),
        message: message.to_string(),
    }
}

fn criteria_arg(method: &str, args: AccessorArgs) -> Result<Criteria, ModelError> {
    match args {
        AccessorArgs::None => Ok(Criteria::new()),
        AccessorArgs::Criteria(criteria) => Ok(criteria),
        _ => Err(invalid(method, "expected criteria or nothing")),
    }
}

fn instances_arg(method: &str, args: AccessorArgs) -> Result<Vec<Instance>, ModelError> {
    match args {
        AccessorArgs::Instance(instance) => Ok(vec![instance]),
        AccessorArgs::Instances(instances) => Ok(instances),
        _ => Err(invalid(method, "expected one or more records")),
    }
}
