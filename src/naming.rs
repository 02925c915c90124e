//! Naming Resolver
//!
//! Turns a target's name forms and an optional alias override into the alias keys
//! used for registry and include lookups, and the method-name fragments used for
//! generated accessors. This module is the only place that changes the casing of
//! a name.

use heck::{ToLowerCamelCase, ToSnakeCase};
use inflector::string::{pluralize::to_plural, singularize::to_singular};
use serde::{Deserialize, Serialize};

/// Inflection collaborator, consulted only when no explicit form is given
pub trait Inflection: Send + Sync {
    fn pluralize(&self, word: &str) -> String;
    fn singularize(&self, word: &str) -> String;
}

/// English inflection backed by the `Inflector` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishInflection;

impl Inflection for EnglishInflection {
    fn pluralize(&self, word: &str) -> String {
        to_plural(word)
    }

    fn singularize(&self, word: &str) -> String {
        to_singular(word)
    }
}

/// Explicit singular and plural forms of a name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameForms {
    pub singular: String,
    pub plural: String,
}

impl NameForms {
    pub fn new(singular: impl Into<String>, plural: impl Into<String>) -> Self {
        Self {
            singular: singular.into(),
            plural: plural.into(),
        }
    }

    /// Derive both forms from a model name
    pub fn infer(name: &str, inflection: &dyn Inflection) -> Self {
        Self {
            singular: inflection.singularize(name),
            plural: inflection.pluralize(name),
        }
    }
}

/// Alias override given on an association declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alias {
    /// One string; which form it stands for depends on the association kind
    Single(String),
    /// Both forms, used verbatim
    Forms(NameForms),
}

impl Alias {
    pub fn forms(singular: impl Into<String>, plural: impl Into<String>) -> Self {
        Alias::Forms(NameForms::new(singular, plural))
    }
}

impl From<&str> for Alias {
    fn from(value: &str) -> Self {
        Alias::Single(value.to_string())
    }
}

impl From<String> for Alias {
    fn from(value: String) -> Self {
        Alias::Single(value)
    }
}

impl From<NameForms> for Alias {
    fn from(value: NameForms) -> Self {
        Alias::Forms(value)
    }
}

/// Which form a single-string alias stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasRole {
    /// belongs-to: the alias is the singular form
    Singular,
    /// has-many and belongs-to-many: the alias is the plural form
    Plural,
}

/// Resolved alias keys and accessor-name fragments for one association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedName {
    pub alias_singular: String,
    pub alias_plural: String,
    pub method_singular: String,
    pub method_plural: String,
}

impl ResolvedName {
    /// Key under which the association is registered and matched by `include`
    pub fn key(&self, role: AliasRole) -> &str {
        match role {
            AliasRole::Singular => &self.alias_singular,
            AliasRole::Plural => &self.alias_plural,
        }
    }

    /// Generated method name, e.g. `get` + `Assignments`
    pub fn method(&self, verb: &str, role: AliasRole) -> String {
        match role {
            AliasRole::Singular => format!("{}{}", verb, self.method_singular),
            AliasRole::Plural => format!("{}{}", verb, self.method_plural),
        }
    }
}

/// Resolve alias keys and method fragments.
///
/// Alias keys keep the caller's casing. Method fragments only get their first
/// character upper-cased, so `assignments` yields `getAssignments` while
/// `include` still matches on `assignments`.
pub fn resolve(
    base: &NameForms,
    alias: Option<&Alias>,
    role: AliasRole,
    inflection: &dyn Inflection,
) -> ResolvedName {
    let forms = match alias {
        None => base.clone(),
        Some(Alias::Forms(forms)) => forms.clone(),
        Some(Alias::Single(name)) => match role {
            AliasRole::Singular => NameForms::new(name.clone(), inflection.pluralize(name)),
            AliasRole::Plural => NameForms::new(inflection.singularize(name), name.clone()),
        },
    };

    ResolvedName {
        method_singular: upper_first(&forms.singular),
        method_plural: upper_first(&forms.plural),
        alias_singular: forms.singular,
        alias_plural: forms.plural,
    }
}

/// Upper-case the first character, leaving the rest untouched
pub fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Default foreign key name: `<prefix>_<key>` in lowerCamel or snake case
pub fn foreign_key(prefix: &str, key: &str, underscored: bool) -> String {
    let raw = format!("{}_{}", prefix, key);
    if underscored {
        raw.to_snake_case()
    } else {
        raw.to_lower_camel_case()
    }
}

/// Timestamp column names
pub fn timestamp_columns(underscored: bool) -> (String, String) {
    if underscored {
        ("created_at".to_string(), "updated_at".to_string())
    } else {
        ("createdAt".to_string(), "updatedAt".to_string())
    }
}

/// Table name for a model
pub fn table_name(name: &str, freeze: bool, inflection: &dyn Inflection) -> String {
    if freeze {
        name.to_string()
    } else {
        inflection.pluralize(name)
    }
}
