//! Property-based tests for alias resolution and generated names

use ctxmodel::association::AccessorKind;
use ctxmodel::naming::{self, AliasRole, EnglishInflection, NameForms};
use ctxmodel::{Alias, AssociationOptions, Attribute, ModelOptions, SchemaBuilder};
use proptest::prelude::*;

fn identifier() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9]{0,11}"
}

/// Alias keys are used verbatim and method fragments only change the first character
#[test]
fn test_alias_forms_kept_verbatim_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(identifier(), identifier(), identifier()),
            |(base, singular, plural)| {
                let base = NameForms::new(base.clone(), format!("{}s", base));
                let alias = Alias::forms(singular.clone(), plural.clone());

                for role in [AliasRole::Singular, AliasRole::Plural] {
                    let resolved =
                        naming::resolve(&base, Some(&alias), role, &EnglishInflection);
                    prop_assert_eq!(&resolved.alias_singular, &singular);
                    prop_assert_eq!(&resolved.alias_plural, &plural);
                    prop_assert_eq!(&resolved.method_plural[1..], &plural[1..]);
                    prop_assert_eq!(
                        resolved.method("get", AliasRole::Plural),
                        format!("get{}", naming::upper_first(&plural))
                    );
                }

                Ok(())
            },
        )
        .unwrap();
}

/// A single plural alias is registered under exactly the given string
#[test]
fn test_single_alias_is_registry_key_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&identifier(), |alias| {
            let mut builder = SchemaBuilder::new();
            let user = builder
                .define("User", Vec::<(String, Attribute)>::new(), ModelOptions::new())
                .unwrap();
            let task = builder
                .define("Task", Vec::<(String, Attribute)>::new(), ModelOptions::new())
                .unwrap();
            builder
                .has_many(
                    user,
                    task,
                    AssociationOptions::new()
                        .alias(alias.as_str())
                        .foreign_key("ownerId"),
                )
                .unwrap();

            let def = builder.model(user);
            prop_assert!(def.association(&alias).is_some());
            let getter = format!("get{}", naming::upper_first(&alias));
            prop_assert_eq!(
                def.accessor(&getter).map(|entry| entry.kind),
                Some(AccessorKind::Get)
            );

            Ok(())
        })
        .unwrap();
}

/// Default foreign keys follow the definition's casing rule
#[test]
fn test_foreign_key_casing_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&("[a-z]{1,8}", "[a-z]{1,8}"), |(prefix, key)| {
            let snake = naming::foreign_key(&prefix, &key, true);
            prop_assert_eq!(&snake, &format!("{}_{}", prefix, key));

            let camel = naming::foreign_key(&prefix, &key, false);
            prop_assert!(!camel.contains('_'));
            prop_assert_eq!(camel.to_lowercase(), format!("{}{}", prefix, key));

            Ok(())
        })
        .unwrap();
}
