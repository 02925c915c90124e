//! Eager-Load Binder
//!
//! Walks the plain result tree returned by the query executor depth-first and
//! turns every node into an [`Instance`] bound to the root query's context.

use super::{Binding, Included, Instance};
use crate::query::ResolvedInclude;
use crate::store::{RawIncluded, RawNode};
use tracing::trace;

pub(crate) fn bind_nodes(
    binding: &Binding,
    nodes: Vec<RawNode>,
    includes: &[ResolvedInclude],
) -> Vec<Instance> {
    trace!(
        model = %binding.definition().name(),
        rows = nodes.len(),
        includes = includes.len(),
        "Binding eager-loaded rows"
    );
    nodes
        .into_iter()
        .map(|node| bind_node(binding, node, includes))
        .collect()
}

fn bind_node(binding: &Binding, mut node: RawNode, includes: &[ResolvedInclude]) -> Instance {
    let mut instance = binding.instance(node.row);

    for include in includes {
        let key = include.key();
        let target = binding.rebind(include.association.target());
        let included = match node.included.remove(key) {
            Some(RawIncluded::Many(children)) => {
                Included::Many(bind_nodes(&target, children, &include.include))
            }
            Some(RawIncluded::One(child)) => Included::One(
                child.map(|child| Box::new(bind_node(&target, *child, &include.include))),
            ),
            None if include.association.kind().is_multiple() => Included::Many(Vec::new()),
            None => Included::One(None),
        };
        instance.included.insert(key.to_string(), included);
    }
    instance
}
