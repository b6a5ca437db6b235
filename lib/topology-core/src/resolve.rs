//! Binding placeholders to upstream attribute values

use topology_api::{OutputRef, ResourceKey, ResourceSpec};

/// Lookup of attributes generated by already-applied records
pub trait OutputSource {
    fn output(&self, resource: &ResourceKey, attribute: &str) -> Option<&str>;
}

/// Bind every placeholder whose upstream value is available.
///
/// Returns the (possibly partially) resolved record and the placeholders
/// that are still pending. `is_unknown` lets the caller withhold values
/// that are about to change, such as outputs of a record being replaced.
pub fn resolve_spec<S, F>(spec: &ResourceSpec, source: &S, is_unknown: F) -> (ResourceSpec, Vec<OutputRef>)
where
    S: OutputSource + ?Sized,
    F: Fn(&ResourceKey) -> bool,
{
    let mut resolved = spec.clone();
    let mut pending = Vec::new();

    for input in resolved.inputs_mut() {
        let Some(output) = input.output_ref().cloned() else {
            continue;
        };
        if is_unknown(&output.resource) {
            pending.push(output);
            continue;
        }
        match source.output(&output.resource, &output.attribute) {
            Some(value) => {
                let value = value.to_string();
                input.resolve(&value);
            }
            None => pending.push(output),
        }
    }

    (resolved, pending)
}
