use crate::{
    foundation::core::component_layer_id,
    foundation::log::{ResolveLog, ResolveWarning},
    layer::model::{
        COMPONENT_ID_ATTR, Component, ComponentInstance, ComponentLibrary, Layer, TextValue,
    },
};

/// Expand every component instance in `layers` into a copy of its component's layers.
///
/// Copied layers get ids `"{instanceId}-{componentLayerId}"` and their `component_variable` text
/// is bound to the instance override, else the variable default, else empty text. Instances
/// nested inside components expand recursively. An instance whose component is missing, or is
/// already being expanded further up, is logged and left without children.
#[tracing::instrument(level = "debug", skip_all, fields(components = library.len()))]
pub fn expand_components(
    layers: &[Layer],
    library: &ComponentLibrary,
    log: &dyn ResolveLog,
) -> Vec<Layer> {
    if !layers.iter().any(has_instance) {
        return layers.to_vec();
    }
    let mut stack = Vec::new();
    layers
        .iter()
        .map(|l| expand_layer(l, library, log, &mut stack))
        .collect()
}

fn has_instance(layer: &Layer) -> bool {
    layer.component.is_some() || layer.children.iter().any(has_instance)
}

fn expand_layer(
    layer: &Layer,
    library: &ComponentLibrary,
    log: &dyn ResolveLog,
    stack: &mut Vec<String>,
) -> Layer {
    let mut out = layer.clone();
    let Some(instance) = &layer.component else {
        out.children = layer
            .children
            .iter()
            .map(|c| expand_layer(c, library, log, stack))
            .collect();
        return out;
    };

    let component_id = &instance.component_id;
    out.component = None;
    out.children = Vec::new();
    out.attributes
        .insert(COMPONENT_ID_ATTR.to_owned(), component_id.clone());

    if stack.contains(component_id) {
        log.warn(ResolveWarning::ComponentCycle {
            layer_id: layer.id.clone(),
            component_id: component_id.clone(),
        });
        return out;
    }
    let Some(component) = library.get(component_id) else {
        log.warn(ResolveWarning::ComponentMissing {
            layer_id: layer.id.clone(),
            component_id: component_id.clone(),
        });
        return out;
    };

    stack.push(component_id.clone());
    out.children = component
        .layers
        .iter()
        .map(|cl| {
            let bound = bind_component_layer(cl, &layer.id, instance, component);
            expand_layer(&bound, library, log, stack)
        })
        .collect();
    stack.pop();
    out
}

fn bind_component_layer(
    layer: &Layer,
    instance_id: &str,
    instance: &ComponentInstance,
    component: &Component,
) -> Layer {
    let mut out = layer.clone();
    out.id = component_layer_id(instance_id, &layer.id);
    if let Some(text) = &layer.variables.text {
        out.variables.text = Some(bind_text(text, instance, component));
    }
    // Nested instances may forward this component's variables as their own overrides.
    if let Some(nested) = out.component.as_mut() {
        for value in nested.overrides.values_mut() {
            *value = bind_text(value, instance, component);
        }
    }
    out.children = layer
        .children
        .iter()
        .map(|c| bind_component_layer(c, instance_id, instance, component))
        .collect();
    out
}

fn bind_text(text: &TextValue, instance: &ComponentInstance, component: &Component) -> TextValue {
    let TextValue::ComponentVariable { variable_id } = text else {
        return text.clone();
    };
    if let Some(v) = instance.overrides.get(variable_id) {
        return v.clone();
    }
    component
        .variables
        .iter()
        .find(|v| &v.id == variable_id)
        .and_then(|v| v.default.clone())
        .unwrap_or_else(|| TextValue::text(""))
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/components.rs"]
mod tests;
