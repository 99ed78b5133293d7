//! Folds getter/setter methods into properties.

use crate::config::PipelineConfig;
use crate::ir::{ClassId, Forest, FunctionId, IrType, Property, ScalarKind};

fn add_property(
    forest: &mut Forest,
    class: ClassId,
    getter: FunctionId,
    name: String,
    is_static: bool,
    config: &PipelineConfig,
) {
    forest.function_mut(getter).name = config.canonical.getter.clone();
    forest.remove_method(class, getter);
    log::debug!("`{}` gains property `{name}`", forest.class(class).name);
    forest.class_mut(class).properties.push(Property {
        name,
        getter,
        setter: None,
        is_static,
    });
}

/// Parameterless `get_x` methods become `x` properties. A one-parameter
/// `set_x` on the same class becomes the property's setter.
pub fn synthesize_accessor_properties(forest: &mut Forest, config: &PipelineConfig) {
    let getter_marker = config.markers.getter.as_str();
    let setter_marker = config.markers.setter.as_str();

    for class in forest.all_classes() {
        for id in forest.class(class).methods.clone() {
            let function = forest.function(id);
            if !function.name.contains(getter_marker) || !function.params.is_empty() {
                continue;
            }
            let property_name = function.name.replace(getter_marker, "");
            let setter_name = function.name.replace(getter_marker, setter_marker);

            add_property(forest, class, id, property_name, false, config);

            let Some(setter) = forest
                .find_method(class, &setter_name)
                .filter(|&setter| forest.function(setter).params.len() == 1)
            else {
                continue;
            };
            forest.function_mut(setter).name = config.canonical.setter.clone();
            forest.remove_method(class, setter);
            if let Some(property) = forest.class_mut(class).properties.last_mut() {
                property.setter = Some(setter);
            }
        }
    }
}

/// Success of a throwing method is the absence of an exception, so a `bool`
/// return carries nothing and becomes `void`.
pub fn replace_throwing_bool_returns(forest: &mut Forest) {
    for class in forest.all_classes() {
        for id in forest.class(class).methods.clone() {
            let function = forest.function_mut(id);
            if function.throws.is_some() && function.ret.ty.is_scalar(ScalarKind::Bool) {
                function.ret.replace(IrType::void());
            }
        }
    }
}

/// Static methods without parameters become static read-only properties.
pub fn synthesize_static_properties(forest: &mut Forest, config: &PipelineConfig) {
    for class in forest.all_classes() {
        for id in forest.class(class).methods.clone() {
            let function = forest.function(id);
            if !function.is_static || !function.params.is_empty() {
                continue;
            }
            let name = function.name.replace(config.markers.getter.as_str(), "");
            add_property(forest, class, id, name, true, config);
        }
    }
}

/// Methods listed in `forced_properties` become properties under their own name.
pub fn force_properties(forest: &mut Forest, config: &PipelineConfig) {
    for class in forest.all_classes() {
        for id in forest.class(class).methods.clone() {
            let name = &forest.function(id).name;
            if config.forced_properties.iter().any(|forced| forced == name) {
                let name = name.clone();
                add_property(forest, class, id, name, false, config);
            }
        }
    }
}

pub fn synthesize_properties(forest: &mut Forest, config: &PipelineConfig) {
    synthesize_accessor_properties(forest, config);
    replace_throwing_bool_returns(forest);
    synthesize_static_properties(forest, config);
    force_properties(forest, config);
}
