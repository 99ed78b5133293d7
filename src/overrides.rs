//! Hand-maintained corrections for what the naming heuristics cannot infer.

use crate::config::PipelineConfig;
use crate::ir::Forest;

/// Marks returns of functions that hand out a numeric handle, e.g.
/// `friend_add` returns a `Friend` rather than a bare `uint32_t`.
pub fn retype_number_handle_returns(forest: &mut Forest, config: &PipelineConfig) {
    for class in forest.all_classes() {
        for id in forest.class(class).methods.clone() {
            let function = forest.function_mut(id);
            if let Some(handle_class) = config.number_handle_returns.get(&function.name) {
                function.ret.ty.retype_as_number_handle(handle_class.clone());
            }
        }
    }
}

/// Moves configured methods into their class's default-construction slot.
pub fn extract_default_initializers(forest: &mut Forest, config: &PipelineConfig) {
    for class in forest.all_classes() {
        let Some(method_name) = config.default_initializers.get(&forest.class(class).name) else {
            continue;
        };
        if let Some(id) = forest.find_method(class, method_name) {
            forest.remove_method(class, id);
            forest.class_mut(class).default_init = Some(id);
            log::debug!("`{}` default-initializes `{}`", method_name, forest.class(class).name);
        }
    }
}

/// Applies the rename table keyed by class name. Runs last so it sees final names.
pub fn apply_renames(forest: &mut Forest, config: &PipelineConfig) {
    for class in forest.all_classes() {
        let Some(spec) = config.renames.get(&forest.class(class).name) else {
            continue;
        };

        for property in forest.class_mut(class).properties.iter_mut() {
            if let Some(renamed) = spec.properties.get(&property.name) {
                property.name = renamed.clone();
            }
        }
        for id in forest.class(class).methods.clone() {
            let function = forest.function_mut(id);
            if let Some(renamed) = spec.functions.get(&function.name) {
                log::debug!("Renamed `{}` to `{renamed}`", function.name);
                function.name = renamed.clone();
            }
        }
    }
}
