//! Groups free functions into classes.
//!
//! Struct allocators and deallocators become native handles, functions taking
//! a struct first become its methods, and whatever is left lands on the
//! header's root class. Methods addressing a sub-entity through a
//! `*_number` parameter are then moved onto nested classes wrapping that
//! number, until nothing moves any more.

use crate::config::PipelineConfig;
use crate::ir::{ClassId, Forest, FunctionId, Handle, NumberHandle, Param};
use crate::naming::{pascal_to_snake, snake_to_pascal, strip_struct_qualifier};

fn is_known_struct(ctype_name: &str, known_structs: &[String]) -> bool {
    let name = strip_struct_qualifier(ctype_name);
    known_structs
        .iter()
        .any(|known| strip_struct_qualifier(known) == name)
}

/// Free functions returning a known struct with `new` in their name become
/// the struct class's allocator.
pub fn hoist_allocators(forest: &mut Forest, known_structs: &[String], config: &PipelineConfig) {
    for id in forest.free.clone() {
        let function = forest.function(id);
        if !is_known_struct(&function.ret.ty.ctype.name, known_structs)
            || !function.name.contains(config.markers.allocator.as_str())
        {
            continue;
        }

        let class_name = function.ret.ty.name().to_string();
        let class_id = forest.require_class(None, &class_name);
        let Some(handle) = forest.class_mut(class_id).native_handle_mut() else {
            log::warn!(
                "`{class_name}` wraps a numeric handle; leaving `{}` free",
                function_name(forest, id)
            );
            continue;
        };
        handle.alloc = Some(id);

        let function = forest.function_mut(id);
        log::debug!("`{}` allocates `{class_name}`", function.name);
        function.name = config.canonical.allocator.clone();
        function.is_static = true;
        forest.free.retain(|&free| free != id);
    }
}

fn function_name(forest: &Forest, id: FunctionId) -> &str {
    &forest.function(id).name
}

/// Free functions whose first parameter is a known struct become that class's
/// deallocator or one of its instance methods. Either way the struct
/// parameter is dropped.
pub fn hoist_struct_functions(
    forest: &mut Forest,
    known_structs: &[String],
    config: &PipelineConfig,
) {
    for id in forest.free.clone() {
        let Some(Param::Plain(first)) = forest.function(id).params.first() else {
            continue;
        };
        if !is_known_struct(&first.ty.ctype.name, known_structs) {
            continue;
        }

        let class_name = first.ty.name().to_string();
        let name = function_name(forest, id);
        let is_deallocator = config
            .markers
            .deallocators
            .iter()
            .any(|marker| name.contains(marker.as_str()));
        let class_id = forest.require_class(None, &class_name);

        if is_deallocator {
            let Some(handle) = forest.class_mut(class_id).native_handle_mut() else {
                log::warn!(
                    "`{class_name}` wraps a numeric handle; leaving `{}` free",
                    function_name(forest, id)
                );
                continue;
            };
            handle.dealloc = Some(id);

            let function = forest.function_mut(id);
            log::debug!("`{}` deallocates `{class_name}`", function.name);
            function.params.remove(0);
            function.name = config.canonical.deallocator.clone();
            function.is_static = true;
        } else {
            forest.function_mut(id).params.remove(0);
            forest.class_mut(class_id).methods.push(id);
        }
        forest.free.retain(|&free| free != id);
    }
}

/// Everything still free becomes a static method of the root class.
pub fn hoist_leftovers(forest: &mut Forest, root_class: &str) {
    let leftovers = std::mem::take(&mut forest.free);
    for &id in &leftovers {
        forest.function_mut(id).is_static = true;
    }
    log::debug!("{} leftover functions go to `{root_class}`", leftovers.len());
    let root = forest.require_class(None, root_class);
    forest.class_mut(root).methods.extend(leftovers);
}

/// Strips `<snake_case(class)>_` from method names, so `tox_options_get_udp_enabled`
/// on `ToxOptions` becomes `get_udp_enabled`.
pub fn strip_class_prefixes(forest: &mut Forest, classes: &[ClassId]) {
    for &class_id in classes {
        let prefix = format!("{}_", pascal_to_snake(&forest.class(class_id).name));
        for id in forest.class(class_id).methods.clone() {
            let function = forest.function_mut(id);
            if let Some(stripped) = function.name.strip_prefix(prefix.as_str()) {
                function.name = stripped.to_string();
            }
        }
    }
}

/// A method whose current first parameter is a numeric handle.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NumberHandleMatch {
    class: ClassId,
    function: FunctionId,
    /// Parameter name without the marker, e.g. `friend` for `friend_number`.
    base: String,
}

fn find_number_handle_matches(forest: &Forest, config: &PipelineConfig) -> Vec<NumberHandleMatch> {
    let marker = config.markers.number_handle.as_str();
    let mut matches = Vec::new();
    for class in forest.all_classes() {
        for &function in &forest.class(class).methods {
            let Some(Param::Plain(first)) = forest.function(function).params.first() else {
                continue;
            };
            if let Some(base) = first.name.strip_suffix(marker) {
                matches.push(NumberHandleMatch {
                    class,
                    function,
                    base: base.to_string(),
                });
            }
        }
    }
    matches
}

/// Runs one relocation round. Returns whether any method matched.
pub fn relocate_number_handle_methods(forest: &mut Forest, config: &PipelineConfig) -> bool {
    let matches = find_number_handle_matches(forest, config);

    for found in &matches {
        let class_name = snake_to_pascal(&found.base);
        let owner = forest.class(found.class).name.clone();

        if config.is_number_handle_exempt(&forest.function(found.function).name, &owner) {
            if let Some(param) = forest.function_mut(found.function).params[0].as_plain_mut() {
                param.name = found.base.clone();
                param.ty.retype_as_number_handle(class_name);
            }
            continue;
        }

        let inner = forest.require_class(Some(found.class), &class_name);
        let Param::Plain(param) = forest.function_mut(found.function).params.remove(0) else {
            continue;
        };
        let inner_class = forest.class_mut(inner);
        if inner_class.handle.is_none() {
            inner_class.handle = Some(Handle::Number(NumberHandle { ty: param.ty }));
        }
        forest.move_method(found.class, inner, found.function);
        log::debug!(
            "Moved `{}` from `{owner}` to `{}`",
            forest.function(found.function).name,
            forest.qualified_name(inner)
        );
    }

    !matches.is_empty()
}

/// Relocates numeric-handle methods until a full scan finds nothing, stripping
/// class prefixes after every round. Returns the number of rounds that matched.
///
/// Every matching method loses its marked first parameter (or has it renamed),
/// so the loop is bounded by the total parameter count.
pub fn extract_number_handles(forest: &mut Forest, config: &PipelineConfig) -> usize {
    let mut rounds = 0;
    loop {
        let found = relocate_number_handle_methods(forest, config);
        let classes = forest.all_classes();
        strip_class_prefixes(forest, &classes);
        if !found {
            break;
        }
        rounds += 1;
        log::trace!("Numeric handle round {rounds} done");
    }
    rounds
}

/// Numeric handle parameters left anywhere become typed references to the
/// handle's class, e.g. `friend_number: uint32_t` becomes `friend: Friend`.
pub fn convert_leftover_number_params(forest: &mut Forest, config: &PipelineConfig) {
    let marker = config.markers.number_handle.as_str();
    for class in forest.all_classes() {
        for id in forest.class(class).methods.clone() {
            for param in forest.function_mut(id).params.iter_mut() {
                let Some(param) = param.as_plain_mut() else {
                    continue;
                };
                if let Some(base) = param.name.strip_suffix(marker) {
                    let base = base.to_string();
                    param.ty.retype_as_number_handle(snake_to_pascal(&base));
                    param.name = base;
                }
            }
        }
    }
}

/// Runs the structural hoists and the numeric-handle fixed point for one header.
pub fn extract_classes(
    forest: &mut Forest,
    known_structs: &[String],
    root_class: &str,
    config: &PipelineConfig,
) {
    hoist_allocators(forest, known_structs, config);
    hoist_struct_functions(forest, known_structs, config);
    hoist_leftovers(forest, root_class);

    let roots = forest.roots.clone();
    strip_class_prefixes(forest, &roots);

    let rounds = extract_number_handles(forest, config);
    log::debug!("Numeric handle extraction settled after {rounds} rounds");
}
