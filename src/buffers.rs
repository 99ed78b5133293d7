//! Collapses C buffer idioms into buffer-typed values.
//!
//! C hands buffers around as a raw pointer plus a length obtained elsewhere:
//! either a companion `*_size`/`*_length` function or an adjacent `length`
//! parameter. These passes locate the companion by name and attach it to the
//! buffer type as its size accessor.

use crate::config::PipelineConfig;
use crate::error::ConventionError;
use crate::ir::{BufferWrapper, ClassId, Forest, FunctionId, Param, ScalarKind, SizeAccessor};
use crate::naming::keyword_after;

/// Looks for a size accessor matching `keyword`: first among `class`'s own
/// methods, then among static methods and static properties of every class.
pub fn search_size_accessor(
    forest: &Forest,
    keyword: &str,
    class: ClassId,
    classes: &[ClassId],
    config: &PipelineConfig,
) -> Option<FunctionId> {
    let is_match = |name: &str| name.contains(keyword) && config.is_size_name(name);
    log::trace!("Searching size accessor for `{keyword}` from `{}`", forest.class(class).name);

    if let Some(&id) = forest
        .class(class)
        .methods
        .iter()
        .find(|&&id| is_match(&forest.function(id).name))
    {
        return Some(id);
    }

    for &other in classes {
        let other = forest.class(other);
        if let Some(&id) = other.methods.iter().find(|&&id| {
            let function = forest.function(id);
            function.is_static && is_match(&function.name)
        }) {
            return Some(id);
        }
        if let Some(property) = other
            .properties
            .iter()
            .find(|property| property.is_static && is_match(&property.name))
        {
            return Some(property.getter);
        }
    }
    None
}

/// Takes an accessor named with `marker` off `class`'s method list: it only
/// serves this one buffer from now on.
fn detach_accessor(forest: &mut Forest, class: ClassId, accessor: FunctionId, marker: &str) {
    if forest.function(accessor).name.contains(marker) && forest.remove_method(class, accessor) {
        log::debug!(
            "Detached `{}` from `{}` as a size accessor",
            forest.function(accessor).name,
            forest.class(class).name
        );
        forest.detached.push((accessor, class));
    }
}

/// The keyword actually searched plus every keyword considered, for errors.
struct Keyword {
    search: String,
    tried: Vec<String>,
}

impl Keyword {
    fn derived(derived: &str) -> Self {
        Self {
            search: derived.to_string(),
            tried: vec![derived.to_string()],
        }
    }

    fn override_with(&mut self, keyword: &str) {
        self.search = keyword.to_string();
        self.tried.push(keyword.to_string());
    }

    fn missing(self, forest: &Forest, class: ClassId, function: FunctionId) -> ConventionError {
        ConventionError::MissingSizeAccessor {
            class: forest.qualified_name(class),
            function: forest.function(function).name.clone(),
            keywords: self.tried,
        }
    }
}

fn live_methods(forest: &Forest, class: ClassId) -> Vec<FunctionId> {
    forest.class(class).methods.clone()
}

/// A plain buffer parameter whose size source is still unknown. Headers
/// processed earlier leave their resolved buffers alone.
fn is_unsized_buffer(param: &Param) -> bool {
    param
        .as_plain()
        .is_some_and(|p| p.ty.is_array && p.ty.size_accessor.is_none())
}

/// Methods returning a buffer (or an event pointer) need a size accessor.
pub fn resolve_return_buffers(
    forest: &mut Forest,
    config: &PipelineConfig,
) -> Result<(), ConventionError> {
    let classes = forest.all_classes();
    let getter = config.markers.getter.as_str();

    for &class in &classes {
        for id in live_methods(forest, class) {
            if !forest.class(class).methods.contains(&id) {
                continue;
            }
            let function = forest.function(id);
            let ret = &function.ret.ty;
            let returns_buffer = ret.is_array && !ret.is_text() && function.ret.replaced.is_none();
            let returns_event = ret.ctype.is_pointer
                && function.cname.contains(config.markers.event.as_str())
                && !config
                    .event_return_exclusions
                    .iter()
                    .any(|excluded| excluded == ret.name());
            if (!returns_buffer && !returns_event) || ret.size_accessor.is_some() {
                continue;
            }

            let mut keyword = Keyword::derived(keyword_after(&function.name, getter));
            if let Some(replacement) = config.keywords.returns.get(&keyword.search) {
                keyword.override_with(replacement);
            } else if let Some(replacement) =
                config.return_method_keyword(&forest.class(class).name, &function.name)
            {
                keyword.override_with(replacement);
            }

            let Some(accessor) =
                search_size_accessor(forest, &keyword.search, class, &classes, config)
            else {
                return Err(keyword.missing(forest, class, id));
            };
            detach_accessor(forest, class, accessor, getter);
            forest.function_mut(id).ret.ty.size_accessor = Some(SizeAccessor::Getter(accessor));
        }
    }
    Ok(())
}

/// `bool get_x(uint8_t *x)` style getters: the buffer out-parameter becomes
/// the return value.
pub fn resolve_out_param_getters(
    forest: &mut Forest,
    config: &PipelineConfig,
) -> Result<(), ConventionError> {
    let classes = forest.all_classes();
    let getter = config.markers.getter.as_str();

    for &class in &classes {
        for id in live_methods(forest, class) {
            if !forest.class(class).methods.contains(&id) {
                continue;
            }
            let function = forest.function(id);
            let fixed_keyword = config.keywords.getter_functions.get(&function.name);
            if !function.name.contains(getter) && fixed_keyword.is_none() {
                continue;
            }
            let ret = &function.ret.ty;
            if !ret.is_scalar(ScalarKind::Void) && !ret.is_scalar(ScalarKind::Bool) {
                continue;
            }
            let Some(index) = function
                .params
                .iter()
                .position(|param| param.as_plain().is_some_and(|p| p.ty.is_array))
            else {
                continue;
            };

            let mut keyword = Keyword::derived(keyword_after(&function.name, getter));
            if let Some(replacement) = config.keywords.getters.get(&keyword.search) {
                keyword.override_with(replacement);
            } else if let Some(replacement) = fixed_keyword {
                keyword.override_with(replacement);
            }

            let Some(accessor) =
                search_size_accessor(forest, &keyword.search, class, &classes, config)
            else {
                return Err(keyword.missing(forest, class, id));
            };
            detach_accessor(forest, class, accessor, getter);

            let function = forest.function_mut(id);
            let Param::Plain(mut param) = function.params.remove(index) else {
                continue;
            };
            param.ty.size_accessor = Some(SizeAccessor::Getter(accessor));
            function.ret.replace(param.ty);
            function.ret.param_index = Some(index);
            log::debug!("`{}` now returns its `{}` buffer", function.name, param.name);
        }
    }
    Ok(())
}

/// `void set_x(const uint8_t *x, ...)` setters keep their parameters; the
/// buffer only learns where its size comes from. Setters without a
/// locatable accessor are left for the adjacent-length pairing.
pub fn resolve_setter_buffers(forest: &mut Forest, config: &PipelineConfig) {
    let classes = forest.all_classes();
    let setter = config.markers.setter.as_str();

    for &class in &classes {
        for id in live_methods(forest, class) {
            if !forest.class(class).methods.contains(&id) {
                continue;
            }
            let function = forest.function(id);
            if !function.name.contains(setter) || !function.ret.ty.is_scalar(ScalarKind::Void) {
                continue;
            }
            let Some(index) = function.params.iter().position(is_unsized_buffer) else {
                continue;
            };

            let derived = keyword_after(&function.name, setter);
            let keyword = config
                .keywords
                .setters
                .get(derived)
                .map_or(derived, String::as_str)
                .to_string();

            match search_size_accessor(forest, &keyword, class, &classes, config) {
                Some(accessor) => {
                    detach_accessor(forest, class, accessor, setter);
                    if let Some(param) = forest.function_mut(id).params[index].as_plain_mut() {
                        param.ty.size_accessor = Some(SizeAccessor::Setter(accessor));
                    }
                }
                None => log::debug!(
                    "No size accessor for setter `{}` (keyword `{keyword}`)",
                    forest.function(id).name
                ),
            }
        }
    }
}

/// Methods whose buffer parameter is searched with a configured keyword.
pub fn resolve_parameter_overrides(forest: &mut Forest, config: &PipelineConfig) {
    let classes = forest.all_classes();
    for &class in &classes {
        for id in live_methods(forest, class) {
            let function = forest.function(id);
            let Some(keyword) = config.keywords.parameters.get(&function.name) else {
                continue;
            };
            let Some(index) = function.params.iter().position(is_unsized_buffer) else {
                continue;
            };
            if let Some(accessor) = search_size_accessor(forest, keyword, class, &classes, config) {
                if let Some(param) = forest.function_mut(id).params[index].as_plain_mut() {
                    param.ty.size_accessor = Some(SizeAccessor::Getter(accessor));
                }
            }
        }
    }
}

/// Pairs a buffer parameter without a size getter with the `length`
/// parameter right after it.
pub fn wrap_length_params(params: Vec<Param>, length_marker: &str) -> Vec<Param> {
    let mut out = Vec::with_capacity(params.len());
    let mut params = params.into_iter().peekable();

    while let Some(param) = params.next() {
        let pairs = match (&param, params.peek()) {
            (Param::Plain(data), Some(Param::Plain(length))) => {
                data.ty.is_array
                    && data.ty.size_getter().is_none()
                    && length.name.contains(length_marker)
            }
            _ => false,
        };
        match (param, pairs) {
            (Param::Plain(data), true) => {
                let Some(Param::Plain(length)) = params.next() else {
                    out.push(Param::Plain(data));
                    continue;
                };
                out.push(Param::Buffer(BufferWrapper { data, length }));
            }
            (param, _) => out.push(param),
        }
    }
    out
}

pub fn wrap_buffer_params(forest: &mut Forest, config: &PipelineConfig) {
    for class in forest.all_classes() {
        for id in live_methods(forest, class) {
            let function = forest.function_mut(id);
            let params = std::mem::take(&mut function.params);
            function.params = wrap_length_params(params, &config.markers.length);
        }
    }
}

/// Buffer parameters still without an accessor are searched by their own name.
pub fn resolve_residual_params(forest: &mut Forest, config: &PipelineConfig) {
    let classes = forest.all_classes();
    for &class in &classes {
        for id in live_methods(forest, class) {
            for index in 0..forest.function(id).params.len() {
                let Some(param) = forest.function(id).params[index].as_plain() else {
                    continue;
                };
                if !param.ty.is_array || param.ty.size_accessor.is_some() {
                    continue;
                }
                if let Some(accessor) =
                    search_size_accessor(forest, &param.name, class, &classes, config)
                {
                    if let Some(param) = forest.function_mut(id).params[index].as_plain_mut() {
                        param.ty.size_accessor = Some(SizeAccessor::Getter(accessor));
                    }
                }
            }
        }
    }
}

/// Runs every buffer pass in order.
pub fn resolve_buffers(
    forest: &mut Forest,
    config: &PipelineConfig,
) -> Result<(), ConventionError> {
    resolve_return_buffers(forest, config)?;
    resolve_out_param_getters(forest, config)?;
    resolve_setter_buffers(forest, config);
    resolve_parameter_overrides(forest, config);
    wrap_buffer_params(forest, config);
    resolve_residual_params(forest, config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CType, Function, IrType, TypeKind};

    fn bytes() -> IrType {
        IrType::new(
            TypeKind::Scalar(ScalarKind::Byte),
            true,
            true,
            CType::new("uint8_t", true),
        )
    }

    fn size() -> IrType {
        IrType::new(
            TypeKind::Scalar(ScalarKind::ULong),
            true,
            false,
            CType::new("size_t", false),
        )
    }

    fn bool_type() -> IrType {
        IrType::new(
            TypeKind::Scalar(ScalarKind::Bool),
            true,
            false,
            CType::new("bool", false),
        )
    }

    fn method(forest: &mut Forest, class: ClassId, function: Function) -> FunctionId {
        let id = forest.alloc_function(function);
        forest.class_mut(class).methods.push(id);
        id
    }

    #[test]
    fn test_out_param_getter_is_promoted() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let tox = forest.require_class(None, "Tox");
        let size_fn = method(&mut forest, tox, Function::new("self_get_name_size", size(), vec![]));
        let getter = method(
            &mut forest,
            tox,
            Function::new("self_get_name", IrType::void(), vec![Param::plain("name", bytes())]),
        );

        resolve_buffers(&mut forest, &config).unwrap();

        let function = forest.function(getter);
        assert!(function.params.is_empty());
        assert!(function.ret.ty.is_array);
        assert_eq!(function.ret.ty.size_getter(), Some(size_fn));
        assert!(function.ret.replaced.as_ref().unwrap().is_scalar(ScalarKind::Void));
        assert_eq!(function.ret.param_index, Some(0));
        assert_eq!(forest.class(tox).methods, vec![getter]);
        assert_eq!(forest.detached, vec![(size_fn, tox)]);
        assert!(forest.ownership_violations().is_empty());
    }

    #[test]
    fn test_getter_keyword_override() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let tox = forest.require_class(None, "Tox");
        let address_size = method(&mut forest, tox, Function::new("address_size", size(), vec![]));
        forest.function_mut(address_size).is_static = true;
        let getter = method(
            &mut forest,
            tox,
            Function::new("self_get_dht_id", IrType::void(), vec![Param::plain("dht_id", bytes())]),
        );

        resolve_out_param_getters(&mut forest, &config).unwrap();
        assert_eq!(forest.function(getter).ret.ty.size_getter(), Some(address_size));
        // Shared static utilities stay callable.
        assert!(forest.class(tox).methods.contains(&address_size));
    }

    #[test]
    fn test_missing_size_accessor_is_fatal() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let tox = forest.require_class(None, "Tox");
        method(
            &mut forest,
            tox,
            Function::new("get_blob", bytes(), vec![]),
        );

        let err = resolve_buffers(&mut forest, &config).unwrap_err();
        assert_eq!(
            err,
            ConventionError::MissingSizeAccessor {
                class: "Tox".into(),
                function: "get_blob".into(),
                keywords: vec!["blob".into()],
            }
        );
    }

    #[test]
    fn test_return_keyword_override_is_reported() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let options = forest.require_class(None, "ToxOptions");
        method(
            &mut forest,
            options,
            Function::new("get_savedata_data", bytes(), vec![]),
        );

        let err = resolve_return_buffers(&mut forest, &config).unwrap_err();
        let ConventionError::MissingSizeAccessor { keywords, .. } = err else {
            panic!("Expected a missing size accessor");
        };
        assert_eq!(keywords, vec!["savedata_data".to_string(), "savedata".to_string()]);
    }

    #[test]
    fn test_length_pairing() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let tox = forest.require_class(None, "Tox");
        let send = method(
            &mut forest,
            tox,
            Function::new(
                "send_lossy_packet",
                bool_type(),
                vec![
                    Param::plain("data", bytes()),
                    Param::plain("data_length", size()),
                    Param::plain("flags", size()),
                ],
            ),
        );

        resolve_buffers(&mut forest, &config).unwrap();
        let params = &forest.function(send).params;
        assert_eq!(params.len(), 2);
        let Param::Buffer(buffer) = &params[0] else {
            panic!("Expected a buffer wrapper");
        };
        assert_eq!(buffer.data.name, "data");
        assert_eq!(buffer.length.name, "data_length");
        assert_eq!(params[1].name(), "flags");
    }

    #[test]
    fn test_text_return_needs_no_accessor() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let tox = forest.require_class(None, "Tox");
        let text = IrType::new(
            TypeKind::Scalar(ScalarKind::Char),
            false,
            true,
            CType::new("char", true),
        );
        method(&mut forest, tox, Function::new("get_version_string", text, vec![]));
        assert!(resolve_return_buffers(&mut forest, &config).is_ok());
    }

    #[test]
    fn test_residual_param_search() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let tox = forest.require_class(None, "Tox");
        let key_size = method(&mut forest, tox, Function::new("public_key_size", size(), vec![]));
        forest.function_mut(key_size).is_static = true;
        let add = method(
            &mut forest,
            tox,
            Function::new(
                "friend_by_public_key",
                size(),
                vec![Param::plain("public_key", bytes())],
            ),
        );

        resolve_buffers(&mut forest, &config).unwrap();
        let param = forest.function(add).params[0].as_plain().unwrap();
        assert_eq!(param.ty.size_getter(), Some(key_size));
    }

    #[test]
    fn test_setter_buffer_keeps_params() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let options = forest.require_class(None, "ToxOptions");
        let length = method(
            &mut forest,
            options,
            Function::new("get_savedata_length", size(), vec![]),
        );
        let setter = method(
            &mut forest,
            options,
            Function::new(
                "set_savedata_data",
                IrType::void(),
                vec![Param::plain("data", bytes()), Param::plain("length", size())],
            ),
        );

        resolve_setter_buffers(&mut forest, &config);
        let params = &forest.function(setter).params;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].as_plain().unwrap().ty.size_setter(), Some(length));
        assert!(forest.class(options).methods.contains(&length));
    }

    #[test]
    fn test_setter_without_accessor_is_not_fatal() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let tox = forest.require_class(None, "Tox");
        let setter = method(
            &mut forest,
            tox,
            Function::new(
                "self_set_name",
                IrType::void(),
                vec![Param::plain("name", bytes()), Param::plain("length", size())],
            ),
        );

        resolve_buffers(&mut forest, &config).unwrap();
        assert!(matches!(forest.function(setter).params.as_slice(), [Param::Buffer(_)]));
    }

    #[test]
    fn test_parameter_keyword_override() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let tox = forest.require_class(None, "Tox");
        let id_size = method(&mut forest, tox, Function::new("conference_id_size", size(), vec![]));
        forest.function_mut(id_size).is_static = true;
        let by_id = method(
            &mut forest,
            tox,
            Function::new("conference_by_id", size(), vec![Param::plain("id", bytes())]),
        );

        resolve_parameter_overrides(&mut forest, &config);
        let param = forest.function(by_id).params[0].as_plain().unwrap();
        assert_eq!(param.ty.size_getter(), Some(id_size));
    }

    fn event_pointer(name: &str, cname: &str) -> IrType {
        IrType::new(TypeKind::Class(name.into()), true, false, CType::new(cname, true))
    }

    fn event_method(name: &str, cname: &str, ret: IrType) -> Function {
        let mut function = Function::new(name, ret, vec![]);
        function.cname = cname.into();
        function
    }

    #[test]
    fn test_event_pointer_return_needs_accessor() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let events = forest.require_class(None, "ToxEvents");
        let size_fn = method(
            &mut forest,
            events,
            event_method("get_friend_message_size", "tox_events_get_friend_message_size", size()),
        );
        let getter = method(
            &mut forest,
            events,
            event_method(
                "get_friend_message",
                "tox_events_get_friend_message",
                event_pointer("ToxEventFriendMessage", "Tox_Event_Friend_Message"),
            ),
        );

        resolve_return_buffers(&mut forest, &config).unwrap();
        assert_eq!(forest.function(getter).ret.ty.size_getter(), Some(size_fn));
        assert_eq!(forest.class(events).methods, vec![getter]);
        assert_eq!(forest.detached, vec![(size_fn, events)]);
    }

    #[test]
    fn test_event_pointer_without_accessor_is_fatal() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let events = forest.require_class(None, "ToxEvents");
        method(
            &mut forest,
            events,
            event_method(
                "get_conference_invite",
                "tox_events_get_conference_invite",
                event_pointer("ToxEventConferenceInvite", "Tox_Event_Conference_Invite"),
            ),
        );

        let err = resolve_return_buffers(&mut forest, &config).unwrap_err();
        let ConventionError::MissingSizeAccessor { keywords, .. } = err else {
            panic!("Expected a missing size accessor");
        };
        assert_eq!(keywords, vec!["conference_invite".to_string()]);
    }

    #[test]
    fn test_excluded_event_return() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let events = forest.require_class(None, "ToxEvents");
        let load = method(
            &mut forest,
            events,
            event_method("load", "tox_events_load", event_pointer("ToxEvents", "Tox_Events")),
        );

        resolve_return_buffers(&mut forest, &config).unwrap();
        assert!(forest.function(load).ret.ty.size_accessor.is_none());
    }

    #[test]
    fn test_return_method_keyword_override() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let chunk = forest.require_class(None, "ToxEventFileRecvChunk");
        let length = method(&mut forest, chunk, Function::new("get_length", size(), vec![]));
        let data = method(&mut forest, chunk, Function::new("get_data", bytes(), vec![]));

        resolve_return_buffers(&mut forest, &config).unwrap();
        assert_eq!(forest.function(data).ret.ty.size_getter(), Some(length));
        assert_eq!(forest.detached, vec![(length, chunk)]);

        // The same method elsewhere gets no override.
        let mut forest = Forest::new();
        let other = forest.require_class(None, "ToxEventFileChunkRequest");
        method(&mut forest, other, Function::new("get_length", size(), vec![]));
        method(&mut forest, other, Function::new("get_data", bytes(), vec![]));
        let err = resolve_return_buffers(&mut forest, &config).unwrap_err();
        let ConventionError::MissingSizeAccessor { keywords, .. } = err else {
            panic!("Expected a missing size accessor");
        };
        assert_eq!(keywords, vec!["data".to_string()]);
    }

    #[test]
    fn test_setter_accessor_is_detached() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let options = forest.require_class(None, "ToxOptions");
        let length = method(
            &mut forest,
            options,
            Function::new(
                "set_savedata_length",
                IrType::void(),
                vec![Param::plain("length", size())],
            ),
        );
        let setter = method(
            &mut forest,
            options,
            Function::new(
                "set_savedata_data",
                IrType::void(),
                vec![Param::plain("data", bytes()), Param::plain("length", size())],
            ),
        );

        resolve_setter_buffers(&mut forest, &config);
        let data = forest.function(setter).params[0].as_plain().unwrap();
        assert_eq!(data.ty.size_setter(), Some(length));
        assert_eq!(forest.class(options).methods, vec![setter]);
        assert_eq!(forest.detached, vec![(length, options)]);
    }

    #[test]
    fn test_resolved_buffers_are_not_searched_again() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let tox = forest.require_class(None, "Tox");
        let size_fn = method(&mut forest, tox, Function::new("get_blob_size", size(), vec![]));
        let blob = method(&mut forest, tox, Function::new("blob", bytes(), vec![]));
        let key_size = Function::new("conference_id_size", size(), vec![]);
        let key_size = method(&mut forest, tox, key_size);
        let by_id = method(
            &mut forest,
            tox,
            Function::new("conference_by_id", size(), vec![Param::plain("id", bytes())]),
        );

        resolve_buffers(&mut forest, &config).unwrap();
        resolve_buffers(&mut forest, &config).unwrap();
        assert_eq!(forest.function(blob).ret.ty.size_getter(), Some(size_fn));
        let param = forest.function(by_id).params[0].as_plain().unwrap();
        assert_eq!(param.ty.size_getter(), Some(key_size));
        assert_eq!(forest.detached, vec![(size_fn, tox)]);
    }
}
