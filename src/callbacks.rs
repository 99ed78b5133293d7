//! Callback typedefs become listener classes with a single `callback` method.

use crate::config::PipelineConfig;
use crate::decl::TypedefDecl;
use crate::ingest::ingest_function;
use crate::ir::{ClassId, Forest};
use crate::naming::snake_to_pascal;

/// Creates one listener class per function typedef ending in the callback
/// suffix, e.g. `tox_friend_name_cb` becomes `ToxFriendNameCb`.
pub fn extract_callbacks(
    forest: &mut Forest,
    typedefs: &[TypedefDecl],
    config: &PipelineConfig,
) -> Vec<ClassId> {
    let mut listeners = Vec::new();
    for typedef in typedefs
        .iter()
        .filter(|typedef| typedef.name.ends_with(config.markers.callback_suffix.as_str()))
    {
        let Some(decl) = typedef.as_function() else {
            log::warn!("Callback typedef `{}` is not a function type", typedef.name);
            continue;
        };

        let mut function = ingest_function(&decl, config);
        function.name = config.canonical.callback.clone();
        let id = forest.alloc_function(function);

        let class_id = forest.require_class(None, &snake_to_pascal(&typedef.name));
        let class = forest.class_mut(class_id);
        class.is_callback = true;
        class.methods.push(id);
        log::debug!("`{}` becomes listener `{}`", typedef.name, class.name);
        listeners.push(class_id);
    }
    listeners
}
