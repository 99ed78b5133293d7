//! Naming conventions and literal override tables driving the passes.
//!
//! [`PipelineConfig::default`] carries the toxcore 0.2.18 tables. A config
//! file only needs the keys it changes; everything else falls back to the
//! defaults.

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ir_version: String,
    pub library_version: String,
    /// Header file name to the root class its leftover functions land on.
    pub headers: BTreeMap<String, String>,
    pub markers: Markers,
    pub canonical: CanonicalNames,
    /// Error enums start with this prefix, which is swapped for
    /// `exception_prefix` to name the derived exception.
    pub error_enum_prefix: String,
    pub exception_prefix: String,
    pub excluded_function_markers: Vec<String>,
    /// Enum names the C parser produces by mistake.
    pub skipped_enums: Vec<String>,
    /// Return classes exempt from the event-pointer buffer rule.
    pub event_return_exclusions: Vec<String>,
    pub number_handle_exemptions: Vec<NumberHandleExemption>,
    pub keywords: KeywordOverrides,
    /// Function name to the class whose numeric handle it returns.
    pub number_handle_returns: BTreeMap<String, String>,
    /// Class name to the method that becomes its default initializer.
    pub default_initializers: BTreeMap<String, String>,
    pub forced_properties: Vec<String>,
    pub renames: BTreeMap<String, RenameSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    pub getter: String,
    pub setter: String,
    pub allocator: String,
    pub deallocators: Vec<String>,
    pub number_handle: String,
    pub callback_suffix: String,
    pub error_param: String,
    pub size_suffixes: Vec<String>,
    pub length: String,
    pub event: String,
    pub text: Vec<String>,
}

/// Names given to functions once they fill a fixed slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalNames {
    pub allocator: String,
    pub deallocator: String,
    pub getter: String,
    pub setter: String,
    pub callback: String,
}

/// Keyword overrides for the size accessor search, one table per call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordOverrides {
    /// Derived keyword replacements for buffer-returning methods.
    pub returns: BTreeMap<String, String>,
    /// Exact (class, method) replacements for buffer-returning methods.
    pub return_methods: Vec<MethodKeyword>,
    /// Derived keyword replacements for out-parameter getters.
    pub getters: BTreeMap<String, String>,
    /// Method names treated as out-parameter getters with a fixed keyword.
    pub getter_functions: BTreeMap<String, String>,
    pub setters: BTreeMap<String, String>,
    /// Method names whose buffer parameter is searched with a fixed keyword.
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodKeyword {
    pub class: String,
    pub method: String,
    pub keyword: String,
}

/// A method whose numeric handle parameter is retyped in place instead of
/// moving the method onto the handle's class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberHandleExemption {
    pub function: String,
    #[serde(default)]
    pub class: Option<String>,
}

impl NumberHandleExemption {
    pub fn matches(&self, function: &str, class: &str) -> bool {
        self.function == function && self.class.as_deref().map_or(true, |c| c == class)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameSpec {
    pub properties: BTreeMap<String, String>,
    pub functions: BTreeMap<String, String>,
}

fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            getter: "get_".into(),
            setter: "set_".into(),
            allocator: "new".into(),
            deallocators: strings(&["free", "kill"]),
            number_handle: "_number".into(),
            callback_suffix: "_cb".into(),
            error_param: "error".into(),
            size_suffixes: strings(&["_size", "_length"]),
            length: "length".into(),
            event: "event".into(),
            text: strings(&["name", "title", "message"]),
        }
    }
}

impl Default for CanonicalNames {
    fn default() -> Self {
        Self {
            allocator: "allocate_native".into(),
            deallocator: "deallocate_native".into(),
            getter: "get".into(),
            setter: "set".into(),
            callback: "callback".into(),
        }
    }
}

impl Default for KeywordOverrides {
    fn default() -> Self {
        Self {
            returns: table(&[("savedata_data", "savedata")]),
            return_methods: vec![MethodKeyword {
                class: "ToxEventFileRecvChunk".into(),
                method: "get_data".into(),
                keyword: String::new(),
            }],
            getters: table(&[("dht_id", "address"), ("id", "_id")]),
            getter_functions: table(&[("hash", "hash")]),
            setters: table(&[("savedata_data", "savedata")]),
            parameters: table(&[("conference_by_id", "_id"), ("conference_by_uid", "_uid")]),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let friend_returns = [
            "self_get_friend_list",
            "friend_add",
            "friend_add_norequest",
            "friend_by_public_key",
        ];
        let conference_returns = [
            "conference_get_chatlist",
            "conference_new",
            "conference_by_id",
            "conference_by_uid",
            "conference_join",
        ];
        let mut number_handle_returns = BTreeMap::new();
        for name in friend_returns {
            number_handle_returns.insert(name.to_string(), "Friend".to_string());
        }
        for name in conference_returns {
            number_handle_returns.insert(name.to_string(), "Conference".to_string());
        }
        number_handle_returns.insert("file_send".into(), "File".into());

        let mut renames = BTreeMap::new();
        renames.insert(
            "Tox".to_string(),
            RenameSpec {
                properties: BTreeMap::new(),
                functions: table(&[
                    ("friend_add", "add_friend"),
                    ("friend_add_norequest", "add_friend_norequest"),
                    ("conference_new", "new_conference"),
                ]),
            },
        );
        renames.insert(
            "Friend".to_string(),
            RenameSpec {
                properties: BTreeMap::new(),
                functions: table(&[("file_send", "send_file")]),
            },
        );
        renames.insert(
            "File".to_string(),
            RenameSpec {
                properties: table(&[("file_id", "id")]),
                functions: BTreeMap::new(),
            },
        );
        renames.insert(
            "Conference".to_string(),
            RenameSpec {
                properties: BTreeMap::new(),
                functions: table(&[("peer_number_is_ours", "peer_is_ours")]),
            },
        );

        Self {
            ir_version: "0.1.0".into(),
            library_version: "0.2.18".into(),
            headers: table(&[("tox.h", "Tox")]),
            markers: Markers::default(),
            canonical: CanonicalNames::default(),
            error_enum_prefix: "ToxErr".into(),
            exception_prefix: "Tox".into(),
            excluded_function_markers: strings(&["operating_system"]),
            skipped_enums: strings(&["T"]),
            event_return_exclusions: strings(&["ToxEvents"]),
            number_handle_exemptions: vec![
                NumberHandleExemption {
                    function: "peer_number_is_ours".into(),
                    class: None,
                },
                NumberHandleExemption {
                    function: "conference_invite".into(),
                    class: Some("Friend".into()),
                },
            ],
            keywords: KeywordOverrides::default(),
            number_handle_returns,
            default_initializers: table(&[("ToxOptions", "default")]),
            forced_properties: strings(&["iteration_interval"]),
            renames,
        }
    }
}

impl PipelineConfig {
    /// Parses a YAML (or JSON, which YAML accepts) configuration.
    pub fn from_yaml_str(source: &str) -> Result<Self, InputError> {
        serde_yaml::from_str(source).map_err(InputError::Config)
    }

    pub fn from_json_str(source: &str) -> Result<Self, InputError> {
        serde_json::from_str(source).map_err(InputError::ConfigJson)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| InputError::Read {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Loaded pipeline configuration from {}", path.display());
        Self::from_yaml_str(&source)
    }

    pub fn root_class_for(&self, header: &str) -> Option<&str> {
        self.headers.get(header).map(String::as_str)
    }

    pub fn is_size_name(&self, name: &str) -> bool {
        self.markers
            .size_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }

    pub fn is_number_handle_exempt(&self, function: &str, class: &str) -> bool {
        self.number_handle_exemptions
            .iter()
            .any(|exemption| exemption.matches(function, class))
    }

    pub fn return_method_keyword(&self, class: &str, method: &str) -> Option<&str> {
        self.keywords
            .return_methods
            .iter()
            .find(|entry| entry.class == class && entry.method == method)
            .map(|entry| entry.keyword.as_str())
    }
}
