use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum IrError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Convention(#[from] ConventionError),

    #[error("Failed to encode the IR document")]
    #[diagnostic(code(output::encode))]
    Encode(#[from] serde_json::Error),

    #[error("Failed to encode the IR document as YAML")]
    #[diagnostic(code(output::encode_yaml))]
    EncodeYaml(#[from] serde_yaml::Error),

    #[error("I/O error while writing the IR document")]
    #[diagnostic(code(output::io))]
    Io(#[from] std::io::Error),
}

/// Problems with what was handed to the pipeline, reported before any pass runs.
#[derive(Error, Debug, Diagnostic)]
pub enum InputError {
    #[error("The header `{header}` is not supported")]
    #[diagnostic(
        code(input::unsupported_header),
        help("Remove the header from the declaration set or map it to a root class in the configuration.")
    )]
    UnsupportedHeader { header: String },

    #[error("The declaration set contains no headers")]
    #[diagnostic(
        code(input::no_headers),
        help("Run the C parser over at least one supported header first.")
    )]
    NoHeaders,

    #[error("Malformed declaration set")]
    #[diagnostic(code(input::malformed_json))]
    Json(#[source] serde_json::Error),

    #[error("Malformed declaration set")]
    #[diagnostic(code(input::malformed_yaml))]
    Yaml(#[source] serde_yaml::Error),

    #[error("Malformed pipeline configuration")]
    #[diagnostic(code(input::malformed_config))]
    Config(#[source] serde_yaml::Error),

    #[error("Malformed pipeline configuration")]
    #[diagnostic(code(input::malformed_config_json))]
    ConfigJson(#[source] serde_json::Error),

    #[error("Could not read `{path}`")]
    #[diagnostic(code(input::io))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The header does not follow a naming or structural convention the passes rely on.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ConventionError {
    #[error("Could not find an exception for the error enum `{enum_name}` used by `{function}`")]
    #[diagnostic(
        code(convention::missing_exception),
        help("Error enums must carry the configured error prefix so an exception is derived for them.")
    )]
    MissingException { enum_name: String, function: String },

    #[error("Could not find a size accessor for `{class}.{function}` (tried keywords: {})", .keywords.join(", "))]
    #[diagnostic(
        code(convention::missing_size_accessor),
        help("Add a keyword override for this method to the pipeline configuration.")
    )]
    MissingSizeAccessor {
        class: String,
        function: String,
        keywords: Vec<String>,
    },
}
