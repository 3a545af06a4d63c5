use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationMissingArgument,
    ValidationInvalidArgument,

    DeployBuildFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::DeployBuildFailed => "deploy.build_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub working_dir: String,
    pub output_tail: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        let message = format!("Missing required argument: {}", args.join(", "));
        Self::new(
            ErrorCode::ValidationMissingArgument,
            message,
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let problem = problem.into();
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            format!("Invalid argument: {}", problem),
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem,
                tried,
            }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::ConfigInvalidJson,
            format!("Invalid JSON in configuration: {}", path),
            to_details(ConfigInvalidJsonDetails {
                path,
                error: err.to_string(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem: problem.into(),
            }),
        )
    }

    pub fn deploy_build_failed(message: impl Into<String>, details: BuildFailedDetails) -> Self {
        Self::new(ErrorCode::DeployBuildFailed, message, to_details(details))
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let error = error.into();
        let message = match &context {
            Some(ctx) => format!("IO error ({}): {}", ctx, error),
            None => format!("IO error: {}", error),
        };
        Self::new(
            ErrorCode::InternalIoError,
            message,
            to_details(InternalIoErrorDetails { error, context }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalJsonErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::InternalUnexpected,
            format!("Unexpected error: {}", error),
            serde_json::json!({ "error": error }),
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::internal_unexpected(message)
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
