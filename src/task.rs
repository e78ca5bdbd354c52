//! Data exchanged with the analysis service: what gets submitted, what a
//! task looks like while it runs, and what comes back at the end.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Source language of a submitted program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C++")]
    Cpp,
}

impl Language {
    /// Guess the language from a file extension. Unknown extensions yield `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "c" | "h" => Some(Self::C),
            "cc" | "cpp" | "cxx" | "c++" | "hpp" | "hh" => Some(Self::Cpp),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::C => f.write_str("C"),
            Self::Cpp => f.write_str("C++"),
        }
    }
}

/// A source location whose expression the service should trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceVariable {
    pub file: String,
    pub line_number: u32,
    pub expression: String,
}

/// Parses `FILE:LINE:EXPRESSION`. The expression may itself contain colons.
impl FromStr for TraceVariable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(file), Some(line), Some(expression)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("expected FILE:LINE:EXPRESSION, got `{s}`"));
        };
        if file.is_empty() || expression.is_empty() {
            return Err(format!("expected FILE:LINE:EXPRESSION, got `{s}`"));
        }
        let line_number = line
            .parse()
            .map_err(|_| format!("invalid line number `{line}` in `{s}`"))?;
        Ok(Self {
            file: file.to_string(),
            line_number,
            expression: expression.to_string(),
        })
    }
}

/// Optional knobs applied on top of the account defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub core: Option<String>,
    pub trace_variables: Vec<TraceVariable>,
}

impl Overrides {
    fn is_empty(&self) -> bool {
        self.core.is_none() && self.trace_variables.is_empty()
    }
}

/// A program to run. Built once, then only borrowed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub language: Language,
    pub source_code: String,
    pub arguments: String,
    pub overrides: Option<Overrides>,
}

impl AnalysisRequest {
    pub fn new(language: Language, source_code: impl Into<String>) -> Self {
        Self {
            language,
            source_code: source_code.into(),
            arguments: String::new(),
            overrides: None,
        }
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = arguments.into();
        self
    }

    pub fn with_core(mut self, core: impl Into<String>) -> Self {
        self.overrides.get_or_insert_with(Overrides::default).core = Some(core.into());
        self
    }

    pub fn with_trace_variable(mut self, variable: TraceVariable) -> Self {
        self.overrides
            .get_or_insert_with(Overrides::default)
            .trace_variables
            .push(variable);
        self
    }
}

// --- wire form of a submission ---

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireRequest<'a> {
    #[serde(rename = "Type")]
    kind: &'static str,
    source_code: WireSource<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overrides: Option<WireOverrides<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireSource<'a> {
    object: &'static str,
    code: &'a str,
    arguments: &'a str,
    language: Language,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireOverrides<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    core: Option<&'a str>,
    #[serde(skip_serializing_if = "no_traces")]
    trace_variables: &'a [TraceVariable],
}

fn no_traces(vars: &&[TraceVariable]) -> bool {
    vars.is_empty()
}

impl Serialize for AnalysisRequest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireRequest {
            kind: "SourceCode",
            source_code: WireSource {
                object: "SourceCode",
                code: &self.source_code,
                arguments: &self.arguments,
                language: self.language,
            },
            overrides: self
                .overrides
                .as_ref()
                .filter(|o| !o.is_empty())
                .map(|o| WireOverrides {
                    core: o.core.as_deref(),
                    trace_variables: &o.trace_variables,
                }),
        }
        .serialize(serializer)
    }
}

/// Server-side lifecycle state of a task.
///
/// Unrecognised strings are kept verbatim in [`TaskStatus::Other`] and
/// count as still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Accepted,
    Pending,
    Initialising,
    Building,
    Running,
    InProgress,
    Completed,
    Cancelled,
    Stopped,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Accepted => "Accepted",
            Self::Pending => "Pending",
            Self::Initialising => "Initialising",
            Self::Building => "Building",
            Self::Running => "Running",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Stopped => "Stopped",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Completed, Cancelled and Stopped tasks never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Stopped)
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Accepted" => Self::Accepted,
            "Pending" => Self::Pending,
            "Initialising" => Self::Initialising,
            "Building" => Self::Building,
            "Running" => Self::Running,
            "In Progress" => Self::InProgress,
            "Completed" => Self::Completed,
            "Cancelled" => Self::Cancelled,
            "Stopped" => Self::Stopped,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted task as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Task {
    #[serde(rename = "TaskID")]
    pub id: String,
    #[serde(rename = "Status")]
    pub status: TaskStatus,
    #[serde(rename = "Outputs", default)]
    pub outputs_ref: Option<String>,
}

/// Output manifest of a finished task. Entries are URLs, not content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskOutputs {
    #[serde(rename = "Stdout", default)]
    pub stdout: Option<String>,
}

/// A pre-signed, time-limited download link for a rendered plot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlotResource {
    #[serde(rename = "presignedURL")]
    pub url: String,
}

/// Samples drawn from one traced value of a task.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSamples {
    pub value_id: String,
    pub samples: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_request_serializes_without_overrides() {
        let request = AnalysisRequest::new(Language::C, "int main(){}").with_arguments("-n 4");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "Type": "SourceCode",
                "SourceCode": {
                    "Object": "SourceCode",
                    "Code": "int main(){}",
                    "Arguments": "-n 4",
                    "Language": "C"
                }
            })
        );
    }

    #[test]
    fn overrides_serialize_in_pascal_case() {
        let request = AnalysisRequest::new(Language::Cpp, "")
            .with_core("cafe")
            .with_trace_variable(TraceVariable {
                file: "main.cpp".to_string(),
                line_number: 12,
                expression: "sigma".to_string(),
            });
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["SourceCode"]["Language"], "C++");
        assert_eq!(
            value["Overrides"],
            json!({
                "Core": "cafe",
                "TraceVariables": [
                    {"File": "main.cpp", "LineNumber": 12, "Expression": "sigma"}
                ]
            })
        );
    }

    #[test]
    fn core_only_override_omits_trace_variables() {
        let request = AnalysisRequest::new(Language::C, "").with_core("c0");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["Overrides"], json!({"Core": "c0"}));
    }

    #[test]
    fn empty_overrides_are_dropped() {
        let mut request = AnalysisRequest::new(Language::C, "");
        request.overrides = Some(Overrides::default());
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("Overrides").is_none());
    }

    #[test]
    fn status_terminal_set() {
        for s in ["Completed", "Cancelled", "Stopped"] {
            assert!(TaskStatus::from(s).is_terminal(), "{s}");
        }
        for s in ["Accepted", "Pending", "Running", "In Progress", "Building", "Mystery"] {
            assert!(!TaskStatus::from(s).is_terminal(), "{s}");
        }
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let status: TaskStatus = serde_json::from_value(json!("Queued")).unwrap();
        assert_eq!(status, TaskStatus::Other("Queued".to_string()));
        assert_eq!(status.to_string(), "Queued");
    }

    #[test]
    fn task_deserializes_from_service_shape() {
        let task: Task =
            serde_json::from_value(json!({"TaskID": "t-1", "Status": "In Progress"})).unwrap();
        assert_eq!(task.id, "t-1");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.outputs_ref.is_none());
    }

    #[test]
    fn outputs_without_stdout() {
        let outputs: TaskOutputs = serde_json::from_value(json!({})).unwrap();
        assert!(outputs.stdout.is_none());
    }

    #[test]
    fn trace_variable_parses_expression_with_colons() {
        let var: TraceVariable = "src/main.c:42:a ? b : c".parse().unwrap();
        assert_eq!(var.file, "src/main.c");
        assert_eq!(var.line_number, 42);
        assert_eq!(var.expression, "a ? b : c");
    }

    #[test]
    fn trace_variable_rejects_bad_line() {
        let err = "main.c:x:y".parse::<TraceVariable>().unwrap_err();
        assert!(err.contains("invalid line number"));
        assert!("main.c:3".parse::<TraceVariable>().is_err());
    }

    #[test]
    fn language_from_extension() {
        assert_eq!(Language::from_path(Path::new("a.c")), Some(Language::C));
        assert_eq!(Language::from_path(Path::new("b.CPP")), Some(Language::Cpp));
        assert_eq!(Language::from_path(Path::new("c.rs")), None);
        assert_eq!(Language::from_path(Path::new("noext")), None);
    }
}
