//! Declarative pipeline definitions.
//!
//! A pipeline names its agents and tasks in YAML; [`PipelineDefinition::build`]
//! turns it into a ready-to-run [`Crew`]. Without a file, the built-in
//! document-to-code pipeline is used.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::{Agent, AgentProfile, AgentSettings};
use crate::config::Config;
use crate::crew::{Crew, CrewError};
use crate::llm::LlmClient;
use crate::sandbox::Sandbox;
use crate::task::Task;
use crate::tools::{DocsSearchTool, FileReadTool, Tool, ToolError};

pub const FASTAPI_DOCS_URL: &str = "https://fastapi.tiangolo.com/";
pub const SCIPY_DOCS_URL: &str = "https://docs.scipy.org/doc/scipy/tutorial/index.html#user-guide";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to read pipeline file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline definition: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Agent '{0}' is defined more than once")]
    DuplicateAgent(String),

    #[error("Task '{task}' refers to unknown agent '{agent}'")]
    UnknownAgent { task: String, agent: String },

    #[error("Task '{task}' has an invalid tool: {source}")]
    Tool {
        task: String,
        #[source]
        source: ToolError,
    },

    #[error(transparent)]
    Crew(#[from] CrewError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Key tasks use to refer to this agent
    pub name: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Overrides the configured default model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub allow_execution: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    ReadFile { path: PathBuf },
    SearchDocs { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    pub description: String,
    pub expected_output: String,
    pub agent: String,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub agents: Vec<AgentDefinition>,
    pub tasks: Vec<TaskDefinition>,
    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

fn default_verbose() -> bool {
    true
}

impl PipelineDefinition {
    pub fn from_yaml(yaml: &str) -> Result<Self, PipelineError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// The configured pipeline file, or the built-in pipeline.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        match &config.pipeline_file {
            Some(path) => {
                tracing::info!("Loading pipeline from {}", path.display());
                Self::load(path)
            }
            None => Ok(Self::default_for(&config.source_document, &config.output_file)),
        }
    }

    /// Built-in pipeline: analyse a document, summarise the FastAPI and
    /// SciPy references, then generate a Python file.
    pub fn default_for(source_document: &Path, output_file: &Path) -> Self {
        let analyzer = AgentDefinition {
            name: "analyzer".to_string(),
            role: "Python Code Analyzer".to_string(),
            goal: "Analyze documents and provide relevant code insights or translate them into code.".to_string(),
            backstory: "You are an expert Python developer tasked with reading and analyzing a scientific paper. \
                The paper is a PDF, and you are responsible for analyzing or translating the code it describes. \
                You will also reference the FastAPI and SciPy documentation to implement the code in Python."
                .to_string(),
            model: None,
            allow_execution: false,
        };

        let coder = AgentDefinition {
            name: "coder".to_string(),
            role: "Senior Python Developer".to_string(),
            goal: "Generate code based on the analysis and document it in a Python file.".to_string(),
            backstory: "You are a senior Python developer experienced in translating analysis into clean, executable code. \
                You generate Python code from the analysis you are given, using the FastAPI and SciPy documentation. \
                The code must be clean, well-documented, and executable."
                .to_string(),
            model: None,
            allow_execution: true,
        };

        let tasks = vec![
            TaskDefinition {
                name: "read_document".to_string(),
                description: "Read the provided PDF document and analyze the code or translate it into Python code.".to_string(),
                expected_output: "A detailed analysis of the code in the PDF document.".to_string(),
                agent: analyzer.name.clone(),
                tools: vec![ToolDefinition::ReadFile {
                    path: source_document.to_path_buf(),
                }],
                output_file: None,
            },
            TaskDefinition {
                name: "fetch_fastapi_docs".to_string(),
                description: "Fetch and analyze the FastAPI documentation.".to_string(),
                expected_output: "A summary of relevant FastAPI documentation points for the code.".to_string(),
                agent: analyzer.name.clone(),
                tools: vec![ToolDefinition::SearchDocs {
                    url: FASTAPI_DOCS_URL.to_string(),
                }],
                output_file: None,
            },
            TaskDefinition {
                name: "fetch_scipy_docs".to_string(),
                description: "Fetch and analyze the SciPy documentation.".to_string(),
                expected_output: "A summary of relevant SciPy documentation points for the code.".to_string(),
                agent: analyzer.name.clone(),
                tools: vec![ToolDefinition::SearchDocs {
                    url: SCIPY_DOCS_URL.to_string(),
                }],
                output_file: None,
            },
            TaskDefinition {
                name: "generate_code".to_string(),
                description: "Generate an executable Python script based on the PDF document, FastAPI, and SciPy documentation analysis.".to_string(),
                expected_output: "A valid Python `.py` file implementing the functionality described in the PDF, with clear comments.".to_string(),
                agent: coder.name.clone(),
                tools: Vec::new(),
                output_file: Some(output_file.to_path_buf()),
            },
        ];

        Self {
            agents: vec![analyzer, coder],
            tasks,
            verbose: true,
        }
    }

    /// Construct the agents, tools and tasks and assemble the crew.
    ///
    /// `config.allow_execution`, when set, overrides every agent's
    /// `allow_execution`; `config.verbose = false` silences the crew.
    pub fn build(&self, config: &Config, llm: Arc<dyn LlmClient>) -> Result<Crew, PipelineError> {
        let mut by_name: HashMap<&str, Arc<Agent>> = HashMap::new();
        let mut agents = Vec::with_capacity(self.agents.len());

        for def in &self.agents {
            let mut settings = AgentSettings::from_config(config);
            if let Some(model) = &def.model {
                settings = settings.with_model(model.clone());
            }
            let profile = AgentProfile::new(&def.role, &def.goal, &def.backstory);

            let agent = if config.allow_execution.unwrap_or(def.allow_execution) {
                Agent::executing(profile, settings, Arc::clone(&llm), Sandbox::new(&config.sandbox))
            } else {
                Agent::read_only(profile, settings, Arc::clone(&llm))
            };
            let agent = Arc::new(agent);

            if by_name.insert(def.name.as_str(), Arc::clone(&agent)).is_some() {
                return Err(PipelineError::DuplicateAgent(def.name.clone()));
            }
            agents.push(agent);
        }

        let mut tasks = Vec::with_capacity(self.tasks.len());
        for def in &self.tasks {
            let agent = by_name
                .get(def.agent.as_str())
                .ok_or_else(|| PipelineError::UnknownAgent {
                    task: def.name.clone(),
                    agent: def.agent.clone(),
                })?;

            let tools = def
                .tools
                .iter()
                .map(build_tool)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| PipelineError::Tool {
                    task: def.name.clone(),
                    source,
                })?;

            let mut task = Task::new(&def.name, &def.description, &def.expected_output, Arc::clone(agent))
                .with_tools(tools);
            if let Some(path) = &def.output_file {
                task = task.with_output_file(path);
            }
            tasks.push(task);
        }

        Ok(Crew::new(agents, tasks, self.verbose && config.verbose)?)
    }
}

fn build_tool(def: &ToolDefinition) -> Result<Arc<dyn Tool>, ToolError> {
    Ok(match def {
        ToolDefinition::ReadFile { path } => Arc::new(FileReadTool::new(path)),
        ToolDefinition::SearchDocs { url } => Arc::new(DocsSearchTool::new(url)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, ChatResponse, LlmError, ToolSchema};
    use async_trait::async_trait;

    struct Idle;

    #[async_trait]
    impl LlmClient for Idle {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
            _tools: Option<&[ToolSchema]>,
        ) -> Result<ChatResponse, LlmError> {
            Ok(ChatResponse::text("done"))
        }
    }

    fn config() -> Config {
        Config::new("key".to_string(), "gpt-4o-mini".to_string())
    }

    #[test]
    fn default_pipeline_matches_document_to_code_flow() {
        let def = PipelineDefinition::default_for(Path::new("paper.pdf"), Path::new("gen.py"));
        let crew = def.build(&config(), Arc::new(Idle)).unwrap();

        assert_eq!(crew.agents().len(), 2);
        let names: Vec<_> = crew.tasks().iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            ["read_document", "fetch_fastapi_docs", "fetch_scipy_docs", "generate_code"]
        );
        assert!(!crew.tasks()[0].agent().can_execute());
        assert!(crew.tasks()[3].agent().can_execute());
        assert!(Arc::ptr_eq(crew.tasks()[0].agent(), crew.tasks()[2].agent()));
        assert_eq!(crew.tasks()[3].output_file(), Some(Path::new("gen.py")));
        assert_eq!(crew.tasks()[0].tools()[0].name(), "read_file");
        assert_eq!(crew.tasks()[1].tools()[0].name(), "search_docs");
    }

    #[test]
    fn execution_override_applies_to_every_agent() {
        let mut config = config();
        config.allow_execution = Some(false);
        let def = PipelineDefinition::default_for(Path::new("paper.pdf"), Path::new("gen.py"));
        let crew = def.build(&config, Arc::new(Idle)).unwrap();
        assert!(crew.agents().iter().all(|a| !a.can_execute()));
    }

    #[test]
    fn parses_yaml_definition() {
        let yaml = r#"
agents:
  - name: reader
    role: Reader
    goal: Read things
    backstory: Reads a lot
    model: gpt-4o
tasks:
  - name: read
    description: Read the notes
    expected_output: A summary
    agent: reader
    tools:
      - type: read_file
        path: notes.txt
      - type: search_docs
        url: https://docs.example.com/
    output_file: summary.md
verbose: false
"#;
        let def = PipelineDefinition::from_yaml(yaml).unwrap();
        assert!(!def.verbose);
        assert_eq!(def.agents[0].model.as_deref(), Some("gpt-4o"));
        assert!(!def.agents[0].allow_execution);
        assert_eq!(
            def.tasks[0].tools[1],
            ToolDefinition::SearchDocs {
                url: "https://docs.example.com/".to_string()
            }
        );

        let crew = def.build(&config(), Arc::new(Idle)).unwrap();
        assert!(!crew.verbose());
        assert_eq!(crew.agents()[0].settings().model, "gpt-4o");
    }

    #[test]
    fn unknown_agent_is_rejected() {
        let mut def = PipelineDefinition::default_for(Path::new("a.pdf"), Path::new("b.py"));
        def.tasks[1].agent = "ghost".to_string();
        let err = def.build(&config(), Arc::new(Idle)).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownAgent { agent, .. } if agent == "ghost"));
    }

    #[test]
    fn duplicate_agent_is_rejected() {
        let mut def = PipelineDefinition::default_for(Path::new("a.pdf"), Path::new("b.py"));
        let dup = def.agents[0].clone();
        def.agents.push(dup);
        let err = def.build(&config(), Arc::new(Idle)).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateAgent(name) if name == "analyzer"));
    }

    #[test]
    fn invalid_corpus_url_is_rejected() {
        let mut def = PipelineDefinition::default_for(Path::new("a.pdf"), Path::new("b.py"));
        def.tasks[1].tools = vec![ToolDefinition::SearchDocs {
            url: "fastapi docs".to_string(),
        }];
        let err = def.build(&config(), Arc::new(Idle)).unwrap_err();
        assert!(matches!(err, PipelineError::Tool { task, .. } if task == "fetch_fastapi_docs"));
    }

    #[test]
    fn output_on_non_terminal_task_is_rejected() {
        let mut def = PipelineDefinition::default_for(Path::new("a.pdf"), Path::new("b.py"));
        def.tasks[0].output_file = Some(PathBuf::from("early.txt"));
        let err = def.build(&config(), Arc::new(Idle)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Crew(CrewError::MisplacedOutput { task }) if task == "read_document"
        ));
    }
}
