//! 运行配置
//!
//! 从 TOML 加载，每个段落都有默认值；命令行参数在加载后覆盖对应字段。
//!
//! ```toml
//! [selection]
//! groups = ["fpu", "vector_float"]
//! exclude = ["fres"]
//!
//! [adapter]
//! kind = "replay"
//! replay_path = "hw.dump"
//!
//! [engine]
//! workers = 4
//! ```

use crate::compare::CompareOptions;
use crate::corpus::CorpusOptions;
use crate::descriptor::{InstructionDescriptor, InstructionGroup, InstructionTable};
use crate::report::ReportMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vm_error::ConfigError;
use vm_fpu::vector::VectorMode;

/// 指令选择；`instructions` 与 `groups` 都为空时选择全部
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub instructions: Vec<String>,
    pub groups: Vec<InstructionGroup>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    #[default]
    Model,
    Host,
    Replay,
}

impl std::str::FromStr for AdapterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(AdapterKind::Model),
            "host" => Ok(AdapterKind::Host),
            "replay" => Ok(AdapterKind::Replay),
            other => Err(format!("unknown adapter: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub kind: AdapterKind,
    /// `replay` 需要的 dump 文件
    pub replay_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// VSCR[NJ]：非规格化输入输出冲刷为零
    pub non_java: bool,
}

impl VectorConfig {
    pub fn mode(&self) -> VectorMode {
        if self.non_java {
            VectorMode::NON_JAVA
        } else {
            VectorMode::JAVA
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub mode: ReportMode,
    /// verbose 模式最多输出的非 PASS 行数
    pub max_mismatch_lines: usize,
    pub json_summary: Option<PathBuf>,
    /// 有 UNSUPPORTED 用例时也视为失败
    pub fail_on_unsupported: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            mode: ReportMode::Summary,
            max_mismatch_lines: 200,
            json_summary: None,
            fail_on_unsupported: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

/// 完整的运行配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub selection: SelectionConfig,
    pub corpus: CorpusOptions,
    pub adapter: AdapterConfig,
    pub compare: CompareOptions,
    pub vector: VectorConfig,
    pub report: ReportConfig,
    pub engine: EngineConfig,
}

impl OracleConfig {
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("TOML serialize error: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        Self::from_toml(&text)
    }

    /// 不依赖指令表的检查
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.workers == 0 {
            return Err(ConfigError::InvalidValue(
                "engine.workers".to_string(),
                "0".to_string(),
            ));
        }
        if self.adapter.kind == AdapterKind::Replay && self.adapter.replay_path.is_none() {
            return Err(ConfigError::InvalidValue(
                "adapter.replay_path".to_string(),
                "missing (required by the replay adapter)".to_string(),
            ));
        }
        if self.corpus.vector_patterns.is_empty() {
            return Err(ConfigError::InvalidValue(
                "corpus.vector_patterns".to_string(),
                "[]".to_string(),
            ));
        }
        Ok(())
    }

    /// 检查配置并解析出选中的描述符
    pub fn select(&self, table: &InstructionTable) -> Result<Vec<Arc<InstructionDescriptor>>, ConfigError> {
        self.validate()?;
        table.select(
            &self.selection.instructions,
            &self.selection.groups,
            &self.selection.exclude,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::OperandCorpus;
    use crate::table::{TableOptions, standard_table};

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = OracleConfig::from_toml("").expect("empty config is valid");
        assert_eq!(config, OracleConfig::default());
        assert_eq!(config.engine.workers, 1);
        assert!(config.compare.check_flags);
        assert_eq!(config.vector.mode(), VectorMode::JAVA);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_parse() {
        let config = OracleConfig::from_toml(
            r#"
            [selection]
            groups = ["fpu", "vector_float"]
            exclude = ["fres"]

            [adapter]
            kind = "replay"
            replay_path = "hw.dump"

            [vector]
            non_java = true

            [report]
            mode = "verbose"
            max_mismatch_lines = 5

            [engine]
            workers = 4
            "#,
        )
        .expect("valid config");
        assert_eq!(config.selection.groups, vec![InstructionGroup::Fpu, InstructionGroup::VectorFloat]);
        assert_eq!(config.adapter.kind, AdapterKind::Replay);
        assert_eq!(config.report.mode, ReportMode::Verbose);
        assert_eq!(config.vector.mode(), VectorMode::NON_JAVA);
        assert_eq!(config.engine.workers, 4);
        assert!(config.validate().is_ok());

        let again = OracleConfig::from_toml(&config.to_toml().expect("serializable"))
            .expect("round trip");
        assert_eq!(again, config);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = OracleConfig::default();
        config.engine.workers = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(key, _)) if key == "engine.workers"));

        let mut config = OracleConfig::default();
        config.adapter.kind = AdapterKind::Replay;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(key, _)) if key == "adapter.replay_path"));

        assert!(matches!(
            OracleConfig::from_toml("[engine]\nworkers = \"many\""),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            OracleConfig::from_file("/nonexistent/oracle.toml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_instruction_is_rejected() {
        let corpus = OperandCorpus::standard();
        let table = standard_table(corpus, &TableOptions::new(corpus, VectorMode::JAVA))
            .expect("standard table");
        let mut config = OracleConfig::default();
        config.selection.instructions = vec!["fadds".into(), "fmadds".into()];
        assert_eq!(config.select(&table).expect("known").len(), 2);

        config.selection.instructions.push("fdivq".into());
        assert_eq!(
            config.select(&table).unwrap_err(),
            ConfigError::UnknownInstruction("fdivq".into())
        );
    }
}
