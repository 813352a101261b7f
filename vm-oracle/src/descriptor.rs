//! 指令描述符与描述符表
//!
//! 描述符把助记符、操作数类型、容差策略与参考函数绑定在一起。表在构建时一次性校验，
//! 构建失败是配置错误，整次运行不会开始。

use crate::corpus::OperandCorpus;
use crate::operand::{Expected, Operands, SemanticType, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use vm_error::{ConfigError, OperandError, OracleError, OracleResult};

/// 指令分组，用于选择与报告
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionGroup {
    Fpu,
    IntegerLogical,
    VectorInteger,
    VectorFloat,
    VectorPermute,
    VectorMemory,
}

impl fmt::Display for InstructionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstructionGroup::Fpu => "fpu",
            InstructionGroup::IntegerLogical => "integer_logical",
            InstructionGroup::VectorInteger => "vector_integer",
            InstructionGroup::VectorFloat => "vector_float",
            InstructionGroup::VectorPermute => "vector_permute",
            InstructionGroup::VectorMemory => "vector_memory",
        };
        write!(f, "{}", name)
    }
}

impl InstructionGroup {
    pub const ALL: [InstructionGroup; 6] = [
        InstructionGroup::Fpu,
        InstructionGroup::IntegerLogical,
        InstructionGroup::VectorInteger,
        InstructionGroup::VectorFloat,
        InstructionGroup::VectorPermute,
        InstructionGroup::VectorMemory,
    ];
}

impl std::str::FromStr for InstructionGroup {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InstructionGroup::ALL
            .into_iter()
            .find(|g| g.to_string() == s)
            .ok_or_else(|| ConfigError::InvalidValue("group".to_string(), s.to_string()))
    }
}

/// 结果比较的容差
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    Exact,
    /// 按元素的 ULP 距离上界（估计指令）
    Ulp { max_ulps: u128 },
    /// 按元素的绝对误差上界
    Absolute { max_error: f64 },
}

/// NaN 的比较方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NanPolicy {
    /// NaN 的符号与 payload 必须逐位相同
    Strict,
    /// 任意 NaN 与任意 NaN 相等
    AnyNan,
}

/// 参考函数：操作数元组 → 期望结果
pub type ReferenceFn = Arc<dyn Fn(Operands<'_>) -> Result<Expected, OperandError> + Send + Sync>;

/// 已校验的指令描述符
pub struct InstructionDescriptor {
    pub mnemonic: String,
    pub group: InstructionGroup,
    pub operands: Vec<SemanticType>,
    pub result: SemanticType,
    pub tolerance: Tolerance,
    pub nan_policy: NanPolicy,
    reference: ReferenceFn,
}

impl fmt::Debug for InstructionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstructionDescriptor")
            .field("mnemonic", &self.mnemonic)
            .field("group", &self.group)
            .field("operands", &self.operands)
            .field("result", &self.result)
            .field("tolerance", &self.tolerance)
            .field("nan_policy", &self.nan_policy)
            .finish_non_exhaustive()
    }
}

impl InstructionDescriptor {
    pub fn builder(
        mnemonic: impl Into<String>,
        group: InstructionGroup,
        result: SemanticType,
    ) -> DescriptorBuilder {
        DescriptorBuilder {
            mnemonic: mnemonic.into(),
            group,
            operands: Vec::new(),
            result,
            tolerance: Tolerance::Exact,
            nan_policy: NanPolicy::Strict,
            reference: None,
        }
    }

    pub fn arity(&self) -> usize {
        self.operands.len()
    }

    /// 计算期望结果
    ///
    /// 操作数元组与描述符的类型不符时返回 `OracleError::Operand`，这是致命错误。
    pub fn evaluate(&self, operands: &[Value]) -> OracleResult<Expected> {
        let wrap = |source| OracleError::Operand {
            source,
            mnemonic: self.mnemonic.clone(),
        };
        if operands.len() != self.operands.len() {
            return Err(wrap(OperandError::Missing(operands.len().min(self.operands.len()))));
        }
        for (index, (value, ty)) in operands.iter().zip(&self.operands).enumerate() {
            if value.semantic_type() != *ty {
                return Err(wrap(OperandError::TypeMismatch {
                    index,
                    expected: ty.to_string(),
                    found: value.semantic_type().to_string(),
                }));
            }
        }
        let expected = (self.reference)(Operands(operands)).map_err(wrap)?;
        if expected.value.semantic_type() != self.result {
            return Err(wrap(OperandError::TypeMismatch {
                index: operands.len(),
                expected: self.result.to_string(),
                found: expected.value.semantic_type().to_string(),
            }));
        }
        Ok(expected)
    }
}

/// 描述符构建器
pub struct DescriptorBuilder {
    mnemonic: String,
    group: InstructionGroup,
    operands: Vec<SemanticType>,
    result: SemanticType,
    tolerance: Tolerance,
    nan_policy: NanPolicy,
    reference: Option<ReferenceFn>,
}

impl DescriptorBuilder {
    pub fn operands(mut self, operands: impl IntoIterator<Item = SemanticType>) -> Self {
        self.operands = operands.into_iter().collect();
        self
    }

    pub fn tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn nan_policy(mut self, nan_policy: NanPolicy) -> Self {
        self.nan_policy = nan_policy;
        self
    }

    pub fn reference<F>(mut self, reference: F) -> Self
    where
        F: Fn(Operands<'_>) -> Result<Expected, OperandError> + Send + Sync + 'static,
    {
        self.reference = Some(Arc::new(reference));
        self
    }

    fn finish(self, corpus: &OperandCorpus) -> Result<InstructionDescriptor, ConfigError> {
        let reference = self
            .reference
            .ok_or_else(|| ConfigError::MissingReference(self.mnemonic.clone()))?;
        if !(1..=3).contains(&self.operands.len()) {
            return Err(ConfigError::InvalidArity(self.mnemonic, self.operands.len()));
        }
        if let Some(ty) = self
            .operands
            .iter()
            .find(|&&ty| corpus.slice(ty).is_empty())
        {
            return Err(ConfigError::EmptyCorpusSlice(self.mnemonic, ty.to_string()));
        }
        Ok(InstructionDescriptor {
            mnemonic: self.mnemonic,
            group: self.group,
            operands: self.operands,
            result: self.result,
            tolerance: self.tolerance,
            nan_policy: self.nan_policy,
            reference,
        })
    }
}

/// 收集描述符并在 `build` 时统一校验
#[derive(Default)]
pub struct TableBuilder {
    pending: Vec<DescriptorBuilder>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, descriptor: DescriptorBuilder) -> &mut Self {
        self.pending.push(descriptor);
        self
    }

    /// 校验全部描述符：缺少参考函数、元数不在 1..=3、助记符重复、操作数类型没有语料
    pub fn build(self, corpus: &OperandCorpus) -> OracleResult<InstructionTable> {
        let mut descriptors = Vec::with_capacity(self.pending.len());
        let mut index = HashMap::new();
        for pending in self.pending {
            if index.contains_key(&pending.mnemonic) {
                return Err(ConfigError::DuplicateMnemonic(pending.mnemonic).into());
            }
            let descriptor = pending.finish(corpus)?;
            index.insert(descriptor.mnemonic.clone(), descriptors.len());
            descriptors.push(Arc::new(descriptor));
        }
        log::debug!("instruction table built with {} descriptors", descriptors.len());
        Ok(InstructionTable { descriptors, index })
    }
}

/// 注册顺序即报告顺序
#[derive(Debug, Clone, Default)]
pub struct InstructionTable {
    descriptors: Vec<Arc<InstructionDescriptor>>,
    index: HashMap<String, usize>,
}

impl InstructionTable {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<InstructionDescriptor>> {
        self.descriptors.iter()
    }

    pub fn get(&self, mnemonic: &str) -> Option<&Arc<InstructionDescriptor>> {
        self.index.get(mnemonic).map(|&i| &self.descriptors[i])
    }

    pub fn contains(&self, mnemonic: &str) -> bool {
        self.index.contains_key(mnemonic)
    }

    /// 按助记符与分组选择描述符
    ///
    /// `instructions` 与 `groups` 都为空时选择全部；`exclude` 最后生效。未知助记符是配置错误。
    pub fn select(
        &self,
        instructions: &[String],
        groups: &[InstructionGroup],
        exclude: &[String],
    ) -> Result<Vec<Arc<InstructionDescriptor>>, ConfigError> {
        for name in instructions.iter().chain(exclude) {
            if !self.contains(name) {
                return Err(ConfigError::UnknownInstruction(name.clone()));
            }
        }
        let select_all = instructions.is_empty() && groups.is_empty();
        Ok(self
            .descriptors
            .iter()
            .filter(|d| {
                select_all || instructions.contains(&d.mnemonic) || groups.contains(&d.group)
            })
            .filter(|d| !exclude.contains(&d.mnemonic))
            .cloned()
            .collect())
    }
}
