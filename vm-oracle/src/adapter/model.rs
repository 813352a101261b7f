//! 回环执行器：用参考模型扮演硬件，带粘滞状态
//!
//! 用于 harness 自检：所有用例都应 PASS；若引擎漏掉 `clear_flags`，
//! 上一条指令留下的粘滞异常位会在下一条的比较中显现。

use super::ExecutionAdapter;
use crate::case::TestCase;
use crate::operand::Value;
use vm_error::AdapterError;
use vm_fpu::Flags;

/// 每条指令重写而非累积的状态位
const NON_STICKY: Flags = Flags::CR
    .union(Flags::FR)
    .union(Flags::FI)
    .union(Flags::FPRF);

#[derive(Debug, Default)]
pub struct ModelAdapter {
    status: Flags,
}

impl ModelAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutionAdapter for ModelAdapter {
    fn name(&self) -> &str {
        "model"
    }

    fn clear_flags(&mut self) {
        self.status = Flags::empty();
    }

    fn execute(&mut self, case: &TestCase<'_>) -> Result<Value, AdapterError> {
        let expected = case
            .descriptor
            .evaluate(&case.operands)
            .map_err(|e| AdapterError::fault(case.mnemonic(), e.to_string()))?;
        self.status = ((self.status - NON_STICKY) | expected.flags).summarize();
        Ok(expected.value)
    }

    fn read_flags(&mut self) -> Option<Flags> {
        Some(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::CaseGenerator;
    use crate::corpus::OperandCorpus;
    use crate::table::{TableOptions, standard_table};
    use vm_fpu::vector::VectorMode;

    #[test]
    fn test_sticky_flags_survive_without_clear() {
        let corpus = OperandCorpus::standard();
        let table = standard_table(corpus, &TableOptions::new(corpus, VectorMode::JAVA))
            .expect("standard table");
        let fdiv = table.get("fdiv").expect("fdiv");
        let mut adapter = ModelAdapter::new();

        let one_over_zero = CaseGenerator::new(fdiv, corpus)
            .expect("typed")
            .find(|c| c.operands[0] == Value::from_f64(1.0) && c.operands[1] == Value::from_f64(0.0))
            .expect("1/0 is in the corpus");
        adapter.clear_flags();
        adapter.execute(&one_over_zero).expect("model runs everything");
        assert!(adapter.read_flags().is_some_and(|f| f.contains(Flags::ZX | Flags::FX)));

        let exact = CaseGenerator::new(fdiv, corpus)
            .expect("typed")
            .find(|c| c.operands[0] == Value::from_f64(4.0) && c.operands[1] == Value::from_f64(2.0))
            .expect("4/2 is in the corpus");
        adapter.execute(&exact).expect("model runs everything");
        let flags = adapter.read_flags().unwrap_or_default();
        assert!(flags.contains(Flags::ZX), "ZX is sticky");
        assert!(flags.contains(Flags::FG) && !flags.contains(Flags::FU), "FPRF is replaced");

        adapter.clear_flags();
        adapter.execute(&exact).expect("model runs everything");
        assert_eq!(adapter.read_flags(), Some(Flags::FG));
    }
}
