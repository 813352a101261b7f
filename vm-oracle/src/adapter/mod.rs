//! 执行适配器：被测执行单元的窄接口
//!
//! 引擎对每个用例依次调用 `clear_flags` → `execute` → `read_flags`。
//! `execute` 失败不是致命错误，记为 UNSUPPORTED。

use crate::case::TestCase;
use crate::operand::Value;
use vm_error::AdapterError;
use vm_fpu::Flags;

mod host;
mod model;
mod replay;

pub use host::HostAdapter;
pub use model::ModelAdapter;
pub use replay::ReplayAdapter;

/// 被测执行单元
pub trait ExecutionAdapter: Send {
    /// 报告中使用的名称
    fn name(&self) -> &str;

    /// 清除粘滞状态位（FPSCR、XER[SO]、VSCR[SAT]）
    fn clear_flags(&mut self);

    fn execute(&mut self, case: &TestCase<'_>) -> Result<Value, AdapterError>;

    /// 上一次 `execute` 之后的状态位；无法观测时返回 `None`
    fn read_flags(&mut self) -> Option<Flags>;
}

impl<A: ExecutionAdapter + ?Sized> ExecutionAdapter for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn clear_flags(&mut self) {
        (**self).clear_flags()
    }

    fn execute(&mut self, case: &TestCase<'_>) -> Result<Value, AdapterError> {
        (**self).execute(case)
    }

    fn read_flags(&mut self) -> Option<Flags> {
        (**self).read_flags()
    }
}
