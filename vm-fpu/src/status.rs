//! 条件/异常状态位：FPSCR、CR 字段与 VSCR[SAT]
//!
//! 位的编号是内部约定，与硬件寄存器中的位置无关；适配器负责把硬件寄存器映射到这里。

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// 一条指令执行后可观测的状态位集合
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        // CR 字段（整数 record 形式写 CR0）
        const CR_LT = 1 << 0;
        const CR_GT = 1 << 1;
        const CR_EQ = 1 << 2;
        const CR_SO = 1 << 3;

        // FPSCR 异常汇总位
        const FX = 1 << 4;
        const VX = 1 << 5;
        const OX = 1 << 6;
        const UX = 1 << 7;
        const ZX = 1 << 8;
        const XX = 1 << 9;

        // FPSCR 无效操作细分位
        const VXSNAN = 1 << 10;
        const VXISI = 1 << 11;
        const VXIDI = 1 << 12;
        const VXZDZ = 1 << 13;
        const VXIMZ = 1 << 14;
        const VXVC = 1 << 15;
        const VXSQRT = 1 << 16;
        const VXCVI = 1 << 17;

        // 舍入信息
        const FR = 1 << 18;
        const FI = 1 << 19;

        // FPRF = C || FPCC
        const FPRF_C = 1 << 20;
        const FL = 1 << 21;
        const FG = 1 << 22;
        const FE = 1 << 23;
        const FU = 1 << 24;

        // VSCR
        const SAT = 1 << 25;
    }
}

impl Flags {
    pub const CR: Flags = Flags::CR_LT.union(Flags::CR_GT).union(Flags::CR_EQ).union(Flags::CR_SO);

    pub const FPCC: Flags = Flags::FL.union(Flags::FG).union(Flags::FE).union(Flags::FU);

    pub const FPRF: Flags = Flags::FPRF_C.union(Flags::FPCC);

    /// 所有 VX* 细分位
    pub const INVALID: Flags = Flags::VXSNAN
        .union(Flags::VXISI)
        .union(Flags::VXIDI)
        .union(Flags::VXZDZ)
        .union(Flags::VXIMZ)
        .union(Flags::VXVC)
        .union(Flags::VXSQRT)
        .union(Flags::VXCVI);

    /// 会触发 FX 的异常位
    pub const EXCEPTIONS: Flags = Flags::OX
        .union(Flags::UX)
        .union(Flags::ZX)
        .union(Flags::XX)
        .union(Flags::INVALID);

    /// 全部 FPSCR 位
    pub const FPSCR: Flags = Flags::FX
        .union(Flags::VX)
        .union(Flags::EXCEPTIONS)
        .union(Flags::FR)
        .union(Flags::FI)
        .union(Flags::FPRF);

    /// 补全汇总位：任一 VX* 置位则 VX 置位，任一异常置位则 FX 置位
    pub fn summarize(self) -> Flags {
        let mut flags = self;
        if flags.intersects(Flags::INVALID) {
            flags |= Flags::VX;
        }
        if flags.intersects(Flags::EXCEPTIONS) {
            flags |= Flags::FX;
        }
        flags
    }

    /// 4 位 CR 字段值 (LT GT EQ SO/FU，高位在前) 对应的 FPCC
    pub fn from_fpcc(field: u8) -> Flags {
        let mut flags = Flags::empty();
        flags.set(Flags::FL, field & 0b1000 != 0);
        flags.set(Flags::FG, field & 0b0100 != 0);
        flags.set(Flags::FE, field & 0b0010 != 0);
        flags.set(Flags::FU, field & 0b0001 != 0);
        flags
    }

    /// 4 位 CR 字段值对应的 CR 位
    pub fn from_cr_field(field: u8) -> Flags {
        let mut flags = Flags::empty();
        flags.set(Flags::CR_LT, field & 0b1000 != 0);
        flags.set(Flags::CR_GT, field & 0b0100 != 0);
        flags.set(Flags::CR_EQ, field & 0b0010 != 0);
        flags.set(Flags::CR_SO, field & 0b0001 != 0);
        flags
    }
}

/// 以 `VX|VXSNAN|FX` 形式输出，空集输出 `-`
impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        write!(f, "{}", names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_sets_vx_and_fx() {
        let flags = (Flags::VXSNAN | Flags::FU).summarize();
        assert!(flags.contains(Flags::VX | Flags::FX | Flags::VXSNAN));
        assert_eq!(Flags::FPRF.summarize(), Flags::FPRF);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Flags::empty().to_string(), "-");
        assert_eq!((Flags::VX | Flags::FX).to_string(), "FX|VX");
    }

    #[test]
    fn test_fpcc_mapping() {
        assert_eq!(Flags::from_fpcc(0b0001), Flags::FU);
        assert_eq!(Flags::from_cr_field(0b1000), Flags::CR_LT);
    }
}
