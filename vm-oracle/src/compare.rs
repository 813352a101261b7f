//! 比较器：期望值与观测值 → 判定
//!
//! - 精确比较：关心掩码内的原始位逐位相等，零的符号有意义
//! - ULP / 绝对误差：按浮点元素比较，NaN 只能与 NaN 相等
//! - 状态位：适配器能观测时，在关心掩码内比较并给出差异

use crate::descriptor::{InstructionDescriptor, NanPolicy, Tolerance};
use crate::operand::{Expected, LaneType, Observation, Value};
use serde::{Deserialize, Serialize};
use vm_fpu::format::{self, ulp_distance};
use vm_fpu::{Double, Flags, Single};

/// 比较选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// 适配器能观测状态位时是否比较
    pub check_flags: bool,
    /// 对所有指令忽略 NaN 的符号与 payload
    pub ignore_nan_payload: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            check_flags: true,
            ignore_nan_payload: false,
        }
    }
}

/// 不符的细节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchDetail {
    pub expected: Value,
    pub observed: Value,
    pub value_mismatch: bool,
    pub expected_flags: Flags,
    pub observed_flags: Option<Flags>,
    /// 关心掩码内不同的状态位
    pub flag_delta: Flags,
    /// 容差比较时最大的元素 ULP 距离
    pub ulp_distance: Option<u128>,
}

/// 每个用例恰好一个判定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Mismatch(Box<MismatchDetail>),
    Unsupported(String),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Mismatch(_) => "MISMATCH",
            Verdict::Unsupported(_) => "UNSUPPORTED",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FloatLane {
    double: bool,
    /// 元素在整个值中的位置
    mask: u128,
    shift: u32,
}

impl FloatLane {
    fn bits(&self, value: u128) -> u128 {
        (value & self.mask) >> self.shift
    }

    fn is_nan(&self, bits: u128) -> bool {
        if self.double {
            format::is_nan::<Double>(bits)
        } else {
            format::is_nan::<Single>(bits)
        }
    }

    fn is_infinite(&self, bits: u128) -> bool {
        if self.double {
            format::is_infinite::<Double>(bits)
        } else {
            format::is_infinite::<Single>(bits)
        }
    }

    fn is_negative(&self, bits: u128) -> bool {
        if self.double {
            format::is_negative::<Double>(bits)
        } else {
            format::is_negative::<Single>(bits)
        }
    }

    fn ulps(&self, a: u128, b: u128) -> u128 {
        if self.double {
            ulp_distance::<Double>(a, b)
        } else {
            ulp_distance::<Single>(a, b)
        }
    }

    fn to_f64(&self, bits: u128) -> f64 {
        if self.double {
            f64::from_bits(bits as u64)
        } else {
            f64::from(f32::from_bits(bits as u32))
        }
    }
}

/// 浮点类型的值拆成元素；其他类型返回空
fn float_lanes(value: &Value) -> Vec<FloatLane> {
    match value {
        Value::F32(_) => vec![FloatLane { double: false, mask: 0xFFFF_FFFF, shift: 0 }],
        Value::F64(_) => vec![FloatLane { double: true, mask: u128::from(u64::MAX), shift: 0 }],
        Value::Vector(LaneType::Float, _) => (0..4)
            .map(|i| {
                let shift = 96 - 32 * i;
                FloatLane { double: false, mask: 0xFFFF_FFFFu128 << shift, shift }
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
    options: CompareOptions,
}

impl Comparator {
    pub fn new(options: CompareOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> CompareOptions {
        self.options
    }

    pub fn compare(
        &self,
        descriptor: &InstructionDescriptor,
        expected: &Expected,
        observation: &Observation,
    ) -> Verdict {
        let any_nan = descriptor.nan_policy == NanPolicy::AnyNan || self.options.ignore_nan_payload;
        let (values_match, ulps) =
            if expected.value.semantic_type() != observation.value.semantic_type() {
                (false, None)
            } else {
                self.compare_values(descriptor.tolerance, any_nan, expected, &observation.value)
            };

        let flag_delta = match observation.flags {
            Some(observed) if self.options.check_flags => {
                (expected.flags ^ observed) & expected.care.flags
            }
            _ => Flags::empty(),
        };

        if values_match && flag_delta.is_empty() {
            return Verdict::Pass;
        }
        Verdict::Mismatch(Box::new(MismatchDetail {
            expected: expected.value,
            observed: observation.value,
            value_mismatch: !values_match,
            expected_flags: expected.flags,
            observed_flags: observation.flags,
            flag_delta,
            ulp_distance: ulps,
        }))
    }

    fn compare_values(
        &self,
        tolerance: Tolerance,
        any_nan: bool,
        expected: &Expected,
        observed: &Value,
    ) -> (bool, Option<u128>) {
        let care = expected.care.value_mask;
        let (e, o) = (expected.value.bits(), observed.bits());
        let lanes = float_lanes(&expected.value);
        if lanes.is_empty() {
            return ((e ^ o) & care == 0, None);
        }

        let mut all_match = true;
        let mut worst: Option<u128> = None;
        for lane in lanes.iter().filter(|lane| lane.mask & care != 0) {
            let (eb, ob) = (lane.bits(e), lane.bits(o));
            let (e_nan, o_nan) = (lane.is_nan(eb), lane.is_nan(ob));
            let lane_match = if e_nan || o_nan {
                if any_nan {
                    e_nan && o_nan
                } else {
                    (e ^ o) & care & lane.mask == 0
                }
            } else {
                match tolerance {
                    Tolerance::Exact => (e ^ o) & care & lane.mask == 0,
                    // 符号与无穷必须精确一致，ULP 只度量同号有限值
                    Tolerance::Ulp { .. }
                        if lane.is_negative(eb) != lane.is_negative(ob)
                            || lane.is_infinite(eb)
                            || lane.is_infinite(ob) =>
                    {
                        eb == ob
                    }
                    Tolerance::Ulp { max_ulps } => {
                        let distance = lane.ulps(eb, ob);
                        worst = worst.max(Some(distance));
                        distance <= max_ulps
                    }
                    Tolerance::Absolute { max_error } => {
                        if lane.is_infinite(eb) || lane.is_infinite(ob) {
                            eb == ob
                        } else {
                            (lane.to_f64(eb) - lane.to_f64(ob)).abs() <= max_error
                        }
                    }
                }
            };
            all_match &= lane_match;
        }
        (all_match, worst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{InstructionGroup, InstructionTable, TableBuilder};
    use crate::corpus::OperandCorpus;
    use crate::operand::SemanticType;
    use vm_simd::Vec128;

    fn table() -> InstructionTable {
        let mut builder = TableBuilder::new();
        let exact = InstructionDescriptor::builder("exact", InstructionGroup::Fpu, SemanticType::F32)
            .operands([SemanticType::F32])
            .reference(|_| Ok(Expected::value(Value::F32(0))));
        let estimate = InstructionDescriptor::builder("estimate", InstructionGroup::VectorFloat, SemanticType::Vector(LaneType::Float))
            .operands([SemanticType::Vector(LaneType::Float)])
            .tolerance(Tolerance::Ulp { max_ulps: 4 })
            .nan_policy(NanPolicy::AnyNan)
            .reference(|_| Ok(Expected::value(Value::Vector(LaneType::Float, Vec128::ZERO))));
        let log = InstructionDescriptor::builder("log", InstructionGroup::VectorFloat, SemanticType::Vector(LaneType::Float))
            .operands([SemanticType::Vector(LaneType::Float)])
            .tolerance(Tolerance::Absolute { max_error: 0.5 })
            .reference(|_| Ok(Expected::value(Value::Vector(LaneType::Float, Vec128::ZERO))));
        builder.add(exact).add(estimate).add(log);
        builder.build(OperandCorpus::standard()).expect("valid table")
    }

    fn observe(value: Value, flags: Option<Flags>) -> Observation {
        Observation { value, flags }
    }

    #[test]
    fn test_signed_zero_is_significant() {
        let table = table();
        let d = table.get("exact").expect("exact");
        let comparator = Comparator::default();
        let expected = Expected::value(Value::F32(0));
        assert!(comparator.compare(d, &expected, &observe(Value::F32(0), None)).is_pass());
        let verdict = comparator.compare(d, &expected, &observe(Value::F32(0x8000_0000), None));
        assert!(matches!(verdict, Verdict::Mismatch(ref m) if m.value_mismatch));
    }

    #[test]
    fn test_flag_delta_respects_care_mask() {
        let table = table();
        let d = table.get("exact").expect("exact");
        let comparator = Comparator::default();
        let expected = Expected::exact(Value::F32(0), Flags::FE | Flags::XX).ignore_flags(Flags::XX);
        let observed = observe(Value::F32(0), Some(Flags::FE | Flags::FX | Flags::XX));
        let Verdict::Mismatch(detail) = comparator.compare(d, &expected, &observed) else {
            panic!("FX differs");
        };
        assert!(!detail.value_mismatch);
        assert_eq!(detail.flag_delta, Flags::FX);

        let lenient = Comparator::new(CompareOptions { check_flags: false, ..Default::default() });
        assert!(lenient.compare(d, &expected, &observed).is_pass());
    }

    #[test]
    fn test_nan_payload_override() {
        let table = table();
        let d = table.get("exact").expect("exact");
        let expected = Expected::value(Value::F32(0x7FC0_0000));
        let observed = observe(Value::F32(0xFFC0_0000), None);
        assert!(!Comparator::default().compare(d, &expected, &observed).is_pass());
        let relaxed = Comparator::new(CompareOptions { ignore_nan_payload: true, ..Default::default() });
        assert!(relaxed.compare(d, &expected, &observed).is_pass());
        // NaN 不能与数值相等
        assert!(!relaxed.compare(d, &expected, &observe(Value::F32(0), None)).is_pass());
    }

    #[test]
    fn test_ulp_tolerance_is_lane_wise() {
        let table = table();
        let d = table.get("estimate").expect("estimate");
        let one = 1.0f32.to_bits();
        let expected = Expected::value(Value::Vector(LaneType::Float, Vec128::from_words([one, one, 0x7FC0_0000, 0])));
        let close = Vec128::from_words([one + 4, one - 3, 0x7FC0_0001, 0]);
        let verdict = Comparator::default().compare(d, &expected, &observe(Value::Vector(LaneType::Float, close), None));
        assert!(verdict.is_pass());

        let far = Vec128::from_words([one + 5, one, 0x7FC0_0000, 0]);
        let Verdict::Mismatch(detail) = Comparator::default().compare(d, &expected, &observe(Value::Vector(LaneType::Float, far), None)) else {
            panic!("5 ulps exceeds the bound");
        };
        assert_eq!(detail.ulp_distance, Some(5));
    }

    #[test]
    fn test_ulp_tolerance_keeps_sign_and_infinity_exact() {
        let table = table();
        let d = table.get("estimate").expect("estimate");
        let lanes = |words: [u32; 4]| Value::Vector(LaneType::Float, Vec128::from_words(words));
        let inf = f32::INFINITY.to_bits();
        let expected = Expected::value(lanes([0, inf, f32::NEG_INFINITY.to_bits(), 1.0f32.to_bits()]));
        let comparator = Comparator::default();

        let same = lanes([0, inf, f32::NEG_INFINITY.to_bits(), 1.0f32.to_bits() + 1]);
        assert!(comparator.compare(d, &expected, &observe(same, None)).is_pass());

        let negative_zero = lanes([0x8000_0000, inf, f32::NEG_INFINITY.to_bits(), 1.0f32.to_bits()]);
        assert!(!comparator.compare(d, &expected, &observe(negative_zero, None)).is_pass());

        let max = lanes([0, f32::MAX.to_bits(), f32::NEG_INFINITY.to_bits(), 1.0f32.to_bits()]);
        assert!(!comparator.compare(d, &expected, &observe(max, None)).is_pass());

        let min = lanes([0, inf, f32::MIN.to_bits(), 1.0f32.to_bits()]);
        assert!(!comparator.compare(d, &expected, &observe(min, None)).is_pass());
    }

    #[test]
    fn test_absolute_tolerance() {
        let table = table();
        let d = table.get("log").expect("log");
        let expected = Expected::value(Value::Vector(LaneType::Float, Vec128::from_words([2.0f32.to_bits(), f32::NEG_INFINITY.to_bits(), 0, 0])));
        let near = Vec128::from_words([2.25f32.to_bits(), f32::NEG_INFINITY.to_bits(), 0, 0]);
        assert!(Comparator::default().compare(d, &expected, &observe(Value::Vector(LaneType::Float, near), None)).is_pass());
        let finite = Vec128::from_words([2.0f32.to_bits(), f32::MIN.to_bits(), 0, 0]);
        assert!(!Comparator::default().compare(d, &expected, &observe(Value::Vector(LaneType::Float, finite), None)).is_pass());
    }
}
