//! 操作数语料：每种语义类型一组有序的边界值
//!
//! 顺序与历史输出保持一致，报告中的操作数下标可以直接对照旧的 dump。

use crate::operand::{ImmKind, LaneType, SemanticType, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use vm_simd::Vec128;

/// 单精度基础取值
pub const FLOAT_VALUES: [f32; 22] = [
    0.0,
    -0.0,
    1.0,
    -1.0,
    1.5,
    -1.5,
    1.6,
    -1.6,
    1.4,
    -1.4,
    2.0,
    -2.0,
    4.0,
    -10000000.4,
    20000000.0,
    -20000.5,
    20000.6,
    f32::MIN_POSITIVE,
    f32::MAX,
    f32::INFINITY,
    f32::NEG_INFINITY,
    f32::NAN,
];

/// 双精度基础取值
pub const DOUBLE_VALUES: [f64; 22] = [
    0.0,
    -0.0,
    1.0,
    -1.0,
    1.5,
    -1.5,
    1.6,
    -1.6,
    1.4,
    -1.4,
    2.0,
    -2.0,
    4.0,
    -10000000.4,
    20000000.0,
    -20000.5,
    20000.6,
    f64::MIN_POSITIVE,
    f64::MAX,
    f64::INFINITY,
    f64::NEG_INFINITY,
    f64::NAN,
];

/// 最小正非规格化数、绝对值最大的负非规格化数、SNaN、负 QNaN
const EXTENDED_FLOAT_BITS: [u32; 4] = [0x0000_0001, 0x807F_FFFF, 0x7FA0_0000, 0xFFC0_0000];
const EXTENDED_DOUBLE_BITS: [u64; 4] = [
    0x0000_0000_0000_0001,
    0x800F_FFFF_FFFF_FFFF,
    0x7FF4_0000_0000_0000,
    0xFFF8_0000_0000_0000,
];

/// 64 位整数逻辑运算的操作数
pub const GPR_VALUES: [u64; 16] = [
    0x0000_0000_0000_0000,
    0x0000_0000_0000_0001,
    0x0000_0000_0000_0002,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFE,
    0x0003_3333_0033_0033,
    0x0000_00FF_FFF0_0000,
    0x1000_0000_0000_0000,
    0x1FFF_FFFF_FFFF_FFFF,
    0x4238_5722_0000_0000,
    0x7000_0000_0000_0000,
    0x0000_0000_7223_3411,
    0x7FFF_FFFF_FFFF_FFFF,
    0x8000_0000_0000_0000,
    0x8000_0000_0000_0001,
    0x0123_4567_89AB_CDEF,
];

/// 整数向量的 32 位种子
pub const INT_SEEDS: [i32; 21] = [
    0,
    1,
    2,
    3,
    4,
    -1,
    -2,
    -3,
    -4,
    0x0003_3333,
    0x00ff_fff0,
    0x1000_0000,
    0x1234_5678,
    0x1fff_ffff,
    0x4238_5722,
    0x7000_0000,
    0x7223_3411,
    0x7fff_ffff,
    0x8000_0000u32 as i32,
    0x8000_0001u32 as i32,
    0x8fff_ffffu32 as i32,
];

/// load/store 使用的内存映像大小
pub const MEMORY_SIZE: usize = 48;

/// 种子到向量的展开方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorPattern {
    /// [x, 0, 0, 0]
    Lead,
    /// [x, x, 0, 0]
    Pair,
    /// [x, x, x, x]
    Splat,
    /// 与种子无关的边界向量：交替元素、每元素有符号极值、字节序列、置换控制、一致移位量
    Boundary,
}

impl VectorPattern {
    fn expand(self, seed: u32) -> Option<Vec128> {
        match self {
            VectorPattern::Lead => Some(Vec128::from_words([seed, 0, 0, 0])),
            VectorPattern::Pair => Some(Vec128::from_words([seed, seed, 0, 0])),
            VectorPattern::Splat => Some(Vec128::from_words([seed; 4])),
            VectorPattern::Boundary => None,
        }
    }
}

/// 语料构建选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusOptions {
    /// 追加非规格化数与 SNaN 等扩展取值
    pub extended_values: bool,
    pub vector_patterns: Vec<VectorPattern>,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            extended_values: false,
            vector_patterns: vec![VectorPattern::Lead, VectorPattern::Pair, VectorPattern::Boundary],
        }
    }
}

/// 每种语义类型的有序取值，初始化后不可变
#[derive(Debug, Clone)]
pub struct OperandCorpus {
    slices: HashMap<SemanticType, Vec<Value>>,
    memory: [u8; MEMORY_SIZE],
}

static STANDARD: OnceLock<OperandCorpus> = OnceLock::new();

impl OperandCorpus {
    /// 进程内共享的默认语料
    pub fn standard() -> &'static OperandCorpus {
        STANDARD.get_or_init(|| OperandCorpus::build(&CorpusOptions::default()))
    }

    pub fn build(options: &CorpusOptions) -> Self {
        let mut slices = HashMap::new();

        let mut floats: Vec<Value> = FLOAT_VALUES.iter().map(|&x| Value::from_f32(x)).collect();
        let mut doubles: Vec<Value> = DOUBLE_VALUES.iter().map(|&x| Value::from_f64(x)).collect();
        if options.extended_values {
            floats.extend(EXTENDED_FLOAT_BITS.iter().map(|&b| Value::F32(b)));
            doubles.extend(EXTENDED_DOUBLE_BITS.iter().map(|&b| Value::F64(b)));
        }
        let float_seeds: Vec<u32> = floats
            .iter()
            .map(|v| v.bits() as u32)
            .collect();
        slices.insert(SemanticType::F32, floats);
        slices.insert(SemanticType::F64, doubles);
        slices.insert(
            SemanticType::Gpr,
            GPR_VALUES.iter().map(|&g| Value::Gpr(g)).collect(),
        );

        let int_seeds: Vec<u32> = INT_SEEDS.iter().map(|&i| i as u32).collect();
        for lane in LaneType::ALL {
            let seeds = if lane == LaneType::Float {
                &float_seeds
            } else {
                &int_seeds
            };
            let vectors = vector_slice(lane, seeds, &options.vector_patterns);
            slices.insert(
                SemanticType::Vector(lane),
                vectors.into_iter().map(|v| Value::Vector(lane, v)).collect(),
            );
        }

        for (kind, values) in immediate_slices() {
            slices.insert(
                SemanticType::Imm(kind),
                values.iter().map(|&i| Value::Imm(kind, i)).collect(),
            );
        }

        Self {
            slices,
            memory: std::array::from_fn(|i| i as u8),
        }
    }

    /// 某类型的取值；没有该类型时为空
    pub fn slice(&self, ty: SemanticType) -> &[Value] {
        self.slices.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 替换某类型的取值（测试与自定义语料）
    pub fn with_slice(mut self, ty: SemanticType, values: Vec<Value>) -> Self {
        self.slices.insert(ty, values);
        self
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }
}

fn immediate_slices() -> [(ImmKind, &'static [i32]); 8] {
    [
        (ImmKind::Uimm16, &[0, 1, 0xFFFF]),
        (ImmKind::Simm5, &[-16, -1, 0, 1, 2, 15]),
        (ImmKind::Scale, &[0, 1, 2, 31]),
        (ImmKind::ByteIndex, &[15, 0, 1, 2]),
        (ImmKind::HalfIndex, &[7, 0, 1, 2]),
        (ImmKind::WordIndex, &[3, 0, 1, 2]),
        (ImmKind::ShiftOctets, &[0, 1, 2, 15]),
        (ImmKind::Offset, &[0, 1, 2, 3, 5, 8, 15, 16, 17, 31, 32]),
    ]
}

fn vector_slice(lane: LaneType, seeds: &[u32], patterns: &[VectorPattern]) -> Vec<Vec128> {
    let mut out = Vec::new();
    for &pattern in patterns {
        if pattern == VectorPattern::Boundary {
            out.extend(boundary_vectors(lane));
        } else {
            out.extend(seeds.iter().filter_map(|&s| pattern.expand(s)));
        }
    }
    out
}

fn boundary_vectors(lane: LaneType) -> Vec<Vec128> {
    if lane == LaneType::Float {
        return vec![
            Vec128::from_words([
                1.0f32.to_bits(),
                (-0.0f32).to_bits(),
                f32::INFINITY.to_bits(),
                f32::NAN.to_bits(),
            ]),
            Vec128::from_words([0x0000_0001, 0x8000_0001, f32::MAX.to_bits(), f32::MIN_POSITIVE.to_bits()]),
            Vec128::from_words([0.5f32.to_bits(), (-2.5f32).to_bits(), 3.5f32.to_bits(), (-1e-3f32).to_bits()]),
        ];
    }

    let size = lane.element_size();
    let bits = u32::from(size) * 8;
    let signed_max = (1u64 << (bits - 1)) - 1;
    let signed_min = 1u64 << (bits - 1);
    let lanes = Vec128::lanes(size);
    let alternating = (0..lanes).fold(Vec128::ZERO, |acc, i| {
        acc.with_lane(size, i, if i % 2 == 0 { u64::MAX } else { 0 })
    });
    // 偶数字节取 a，奇数字节取 b
    let cross_permute = Vec128::from_bytes(std::array::from_fn(|i| {
        if i % 2 == 0 { i as u8 } else { 0x10 + i as u8 }
    }));
    vec![
        alternating,
        Vec128::splat(size, signed_max),
        Vec128::splat(size, signed_min),
        Vec128::from_bytes(std::array::from_fn(|i| i as u8)),
        cross_permute,
        Vec128::splat(1, 0x03),
        Vec128::splat(1, 0x7F),
    ]
}
