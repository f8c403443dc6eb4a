use std::fmt::Display;

/// MIPS general-purpose and special registers used by the emitted code
/// (spec.md §4.4's calling convention and §4.5's helper set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Zero,
    At,
    V0,
    V1,
    A0,
    A1,
    A2,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    S0,
    S1,
    Sp,
    Fp,
    Ra,
}

impl Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Reg::Zero => "$zero",
            Reg::At => "$at",
            Reg::V0 => "$v0",
            Reg::V1 => "$v1",
            Reg::A0 => "$a0",
            Reg::A1 => "$a1",
            Reg::A2 => "$a2",
            Reg::T0 => "$t0",
            Reg::T1 => "$t1",
            Reg::T2 => "$t2",
            Reg::T3 => "$t3",
            Reg::T4 => "$t4",
            Reg::T5 => "$t5",
            Reg::S0 => "$s0",
            Reg::S1 => "$s1",
            Reg::Sp => "$sp",
            Reg::Fp => "$fp",
            Reg::Ra => "$ra",
        };
        f.write_str(name)
    }
}
