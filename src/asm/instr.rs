use std::fmt::Display;

use super::reg::Reg;

/// `offset(base)` addressing, the only addressing mode `lw`/`sw`/`lb` use.
#[derive(Debug, Clone)]
pub struct Offset {
    pub words: i32,
    pub base: Reg,
}

impl Offset {
    pub fn new(words: i32, base: Reg) -> Self {
        Self { words, base }
    }
}

impl Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.words, self.base)
    }
}

/// Pure formatting helpers for MIPS/SPIM assembly (spec.md §4.5). Each
/// variant holds no state beyond what it prints; the enum exists so the
/// codegen passes can build instructions as data before rendering them,
/// separating construction from textual emission.
#[derive(Debug, Clone)]
pub enum Instruction {
    Comment(String),
    Label(String),

    Data,
    Text,
    Globl(String),
    Word(i32),
    WordLabel(String),
    Byte(u8),
    Ascii(String),
    Align(u32),

    Addiu(Reg, Reg, i32),
    Add(Reg, Reg, Reg),
    Sub(Reg, Reg, Reg),
    Mul(Reg, Reg, Reg),
    Div(Reg, Reg, Reg),
    Neg(Reg, Reg),

    Lw(Reg, Offset),
    Sw(Reg, Offset),
    Lb(Reg, Offset),
    La(Reg, String),
    Li(Reg, i32),
    Move(Reg, Reg),
    Sll(Reg, Reg, u32),

    Beqz(Reg, String),
    Bgtz(Reg, String),
    Blez(Reg, String),
    Bltz(Reg, String),
    Beq(Reg, Reg, String),
    Blt(Reg, Reg, String),
    Ble(Reg, Reg, String),

    J(String),
    Jr(Reg),
    Jal(String),
    Jalr(Reg),

    Syscall,
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Instruction::Comment(text) => format!("\t# {text}"),
            Instruction::Label(label) => format!("{label}:"),

            Instruction::Data => "\t.data".to_string(),
            Instruction::Text => "\t.text".to_string(),
            Instruction::Globl(name) => format!("\t.globl\t{name}"),
            Instruction::Word(value) => format!("\t.word\t{value}"),
            Instruction::WordLabel(label) => format!("\t.word\t{label}"),
            Instruction::Byte(value) => format!("\t.byte\t{value}"),
            Instruction::Ascii(text) => format!("\t.ascii\t\"{}\"", escape_ascii(text)),
            Instruction::Align(bytes) => format!("\t.align\t{bytes}"),

            Instruction::Addiu(t, s, imm) => format!("\taddiu\t{t}, {s}, {imm}"),
            Instruction::Add(d, s, t) => format!("\tadd \t{d}, {s}, {t}"),
            Instruction::Sub(d, s, t) => format!("\tsub \t{d}, {s}, {t}"),
            Instruction::Mul(d, s, t) => format!("\tmul \t{d}, {s}, {t}"),
            Instruction::Div(d, s, t) => format!("\tdiv \t{d}, {s}, {t}"),
            Instruction::Neg(d, s) => format!("\tneg \t{d}, {s}"),

            Instruction::Lw(t, off) => format!("\tlw  \t{t}, {off}"),
            Instruction::Sw(t, off) => format!("\tsw  \t{t}, {off}"),
            Instruction::Lb(t, off) => format!("\tlb  \t{t}, {off}"),
            Instruction::La(t, label) => format!("\tla  \t{t}, {label}"),
            Instruction::Li(t, imm) => format!("\tli  \t{t}, {imm}"),
            Instruction::Move(t, s) => format!("\tmove\t{t}, {s}"),
            Instruction::Sll(d, s, shamt) => format!("\tsll \t{d}, {s}, {shamt}"),

            Instruction::Beqz(r, label) => format!("\tbeqz\t{r}, {label}"),
            Instruction::Bgtz(r, label) => format!("\tbgtz\t{r}, {label}"),
            Instruction::Blez(r, label) => format!("\tblez\t{r}, {label}"),
            Instruction::Bltz(r, label) => format!("\tbltz\t{r}, {label}"),
            Instruction::Beq(a, b, label) => format!("\tbeq \t{a}, {b}, {label}"),
            Instruction::Blt(a, b, label) => format!("\tblt \t{a}, {b}, {label}"),
            Instruction::Ble(a, b, label) => format!("\tble \t{a}, {b}, {label}"),

            Instruction::J(label) => format!("\tj   \t{label}"),
            Instruction::Jr(r) => format!("\tjr  \t{r}"),
            Instruction::Jal(label) => format!("\tjal \t{label}"),
            Instruction::Jalr(r) => format!("\tjalr\t{r}"),

            Instruction::Syscall => "\tsyscall".to_string(),
        };
        f.write_str(&value)
    }
}

fn escape_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\0' => out.push_str("\\000"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_load_with_offset() {
        let instr = Instruction::Lw(Reg::A0, Offset::new(0, Reg::Sp));
        assert_eq!(instr.to_string(), "\tlw  \t$a0, 0($sp)");
    }

    #[test]
    fn renders_label_without_indentation() {
        let instr = Instruction::Label("Main_init".to_string());
        assert_eq!(instr.to_string(), "Main_init:");
    }
}
