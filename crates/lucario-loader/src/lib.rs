//! Parses the program image text format and installs it into RAM and the
//! initial CPU context.
//!
//! Grounded on `examples/original_source/src/kernel/loader.c`'s
//! `readProgramWord`/`loadProgram`, reworked around an in-memory `&str`
//! (rather than a `FILE*`) so parsing is testable without real file I/O,
//! in the style of `examples/emu198x-emu198x/crates/emu-c64/src/prg.rs`.

use std::path::Path;

use lucario_core::{
    is_valid_word, Mode, DEFAULT_STACK_SIZE, DEFAULT_TIMER_LIMIT, MIN_STACK_SIZE, OS_RESERVED_SIZE, RAM_SIZE,
};
use lucario_cpu::Cpu;
use lucario_mmu::Memory;

/// Why a program image failed to load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not read program file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed header on line {line}: expected `{expected} <value>`")]
    MalformedHeader { line: usize, expected: &'static str },
    #[error("program needs {word_count} words but only {available} are free after the OS-reserved region and the minimum stack")]
    ProgramTooLarge { word_count: usize, available: usize },
    #[error("line {line}: `{text}` is not a valid decimal word in [0, {max}]", max = lucario_core::MAX_WORD_VALUE)]
    InvalidWord { line: usize, text: String },
    #[error("expected {expected} program words but the file only supplied {found}")]
    TruncatedProgram { expected: usize, found: usize },
    #[error("installing program word at physical address {addr} failed: {source}")]
    Install { addr: usize, #[source] source: lucario_core::Error },
    #[error("_start {0} has no corresponding non-negative program counter")]
    InvalidStart(i64),
}

/// The three header fields plus the parsed word list, before installation.
#[derive(Debug, Clone)]
pub struct ParsedProgram {
    /// 1-based instruction index at which execution begins.
    pub start: i64,
    pub word_count: usize,
    pub name: String,
    pub words: Vec<i64>,
}

fn strip_comment(line: &str) -> &str {
    line.find("//").map_or(line, |idx| &line[..idx])
}

fn header_value<'a>(line: &'a str, line_no: usize, keyword: &'static str) -> Result<&'a str, LoadError> {
    let stripped = strip_comment(line).trim();
    let mut parts = stripped.splitn(2, char::is_whitespace);
    let found_keyword = parts.next().unwrap_or("");
    if found_keyword != keyword {
        return Err(LoadError::MalformedHeader { line: line_no, expected: keyword });
    }
    Ok(parts.next().unwrap_or("").trim())
}

/// Parse a program image from its textual contents. `text` is the whole
/// file: three header lines followed by `word_count` data lines: `//`
/// comments are stripped first, and blank lines (including comment-only
/// ones) are skipped when counting data lines, matching
/// `readProgramWord`'s loop-until-a-number behavior.
pub fn parse_program(text: &str) -> Result<ParsedProgram, LoadError> {
    let mut lines = text.lines().enumerate();

    let (n1, l1) = lines.next().ok_or(LoadError::MalformedHeader { line: 1, expected: "_start" })?;
    let start: i64 = header_value(l1, n1 + 1, "_start")?
        .parse()
        .map_err(|_| LoadError::MalformedHeader { line: n1 + 1, expected: "_start" })?;

    let (n2, l2) = lines.next().ok_or(LoadError::MalformedHeader { line: 2, expected: ".NumeroPalabras" })?;
    let word_count: usize = header_value(l2, n2 + 1, ".NumeroPalabras")?
        .parse()
        .map_err(|_| LoadError::MalformedHeader { line: n2 + 1, expected: ".NumeroPalabras" })?;

    let (n3, l3) = lines.next().ok_or(LoadError::MalformedHeader { line: 3, expected: ".NombreProg" })?;
    let name = header_value(l3, n3 + 1, ".NombreProg")?.to_string();

    let mut words = Vec::with_capacity(word_count);
    for (line_no, raw) in lines {
        if words.len() == word_count {
            break;
        }
        let stripped = strip_comment(raw).trim();
        if stripped.is_empty() {
            continue;
        }
        // Matches `sscanf(line, "%d", &w)`: only the first whitespace-separated
        // token on the line is the word; anything after it is ignored.
        let token = stripped.split_whitespace().next().unwrap_or("");
        let value: i64 = token
            .parse()
            .map_err(|_| LoadError::InvalidWord { line: line_no + 1, text: stripped.to_string() })?;
        if !is_valid_word(value) {
            return Err(LoadError::InvalidWord { line: line_no + 1, text: stripped.to_string() });
        }
        words.push(value);
    }

    if words.len() < word_count {
        return Err(LoadError::TruncatedProgram { expected: word_count, found: words.len() });
    }

    Ok(ParsedProgram { start, word_count, name, words })
}

/// Install a parsed program into RAM and set up the CPU's initial context,
/// per the original loader's formulas. Rejects (does not clamp) a program
/// that would leave less than `MIN_STACK_SIZE` words for the stack.
pub fn install(parsed: &ParsedProgram, memory: &Memory, cpu: &mut Cpu) -> Result<(), LoadError> {
    let required = OS_RESERVED_SIZE + MIN_STACK_SIZE + parsed.word_count;
    if required > RAM_SIZE {
        return Err(LoadError::ProgramTooLarge {
            word_count: parsed.word_count,
            available: RAM_SIZE.saturating_sub(OS_RESERVED_SIZE + MIN_STACK_SIZE),
        });
    }

    let stack_size = (RAM_SIZE - OS_RESERVED_SIZE - parsed.word_count).min(DEFAULT_STACK_SIZE);
    log::info!(target: "lucario::hardware", "Loader: stack memory available: {stack_size} words");

    for (i, &word) in parsed.words.iter().enumerate() {
        let addr = OS_RESERVED_SIZE + i;
        memory
            .write(addr as i64, word, Mode::Kernel, 0, 0)
            .map_err(|source| LoadError::Install { addr, source })?;
    }
    log::info!(target: "lucario::hardware", "Loader: all instructions written to RAM successfully");

    let regs = &mut cpu.registers;
    regs.rb = OS_RESERVED_SIZE;
    regs.rl = OS_RESERVED_SIZE + parsed.word_count + stack_size;
    regs.rx = parsed.word_count;
    regs.sp = parsed.word_count + stack_size;
    regs.psw.pc = usize::try_from(parsed.start - 1).map_err(|_| LoadError::InvalidStart(parsed.start))?;
    regs.timer_limit = DEFAULT_TIMER_LIMIT;
    regs.cycles_counter = 0;
    regs.psw.mode = Mode::User;
    regs.psw.interrupts_enabled = true;

    log::info!(
        target: "lucario::hardware",
        "Loader: context set - RB: {} | RL: {} | RX: {} | SP: {} | PC: {}",
        regs.rb, regs.rl, regs.rx, regs.sp, regs.psw.pc
    );

    Ok(())
}

/// Read `path`, parse it, and install it — the end-to-end entry point the
/// CLI's `run`/`debug` commands use.
pub fn load_program_file(path: &Path, memory: &Memory, cpu: &mut Cpu) -> Result<ParsedProgram, LoadError> {
    log::info!(target: "lucario::hardware", "Loader: attempting to load program from '{}'", path.display());
    let text = std::fs::read_to_string(path)?;
    let parsed = parse_program(&text)?;
    log::info!(
        target: "lucario::hardware",
        "Loader: metadata parsed - name: {}, words: {}, start line: {}",
        parsed.name, parsed.word_count, parsed.start
    );
    install(&parsed, memory, cpu)?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
_start 1
.NumeroPalabras 3
.NombreProg ADDER
0410 0007 // not a real instruction, just a literal word
0010000
1300000
";

    #[test]
    fn parses_headers_and_strips_comments() {
        let parsed = parse_program(SAMPLE).unwrap();
        assert_eq!(parsed.start, 1);
        assert_eq!(parsed.word_count, 3);
        assert_eq!(parsed.name, "ADDER");
        assert_eq!(parsed.words, vec![0410, 10000, 1300000]);
    }

    #[test]
    fn rejects_wrong_header_keyword() {
        let bad = "wrongkeyword 1\n.NumeroPalabras 1\n.NombreProg X\n0\n";
        let err = parse_program(bad).unwrap_err();
        assert!(matches!(err, LoadError::MalformedHeader { line: 1, .. }));
    }

    #[test]
    fn rejects_out_of_range_word() {
        let bad = "_start 1\n.NumeroPalabras 1\n.NombreProg X\n99999999\n";
        let err = parse_program(bad).unwrap_err();
        assert!(matches!(err, LoadError::InvalidWord { .. }));
    }

    #[test]
    fn rejects_truncated_program() {
        let bad = "_start 1\n.NumeroPalabras 2\n.NombreProg X\n5\n";
        let err = parse_program(bad).unwrap_err();
        assert!(matches!(err, LoadError::TruncatedProgram { expected: 2, found: 1 }));
    }

    #[test]
    fn install_sets_context_per_formula() {
        let parsed = parse_program(SAMPLE).unwrap();
        let memory = Memory::new();
        let mut cpu = Cpu::new();

        install(&parsed, &memory, &mut cpu).unwrap();

        let regs = cpu.registers;
        assert_eq!(regs.rb, OS_RESERVED_SIZE);
        assert_eq!(regs.rx, 3);
        assert_eq!(regs.rl, OS_RESERVED_SIZE + 3 + DEFAULT_STACK_SIZE);
        assert_eq!(regs.sp, 3 + DEFAULT_STACK_SIZE);
        assert_eq!(regs.psw.pc, 0);
        assert_eq!(regs.psw.mode, Mode::User);
        assert!(regs.psw.interrupts_enabled);
        assert_eq!(regs.timer_limit, DEFAULT_TIMER_LIMIT);

        assert_eq!(memory.read(OS_RESERVED_SIZE as i64, Mode::Kernel, 0, 0).unwrap(), 0410);
    }

    #[test]
    fn install_rejects_program_too_large_for_ram() {
        let oversized = ParsedProgram {
            start: 1,
            word_count: RAM_SIZE,
            name: "HUGE".to_string(),
            words: vec![0; RAM_SIZE],
        };
        let memory = Memory::new();
        let mut cpu = Cpu::new();
        let err = install(&oversized, &memory, &mut cpu).unwrap_err();
        assert!(matches!(err, LoadError::ProgramTooLarge { .. }));
    }
}
