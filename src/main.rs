//! vm16 - CLI entry point.
//!
//! Commands:
//! - `vm16 run <program>` - run a .bin image or .asm source until halt
//! - `vm16 asm <source>` - assemble to a .bin image
//! - `vm16 disasm <image>` - list an image as assembly text

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use vm16::asm::{assemble, disassemble, disassemble_record};
use vm16::{Cpu, CpuState, HaltSnapshot, InvalidOpcodePolicy, MachineConfig};

#[derive(Parser)]
#[command(name = "vm16")]
#[command(version)]
#[command(about = "A 16-bit software CPU with memory-mapped I/O")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to a .bin image or .asm source
        program: PathBuf,
        /// Load address (and initial PC)
        #[arg(long, default_value_t = 0)]
        load_addr: u16,
        /// Print each instruction to stderr as it executes
        #[arg(short, long)]
        trace: bool,
        /// Treat unknown opcodes as silent no-ops instead of faulting
        #[arg(long)]
        allow_invalid: bool,
        /// Print the final snapshot as JSON instead of the plain dump
        #[arg(long)]
        json: bool,
    },
    /// Assemble source to a binary image
    Asm {
        /// Path to the source file
        source: PathBuf,
        /// Output path (defaults to the source with a .bin extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Disassemble a binary image
    Disasm {
        /// Path to the image
        image: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            program,
            load_addr,
            trace,
            allow_invalid,
            json,
        } => run(&program, load_addr, trace, allow_invalid, json),
        Commands::Asm { source, output } => assemble_file(&source, output),
        Commands::Disasm { image } => disassemble_file(&image),
    }
}

/// Load a program image, assembling `.asm` sources on the fly.
fn load_image(path: &Path) -> Result<Vec<u8>> {
    if path.extension().is_some_and(|ext| ext == "asm") {
        let source =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(assemble(&source)?)
    } else {
        fs::read(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn run(path: &Path, load_addr: u16, trace: bool, allow_invalid: bool, json: bool) -> Result<()> {
    let image = load_image(path)?;
    if image.is_empty() {
        bail!("empty program image: {}", path.display());
    }

    let config = MachineConfig {
        invalid_opcode: if allow_invalid {
            InvalidOpcodePolicy::Ignore
        } else {
            InvalidOpcodePolicy::Fault
        },
        ..MachineConfig::default()
    };

    let mut cpu = Cpu::new(config);
    cpu.load_program(&image, load_addr);

    let snapshot = if trace {
        run_traced(&mut cpu)?
    } else {
        cpu.run()?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }

    Ok(())
}

fn run_traced(cpu: &mut Cpu) -> Result<HaltSnapshot> {
    loop {
        let pc = cpu.regs.pc;
        let opcode = cpu.mem.read8(pc);
        let op1 = cpu.mem.read16(pc.wrapping_add(1));
        let op2 = cpu.mem.read16(pc.wrapping_add(3));
        eprintln!("{pc:04x}: {}", disassemble_record(opcode, op1, op2));

        if cpu.step()? == CpuState::Halted {
            return Ok(cpu.snapshot());
        }
    }
}

fn print_snapshot(snapshot: &HaltSnapshot) {
    println!();
    println!("CPU halted after {} cycle(s).", snapshot.cycles);

    println!("---- Register Dump ----");
    for (i, value) in snapshot.registers.iter().enumerate() {
        println!("R{i}: {value} (0x{value:04x})");
    }
    println!("PC: {} (0x{:04x})", snapshot.pc, snapshot.pc);
    println!("SP: {} (0x{:04x})", snapshot.sp, snapshot.sp);
    println!(
        "ZF: {}  CF: {}",
        u8::from(snapshot.flags.zf),
        u8::from(snapshot.flags.cf)
    );

    println!();
    println!("--- Memory Dump ---");
    for (addr, byte) in snapshot.memory.iter().enumerate() {
        println!("0x{addr:04x}: 0x{byte:02x}");
    }
}

fn assemble_file(source: &Path, output: Option<PathBuf>) -> Result<()> {
    let text =
        fs::read_to_string(source).with_context(|| format!("reading {}", source.display()))?;
    let image = assemble(&text)?;

    let out_path = output.unwrap_or_else(|| source.with_extension("bin"));
    fs::write(&out_path, &image).with_context(|| format!("writing {}", out_path.display()))?;

    println!("Assembled {} byte(s) to {}", image.len(), out_path.display());
    Ok(())
}

fn disassemble_file(image: &Path) -> Result<()> {
    let bytes = fs::read(image).with_context(|| format!("reading {}", image.display()))?;
    print!("{}", disassemble(&bytes));
    Ok(())
}
