//! NES CLI - headless runner for the emulation core

use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::info;
use nes_core::cartridge::Cartridge;
use nes_core::config::{Config, Region};
use nes_core::system::NesSystem;

/// Run an iNES image for a number of frames without a display
#[derive(Parser, Debug)]
#[command(name = "nes-cli")]
#[command(about = "Headless NES core runner", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    #[arg(short, long)]
    rom: PathBuf,

    /// Number of frames to run
    #[arg(short, long, default_value = "60")]
    frames: u64,

    /// Video region: ntsc or pal
    #[arg(long, default_value = "ntsc")]
    region: Region,

    /// Skip the PPU warm-up frame after power-on
    #[arg(long)]
    no_warm_up: bool,

    /// Restore a snapshot before running
    #[arg(long)]
    load_state: Option<PathBuf>,

    /// Write a snapshot after running
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// Dump CPU state after execution
    #[arg(short = 'c', long)]
    dump_cpu: bool,

    /// Dump PPU state after execution
    #[arg(short = 'p', long)]
    dump_ppu: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn exit_with(context: &str, error: impl Display) -> ! {
    eprintln!("{}: {}", context, error);
    process::exit(1);
}

fn main() {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let rom = fs::read(&args.rom).unwrap_or_else(|e| exit_with("Failed to read ROM file", e));
    let cartridge = Cartridge::from_rom(&rom).unwrap_or_else(|e| exit_with("Failed to load cartridge", e));
    let header = *cartridge.header();
    println!("Loaded cartridge:");
    println!("  PRG ROM: {} bytes", cartridge.prg_rom().len());
    println!("  CHR ROM: {} bytes", cartridge.chr_rom().len());
    println!("  Mapper:  {}", cartridge.mapper_number());
    println!("  Mirroring: {:?}", header.mirroring());

    let config = Config {
        region: args.region,
        warm_up: !args.no_warm_up,
    };
    let mut system = NesSystem::with_config(config).unwrap_or_else(|e| exit_with("Failed to create system", e));
    system
        .insert_cartridge(cartridge)
        .unwrap_or_else(|e| exit_with("Failed to insert cartridge", e));

    if let Some(path) = &args.load_state {
        let data = fs::read(path).unwrap_or_else(|e| exit_with("Failed to read snapshot", e));
        system
            .load_state(&data)
            .unwrap_or_else(|e| exit_with("Failed to load snapshot", e));
        info!("restored {}", path.display());
    }

    println!("\nRunning {} frames ({:?})...", args.frames, system.config().region);
    system.run_frames(args.frames);
    println!("Completed {} frames.", system.frame_count());

    if let Some(path) = &args.save_state {
        fs::write(path, system.save_state()).unwrap_or_else(|e| exit_with("Failed to write snapshot", e));
        info!("saved {}", path.display());
    }

    if args.dump_cpu {
        dump_cpu_state(&system);
    }

    if args.dump_ppu {
        dump_ppu_state(&system);
    }
}

fn dump_cpu_state(system: &NesSystem) {
    let cpu = system.cpu();
    let regs = cpu.registers();

    println!("\nCPU State:");
    println!("  A:    ${:02X}", regs.a);
    println!("  X:    ${:02X}", regs.x);
    println!("  Y:    ${:02X}", regs.y);
    println!("  PC:   ${:04X}", regs.pc);
    println!("  SP:   ${:02X}", regs.sp);
    println!("  P:    ${:02X} ({})", cpu.status().bits(), cpu.status());
    println!("  Cycles into frame: {}", cpu.elapsed_cycles());
    if cpu.is_jammed() {
        println!("  JAMMED");
    }
}

fn dump_ppu_state(system: &NesSystem) {
    let ppu = system.ppu();

    println!("\nPPU State:");
    println!("  Phase:    {:?}", ppu.phase());
    println!("  Scanline: {}", ppu.scanline());
    println!("  Dot:      {}", ppu.dot());
    println!("  CTRL: ${:02X}  MASK: ${:02X}  STATUS: ${:02X}", ppu.ctrl().bits(), ppu.mask().bits(), ppu.status().bits());
    println!("  V: ${:04X}  T: ${:04X}  X: {}", ppu.vram_address(), ppu.temp_address(), ppu.fine_x());
    println!("  Frames rendered: {}", ppu.frame());
}
