use anyhow::{Context, Result};
use clap::Parser;
use famicom_cpu::logging::{LogCategory, LogConfig, LogLevel};
use famicom_cpu::{
    Cpu6502, CpuConfig, FlatMemory, FrameScheduler, InterruptController, InterruptKind,
    ScanlineSync,
};
use serde_json::json;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

/// Scanlines per NTSC frame
const SCANLINES_PER_FRAME: u32 = 262;
/// First vertical-blank scanline; NMI is raised here
const VBLANK_LINE: u32 = 241;

#[derive(Parser)]
#[command(about = "Run a raw 6502 image against flat memory, frame by frame")]
struct Args {
    /// Raw binary image to load
    image: PathBuf,

    /// Address the image is loaded at (hex, e.g. 8000 or 0x8000)
    #[arg(long, default_value = "8000", value_parser = parse_hex_u16)]
    load_addr: u16,

    /// Number of frames to run
    #[arg(long, default_value_t = 5)]
    frames: u32,

    /// JSON CPU configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Global core log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "off")]
    log_level: String,

    /// Core log level for the CPU category
    #[arg(long)]
    log_cpu: Option<String>,

    /// Core log level for the interrupts category
    #[arg(long)]
    log_interrupts: Option<String>,

    /// Write core logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print execution statistics as JSON at the end
    #[arg(long, default_value_t = false)]
    stats: bool,

    /// Dump final CPU state to this file as JSON
    #[arg(long)]
    save: Option<PathBuf>,
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches('$');
    u16::from_str_radix(digits, 16).map_err(|e| format!("bad address {:?}: {}", s, e))
}

fn parse_level(s: &str) -> Result<LogLevel> {
    LogLevel::from_str(s).with_context(|| format!("unknown log level {:?}", s))
}

fn configure_logging(args: &Args) -> Result<()> {
    let config = LogConfig::global();
    config.set_global_level(parse_level(&args.log_level)?);
    if let Some(level) = &args.log_cpu {
        config.set_level(LogCategory::Cpu, parse_level(level)?);
    }
    if let Some(level) = &args.log_interrupts {
        config.set_level(LogCategory::Interrupts, parse_level(level)?);
    }
    if let Some(path) = &args.log_file {
        config
            .set_log_file(path.clone())
            .with_context(|| format!("opening log file {}", path.display()))?;
    }
    Ok(())
}

/// Stand-in for the video chip: counts scanlines and raises NMI at vblank
struct ScanlineCounter {
    line: u32,
}

impl ScanlineSync for ScanlineCounter {
    fn step_scanline(&mut self, interrupts: &mut InterruptController) -> bool {
        self.line = (self.line + 1) % SCANLINES_PER_FRAME;
        if self.line == VBLANK_LINE {
            interrupts.request(InterruptKind::Nmi);
        }
        self.line == 0
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    configure_logging(&args)?;

    let config = match &args.config {
        Some(path) => CpuConfig::load(path)?,
        None => CpuConfig::default(),
    };

    let image = fs::read(&args.image)
        .with_context(|| format!("reading image {}", args.image.display()))?;
    if image.len() > 0x10000 - args.load_addr as usize {
        log::warn!(
            "image is {} bytes; truncated at $FFFF when loaded at ${:04X}",
            image.len(),
            args.load_addr
        );
    }

    let mut mem = FlatMemory::new();
    mem.load(args.load_addr, &image);
    if mem.peek(0xFFFC) == 0 && mem.peek(0xFFFD) == 0 {
        log::info!("no reset vector in image, starting at ${:04X}", args.load_addr);
        mem.set_vector(famicom_cpu::bus::RESET_VECTOR, args.load_addr);
    }

    let mut cpu = Cpu6502::new(config);
    cpu.reset(&mut mem);
    let mut sched = FrameScheduler::new();
    let mut video = ScanlineCounter { line: 0 };

    for fnum in 1..=args.frames {
        let report = sched
            .run_frame(&mut cpu, &mut mem, &mut video)
            .with_context(|| format!("frame {}", fnum))?;
        log::info!(
            "frame {}: {} instructions, {} cycles",
            fnum,
            report.instructions,
            report.cycles
        );
    }

    let r = cpu.registers();
    println!(
        "PC=${:04X} A=${:02X} X=${:02X} Y=${:02X} SP=${:02X} P={:?} cycles={}",
        r.pc,
        r.a,
        r.x,
        r.y,
        r.sp,
        r.p,
        cpu.total_cycles()
    );

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&cpu.stats().to_json())?);
    }

    if let Some(path) = &args.save {
        let state = json!({
            "pc": r.pc,
            "a": r.a,
            "x": r.x,
            "y": r.y,
            "sp": r.sp,
            "p": r.p.bits(),
            "cycles": cpu.total_cycles(),
            "frames": sched.frames(),
            "residual_cycles": sched.residual(),
        });
        let mut f = File::create(path)?;
        write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
    }

    Ok(())
}
