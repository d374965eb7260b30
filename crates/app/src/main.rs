// Copyright 2025-2026 CEMAXECUTER LLC

mod args;
mod keys;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use args::NotchFilter;
use duo_engine::transfer::SampleFormat;
use duo_engine::{EngineConfig, MessageSink, Transfer, TransferSink};
use duo_output::wav::{WavCapture, WavSpec};
use duo_output::UdpSink;
use keys::QuitHook;

#[derive(Parser, Debug)]
#[command(name = "duo")]
#[command(about = "RSPduo dual tuner streaming engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream merged transfers as UDP datagrams, one per packet
    Udp(UdpArgs),
    /// Capture the merged stream to a WAV file
    Wav(WavArgs),
}

#[derive(Args, Debug)]
struct TuneArgs {
    /// Tuner RF frequency in Hz; k, M, or G suffix accepted (e.g. 1.42G)
    #[arg(value_parser = args::parse_frequency)]
    freq: f64,

    /// AGC set point in dBFS [-72-0]
    #[arg(short = 't', long, default_value = "-30", allow_negative_numbers = true,
          value_parser = args::parse_agc_set_point)]
    agc_set_point: i32,

    /// LNA state [0-9], 0 gives the least RF gain reduction
    #[arg(short = 'l', long, default_value = "4", value_parser = args::parse_lna_state)]
    lna_state: u32,

    /// Decimation factor [1,2,4,8,16,32]
    #[arg(short = 'd', long = "decim", default_value = "1",
          value_parser = args::parse_decim_factor)]
    decim_factor: u32,

    /// Enable the mwfm or dab notch filter; repeat for both
    #[arg(short = 'n', long = "notch", value_parser = args::parse_notch)]
    notch: Vec<NotchFilter>,

    /// Convert samples to floating point
    #[arg(short = 'f', long = "float")]
    floating_point: bool,

    /// Use USB bulk transfer mode instead of isochronous
    #[arg(short = 'k', long = "bulk")]
    usb_bulk_mode: bool,

    /// Use the maximum 8 MHz ADC master sample rate (12-bit resolution,
    /// 1.536 MHz analog bandwidth only)
    #[arg(short = 'x', long = "max-fs")]
    max_sample_rate: bool,

    /// Enable sdrplay_api debug logging
    #[arg(long)]
    api_debug: bool,
}

#[derive(Args, Debug)]
struct UdpArgs {
    #[command(flatten)]
    tune: TuneArgs,

    /// Destination IPv4 address and UDP port
    #[arg(default_value = "127.0.0.1:1234")]
    dest: SocketAddr,

    /// AGC loop bandwidth in Hz [0,5,50,100], 0 disables AGC
    #[arg(short = 'a', long, default_value = "0", value_parser = args::parse_agc_bandwidth)]
    agc_bandwidth: u32,

    /// Packet MTU in bytes; the transfer size is the MTU less 28 bytes
    /// of IP/UDP headers
    #[arg(short = 'm', long, default_value = "1500")]
    mtu: usize,
}

#[derive(Args, Debug)]
struct WavArgs {
    #[command(flatten)]
    tune: TuneArgs,

    /// Maximum output file size in bytes; K, M, or G suffix accepted
    /// for KiB, MiB, or GiB (e.g. 10M)
    #[arg(value_parser = args::parse_size)]
    bytes: u64,

    /// Destination file path
    #[arg(default_value = "duo.wav")]
    path: PathBuf,

    /// AGC loop bandwidth in Hz [0,5,50,100], 0 disables AGC
    #[arg(short = 'a', long, default_value = "5", value_parser = args::parse_agc_bandwidth)]
    agc_bandwidth: u32,

    /// Maximum transfer size in bytes
    #[arg(short = 'm', long, default_value = "10240")]
    max_transfer_size: usize,

    /// Seconds of streaming to discard while the radio stabilizes
    #[arg(short = 'w', long, default_value = "2")]
    warmup: u64,

    /// Omit the WAV header; samples start at the beginning of the file
    #[arg(short = 'o', long)]
    omit_header: bool,
}

/// Prints engine diagnostics to stdout, like sync faults and rejected
/// control values.
struct StdoutMessages;

impl MessageSink for StdoutMessages {
    fn on_message(&mut self, msg: &str) {
        println!("{}", msg);
    }
}

/// Lets the WAV capture stay reachable after the engine takes the sink
/// by value, so the header can be finalized once streaming stops.
struct SharedCapture(Arc<Mutex<WavCapture>>);

impl TransferSink for SharedCapture {
    fn on_transfer(&mut self, transfer: &Transfer<'_>) {
        if let Ok(mut capture) = self.0.lock() {
            capture.on_transfer(transfer);
        }
    }
}

fn engine_config(tune: &TuneArgs, agc_bandwidth: u32, max_transfer_size: usize) -> EngineConfig {
    EngineConfig {
        tune_freq: tune.freq,
        agc_bandwidth,
        agc_set_point: tune.agc_set_point,
        lna_state: tune.lna_state,
        decim_factor: tune.decim_factor,
        notch_mwfm: tune.notch.contains(&NotchFilter::Mwfm),
        notch_dab: tune.notch.contains(&NotchFilter::Dab),
        max_sample_rate: tune.max_sample_rate,
        usb_bulk_mode: tune.usb_bulk_mode,
        api_debug: tune.api_debug,
        format: if tune.floating_point {
            SampleFormat::Float
        } else {
            SampleFormat::Short
        },
        max_transfer_size,
    }
}

fn log_config(config: &EngineConfig) {
    log::info!("RF tune frequency: {} Hz", config.tune_freq);
    log::info!("AGC loop bandwidth: {} Hz", config.agc_bandwidth);
    if config.agc_bandwidth > 0 {
        log::info!("AGC set point: {} dBFS", config.agc_set_point);
    }
    log::info!("LNA state: {}", config.lna_state);
    log::info!("decimation factor: {}", config.decim_factor);
    log::info!("output sample rate: {} Hz", config.sample_rate());
    log::info!("max transfer size: {} bytes", config.max_transfer_size);
    log::info!("floating point: {}", config.format.is_float());
    log::info!("USB bulk mode: {}", config.usb_bulk_mode);
    log::info!("max Fs mode: {}", config.max_sample_rate);
}

fn run_udp(args: UdpArgs) -> Result<(), String> {
    let max_transfer_size = duo_output::max_transfer_for_mtu(args.mtu)?;
    let config = engine_config(&args.tune, args.agc_bandwidth, max_transfer_size);
    config.validate()?;
    log::info!("destination: {}", args.dest);
    log::info!("packet MTU: {} bytes", args.mtu);
    log_config(&config);

    let sink = UdpSink::new(args.dest)?;
    let hook = QuitHook::new(keys::spawn_key_watcher(), None);

    println!("PRESS q then ENTER to QUIT");
    duo_sdrplay::run(
        &config,
        Box::new(sink),
        Some(Box::new(hook)),
        Some(Box::new(StdoutMessages)),
    )
}

fn run_wav(args: WavArgs) -> Result<(), String> {
    if !args.omit_header && args.bytes > u32::MAX as u64 {
        return Err("WAV files cannot exceed 4 GiB".to_string());
    }
    let config = engine_config(&args.tune, args.agc_bandwidth, args.max_transfer_size);
    config.validate()?;
    log::info!("output file: {}", args.path.display());
    log::info!("maximum bytes: {}", args.bytes);
    log::info!("warmup: {} seconds", args.warmup);
    log::info!("omit WAV header: {}", args.omit_header);
    log_config(&config);

    let done = Arc::new(AtomicBool::new(false));
    let spec = if args.omit_header {
        None
    } else {
        Some(WavSpec::duo(config.sample_rate(), config.format))
    };
    let capture = WavCapture::create(
        &args.path,
        spec,
        args.bytes,
        Duration::from_secs(args.warmup),
        done.clone(),
    )?;
    let capture = Arc::new(Mutex::new(capture));
    let hook = QuitHook::new(keys::spawn_key_watcher(), Some(done));

    println!("PRESS q then ENTER to QUIT");
    let result = duo_sdrplay::run(
        &config,
        Box::new(SharedCapture(capture.clone())),
        Some(Box::new(hook)),
        Some(Box::new(StdoutMessages)),
    );

    let finish = capture
        .lock()
        .map_err(|_| "capture state poisoned".to_string())
        .and_then(|mut capture| {
            let r = capture.finish();
            log::info!("captured {} bytes", capture.bytes_written());
            r
        });

    result.and(finish)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Udp(args) => run_udp(args),
        Command::Wav(args) => run_wav(args),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
