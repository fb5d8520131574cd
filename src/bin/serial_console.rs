//! Minimal serial console.
//!
//! Opens a port, prints everything received and sends each line typed on
//! stdin. End input (Ctrl-D) to close the port and exit.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=asyncserial=debug cargo run --features cli --bin serial_console -- \
//!     --port /dev/ttyUSB0 --baud 115200
//! cargo run --features cli --bin serial_console -- --list
//! cargo run --features cli --bin serial_console -- --profile-dir ~/.serial --profile GPS
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use asyncserial::{
    available_ports, ParameterCatalog, PortConfig, PortHandle, PortProfile, ProfileStore,
};

#[derive(Parser)]
#[command(name = "serial-console")]
#[command(about = "Send stdin lines to a serial port and print what comes back")]
struct Args {
    /// List serial ports on this machine and exit
    #[arg(long)]
    list: bool,

    /// Print the conventional parameter values and exit
    #[arg(long)]
    catalog: bool,

    /// Device name, e.g. COM5 or /dev/ttyUSB0
    #[arg(short, long)]
    port: Option<String>,

    #[arg(short, long, default_value = "9600")]
    baud: u32,

    /// none, odd, even, mark or space
    #[arg(long, default_value = "none")]
    parity: String,

    #[arg(long, default_value = "8")]
    data_bits: u8,

    /// none, one, onepointfive or two
    #[arg(long, default_value = "one")]
    stop_bits: String,

    /// Reject unknown parity/stop-bit names instead of falling back
    #[arg(long)]
    strict: bool,

    /// Directory holding saved profiles
    #[arg(long)]
    profile_dir: Option<PathBuf>,

    /// Load settings from this profile (requires --profile-dir)
    #[arg(long)]
    profile: Option<String>,

    /// Save the command-line settings under this name (requires --profile-dir)
    #[arg(long)]
    save_profile: Option<String>,

    /// Line ending appended to every line sent
    #[arg(long, default_value = "\r\n")]
    line_ending: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.list {
        for port in available_ports()? {
            println!("{:<24} {}", port.name, port.port_type);
        }
        return Ok(());
    }

    if args.catalog {
        println!("baud rates: {}", ParameterCatalog::baud_rates().join(", "));
        println!("data bits:  {}", ParameterCatalog::data_bits().join(", "));
        println!("parity:     {}", ParameterCatalog::parity_bits().join(", "));
        println!("stop bits:  {}", ParameterCatalog::stop_bits().join(", "));
        return Ok(());
    }

    let store = args.profile_dir.as_ref().map(|dir| ProfileStore::new(dir.clone()));
    let config = resolve_config(args, store.as_ref())?;

    if let Some(name) = &args.save_profile {
        let store = store.as_ref().ok_or("--save-profile needs --profile-dir")?;
        let path = store.save(&PortProfile::new(name.clone(), config.clone()))?;
        println!("Saved profile to {}", path.display());
    }

    let mut port = PortHandle::new(config)?;
    port.on_packet(|packet| {
        let mut out = io::stdout().lock();
        let _ = out.write_all(packet.bytes());
        let _ = out.flush();
    });
    port.open()?;
    eprintln!("Connected to {}. Ctrl-D to quit.", port.config());

    for line in io::stdin().lock().lines() {
        let line = line?;
        let payload = format!("{line}{}", args.line_ending);
        if let Err(e) = port.send_text(&payload) {
            eprintln!("Send failed: {e}");
            if !port.is_open() {
                break;
            }
        }
    }

    port.close();
    Ok(())
}

fn resolve_config(
    args: &Args,
    store: Option<&ProfileStore>,
) -> Result<PortConfig, Box<dyn std::error::Error>> {
    if let Some(name) = &args.profile {
        let store = store.ok_or("--profile needs --profile-dir")?;
        return Ok(store.load(name)?.config);
    }

    let port = args.port.clone().ok_or("--port is required")?;
    let config = if args.strict {
        PortConfig::parse_strict(port, args.baud, &args.parity, args.data_bits, &args.stop_bits)?
    } else {
        PortConfig::from_names(port, args.baud, &args.parity, args.data_bits, &args.stop_bits)
    };
    Ok(config)
}
