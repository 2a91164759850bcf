use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{Read, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "claimdec", version, about = "Inspect LBRY claim payloads offline")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Report which schema revision a payload is written in
    Sniff(InputArgs),
    /// Decode and normalize a payload to JSON
    Decode(DecodeCmd),
}

#[derive(Args)]
struct InputArgs {
    /// Payload file (or "-" for stdin)
    #[arg(value_name = "INPUT", default_value = "-")]
    input: String,
    /// Payload as hex instead of reading INPUT
    #[arg(long, conflicts_with = "input")]
    hex: Option<String>,
    /// INPUT holds UTF-8 text, one character per payload byte
    #[arg(long)]
    chars: bool,
}

#[derive(Args)]
struct DecodeCmd {
    #[command(flatten)]
    input: InputArgs,
    /// Output JSON file (or "-" for stdout)
    #[arg(short = 'o', long = "out", value_name = "OUT", default_value = "-")]
    out: String,
    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "claimdec=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Sniff(args) => cmd_sniff(args),
        Cmd::Decode(args) => cmd_decode(args),
    }
}

fn cmd_sniff(args: InputArgs) -> Result<()> {
    let bytes = load_payload(&args)?;
    let format = claim_core::sniff(&bytes).ok_or(claim_core::Error::UnrecognizedFormat {
        marker: bytes.first().copied(),
    })?;
    let mut out = serde_json::to_vec(&format)?;
    out.push(b'\n');
    write_all("-", &out)
}

fn cmd_decode(args: DecodeCmd) -> Result<()> {
    let bytes = load_payload(&args.input)?;
    let decoded = claim_core::decode(&bytes)?;
    if !decoded.diagnostics.is_clean() {
        tracing::warn!(
            revision = %decoded.format.revision,
            diagnostics = %decoded.diagnostics,
            "payload carried data outside the known layout"
        );
    }
    let json = serde_json::json!({
        "format": decoded.format,
        "claim": decoded.claim,
    });
    let mut out = if args.pretty {
        serde_json::to_vec_pretty(&json)?
    } else {
        serde_json::to_vec(&json)?
    };
    out.push(b'\n');
    write_all(&args.out, &out)
}

fn load_payload(args: &InputArgs) -> Result<Vec<u8>> {
    if let Some(h) = &args.hex {
        return hex::decode(h.trim()).context("--hex is not valid hex");
    }
    let raw = read_all(&args.input).with_context(|| format!("reading {}", args.input))?;
    if !args.chars {
        return Ok(raw);
    }
    let text = String::from_utf8(raw).context("--chars input is not UTF-8")?;
    Ok(claim_core::ByteSource::from_chars(&text)?.into_bytes())
}

fn read_all(path: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if path == "-" {
        std::io::stdin().read_to_end(&mut buf)?;
    } else {
        buf = std::fs::read(path)?;
    }
    Ok(buf)
}

fn write_all(path: &str, bytes: &[u8]) -> Result<()> {
    if path == "-" {
        let mut out = std::io::stdout().lock();
        out.write_all(bytes)?;
        out.flush()?;
    } else {
        std::fs::write(path, bytes)?;
    }
    Ok(())
}
