use anyhow::Context;
use pathgate::{config::Config, logging, Sanitizer};
use std::io::Read;
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path = PathBuf::from("pathgate.toml");
    let mut input_path: Option<PathBuf> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                if i >= args.len() { eprintln!("--config requires a path"); std::process::exit(2); }
                config_path = PathBuf::from(&args[i]);
            }
            "--input" => {
                i += 1;
                if i >= args.len() { eprintln!("--input requires a path"); std::process::exit(2); }
                input_path = Some(PathBuf::from(&args[i]));
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
        i += 1;
    }

    let cfg = Config::load(&config_path).context("loading config")?;
    cfg.validate().context("validating config")?;
    let sanitizer = Sanitizer::new(&cfg.to_options()).context("preparing sanitizer")?;

    let raw = match &input_path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };
    let document: serde_json::Value = serde_json::from_str(&raw).context("parsing input document")?;

    info!(base = %sanitizer.base().canonical().display(), "pathgate ready");
    let report = sanitizer.sanitize(&document).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.ok {
        std::process::exit(1);
    }
    Ok(())
}
