use std::sync::Arc;

use clap::Parser;
use foundation::time::Time;
use gpu::HeadlessBackend;
use tracing_subscriber::EnvFilter;
use viewer::{HttpFetcher, Session, ViewerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless campus map session")]
struct Args {
    /// Map container size: WIDTHxHEIGHT
    #[arg(long, default_value = "1280x800")]
    size: String,

    /// Simulate a click at x,y (pixels from the top-left corner)
    #[arg(long)]
    click: Option<String>,

    /// Animation frames to render after the click
    #[arg(long, default_value_t = 3)]
    frames: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let map_size = parse_pair(&args.size, 'x')?;
    let map_size = [map_size[0] as u32, map_size[1] as u32];

    let config = ViewerConfig::from_env()?;
    let fetcher = HttpFetcher::new(config.load_timeout)?;
    let mut session = Session::new(config, Arc::new(fetcher), HeadlessBackend::new(), map_size)?;

    session.start(map_size)?;
    session.settle().await;

    for layer in session.controller().stack().layers() {
        let features = layer.source().features().map(|s| s.len()).unwrap_or(0);
        println!("{:<12} {:?} features={features}", layer.name(), layer.load_state());
    }

    let Some(click) = args.click else {
        return Ok(());
    };
    let pixel = parse_pair(&click, ',')?;
    session.click(pixel)?;
    session.settle().await;

    let handoff = session.handoff();
    match handoff.selection().feature() {
        Some(feature) => println!(
            "selected {} ({})",
            feature.key,
            feature.name().unwrap_or_else(|| "unnamed".to_string())
        ),
        None => println!("no feature at {}, {}", pixel[0], pixel[1]),
    }

    for i in 0..args.frames {
        session.tick(Time(f64::from(i) / 60.0));
    }
    let viewer = session.handoff().viewer();
    println!(
        "panorama {:?} url={} frames={}",
        viewer.state(),
        viewer.url().unwrap_or("-"),
        viewer.backend().frames().len()
    );

    session.dispose();
    Ok(())
}

fn parse_pair(value: &str, sep: char) -> Result<[f64; 2], String> {
    let (a, b) = value
        .split_once(sep)
        .ok_or_else(|| format!("expected two numbers separated by '{sep}', got {value:?}"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid number {s:?} in {value:?}"))
    };
    Ok([parse(a)?, parse(b)?])
}
