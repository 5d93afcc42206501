use std::env;
use std::path::PathBuf;

use serde::Serialize;
use tools::pano::{
    DEFAULT_STRIP_WIDTH, Padding, average_horizon, blend_seam, pad_to_equirectangular,
};

fn main() {
    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    match cmd.as_str() {
        "pad-pano" => cmd_pad_pano(args),
        _ => Err(usage()),
    }
}

#[derive(Serialize)]
struct PadReport {
    input: PathBuf,
    output: PathBuf,
    width: u32,
    original_height: u32,
    horizon_y: u32,
    strip_width: u32,
    #[serde(flatten)]
    padding: Padding,
}

fn cmd_pad_pano(args: Vec<String>) -> Result<(), String> {
    // atlas-tools pad-pano <in> <out> --horizon <y> [--horizon <y> ...] [--strip <px>]
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut horizons: Vec<f64> = Vec::new();
    let mut strip = DEFAULT_STRIP_WIDTH;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--horizon" => {
                i += 1;
                let v = args.get(i).ok_or("--horizon requires a value")?;
                horizons.push(v.parse().map_err(|_| format!("invalid --horizon: {v}"))?);
            }
            "--strip" => {
                i += 1;
                let v = args.get(i).ok_or("--strip requires a value")?;
                strip = v.parse().map_err(|_| format!("invalid --strip: {v}"))?;
            }
            s if s.starts_with('-') => {
                return Err(format!("unknown arg: {s}\n\n{}", usage()));
            }
            _ => paths.push(PathBuf::from(&args[i])),
        }
        i += 1;
    }

    let [input, output] = <[PathBuf; 2]>::try_from(paths).map_err(|_| usage())?;
    let horizon_y =
        average_horizon(&horizons).ok_or("pad-pano requires at least one --horizon")?;

    let mut img = image::open(&input)
        .map_err(|e| format!("read {input:?}: {e}"))?
        .to_rgb8();
    let (width, original_height) = img.dimensions();

    blend_seam(&mut img, strip).map_err(|e| e.to_string())?;
    let (padded, padding) = pad_to_equirectangular(&img, horizon_y).map_err(|e| e.to_string())?;
    padded
        .save(&output)
        .map_err(|e| format!("write {output:?}: {e}"))?;

    let report = PadReport {
        input,
        output,
        width,
        original_height,
        horizon_y,
        strip_width: strip,
        padding,
    };
    let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn usage() -> String {
    "usage:\n  atlas-tools pad-pano <input> <output> --horizon <y> [--horizon <y> ...] [--strip <px>]"
        .to_string()
}
