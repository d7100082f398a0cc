//! Command-line tool for network images.
//!
//! Examples:
//!   selnet-cli new net.img 8
//!   selnet-cli --config cfg.json new net.img
//!   selnet-cli info net.img
//!   selnet-cli run net.img 200
//!   selnet-cli export net.img net.json
//!   selnet-cli import net.json net.img
//!
//! `--config` takes a JSON `NetworkConfig`; missing fields use defaults.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::process;

use selnet::prelude::*;

fn usage() -> ! {
    eprintln!("selnet-cli (inspect and drive network images)");
    eprintln!("Usage: selnet-cli [--config cfg.json] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  new <image> [width]         Build the conditioning preset and save it");
    eprintln!("  info <image>                Show diagnostics and named node levels");
    eprintln!("  run <image> <ticks>         Run conditioning ticks and save the result");
    eprintln!("  export <image> <json>       Write the snapshot as JSON");
    eprintln!("  import <json> <image>       Rebuild an image from a JSON snapshot");
    process::exit(1);
}

fn parse_args() -> (Option<String>, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = None;
    if args.len() >= 2 && args[0] == "--config" {
        config = Some(args[1].clone());
        args.drain(0..2);
    }
    if args.is_empty() {
        usage();
    }
    (config, args)
}

fn parse_count(s: &str) -> usize {
    s.parse().unwrap_or_else(|_| {
        eprintln!("expected a number, got {s:?}");
        usage()
    })
}

fn load(path: &str) -> NetworkResult<Network> {
    let file = fs::File::open(path)?;
    Network::load_image_from(&mut BufReader::new(file))
}

fn save(net: &Network, path: &str) -> NetworkResult<()> {
    let mut w = BufWriter::new(fs::File::create(path)?);
    net.save_image_to(&mut w)?;
    w.flush()?;
    Ok(())
}

fn cmd_new(config: NetworkConfig, args: &[String]) -> NetworkResult<()> {
    let Some(path) = args.first() else { usage() };
    let width = args.get(1).map_or(8, |s| parse_count(s));
    let preset = conditioning(config, width)?;
    save(&preset.network, path)?;
    println!(
        "wrote {path}: {} nodes, {} synapses, {} bytes",
        preset.network.node_count(),
        preset.network.synapse_count(),
        preset.network.image_size_bytes()?
    );
    Ok(())
}

fn cmd_info(args: &[String]) -> NetworkResult<()> {
    let Some(path) = args.first() else { usage() };
    let net = load(path)?;
    let view = NetworkObserver::new(&net).view();
    let d = &view.diagnostics;

    println!("image:      {path} ({} bytes)", net.image_size_bytes()?);
    println!("tick:       {}", view.tick);
    println!("schedule:   {:?}", net.config().schedule);
    println!(
        "nodes:      {} ({} sensors, {} effectors)",
        d.node_count, d.sensor_count, d.effector_count
    );
    println!("synapses:   {}", d.synapse_count);
    println!("depth:      {}  width: {}", d.max_layer_depth, d.max_node_width);
    println!("avg level:  {:.4}", d.avg_activation);
    println!("\nregions:");
    for r in &view.regions {
        println!(
            "  {:<20} nodes={:<4} mean={:.4}",
            format!("{:?}", r.kind),
            r.nodes,
            r.mean_activation
        );
    }
    println!("\nnamed nodes:");
    for (name, level) in &view.named_levels {
        println!("  {name:<12} {level:.4}");
    }
    Ok(())
}

fn cmd_run(args: &[String]) -> NetworkResult<()> {
    let (Some(path), Some(ticks)) = (args.first(), args.get(1)) else {
        usage()
    };
    let ticks = parse_count(ticks);
    let net = load(path)?;
    if net.sensors().len() != 2 {
        eprintln!("run expects a two-sensor (cs, us) conditioning image");
        process::exit(1);
    }

    let mut driver = Driver::new(net, StagedUpdater);
    let ctx = RunContext::new("cli");
    let mut fired = 0usize;
    for t in 0..ticks {
        // CS every tick, US on every fifth.
        let us = if t % 5 == 4 { 1.0 } else { 0.0 };
        let report = driver.tick(&ctx, &[1.0, us])?;
        fired += report.fired().count();
        if t % 50 == 0 || t + 1 == ticks {
            println!(
                "tick={:<6} da={:+.4} hip={:+.4} fired_total={fired}",
                report.tick, report.signals.dopaminergic, report.signals.hippocampal
            );
        }
    }

    save(driver.network(), path)?;
    println!("saved {path}");
    Ok(())
}

fn cmd_export(args: &[String]) -> NetworkResult<()> {
    let (Some(image), Some(json)) = (args.first(), args.get(1)) else {
        usage()
    };
    let snapshot = load(image)?.snapshot()?;
    fs::write(json, snapshot.to_json()?)?;
    println!("wrote {json}");
    Ok(())
}

fn cmd_import(args: &[String]) -> NetworkResult<()> {
    let (Some(json), Some(image)) = (args.first(), args.get(1)) else {
        usage()
    };
    let snapshot = NetworkSnapshot::from_json(&fs::read_to_string(json)?)?;
    let net = Network::from_snapshot(snapshot)?;
    save(&net, image)?;
    println!("wrote {image}");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();

    let (config_path, args) = parse_args();
    let config = match config_path.as_deref().map(Path::new) {
        Some(p) => match NetworkConfig::load_json(p) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("config error: {e}");
                process::exit(1);
            }
        },
        None => NetworkConfig::default(),
    };

    let cmd = args[0].as_str();
    let rest = &args[1..];
    let result = match cmd {
        "new" => cmd_new(config, rest),
        "info" => cmd_info(rest),
        "run" => cmd_run(rest),
        "export" => cmd_export(rest),
        "import" => cmd_import(rest),
        _ => usage(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
