use selnet::prelude::*;

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let result = match args.get(1).map(String::as_str) {
        None => run_conditioning_demo(Schedule::SequentialRandomized),
        Some("--help" | "-h" | "help") => {
            print_help();
            return;
        }
        Some("batch") => run_conditioning_demo(Schedule::ParallelBatch { workers: 0 }),
        Some("extinction") => run_extinction_demo(),
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_help();
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_help() {
    println!("selnet (selectionist conditioning network)");
    println!("usage:");
    println!("  cargo run                 acquisition demo, sequential schedule");
    println!("  cargo run -- batch        acquisition demo, parallel batch schedule");
    println!("  cargo run -- extinction   acquisition followed by extinction");
    println!("  cargo run -- --help");
}

/// One trial: a few ticks of CS alone (the probe), then CS paired with US.
/// Returns the response strength on the last probe tick.
fn trial(driver: &mut Driver<StagedUpdater>, ctx: &RunContext, reward: bool) -> NetworkResult<f32> {
    driver.network_mut().reset_activations()?;
    let mut probe = 0.0;
    for _ in 0..3 {
        let report = driver.tick(ctx, &[1.0, 0.0])?;
        probe = report.actions.first().map_or(0.0, |(_, a)| a.strength);
    }
    let us = if reward { 1.0 } else { 0.0 };
    for _ in 0..2 {
        driver.tick(ctx, &[1.0, us])?;
    }
    Ok(probe)
}

fn build_driver(schedule: Schedule) -> NetworkResult<(Driver<StagedUpdater>, NodeId)> {
    let cfg = NetworkConfig::default()
        .with_seed(7)
        .with_schedule(schedule)
        .with_learning_rate(0.4);
    let preset = conditioning(cfg, 6)?;
    let response = preset.response;
    Ok((Driver::new(preset.network, StagedUpdater), response))
}

fn print_row(label: &str, t: usize, probe: f32, driver: &Driver<StagedUpdater>, response: NodeId) {
    let obs = NetworkObserver::new(driver.network());
    let view = obs.view();
    let inputs: f32 = obs
        .strongest_inputs(response, usize::MAX)
        .iter()
        .map(|(_, w)| w)
        .sum();
    println!(
        "{label:<11} trial={t:3} probe={probe:.3} response_in={inputs:.3} synapses={} avg_act={:.3} tick={}",
        view.diagnostics.synapse_count, view.diagnostics.avg_activation, view.tick
    );
}

fn run_conditioning_demo(schedule: Schedule) -> NetworkResult<()> {
    let (mut driver, response) = build_driver(schedule)?;
    let ctx = RunContext::new("acquisition");

    for t in 0..40 {
        let probe = trial(&mut driver, &ctx, true)?;
        if t % 5 == 0 || t == 39 {
            print_row("acquisition", t, probe, &driver, response);
        }
    }
    Ok(())
}

fn run_extinction_demo() -> NetworkResult<()> {
    let (mut driver, response) = build_driver(Schedule::SequentialRandomized)?;

    let ctx = RunContext::new("acquisition");
    for t in 0..30 {
        let probe = trial(&mut driver, &ctx, true)?;
        if t % 10 == 0 || t == 29 {
            print_row("acquisition", t, probe, &driver, response);
        }
    }

    let ctx = RunContext::new("extinction");
    for t in 0..30 {
        let probe = trial(&mut driver, &ctx, false)?;
        if t % 10 == 0 || t == 29 {
            print_row("extinction", t, probe, &driver, response);
        }
    }
    Ok(())
}
