use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use reachprep::{io::StWriter, DatasetConfig, PrimateReaching, SpikeVelocity};

#[derive(Parser)]
#[command(name = "reachprep", about = "Segment, split and window a primate reaching recording")]
struct Args {
    /// Dataset configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Optional batch.safetensors output with every segment and split
    #[arg(long)]
    output: Option<PathBuf>,

    /// Ignore the preprocessed-series cache
    #[arg(long)]
    regenerate: bool,

    /// Seed for the k-fold shuffle (overrides hyperparams.seed)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    let mut cfg: DatasetConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", args.config.display()))?;
    cfg.regenerate |= args.regenerate;
    if args.seed.is_some() {
        cfg.hyperparams.seed = args.seed;
    }

    let ds = PrimateReaching::build(&cfg, &SpikeVelocity)?;
    let report = ds.report();
    println!("{}: {} boundaries → {} segments → {} after length filter → {} retained",
        cfg.filename, report.boundaries, report.segments_detected,
        report.segments_after_length_filter, report.segments_after_delay);
    println!("Input features: {}  layout: {}  cache hit: {}",
        ds.input_feature_size(), cfg.mode, report.cache_hit);
    for (k, f) in ds.splits().iter().enumerate() {
        println!("  split {k}: train={} val={} test={}", f.train.len(), f.val.len(), f.test.len());
    }

    if let Some(out) = &args.output {
        let mut w = StWriter::new();
        for i in 0..ds.segment_count() {
            if let Some(ws) = ds.windowed(i) {
                w.add_array(&format!("samples_{i}"), &ws.samples.view().into_dyn());
                w.add_array(&format!("labels_{i}"), &ws.labels.view().into_dyn());
            } else if let Some((x, y)) = ds.flat(i) {
                w.add_array(&format!("samples_{i}"), &x.view().into_dyn());
                w.add_array(&format!("labels_{i}"), &y.view().into_dyn());
            }
        }
        for (k, f) in ds.splits().iter().enumerate() {
            for (name, idx) in [("train", &f.train), ("val", &f.val), ("test", &f.test)] {
                let v: Vec<i32> = idx.iter().map(|&i| i as i32).collect();
                w.add(&format!("{name}_{k}"), &v, &[v.len()]);
            }
        }
        w.add("n_segments", &[ds.segment_count() as i32], &[1]);
        w.write(out)?;
        println!("Written → {}", out.display());
    }

    Ok(())
}
