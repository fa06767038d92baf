use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Mean yearly temperature per station.
const STATIONS: &[(&str, f64)] = &[
    ("Abidjan", 26.0),
    ("Belgrade", 12.5),
    ("Bella Coola", 7.9),
    ("Bulawayo", 18.9),
    ("Dar es Salaam", 25.8),
    ("Hamburg", 9.7),
    ("Ho Chi Minh City", 27.4),
    ("Las Palmas de Gran Canaria", 21.2),
    ("Łódź", 8.0),
    ("Mexico City", 17.5),
    ("N'Djamena", 28.3),
    ("Oslo", 5.7),
    ("Palembang", 27.3),
    ("Petropavlovsk-Kamchatsky", 1.9),
    ("Reykjavík", 4.3),
    ("São Paulo", 19.7),
    ("Ségou", 28.0),
    ("Ürümqi", 7.4),
    ("Yellowknife", -4.3),
    ("Zürich", 9.3),
];

/// Malformed lines mixed in when `--invalid-ratio` is set.
const MALFORMED: &[&str] = &[
    "Belgrade;14.3;extra",
    "Hamburg 12.0",
    "Dar es Salaam;abc",
    "   ;14.3",
    "St. John's;5.0",
];

#[derive(Debug, Parser)]
#[command(name = "generate_measurements", about = "Write a synthetic Name;Value measurements file")]
struct Args {
    /// Number of lines to write (underscores allowed, e.g. 1_000_000).
    rows: String,
    #[arg(short, long, default_value = "measurements.txt")]
    output: PathBuf,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Fraction of lines replaced by malformed records.
    #[arg(long, default_value_t = 0.0)]
    invalid_ratio: f64,
}

struct Station {
    name: &'static str,
    distribution: Normal<f64>,
}

impl Station {
    fn new(name: &'static str, mean: f64) -> Result<Self> {
        let distribution = Normal::new(mean, 10.0)
            .with_context(|| format!("normal distribution for {name}"))?;
        Ok(Station { name, distribution })
    }

    fn sample(&self, rng: &mut impl Rng) -> f64 {
        self.distribution.sample(rng).clamp(-99.9, 99.9)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rows: u64 = args
        .rows
        .replace('_', "")
        .parse()
        .with_context(|| format!("invalid row count {:?}", args.rows))?;
    let invalid_ratio = args.invalid_ratio.clamp(0.0, 1.0);

    let stations = STATIONS
        .iter()
        .map(|&(name, mean)| Station::new(name, mean))
        .collect::<Result<Vec<_>>>()?;

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut out = BufWriter::new(file);
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut malformed = 0u64;

    for _ in 0..rows {
        if invalid_ratio > 0.0 && rng.gen_bool(invalid_ratio) {
            writeln!(out, "{}", MALFORMED[rng.gen_range(0..MALFORMED.len())])?;
            malformed += 1;
            continue;
        }
        let station = &stations[rng.gen_range(0..stations.len())];
        writeln!(out, "{};{:.1}", station.name, station.sample(&mut rng))?;
    }
    out.flush().context("flushing output")?;

    log::info!(
        "wrote {rows} lines ({malformed} malformed) to {}",
        args.output.display()
    );
    Ok(())
}
