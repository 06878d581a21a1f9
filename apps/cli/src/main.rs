// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BuildGen command-line tool
//!
//! Usage:
//!   buildgen footprints <file.geojson> --catalog <catalog.json> [options]
//!   buildgen random <count> --radius <R> --catalog <catalog.json> [options]

mod config;

use std::fs;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use buildgen_core::{
    feature_table, footprints_from_geojson, generate_from_footprints, generate_random,
    process_footprints, Catalog, Distribution, GenerationConfig, Generation, MatchMode,
    PresenceSpec, SelectionCriterion, SortOrder, ValueSpec, ValuesTable,
};
use buildgen_geometry::{projection_from_target, Point2D};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use config::Config;

enum Command {
    Footprints { input: String },
    Random { count: usize },
}

/// Parsed command line, flags not given stay `None`
#[derive(Default)]
struct Options {
    catalog: Option<String>,
    values: Option<String>,
    config: Option<String>,
    output: Option<String>,
    stats: Option<String>,
    projection: Option<String>,
    criterion: Option<SelectionCriterion>,
    count: Option<usize>,
    distribution: Option<Distribution>,
    mode: Option<MatchMode>,
    extra_floors: Option<f64>,
    floor_height: Option<f64>,
    sort: Option<SortOrder>,
    value: Option<ValueSpec>,
    presence: Option<PresenceSpec>,
    auto_select: bool,
    seed: Option<u64>,
    filter: Option<String>,
    radius: Option<f64>,
    center: Option<Point2D>,
}

fn print_usage() {
    eprintln!("BuildGen - objective feature generator");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  buildgen footprints <file.geojson> --catalog <catalog.json> [options]");
    eprintln!("  buildgen random <count> --radius <R> --catalog <catalog.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --catalog <path>          Catalog JSON (required)");
    eprintln!("  --values <path>           Values table JSON");
    eprintln!("  --config <path>           Generation settings JSON");
    eprintln!("  --output <path>           Objective file (default: $BUILDGEN_OUTPUT or objective.txt)");
    eprintln!("  --stats <path>            Write run statistics as JSON");
    eprintln!("  --filter <query>          Catalog query, e.g. \"hangar, 12\" (default: All)");
    eprintln!("  --projection <target>     eqc:<lon>,<lat> or map:<e>,<n>,<rot>,<scale>");
    eprintln!("  --criterion <name>        Height | Area | Total Size | Centerness | Mix | Random");
    eprintln!("  --count <n>               Structures to select (max 256)");
    eprintln!("  --mode <2d|3d>            Match on footprint only or include height");
    eprintln!("  --extra-floors <n>        Mean extra floors in 3d mode");
    eprintln!("  --floor-height <m>        Default floor height in meters");
    eprintln!("  --auto-select             Narrow the catalog from footprint tags");
    eprintln!("  --radius <R>              Placement radius (random)");
    eprintln!("  --distribution <name>     Normal | Peripheral | Uniform (random)");
    eprintln!("  --center <x>,<y>          Objective location for random layouts");
    eprintln!("  --sort <None|Alphabet|Value>");
    eprintln!("  --value <v>               Fixed value field");
    eprintln!("  --value-range <lo>,<hi>   Random value field");
    eprintln!("  --presence <p>            Fixed presence (default 100)");
    eprintln!("  --presence-range <lo>,<hi>");
    eprintln!("  --seed <n>                Random seed (default: $BUILDGEN_SEED or time)");
    eprintln!();
    eprintln!("Logging is controlled with RUST_LOG.");
}

fn parse<T>(flag: &str, text: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    text.parse::<T>()
        .map_err(|e| anyhow!("invalid value '{text}' for {flag}: {e}"))
}

fn parse_pair(flag: &str, text: &str) -> Result<(f64, f64)> {
    let (a, b) = text
        .split_once(',')
        .ok_or_else(|| anyhow!("{flag} expects two comma separated numbers, got '{text}'"))?;
    Ok((parse(flag, a.trim())?, parse(flag, b.trim())?))
}

fn parse_args(args: &[String]) -> Result<(Command, Options)> {
    let command = match (args.get(1).map(String::as_str), args.get(2)) {
        (Some("footprints"), Some(input)) => Command::Footprints { input: input.clone() },
        (Some("random"), Some(count)) => Command::Random {
            count: parse("count", count)?,
        },
        _ => bail!("expected a subcommand and its argument"),
    };

    let mut opts = Options::default();
    let mut i = 3;
    while i < args.len() {
        let flag = args[i].as_str();
        if flag == "--auto-select" {
            opts.auto_select = true;
            i += 1;
            continue;
        }
        let value = args
            .get(i + 1)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("missing value for {flag}"))?;
        match flag {
            "--catalog" => opts.catalog = Some(value.to_string()),
            "--values" => opts.values = Some(value.to_string()),
            "--config" => opts.config = Some(value.to_string()),
            "--output" => opts.output = Some(value.to_string()),
            "--stats" => opts.stats = Some(value.to_string()),
            "--filter" => opts.filter = Some(value.to_string()),
            "--projection" => opts.projection = Some(value.to_string()),
            "--criterion" => opts.criterion = Some(parse(flag, value)?),
            "--count" => opts.count = Some(parse(flag, value)?),
            "--mode" => opts.mode = Some(parse(flag, value)?),
            "--extra-floors" => opts.extra_floors = Some(parse(flag, value)?),
            "--floor-height" => opts.floor_height = Some(parse(flag, value)?),
            "--radius" => opts.radius = Some(parse(flag, value)?),
            "--distribution" => opts.distribution = Some(parse(flag, value)?),
            "--sort" => opts.sort = Some(parse(flag, value)?),
            "--seed" => opts.seed = Some(parse(flag, value)?),
            "--value" => opts.value = Some(ValueSpec::Fixed(parse(flag, value)?)),
            "--value-range" => {
                let (min, max) = parse_pair(flag, value)?;
                opts.value = Some(ValueSpec::Range { min, max });
            }
            "--presence" => opts.presence = Some(PresenceSpec::Fixed(parse(flag, value)?)),
            "--presence-range" => {
                let (min, max) = parse_pair(flag, value)?;
                opts.presence = Some(PresenceSpec::Range { min, max });
            }
            "--center" => {
                let (x, y) = parse_pair(flag, value)?;
                opts.center = Some(Point2D::new(x, y));
            }
            other => bail!("unknown option: {other}"),
        }
        i += 2;
    }
    Ok((command, opts))
}

fn generation_config(opts: &Options, env: &Config) -> Result<GenerationConfig> {
    let mut config = match &opts.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("cannot read config '{path}'"))?;
            GenerationConfig::from_json(&text).with_context(|| format!("invalid config '{path}'"))?
        }
        None => GenerationConfig::default(),
    };

    config.pipeline.default_floor_height_m = opts.floor_height.unwrap_or(env.floor_height_m);
    config.record.generator_version = env.generator_version.clone();
    config.matching.auto_select |= opts.auto_select;
    if let Some(criterion) = opts.criterion {
        config.selection.criterion = criterion;
    }
    if let Some(count) = opts.count {
        config.selection.count = count;
    }
    if let Some(mode) = opts.mode {
        config.matching.mode = mode;
    }
    if let Some(extra) = opts.extra_floors {
        config.matching.extra_floors = extra;
    }
    if let Some(filter) = &opts.filter {
        config.matching.catalog_filter = filter.clone();
    }
    if let Some(distribution) = opts.distribution {
        config.placement.distribution = distribution;
    }
    if let Some(sort) = opts.sort {
        config.record.sort = sort;
    }
    if let Some(value) = opts.value {
        config.record.value = value;
    }
    if let Some(presence) = opts.presence {
        config.record.presence = presence;
    }
    debug!(?config, "generation settings");
    Ok(config)
}

fn read_catalogs(opts: &Options) -> Result<(Catalog, ValuesTable)> {
    let path = opts.catalog.as_deref().ok_or_else(|| anyhow!("--catalog is required"))?;
    let text = fs::read_to_string(path).with_context(|| format!("cannot read catalog '{path}'"))?;
    let catalog = Catalog::from_json(&text).with_context(|| format!("invalid catalog '{path}'"))?;

    let values = match opts.values.as_deref() {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("cannot read values table '{path}'"))?;
            ValuesTable::from_json(&text).with_context(|| format!("invalid values table '{path}'"))?
        }
        None => ValuesTable::default(),
    };
    Ok((catalog, values))
}

fn run_footprints(
    input: &str,
    opts: &Options,
    config: &GenerationConfig,
    rng: &mut StdRng,
) -> Result<(Generation, serde_json::Value)> {
    println!("[1/5] Reading footprints: {input}");
    let text = fs::read_to_string(input).with_context(|| format!("cannot read '{input}'"))?;
    let records = footprints_from_geojson(&text)?;
    println!("  {} records", records.len());

    println!("[2/5] Fitting structures...");
    let projection = projection_from_target(opts.projection.as_deref())?;
    let batch = process_footprints(&records, projection.as_deref(), &config.pipeline)?;
    println!(
        "  {} structures, {} skipped",
        batch.structures.len(),
        batch.skipped.len()
    );
    for (source, count) in batch.height_sources.ranked() {
        println!("  height from {source}: {count}");
    }

    println!("[3/5] Localizing...");
    let table = feature_table(&batch, &config.pipeline);
    println!(
        "  world center: ({:.3}, {:.3})",
        table.world_center.x, table.world_center.y
    );

    println!("[4/5] Matching catalog models...");
    let (catalog, values) = read_catalogs(opts)?;
    println!("  {} catalog models", catalog.len());
    let generation = generate_from_footprints(&batch.structures, &table, &catalog, &values, config, rng)?;

    let stats = serde_json::json!({
        "structures": batch.structures.len(),
        "skipped": batch.skipped.len(),
        "height_sources": batch.height_sources,
        "features": generation.records.len(),
        "feature_types": generation.feature_types,
    });
    Ok((generation, stats))
}

fn run_random(
    count: usize,
    opts: &Options,
    config: &GenerationConfig,
    rng: &mut StdRng,
) -> Result<(Generation, serde_json::Value)> {
    let radius = opts.radius.ok_or_else(|| anyhow!("--radius is required for random layouts"))?;

    println!("[1/3] Reading catalog...");
    let (catalog, values) = read_catalogs(opts)?;
    println!("  {} catalog models", catalog.len());

    println!(
        "[2/3] Placing {count} features within {radius} ({} distribution)...",
        config.placement.distribution
    );
    let mut generation = generate_random(&catalog, &values, count, radius, config, rng)?;
    if let Some(center) = opts.center {
        generation.world_center = center;
    }

    let stats = serde_json::json!({
        "features": generation.records.len(),
        "feature_types": generation.feature_types,
    });
    Ok((generation, stats))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,buildgen=info,buildgen_core=info".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return Ok(());
    }

    let (command, opts) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("Error: {err}");
            print_usage();
            std::process::exit(1);
        }
    };

    let env = Config::from_env();
    let config = generation_config(&opts, &env)?;
    let seed = opts.seed.unwrap_or_else(|| env.seed_or_now());
    let mut rng = StdRng::seed_from_u64(seed);
    info!(seed, from_flag = opts.seed.is_some(), "seeded generator");

    println!("=== BuildGen v{} ===", config.record.generator_version);
    println!("  seed: {seed}");
    println!();

    let (generation, stats) = match command {
        Command::Footprints { input } => run_footprints(&input, &opts, &config, &mut rng)?,
        Command::Random { count } => run_random(count, &opts, &config, &mut rng)?,
    };

    let output = opts.output.clone().unwrap_or_else(|| env.output.clone());
    println!("Writing {} feature entries: {output}", generation.records.len());
    fs::write(&output, generation.render(&config.record.generator_version))
        .with_context(|| format!("cannot write '{output}'"))?;
    info!(path = %output, features = generation.records.len(), "objective written");

    if let Some(path) = &opts.stats {
        let text = serde_json::to_string_pretty(&stats)?;
        fs::write(path, text).with_context(|| format!("cannot write statistics '{path}'"))?;
        println!("Statistics: {path}");
    }

    println!();
    println!("Done.");
    Ok(())
}
