//! risk-runner: headless batch scorer for payrisk.
//!
//! Reads one raw transaction record per line (JSON), scores the batch, and
//! writes one assessment per line to stdout. With --report, writes the
//! batch summary instead.
//!
//! Usage:
//!   risk-runner --input txns.jsonl
//!   risk-runner --input txns.jsonl --config engine.json --geo ip_map.json
//!   risk-runner --input txns.jsonl --report

use anyhow::Result;
use payrisk_core::{
    config::EngineConfig,
    engine::ScoringEngine,
    geo::{GeoFacts, StaticGeoResolver},
    report::BatchReport,
};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = match flag_value(&args, "--input") {
        Some(path) => path,
        None => {
            eprintln!("usage: risk-runner --input <txns.jsonl> [--config <engine.json>] [--geo <ip_map.json>] [--report]");
            std::process::exit(2);
        }
    };
    let report_only = args.iter().any(|a| a == "--report");

    let config = match flag_value(&args, "--config") {
        Some(path) => EngineConfig::load(&path)?,
        None => EngineConfig::default(),
    };

    let resolver = match flag_value(&args, "--geo") {
        Some(path) => load_geo_table(&path)?,
        None => StaticGeoResolver::new(),
    };

    let raw = std::fs::read_to_string(&input)
        .map_err(|e| anyhow::anyhow!("Cannot read {input}: {e}"))?;
    let mut rows = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(value) => rows.push(value),
            Err(e) => log::warn!("{input}:{}: skipping unparsable line: {e}", lineno + 1),
        }
    }

    eprintln!("risk-runner: {} records from {input}", rows.len());

    let engine = ScoringEngine::new(config, Arc::new(resolver))?;
    let assessments = engine.assess_batch(&rows)?;

    if report_only {
        let report = BatchReport::from_assessments(&assessments);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for assessment in &assessments {
            println!("{}", serde_json::to_string(assessment)?);
        }
    }

    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}

/// Load a static IP→facts table: a JSON object keyed by IP address.
fn load_geo_table(path: &str) -> Result<StaticGeoResolver> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let table: HashMap<String, GeoFacts> = serde_json::from_str(&content)?;
    let mut resolver = StaticGeoResolver::new();
    for (ip, facts) in table {
        resolver.insert(&ip, facts);
    }
    Ok(resolver)
}
