use super::config::OutputConfig;
use crate::errors::CliError;
use indicatif::{
    ParallelProgressIterator,
    ProgressStyle,
};
use psmseek::data_sources::{
    PsmColumn,
    PsmRecord,
    PsmTableReader,
    PsmTableWriter,
};
use psmseek::models::FileRegistry;
use psmseek::{
    MatchCollection,
    ScanIndex,
    ScoreType,
    SearchParameters,
};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{
    Path,
    PathBuf,
};
use std::rc::Rc;
use std::time::Instant;
use tracing::{
    debug,
    info,
    warn,
};

const QVALUE_THRESHOLD: f64 = 0.01;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub num_files: usize,
    pub num_psms: usize,
    pub num_targets: usize,
    pub num_decoys: usize,
    pub targets_at_1pct_fdr: usize,
    pub scored_types: Vec<String>,
    pub elapsed_seconds: f64,
}

fn progress_style() -> Result<ProgressStyle, CliError> {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    )
    .map_err(|e| CliError::Config {
        source: e.to_string(),
    })
}

/// Parses every input file on the rayon pool. Rows carry no shared state,
/// so only the collections are built on this thread.
fn read_all(
    paths: &[PathBuf],
    decoy_prefix: &str,
) -> Result<Vec<(PathBuf, Vec<PsmRecord>)>, CliError> {
    let parsed: Vec<_> = paths
        .par_iter()
        .progress_with_style(progress_style()?)
        .map(|path| -> psmseek::Result<(PathBuf, Vec<PsmRecord>)> {
            let records = PsmTableReader::from_path(path)?.read_records(decoy_prefix)?;
            debug!("Parsed {} rows from {}", records.len(), path.display());
            Ok((path.clone(), records))
        })
        .collect();

    let mut out = Vec::with_capacity(parsed.len());
    for x in parsed {
        out.push(x?);
    }
    Ok(out)
}

/// Merges the tab-delimited search results, computes q-values over the
/// merged set and writes `results.txt` and `summary.json`.
pub fn process_tab_delimited(
    paths: &[PathBuf],
    params: SearchParameters,
    output: &OutputConfig,
    full_output: bool,
) -> Result<RunSummary, CliError> {
    let start = Instant::now();
    let params = Rc::new(params);
    info!("Reading {} PSM files", paths.len());
    let parsed = read_all(paths, &params.decoy_prefix)?;

    let mut registry = FileRegistry::new();
    let mut merged = MatchCollection::new_post_process(params.clone());
    for (path, records) in parsed {
        let mut part = MatchCollection::new_post_process(params.clone());
        let n = part.extend_from_records(records, &mut registry, &path)?;
        MatchCollection::merge(&part, &mut merged)?;
        info!("Merged {} PSMs from {}", n, path.display());
    }
    info!(
        "Loaded {} PSMs from {} files in {:?}",
        merged.len(),
        registry.len(),
        start.elapsed()
    );

    if merged.is_scored(ScoreType::Xcorr) {
        merged.compute_decoy_qvalues()?;
    } else {
        warn!("Input has no xcorr scores, skipping decoy q-values");
    }
    if merged.is_scored(ScoreType::LogpBonfWeibullXcorr) {
        assign_weibull_qvalues(&mut merged)?;
    }

    let sort_by = if merged.is_scored(ScoreType::Xcorr) {
        Some(ScoreType::Xcorr)
    } else if merged.is_scored(ScoreType::Sp) {
        Some(ScoreType::Sp)
    } else {
        None
    };
    write_results(
        &mut merged,
        &registry,
        &output.directory.join("results.txt"),
        sort_by,
        full_output,
    )?;

    let summary = summarize(&merged, registry.len(), start);
    let summary_path = output.directory.join("summary.json");
    let file = std::fs::File::create(&summary_path).map_err(|e| CliError::Io {
        source: e.to_string(),
        path: Some(summary_path.to_string_lossy().to_string()),
    })?;
    serde_json::to_writer_pretty(file, &summary)?;
    println!(
        "Processed {} PSMs from {} files, {} targets at {}% FDR",
        summary.num_psms,
        summary.num_files,
        summary.targets_at_1pct_fdr,
        QVALUE_THRESHOLD * 100.0
    );
    Ok(summary)
}

/// Benjamini-Hochberg q-values of the Weibull p-values of the top-ranked
/// targets across all files.
fn assign_weibull_qvalues(merged: &mut MatchCollection) -> Result<(), CliError> {
    let n = merged.compute_weibull_qvalues()?;
    debug!("Assigned Weibull q-values to {} top-ranked targets", n);
    Ok(())
}

fn write_results(
    merged: &mut MatchCollection,
    registry: &FileRegistry,
    path: &Path,
    sort_by: Option<ScoreType>,
    full_output: bool,
) -> Result<usize, CliError> {
    let columns = PsmColumn::for_scored(|t| merged.is_scored(t), registry.len() > 1);
    let mut writer = PsmTableWriter::to_path(path, columns)?;
    writer.write_header()?;

    let matches = match sort_by {
        Some(t) => merged.iter_by(t),
        None => merged.iter(),
    };
    for m in matches.iter() {
        let m = m.borrow();
        if !full_output {
            if let Some(t) = sort_by {
                if m.score(t).is_none() {
                    continue;
                }
            }
        }
        writer.write_match(&m, Some(registry))?;
    }
    writer.flush()?;
    info!("Wrote {} PSMs to {}", writer.rows_written(), path.display());
    Ok(writer.rows_written())
}

fn summarize(merged: &MatchCollection, num_files: usize, start: Instant) -> RunSummary {
    let mut num_targets = 0;
    let mut num_decoys = 0;
    let mut targets_at_1pct_fdr = 0;
    for m in merged.iter().iter() {
        let m = m.borrow();
        if m.is_decoy() {
            num_decoys += 1;
            continue;
        }
        num_targets += 1;
        if m
            .score(ScoreType::DecoyXcorrQvalue)
            .is_some_and(|q| q <= QVALUE_THRESHOLD)
        {
            targets_at_1pct_fdr += 1;
        }
    }
    RunSummary {
        num_files,
        num_psms: merged.len(),
        num_targets,
        num_decoys,
        targets_at_1pct_fdr,
        scored_types: merged
            .scored_types()
            .into_iter()
            .map(|t| t.to_string())
            .collect(),
        elapsed_seconds: start.elapsed().as_secs_f64(),
    }
}

/// Reports the byte offset of each scan in `[first, last]` found in the
/// spectrum file.
pub fn process_scan_lookup(path: &Path, scans: &str) -> Result<usize, CliError> {
    let (first, last) = psmseek::config::parse_scan_range(scans)?;
    let mut index = ScanIndex::from_path(path)?;
    info!(
        "Looking up scans {}-{} in {} ({} bytes)",
        first,
        last,
        path.display(),
        index.file_len()
    );
    let mut found = 0;
    for scan in first..=last {
        match index.find_record(scan)? {
            Some(header) => {
                println!("{}\t{}\t{}", scan, header.offset, header.precursor_mz);
                found += 1;
            }
            None => debug!("Scan {} not in {}", scan, path.display()),
        }
    }
    info!("Found {} of {} scans", found, last - first + 1);
    Ok(found)
}
