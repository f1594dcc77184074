//! Tab-delimited PSM tables, one row per match.

use crate::errors::{
    PsmReadingError,
    PsmSeekError,
    Result,
};
use crate::models::{
    DecoyMarking,
    FileRegistry,
    Match,
    NUM_SCORE_TYPES,
    Peptide,
    ProteinSource,
    ScoreType,
    Spectrum,
    ZState,
};
use csv::StringRecord;
use std::fs::File;
use std::io::{
    Read,
    Write,
};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PsmColumn {
    File,
    Scan,
    Charge,
    SpectrumPrecursorMz,
    SpectrumNeutralMass,
    PeptideMass,
    DeltaCn,
    DeltaLcn,
    SpScore,
    SpRank,
    XcorrScore,
    XcorrRank,
    Evalue,
    Pvalue,
    DecoyXcorrQvalue,
    WeibullQvalue,
    PercolatorScore,
    PercolatorRank,
    PercolatorQvalue,
    QrankerScore,
    QrankerQvalue,
    BaristaScore,
    BaristaQvalue,
    ByIonsMatched,
    ByIonsTotal,
    DistinctMatches,
    TotalMatches,
    DecoyMatches,
    Sequence,
    CleavageType,
    ProteinId,
    FlankingAa,
    UnshuffledSequence,
}

pub const NUM_PSM_COLUMNS: usize = 33;

impl PsmColumn {
    pub const ALL: [PsmColumn; NUM_PSM_COLUMNS] = [
        PsmColumn::File,
        PsmColumn::Scan,
        PsmColumn::Charge,
        PsmColumn::SpectrumPrecursorMz,
        PsmColumn::SpectrumNeutralMass,
        PsmColumn::PeptideMass,
        PsmColumn::DeltaCn,
        PsmColumn::DeltaLcn,
        PsmColumn::SpScore,
        PsmColumn::SpRank,
        PsmColumn::XcorrScore,
        PsmColumn::XcorrRank,
        PsmColumn::Evalue,
        PsmColumn::Pvalue,
        PsmColumn::DecoyXcorrQvalue,
        PsmColumn::WeibullQvalue,
        PsmColumn::PercolatorScore,
        PsmColumn::PercolatorRank,
        PsmColumn::PercolatorQvalue,
        PsmColumn::QrankerScore,
        PsmColumn::QrankerQvalue,
        PsmColumn::BaristaScore,
        PsmColumn::BaristaQvalue,
        PsmColumn::ByIonsMatched,
        PsmColumn::ByIonsTotal,
        PsmColumn::DistinctMatches,
        PsmColumn::TotalMatches,
        PsmColumn::DecoyMatches,
        PsmColumn::Sequence,
        PsmColumn::CleavageType,
        PsmColumn::ProteinId,
        PsmColumn::FlankingAa,
        PsmColumn::UnshuffledSequence,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn header(&self) -> &'static str {
        match self {
            PsmColumn::File => "file",
            PsmColumn::Scan => "scan",
            PsmColumn::Charge => "charge",
            PsmColumn::SpectrumPrecursorMz => "spectrum precursor m/z",
            PsmColumn::SpectrumNeutralMass => "spectrum neutral mass",
            PsmColumn::PeptideMass => "peptide mass",
            PsmColumn::DeltaCn => "delta_cn",
            PsmColumn::DeltaLcn => "delta_lcn",
            PsmColumn::SpScore => "sp score",
            PsmColumn::SpRank => "sp rank",
            PsmColumn::XcorrScore => "xcorr score",
            PsmColumn::XcorrRank => "xcorr rank",
            PsmColumn::Evalue => "e-value",
            PsmColumn::Pvalue => "p-value",
            PsmColumn::DecoyXcorrQvalue => "decoy q-value (xcorr)",
            PsmColumn::WeibullQvalue => "weibull est. q-value",
            PsmColumn::PercolatorScore => "percolator score",
            PsmColumn::PercolatorRank => "percolator rank",
            PsmColumn::PercolatorQvalue => "percolator q-value",
            PsmColumn::QrankerScore => "q-ranker score",
            PsmColumn::QrankerQvalue => "q-ranker q-value",
            PsmColumn::BaristaScore => "barista score",
            PsmColumn::BaristaQvalue => "barista q-value",
            PsmColumn::ByIonsMatched => "b/y ions matched",
            PsmColumn::ByIonsTotal => "b/y ions total",
            PsmColumn::DistinctMatches => "distinct matches/spectrum",
            PsmColumn::TotalMatches => "total matches/spectrum",
            PsmColumn::DecoyMatches => "decoy matches/spectrum",
            PsmColumn::Sequence => "sequence",
            PsmColumn::CleavageType => "cleavage type",
            PsmColumn::ProteinId => "protein id",
            PsmColumn::FlankingAa => "flanking aa",
            PsmColumn::UnshuffledSequence => "unshuffled sequence",
        }
    }

    pub fn from_header(header: &str) -> Option<PsmColumn> {
        let header = header.trim();
        PsmColumn::ALL.iter().copied().find(|c| c.header() == header)
    }

    /// Columns holding a score, with the score type a non-empty value marks
    /// as scored.
    const SCORE_COLUMNS: [(PsmColumn, ScoreType); 12] = [
        (PsmColumn::SpScore, ScoreType::Sp),
        (PsmColumn::XcorrScore, ScoreType::Xcorr),
        (PsmColumn::Evalue, ScoreType::Evalue),
        (PsmColumn::DecoyXcorrQvalue, ScoreType::DecoyXcorrQvalue),
        (PsmColumn::Pvalue, ScoreType::LogpBonfWeibullXcorr),
        (PsmColumn::PercolatorScore, ScoreType::PercolatorScore),
        (PsmColumn::PercolatorQvalue, ScoreType::PercolatorQvalue),
        (PsmColumn::WeibullQvalue, ScoreType::LogpQvalueWeibullXcorr),
        (PsmColumn::QrankerScore, ScoreType::QrankerScore),
        (PsmColumn::QrankerQvalue, ScoreType::QrankerQvalue),
        (PsmColumn::BaristaScore, ScoreType::BaristaScore),
        (PsmColumn::BaristaQvalue, ScoreType::BaristaQvalue),
    ];

    /// The columns written for a collection scored by the types for which
    /// `is_scored` holds.
    pub fn for_scored(is_scored: impl Fn(ScoreType) -> bool, with_file: bool) -> Vec<PsmColumn> {
        let mut out = Vec::with_capacity(NUM_PSM_COLUMNS);
        if with_file {
            out.push(PsmColumn::File);
        }
        out.extend_from_slice(&[
            PsmColumn::Scan,
            PsmColumn::Charge,
            PsmColumn::SpectrumPrecursorMz,
            PsmColumn::SpectrumNeutralMass,
            PsmColumn::PeptideMass,
        ]);
        if is_scored(ScoreType::DeltaCn) || is_scored(ScoreType::Xcorr) {
            out.push(PsmColumn::DeltaCn);
            out.push(PsmColumn::DeltaLcn);
        }
        let ranked = [
            (ScoreType::Sp, PsmColumn::SpScore, Some(PsmColumn::SpRank)),
            (ScoreType::Xcorr, PsmColumn::XcorrScore, Some(PsmColumn::XcorrRank)),
            (ScoreType::Evalue, PsmColumn::Evalue, None),
            (ScoreType::LogpBonfWeibullXcorr, PsmColumn::Pvalue, None),
            (ScoreType::DecoyXcorrQvalue, PsmColumn::DecoyXcorrQvalue, None),
            (ScoreType::LogpQvalueWeibullXcorr, PsmColumn::WeibullQvalue, None),
            (
                ScoreType::PercolatorScore,
                PsmColumn::PercolatorScore,
                Some(PsmColumn::PercolatorRank),
            ),
            (ScoreType::PercolatorQvalue, PsmColumn::PercolatorQvalue, None),
            (ScoreType::QrankerScore, PsmColumn::QrankerScore, None),
            (ScoreType::QrankerQvalue, PsmColumn::QrankerQvalue, None),
            (ScoreType::BaristaScore, PsmColumn::BaristaScore, None),
            (ScoreType::BaristaQvalue, PsmColumn::BaristaQvalue, None),
        ];
        for (score_type, score_col, rank_col) in ranked {
            if is_scored(score_type) {
                out.push(score_col);
                if let Some(rank_col) = rank_col {
                    out.push(rank_col);
                }
            }
        }
        out.extend_from_slice(&[
            PsmColumn::ByIonsMatched,
            PsmColumn::ByIonsTotal,
            PsmColumn::DistinctMatches,
            PsmColumn::TotalMatches,
            PsmColumn::DecoyMatches,
            PsmColumn::Sequence,
            PsmColumn::CleavageType,
            PsmColumn::ProteinId,
            PsmColumn::FlankingAa,
            PsmColumn::UnshuffledSequence,
        ]);
        out
    }
}

/// One data row of a [`PsmTableReader`], with typed access by column.
pub struct PsmRow<'a> {
    record: &'a StringRecord,
    columns: &'a [Option<usize>; NUM_PSM_COLUMNS],
    row: usize,
}

impl<'a> PsmRow<'a> {
    pub fn row_number(&self) -> usize {
        self.row
    }

    /// Missing columns and blank fields are both empty.
    pub fn empty(&self, col: PsmColumn) -> bool {
        self.get_string(col).is_none()
    }

    pub fn get_string(&self, col: PsmColumn) -> Option<&'a str> {
        let idx = self.columns[col.index()]?;
        let record: &'a StringRecord = self.record;
        match record.get(idx) {
            Some(x) if !x.trim().is_empty() => Some(x.trim()),
            _ => None,
        }
    }

    pub fn get_float(&self, col: PsmColumn) -> Result<f64> {
        self.opt_float(col)?.ok_or_else(|| self.missing(col))
    }

    pub fn get_integer(&self, col: PsmColumn) -> Result<i64> {
        self.opt_integer(col)?.ok_or_else(|| self.missing(col))
    }

    pub fn opt_float(&self, col: PsmColumn) -> Result<Option<f64>> {
        match self.get_string(col) {
            None => Ok(None),
            Some(x) => x
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.invalid(col, x)),
        }
    }

    /// Integer columns tolerate a float rendering such as `12.0`.
    pub fn opt_integer(&self, col: PsmColumn) -> Result<Option<i64>> {
        match self.get_string(col) {
            None => Ok(None),
            Some(x) => match x.parse::<i64>() {
                Ok(v) => Ok(Some(v)),
                Err(_) => match x.parse::<f64>() {
                    Ok(v) if v.fract() == 0.0 && v.is_finite() => Ok(Some(v as i64)),
                    _ => Err(self.invalid(col, x)),
                },
            },
        }
    }

    fn opt_u32(&self, col: PsmColumn) -> Result<Option<u32>> {
        match self.opt_integer(col)? {
            None => Ok(None),
            Some(v) => u32::try_from(v)
                .map(Some)
                .map_err(|_| self.invalid(col, &v.to_string())),
        }
    }

    fn missing(&self, col: PsmColumn) -> PsmSeekError {
        PsmReadingError::MissingColumn {
            column: col.header(),
            row: self.row,
        }
        .into()
    }

    fn invalid(&self, col: PsmColumn, value: &str) -> PsmSeekError {
        PsmReadingError::InvalidField {
            column: col.header(),
            value: value.to_string(),
            row: self.row,
        }
        .into()
    }
}

/// Reads a header-described, tab-delimited PSM table.
pub struct PsmTableReader<R: Read> {
    rdr: csv::Reader<R>,
    columns: [Option<usize>; NUM_PSM_COLUMNS],
    record: StringRecord,
    row: usize,
}

impl PsmTableReader<File> {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| PsmSeekError::Io {
            source: e,
            path: Some(path.to_path_buf()),
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read> PsmTableReader<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .quoting(false)
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr.headers().map_err(|e| PsmReadingError::Csv {
            source: e,
            context: "reading PSM table header",
        })?;
        let mut columns = [None; NUM_PSM_COLUMNS];
        for (i, h) in headers.iter().enumerate() {
            if let Some(col) = PsmColumn::from_header(h) {
                columns[col.index()] = Some(i);
            }
        }

        Ok(Self {
            rdr,
            columns,
            record: StringRecord::new(),
            row: 0,
        })
    }

    pub fn has_column(&self, col: PsmColumn) -> bool {
        self.columns[col.index()].is_some()
    }

    /// Moves to the next row. Returns false at the end of the table.
    pub fn advance(&mut self) -> Result<bool> {
        let more = self
            .rdr
            .read_record(&mut self.record)
            .map_err(|e| PsmReadingError::Csv {
                source: e,
                context: "reading PSM table row",
            })?;
        if more {
            self.row += 1;
        }
        Ok(more)
    }

    /// The current row. Only meaningful after `advance` returned true.
    pub fn row(&self) -> PsmRow<'_> {
        PsmRow {
            record: &self.record,
            columns: &self.columns,
            row: self.row,
        }
    }

    /// Parses every remaining row.
    pub fn read_records(&mut self, decoy_prefix: &str) -> Result<Vec<PsmRecord>> {
        let mut out = Vec::new();
        while self.advance()? {
            out.push(PsmRecord::from_row(&self.row(), decoy_prefix)?);
        }
        Ok(out)
    }
}

/// A fully parsed table row, independent of the reader. Holds no shared
/// state, so rows can be parsed on worker threads.
#[derive(Debug, Clone)]
pub struct PsmRecord {
    pub row: usize,
    pub spectrum: Spectrum,
    pub z_state: ZState,
    pub peptide: Peptide,
    pub is_decoy: bool,
    pub scores: [Option<f64>; NUM_SCORE_TYPES],
    pub ranks: [u32; NUM_SCORE_TYPES],
    /// Score types whose column was filled in on this row.
    pub scored_types: Vec<ScoreType>,
    pub delta_cn: Option<f64>,
    pub delta_lcn: Option<f64>,
    pub distinct_matches: Option<f64>,
    pub total_matches: Option<f64>,
    pub num_target_matches: u32,
    pub num_decoy_matches: u32,
    pub by_ions_matched: Option<u32>,
    pub by_ions_total: Option<u32>,
    pub cleavage_type: Option<String>,
}

impl PsmRecord {
    pub fn from_row(row: &PsmRow<'_>, decoy_prefix: &str) -> Result<Self> {
        let scan = row
            .opt_u32(PsmColumn::Scan)?
            .ok_or_else(|| row.missing(PsmColumn::Scan))?;
        let charge_raw = row.get_integer(PsmColumn::Charge)?;
        let charge =
            u8::try_from(charge_raw).map_err(|_| row.invalid(PsmColumn::Charge, &charge_raw.to_string()))?;
        let neutral_mass = row.get_float(PsmColumn::SpectrumNeutralMass)?;
        let z_state = ZState::new(charge, neutral_mass);
        let precursor_mz = match row.opt_float(PsmColumn::SpectrumPrecursorMz)? {
            Some(x) => x,
            None => z_state.mz(),
        };
        let spectrum = Spectrum::new(scan, precursor_mz).with_charges(vec![charge]);

        let sequence = row
            .get_string(PsmColumn::Sequence)
            .ok_or_else(|| row.missing(PsmColumn::Sequence))?;
        let peptide_mass = row
            .opt_float(PsmColumn::PeptideMass)?
            .unwrap_or(neutral_mass);
        let protein_ids = row.get_string(PsmColumn::ProteinId).unwrap_or("");
        let is_decoy = !decoy_prefix.is_empty() && protein_ids.contains(decoy_prefix);
        let mut peptide = parse_modified_sequence(sequence, peptide_mass);
        for src in parse_sources(protein_ids, row.get_string(PsmColumn::FlankingAa)) {
            peptide = peptide.with_source(src);
        }
        if is_decoy {
            // Tables print decoys already shuffled.
            peptide = peptide.with_decoy(DecoyMarking::Decoy);
            if let Some(unshuffled) = row.get_string(PsmColumn::UnshuffledSequence) {
                peptide = peptide.with_unshuffled_sequence(unshuffled);
            }
        }

        let mut scores = [None; NUM_SCORE_TYPES];
        let mut ranks = [0u32; NUM_SCORE_TYPES];
        let mut scored_types = Vec::new();
        for (col, score_type) in PsmColumn::SCORE_COLUMNS {
            if !row.empty(col) {
                scored_types.push(score_type);
            }
        }

        if !row.empty(PsmColumn::SpScore) && !row.empty(PsmColumn::SpRank) {
            scores[ScoreType::Sp.index()] = Some(row.get_float(PsmColumn::SpScore)?);
            ranks[ScoreType::Sp.index()] = row.get_integer(PsmColumn::SpRank)?.max(0) as u32;
        }
        if let Some(x) = row.opt_float(PsmColumn::XcorrScore)? {
            scores[ScoreType::Xcorr.index()] = Some(x);
            ranks[ScoreType::Xcorr.index()] = row.opt_u32(PsmColumn::XcorrRank)?.unwrap_or(0);
        }
        let plain = [
            (PsmColumn::DecoyXcorrQvalue, ScoreType::DecoyXcorrQvalue),
            (PsmColumn::Evalue, ScoreType::Evalue),
            (PsmColumn::PercolatorQvalue, ScoreType::PercolatorQvalue),
            (PsmColumn::WeibullQvalue, ScoreType::LogpQvalueWeibullXcorr),
        ];
        for (col, score_type) in plain {
            if let Some(x) = row.opt_float(col)? {
                scores[score_type.index()] = Some(x);
            }
        }
        if let Some(p) = row.opt_float(PsmColumn::Pvalue)? {
            scores[ScoreType::LogpBonfWeibullXcorr.index()] = Some(-p.ln());
        }
        if let Some(x) = row.opt_float(PsmColumn::PercolatorScore)? {
            scores[ScoreType::PercolatorScore.index()] = Some(x);
            ranks[ScoreType::PercolatorScore.index()] =
                row.opt_u32(PsmColumn::PercolatorRank)?.unwrap_or(0);
        }
        if let Some(x) = row.opt_float(PsmColumn::QrankerScore)? {
            scores[ScoreType::QrankerScore.index()] = Some(x);
            scores[ScoreType::QrankerQvalue.index()] = row.opt_float(PsmColumn::QrankerQvalue)?;
        }
        if let Some(x) = row.opt_float(PsmColumn::BaristaScore)? {
            scores[ScoreType::BaristaScore.index()] = Some(x);
            scores[ScoreType::BaristaQvalue.index()] = row.opt_float(PsmColumn::BaristaQvalue)?;
        }

        let distinct_matches = row.opt_float(PsmColumn::DistinctMatches)?;
        let total_matches = row.opt_float(PsmColumn::TotalMatches)?;
        let num_target_matches = distinct_matches.or(total_matches).unwrap_or(0.0).max(0.0) as u32;

        Ok(Self {
            row: row.row_number(),
            spectrum,
            z_state,
            peptide,
            is_decoy,
            scores,
            ranks,
            scored_types,
            delta_cn: row.opt_float(PsmColumn::DeltaCn)?,
            delta_lcn: row.opt_float(PsmColumn::DeltaLcn)?,
            distinct_matches,
            total_matches,
            num_target_matches,
            num_decoy_matches: row.opt_u32(PsmColumn::DecoyMatches)?.unwrap_or(0),
            by_ions_matched: row.opt_u32(PsmColumn::ByIonsMatched)?,
            by_ions_total: row.opt_u32(PsmColumn::ByIonsTotal)?,
            cleavage_type: row.get_string(PsmColumn::CleavageType).map(|s| s.to_string()),
        })
    }
}

/// Residues are upper-case letters. A bracketed number after a residue is a
/// mass modification, any other character is a symbol modification.
pub fn parse_modified_sequence(sequence: &str, mass: f64) -> Peptide {
    let mut residues = String::with_capacity(sequence.len());
    let mut mods: Vec<(usize, Option<char>, f64)> = Vec::new();
    let mut chars = sequence.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_uppercase() {
            residues.push(c);
            continue;
        }
        let position = residues.len().saturating_sub(1);
        if c == '[' {
            let mut inner = String::new();
            for x in chars.by_ref() {
                if x == ']' {
                    break;
                }
                inner.push(x);
            }
            for part in inner.split(',') {
                if let Ok(delta) = part.trim().parse::<f64>() {
                    mods.push((position, None, delta));
                }
            }
        } else {
            mods.push((position, Some(c), 0.0));
        }
    }

    let mut out = Peptide::new(residues, mass);
    for (position, symbol, delta) in mods {
        out = match symbol {
            Some(c) => out.with_modification(position, c, delta),
            None => out.with_mass_modification(position, delta),
        };
    }
    out
}

/// Pairs comma-separated protein ids (optionally `id(start)`) with the
/// flanking residue pairs in the same position.
fn parse_sources(protein_ids: &str, flanks: Option<&str>) -> Vec<ProteinSource> {
    if protein_ids.is_empty() {
        return Vec::new();
    }
    let flanks: Vec<&str> = flanks.map(|f| f.split(',').collect()).unwrap_or_default();
    protein_ids
        .split(',')
        .enumerate()
        .map(|(i, id)| {
            let id = id.trim();
            let (name, start_idx) = match (id.rfind('('), id.ends_with(')')) {
                (Some(open), true) => (
                    &id[..open],
                    id[open + 1..id.len() - 1].parse::<usize>().ok(),
                ),
                _ => (id, None),
            };
            let mut flank = flanks.get(i).map(|f| f.trim().chars()).into_iter().flatten();
            let n_term = flank.next().unwrap_or('-');
            let c_term = flank.next().unwrap_or('-');
            let mut src = ProteinSource::new(name, n_term, c_term);
            src.start_idx = start_idx;
            src
        })
        .collect()
}

/// Writes matches as a tab-delimited table.
pub struct PsmTableWriter<W: Write> {
    wtr: csv::Writer<W>,
    columns: Vec<PsmColumn>,
    rows_written: usize,
}

impl PsmTableWriter<File> {
    pub fn to_path(path: &Path, columns: Vec<PsmColumn>) -> Result<Self> {
        let file = File::create(path).map_err(|e| PsmSeekError::Io {
            source: e,
            path: Some(path.to_path_buf()),
        })?;
        Ok(Self::new(file, columns))
    }
}

impl<W: Write> PsmTableWriter<W> {
    pub fn new(writer: W, columns: Vec<PsmColumn>) -> Self {
        let wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);
        Self {
            wtr,
            columns,
            rows_written: 0,
        }
    }

    pub fn columns(&self) -> &[PsmColumn] {
        &self.columns
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn write_header(&mut self) -> Result<()> {
        self.wtr
            .write_record(self.columns.iter().map(|c| c.header()))?;
        Ok(())
    }

    pub fn write_match(&mut self, m: &Match, registry: Option<&FileRegistry>) -> Result<()> {
        let fields: Vec<String> = self
            .columns
            .iter()
            .map(|c| column_value(m, *c, registry))
            .collect();
        self.wtr.write_record(&fields)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.wtr.into_inner().map_err(|e| PsmSeekError::Io {
            source: e.into_error(),
            path: None,
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.wtr.flush()?;
        Ok(())
    }
}

fn opt_to_string(x: Option<f64>) -> String {
    x.map(|v| v.to_string()).unwrap_or_default()
}

fn column_value(m: &Match, col: PsmColumn, registry: Option<&FileRegistry>) -> String {
    match col {
        PsmColumn::File => m
            .file_index()
            .and_then(|i| registry.and_then(|r| r.path(i)))
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        PsmColumn::Scan => m.scan().to_string(),
        PsmColumn::Charge => m.charge().to_string(),
        PsmColumn::SpectrumPrecursorMz => m.spectrum().precursor_mz.to_string(),
        PsmColumn::SpectrumNeutralMass => m.z_state().neutral_mass().to_string(),
        PsmColumn::PeptideMass => m.peptide().mass().to_string(),
        PsmColumn::DeltaCn => m.delta_cn().to_string(),
        PsmColumn::DeltaLcn => m.delta_lcn().to_string(),
        PsmColumn::SpScore => opt_to_string(m.score(ScoreType::Sp)),
        PsmColumn::SpRank => m.rank(ScoreType::Sp).to_string(),
        PsmColumn::XcorrScore => opt_to_string(m.score(ScoreType::Xcorr)),
        PsmColumn::XcorrRank => m.rank(ScoreType::Xcorr).to_string(),
        PsmColumn::Evalue => opt_to_string(m.score(ScoreType::Evalue)),
        PsmColumn::Pvalue => opt_to_string(
            m.score(ScoreType::LogpBonfWeibullXcorr)
                .map(|s| (-s).exp()),
        ),
        PsmColumn::DecoyXcorrQvalue => opt_to_string(m.score(ScoreType::DecoyXcorrQvalue)),
        PsmColumn::WeibullQvalue => opt_to_string(m.score(ScoreType::LogpQvalueWeibullXcorr)),
        PsmColumn::PercolatorScore => opt_to_string(m.score(ScoreType::PercolatorScore)),
        PsmColumn::PercolatorRank => m.rank(ScoreType::PercolatorScore).to_string(),
        PsmColumn::PercolatorQvalue => opt_to_string(m.score(ScoreType::PercolatorQvalue)),
        PsmColumn::QrankerScore => opt_to_string(m.score(ScoreType::QrankerScore)),
        PsmColumn::QrankerQvalue => opt_to_string(m.score(ScoreType::QrankerQvalue)),
        PsmColumn::BaristaScore => opt_to_string(m.score(ScoreType::BaristaScore)),
        PsmColumn::BaristaQvalue => opt_to_string(m.score(ScoreType::BaristaQvalue)),
        PsmColumn::ByIonsMatched => m.by_ion_matched().to_string(),
        PsmColumn::ByIonsTotal => m.by_ion_possible().to_string(),
        PsmColumn::DistinctMatches => {
            if m.num_target_matches() > 0 {
                m.num_target_matches().to_string()
            } else {
                (m.ln_experiment_size().exp().round() as u64).to_string()
            }
        }
        PsmColumn::TotalMatches => {
            (m.ln_experiment_size().exp().round() as u64).to_string()
        }
        PsmColumn::DecoyMatches => m.num_decoy_matches().to_string(),
        PsmColumn::Sequence => m.modified_sequence_with_symbols().to_string(),
        PsmColumn::CleavageType => m.cleavage_type().unwrap_or("").to_string(),
        PsmColumn::ProteinId => m.peptide().protein_ids(),
        PsmColumn::FlankingAa => m.peptide().flanking_aa(),
        PsmColumn::UnshuffledSequence => {
            if m.is_decoy() {
                m.peptide()
                    .unshuffled_sequence()
                    .unwrap_or_else(|| m.peptide().raw_sequence())
                    .to_string()
            } else {
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TABLE: &str = "scan\tcharge\tspectrum precursor m/z\tspectrum neutral mass\tpeptide mass\tdelta_cn\txcorr score\txcorr rank\tp-value\tdistinct matches/spectrum\tb/y ions matched\tb/y ions total\tsequence\tprotein id\tflanking aa\n\
10\t2\t500.5\t998.985\t998.9\t0.25\t3.5\t1\t0.01\t120\t7\t14\tPEPT*IDEK\tprotA(12),protB\tKA,R-\n\
11\t3\t400.2\t1197.6\t1197.5\t\t1.25\t2\t\t\t\t\tDECOYSEQK\tdecoy_protC\tR-\n";

    #[test]
    fn test_headers_and_presence() {
        let rdr = PsmTableReader::from_reader(Cursor::new(TABLE)).unwrap();
        assert!(rdr.has_column(PsmColumn::XcorrScore));
        assert!(!rdr.has_column(PsmColumn::SpScore));
        assert_eq!(
            PsmColumn::from_header("decoy q-value (xcorr)"),
            Some(PsmColumn::DecoyXcorrQvalue)
        );
        assert_eq!(PsmColumn::ALL.len(), NUM_PSM_COLUMNS);
    }

    #[test]
    fn test_parse_records() {
        let mut rdr = PsmTableReader::from_reader(Cursor::new(TABLE)).unwrap();
        let records = rdr.read_records("decoy_").unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.spectrum.first_scan, 10);
        assert_eq!(first.z_state.charge(), 2);
        assert!(!first.is_decoy);
        assert_eq!(first.scores[ScoreType::Xcorr.index()], Some(3.5));
        assert_eq!(first.ranks[ScoreType::Xcorr.index()], 1);
        let logp = first.scores[ScoreType::LogpBonfWeibullXcorr.index()].unwrap();
        assert!((logp - (-(0.01f64).ln())).abs() < 1e-12);
        assert!(first.scored_types.contains(&ScoreType::LogpBonfWeibullXcorr));
        assert_eq!(first.peptide.raw_sequence(), "PEPTIDEK");
        assert_eq!(first.peptide.sources().len(), 2);
        assert_eq!(first.peptide.sources()[0].start_idx, Some(12));
        assert_eq!(first.peptide.flanking_aa(), "KA,R-");
        assert_eq!(first.by_ions_total, Some(14));
        assert_eq!(first.num_target_matches, 120);

        let second = &records[1];
        assert!(second.is_decoy);
        assert_eq!(second.delta_cn, None);
        assert!(!second.scored_types.contains(&ScoreType::LogpBonfWeibullXcorr));
        assert_eq!(second.by_ions_matched, None);
    }

    #[test]
    fn test_missing_required_column() {
        let table = "scan\tcharge\tsequence\n10\t2\tPEPTIDEK\n";
        let mut rdr = PsmTableReader::from_reader(Cursor::new(table)).unwrap();
        let err = rdr.read_records("decoy_").unwrap_err();
        assert!(matches!(
            err,
            PsmSeekError::PsmReadingError(PsmReadingError::MissingColumn {
                column: "spectrum neutral mass",
                row: 1,
            })
        ));
    }

    #[test]
    fn test_invalid_field() {
        let table = "scan\tcharge\tspectrum neutral mass\tsequence\nten\t2\t900.0\tPEPTIDEK\n";
        let mut rdr = PsmTableReader::from_reader(Cursor::new(table)).unwrap();
        assert!(rdr.read_records("decoy_").is_err());
    }

    #[test]
    fn test_modified_sequence_parsing() {
        let pep = parse_modified_sequence("PEPT[79.97]IDEM*K", 1000.0);
        assert_eq!(pep.raw_sequence(), "PEPTIDEMK");
        assert_eq!(pep.modifications().len(), 2);
        assert_eq!(pep.modifications()[0].position, 3);
        assert_eq!(pep.modifications()[0].mass_delta, 79.97);
        assert_eq!(pep.modifications()[0].symbol, None);
        assert_eq!(pep.modifications()[1].symbol, Some('*'));
    }

    #[test]
    fn test_mass_modification_survives_rewrite() {
        let pep = parse_modified_sequence("PEPT[79.97]IDEK", 1000.0);
        let written = pep.sequence_with_symbols(false);
        assert_eq!(written, "PEPT[79.97]IDEK");
        let reparsed = parse_modified_sequence(&written, 1000.0);
        assert_eq!(reparsed.raw_sequence(), "PEPTIDEK");
        assert_eq!(reparsed.modifications(), pep.modifications());
    }
}
