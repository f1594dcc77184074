use super::MatchCollection;
use crate::data_sources::{
    PsmRecord,
    PsmTableReader,
};
use crate::errors::{
    DataProcessingError,
    Result,
};
use crate::models::{
    FileRegistry,
    Match,
    ScoreType,
};
use std::io::Read;
use std::path::Path;
use tracing::{
    debug,
    info,
};

/// Score types whose scored bit follows the columns of each parsed row.
const ROW_SCORED_TYPES: [ScoreType; 12] = [
    ScoreType::Sp,
    ScoreType::Xcorr,
    ScoreType::Evalue,
    ScoreType::DecoyXcorrQvalue,
    ScoreType::LogpBonfWeibullXcorr,
    ScoreType::PercolatorScore,
    ScoreType::PercolatorQvalue,
    ScoreType::LogpQvalueWeibullXcorr,
    ScoreType::QrankerScore,
    ScoreType::QrankerQvalue,
    ScoreType::BaristaScore,
    ScoreType::BaristaQvalue,
];

impl MatchCollection {
    /// Reads every remaining row of `reader` into this post-process
    /// collection. Returns the number of matches added.
    pub fn extend_tab_delimited<R: Read>(
        &mut self,
        reader: &mut PsmTableReader<R>,
        registry: &mut FileRegistry,
        path: &Path,
    ) -> Result<usize> {
        self.require_post_process(path)?;
        let file_index = registry.find_or_insert(path);
        let decoy_prefix = self.params.decoy_prefix.clone();

        let mut count = 0;
        while reader.advance()? {
            let record = PsmRecord::from_row(&reader.row(), &decoy_prefix)?;
            self.push_record(record, file_index)?;
            count += 1;
            if count % 1000 == 0 {
                info!("Parsed {} PSMs from {}", count, path.display());
            }
        }
        debug!("Read {} PSMs from {}", count, path.display());
        Ok(count)
    }

    /// As [`MatchCollection::extend_tab_delimited`], for rows parsed ahead
    /// of time.
    pub fn extend_from_records(
        &mut self,
        records: Vec<PsmRecord>,
        registry: &mut FileRegistry,
        path: &Path,
    ) -> Result<usize> {
        self.require_post_process(path)?;
        let file_index = registry.find_or_insert(path);

        let mut count = 0;
        for record in records {
            self.push_record(record, file_index)?;
            count += 1;
            if count % 1000 == 0 {
                info!("Loaded {} PSMs from {}", count, path.display());
            }
        }
        Ok(count)
    }

    fn require_post_process(&self, path: &Path) -> Result<()> {
        if !self.post_process {
            return Err(DataProcessingError::NotPostProcess {
                context: format!("cannot read {} into a search collection", path.display()),
            }
            .into());
        }
        Ok(())
    }

    fn push_record(&mut self, record: PsmRecord, file_index: usize) -> Result<()> {
        self.check_capacity(1, "too many PSMs in post-process input")?;
        self.z_state = record.z_state;

        for t in ROW_SCORED_TYPES {
            self.set_scored(t, record.scored_types.contains(&t));
        }
        if record.delta_cn.is_some() {
            self.set_scored(ScoreType::DeltaCn, true);
        }

        let delta_cn = record.delta_cn.unwrap_or(0.0);
        let ln_delta_cn = if delta_cn > 0.0 { delta_cn.ln() } else { 0.0 };
        let delta_lcn = record.delta_lcn.unwrap_or(ln_delta_cn);

        let ln_experiment_size = match (record.distinct_matches, record.total_matches) {
            (Some(distinct), _) => {
                self.has_distinct_matches = true;
                distinct.ln()
            }
            (None, Some(total)) => total.ln(),
            (None, None) => 0.0,
        };

        let mut m = Match::new_post_process(
            record.peptide,
            record.spectrum,
            record.z_state,
            record.is_decoy,
        );
        for t in ScoreType::ALL {
            if let Some(score) = record.scores[t.index()] {
                m.set_score(t, score);
            }
            let rank = record.ranks[t.index()];
            if rank > 0 {
                m.set_rank(t, rank);
            }
        }
        m.set_delta_cn(delta_cn);
        m.set_delta_lcn(delta_lcn);
        m.set_ln_experiment_size(ln_experiment_size);
        m.set_by_ion_info(
            record.by_ions_matched.unwrap_or(0),
            record.by_ions_total.unwrap_or(0),
        );
        m.set_match_counts(record.num_target_matches, record.num_decoy_matches);
        m.set_cleavage_type(record.cleavage_type);
        m.set_file_index(file_index);

        self.matches.push(m.into_ref());
        self.last_sorted = None;
        Ok(())
    }
}
