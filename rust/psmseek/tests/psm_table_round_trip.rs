use psmseek::data_sources::{
    PsmColumn,
    PsmTableReader,
    PsmTableWriter,
};
use psmseek::models::{
    FileRegistry,
    Match,
    ProteinSource,
};
use psmseek::{
    MatchCollection,
    Peptide,
    ScanIndex,
    ScoreType,
    SearchParameters,
    Spectrum,
    ZState,
};
use std::io::{
    Cursor,
    Write,
};
use std::path::Path;
use std::rc::Rc;

fn searched_collection() -> MatchCollection {
    let mut mc = MatchCollection::new(Rc::new(SearchParameters::default()), false);
    let spectrum = Rc::new(Spectrum::new(42, 501.26).with_charges(vec![2]));
    let z = ZState::from_mz(2, 501.26);
    for (seq, prot, sp, xcorr) in [
        ("PEPTIDEK", "sp|P1", 120.5, 3.25),
        ("LESLIEK", "sp|P2", 80.0, 2.5),
        ("ELVISLIVESK", "decoy_sp|P3", 40.0, 1.75),
    ] {
        let is_decoy = prot.starts_with("decoy_");
        let pep = Peptide::new(seq, 1000.5).with_source(ProteinSource::new(prot, 'K', '-'));
        let mut m = Match::new(pep, spectrum.clone(), z, is_decoy);
        m.set_score(ScoreType::Sp, sp);
        m.set_score(ScoreType::Xcorr, xcorr);
        m.set_by_ion_info(6, 14);
        m.set_ln_experiment_size(250f64.ln());
        mc.add_match(m.into_ref()).unwrap();
    }
    mc.force_scored_by(ScoreType::Sp);
    mc.force_scored_by(ScoreType::Xcorr);
    mc.populate_match_rank(ScoreType::Sp);
    mc.populate_match_rank(ScoreType::Xcorr);
    assert!(mc.calculate_delta_cn());
    mc
}

#[test]
fn test_tab_round_trip() {
    let mut original = searched_collection();
    let columns = PsmColumn::for_scored(|t| original.is_scored(t), false);
    let mut writer = PsmTableWriter::new(Vec::new(), columns);
    writer.write_header().unwrap();
    for m in original.iter_by(ScoreType::Xcorr).iter() {
        writer.write_match(&m.borrow(), None).unwrap();
    }
    assert_eq!(writer.rows_written(), 3);
    let bytes = writer.into_inner().unwrap();

    let mut registry = FileRegistry::new();
    let mut reader = PsmTableReader::from_reader(Cursor::new(bytes)).unwrap();
    let mut parsed = MatchCollection::new_post_process(Rc::new(SearchParameters::default()));
    let n = parsed
        .extend_tab_delimited(&mut reader, &mut registry, Path::new("search.target.txt"))
        .unwrap();
    assert_eq!(n, 3);
    assert!(parsed.is_scored(ScoreType::Sp));
    assert!(parsed.is_scored(ScoreType::Xcorr));
    assert!(parsed.is_scored(ScoreType::DeltaCn));

    let expected = original.iter_by(ScoreType::Xcorr);
    let got = parsed.iter_by(ScoreType::Xcorr);
    for (a, b) in expected.iter().zip(got.iter()) {
        let a = a.borrow();
        let b = b.borrow();
        assert_eq!(a.scan(), b.scan());
        assert_eq!(a.charge(), b.charge());
        assert_eq!(a.modified_sequence_with_symbols(), b.modified_sequence_with_symbols());
        assert_eq!(a.score(ScoreType::Xcorr), b.score(ScoreType::Xcorr));
        assert_eq!(a.score(ScoreType::Sp), b.score(ScoreType::Sp));
        assert_eq!(a.rank(ScoreType::Xcorr), b.rank(ScoreType::Xcorr));
        assert_eq!(a.rank(ScoreType::Sp), b.rank(ScoreType::Sp));
        assert_eq!(a.delta_cn(), b.delta_cn());
        assert_eq!(a.is_decoy(), b.is_decoy());
        assert_eq!(a.peptide().protein_ids(), b.peptide().protein_ids());
        assert_eq!(b.by_ion_matched(), 6);
        assert_eq!(b.by_ion_possible(), 14);
        assert!((b.ln_experiment_size() - 250f64.ln()).abs() < 1e-9);
    }
}

#[test]
fn test_merged_post_process_qvalues() {
    let mut registry = FileRegistry::new();
    let params = Rc::new(SearchParameters::default());
    let mut merged = MatchCollection::new_post_process(params.clone());

    for name in ["a.txt", "b.txt"] {
        let original = searched_collection();
        let columns = PsmColumn::for_scored(|t| original.is_scored(t), false);
        let mut writer = PsmTableWriter::new(Vec::new(), columns);
        writer.write_header().unwrap();
        for m in original.iter().iter() {
            writer.write_match(&m.borrow(), None).unwrap();
        }
        let bytes = writer.into_inner().unwrap();

        let mut part = MatchCollection::new_post_process(params.clone());
        let mut reader = PsmTableReader::from_reader(Cursor::new(bytes)).unwrap();
        part.extend_tab_delimited(&mut reader, &mut registry, Path::new(name))
            .unwrap();
        MatchCollection::merge(&part, &mut merged).unwrap();
    }
    assert_eq!(merged.len(), 6);
    assert_eq!(registry.len(), 2);

    merged.compute_decoy_qvalues().unwrap();
    let q = merged.extract_scores(ScoreType::DecoyXcorrQvalue);
    assert_eq!(q, vec![0.0, 0.0, 0.0, 0.0, 0.25, 0.5]);
}

#[test]
fn test_scan_index_on_disk() {
    let mut contents = String::new();
    let mut offsets = Vec::new();
    for scan in [3u32, 7, 11, 19] {
        offsets.push(contents.len() as u64);
        contents.push_str(&format!("S\t{}\t{}\t{}.5\n", scan, scan, 400 + scan));
        contents.push_str("Z\t2\t800.0\n");
        for k in 0..(scan as usize) {
            contents.push_str(&format!("{}.1 {}\n", 100 + k, 10 * k));
        }
    }

    let path = std::env::temp_dir().join(format!("psmseek_scan_index_{}.ms2", std::process::id()));
    {
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    let mut index = ScanIndex::from_path(&path).unwrap();
    assert_eq!(index.find_scan_offset(11).unwrap(), Some(offsets[2]));
    assert_eq!(index.find_scan_offset(3).unwrap(), Some(offsets[0]));
    assert_eq!(index.find_scan_offset(19).unwrap(), Some(offsets[3]));
    assert_eq!(index.find_scan_offset(8).unwrap(), None);
    let header = index.find_record(7).unwrap().unwrap();
    assert_eq!(header.precursor_mz, 407.5);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_mass_modifications_round_trip() {
    let params = Rc::new(SearchParameters::default());
    let mut mc = MatchCollection::new(params.clone(), false);
    let spectrum = Rc::new(Spectrum::new(77, 520.3).with_charges(vec![2]));
    let z = ZState::from_mz(2, 520.3);
    for delta in [79.97, 42.01] {
        let pep = Peptide::new("PEPTIDEK", 1000.5)
            .with_mass_modification(3, delta)
            .with_source(ProteinSource::new("sp|P1", 'K', '-'));
        let mut m = Match::new(pep, spectrum.clone(), z, false);
        m.set_score(ScoreType::Xcorr, 2.0);
        mc.add_match(m.into_ref()).unwrap();
    }
    mc.force_scored_by(ScoreType::Xcorr);
    mc.populate_match_rank(ScoreType::Xcorr);

    let columns = PsmColumn::for_scored(|t| mc.is_scored(t), false);
    let mut writer = PsmTableWriter::new(Vec::new(), columns);
    writer.write_header().unwrap();
    for m in mc.iter().iter() {
        writer.write_match(&m.borrow(), None).unwrap();
    }
    let bytes = writer.into_inner().unwrap();

    let mut registry = FileRegistry::new();
    let mut reader = PsmTableReader::from_reader(Cursor::new(bytes)).unwrap();
    let mut parsed = MatchCollection::new_post_process(params);
    parsed
        .extend_tab_delimited(&mut reader, &mut registry, Path::new("mods.txt"))
        .unwrap();

    let sequences: Vec<String> = parsed
        .iter()
        .iter()
        .map(|m| m.borrow().modified_sequence_with_symbols().to_string())
        .collect();
    assert_eq!(sequences, vec!["PEPT[79.97]IDEK", "PEPT[42.01]IDEK"]);

    // Same residue, different masses: not redundant.
    parsed.sort(ScoreType::Xcorr);
    assert_eq!(parsed.collapse_redundant_matches(), 0);
    assert_eq!(parsed.len(), 2);
}

#[test]
fn test_total_matches_column_is_written() {
    let table = "scan\tcharge\tspectrum neutral mass\txcorr score\txcorr rank\ttotal matches/spectrum\tsequence\tprotein id\n\
5\t2\t1000.0\t2.5\t1\t250\tPEPTIDEK\tprotA\n";
    let mut registry = FileRegistry::new();
    let mut reader = PsmTableReader::from_reader(Cursor::new(table)).unwrap();
    let mut parsed = MatchCollection::new_post_process(Rc::new(SearchParameters::default()));
    parsed
        .extend_tab_delimited(&mut reader, &mut registry, Path::new("total.txt"))
        .unwrap();
    assert!(!parsed.has_distinct_matches());

    let columns = PsmColumn::for_scored(|t| parsed.is_scored(t), false);
    let mut writer = PsmTableWriter::new(Vec::new(), columns);
    writer.write_header().unwrap();
    for m in parsed.iter().iter() {
        writer.write_match(&m.borrow(), None).unwrap();
    }
    let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap().split('\t').collect();
    let row: Vec<&str> = lines.next().unwrap().split('\t').collect();
    let col = header
        .iter()
        .position(|h| *h == "total matches/spectrum")
        .unwrap();
    assert_eq!(row[col], "250");
}
