pub mod psm_table;
pub mod scan_index;

pub use psm_table::{
    PsmColumn,
    PsmRecord,
    PsmRow,
    PsmTableReader,
    PsmTableWriter,
};
pub use scan_index::{
    ScanIndex,
    SpectrumRecordHeader,
};
