use geo::Geometry;

/// Number of survey epochs carrying a construction status and a date.
pub const EPOCHS: usize = 5;

/// Number of per-record imagery statistics.
pub const IMAGERY_FEATURES: usize = 30;

pub const CHANGE_TYPE: &str = "change_type";
pub const URBAN_TYPE: &str = "urban_type";
pub const GEOGRAPHY_TYPE: &str = "geography_type";
pub const STATUS_PREFIX: &str = "change_status";
pub const DATE_PREFIX: &str = "date";
pub const IMAGERY_PREFIX: &str = "img_";

/// One polygon entity of a change-detection corpus.
///
/// Every attribute is optional at this level: absence is only an error once an operation
/// actually needs the value, and that operation reports which record and attribute failed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    /// Target label, only present in training data.
    pub change_type: Option<String>,
    /// Comma-separated urban tags.
    pub urban_type: Option<String>,
    /// Comma-separated geography tags.
    pub geography_type: Option<String>,
    /// Construction status per epoch, in chronological order.
    pub change_status: [Option<String>; EPOCHS],
    /// Raw date strings per epoch, in chronological order.
    pub dates: [Option<String>; EPOCHS],
    /// Imagery statistics, in the corpus' imagery column order. Missing values are NaN.
    pub imagery: Vec<f64>,
    /// Geometry in geographic (longitude, latitude) degrees.
    pub geometry: Option<Geometry<f64>>,
}

/// A batch of records together with the names of their imagery columns.
#[derive(Clone, Debug, Default)]
pub struct Corpus {
    pub imagery_columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Corpus {
    pub fn new(imagery_columns: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            imagery_columns,
            records,
        }
    }

    /// Builds a corpus whose imagery columns are named `img_00` .. `img_29`.
    pub fn with_default_imagery(records: Vec<Record>) -> Self {
        Self::new(default_imagery_columns(), records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn default_imagery_columns() -> Vec<String> {
    (0..IMAGERY_FEATURES)
        .map(|i| format!("{IMAGERY_PREFIX}{i:02}"))
        .collect()
}

/// Attribute name used in error messages for an epoch-indexed column.
pub(crate) fn epoch_attribute(prefix: &str, epoch: usize) -> String {
    format!("{prefix}[{epoch}]")
}
