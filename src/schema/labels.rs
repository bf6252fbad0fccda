use std::fmt;

/// Code assigned to a missing label or one outside [`ChangeType::ALL`].
pub const UNKNOWN_LABEL: i64 = -1;

/// The six change classes. Codes are fixed, not derived from data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Demolition,
    Road,
    Residential,
    Commercial,
    Industrial,
    MegaProjects,
}

impl ChangeType {
    pub const ALL: [ChangeType; 6] = [
        ChangeType::Demolition,
        ChangeType::Road,
        ChangeType::Residential,
        ChangeType::Commercial,
        ChangeType::Industrial,
        ChangeType::MegaProjects,
    ];

    pub fn code(self) -> i64 {
        match self {
            ChangeType::Demolition => 0,
            ChangeType::Road => 1,
            ChangeType::Residential => 2,
            ChangeType::Commercial => 3,
            ChangeType::Industrial => 4,
            ChangeType::MegaProjects => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChangeType::Demolition => "Demolition",
            ChangeType::Road => "Road",
            ChangeType::Residential => "Residential",
            ChangeType::Commercial => "Commercial",
            ChangeType::Industrial => "Industrial",
            ChangeType::MegaProjects => "Mega Projects",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn encode_label(label: Option<&str>) -> i64 {
    label
        .and_then(ChangeType::from_label)
        .map_or(UNKNOWN_LABEL, ChangeType::code)
}
