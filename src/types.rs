use plotters::drawing::DrawingAreaErrorKind;
use serde::Serialize;
use strum::Display;
use strum::VariantArray;

pub type Result<T, E = ReportError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to draw chart: {0}")]
    Plot(#[from] DrawingAreaErrorKind<std::io::Error>),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Builder(#[from] fieldx::error::FieldXError),
    #[error(transparent)]
    Cli(#[from] clap::Error),
    #[error(transparent)]
    ProgressTemplate(#[from] indicatif::style::TemplateError),
    #[error("{0}")]
    Other(String),
}

impl ReportError {
    pub fn config<S: ToString>(msg: S) -> Self {
        Self::Config(msg.to_string())
    }
}

macro_rules! reperr {
    ($($arg:tt)*) => {
        $crate::types::ReportError::Other(format!($($arg)*))
    };
}

pub(crate) use reperr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, VariantArray, Serialize)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, VariantArray)]
pub enum City {
    Cairo,
    Giza,
    Alex,
    Mansoura,
    Tanta,
    Sohag,
}

/// Product categories. Variants are kept in alphabetical order so that the derived `Ord` matches the order in which
/// groupings list them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, VariantArray, Serialize)]
pub enum Category {
    Books,
    Clothes,
    Electronics,
    Food,
    Home,
}

/// Customer age bucket. Bucket boundaries are right-closed: `(17, 25]`, `(25, 35]`, `(35, 45]`, `(45, 60]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, VariantArray, Serialize)]
pub enum AgeGroup {
    #[strum(serialize = "18-25")]
    #[serde(rename = "18-25")]
    From18To25,
    #[strum(serialize = "26-35")]
    #[serde(rename = "26-35")]
    From26To35,
    #[strum(serialize = "36-45")]
    #[serde(rename = "36-45")]
    From36To45,
    #[strum(serialize = "46-60")]
    #[serde(rename = "46-60")]
    From46To60,
}

impl AgeGroup {
    /// Bucket edges, lowest edge is exclusive.
    pub const EDGES: [u32; 5] = [17, 25, 35, 45, 60];

    /// Ages outside of `(17, 60]` belong to no group.
    pub fn from_age(age: u32) -> Option<AgeGroup> {
        Self::EDGES
            .windows(2)
            .position(|edge| age > edge[0] && age <= edge[1])
            .map(|idx| Self::VARIANTS[idx])
    }
}
