use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use seubench_error::BenchError;

/// The benchmark programs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    #[default]
    Aes,
    Cache,
    Matrix,
    Qsort,
}

impl KernelKind {
    pub const ALL: [Self; 4] = [Self::Aes, Self::Cache, Self::Matrix, Self::Qsort];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aes => "aes",
            Self::Cache => "cache",
            Self::Matrix => "matrix",
            Self::Qsort => "qsort",
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aes" => Ok(Self::Aes),
            "cache" => Ok(Self::Cache),
            "matrix" | "mm" => Ok(Self::Matrix),
            "qsort" | "quicksort" => Ok(Self::Qsort),
            _ => Err(BenchError::UnknownKernel { name: s.to_owned() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_display() {
        for kind in KernelKind::ALL {
            assert_eq!(kind.to_string().parse::<KernelKind>().ok(), Some(kind), "case={kind}");
        }
    }

    #[test]
    fn aliases_and_unknown_names() {
        assert_eq!("MM".parse::<KernelKind>().ok(), Some(KernelKind::Matrix), "case=mm_alias");
        assert_eq!(
            "QuickSort".parse::<KernelKind>().ok(),
            Some(KernelKind::Qsort),
            "case=quicksort_alias"
        );
        let err = "fft".parse::<KernelKind>().expect_err("unknown");
        assert!(matches!(err, BenchError::UnknownKernel { .. }), "case=unknown");
    }
}
