use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semiempirical Hamiltonians accepted by sqm for the QM region of a QM/MM-GBSA run.
pub const SEMIEMPIRICAL_METHODS: &[&str] = &[
    "AM1", "AM1-D*", "AM1-DH+", "DFTB", "DFTB2", "DFTB3", "MNDO", "PM3", "PM3-CARB1", "PM3-MAIS",
    "PM3-PDDG", "PM3-ZNB", "PM6", "PM6-D", "PM6-DH+", "RM1",
];

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("unknown level of theory '{0}'; expected 'MM' or one of: {list}", list = SEMIEMPIRICAL_METHODS.join(", "))]
pub struct UnknownLevelOfTheory(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOfTheory {
    /// Pure molecular mechanics.
    Mm,
    /// QM/MM with the QM region treated by the given semiempirical method.
    Semiempirical(&'static str),
}

impl LevelOfTheory {
    pub fn is_qm(&self) -> bool {
        matches!(self, LevelOfTheory::Semiempirical(_))
    }

    /// Uppercase token used in directory and file names (`MM`, `AM1`, `PM6-D`, ...).
    pub fn token(&self) -> &'static str {
        match self {
            LevelOfTheory::Mm => "MM",
            LevelOfTheory::Semiempirical(method) => method,
        }
    }
}

impl fmt::Display for LevelOfTheory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for LevelOfTheory {
    type Err = UnknownLevelOfTheory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper == "MM" {
            return Ok(LevelOfTheory::Mm);
        }
        SEMIEMPIRICAL_METHODS
            .iter()
            .copied()
            .find(|method| *method == upper)
            .map(LevelOfTheory::Semiempirical)
            .ok_or_else(|| UnknownLevelOfTheory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mm_case_insensitively() {
        assert_eq!("MM".parse::<LevelOfTheory>(), Ok(LevelOfTheory::Mm));
        assert_eq!(" mm ".parse::<LevelOfTheory>(), Ok(LevelOfTheory::Mm));
    }

    #[test]
    fn parses_semiempirical_methods_to_canonical_token() {
        let level: LevelOfTheory = "am1".parse().unwrap();
        assert_eq!(level, LevelOfTheory::Semiempirical("AM1"));
        assert_eq!(level.token(), "AM1");
        assert!(level.is_qm());

        let level: LevelOfTheory = "pm6-dh+".parse().unwrap();
        assert_eq!(level.to_string(), "PM6-DH+");
    }

    #[test]
    fn rejects_unknown_tokens() {
        let err = "B3LYP".parse::<LevelOfTheory>().unwrap_err();
        assert_eq!(err, UnknownLevelOfTheory("B3LYP".to_string()));
        assert!(err.to_string().contains("PM6"));
        assert!("".parse::<LevelOfTheory>().is_err());
    }

    #[test]
    fn mm_is_not_qm() {
        assert!(!LevelOfTheory::Mm.is_qm());
        assert_eq!(LevelOfTheory::Mm.token(), "MM");
    }
}
