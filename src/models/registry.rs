//! Name-based ansatz selection for the CLI and exported files.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::{
    Ansatz, Constant, Exponential, ExtMorse2, FermiDirac, Harmonic, HarmonicCubic, Linear, Morse2, Polynomial,
};

/// Built-in ansatz catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AnsatzKind {
    Constant,
    Linear,
    Harmonic,
    HarmonicCubic,
    Morse2,
    ExtMorse2,
    Exponential,
    FermiDirac,
    /// Polynomial without cross terms; order and dimension are given at build time.
    Polynomial,
}

impl AnsatzKind {
    /// Instantiate the ansatz.
    ///
    /// `poly_order` and `dim` only matter for [`AnsatzKind::Polynomial`].
    pub fn build(self, poly_order: usize, dim: usize) -> Box<dyn Ansatz> {
        match self {
            AnsatzKind::Constant => Box::new(Constant),
            AnsatzKind::Linear => Box::new(Linear),
            AnsatzKind::Harmonic => Box::new(Harmonic),
            AnsatzKind::HarmonicCubic => Box::new(HarmonicCubic),
            AnsatzKind::Morse2 => Box::new(Morse2),
            AnsatzKind::ExtMorse2 => Box::new(ExtMorse2),
            AnsatzKind::Exponential => Box::new(Exponential),
            AnsatzKind::FermiDirac => Box::new(FermiDirac),
            AnsatzKind::Polynomial => Box::new(Polynomial::new(poly_order, dim)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_builds_a_consistent_ansatz() {
        for kind in AnsatzKind::value_variants() {
            let ansatz = kind.build(2, 1);
            assert!(ansatz.num_params() >= 1);
            assert_eq!(ansatz.domain_dim(), 1);
            let value = kind.to_possible_value().unwrap();
            if *kind != AnsatzKind::Polynomial {
                assert_eq!(value.get_name(), ansatz.name());
            }
        }
    }
}
