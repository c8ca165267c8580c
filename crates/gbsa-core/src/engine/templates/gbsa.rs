use crate::core::theory::LevelOfTheory;
use crate::engine::config::RunConfig;
use crate::engine::error::{PrepError, Result};
use std::fmt::Write;

/// Renders the MMPBSA.py input deck.
///
/// MM runs get the plain `&gb` namelist; semiempirical runs additionally switch on
/// `ifqnt` and describe the QM region. The QM charge balance is re-checked here so
/// that no deck is ever produced for an inconsistent QM region.
pub fn render_gbsa_input(config: &RunConfig) -> Result<String> {
    let header = match config.level_of_theory {
        LevelOfTheory::Mm => "Input file for running MM-GBSA",
        LevelOfTheory::Semiempirical(_) => "Input file for running QMMM-GBSA",
    };
    let frames = config.frames;

    let mut deck = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        deck,
        "{header}\n\
         &general\n\
         \x20  startframe={start},\n\
         \x20  endframe={end},\n\
         \x20  interval={interval},\n\
         \x20  verbose=1,\n\
         /\n\
         &gb\n\
         \x20  igb={igb},\n\
         \x20  saltcon={saltcon},\n",
        start = frames.start,
        end = frames.end,
        interval = frames.interval,
        igb = config.igb,
        saltcon = config.saltcon,
    );

    match (config.level_of_theory, &config.qm) {
        (LevelOfTheory::Mm, _) => {}
        (LevelOfTheory::Semiempirical(method), Some(qm)) => {
            let charges = qm.charges();
            charges.check_balanced()?;
            let _ = write!(
                deck,
                "   ifqnt=1,\n\
                 \x20  qm_theory=\"{method}\",\n\
                 \x20  qm_residues=\"{residues}\",\n\
                 \x20  qmcharge_com={com},\n\
                 \x20  qmcharge_rec={rec},\n\
                 \x20  qmcharge_lig={lig},\n",
                residues = qm.residues(),
                com = charges.complex,
                rec = charges.receptor,
                lig = charges.ligand,
            );
        }
        (LevelOfTheory::Semiempirical(_), None) => {
            return Err(PrepError::MissingField("qm_residues".to_string()));
        }
    }
    deck.push_str("/\n");
    Ok(deck)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::residues::parse_residue_range;
    use crate::engine::config::{FrameSelection, QmCharges, QmSettings, RunConfigBuilder};
    use std::path::PathBuf;

    fn builder() -> RunConfigBuilder {
        RunConfigBuilder::new()
            .directory(PathBuf::from("./FC_wt"))
            .complex_residues(parse_residue_range("1-723").unwrap())
            .receptor_residues(parse_residue_range("18-723").unwrap())
            .ligand_residues(parse_residue_range("1-17").unwrap())
            .frames(FrameSelection::new(5000, 50000, 100).unwrap())
            .igb(2)
            .saltcon(0.150)
            .submit_job(false)
    }

    #[test]
    fn mm_deck_matches_expected_text() {
        let config = builder().level_of_theory(LevelOfTheory::Mm).build().unwrap();
        assert_eq!(
            render_gbsa_input(&config).unwrap(),
            "Input file for running MM-GBSA\n\
             &general\n\
             \x20  startframe=5000,\n\
             \x20  endframe=50000,\n\
             \x20  interval=100,\n\
             \x20  verbose=1,\n\
             /\n\
             &gb\n\
             \x20  igb=2,\n\
             \x20  saltcon=0.15,\n\
             /\n"
        );
    }

    #[test]
    fn mm_deck_has_no_qm_tokens() {
        let config = builder().level_of_theory(LevelOfTheory::Mm).build().unwrap();
        let deck = render_gbsa_input(&config).unwrap().to_lowercase();
        for token in ["qm", "ifqnt", "qmcharge"] {
            assert!(!deck.contains(token), "MM deck contains '{}'", token);
        }
    }

    #[test]
    fn qm_deck_embeds_region_method_and_charges() {
        let qm = QmSettings::new(
            parse_residue_range("1-17").unwrap(),
            QmCharges {
                complex: 0,
                receptor: -1,
                ligand: 1,
            },
        )
        .unwrap();
        let config = builder()
            .level_of_theory(LevelOfTheory::Semiempirical("AM1"))
            .qm(qm)
            .build()
            .unwrap();
        let deck = render_gbsa_input(&config).unwrap();

        assert!(deck.starts_with("Input file for running QMMM-GBSA\n"));
        assert!(deck.contains("   igb=2,\n   saltcon=0.15,\n   ifqnt=1,\n"));
        assert!(deck.contains("qm_theory=\"AM1\""));
        assert!(deck.contains("qm_residues=\"1-17\""));
        assert!(deck.contains("qmcharge_com=0,"));
        assert!(deck.contains("qmcharge_rec=-1,"));
        assert!(deck.contains("qmcharge_lig=1,"));
        assert!(deck.ends_with("qmcharge_lig=1,\n/\n"));
    }

    #[test]
    fn zero_salt_renders_as_plain_number() {
        let config = builder()
            .saltcon(0.0)
            .level_of_theory(LevelOfTheory::Mm)
            .build()
            .unwrap();
        assert!(render_gbsa_input(&config).unwrap().contains("saltcon=0,"));
    }
}
