//! The full merge run
//!
//! Phases run strictly one after another: load base, read all mods, resolve
//! parameters, resolve files, rewrite the parameter file, write the archive.

use crate::archive::{assemble, read_base_member};
use crate::aux_files::AuxFileRegistry;
use crate::config::MergeConfig;
use crate::conflict::{aggregate, chosen_values, resolve_params, ConflictMap, Decider};
use crate::document::BaseDocument;
use crate::error::Result;
use crate::intake::{collect_mods, Intake, ParamFileMatcher, SkippedMod};
use crate::merger::merge;
use crate::params::ParamSet;
use crate::report::{decisions, MergeReport};
use crate::staging::StagingArea;
use tracing::info;

/// How a run ended, short of an error
#[derive(Debug)]
pub enum MergeOutcome {
    /// The output archive was written
    Written(MergeReport),
    /// The mods folder held nothing usable
    NoMods { skipped: Vec<SkippedMod> },
    /// Mods were read but nothing differs from the base
    NoChanges { skipped: Vec<SkippedMod> },
}

/// Base document and every mod, read and compared but not yet resolved
///
/// Owns the staging area; staged files disappear when this is dropped.
#[derive(Debug)]
pub struct Analysis {
    pub base: BaseDocument,
    pub base_params: ParamSet,
    pub intake: Intake,
    pub registry: AuxFileRegistry,
    /// Changed keys with their candidates, ascending by key
    pub param_changes: ConflictMap<String>,
    staging: StagingArea,
}

impl Analysis {
    /// True when no mod supplied a parameter file
    pub fn found_nothing(&self) -> bool {
        self.intake.found_nothing()
    }

    /// True when there is nothing to write
    pub fn has_changes(&self) -> bool {
        !self.param_changes.is_empty() || !self.registry.is_empty()
    }

    /// Remove staged files now instead of on drop
    pub fn close(self) -> Result<()> {
        self.staging.close()
    }
}

/// Load the base, read every mod and compute per-key differences
///
/// A missing base archive or parameter file is fatal. Unreadable mods are
/// skipped and listed in `intake.skipped`.
pub fn analyze(config: &MergeConfig) -> Result<Analysis> {
    info!(path = %config.base_archive.display(), "loading base parameter file");
    let bytes = read_base_member(&config.base_archive, &config.base_param_path)?;
    let base = BaseDocument::from_bytes(&bytes);
    let base_params = base.params();
    info!(params = base_params.len(), "base parameter file loaded");

    let mut staging = StagingArea::new()?;
    let mut registry = AuxFileRegistry::new();
    let matcher = ParamFileMatcher::new(&config.param_file_name);

    info!(path = %config.mods_dir.display(), "extracting mods");
    let intake = collect_mods(&config.mods_dir, &matcher, &mut staging, &mut registry)?;

    let param_changes = aggregate(&base_params, &intake.param_sources);
    info!(
        mods = intake.param_sources.len(),
        changed = param_changes.len(),
        files = registry.len(),
        "analysis complete"
    );

    Ok(Analysis {
        base,
        base_params,
        intake,
        registry,
        param_changes,
        staging,
    })
}

/// Run a complete merge, asking `decider` about every conflict
pub fn run_merge<D: Decider + ?Sized>(config: &MergeConfig, decider: &mut D) -> Result<MergeOutcome> {
    let analysis = analyze(config)?;
    let skipped = analysis.intake.skipped.clone();

    if analysis.found_nothing() {
        info!("no usable mods found");
        return Ok(MergeOutcome::NoMods { skipped });
    }
    if !analysis.has_changes() {
        info!("no differences from the base file");
        return Ok(MergeOutcome::NoChanges { skipped });
    }

    info!("resolving parameter changes");
    let resolved_params = resolve_params(&analysis.param_changes, decider)?;

    info!("resolving additional files");
    let resolved_files = analysis.registry.resolve(decider)?;

    let merged = merge(&analysis.base, &chosen_values(&resolved_params));
    let archive = assemble(
        &config.output_archive,
        &config.output_param_path,
        merged.to_text().as_bytes(),
        &chosen_values(&resolved_files),
    )?;

    let report = MergeReport::new(
        decisions(&resolved_params),
        decisions(&resolved_files),
        merged.stats,
        archive,
        skipped,
    );
    analysis.close()?;

    Ok(MergeOutcome::Written(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::read_archive;
    use crate::archive::tests::zip_bytes;
    use crate::conflict::{ConflictRequest, FirstChoice, ScriptedChoices};
    use crate::config::PARAM_PATH;
    use crate::error::Error;
    use std::fs;
    use std::path::Path;

    const BASE: &str = "sub Main()\n{\n    Param(\"HP\",100)\n    Param(\"MP\",10)\n}\n";

    fn setup(root: &Path) -> MergeConfig {
        let config = MergeConfig::for_root(root);
        config.create_dirs().unwrap();
        fs::write(&config.base_archive, zip_bytes(&[(PARAM_PATH, BASE)])).unwrap();
        config
    }

    fn add_mod(config: &MergeConfig, name: &str, members: &[(&str, &str)]) {
        fs::write(config.mods_dir.join(name), zip_bytes(members)).unwrap();
    }

    fn output_member(config: &MergeConfig, member: &str) -> Option<Vec<u8>> {
        read_archive(&config.output_archive)
            .unwrap()
            .into_iter()
            .find(|e| e.path == member)
            .map(|e| e.data)
    }

    #[test]
    fn test_missing_base_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = MergeConfig::for_root(dir.path());

        let err = run_merge(&config, &mut FirstChoice).unwrap_err();
        assert!(matches!(err, Error::BaseArchiveMissing(_)));
        assert!(!config.output_archive.exists());
    }

    #[test]
    fn test_no_mods() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());

        let outcome = run_merge(&config, &mut FirstChoice).unwrap();
        assert!(matches!(outcome, MergeOutcome::NoMods { .. }));
        assert!(!config.output_archive.exists());
    }

    #[test]
    fn test_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        add_mod(&config, "same.zip", &[(PARAM_PATH, BASE)]);

        let outcome = run_merge(&config, &mut FirstChoice).unwrap();
        assert!(matches!(outcome, MergeOutcome::NoChanges { .. }));
        assert!(!config.output_archive.exists());
    }

    #[test]
    fn test_auto_applied_change_and_new_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        add_mod(&config, "a.zip", &[(PARAM_PATH, "Param(\"HP\",150)\n")]);
        add_mod(&config, "b.zip", &[(PARAM_PATH, "Param(\"MANA\",50)\n")]);

        let mut decider = |_: &ConflictRequest<'_>| -> crate::Result<usize> {
            panic!("no conflicts expected")
        };
        let outcome = run_merge(&config, &mut decider).unwrap();

        let report = match outcome {
            MergeOutcome::Written(report) => report,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(report.params.len(), 2);
        assert_eq!(report.conflicts(), 0);
        assert_eq!(report.stats.replaced, 1);
        assert_eq!(report.stats.inserted, 1);

        let text = String::from_utf8(output_member(&config, PARAM_PATH).unwrap()).unwrap();
        assert_eq!(
            text,
            "sub Main()\n{\n    Param(\"HP\",150)\n    Param(\"MP\",10)\n    Param(\"MANA\",50)\n}\n"
        );
    }

    #[test]
    fn test_conflicts_use_decider() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        add_mod(
            &config,
            "a.zip",
            &[(PARAM_PATH, "Param(\"HP\",150)\n"), ("data/shared.txt", "from a")],
        );
        add_mod(
            &config,
            "b.zip",
            &[(PARAM_PATH, "Param(\"HP\",200)\n"), ("data/shared.txt", "from a")],
        );

        // HP is resolved first (parameters before files): pick b, then pick a
        let mut decider = ScriptedChoices::new([1, 0]);
        let outcome = run_merge(&config, &mut decider).unwrap();
        let report = match outcome {
            MergeOutcome::Written(report) => report,
            other => panic!("unexpected outcome: {other:?}"),
        };

        assert_eq!(report.conflicts(), 2);
        assert_eq!(report.params[0].source, "b.zip");
        assert_eq!(report.files[0].source, "a.zip");

        let text = String::from_utf8(output_member(&config, PARAM_PATH).unwrap()).unwrap();
        assert!(text.contains("Param(\"HP\",200)"));
        assert!(!text.contains("Param(\"HP\",150)"));
        assert_eq!(output_member(&config, "data/shared.txt").unwrap(), b"from a");
    }

    #[test]
    fn test_only_aux_files_is_no_mods() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        add_mod(&config, "tex.zip", &[("textures/x.dds", "x")]);

        let outcome = run_merge(&config, &mut FirstChoice).unwrap();
        assert!(matches!(outcome, MergeOutcome::NoMods { .. }));
        assert!(!config.output_archive.exists());
    }

    #[test]
    fn test_aux_files_alongside_unchanged_params_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        add_mod(&config, "tex.zip", &[(PARAM_PATH, BASE), ("textures/x.dds", "x")]);

        let outcome = run_merge(&config, &mut FirstChoice).unwrap();
        assert!(matches!(outcome, MergeOutcome::Written(_)));

        let text = String::from_utf8(output_member(&config, PARAM_PATH).unwrap()).unwrap();
        assert_eq!(text, BASE);
        assert_eq!(output_member(&config, "textures/x.dds").unwrap(), b"x");
    }

    #[test]
    fn test_skipped_mod_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        fs::write(config.mods_dir.join("bad.7z"), "not 7z").unwrap();
        add_mod(&config, "good.zip", &[(PARAM_PATH, "Param(\"MP\",11)\n")]);

        let outcome = run_merge(&config, &mut FirstChoice).unwrap();
        let report = match outcome {
            MergeOutcome::Written(report) => report,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].source, "bad.7z");
    }

    #[test]
    fn test_analysis_exposes_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        add_mod(&config, "a.zip", &[(PARAM_PATH, "Param(\"HP\",1)\n")]);
        add_mod(&config, "b.zip", &[(PARAM_PATH, "Param(\"HP\",2)\n")]);

        let analysis = analyze(&config).unwrap();
        assert_eq!(analysis.base_params.len(), 2);
        assert_eq!(analysis.param_changes["HP"].len(), 2);
        assert!(analysis.has_changes());
        analysis.close().unwrap();
    }
}
