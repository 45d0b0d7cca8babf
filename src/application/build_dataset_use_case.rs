// ============================================================
// Layer 2 — BuildDatasetUseCase
// ============================================================
// Fetches one published, preprocessed dataset archive and lays
// it out where `train --data-dir` expects it:
//
//   Step 1: Resolve (dataset, process type) → archive URL
//   Step 2: Create <data_folder>/<DATASET>/<process_type>
//   Step 3: Run the setup script (API credentials), if present
//   Step 4: wget the archive into ./temp/
//   Step 5: unzip it into the dataset folder
//   Step 6: Lift kaggle/temp/<run>/* up into the dataset folder
//
// Each external step is a blocking std::process::Command; a
// non-zero exit status aborts the build.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use crate::domain::dataset_kind::{DatasetKind, ProcessType};
use crate::error::DatasetError;

const TEMP_DIR: &str = "./temp/";

// ─── Archive table ────────────────────────────────────────────────────────────
const UCF101_5_FRAMES_UNIFORM: &str =
    "https://www.kaggleusercontent.com/kf/113750491/eyJhbGciOiJkaXIiLCJlbmMiOiJBMTI4Q0JDLUhTMjU2In0..sVUWgz6PD-iOFgBLORnxxQ.6xJ1TotkB85GzaNtzHf9Qbkkf2Va04Eyq-MESgW_ej9vFYUUi7NhB0He3Ts54j7z5HyG-2TlnrbOTWk2PkwvH4aFVzMy4UTsizIjy8jglK9-EtCaydcwO3f7AN0StoCMMqi8PL8KwD_OOdNTnzBEuyDVoGHPfYjI-sdMMdpW5mAHXyuyhn-h6QBUUZy-Zl4SMK5S90KqQ0ycx3RGEmRYWxR03Iz-WHXVDwjvuugOsx_ZdnNKD6OXGfEXUSNInBFy8KEBHQJXm7ilOVEnjAtFDIzQHhIAcK_lpEhKxJEACrFRMg4GYEEShl2WysNkpk0WmBxsash11JkLGROE4XOPTljUtg-X-gW85Ko5fdQWlRo2dFM45aFBHfJSBN2ELcQ8c1sdnPwuek1KT5TFKpCe3mBKMIt12mGps_cStXdZu_h7vloGXR22lw-WRpXoA3QtEIkohXz3ifKJyKfy243GfdI65ZovoFVH7uHMQrvM-GW2knhL_u7PdHyaky5jfqsZNQmRPeM6nF6_yYMXx9TAAYW8dkp5V7pRwtFB44xqjduLsM-dBse6YabfTmkQE2RkhKTz9RKBi9cIC9S9ltAC90uRDctKAYEK87DKBZW-VptkBNoqKd_n1yucgaJ2iWkgLNhJvA3qBEr_Z5BT2Ttc911sk5Vf-VagxtAMoWesBoMAkozgWCwh0H-r-WXvhnPu.7w-Ox8VE2awMs-OyFAPAzw/ucf101_processed.zip";
const UCF101_16_FRAMES_CONSE_RAND: &str =
    "https://www.kaggleusercontent.com/kf/113916742/eyJhbGciOiJkaXIiLCJlbmMiOiJBMTI4Q0JDLUhTMjU2In0..1hzx0WpsI15QlbkpLW9VvA.cHNnNDQLPa0cB-VFprG3papkWUDtKjGzQJ-8OTXdLd1Hkjcb1vZ6xm0HbepaPSkWn_slNyN7EOemzKfuriaBPG4SR84a76JxOfvRYshldkpzpUIQVRe-pXtPVvpaXu7qk1o1JoVUnvPCBtRh6XnPCy3CHaVqnVXjTjJkbVVqWsqsrMl9tukTIkqIAVmt6rfPN3ENZneETDyySPulSz-wth59LHy16FK_n7O4dPDyEi8qf1EqS12PWUJ6Npdup-vdx_iVTFmut3PO6znqUJXT4DNtAR2gEA7BqU-4DOiBo2Cifw9u-Yb3B3_TgKBb3aMbakqC6c_T8Lt0ofuGN9qoZMZ3oKtiNRDEATlz0nRBczKLLXa2YsxmUAXk-hz1rWHfHzYTE0vgmBdOz-jbpS1v0N9Jq2xRjxl96o1ozbhOnIxiYzlGgijkXdBMBwbxzr4YOkA7gWTiXnbzdEkgP5D-V72pbkRbhhAeqM21Sdr7et580MKaYTnLV0M_sAbriNtDqBuJhHa8UFEgvAZwLKLIHmIwqbIjYpiszftElHRupWQ_A9iUk-FlBV9JLjWtAVq8KfQKk7fjT_lwpQKAteNebTVAkrWTgFvnuI5SaeGnIaQ64kaPTlFLt6w9_Nh-E1VIz_o9lOOGcu7qfzIvjglcCi8WO1RUBVahMN4myigaXEUYcw4DraMSKqqPn2ZVa7bP.ObfG4p7CcPMS13hgEDcjLQ/ucf101_processed.zip";
const HMDB51_5_FRAMES_UNIFORM: &str =
    "https://www.kaggleusercontent.com/kf/113750535/eyJhbGciOiJkaXIiLCJlbmMiOiJBMTI4Q0JDLUhTMjU2In0..yEwntYz6GeduAXt4__Xw2Q.OL4z_mpXG_uWQNPFmXo70BTJ1SjZZMH750VZDa03Ss53n1-uNR6YPnkR-G83UxvEHyTZDi3HlNQ6BQ8DzoMWZOuJTDj_n_GjIc36W_CJLxn7ZIzxhuR3MPmvO3OoaTHqxXk_vKiJ0SMq5i-GIjAOFqAHgXeQV44E3Eraunzqwq9ugEtS-SuGFsl8LSB9tbaWjbZdP9Ou9ng8jBkGnX0DrUV8A0cVFOeypQ5yQFiQTqFd7cZP0e17Sl3g3_sFHft1OndXQuZc17rrOm1eatYtfCaczhHSSejrizMeCznGbYAWUYZW2ha9Zs8lfOcc4u5vPerOD3Bp9RHf2n1-ceK55SW_OetE-S6pvffJRF1voOyHY6W-Ceq1iuiiCLAB53Z5Cb--5SB1_mF6MxmbgHUBH4vrbycGfJ3b6xGmBQbC5QmwXsqaJBYh_5h7an6854Lf8FOoV9r2I4kcQUu8zKA4b1fhkEh8ChplowA__eE0cnlbt0WgEy_h-cmJYh_nzuECxueH8AEN3k21rE_vg8w7xos3b3KupUXhr4ahR180u_xg46RJSlD9CAvovHpKLv2HXH0qH5t8pTYnIx5wbnjAUuTKlA8RpmmpEzoYoocSs0VmnEq6LmlOFWI5_FxYA_OrX7YEcTwe6LBsH7ScfKhqjXidqeqppk9Y3cPO1YgOvNUjuWFM5nuZNHOuxTfxExzM.ISLmYBiObw1XRRQttF8wkA/hmdb51_processed.zip";
const HMDB51_5_FRAMES_CONSE_RAND: &str =
    "https://www.kaggleusercontent.com/kf/113879914/eyJhbGciOiJkaXIiLCJlbmMiOiJBMTI4Q0JDLUhTMjU2In0..5iXzBCRy7sZ3N5q-z6yBgg.26HMI-tUOIJFHmeKGvpojKVfnTcfgnltKEB5md40P9TTMlMRELBXHlb4P2CsNCd4yUtW_SBq4vJkhrfwAR03B34_coBzAO0b8e_qOuLZGWlKn-6R42DyIQtjFN6mDBBdO53k-Cf0XYU7ishW9LenZFsJCABuBIOIt2ymvYwW4OSyfYIWtqEghbhfz4nM0yCgD-VjSwOVrblCbUUJGH471jvbO_IM_SCPPvv72Zg7odmiskN-45Ia90YPEB7NvrIWCEHWe84f5pNbxqi4y0axnldB84dl8ADHSm2TCYP5LFSs4Srtr3Ozhp-2jejC7nwgsYtLvz9W7jBciWI1qayFusZSc6_ztYn21rVlS9VV7H098XiP0DO0shLLepa-SbbI8lA6fT5cPmo4ctihEvUmSDUeBO4ncketMMa6j0lhksn4oSfKEPdXzhLQWl-JR10fg6Ju1X0qQ1jfeB1jOJhexQKgVC7fPPl-fqO0SkPjo89CBRtxzs4ynJ3b11aK1VyaZjkh7FCh3WwPbPOcodu6XKJvlvu5wxHFRvUyw0q7mldvvj3JCHyZZc_-0IxoYupGRz3_Xn8eE9ygActFIbyM_MB6dirRV-hTSSTFcPtYCEZkQrDyNABPobkVbwz5VRRfaYd5GHFVFIJQlGChaIlNz9TkZG82X249PrvKaIjIZOqB1c7iInyhAYhOWg2qgmZX.-GzwJnio1CYEIbAV2mSdFg/hmdb51_processed.zip";
const HMDB51_16_FRAMES_CONSE_RAND: &str =
    "https://www.kaggleusercontent.com/kf/113883974/eyJhbGciOiJkaXIiLCJlbmMiOiJBMTI4Q0JDLUhTMjU2In0..JtSsSniQf2C5Grc9CHzfqw.UEPW-fcc52K0h7Cl74wHgG222au4caAdoZlAEzgY1qO7-iaCs_JxzP-z5ALN_BE3DExmBiPtVWEGZapZXa1IfRHpsuk6nYT8s79jVRal9vjkfHBHVdIcetvZqCTAeYbQ5pygd1bqXHwSbudd-k7MLmbHRQtClglfOpHq722Hb2Y_d4LMKf2m8oPbRCmq-0gQK2dUoEVj5RDx0MZ45jVVs7iVzt2FcIyRc1VnZJzxN7nzxkAaUvQ5OjcerynuCNKS5X-Z5gmlrmmSwEaARz3kx-GOTJK99ej_ha9IPNRP5c4P8G7df_zLSyCTWjdO4lwNR1IXR07c45RgCMkU-Mve0NuRU4EhNYP4tEqsPfiMI2OyWrRu3pkYsl-My3b6IvYrU8frH3eg4B38IASfHHh4KjgzdS_fZ25yZSjdHcIPDnBqT2EhfLQ0tdj3BTYV2mQ1AnyUGE5JuhwR9jAqssp9pwhrTnMhU0kkiOfYuIVV82vZ45mBcOU7i06K1w4BgRu_PtosfTnYQ_qcWZUKHO_cliQjpSr3prBIRjDr8qVXzm3iuplxtJE4OGsbsFvx9shk8DyWyqwfc6UmX0WDjU1aJiVW9pBJxyBsoe-3Xwnrm7dbKDJYldI92OzcW8vWbuaOssdZhXJYztOkFzV8Q52-4fQpwLnpT2G6uz1vr_N3jaQTbYVkIBNIYG-k7EeAQNom.Jc3C6v96eBZIq-EveBKeug/hmdb51_processed.zip";

/// Download URL of the processed archive for one dataset variant.
/// `ucf101` was never published with `5_frames_conse_rand`.
pub fn resolve_url(dataset: DatasetKind, process_type: ProcessType) -> Result<&'static str, DatasetError> {
    use DatasetKind::*;
    use ProcessType::*;

    match (dataset, process_type) {
        (Ucf101, FiveFramesUniform)      => Ok(UCF101_5_FRAMES_UNIFORM),
        (Ucf101, SixteenFramesConseRand) => Ok(UCF101_16_FRAMES_CONSE_RAND),
        (Hmdb51, FiveFramesUniform)      => Ok(HMDB51_5_FRAMES_UNIFORM),
        (Hmdb51, FiveFramesConseRand)    => Ok(HMDB51_5_FRAMES_CONSE_RAND),
        (Hmdb51, SixteenFramesConseRand) => Ok(HMDB51_16_FRAMES_CONSE_RAND),
        (Ucf101, FiveFramesConseRand)    => Err(DatasetError::UnsupportedVariant {
            dataset:      dataset.to_string(),
            process_type: process_type.to_string(),
        }),
    }
}

/// `<data_folder>/<DATASET>/<process_type>`, e.g. `./data/HMDB51/5_frames_uniform`
pub fn dataset_folder(data_folder: &Path, dataset: DatasetKind, process_type: ProcessType) -> PathBuf {
    data_folder
        .join(dataset.as_str().to_uppercase())
        .join(process_type.as_str())
}

/// File name the archive is saved under
pub fn archive_name(dataset: DatasetKind) -> String {
    format!("{}_processed.zip", dataset.as_str())
}

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct BuildDatasetConfig {
    pub data_folder:  PathBuf,
    pub setup_script: PathBuf,
    pub dataset:      DatasetKind,
    pub process_type: ProcessType,
}

// ─── BuildDatasetUseCase ──────────────────────────────────────────────────────
pub struct BuildDatasetUseCase {
    config: BuildDatasetConfig,
}

impl BuildDatasetUseCase {
    pub fn new(config: BuildDatasetConfig) -> Self {
        Self { config }
    }

    /// Download and unpack the archive. Returns the dataset folder.
    pub fn execute(&self) -> Result<PathBuf> {
        let cfg = &self.config;

        // ── Step 1: Resolve the archive before touching the disk ──────────────
        let url = resolve_url(cfg.dataset, cfg.process_type)?;

        // ── Step 2: Dataset folder ────────────────────────────────────────────
        let folder = dataset_folder(&cfg.data_folder, cfg.dataset, cfg.process_type);
        fs::create_dir_all(&folder)
            .with_context(|| format!("Cannot create '{}'", folder.display()))?;

        // ── Step 3: Credentials ───────────────────────────────────────────────
        if cfg.setup_script.exists() {
            run_command(Command::new("sh").arg(&cfg.setup_script))?;
        } else {
            tracing::warn!(
                "Setup script '{}' not found, downloading without it",
                cfg.setup_script.display()
            );
        }

        // ── Step 4: Download ──────────────────────────────────────────────────
        tracing::info!("Downloading the dataset...");
        fs::create_dir_all(TEMP_DIR)?;
        run_command(Command::new("wget").arg(url).arg("-P").arg(TEMP_DIR))?;

        // ── Step 5: Unzip ─────────────────────────────────────────────────────
        tracing::info!("Unzip the dataset...");
        let archive = Path::new(TEMP_DIR).join(archive_name(cfg.dataset));
        run_command(Command::new("unzip").arg("-qo").arg(&archive).arg("-d").arg(&folder))?;
        fs::remove_file(&archive)
            .with_context(|| format!("Cannot remove '{}'", archive.display()))?;

        // ── Step 6: Flatten ───────────────────────────────────────────────────
        flatten_archive_layout(&folder)?;

        tracing::info!("Dataset ready in '{}'", folder.display());
        Ok(folder)
    }
}

/// Run a command to completion; a non-zero exit is an error.
fn run_command(cmd: &mut Command) -> Result<()> {
    tracing::debug!("Running {:?}", cmd);
    let status = cmd
        .status()
        .with_context(|| format!("Cannot start {:?}", cmd.get_program()))?;
    if !status.success() {
        bail!("{:?} exited with {}", cmd.get_program(), status);
    }
    Ok(())
}

/// The archives unpack to `kaggle/temp/<run>/<content>`. Move every
/// `<content>` entry up into `folder` and drop the `kaggle` tree.
pub fn flatten_archive_layout(folder: &Path) -> Result<()> {
    let nested = folder.join("kaggle").join("temp");
    if !nested.is_dir() {
        tracing::debug!("No nested archive layout under '{}'", folder.display());
        return Ok(());
    }

    for run in fs::read_dir(&nested)? {
        let run = run?.path();
        if !run.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&run)? {
            let from = entry?.path();
            let Some(name) = from.file_name() else { continue };
            let to = folder.join(name);
            if to.is_dir() {
                fs::remove_dir_all(&to)?;
            }
            fs::rename(&from, &to)
                .with_context(|| format!("Cannot move '{}' to '{}'", from.display(), to.display()))?;
        }
    }

    fs::remove_dir_all(folder.join("kaggle"))?;
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_published_variant_resolves() {
        let pairs = [
            (DatasetKind::Ucf101, ProcessType::FiveFramesUniform),
            (DatasetKind::Ucf101, ProcessType::SixteenFramesConseRand),
            (DatasetKind::Hmdb51, ProcessType::FiveFramesUniform),
            (DatasetKind::Hmdb51, ProcessType::FiveFramesConseRand),
            (DatasetKind::Hmdb51, ProcessType::SixteenFramesConseRand),
        ];
        for (dataset, process_type) in pairs {
            let url = resolve_url(dataset, process_type).unwrap();
            assert!(url.starts_with("https://"));
            assert!(url.ends_with(&archive_name(dataset)));
        }
    }

    #[test]
    fn test_unpublished_variant_rejected() {
        let err = resolve_url(DatasetKind::Ucf101, ProcessType::FiveFramesConseRand).unwrap_err();
        assert!(matches!(err, DatasetError::UnsupportedVariant { .. }));
    }

    #[test]
    fn test_folder_layout() {
        let folder = dataset_folder(Path::new("./data/"), DatasetKind::Hmdb51, ProcessType::SixteenFramesConseRand);
        assert_eq!(folder, Path::new("./data/HMDB51/16_frames_conse_rand"));
    }

    #[test]
    fn test_flatten_lifts_nested_content() {
        let dir    = tempfile::tempdir().unwrap();
        let folder = dir.path();
        let run    = folder.join("kaggle").join("temp").join("run_1");
        fs::create_dir_all(run.join("frames")).unwrap();
        fs::write(run.join("frames").join("v_a_1.png"), b"x").unwrap();
        fs::write(run.join("classInd.txt"), b"1 walk").unwrap();

        flatten_archive_layout(folder).unwrap();

        assert!(folder.join("frames").join("v_a_1.png").exists());
        assert!(folder.join("classInd.txt").exists());
        assert!(!folder.join("kaggle").exists());
    }

    #[test]
    fn test_flatten_without_nested_layout_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), b"x").unwrap();
        flatten_archive_layout(dir.path()).unwrap();
        assert!(dir.path().join("keep.txt").exists());
    }
}
