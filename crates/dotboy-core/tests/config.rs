use std::{ffi::OsStr, fs};

use dotboy_core::{
    Error,
    config::{EmulationModel, EmulatorConfig, default_config_path},
    hardware::Model,
    palette::DMG_PALETTE,
};
use tempfile::tempdir;

#[test]
fn empty_file_gives_defaults() {
    let cfg = EmulatorConfig::from_toml("").unwrap();
    assert_eq!(cfg, EmulatorConfig::default());
    assert_eq!(cfg.model, EmulationModel::Auto);
    assert_eq!(cfg.dmg_palette, DMG_PALETTE);
    assert!(cfg.autosave);
}

#[test]
fn partial_file_overrides_only_named_keys() {
    let cfg = EmulatorConfig::from_toml(
        r#"
model = "cgb"
autosave = false
cgb_bootrom_path = "/roms/cgb_boot.bin"
"#,
    )
    .unwrap();
    assert_eq!(cfg.model, EmulationModel::Cgb);
    assert!(!cfg.autosave);
    assert_eq!(cfg.dmg_palette, DMG_PALETTE);
    assert_eq!(
        cfg.bootrom_path(Model::Cgb).unwrap().to_str(),
        Some("/roms/cgb_boot.bin")
    );
    assert!(cfg.bootrom_path(Model::Dmg).is_none());
}

#[test]
fn unknown_model_is_a_parse_error() {
    let err = EmulatorConfig::from_toml(r#"model = "gba""#).unwrap_err();
    assert!(matches!(err, Error::ConfigParse(_)), "{err}");
}

#[test]
fn auto_model_follows_the_cartridge() {
    assert_eq!(EmulationModel::Auto.resolve(true), Model::Cgb);
    assert_eq!(EmulationModel::Auto.resolve(false), Model::Dmg);
    assert_eq!(EmulationModel::Dmg.resolve(true), Model::Dmg);
    assert_eq!(EmulationModel::Cgb.resolve(false), Model::Cgb);
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("dotboy.toml");
    let cfg = EmulatorConfig {
        model: EmulationModel::Dmg,
        dmg_palette: [0xFFFFFF, 0xAAAAAA, 0x555555, 0x000000],
        dmg_bootrom_path: Some("dmg_boot.bin".into()),
        cgb_bootrom_path: None,
        autosave: false,
    };
    cfg.save_to_file(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("model = \"dmg\""), "{text}");

    assert_eq!(EmulatorConfig::load_from_file(&path).unwrap(), cfg);
}

#[test]
fn load_or_default_tolerates_missing_and_broken_files() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    assert_eq!(
        EmulatorConfig::load_or_default(&missing),
        EmulatorConfig::default()
    );

    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "model = [").unwrap();
    assert_eq!(
        EmulatorConfig::load_or_default(&broken),
        EmulatorConfig::default()
    );
    assert!(matches!(
        EmulatorConfig::load_from_file(&broken),
        Err(Error::ConfigParse(_))
    ));
}

#[test]
fn missing_file_error_names_the_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gone.toml");
    match EmulatorConfig::load_from_file(&path) {
        Err(Error::Io { path: p, source }) => {
            assert_eq!(p, path);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn default_path_names_the_config_file() {
    let path = default_config_path();
    assert_eq!(path.file_name(), Some(OsStr::new("dotboy.toml")));
}
