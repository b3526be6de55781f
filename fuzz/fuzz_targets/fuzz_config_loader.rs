#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(cfg) = zhome_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    // A validated config must always convert into a valid controller config.
    let home = zhome_core::HomeCfg::from(&cfg.stable_z_home);
    assert!(home.validate().is_ok(), "validated config rejected: {home:?}");
    let _ = zhome_core::AxisCfg::from(&cfg.axis);
    let _ = zhome_core::DriftModel::from(&cfg.drift);
});
