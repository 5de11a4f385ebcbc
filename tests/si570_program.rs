mod common;

use crate::common::*;

use libsi570_rs::sim::SimulatedSi570;
use libsi570_rs::{
    Error, HsDiv, ProgramState, ProgrammerConfig, ReadMode, Result, SI570, find_params,
};

#[test]
fn enable_logging() {
    logging_init("libsi570_rs");
}

#[test]
fn program_100mhz() -> Result<()> {
    let (sim, mut si570) = factory_device();
    si570.set_frequency(100.0)?;

    assert_eq!(si570.state(), ProgramState::Done);
    assert!(!sim.freeze_dco());
    assert_eq!(sim.recalls(), 1);

    let image = sim.config_image();
    assert_eq!(image.n1(), 6);
    assert_eq!(image.hs_div()?, HsDiv::Div9);

    let output = sim.output_frequency().unwrap();
    log::trace!("Output: {output} MHz");
    assert!((output - 100.0).abs() < 1e-6);
    Ok(())
}

#[test]
fn program_range_of_frequencies() -> Result<()> {
    let (sim, mut si570) = factory_device();
    let nvm = sim.nvm();
    for frequency in [10.0, 25.0, 125.0, 156.25, 322.265625, 800.0] {
        si570.set_frequency(frequency)?;
        let params = find_params(frequency)?;
        assert_eq!(si570.n1(ReadMode::Fresh)?, params.n1);
        assert_eq!(si570.hs_div(ReadMode::Fresh)?, params.hs_div);
        let output = sim.output_frequency().unwrap();
        assert!((output - frequency).abs() < 1e-6, "{frequency} MHz: {output}");
    }
    // NVM is never written
    assert_eq!(sim.nvm(), nvm);
    Ok(())
}

#[test]
fn repeat_is_idempotent() -> Result<()> {
    let (sim, mut si570) = factory_device();
    si570.set_frequency(100.0)?;
    let first = sim.config_image();
    si570.set_frequency(100.0)?;
    assert_eq!(sim.config_image(), first);
    assert_eq!(sim.recalls(), 2);
    Ok(())
}

#[test]
fn access_order() -> Result<()> {
    let (sim, mut si570) = factory_device();
    si570.set_frequency(100.0)?;

    let mut expected = vec![('W', 135)];
    // Two busy polls, then clear
    expected.extend([('R', 135); 3]);
    expected.extend((7..=12).map(|register| ('R', register)));
    expected.extend([('R', 137), ('W', 137)]);
    expected.extend((7..=12).map(|register| ('W', register)));
    expected.extend((7..=12).map(|register| ('R', register)));
    expected.extend([('R', 137), ('W', 137), ('W', 135)]);
    assert_eq!(register_trace(&sim), expected);

    assert_eq!(writes_to(&sim, 135), vec![0x01, 0x40]);
    assert_eq!(writes_to(&sim, 137), vec![0x10, 0x00]);
    Ok(())
}

#[test]
fn infeasible_frequency_leaves_device_alone() -> Result<()> {
    let (sim, mut si570) = factory_device();
    si570.set_frequency(100.0)?;
    assert_eq!(si570.state(), ProgramState::Done);
    sim.clear_accesses();

    match si570.set_frequency(1500.0) {
        Err(Error::NoFeasibleParameters { frequency_mhz }) => assert_eq!(frequency_mhz, 1500.0),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(si570.state(), ProgramState::Idle);
    assert!(sim.accesses().is_empty());
    assert!((sim.output_frequency().unwrap() - 100.0).abs() < 1e-6);
    Ok(())
}

#[test]
fn invalid_config_is_rejected() {
    let (sim, _) = factory_device();
    for config in [
        ProgrammerConfig {
            factory_frequency_mhz: 0.0,
            ..fast_config()
        },
        ProgrammerConfig {
            reset_poll_max: 0,
            ..fast_config()
        },
    ] {
        match SI570::new(sim.clone(), SI570_BASE, config) {
            Err(Error::Argument(_)) => {}
            Err(other) => panic!("unexpected {other:?}"),
            Ok(_) => panic!("accepted an invalid config"),
        }
    }
}

#[test]
fn uncalibrated_device() {
    let sim = SimulatedSi570::uncalibrated(SI570_BASE, FXTAL_MHZ);
    let mut si570 = SI570::new(sim.clone(), SI570_BASE, fast_config()).unwrap();

    match si570.set_frequency(100.0) {
        Err(Error::UncalibratedDevice) => {}
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(si570.state(), ProgramState::Frozen);
    assert!(writes_to(&sim, 137).is_empty());
    assert!(!sim.freeze_dco());
}

#[test]
fn reset_never_clears() {
    let (sim, _) = factory_device();
    sim.set_reset_busy_polls(None);
    let config = ProgrammerConfig {
        reset_poll_max: 5,
        ..fast_config()
    };
    let mut si570 = SI570::new(sim.clone(), SI570_BASE, config).unwrap();

    match si570.set_frequency(100.0) {
        Err(Error::ResetTimeout { polls: 5 }) => {}
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(si570.state(), ProgramState::WaitReset);
    assert_eq!(register_trace(&sim).len(), 6);
    assert!(!sim.freeze_dco());
}

#[test]
fn zero_timeout() {
    let (sim, _) = factory_device();
    let config = ProgrammerConfig {
        operation_timeout_ms: 0,
        ..fast_config()
    };
    let mut si570 = SI570::new(sim.clone(), SI570_BASE, config).unwrap();

    match si570.set_frequency(100.0) {
        Err(Error::Timeout { state, .. }) => assert_eq!(state, ProgramState::Idle),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(si570.state(), ProgramState::Idle);
    assert!(sim.accesses().is_empty());
}

#[test]
fn slow_reset_times_out() {
    let (sim, _) = factory_device();
    sim.set_reset_busy_polls(None);
    let config = ProgrammerConfig {
        reset_poll_interval_ms: 5,
        reset_poll_max: 1000,
        operation_timeout_ms: 20,
        ..ProgrammerConfig::default()
    };
    let mut si570 = SI570::new(sim.clone(), SI570_BASE, config).unwrap();

    match si570.set_frequency(100.0) {
        Err(Error::Timeout { state, elapsed }) => {
            assert_eq!(state, ProgramState::WaitReset);
            assert!(elapsed.as_millis() >= 20);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!sim.freeze_dco());
}
