mod common;

use crate::common::*;

use libsi570_rs::{Error, FieldError, HsDiv, ReadMode, Result, WriteMode};

#[test]
fn enable_logging() {
    logging_init("libsi570_rs");
}

#[test]
fn cached_reads_do_not_touch_the_bus() -> Result<()> {
    let (sim, mut si570) = factory_device();

    // Nothing loaded yet, the shadow is all zero
    assert_eq!(si570.n1(ReadMode::Cached)?, 1);
    assert_eq!(si570.rfreq_raw(ReadMode::Cached)?, 0);
    assert!(sim.accesses().is_empty());

    assert_eq!(si570.n1(ReadMode::Fresh)?, 4);
    assert_eq!(si570.hs_div(ReadMode::Fresh)?, HsDiv::Div9);
    assert_eq!(register_trace(&sim), vec![('R', 7), ('R', 8), ('R', 7)]);
    Ok(())
}

#[test]
fn fresh_read_picks_up_device_changes() -> Result<()> {
    let (sim, mut si570) = factory_device();
    si570.refresh()?;
    assert_eq!(si570.hs_div_int(ReadMode::Cached)?, 9);

    // HS_DIV = 11, N1 high bits untouched
    sim.poke(7, (sim.register(7) & 0x1f) | (7 << 5));
    assert_eq!(si570.hs_div_int(ReadMode::Cached)?, 9);
    assert_eq!(si570.hs_div_int(ReadMode::Fresh)?, 11);
    assert_eq!(si570.n1(ReadMode::Cached)?, 4);
    Ok(())
}

#[test]
fn deferred_writes_wait_for_commit() -> Result<()> {
    let (sim, mut si570) = factory_device();
    si570.refresh()?;
    let before = sim.config_image();
    sim.clear_accesses();

    si570.set_n1(8, WriteMode::Deferred)?;
    si570.set_hs_div(HsDiv::Div5, WriteMode::Deferred)?;
    si570.set_rfreq(43.75, WriteMode::Deferred)?;
    assert!(sim.accesses().is_empty());
    assert_eq!(sim.config_image(), before);

    si570.commit()?;
    let after = sim.config_image();
    assert_eq!(after.n1(), 8);
    assert_eq!(after.hs_div()?, HsDiv::Div5);
    assert_eq!(after.rfreq_raw(), 0x2_bc00_0000);
    Ok(())
}

#[test]
fn immediate_hs_div_keeps_n1() -> Result<()> {
    let (sim, mut si570) = factory_device();
    si570.refresh()?;
    let rfreq = sim.config_image().rfreq_raw();
    sim.clear_accesses();

    si570.set_hs_div_int(6, WriteMode::Immediate)?;
    // Single register write plus read back
    assert_eq!(register_trace(&sim), vec![('W', 7), ('R', 7)]);

    let image = sim.config_image();
    assert_eq!(image.hs_div_int()?, 6);
    assert_eq!(image.n1(), 4);
    assert_eq!(image.rfreq_raw(), rfreq);
    Ok(())
}

#[test]
fn immediate_rfreq_keeps_n1() -> Result<()> {
    let (sim, mut si570) = factory_device();
    si570.refresh()?;
    sim.clear_accesses();

    si570.set_rfreq_raw(0x1a_2b3c_4d5e, WriteMode::Immediate)?;
    let trace = register_trace(&sim);
    assert_eq!(trace.len(), 10);
    assert!(trace.iter().all(|(_, register)| (8..=12).contains(register)));

    let image = sim.config_image();
    assert_eq!(image.rfreq_raw(), 0x1a_2b3c_4d5e);
    assert_eq!(image.n1(), 4);
    assert_eq!(image.hs_div()?, HsDiv::Div9);
    assert_eq!(si570.rfreq_raw(ReadMode::Fresh)?, 0x1a_2b3c_4d5e);
    Ok(())
}

#[test]
fn immediate_n1_keeps_neighbours() -> Result<()> {
    let (sim, mut si570) = factory_device();
    si570.refresh()?;
    let rfreq = sim.config_image().rfreq_raw();

    si570.set_n1(128, WriteMode::Immediate)?;
    let image = sim.config_image();
    assert_eq!(image.n1(), 128);
    assert_eq!(image.n1_raw(), 0x7f);
    assert_eq!(image.hs_div()?, HsDiv::Div9);
    assert_eq!(image.rfreq_raw(), rfreq);
    Ok(())
}

#[test]
fn invalid_values_are_rejected() {
    let (sim, mut si570) = factory_device();

    match si570.set_n1(3, WriteMode::Immediate) {
        Err(Error::Field(FieldError::OutOfRange { field: "N1", value: 3 })) => {}
        other => panic!("unexpected {other:?}"),
    }
    match si570.set_hs_div_int(8, WriteMode::Immediate) {
        Err(Error::Field(FieldError::OutOfRange { field: "HS_DIV", .. })) => {}
        other => panic!("unexpected {other:?}"),
    }
    match si570.set_rfreq(-1.0, WriteMode::Immediate) {
        Err(Error::Field(FieldError::NotRepresentable { field: "RFREQ", .. })) => {}
        other => panic!("unexpected {other:?}"),
    }
    assert!(sim.accesses().is_empty());
}

#[test]
fn reserved_hs_div_code_on_device() -> Result<()> {
    let (sim, mut si570) = factory_device();
    sim.poke(7, 4 << 5);
    match si570.hs_div(ReadMode::Fresh) {
        Err(Error::Field(FieldError::InvalidEncoding { field: "HS_DIV", raw: 4 })) => {}
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[test]
fn fxtal_from_factory_configuration() -> Result<()> {
    let (_sim, mut si570) = factory_device();
    let fxtal = si570.fxtal(ReadMode::Fresh)?;
    log::trace!("fxtal: {fxtal}");
    assert!((fxtal - FXTAL_MHZ).abs() < 1e-6);
    Ok(())
}

#[test]
fn control_bits() -> Result<()> {
    let (sim, mut si570) = factory_device();

    si570.set_freeze_dco(true)?;
    assert!(sim.freeze_dco());
    assert!(si570.freeze_dco()?);
    si570.set_freeze_dco(false)?;
    assert!(!si570.freeze_dco()?);

    si570.set_freeze_m(true)?;
    assert!(si570.freeze_m()?);
    si570.set_freeze_m(false)?;
    assert!(!si570.freeze_m()?);

    si570.recall()?;
    assert_eq!(sim.recalls(), 1);
    assert!(si570.reset_in_progress()?);
    assert!(si570.reset_in_progress()?);
    assert!(!si570.reset_in_progress()?);
    Ok(())
}

#[test]
fn freeze_m_held_across_strobes() -> Result<()> {
    let (sim, mut si570) = factory_device();
    si570.set_freeze_m(true)?;
    si570.recall()?;
    si570.new_freq()?;
    assert!(si570.freeze_m()?);
    assert_eq!(writes_to(&sim, 135), vec![0x20, 0x21, 0x60]);

    // RST_REG resets the control register as a whole
    si570.reset()?;
    assert!(!si570.freeze_m()?);
    si570.new_freq()?;
    assert_eq!(writes_to(&sim, 135)[3..], [0x80, 0x40]);
    Ok(())
}
