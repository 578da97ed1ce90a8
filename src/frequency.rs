///! Frequency / delay calculations
///!
///! Turns [`DeviceParams`] into a register image. All arithmetic is done on
///! integer Hz and ps, delay quantization allows 0.1ps of error.

use log::{ debug, warn };

use crate::{ config::*, constants::*, errors::*, refin::InputDivide, register::* };


/// Number of `num/den` ps quanta in `x_ps`, if `x_ps` is a multiple of the
/// quantum within the delay tolerance.
fn quantize(x_ps: u64, num: u64, den: u64) -> Option<u64> {
    let x = x_ps as u128 * den as u128;
    let q = num as u128;
    let n = (x + q / 2) / q;
    let nq = n * q;
    let err = if x > nq { x - nq } else { nq - x };
    if err * 10 <= den as u128 * DELAY_TOLERANCE_DECI_PS as u128 {
        Some(n as u64)
    } else {
        None
    }
}

/// Slip steps: multiples of the effective input period
fn slip_steps(slip_ps: u32, effective_hz: u64) -> Option<u64> {
    quantize(slip_ps as u64, PS_PER_SEC, effective_hz)
}

/// Coarse delay steps: multiples of half the input clock period
fn digital_delay_steps(delay_ps: u32, input_hz: u64) -> Option<u64> {
    quantize(delay_ps as u64, PS_PER_SEC, 2 * input_hz)
}

/// Fine delay steps: multiples of 25ps
fn analog_delay_steps(delay_ps: u32) -> Option<u64> {
    quantize(delay_ps as u64, ANALOG_DELAY_STEP_PS, 1)
}

fn invalid<T>(msg: core::fmt::Arguments) -> Result<T> {
    warn!("hmc7043 config rejected: {}", msg);
    Err(Error::InvalidArgument)
}


impl RegisterImage {

    /// Validates `params` and derives a complete register image from them,
    /// reserved defaults included. No hardware is touched.
    pub fn configure(params: &DeviceParams) -> Result<RegisterImage> {
        validate(params)?;

        let mut img = RegisterImage::with_defaults();
        img.configure_globals(params)?;
        for (ch, chp) in params.channels.iter().enumerate() {
            img.configure_channel(ch, chp, params)?;
        }
        Ok(img)
    }

    fn configure_globals(self: &mut Self, params: &DeviceParams) -> Result<()> {
        let effective = params.clkin.effective_hz();
        let timer = effective / params.sysref.freq_hz;

        if let Some(sel) = params.gpi.select() {
            self.set(GpiEnable(true)).set(GpiSelect(sel));
        }

        if let Some(sel) = params.gpo.select() {
            self.set(GpoEnable(true))
                .set(GpoCmos(params.gpo_mode == OutputMode::Cmos))
                .set(GpoSelect(sel));
        }

        self.set(SdataEnable(true))
            .set(SdataCmos(params.sdata_mode == OutputMode::Cmos))
            .set_sysref_timer(timer as u16)
            .set(PulseGenMode(params.sysref.mode.bits()))
            .set(SyncInvertPolarity(params.sysref.inverted_sync))
            .set(SyncRetime(params.sysref.sync_retime));

        let has_sysref = params.channels.iter().any(|c| c.mode == ChannelMode::Sysref);
        self.set(SysrefTimerEnable(has_sysref))
            .set(RfReseederEnable(has_sysref));

        self.set(ClkInBufferEnable(params.clkin_buffer.enabled))
            .set(ClkInBufferMode(params.clkin_buffer.mode_bits()))
            .set(SyncInBufferEnable(params.syncin_buffer.enabled))
            .set(SyncInBufferMode(params.syncin_buffer.mode_bits()));

        let analog_delay_used = params.channels.iter()
            .any(|c| c.is_used() && c.analog_delay_ps > 0);

        self.set(LowFreqClkIn(params.clkin.low_frequency()))
            .set(ClkInDivideBy2(params.clkin.divide == InputDivide::DivideBy2))
            .set(AnalogDelayLowPower(!analog_delay_used))
            .set(HighPerformancePath(true))
            .set(AlarmMaskSysrefSync(params.alarm_mask.sysref_sync))
            .set(AlarmMaskClockPhase(params.alarm_mask.clock_phase))
            .set(AlarmMaskSyncRequest(params.alarm_mask.sync_request));

        debug!("hmc7043 globals: effective {} Hz, sysref timer {}", effective, timer);
        Ok(())
    }

    fn configure_channel(self: &mut Self, ch: usize, chp: &ChannelParams, params: &DeviceParams) -> Result<()> {
        if !chp.is_used() {
            self.set_ch(ch, StartupMode(0));
            return Ok(());
        }

        let effective = params.clkin.effective_hz();
        let divider = effective / chp.freq_hz;

        let slip = match slip_steps(chp.slip_quantum_ps, effective) {
            Some(s) => s,
            None => return invalid(format_args!("ch{} slip {}ps", ch, chp.slip_quantum_ps)),
        };
        let coarse = digital_delay_steps(chp.digital_delay_ps, params.clkin.freq_hz).unwrap_or(0);
        let fine = analog_delay_steps(chp.analog_delay_ps).unwrap_or(0);

        if slip > 1 {
            let multi_slip = slip + divider / 2;
            if multi_slip > MULTI_SLIP_MAX {
                return invalid(format_args!("ch{} multi-slip {} out of range", ch, multi_slip));
            }
            self.set_multi_slip(ch, multi_slip as u16)
                .set_ch(ch, MultiSlipEnable(true));
        } else {
            self.set_ch(ch, SlipEnable(slip == 1));
        }

        let is_sysref = chp.mode == ChannelMode::Sysref;
        let dynamic = is_sysref && chp.dynamic_driver;

        self.set_divider(ch, divider as u16)
            .set_ch(ch, CoarseDigitalDelay(coarse as u8))
            .set_ch(ch, FineAnalogDelay(fine as u8))
            .set_ch(ch, DriverImpedance(driver_impedance_bits(chp.driver_mode, chp.termination)))
            .set_ch(ch, DriverModeSelect(chp.driver_mode.bits()))
            .set_ch(ch, StartupMode(if dynamic { 3 } else { 0 }))
            .set_ch(ch, OutputMuxSelect(chp.output_mux.bits()))
            .set_ch(ch, HighPerformance(chp.high_performance))
            .set_ch(ch, SyncEnable(true))
            .set_ch(ch, ChannelEnable(true));

        if is_sysref {
            self.set_ch(ch, DynamicDriverEnable(chp.dynamic_driver))
                .set_ch(ch, IdleAtZero(chp.idle_state.bits()));
        }

        let pairs: OutputPairEnable = self.get();
        self.set(OutputPairEnable(pairs.0 | 1 << (ch / 2)));

        debug!("hmc7043 ch{}: {:?} {} Hz, divider {}, slip {}, coarse {}, fine {}",
               ch, chp.mode, chp.freq_hz, divider, slip, coarse, fine);
        Ok(())
    }
}


/// Checks application parameters, in order, before anything is derived
pub fn validate(params: &DeviceParams) -> Result<()> {
    let fin = &params.clkin;
    if fin.validate().is_err() {
        return invalid(format_args!("input {} Hz not valid for {:?}", fin.freq_hz, fin.divide));
    }
    let effective = fin.effective_hz();

    for (ch, c) in params.channels.iter().enumerate() {
        if c.mode == ChannelMode::Sysref && c.dynamic_driver
            && (c.freq_hz == 0 || effective / c.freq_hz <= PULSE_GEN_DIVIDER_MIN)
        {
            return invalid(format_args!("ch{} pulse generator SYSREF {} Hz too fast", ch, c.freq_hz));
        }
    }

    for (ch, c) in params.channels.iter().enumerate() {
        if slip_steps(c.slip_quantum_ps, effective).is_none() {
            return invalid(format_args!("ch{} slip {}ps not a multiple of the input period", ch, c.slip_quantum_ps));
        }
    }

    for (ch, c) in params.channels.iter().enumerate().filter(|(_, c)| c.is_used()) {
        match digital_delay_steps(c.digital_delay_ps, fin.freq_hz) {
            Some(n) if n <= DIGITAL_DELAY_MAX_STEPS => {},
            _ => return invalid(format_args!("ch{} digital delay {}ps", ch, c.digital_delay_ps)),
        }
    }

    for (ch, c) in params.channels.iter().enumerate().filter(|(_, c)| c.is_used()) {
        match analog_delay_steps(c.analog_delay_ps) {
            Some(n) if n <= ANALOG_DELAY_MAX_STEPS => {},
            _ => return invalid(format_args!("ch{} analog delay {}ps", ch, c.analog_delay_ps)),
        }
        if c.mode == ChannelMode::Clock && c.output_mux == OutputMux::DividerAnalogDelay {
            return invalid(format_args!("ch{} clock output can't use the analog delay path", ch));
        }
    }

    let sref = params.sysref.freq_hz;
    if sref == 0 || sref >= SYSREF_FREQ_MAX {
        return invalid(format_args!("SYSREF {} Hz out of range", sref));
    }
    let min_sysref_ch = params.channels.iter()
        .filter(|c| c.mode == ChannelMode::Sysref)
        .map(|c| c.freq_hz)
        .min();
    if let Some(f) = min_sysref_ch {
        if f % sref != 0 {
            return invalid(format_args!("SYSREF {} Hz doesn't divide channel frequency {} Hz", sref, f));
        }
    }
    let timer = effective / sref;
    if !(1 ..= SYSREF_TIMER_MAX).contains(&timer) {
        return invalid(format_args!("SYSREF timer {} out of range", timer));
    }

    for (ch, c) in params.channels.iter().enumerate().filter(|(_, c)| c.is_used()) {
        if c.freq_hz == 0 || effective % c.freq_hz != 0 {
            return invalid(format_args!("ch{} {} Hz doesn't divide {} Hz", ch, c.freq_hz, effective));
        }
        let divider = effective / c.freq_hz;
        if !(1 ..= CHANNEL_DIVIDER_MAX).contains(&divider) {
            return invalid(format_args!("ch{} divider {} out of range", ch, divider));
        }
    }

    Ok(())
}
