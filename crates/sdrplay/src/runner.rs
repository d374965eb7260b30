// Copyright 2025-2026 CEMAXECUTER LLC

//! Blocking run loop for the RSPduo in dual tuner mode: device bring-up,
//! the stream/event callback trampolines feeding the merge engine, and
//! the 100 ms control poll that applies parameter changes with the
//! minimum number of sdrplay_api_Update calls.

use std::os::raw::{c_uint, c_void};
use std::slice;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use duo_engine::control::{diff_params, sanitize_params, TuneParams, UpdateCategory};
use duo_engine::ingest::StreamMerger;
use duo_engine::transfer::TransferShape;
use duo_engine::{Control, ControlHook, EngineConfig, MessageSink, TransferSink};

use crate::ffi;
use crate::session::{Device, Session};

/// ADC master sample rate with the default 2 MS/s per-tuner output.
const SAMPLE_FREQ_DEFAULT: f64 = 6_000_000.0;
/// ADC master sample rate in maxFs mode (2.048 MS/s per tuner).
const SAMPLE_FREQ_MAXFS: f64 = 8_000_000.0;

const CONTROL_POLL: Duration = Duration::from_millis(100);

/// Fan-out handle for diagnostic messages; shared between the control
/// loop and the driver callback threads.
#[derive(Clone)]
struct Messenger {
    sink: Arc<Mutex<Option<Box<dyn MessageSink>>>>,
}

impl Messenger {
    fn new(sink: Option<Box<dyn MessageSink>>) -> Self {
        Messenger {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    fn say(&self, msg: &str) {
        if let Ok(mut guard) = self.sink.lock() {
            if let Some(sink) = guard.as_mut() {
                sink.on_message(msg);
            }
        }
    }
}

/// State mutated by the stream callbacks. The driver serializes A and B
/// callbacks itself; the mutex guards against drivers that do not.
struct CbState {
    merger: StreamMerger,
    transfer: Box<dyn TransferSink>,
}

struct CbContext {
    dev: *mut c_void,
    state: Mutex<CbState>,
    messenger: Messenger,
}

// The raw device handle is only touched from driver callback threads and
// never concurrently with sdrplay_api teardown.
unsafe impl Send for CbContext {}
unsafe impl Sync for CbContext {}

unsafe fn cb_slices<'a>(xi: *mut i16, xq: *mut i16, num_samples: c_uint) -> (&'a [i16], &'a [i16]) {
    if num_samples == 0 || xi.is_null() || xq.is_null() {
        (&[], &[])
    } else {
        (
            slice::from_raw_parts(xi, num_samples as usize),
            slice::from_raw_parts(xq, num_samples as usize),
        )
    }
}

unsafe extern "C" fn stream_a_cb(
    xi: *mut i16,
    xq: *mut i16,
    _params: *mut ffi::StreamCbParams,
    num_samples: c_uint,
    reset: c_uint,
    cb_context: *mut c_void,
) {
    let ctx = &*(cb_context as *const CbContext);
    let (xi, xq) = cb_slices(xi, xq, num_samples);
    if reset != 0 {
        ctx.messenger
            .say(&format!("stream A reset: numSamples={}", num_samples));
    }
    let fault = match ctx.state.lock() {
        Ok(mut state) => state.merger.on_stream_a(xi, xq, reset != 0).err(),
        Err(_) => {
            ctx.messenger
                .say("stream state poisoned: dropping stream A delivery");
            None
        }
    };
    if let Some(fault) = fault {
        ctx.messenger.say(&fault.to_string());
    }
}

unsafe extern "C" fn stream_b_cb(
    xi: *mut i16,
    xq: *mut i16,
    _params: *mut ffi::StreamCbParams,
    num_samples: c_uint,
    reset: c_uint,
    cb_context: *mut c_void,
) {
    let ctx = &*(cb_context as *const CbContext);
    let (xi, xq) = cb_slices(xi, xq, num_samples);
    if reset != 0 {
        ctx.messenger
            .say(&format!("stream B reset: numSamples={}", num_samples));
    }
    let fault = match ctx.state.lock() {
        Ok(mut state) => {
            let CbState { merger, transfer } = &mut *state;
            merger.on_stream_b(xi, xq, reset != 0, transfer.as_mut()).err()
        }
        Err(_) => {
            ctx.messenger
                .say("stream state poisoned: dropping stream B delivery");
            None
        }
    };
    if let Some(fault) = fault {
        ctx.messenger.say(&fault.to_string());
    }
}

unsafe extern "C" fn event_cb(
    event_id: c_uint,
    tuner: c_uint,
    params: *mut ffi::EventParams,
    cb_context: *mut c_void,
) {
    let ctx = &*(cb_context as *const CbContext);
    let tuner_name = if tuner == ffi::TUNER_A { "A" } else { "B" };
    match event_id {
        ffi::EVENT_GAIN_CHANGE => {
            let p = (*params).gain_params;
            ctx.messenger.say(&format!(
                "gain change: tuner={} gRdB={} lnaGRdB={} systemGain={:.2}",
                tuner_name, p.g_rdb, p.lna_g_rdb, p.curr_gain
            ));
        }
        ffi::EVENT_POWER_OVERLOAD => {
            let p = (*params).power_overload_params;
            let kind = if p.power_overload_change_type == ffi::OVERLOAD_DETECTED {
                "detected"
            } else {
                "corrected"
            };
            ctx.messenger
                .say(&format!("power overload {}: tuner={}", kind, tuner_name));
            // The driver repeats the event until acknowledged.
            let err =
                ffi::sdrplay_api_Update(ctx.dev, tuner, ffi::UPDATE_CTRL_OVERLOAD_MSG_ACK, ffi::UPDATE_EXT1_NONE);
            if err != ffi::ERR_SUCCESS {
                log::warn!("overload ack failed: {}", crate::session::err_string(err));
            }
        }
        ffi::EVENT_DEVICE_REMOVED => {
            ctx.messenger.say("device removed");
        }
        _ => {
            ctx.messenger
                .say(&format!("unhandled sdrplay event {}", event_id));
        }
    }
}

/// Initial tuner/control setup, applied identically to both channels
/// before streaming starts.
fn configure_channel(chan: &mut ffi::RxChannelParams, config: &EngineConfig) {
    chan.tuner_params.rf_freq.rf_hz = config.tune_freq;

    // Low IF and analog bandwidth depend on the output rate.
    chan.tuner_params.bw_type = ffi::BW_1_536;
    if config.max_sample_rate {
        // 8 MHz ADC mode only supports the 1.536 MHz analog bandwidth.
        chan.tuner_params.if_type = ffi::IF_2_048;
    } else {
        chan.tuner_params.if_type = ffi::IF_1_620;
        chan.tuner_params.bw_type = match config.decim_factor {
            4 => ffi::BW_0_600,
            8 => ffi::BW_0_300,
            16 | 32 => ffi::BW_0_200,
            _ => ffi::BW_1_536,
        };
    }

    chan.rsp_duo_tuner_params.rf_notch_enable = config.notch_mwfm as u8;
    chan.rsp_duo_tuner_params.rf_dab_notch_enable = config.notch_dab as u8;

    chan.tuner_params.gain.gr_db = 40;
    chan.tuner_params.gain.lna_state = config.lna_state.min(9) as u8;

    chan.ctrl_params.agc.enable = match config.agc_bandwidth {
        5 => ffi::AGC_5HZ,
        50 => ffi::AGC_50HZ,
        100 => ffi::AGC_100HZ,
        _ => ffi::AGC_DISABLE,
    };
    if chan.ctrl_params.agc.enable != ffi::AGC_DISABLE {
        chan.ctrl_params.agc.set_point_dbfs = config.agc_set_point.min(0);
    }

    chan.ctrl_params.decimation.enable = (config.decim_factor > 1) as u8;
    chan.ctrl_params.decimation.decimation_factor = config.decim_factor as u8;
}

/// Writes the live-tunable subset of [`TuneParams`] into one channel.
/// Analog bandwidth, IF, and decimation are fixed for the session.
fn reconfigure_channel(chan: &mut ffi::RxChannelParams, desired: &TuneParams) {
    chan.tuner_params.rf_freq.rf_hz = desired.tune_freq;

    chan.rsp_duo_tuner_params.rf_notch_enable = desired.notch_mwfm as u8;
    chan.rsp_duo_tuner_params.rf_dab_notch_enable = desired.notch_dab as u8;

    chan.tuner_params.gain.gr_db = 40;
    chan.tuner_params.gain.lna_state = desired.lna_state.min(9) as u8;

    chan.ctrl_params.agc.enable = match desired.agc_bandwidth {
        5 => ffi::AGC_5HZ,
        50 => ffi::AGC_50HZ,
        100 => ffi::AGC_100HZ,
        _ => ffi::AGC_DISABLE,
    };
    chan.ctrl_params.agc.set_point_dbfs = desired.agc_set_point.min(0);
}

fn configure_device(device: &Device, config: &EngineConfig) -> Result<(), String> {
    let params = device.params()?;
    unsafe {
        let dev_params = (*params)
            .dev_params
            .as_mut()
            .ok_or_else(|| "device params missing devParams".to_string())?;
        dev_params.fs_freq.fs_hz = if config.max_sample_rate {
            SAMPLE_FREQ_MAXFS
        } else {
            SAMPLE_FREQ_DEFAULT
        };
        dev_params.mode = if config.usb_bulk_mode {
            ffi::TRANSFER_BULK
        } else {
            ffi::TRANSFER_ISOCH
        };

        let chan_a = (*params)
            .rx_channel_a
            .as_mut()
            .ok_or_else(|| "device params missing rxChannelA".to_string())?;
        configure_channel(chan_a, config);
        let chan_b = (*params)
            .rx_channel_b
            .as_mut()
            .ok_or_else(|| "device params missing rxChannelB".to_string())?;
        configure_channel(chan_b, config);
    }
    Ok(())
}

/// Reads the currently applied tuner settings from channel A. Both
/// channels are always configured identically.
fn populate_params(params: *mut ffi::DeviceParams) -> Result<TuneParams, String> {
    unsafe {
        let chan = (*params)
            .rx_channel_a
            .as_ref()
            .ok_or_else(|| "device params missing rxChannelA".to_string())?;
        Ok(TuneParams {
            tune_freq: chan.tuner_params.rf_freq.rf_hz,
            agc_bandwidth: match chan.ctrl_params.agc.enable {
                ffi::AGC_5HZ => 5,
                ffi::AGC_50HZ => 50,
                ffi::AGC_100HZ => 100,
                _ => 0,
            },
            agc_set_point: chan.ctrl_params.agc.set_point_dbfs,
            lna_state: chan.tuner_params.gain.lna_state as u32,
            notch_mwfm: chan.rsp_duo_tuner_params.rf_notch_enable != 0,
            notch_dab: chan.rsp_duo_tuner_params.rf_dab_notch_enable != 0,
        })
    }
}

/// Writes `desired` into both channels and issues one sdrplay_api_Update
/// per changed parameter group.
fn apply_params(
    device: &Device,
    params: *mut ffi::DeviceParams,
    applied: &TuneParams,
    desired: &TuneParams,
) -> Result<(), String> {
    unsafe {
        let chan_a = (*params)
            .rx_channel_a
            .as_mut()
            .ok_or_else(|| "device params missing rxChannelA".to_string())?;
        reconfigure_channel(chan_a, desired);
        let chan_b = (*params)
            .rx_channel_b
            .as_mut()
            .ok_or_else(|| "device params missing rxChannelB".to_string())?;
        reconfigure_channel(chan_b, desired);
    }
    for category in diff_params(applied, desired) {
        let reason = match category {
            UpdateCategory::TuneFreq => ffi::UPDATE_TUNER_FRF,
            UpdateCategory::Agc => ffi::UPDATE_CTRL_AGC,
            UpdateCategory::LnaState => ffi::UPDATE_TUNER_GR,
            UpdateCategory::NotchMwfm => ffi::UPDATE_RSPDUO_RF_NOTCH,
            UpdateCategory::NotchDab => ffi::UPDATE_RSPDUO_RF_DAB_NOTCH,
        };
        device.update(ffi::TUNER_BOTH, reason)?;
    }
    Ok(())
}

fn control_loop(
    device: &Device,
    mut hook: Option<Box<dyn ControlHook>>,
    messenger: &Messenger,
) -> Result<(), String> {
    loop {
        if let Some(hook) = hook.as_mut() {
            let params = device.params()?;
            let applied = populate_params(params)?;
            let mut desired = applied;
            if hook.on_control(&mut desired) == Control::Stop {
                return Ok(());
            }
            for msg in sanitize_params(&mut desired, &applied) {
                messenger.say(&msg);
            }
            if desired != applied {
                apply_params(device, params, &applied, &desired)?;
            }
        }
        thread::sleep(CONTROL_POLL);
    }
}

/// Runs the dual tuner engine until the control hook asks to stop.
///
/// Blocking. Opens the API, reserves the first RSPduo available in dual
/// tuner mode, configures both channels identically, starts streaming,
/// and polls `control` every 100 ms. Without a control hook the engine
/// streams until the process is killed.
pub fn run(
    config: &EngineConfig,
    transfer: Box<dyn TransferSink>,
    control: Option<Box<dyn ControlHook>>,
    messages: Option<Box<dyn MessageSink>>,
) -> Result<(), String> {
    config.validate()?;
    let shape = TransferShape::new(config.format, config.max_transfer_size)?;
    let merger = StreamMerger::new(shape);
    let messenger = Messenger::new(messages);

    let session = Session::open(config.api_debug)?;
    let sample_freq = if config.max_sample_rate {
        SAMPLE_FREQ_MAXFS
    } else {
        SAMPLE_FREQ_DEFAULT
    };
    let device = session.select_duo(sample_freq)?;
    log::info!("selected RSPduo SerNo={}", device.serial());

    configure_device(&device, config)?;

    let ctx = Box::new(CbContext {
        dev: device.handle(),
        state: Mutex::new(CbState { merger, transfer }),
        messenger: messenger.clone(),
    });
    let mut callbacks = ffi::CallbackFns {
        stream_a_cb_fn: stream_a_cb,
        stream_b_cb_fn: stream_b_cb,
        event_cb_fn: event_cb,
    };
    device.init(&mut callbacks, &*ctx as *const CbContext as *mut c_void)?;

    let loop_result = control_loop(&device, control, &messenger);
    let uninit_result = device.uninit();

    // Give in-flight callbacks time to drain before the context goes away.
    thread::sleep(Duration::from_secs(1));
    drop(ctx);

    loop_result.and(uninit_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duo_engine::transfer::SampleFormat;
    use std::ptr;

    fn test_config() -> EngineConfig {
        EngineConfig {
            format: SampleFormat::Short,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_configure_channel_default_bandwidth() {
        let mut chan = ffi::RxChannelParams::default();
        let config = test_config();
        configure_channel(&mut chan, &config);
        assert_eq!(chan.tuner_params.bw_type, ffi::BW_1_536);
        assert_eq!(chan.tuner_params.if_type, ffi::IF_1_620);
        assert_eq!(chan.tuner_params.gain.gr_db, 40);
        assert_eq!(chan.tuner_params.gain.lna_state, 4);
        assert_eq!(chan.ctrl_params.decimation.enable, 0);
        assert_eq!(chan.ctrl_params.decimation.decimation_factor, 1);
    }

    #[test]
    fn test_configure_channel_narrows_bandwidth_with_decimation() {
        let mut config = test_config();
        for (decim, bw) in [
            (2, ffi::BW_1_536),
            (4, ffi::BW_0_600),
            (8, ffi::BW_0_300),
            (16, ffi::BW_0_200),
            (32, ffi::BW_0_200),
        ] {
            config.decim_factor = decim;
            let mut chan = ffi::RxChannelParams::default();
            configure_channel(&mut chan, &config);
            assert_eq!(chan.tuner_params.bw_type, bw, "decim {}", decim);
            assert_eq!(chan.ctrl_params.decimation.enable, 1);
            assert_eq!(chan.ctrl_params.decimation.decimation_factor, decim as u8);
        }
    }

    #[test]
    fn test_configure_channel_max_sample_rate_forces_wide_if() {
        let mut config = test_config();
        config.max_sample_rate = true;
        let mut chan = ffi::RxChannelParams::default();
        configure_channel(&mut chan, &config);
        assert_eq!(chan.tuner_params.if_type, ffi::IF_2_048);
        assert_eq!(chan.tuner_params.bw_type, ffi::BW_1_536);
    }

    #[test]
    fn test_configure_channel_agc_mapping() {
        let mut config = test_config();
        for (bw, enable) in [
            (0, ffi::AGC_DISABLE),
            (5, ffi::AGC_5HZ),
            (50, ffi::AGC_50HZ),
            (100, ffi::AGC_100HZ),
        ] {
            config.agc_bandwidth = bw;
            let mut chan = ffi::RxChannelParams::default();
            configure_channel(&mut chan, &config);
            assert_eq!(chan.ctrl_params.agc.enable, enable, "bw {}", bw);
        }
        config.agc_bandwidth = 50;
        config.agc_set_point = -45;
        let mut chan = ffi::RxChannelParams::default();
        configure_channel(&mut chan, &config);
        assert_eq!(chan.ctrl_params.agc.set_point_dbfs, -45);
    }

    #[test]
    fn test_populate_round_trips_reconfigure() {
        let mut chan_a = ffi::RxChannelParams::default();
        let mut chan_b = ffi::RxChannelParams::default();
        let mut dev = ffi::DevParams::default();
        let desired = TuneParams {
            tune_freq: 97_500_000.0,
            agc_bandwidth: 100,
            agc_set_point: -20,
            lna_state: 7,
            notch_mwfm: true,
            notch_dab: false,
        };
        reconfigure_channel(&mut chan_a, &desired);
        reconfigure_channel(&mut chan_b, &desired);

        let mut params = ffi::DeviceParams {
            dev_params: &mut dev,
            rx_channel_a: &mut chan_a,
            rx_channel_b: &mut chan_b,
        };
        let read = populate_params(&mut params).unwrap();
        assert_eq!(read, desired);
    }

    struct NullSink;

    impl TransferSink for NullSink {
        fn on_transfer(&mut self, _transfer: &duo_engine::Transfer<'_>) {}
    }

    struct CollectMessages(Arc<Mutex<Vec<String>>>);

    impl MessageSink for CollectMessages {
        fn on_message(&mut self, msg: &str) {
            if let Ok(mut messages) = self.0.lock() {
                messages.push(msg.to_string());
            }
        }
    }

    #[test]
    fn test_poisoned_stream_state_is_reported() {
        let shape = TransferShape::new(SampleFormat::Short, 64).unwrap();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let messenger = Messenger::new(Some(Box::new(CollectMessages(messages.clone()))));
        let ctx = Box::new(CbContext {
            dev: ptr::null_mut(),
            state: Mutex::new(CbState {
                merger: StreamMerger::new(shape),
                transfer: Box::new(NullSink),
            }),
            messenger,
        });

        // Poison the state mutex the way a panicking sink would.
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ctx.state.lock().unwrap();
            panic!("sink failure");
        }));
        assert!(ctx.state.lock().is_err());

        let mut xi = [0i16; 4];
        let mut xq = [0i16; 4];
        unsafe {
            stream_a_cb(
                xi.as_mut_ptr(),
                xq.as_mut_ptr(),
                ptr::null_mut(),
                4,
                0,
                &*ctx as *const CbContext as *mut std::os::raw::c_void,
            );
            stream_b_cb(
                xi.as_mut_ptr(),
                xq.as_mut_ptr(),
                ptr::null_mut(),
                4,
                0,
                &*ctx as *const CbContext as *mut std::os::raw::c_void,
            );
        }

        let messages = messages.lock().unwrap();
        assert!(messages
            .iter()
            .any(|m| m.contains("poisoned") && m.contains("stream A")));
        assert!(messages
            .iter()
            .any(|m| m.contains("poisoned") && m.contains("stream B")));
    }

    #[test]
    fn test_populate_rejects_missing_channel() {
        let mut dev = ffi::DevParams::default();
        let mut params = ffi::DeviceParams {
            dev_params: &mut dev,
            rx_channel_a: ptr::null_mut(),
            rx_channel_b: ptr::null_mut(),
        };
        assert!(populate_params(&mut params).is_err());
    }
}
