// Copyright 2025-2026 CEMAXECUTER LLC

//! Hand-written bindings for the subset of `sdrplay_api` (v3.07) used by
//! the dual tuner engine. Struct layouts mirror `sdrplay_api*.h` exactly;
//! fields we never touch are still declared so offsets line up.

#![allow(dead_code)]

use std::os::raw::{c_char, c_int, c_uint, c_void};

pub const API_VERSION: f32 = 3.07;
pub const MAX_DEVICES: usize = 16;

/// hwVer values reported by sdrplay_api_GetDevices.
pub const HW_VER_RSP1: u8 = 1;
pub const HW_VER_RSP1A: u8 = 255;
pub const HW_VER_RSP2: u8 = 2;
pub const HW_VER_RSPDUO: u8 = 3;
pub const HW_VER_RSPDX: u8 = 4;

pub type ErrCode = c_int;
pub const ERR_SUCCESS: ErrCode = 0;
pub const ERR_FAIL: ErrCode = 1;
pub const ERR_SERVICE_NOT_RESPONDING: ErrCode = 18;

// sdrplay_api_TunerSelectT
pub const TUNER_NEITHER: c_uint = 0;
pub const TUNER_A: c_uint = 1;
pub const TUNER_B: c_uint = 2;
pub const TUNER_BOTH: c_uint = 3;

// sdrplay_api_RspDuoModeT (bit flags)
pub const RSPDUO_MODE_UNKNOWN: c_uint = 0;
pub const RSPDUO_MODE_SINGLE_TUNER: c_uint = 1;
pub const RSPDUO_MODE_DUAL_TUNER: c_uint = 2;
pub const RSPDUO_MODE_MASTER: c_uint = 4;
pub const RSPDUO_MODE_SLAVE: c_uint = 8;

// sdrplay_api_Bw_MHzT
pub const BW_UNDEFINED: c_uint = 0;
pub const BW_0_200: c_uint = 200;
pub const BW_0_300: c_uint = 300;
pub const BW_0_600: c_uint = 600;
pub const BW_1_536: c_uint = 1536;

// sdrplay_api_If_kHzT
pub const IF_UNDEFINED: c_int = -1;
pub const IF_ZERO: c_int = 0;
pub const IF_0_450: c_int = 450;
pub const IF_1_620: c_int = 1620;
pub const IF_2_048: c_int = 2048;

// sdrplay_api_LoModeT
pub const LO_UNDEFINED: c_uint = 0;
pub const LO_AUTO: c_uint = 1;

// sdrplay_api_AgcControlT
pub const AGC_DISABLE: c_uint = 0;
pub const AGC_100HZ: c_uint = 1;
pub const AGC_50HZ: c_uint = 2;
pub const AGC_5HZ: c_uint = 3;
pub const AGC_CTRL_EN: c_uint = 4;

// sdrplay_api_TransferModeT
pub const TRANSFER_ISOCH: c_uint = 0;
pub const TRANSFER_BULK: c_uint = 1;

// sdrplay_api_EventT
pub const EVENT_GAIN_CHANGE: c_uint = 0;
pub const EVENT_POWER_OVERLOAD: c_uint = 1;
pub const EVENT_DEVICE_REMOVED: c_uint = 2;
pub const EVENT_RSPDUO_MODE_CHANGE: c_uint = 3;

// sdrplay_api_PowerOverloadCbEventIdT
pub const OVERLOAD_DETECTED: c_uint = 0;
pub const OVERLOAD_CORRECTED: c_uint = 1;

// sdrplay_api_ReasonForUpdateT
pub const UPDATE_NONE: c_uint = 0;
pub const UPDATE_DEV_FS: c_uint = 0x0000_0001;
pub const UPDATE_TUNER_GR: c_uint = 0x0000_8000;
pub const UPDATE_TUNER_FRF: c_uint = 0x0002_0000;
pub const UPDATE_CTRL_DECIMATION: c_uint = 0x0080_0000;
pub const UPDATE_CTRL_AGC: c_uint = 0x0100_0000;
pub const UPDATE_CTRL_OVERLOAD_MSG_ACK: c_uint = 0x0400_0000;
pub const UPDATE_RSPDUO_RF_NOTCH: c_uint = 0x4000_0000;
pub const UPDATE_RSPDUO_RF_DAB_NOTCH: c_uint = 0x8000_0000;

// sdrplay_api_ReasonForUpdateExtension1T
pub const UPDATE_EXT1_NONE: c_uint = 0;

pub const SER_NO_LEN: usize = 64;
pub const DEV_NM_LEN: usize = 64;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct DeviceInfo {
    pub ser_no: [c_char; SER_NO_LEN],
    pub dev_nm: [c_char; DEV_NM_LEN],
    pub hw_ver: u8,
    pub tuner: c_uint,
    pub rsp_duo_mode: c_uint,
    pub rsp_duo_sample_freq: f64,
    pub dev: *mut c_void,
}

#[repr(C)]
pub struct DeviceParams {
    pub dev_params: *mut DevParams,
    pub rx_channel_a: *mut RxChannelParams,
    pub rx_channel_b: *mut RxChannelParams,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct FsFreq {
    pub fs_hz: f64,
    pub sync_update: u8,
    pub re_cal: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct SyncUpdate {
    pub sample_num: c_uint,
    pub period: c_uint,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct ResetFlags {
    pub reset_gain_update: u8,
    pub reset_rf_update: u8,
    pub reset_fs_update: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct RspDuoDevParams {
    pub ext_ref_output_en: c_int,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct DevParams {
    pub ppm: f64,
    pub fs_freq: FsFreq,
    pub sync_update: SyncUpdate,
    pub reset_flags: ResetFlags,
    pub mode: c_uint,
    pub samples_per_pkt: c_uint,
    pub rsp_duo_params: RspDuoDevParams,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct RfFreq {
    pub rf_hz: f64,
    pub sync_update: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct GainValues {
    pub curr: f32,
    pub max: f32,
    pub min: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct Gain {
    pub gr_db: c_int,
    pub lna_state: u8,
    pub sync_update: u8,
    pub min_gr: c_uint,
    pub gain_vals: GainValues,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct DcOffsetTuner {
    pub dc_cal: u8,
    pub speed_up: u8,
    pub track_time: c_int,
    pub refresh_rate_time: c_int,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct TunerParams {
    pub bw_type: c_uint,
    pub if_type: c_int,
    pub lo_mode: c_uint,
    pub gain: Gain,
    pub rf_freq: RfFreq,
    pub dc_offset_tuner: DcOffsetTuner,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct DcOffset {
    pub dc_enable: u8,
    pub iq_enable: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct Decimation {
    pub enable: u8,
    pub decimation_factor: u8,
    pub wide_band_signal: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct Agc {
    pub enable: c_uint,
    pub set_point_dbfs: c_int,
    pub attack_ms: u16,
    pub decay_ms: u16,
    pub decay_delay_ms: u16,
    pub decay_threshold_db: u16,
    pub sync_update: c_int,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct ControlParams {
    pub dc_offset: DcOffset,
    pub decimation: Decimation,
    pub agc: Agc,
    pub adsb_mode: c_uint,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct Rsp1aTunerParams {
    pub bias_t_enable: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct Rsp2TunerParams {
    pub bias_t_enable: u8,
    pub am_port_sel: c_uint,
    pub antenna_sel: c_uint,
    pub rf_notch_enable: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct RspDuoTunerParams {
    pub bias_t_enable: u8,
    pub tuner1_am_port_sel: c_uint,
    pub tuner1_am_notch_enable: u8,
    pub rf_notch_enable: u8,
    pub rf_dab_notch_enable: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct RspDxTunerParams {
    pub hdr_enable: u8,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct RxChannelParams {
    pub tuner_params: TunerParams,
    pub ctrl_params: ControlParams,
    pub rsp1a_tuner_params: Rsp1aTunerParams,
    pub rsp2_tuner_params: Rsp2TunerParams,
    pub rsp_duo_tuner_params: RspDuoTunerParams,
    pub rsp_dx_tuner_params: RspDxTunerParams,
}

#[repr(C)]
pub struct StreamCbParams {
    pub first_sample_num: c_uint,
    pub gr_changed: c_int,
    pub rf_changed: c_int,
    pub fs_changed: c_int,
    pub num_samples: c_uint,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct GainCbParam {
    pub g_rdb: c_uint,
    pub lna_g_rdb: c_uint,
    pub curr_gain: f64,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct PowerOverloadCbParam {
    pub power_overload_change_type: c_uint,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct RspDuoModeCbParam {
    pub mode_change_type: c_uint,
}

#[repr(C)]
pub union EventParams {
    pub gain_params: GainCbParam,
    pub power_overload_params: PowerOverloadCbParam,
    pub rsp_duo_mode_params: RspDuoModeCbParam,
}

pub type StreamCallback = unsafe extern "C" fn(
    xi: *mut i16,
    xq: *mut i16,
    params: *mut StreamCbParams,
    num_samples: c_uint,
    reset: c_uint,
    cb_context: *mut c_void,
);

pub type EventCallback = unsafe extern "C" fn(
    event_id: c_uint,
    tuner: c_uint,
    params: *mut EventParams,
    cb_context: *mut c_void,
);

#[repr(C)]
pub struct CallbackFns {
    pub stream_a_cb_fn: StreamCallback,
    pub stream_b_cb_fn: StreamCallback,
    pub event_cb_fn: EventCallback,
}

extern "C" {
    pub fn sdrplay_api_Open() -> ErrCode;
    pub fn sdrplay_api_Close() -> ErrCode;
    pub fn sdrplay_api_ApiVersion(api_ver: *mut f32) -> ErrCode;
    pub fn sdrplay_api_LockDeviceApi() -> ErrCode;
    pub fn sdrplay_api_UnlockDeviceApi() -> ErrCode;
    pub fn sdrplay_api_GetDevices(
        devices: *mut DeviceInfo,
        num_devs: *mut c_uint,
        max_devs: c_uint,
    ) -> ErrCode;
    pub fn sdrplay_api_SelectDevice(device: *mut DeviceInfo) -> ErrCode;
    pub fn sdrplay_api_ReleaseDevice(device: *mut DeviceInfo) -> ErrCode;
    pub fn sdrplay_api_GetErrorString(err: ErrCode) -> *const c_char;
    pub fn sdrplay_api_DebugEnable(dev: *mut c_void, enable: c_uint) -> ErrCode;
    pub fn sdrplay_api_GetDeviceParams(
        dev: *mut c_void,
        device_params: *mut *mut DeviceParams,
    ) -> ErrCode;
    pub fn sdrplay_api_Init(
        dev: *mut c_void,
        callback_fns: *mut CallbackFns,
        cb_context: *mut c_void,
    ) -> ErrCode;
    pub fn sdrplay_api_Uninit(dev: *mut c_void) -> ErrCode;
    pub fn sdrplay_api_Update(
        dev: *mut c_void,
        tuner: c_uint,
        reason_for_update: c_uint,
        reason_for_update_ext1: c_uint,
    ) -> ErrCode;
}
