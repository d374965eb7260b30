// Copyright 2025-2026 CEMAXECUTER LLC

//! RAII wrappers around the sdrplay_api service connection and a selected
//! RSPduo device. Dropping a [`Device`] releases it back to the service;
//! dropping the [`Session`] closes the service connection.

use std::ffi::CStr;
use std::os::raw::{c_char, c_uint, c_void};
use std::ptr;

use crate::ffi;

/// Render an sdrplay_api error code through sdrplay_api_GetErrorString.
pub fn err_string(err: ffi::ErrCode) -> String {
    unsafe {
        let s = ffi::sdrplay_api_GetErrorString(err);
        if s.is_null() {
            format!("unknown error {}", err)
        } else {
            CStr::from_ptr(s).to_string_lossy().into_owned()
        }
    }
}

fn c_str_field(field: &[c_char]) -> String {
    let bytes: Vec<u8> = field
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Open connection to the sdrplay_api service.
pub struct Session {
    _priv: (),
}

impl Session {
    /// Opens the API, optionally enables driver debug output, and verifies
    /// that the installed service matches the header version we were built
    /// against.
    pub fn open(api_debug: bool) -> Result<Self, String> {
        unsafe {
            let err = ffi::sdrplay_api_Open();
            if err != ffi::ERR_SUCCESS {
                return Err(format!("sdrplay_api_Open failed: {}", err_string(err)));
            }
            // From here on, dropping the session closes the API.
            let session = Session { _priv: () };

            let err = ffi::sdrplay_api_DebugEnable(ptr::null_mut(), api_debug as c_uint);
            if err != ffi::ERR_SUCCESS {
                return Err(format!(
                    "sdrplay_api_DebugEnable failed: {}",
                    err_string(err)
                ));
            }

            let mut ver: f32 = 0.0;
            let err = ffi::sdrplay_api_ApiVersion(&mut ver);
            if err != ffi::ERR_SUCCESS {
                return Err(format!("sdrplay_api_ApiVersion failed: {}", err_string(err)));
            }
            if (ver - ffi::API_VERSION).abs() > 0.001 {
                return Err(format!(
                    "sdrplay_api version mismatch: built against {:.2}, service is {:.2}",
                    ffi::API_VERSION,
                    ver
                ));
            }

            Ok(session)
        }
    }

    /// Enumerates attached devices and reserves the first RSPduo that can
    /// run in dual tuner mode, claiming both tuners at `sample_freq_hz`.
    pub fn select_duo(&self, sample_freq_hz: f64) -> Result<Device, String> {
        unsafe {
            let err = ffi::sdrplay_api_LockDeviceApi();
            if err != ffi::ERR_SUCCESS {
                return Err(format!(
                    "sdrplay_api_LockDeviceApi failed: {}",
                    err_string(err)
                ));
            }
            let result = self.select_duo_locked(sample_freq_hz);
            ffi::sdrplay_api_UnlockDeviceApi();
            result
        }
    }

    unsafe fn select_duo_locked(&self, sample_freq_hz: f64) -> Result<Device, String> {
        let mut devs: [ffi::DeviceInfo; ffi::MAX_DEVICES] = std::mem::zeroed();
        let mut num_devs: c_uint = 0;
        let err = ffi::sdrplay_api_GetDevices(
            devs.as_mut_ptr(),
            &mut num_devs,
            ffi::MAX_DEVICES as c_uint,
        );
        if err != ffi::ERR_SUCCESS {
            return Err(format!("sdrplay_api_GetDevices failed: {}", err_string(err)));
        }

        log::info!("{} SDRplay device(s) attached", num_devs);
        let mut chosen: Option<usize> = None;
        for (i, d) in devs[..num_devs as usize].iter().enumerate() {
            if d.hw_ver != ffi::HW_VER_RSPDUO {
                log::info!("dev[{}]: hwVer={} (not an RSPduo), skipping", i, d.hw_ver);
                continue;
            }
            let serial = c_str_field(&d.ser_no);
            log::info!(
                "dev[{}]: RSPduo SerNo={} tuner=0x{:x} rspDuoMode=0x{:x}",
                i,
                serial,
                d.tuner,
                d.rsp_duo_mode
            );
            if chosen.is_none() {
                if d.rsp_duo_mode & ffi::RSPDUO_MODE_DUAL_TUNER == 0 {
                    log::warn!("dev[{}]: dual tuner mode unavailable (master/slave in use)", i);
                } else {
                    chosen = Some(i);
                }
            }
        }

        let idx = chosen.ok_or_else(|| "no RSPduo available in dual tuner mode".to_string())?;
        let mut info = devs[idx];
        info.tuner = ffi::TUNER_BOTH;
        info.rsp_duo_mode = ffi::RSPDUO_MODE_DUAL_TUNER;
        info.rsp_duo_sample_freq = sample_freq_hz;

        let err = ffi::sdrplay_api_SelectDevice(&mut info);
        if err != ffi::ERR_SUCCESS {
            return Err(format!(
                "sdrplay_api_SelectDevice failed: {}",
                err_string(err)
            ));
        }
        Ok(Device { info })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        unsafe {
            ffi::sdrplay_api_Close();
        }
    }
}

/// A reserved RSPduo, released on drop.
pub struct Device {
    info: ffi::DeviceInfo,
}

impl Device {
    pub fn handle(&self) -> *mut c_void {
        self.info.dev
    }

    pub fn serial(&self) -> String {
        c_str_field(&self.info.ser_no)
    }

    /// Fetches the device parameter tree owned by the service. The pointer
    /// stays valid until the device is released.
    pub fn params(&self) -> Result<*mut ffi::DeviceParams, String> {
        unsafe {
            let mut params: *mut ffi::DeviceParams = ptr::null_mut();
            let err = ffi::sdrplay_api_GetDeviceParams(self.info.dev, &mut params);
            if err != ffi::ERR_SUCCESS {
                return Err(format!(
                    "sdrplay_api_GetDeviceParams failed: {}",
                    err_string(err)
                ));
            }
            if params.is_null() {
                return Err("sdrplay_api_GetDeviceParams returned null".to_string());
            }
            Ok(params)
        }
    }

    pub fn init(&self, callbacks: &mut ffi::CallbackFns, cb_context: *mut c_void) -> Result<(), String> {
        unsafe {
            let err = ffi::sdrplay_api_Init(self.info.dev, callbacks, cb_context);
            if err != ffi::ERR_SUCCESS {
                return Err(format!("sdrplay_api_Init failed: {}", err_string(err)));
            }
            Ok(())
        }
    }

    pub fn uninit(&self) -> Result<(), String> {
        unsafe {
            let err = ffi::sdrplay_api_Uninit(self.info.dev);
            if err != ffi::ERR_SUCCESS {
                return Err(format!("sdrplay_api_Uninit failed: {}", err_string(err)));
            }
            Ok(())
        }
    }

    pub fn update(&self, tuner: c_uint, reason: c_uint) -> Result<(), String> {
        unsafe {
            let err = ffi::sdrplay_api_Update(self.info.dev, tuner, reason, ffi::UPDATE_EXT1_NONE);
            if err != ffi::ERR_SUCCESS {
                return Err(format!(
                    "sdrplay_api_Update (reason 0x{:x}) failed: {}",
                    reason,
                    err_string(err)
                ));
            }
            Ok(())
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            ffi::sdrplay_api_ReleaseDevice(&mut self.info);
        }
    }
}
