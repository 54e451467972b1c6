//! Hardware accelerator registry (C3): enumeration, preference, and the
//! process-wide hardware-fallback protocol a codec pipeline consults before
//! opening (and after a mid-stream failure of) a hardware backend.
//!
//! Fallback behavior is Chromium-aligned: after [`GLOBAL_FAILURE_THRESHOLD`]
//! consecutive hardware-encode failures, hardware encoding is disabled for
//! the process until [`FORGIVENESS_INTERVAL`] elapses or a caller explicitly
//! calls [`reset_hardware_fallback_state`]. Decoders are not tracked here:
//! software decoding is always the default for `no-preference`, and hardware
//! decoding is only attempted when a caller explicitly asks for it.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use napi_derive::napi;

use crate::codec::HwDeviceContext;
use crate::ffi::AVHWDeviceType;

/// Hardware accelerator descriptor returned by [`get_hardware_accelerators`].
#[napi(object)]
#[derive(Debug, Clone)]
pub struct HardwareAccelerator {
  /// Internal name (e.g. "videotoolbox", "cuda", "vaapi").
  pub name: String,
  /// Human-readable description.
  pub description: String,
  /// Whether this accelerator is available on this system right now.
  pub available: bool,
}

const KNOWN_ACCELERATORS: &[(AVHWDeviceType, &str, &str)] = &[
  (
    AVHWDeviceType::Videotoolbox,
    "videotoolbox",
    "Apple VideoToolbox (macOS)",
  ),
  (AVHWDeviceType::Cuda, "cuda", "NVIDIA CUDA/NVENC"),
  (
    AVHWDeviceType::Vaapi,
    "vaapi",
    "Video Acceleration API (Linux)",
  ),
  (
    AVHWDeviceType::D3d11va,
    "d3d11va",
    "Direct3D 11 Video Acceleration (Windows)",
  ),
  (AVHWDeviceType::Qsv, "qsv", "Intel Quick Sync Video"),
  (
    AVHWDeviceType::Dxva2,
    "dxva2",
    "DirectX Video Acceleration 2 (Windows)",
  ),
  (AVHWDeviceType::Vdpau, "vdpau", "NVIDIA VDPAU (Linux)"),
  (AVHWDeviceType::Vulkan, "vulkan", "Vulkan Video"),
];

/// List all known hardware accelerators and their availability.
#[napi]
pub fn get_hardware_accelerators() -> Vec<HardwareAccelerator> {
  KNOWN_ACCELERATORS
    .iter()
    .map(|(hw_type, name, desc)| HardwareAccelerator {
      name: name.to_string(),
      description: desc.to_string(),
      available: HwDeviceContext::is_available(*hw_type),
    })
    .collect()
}

/// List only the accelerators that are available on this system.
#[napi]
pub fn get_available_hardware_accelerators() -> Vec<String> {
  get_hardware_accelerators()
    .into_iter()
    .filter(|a| a.available)
    .map(|a| a.name)
    .collect()
}

/// Check whether a named accelerator is available.
#[napi]
pub fn is_hardware_accelerator_available(name: String) -> bool {
  is_hardware_accelerator_available_str(&name)
}

fn is_hardware_accelerator_available_str(name: &str) -> bool {
  let hw_type = match name {
    "videotoolbox" => Some(AVHWDeviceType::Videotoolbox),
    "cuda" | "nvenc" => Some(AVHWDeviceType::Cuda),
    "vaapi" => Some(AVHWDeviceType::Vaapi),
    "d3d11va" => Some(AVHWDeviceType::D3d11va),
    "qsv" => Some(AVHWDeviceType::Qsv),
    "dxva2" => Some(AVHWDeviceType::Dxva2),
    "vdpau" => Some(AVHWDeviceType::Vdpau),
    "vulkan" => Some(AVHWDeviceType::Vulkan),
    _ => None,
  };

  hw_type.map(HwDeviceContext::is_available).unwrap_or(false)
}

/// The accelerator the pipeline would pick for `prefer-hardware` /
/// `require-hardware` on this platform, if any is available.
#[napi]
pub fn get_preferred_hardware_accelerator() -> Option<String> {
  #[cfg(target_os = "macos")]
  {
    if HwDeviceContext::is_available(AVHWDeviceType::Videotoolbox) {
      return Some("videotoolbox".to_string());
    }
  }

  #[cfg(target_os = "linux")]
  {
    if HwDeviceContext::is_available(AVHWDeviceType::Vaapi) {
      return Some("vaapi".to_string());
    }
  }

  #[cfg(target_os = "windows")]
  {
    if HwDeviceContext::is_available(AVHWDeviceType::D3d11va) {
      return Some("d3d11va".to_string());
    }
    if HwDeviceContext::is_available(AVHWDeviceType::Dxva2) {
      return Some("dxva2".to_string());
    }
  }

  if HwDeviceContext::is_available(AVHWDeviceType::Cuda) {
    return Some("cuda".to_string());
  }
  if HwDeviceContext::is_available(AVHWDeviceType::Qsv) {
    return Some("qsv".to_string());
  }

  None
}

/// Resolve a [`crate::video_config::HardwareAcceleration`] preference to a
/// concrete device type to open, given the platform's preferred accelerator.
/// Returns `None` for software or when nothing is available.
pub fn resolve_device_for_preference(prefer_hardware: bool) -> Option<AVHWDeviceType> {
  if !prefer_hardware || is_hw_encoding_disabled() {
    return None;
  }
  match get_preferred_hardware_accelerator()?.as_str() {
    "videotoolbox" => Some(AVHWDeviceType::Videotoolbox),
    "cuda" => Some(AVHWDeviceType::Cuda),
    "vaapi" => Some(AVHWDeviceType::Vaapi),
    "d3d11va" => Some(AVHWDeviceType::D3d11va),
    "dxva2" => Some(AVHWDeviceType::Dxva2),
    "qsv" => Some(AVHWDeviceType::Qsv),
    "vdpau" => Some(AVHWDeviceType::Vdpau),
    "vulkan" => Some(AVHWDeviceType::Vulkan),
    _ => None,
  }
}

// ============================================================================
// Hardware fallback protocol (Chromium-aligned)
// ============================================================================

const GLOBAL_FAILURE_THRESHOLD: u32 = 3;
const FORGIVENESS_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct HwFallbackState {
  encoding_disabled: bool,
  encoding_failure_count: u32,
  encoding_disabled_at: Option<Instant>,
}

static HW_STATE: Mutex<HwFallbackState> = Mutex::new(HwFallbackState {
  encoding_disabled: false,
  encoding_failure_count: 0,
  encoding_disabled_at: None,
});

/// Reset all hardware fallback state, re-enabling hardware encoding
/// immediately. Exposed for test isolation and manual recovery.
#[napi]
pub fn reset_hardware_fallback_state() {
  if let Ok(mut state) = HW_STATE.lock() {
    state.encoding_disabled = false;
    state.encoding_failure_count = 0;
    state.encoding_disabled_at = None;
  }
}

/// Whether hardware encoding is currently disabled due to repeated failures.
/// Applies time-based forgiveness as a side effect.
pub fn is_hw_encoding_disabled() -> bool {
  if let Ok(mut state) = HW_STATE.lock() {
    if !state.encoding_disabled {
      return false;
    }

    if let Some(disabled_at) = state.encoding_disabled_at {
      if disabled_at.elapsed() >= FORGIVENESS_INTERVAL {
        state.encoding_disabled = false;
        state.encoding_failure_count = 0;
        state.encoding_disabled_at = None;
        tracing::debug!("hardware encoding fallback forgiven, re-enabling hardware");
        return false;
      }
    }

    true
  } else {
    false
  }
}

/// Record a hardware encoding failure. After [`GLOBAL_FAILURE_THRESHOLD`]
/// failures, hardware encoding is disabled for the process.
pub fn record_hw_encoding_failure() {
  if let Ok(mut state) = HW_STATE.lock() {
    state.encoding_failure_count = state.encoding_failure_count.saturating_add(1);

    if state.encoding_failure_count >= GLOBAL_FAILURE_THRESHOLD && !state.encoding_disabled {
      state.encoding_disabled = true;
      state.encoding_disabled_at = Some(Instant::now());
      tracing::warn!(
        failures = state.encoding_failure_count,
        "disabling hardware encoding after repeated failures"
      );
    }
  }
}

/// Record a successful hardware encoding operation, resetting the failure
/// count.
pub fn record_hw_encoding_success() {
  if let Ok(mut state) = HW_STATE.lock() {
    state.encoding_failure_count = 0;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reset_state() {
    reset_hardware_fallback_state();
  }

  #[test]
  fn encoding_failure_threshold_disables_hardware() {
    reset_state();
    assert!(!is_hw_encoding_disabled());
    for _ in 0..GLOBAL_FAILURE_THRESHOLD {
      record_hw_encoding_failure();
    }
    assert!(is_hw_encoding_disabled());
    reset_state();
  }

  #[test]
  fn encoding_success_resets_count() {
    reset_state();
    record_hw_encoding_failure();
    record_hw_encoding_failure();
    record_hw_encoding_success();
    record_hw_encoding_failure();
    record_hw_encoding_failure();
    assert!(!is_hw_encoding_disabled());
    reset_state();
  }

  #[test]
  fn reset_clears_state() {
    reset_state();
    for _ in 0..GLOBAL_FAILURE_THRESHOLD {
      record_hw_encoding_failure();
    }
    assert!(is_hw_encoding_disabled());
    reset_hardware_fallback_state();
    assert!(!is_hw_encoding_disabled());
  }

  #[test]
  fn additional_failures_dont_restart_forgiveness_timer() {
    reset_state();
    for _ in 0..GLOBAL_FAILURE_THRESHOLD {
      record_hw_encoding_failure();
    }
    assert!(is_hw_encoding_disabled());

    let disabled_at = HW_STATE.lock().unwrap().encoding_disabled_at;
    assert!(disabled_at.is_some());

    record_hw_encoding_failure();
    record_hw_encoding_failure();

    let disabled_at_after = HW_STATE.lock().unwrap().encoding_disabled_at;
    assert_eq!(disabled_at, disabled_at_after);
    reset_state();
  }
}
