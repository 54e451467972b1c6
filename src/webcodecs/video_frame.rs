//! VideoFrame — ref-counted, closeable carrier for a single decoded/raw video
//! image (component C1).
//!
//! Mirrors the W3C WebCodecs `VideoFrame` interface. Every accessor on a
//! closed frame fails with `InvalidStateError` rather than returning a
//! zero/null placeholder — a deliberately stronger invariant than some
//! native implementations use, chosen because it is what the spec actually
//! requires of conformant hosts.

use crate::codec::Frame;
use crate::error::{WebCodecsError, WebCodecsResult};
use crate::ffi::AVPixelFormat;
use std::sync::{Arc, Mutex};

/// Video pixel format (WebCodecs spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoPixelFormat {
  // 8-bit YUV formats
  I420,
  I420A,
  I422,
  I422A,
  I444,
  I444A,

  // 10-bit YUV formats
  I420P10,
  I420AP10,
  I422P10,
  I422AP10,
  I444P10,
  I444AP10,

  // 12-bit YUV formats
  I420P12,
  I422P12,
  I444P12,

  // Semi-planar formats
  NV12,
  NV21,

  // RGB formats
  RGBA,
  RGBX,
  BGRA,
  BGRX,
}

impl VideoPixelFormat {
  /// Convert from FFmpeg pixel format.
  pub fn from_av_format(format: AVPixelFormat) -> Option<Self> {
    match format {
      AVPixelFormat::Yuv420p => Some(VideoPixelFormat::I420),
      AVPixelFormat::Yuva420p => Some(VideoPixelFormat::I420A),
      AVPixelFormat::Yuv422p => Some(VideoPixelFormat::I422),
      AVPixelFormat::Yuva422p => Some(VideoPixelFormat::I422A),
      AVPixelFormat::Yuv444p => Some(VideoPixelFormat::I444),
      AVPixelFormat::Yuva444p => Some(VideoPixelFormat::I444A),
      AVPixelFormat::Nv12 => Some(VideoPixelFormat::NV12),
      AVPixelFormat::Nv21 => Some(VideoPixelFormat::NV21),
      AVPixelFormat::Rgba => Some(VideoPixelFormat::RGBA),
      AVPixelFormat::Bgra => Some(VideoPixelFormat::BGRA),
      AVPixelFormat::Argb => Some(VideoPixelFormat::RGBA),
      AVPixelFormat::Abgr => Some(VideoPixelFormat::BGRA),
      AVPixelFormat::Rgb24 => Some(VideoPixelFormat::RGBX),
      AVPixelFormat::Bgr24 => Some(VideoPixelFormat::BGRX),
      AVPixelFormat::Yuv420p10le => Some(VideoPixelFormat::I420P10),
      AVPixelFormat::Yuv422p10le => Some(VideoPixelFormat::I422P10),
      AVPixelFormat::Yuv444p10le => Some(VideoPixelFormat::I444P10),
      AVPixelFormat::Yuva420p10le => Some(VideoPixelFormat::I420AP10),
      AVPixelFormat::Yuva422p10le => Some(VideoPixelFormat::I422AP10),
      AVPixelFormat::Yuva444p10le => Some(VideoPixelFormat::I444AP10),
      AVPixelFormat::Yuv420p12le => Some(VideoPixelFormat::I420P12),
      AVPixelFormat::Yuv422p12le => Some(VideoPixelFormat::I422P12),
      AVPixelFormat::Yuv444p12le => Some(VideoPixelFormat::I444P12),
      _ => None,
    }
  }

  /// Convert to FFmpeg pixel format.
  pub fn to_av_format(&self) -> AVPixelFormat {
    match self {
      VideoPixelFormat::I420 => AVPixelFormat::Yuv420p,
      VideoPixelFormat::I420A => AVPixelFormat::Yuva420p,
      VideoPixelFormat::I422 => AVPixelFormat::Yuv422p,
      VideoPixelFormat::I422A => AVPixelFormat::Yuva422p,
      VideoPixelFormat::I444 => AVPixelFormat::Yuv444p,
      VideoPixelFormat::I444A => AVPixelFormat::Yuva444p,
      VideoPixelFormat::NV12 => AVPixelFormat::Nv12,
      VideoPixelFormat::NV21 => AVPixelFormat::Nv21,
      VideoPixelFormat::RGBA => AVPixelFormat::Rgba,
      VideoPixelFormat::RGBX => AVPixelFormat::Rgba,
      VideoPixelFormat::BGRA => AVPixelFormat::Bgra,
      VideoPixelFormat::BGRX => AVPixelFormat::Bgra,
      VideoPixelFormat::I420P10 => AVPixelFormat::Yuv420p10le,
      VideoPixelFormat::I420AP10 => AVPixelFormat::Yuva420p10le,
      VideoPixelFormat::I422P10 => AVPixelFormat::Yuv422p10le,
      VideoPixelFormat::I422AP10 => AVPixelFormat::Yuva422p10le,
      VideoPixelFormat::I444P10 => AVPixelFormat::Yuv444p10le,
      VideoPixelFormat::I444AP10 => AVPixelFormat::Yuva444p10le,
      VideoPixelFormat::I420P12 => AVPixelFormat::Yuv420p12le,
      VideoPixelFormat::I422P12 => AVPixelFormat::Yuv422p12le,
      VideoPixelFormat::I444P12 => AVPixelFormat::Yuv444p12le,
    }
  }

  /// Bytes per sample (1 for 8-bit, 2 for 10/12-bit).
  pub fn bytes_per_sample(&self) -> usize {
    match self {
      VideoPixelFormat::I420
      | VideoPixelFormat::I420A
      | VideoPixelFormat::I422
      | VideoPixelFormat::I422A
      | VideoPixelFormat::I444
      | VideoPixelFormat::I444A
      | VideoPixelFormat::NV12
      | VideoPixelFormat::NV21 => 1,
      VideoPixelFormat::I420P10
      | VideoPixelFormat::I420AP10
      | VideoPixelFormat::I422P10
      | VideoPixelFormat::I422AP10
      | VideoPixelFormat::I444P10
      | VideoPixelFormat::I444AP10
      | VideoPixelFormat::I420P12
      | VideoPixelFormat::I422P12
      | VideoPixelFormat::I444P12 => 2,
      VideoPixelFormat::RGBA
      | VideoPixelFormat::RGBX
      | VideoPixelFormat::BGRA
      | VideoPixelFormat::BGRX => 4,
    }
  }
}

/// Video color primaries (W3C WebCodecs spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoColorPrimaries {
  Bt709,
  Bt470bg,
  Smpte170m,
  Bt2020,
  Smpte432,
}

/// Video transfer characteristics (W3C WebCodecs spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoTransferCharacteristics {
  Bt709,
  Smpte170m,
  Iec6196621,
  Srgb,
  Linear,
  Pq,
  Hlg,
}

/// Video matrix coefficients (W3C WebCodecs spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMatrixCoefficients {
  Rgb,
  Bt709,
  Bt470bg,
  Smpte170m,
  Bt2020Ncl,
}

/// Color space parameters used to construct a [`VideoColorSpace`].
#[derive(Debug, Clone, Default)]
pub struct VideoColorSpaceInit {
  pub primaries: Option<VideoColorPrimaries>,
  pub transfer: Option<VideoTransferCharacteristics>,
  pub matrix: Option<VideoMatrixCoefficients>,
  pub full_range: Option<bool>,
}

/// Color space parameters carried by a [`VideoFrame`] (W3C WebCodecs spec).
#[derive(Debug, Clone, Default)]
pub struct VideoColorSpace {
  primaries: Option<VideoColorPrimaries>,
  transfer: Option<VideoTransferCharacteristics>,
  matrix: Option<VideoMatrixCoefficients>,
  full_range: Option<bool>,
}

impl VideoColorSpace {
  pub fn new(init: Option<VideoColorSpaceInit>) -> Self {
    match init {
      Some(init) => VideoColorSpace {
        primaries: init.primaries,
        transfer: init.transfer,
        matrix: init.matrix,
        full_range: init.full_range,
      },
      None => VideoColorSpace::default(),
    }
  }

  pub fn primaries(&self) -> Option<VideoColorPrimaries> {
    self.primaries
  }

  pub fn transfer(&self) -> Option<VideoTransferCharacteristics> {
    self.transfer
  }

  pub fn matrix(&self) -> Option<VideoMatrixCoefficients> {
    self.matrix
  }

  pub fn full_range(&self) -> Option<bool> {
    self.full_range
  }
}

/// Read-only rectangle, used for `codedRect`/`visibleRect` (W3C WebCodecs spec).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DOMRectReadOnly {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
}

impl DOMRectReadOnly {
  pub fn top(&self) -> f64 {
    self.y
  }

  pub fn right(&self) -> f64 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f64 {
    self.y + self.height
  }

  pub fn left(&self) -> f64 {
    self.x
  }
}

/// Rectangle used to request a sub-region (e.g. `visibleRect` override).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DOMRectInit {
  pub x: Option<f64>,
  pub y: Option<f64>,
  pub width: Option<f64>,
  pub height: Option<f64>,
}

/// Layout of a single plane within a packed buffer (W3C WebCodecs spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
  pub offset: u32,
  pub stride: u32,
}

/// Integer rectangle (used where `DOMRectInit`'s floating-point fields are
/// not needed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFrameRect {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

/// Metadata associated with a VideoFrame. Currently empty: the W3C metadata
/// registry defines no members as of this writing.
#[derive(Debug, Clone, Default)]
pub struct VideoFrameMetadata {}

/// Options for constructing a [`VideoFrame`] from a raw buffer
/// (`VideoFrameBufferInit` per spec).
#[derive(Debug, Clone)]
pub struct VideoFrameBufferInit {
  pub format: VideoPixelFormat,
  pub coded_width: u32,
  pub coded_height: u32,
  pub timestamp: i64,
  pub duration: Option<i64>,
  pub layout: Option<Vec<PlaneLayout>>,
  pub visible_rect: Option<DOMRectInit>,
  /// Rotation in degrees clockwise (0, 90, 180, 270), default 0.
  pub rotation: Option<f64>,
  pub flip: Option<bool>,
  pub display_width: Option<u32>,
  pub display_height: Option<u32>,
  pub color_space: Option<VideoColorSpaceInit>,
  pub metadata: Option<VideoFrameMetadata>,
}

/// Options for constructing a [`VideoFrame`] from another `VideoFrame`
/// (`VideoFrameInit` per spec).
#[derive(Debug, Clone, Default)]
pub struct VideoFrameInit {
  pub timestamp: Option<i64>,
  pub duration: Option<i64>,
  /// `"keep"` (default) or `"discard"`.
  pub alpha: Option<String>,
  pub visible_rect: Option<DOMRectInit>,
  pub rotation: Option<f64>,
  pub flip: Option<bool>,
  pub display_width: Option<u32>,
  pub display_height: Option<u32>,
  pub metadata: Option<VideoFrameMetadata>,
}

/// Options for `VideoFrame.copyTo()`.
#[derive(Debug, Clone, Default)]
pub struct VideoFrameCopyToOptions {
  pub format: Option<VideoPixelFormat>,
  pub rect: Option<DOMRectInit>,
  pub layout: Option<Vec<PlaneLayout>>,
}

/// Internal state for a VideoFrame. Dropping this (on `close()`) releases
/// one reference on the underlying FFmpeg buffer.
struct VideoFrameInner {
  frame: Frame,
  /// Original pixel format (preserved since FFmpeg may normalize RGBX→RGBA).
  original_format: VideoPixelFormat,
  timestamp_us: i64,
  duration_us: Option<i64>,
  display_width: u32,
  display_height: u32,
  rotation: f64,
  flip: bool,
  color_space: VideoColorSpace,
  closed: bool,
}

/// A single decoded/raw video image (component C1).
///
/// Each `VideoFrame` handle owns an independent `Arc<Mutex<..>>`; `clone()`
/// does not share that Arc, it clones the underlying FFmpeg frame (which
/// ref-counts the pixel buffer itself via `av_buffer_ref`/`av_frame_clone`)
/// into a brand-new handle. `close()` drops the frame, releasing one
/// reference on that buffer; every other accessor on a closed frame fails
/// with `InvalidStateError` rather than returning a placeholder value.
pub struct VideoFrame {
  inner: Arc<Mutex<Option<VideoFrameInner>>>,
}

/// Round to the nearest multiple of 90 and normalize into `[0, 360)`.
fn parse_rotation(rotation: f64) -> f64 {
  let aligned = (rotation / 90.0).round() * 90.0;
  let full_turns = (aligned / 360.0).floor() * 360.0;
  aligned - full_turns
}

impl VideoFrame {
  /// Construct a VideoFrame from raw packed/planar pixel data.
  pub fn new(data: &[u8], init: VideoFrameBufferInit) -> WebCodecsResult<Self> {
    let width = init.coded_width;
    let height = init.coded_height;

    if width == 0 {
      return Err(WebCodecsError::type_error(
        "codedWidth must be greater than 0",
      ));
    }
    if height == 0 {
      return Err(WebCodecsError::type_error(
        "codedHeight must be greater than 0",
      ));
    }

    let expected_size = Self::calculate_buffer_size(init.format, width, height) as usize;
    if data.len() < expected_size {
      return Err(WebCodecsError::type_error(format!(
        "Buffer too small: need {} bytes, got {}",
        expected_size,
        data.len()
      )));
    }

    let format = init.format.to_av_format();

    let mut frame = Frame::new_video(width, height, format)
      .map_err(|e| WebCodecsError::data(format!("Failed to create frame: {}", e)))?;

    Self::copy_data_to_frame(&mut frame, data, init.format, width, height)?;

    frame.set_pts(init.timestamp);
    if let Some(duration) = init.duration {
      frame.set_duration(duration);
    }

    let rotation = parse_rotation(init.rotation.unwrap_or(0.0));
    let flip = init.flip.unwrap_or(false);

    let display_width = init.display_width.unwrap_or(if rotation == 90.0 || rotation == 270.0 {
      height
    } else {
      width
    });
    let display_height = init.display_height.unwrap_or(if rotation == 90.0 || rotation == 270.0 {
      width
    } else {
      height
    });

    let color_space = VideoColorSpace::new(init.color_space);

    let inner = VideoFrameInner {
      frame,
      original_format: init.format,
      timestamp_us: init.timestamp,
      duration_us: init.duration,
      display_width,
      display_height,
      rotation,
      flip,
      color_space,
      closed: false,
    };

    Ok(Self {
      inner: Arc::new(Mutex::new(Some(inner))),
    })
  }

  /// Construct a VideoFrame from another VideoFrame, applying overrides.
  /// Equivalent to `new VideoFrame(videoFrame, init)` per spec.
  pub fn from_video_frame(source: &VideoFrame, init: Option<VideoFrameInit>) -> WebCodecsResult<Self> {
    source.with_inner(|source_inner| {
      let cloned_frame = source_inner
        .frame
        .try_clone()
        .map_err(|e| WebCodecsError::data(format!("Clone failed: {}", e)))?;

      let init = init.unwrap_or_default();

      let timestamp_us = init.timestamp.unwrap_or(source_inner.timestamp_us);
      let duration_us = init.duration.or(source_inner.duration_us);

      if init.visible_rect.is_some() {
        return Err(WebCodecsError::not_supported(
          "VideoFrame visibleRect parameter is not yet implemented",
        ));
      }

      // "Add Rotations" algorithm per spec.
      let init_rotation = parse_rotation(init.rotation.unwrap_or(0.0));
      let base_rotation = source_inner.rotation;
      let base_flip = source_inner.flip;
      let init_flip = init.flip.unwrap_or(false);

      let combined_rotation = if !base_flip {
        parse_rotation(base_rotation + init_rotation)
      } else {
        parse_rotation(base_rotation - init_rotation)
      };
      let combined_flip = base_flip != init_flip;

      let display_width = init.display_width.unwrap_or(source_inner.display_width);
      let display_height = init.display_height.unwrap_or(source_inner.display_height);

      let new_inner = VideoFrameInner {
        frame: cloned_frame,
        original_format: source_inner.original_format,
        timestamp_us,
        duration_us,
        display_width,
        display_height,
        rotation: combined_rotation,
        flip: combined_flip,
        color_space: source_inner.color_space.clone(),
        closed: false,
      };

      Ok(VideoFrame {
        inner: Arc::new(Mutex::new(Some(new_inner))),
      })
    })
  }

  /// Wrap an internal decoded [`Frame`] (decoder output path).
  pub fn from_internal(frame: Frame, timestamp_us: i64, duration_us: Option<i64>) -> Self {
    Self::from_internal_with_orientation(frame, timestamp_us, duration_us, 0.0, false)
  }

  /// Wrap an internal decoded [`Frame`], applying rotation/flip metadata
  /// (e.g. from a container's track rotation matrix).
  pub fn from_internal_with_orientation(
    frame: Frame,
    timestamp_us: i64,
    duration_us: Option<i64>,
    rotation: f64,
    flip: bool,
  ) -> Self {
    let width = frame.width();
    let height = frame.height();
    let parsed_rotation = parse_rotation(rotation);
    let original_format =
      VideoPixelFormat::from_av_format(frame.format()).unwrap_or(VideoPixelFormat::I420);

    let (display_width, display_height) = if parsed_rotation == 90.0 || parsed_rotation == 270.0 {
      (height, width)
    } else {
      (width, height)
    };

    let inner = VideoFrameInner {
      frame,
      original_format,
      timestamp_us,
      duration_us,
      display_width,
      display_height,
      rotation: parsed_rotation,
      flip,
      color_space: VideoColorSpace::default(),
      closed: false,
    };

    Self {
      inner: Arc::new(Mutex::new(Some(inner))),
    }
  }

  pub fn format(&self) -> Option<VideoPixelFormat> {
    let guard = self.inner.lock().ok()?;
    match guard.as_ref() {
      Some(inner) if !inner.closed => Some(inner.original_format),
      _ => None,
    }
  }

  /// Returns 0 when closed, per W3C spec.
  pub fn coded_width(&self) -> u32 {
    let guard = match self.inner.lock() {
      Ok(g) => g,
      Err(_) => return 0,
    };
    match guard.as_ref() {
      Some(inner) if !inner.closed => inner.frame.width(),
      _ => 0,
    }
  }

  /// Returns 0 when closed, per W3C spec.
  pub fn coded_height(&self) -> u32 {
    let guard = match self.inner.lock() {
      Ok(g) => g,
      Err(_) => return 0,
    };
    match guard.as_ref() {
      Some(inner) if !inner.closed => inner.frame.height(),
      _ => 0,
    }
  }

  /// Returns 0 when closed, per W3C spec.
  pub fn display_width(&self) -> u32 {
    let guard = match self.inner.lock() {
      Ok(g) => g,
      Err(_) => return 0,
    };
    match guard.as_ref() {
      Some(inner) if !inner.closed => inner.display_width,
      _ => 0,
    }
  }

  /// Returns 0 when closed, per W3C spec.
  pub fn display_height(&self) -> u32 {
    let guard = match self.inner.lock() {
      Ok(g) => g,
      Err(_) => return 0,
    };
    match guard.as_ref() {
      Some(inner) if !inner.closed => inner.display_height,
      _ => 0,
    }
  }

  /// The region containing valid pixel data. Fails with `InvalidStateError`
  /// if closed.
  pub fn coded_rect(&self) -> WebCodecsResult<DOMRectReadOnly> {
    self.with_inner(|inner| {
      Ok(DOMRectReadOnly {
        x: 0.0,
        y: 0.0,
        width: inner.frame.width() as f64,
        height: inner.frame.height() as f64,
      })
    })
  }

  /// The region of coded data that should be displayed. Fails with
  /// `InvalidStateError` if closed.
  pub fn visible_rect(&self) -> WebCodecsResult<DOMRectReadOnly> {
    self.with_inner(|inner| {
      Ok(DOMRectReadOnly {
        x: 0.0,
        y: 0.0,
        width: inner.display_width as f64,
        height: inner.display_height as f64,
      })
    })
  }

  /// Returns 0 when closed, per W3C spec.
  pub fn timestamp(&self) -> i64 {
    let guard = match self.inner.lock() {
      Ok(g) => g,
      Err(_) => return 0,
    };
    match guard.as_ref() {
      Some(inner) if !inner.closed => inner.timestamp_us,
      _ => 0,
    }
  }

  /// Returns `None` when closed, per W3C spec.
  pub fn duration(&self) -> Option<i64> {
    let guard = self.inner.lock().ok()?;
    match guard.as_ref() {
      Some(inner) if !inner.closed => inner.duration_us,
      _ => None,
    }
  }

  pub fn color_space(&self) -> WebCodecsResult<VideoColorSpace> {
    self.with_inner(|inner| Ok(inner.color_space.clone()))
  }

  pub fn closed(&self) -> bool {
    match self.inner.lock() {
      Ok(guard) => guard.is_none() || guard.as_ref().is_none_or(|i| i.closed),
      Err(_) => true,
    }
  }

  /// Number of planes for this frame's pixel format.
  pub fn number_of_planes(&self) -> WebCodecsResult<u32> {
    self.with_inner(|inner| Ok(Self::get_number_of_planes(inner.original_format)))
  }

  pub fn rotation(&self) -> WebCodecsResult<f64> {
    self.with_inner(|inner| Ok(inner.rotation))
  }

  pub fn flip(&self) -> WebCodecsResult<bool> {
    self.with_inner(|inner| Ok(inner.flip))
  }

  pub fn metadata(&self) -> WebCodecsResult<VideoFrameMetadata> {
    self.with_inner(|_inner| Ok(VideoFrameMetadata {}))
  }

  /// Bytes required by `copy_to()` for the given (or default) target format.
  pub fn allocation_size(&self, options: Option<&VideoFrameCopyToOptions>) -> WebCodecsResult<u32> {
    self.with_inner(|inner| {
      let format = options.and_then(|o| o.format).unwrap_or_else(|| {
        VideoPixelFormat::from_av_format(inner.frame.format()).unwrap_or(VideoPixelFormat::I420)
      });
      let width = inner.frame.width();
      let height = inner.frame.height();
      Ok(Self::calculate_buffer_size(format, width, height))
    })
  }

  /// Copy frame data into `destination`, returning the plane layout used.
  /// `rect` cropping is not yet implemented.
  pub async fn copy_to(
    &self,
    destination: &mut [u8],
    options: Option<VideoFrameCopyToOptions>,
  ) -> WebCodecsResult<Vec<PlaneLayout>> {
    if options.as_ref().and_then(|o| o.rect.as_ref()).is_some() {
      return Err(WebCodecsError::not_supported(
        "VideoFrame.copyTo rect parameter is not yet implemented",
      ));
    }

    let (format, width, height, size) = {
      let guard = self
        .inner
        .lock()
        .map_err(|_| WebCodecsError::operation("Lock poisoned"))?;

      let inner = match guard.as_ref() {
        Some(inner) if !inner.closed => inner,
        _ => return Err(WebCodecsError::invalid_state("VideoFrame is closed")),
      };

      let format =
        VideoPixelFormat::from_av_format(inner.frame.format()).unwrap_or(VideoPixelFormat::I420);
      let width = inner.frame.width();
      let height = inner.frame.height();
      let size = Self::calculate_buffer_size(format, width, height) as usize;

      (format, width, height, size)
    };

    if destination.len() < size {
      return Err(WebCodecsError::type_error(format!(
        "destination buffer too small: need {} bytes, got {}",
        size,
        destination.len()
      )));
    }

    let inner_clone = self.inner.clone();

    let copied_data = tokio::task::spawn_blocking(move || -> WebCodecsResult<Vec<u8>> {
      let guard = inner_clone
        .lock()
        .map_err(|_| WebCodecsError::operation("Lock poisoned"))?;

      let inner = match guard.as_ref() {
        Some(inner) if !inner.closed => inner,
        _ => return Err(WebCodecsError::invalid_state("VideoFrame is closed")),
      };

      let mut temp_buffer = vec![0u8; size];
      inner
        .frame
        .copy_to_buffer(&mut temp_buffer)
        .map_err(|e| WebCodecsError::operation(format!("Copy failed: {}", e)))?;

      Ok(temp_buffer)
    })
    .await
    .map_err(|e| WebCodecsError::operation(format!("Copy task failed: {}", e)))??;

    destination[..size].copy_from_slice(&copied_data);

    Ok(Self::get_plane_layouts(format, width, height))
  }

  fn get_plane_layouts(format: VideoPixelFormat, width: u32, height: u32) -> Vec<PlaneLayout> {
    let bps = format.bytes_per_sample() as u32;

    match format {
      VideoPixelFormat::I420 | VideoPixelFormat::I420P10 | VideoPixelFormat::I420P12 => {
        let y_stride = width * bps;
        let y_size = y_stride * height;
        let uv_stride = (width / 2) * bps;
        let uv_size = uv_stride * (height / 2);
        vec![
          PlaneLayout {
            offset: 0,
            stride: y_stride,
          },
          PlaneLayout {
            offset: y_size,
            stride: uv_stride,
          },
          PlaneLayout {
            offset: y_size + uv_size,
            stride: uv_stride,
          },
        ]
      }
      VideoPixelFormat::I420A | VideoPixelFormat::I420AP10 => {
        let y_stride = width * bps;
        let y_size = y_stride * height;
        let uv_stride = (width / 2) * bps;
        let uv_size = uv_stride * (height / 2);
        vec![
          PlaneLayout {
            offset: 0,
            stride: y_stride,
          },
          PlaneLayout {
            offset: y_size,
            stride: uv_stride,
          },
          PlaneLayout {
            offset: y_size + uv_size,
            stride: uv_stride,
          },
          PlaneLayout {
            offset: y_size + uv_size * 2,
            stride: y_stride,
          },
        ]
      }
      VideoPixelFormat::I422 | VideoPixelFormat::I422P10 | VideoPixelFormat::I422P12 => {
        let y_stride = width * bps;
        let y_size = y_stride * height;
        let uv_stride = (width / 2) * bps;
        let uv_size = uv_stride * height;
        vec![
          PlaneLayout {
            offset: 0,
            stride: y_stride,
          },
          PlaneLayout {
            offset: y_size,
            stride: uv_stride,
          },
          PlaneLayout {
            offset: y_size + uv_size,
            stride: uv_stride,
          },
        ]
      }
      VideoPixelFormat::I422A | VideoPixelFormat::I422AP10 => {
        let y_stride = width * bps;
        let y_size = y_stride * height;
        let uv_stride = (width / 2) * bps;
        let uv_size = uv_stride * height;
        vec![
          PlaneLayout {
            offset: 0,
            stride: y_stride,
          },
          PlaneLayout {
            offset: y_size,
            stride: uv_stride,
          },
          PlaneLayout {
            offset: y_size + uv_size,
            stride: uv_stride,
          },
          PlaneLayout {
            offset: y_size + uv_size * 2,
            stride: y_stride,
          },
        ]
      }
      VideoPixelFormat::I444 | VideoPixelFormat::I444P10 | VideoPixelFormat::I444P12 => {
        let plane_stride = width * bps;
        let plane_size = plane_stride * height;
        vec![
          PlaneLayout {
            offset: 0,
            stride: plane_stride,
          },
          PlaneLayout {
            offset: plane_size,
            stride: plane_stride,
          },
          PlaneLayout {
            offset: plane_size * 2,
            stride: plane_stride,
          },
        ]
      }
      VideoPixelFormat::I444A | VideoPixelFormat::I444AP10 => {
        let plane_stride = width * bps;
        let plane_size = plane_stride * height;
        vec![
          PlaneLayout {
            offset: 0,
            stride: plane_stride,
          },
          PlaneLayout {
            offset: plane_size,
            stride: plane_stride,
          },
          PlaneLayout {
            offset: plane_size * 2,
            stride: plane_stride,
          },
          PlaneLayout {
            offset: plane_size * 3,
            stride: plane_stride,
          },
        ]
      }
      VideoPixelFormat::NV12 | VideoPixelFormat::NV21 => {
        let y_size = width * height;
        vec![
          PlaneLayout {
            offset: 0,
            stride: width,
          },
          PlaneLayout {
            offset: y_size,
            stride: width,
          },
        ]
      }
      VideoPixelFormat::RGBA
      | VideoPixelFormat::RGBX
      | VideoPixelFormat::BGRA
      | VideoPixelFormat::BGRX => vec![PlaneLayout {
        offset: 0,
        stride: width * 4,
      }],
    }
  }

  /// Clone this frame: a new independent handle backed by the same
  /// underlying pixel buffer (ref-counted at the FFmpeg layer).
  pub fn clone_frame(&self) -> WebCodecsResult<VideoFrame> {
    self.with_inner(|inner| {
      let cloned_frame = inner
        .frame
        .try_clone()
        .map_err(|e| WebCodecsError::data(format!("Clone failed: {}", e)))?;

      let new_inner = VideoFrameInner {
        frame: cloned_frame,
        original_format: inner.original_format,
        timestamp_us: inner.timestamp_us,
        duration_us: inner.duration_us,
        display_width: inner.display_width,
        display_height: inner.display_height,
        rotation: inner.rotation,
        flip: inner.flip,
        color_space: inner.color_space.clone(),
        closed: false,
      };

      Ok(VideoFrame {
        inner: Arc::new(Mutex::new(Some(new_inner))),
      })
    })
  }

  /// Release the underlying buffer reference. Idempotent.
  pub fn close(&self) {
    if let Ok(mut guard) = self.inner.lock() {
      if let Some(inner) = guard.as_mut() {
        inner.closed = true;
      }
      *guard = None;
    }
  }

  // ==========================================================================
  // Internal helpers (crate-visible only)
  // ==========================================================================

  /// Borrow the internal frame for encoding.
  pub(crate) fn with_frame<F, R>(&self, f: F) -> WebCodecsResult<R>
  where
    F: FnOnce(&Frame) -> R,
  {
    self.with_inner(|inner| Ok(f(&inner.frame)))
  }

  fn with_inner<F, R>(&self, f: F) -> WebCodecsResult<R>
  where
    F: FnOnce(&VideoFrameInner) -> WebCodecsResult<R>,
  {
    let guard = self
      .inner
      .lock()
      .map_err(|_| WebCodecsError::operation("Lock poisoned"))?;

    match guard.as_ref() {
      Some(inner) if !inner.closed => f(inner),
      _ => Err(WebCodecsError::invalid_state("VideoFrame is closed")),
    }
  }

  fn calculate_buffer_size(format: VideoPixelFormat, width: u32, height: u32) -> u32 {
    let w = width;
    let h = height;
    let bps = format.bytes_per_sample() as u32;

    match format {
      VideoPixelFormat::I420 | VideoPixelFormat::I420P10 | VideoPixelFormat::I420P12 => {
        (w * h + (w / 2) * (h / 2) * 2) * bps
      }
      VideoPixelFormat::I420A | VideoPixelFormat::I420AP10 => {
        (w * h * 2 + (w / 2) * (h / 2) * 2) * bps
      }
      VideoPixelFormat::I422 | VideoPixelFormat::I422P10 | VideoPixelFormat::I422P12 => {
        (w * h + (w / 2) * h * 2) * bps
      }
      VideoPixelFormat::I422A | VideoPixelFormat::I422AP10 => (w * h * 2 + (w / 2) * h * 2) * bps,
      VideoPixelFormat::I444 | VideoPixelFormat::I444P10 | VideoPixelFormat::I444P12 => {
        w * h * 3 * bps
      }
      VideoPixelFormat::I444A | VideoPixelFormat::I444AP10 => w * h * 4 * bps,
      VideoPixelFormat::NV12 | VideoPixelFormat::NV21 => w * h + w * (h / 2),
      VideoPixelFormat::RGBA
      | VideoPixelFormat::RGBX
      | VideoPixelFormat::BGRA
      | VideoPixelFormat::BGRX => w * h * 4,
    }
  }

  fn get_number_of_planes(format: VideoPixelFormat) -> u32 {
    match format {
      VideoPixelFormat::RGBA
      | VideoPixelFormat::RGBX
      | VideoPixelFormat::BGRA
      | VideoPixelFormat::BGRX => 1,
      VideoPixelFormat::NV12 | VideoPixelFormat::NV21 => 2,
      VideoPixelFormat::I420
      | VideoPixelFormat::I420P10
      | VideoPixelFormat::I420P12
      | VideoPixelFormat::I422
      | VideoPixelFormat::I422P10
      | VideoPixelFormat::I422P12
      | VideoPixelFormat::I444
      | VideoPixelFormat::I444P10
      | VideoPixelFormat::I444P12 => 3,
      VideoPixelFormat::I420A
      | VideoPixelFormat::I420AP10
      | VideoPixelFormat::I422A
      | VideoPixelFormat::I422AP10
      | VideoPixelFormat::I444A
      | VideoPixelFormat::I444AP10 => 4,
    }
  }

  fn copy_data_to_frame(
    frame: &mut Frame,
    data: &[u8],
    format: VideoPixelFormat,
    width: u32,
    height: u32,
  ) -> WebCodecsResult<()> {
    let expected_size = Self::calculate_buffer_size(format, width, height) as usize;

    if data.len() < expected_size {
      return Err(WebCodecsError::type_error(format!(
        "Input data too small: need {} bytes, got {}",
        expected_size,
        data.len()
      )));
    }

    let linesize0 = frame.linesize(0) as usize;
    let linesize1 = frame.linesize(1) as usize;
    let linesize2 = frame.linesize(2) as usize;
    let linesize3 = frame.linesize(3) as usize;

    match format {
      VideoPixelFormat::I420 | VideoPixelFormat::I420A => {
        let y_size = (width * height) as usize;
        let u_width = (width / 2) as usize;
        let u_height = (height / 2) as usize;
        let v_offset = y_size + u_width * u_height;

        {
          let y_plane = frame
            .plane_data_mut(0)
            .ok_or_else(|| WebCodecsError::operation("Failed to get Y plane"))?;
          for row in 0..height as usize {
            let src_start = row * width as usize;
            let dst_start = row * linesize0;
            y_plane[dst_start..dst_start + width as usize]
              .copy_from_slice(&data[src_start..src_start + width as usize]);
          }
        }

        {
          let u_plane = frame
            .plane_data_mut(1)
            .ok_or_else(|| WebCodecsError::operation("Failed to get U plane"))?;
          for row in 0..u_height {
            let src_start = y_size + row * u_width;
            let dst_start = row * linesize1;
            u_plane[dst_start..dst_start + u_width]
              .copy_from_slice(&data[src_start..src_start + u_width]);
          }
        }

        {
          let v_plane = frame
            .plane_data_mut(2)
            .ok_or_else(|| WebCodecsError::operation("Failed to get V plane"))?;
          for row in 0..u_height {
            let src_start = v_offset + row * u_width;
            let dst_start = row * linesize2;
            v_plane[dst_start..dst_start + u_width]
              .copy_from_slice(&data[src_start..src_start + u_width]);
          }
        }

        if format == VideoPixelFormat::I420A {
          let a_offset = v_offset + u_width * u_height;
          let a_plane = frame
            .plane_data_mut(3)
            .ok_or_else(|| WebCodecsError::operation("Failed to get A plane"))?;
          for row in 0..height as usize {
            let src_start = a_offset + row * width as usize;
            let dst_start = row * linesize3;
            a_plane[dst_start..dst_start + width as usize]
              .copy_from_slice(&data[src_start..src_start + width as usize]);
          }
        }
      }
      VideoPixelFormat::NV12 | VideoPixelFormat::NV21 => {
        let y_size = (width * height) as usize;
        let uv_height = (height / 2) as usize;

        {
          let y_plane = frame
            .plane_data_mut(0)
            .ok_or_else(|| WebCodecsError::operation("Failed to get Y plane"))?;
          for row in 0..height as usize {
            let src_start = row * width as usize;
            let dst_start = row * linesize0;
            y_plane[dst_start..dst_start + width as usize]
              .copy_from_slice(&data[src_start..src_start + width as usize]);
          }
        }

        {
          let uv_plane = frame
            .plane_data_mut(1)
            .ok_or_else(|| WebCodecsError::operation("Failed to get UV/VU plane"))?;
          for row in 0..uv_height {
            let src_start = y_size + row * width as usize;
            let dst_start = row * linesize1;
            uv_plane[dst_start..dst_start + width as usize]
              .copy_from_slice(&data[src_start..src_start + width as usize]);
          }
        }
      }
      VideoPixelFormat::I422 | VideoPixelFormat::I422A => {
        let y_size = (width * height) as usize;
        let uv_width = (width / 2) as usize;
        let uv_size = uv_width * height as usize;
        let v_offset = y_size + uv_size;

        {
          let y_plane = frame
            .plane_data_mut(0)
            .ok_or_else(|| WebCodecsError::operation("Failed to get Y plane"))?;
          for row in 0..height as usize {
            let src_start = row * width as usize;
            let dst_start = row * linesize0;
            y_plane[dst_start..dst_start + width as usize]
              .copy_from_slice(&data[src_start..src_start + width as usize]);
          }
        }

        {
          let u_plane = frame
            .plane_data_mut(1)
            .ok_or_else(|| WebCodecsError::operation("Failed to get U plane"))?;
          for row in 0..height as usize {
            let src_start = y_size + row * uv_width;
            let dst_start = row * linesize1;
            u_plane[dst_start..dst_start + uv_width]
              .copy_from_slice(&data[src_start..src_start + uv_width]);
          }
        }

        {
          let v_plane = frame
            .plane_data_mut(2)
            .ok_or_else(|| WebCodecsError::operation("Failed to get V plane"))?;
          for row in 0..height as usize {
            let src_start = v_offset + row * uv_width;
            let dst_start = row * linesize2;
            v_plane[dst_start..dst_start + uv_width]
              .copy_from_slice(&data[src_start..src_start + uv_width]);
          }
        }

        if format == VideoPixelFormat::I422A {
          let a_offset = v_offset + uv_size;
          let a_plane = frame
            .plane_data_mut(3)
            .ok_or_else(|| WebCodecsError::operation("Failed to get A plane"))?;
          for row in 0..height as usize {
            let src_start = a_offset + row * width as usize;
            let dst_start = row * linesize3;
            a_plane[dst_start..dst_start + width as usize]
              .copy_from_slice(&data[src_start..src_start + width as usize]);
          }
        }
      }
      VideoPixelFormat::I444 | VideoPixelFormat::I444A => {
        let plane_size = (width * height) as usize;
        let u_offset = plane_size;
        let v_offset = plane_size * 2;

        {
          let y_plane = frame
            .plane_data_mut(0)
            .ok_or_else(|| WebCodecsError::operation("Failed to get Y plane"))?;
          for row in 0..height as usize {
            let src_start = row * width as usize;
            let dst_start = row * linesize0;
            y_plane[dst_start..dst_start + width as usize]
              .copy_from_slice(&data[src_start..src_start + width as usize]);
          }
        }

        {
          let u_plane = frame
            .plane_data_mut(1)
            .ok_or_else(|| WebCodecsError::operation("Failed to get U plane"))?;
          for row in 0..height as usize {
            let src_start = u_offset + row * width as usize;
            let dst_start = row * linesize1;
            u_plane[dst_start..dst_start + width as usize]
              .copy_from_slice(&data[src_start..src_start + width as usize]);
          }
        }

        {
          let v_plane = frame
            .plane_data_mut(2)
            .ok_or_else(|| WebCodecsError::operation("Failed to get V plane"))?;
          for row in 0..height as usize {
            let src_start = v_offset + row * width as usize;
            let dst_start = row * linesize2;
            v_plane[dst_start..dst_start + width as usize]
              .copy_from_slice(&data[src_start..src_start + width as usize]);
          }
        }

        if format == VideoPixelFormat::I444A {
          let a_offset = plane_size * 3;
          let a_plane = frame
            .plane_data_mut(3)
            .ok_or_else(|| WebCodecsError::operation("Failed to get A plane"))?;
          for row in 0..height as usize {
            let src_start = a_offset + row * width as usize;
            let dst_start = row * linesize3;
            a_plane[dst_start..dst_start + width as usize]
              .copy_from_slice(&data[src_start..src_start + width as usize]);
          }
        }
      }
      VideoPixelFormat::RGBA
      | VideoPixelFormat::RGBX
      | VideoPixelFormat::BGRA
      | VideoPixelFormat::BGRX => {
        let row_bytes = (width * 4) as usize;

        let plane = frame
          .plane_data_mut(0)
          .ok_or_else(|| WebCodecsError::operation("Failed to get plane"))?;
        for row in 0..height as usize {
          let src_start = row * row_bytes;
          let dst_start = row * linesize0;
          plane[dst_start..dst_start + row_bytes]
            .copy_from_slice(&data[src_start..src_start + row_bytes]);
        }
      }
      VideoPixelFormat::I420P10 | VideoPixelFormat::I420P12 | VideoPixelFormat::I420AP10 => {
        let bps = 2usize;
        let y_row_bytes = width as usize * bps;
        let y_size = y_row_bytes * height as usize;
        let uv_width = (width / 2) as usize;
        let uv_row_bytes = uv_width * bps;
        let uv_height = (height / 2) as usize;
        let uv_size = uv_row_bytes * uv_height;
        let v_offset = y_size + uv_size;

        {
          let y_plane = frame
            .plane_data_mut(0)
            .ok_or_else(|| WebCodecsError::operation("Failed to get Y plane"))?;
          for row in 0..height as usize {
            let src_start = row * y_row_bytes;
            let dst_start = row * linesize0;
            y_plane[dst_start..dst_start + y_row_bytes]
              .copy_from_slice(&data[src_start..src_start + y_row_bytes]);
          }
        }

        {
          let u_plane = frame
            .plane_data_mut(1)
            .ok_or_else(|| WebCodecsError::operation("Failed to get U plane"))?;
          for row in 0..uv_height {
            let src_start = y_size + row * uv_row_bytes;
            let dst_start = row * linesize1;
            u_plane[dst_start..dst_start + uv_row_bytes]
              .copy_from_slice(&data[src_start..src_start + uv_row_bytes]);
          }
        }

        {
          let v_plane = frame
            .plane_data_mut(2)
            .ok_or_else(|| WebCodecsError::operation("Failed to get V plane"))?;
          for row in 0..uv_height {
            let src_start = v_offset + row * uv_row_bytes;
            let dst_start = row * linesize2;
            v_plane[dst_start..dst_start + uv_row_bytes]
              .copy_from_slice(&data[src_start..src_start + uv_row_bytes]);
          }
        }

        if format == VideoPixelFormat::I420AP10 {
          let a_offset = v_offset + uv_size;
          let a_plane = frame
            .plane_data_mut(3)
            .ok_or_else(|| WebCodecsError::operation("Failed to get A plane"))?;
          for row in 0..height as usize {
            let src_start = a_offset + row * y_row_bytes;
            let dst_start = row * linesize3;
            a_plane[dst_start..dst_start + y_row_bytes]
              .copy_from_slice(&data[src_start..src_start + y_row_bytes]);
          }
        }
      }
      VideoPixelFormat::I422P10 | VideoPixelFormat::I422P12 | VideoPixelFormat::I422AP10 => {
        let bps = 2usize;
        let y_row_bytes = width as usize * bps;
        let y_size = y_row_bytes * height as usize;
        let uv_width = (width / 2) as usize;
        let uv_row_bytes = uv_width * bps;
        let uv_size = uv_row_bytes * height as usize;
        let v_offset = y_size + uv_size;

        {
          let y_plane = frame
            .plane_data_mut(0)
            .ok_or_else(|| WebCodecsError::operation("Failed to get Y plane"))?;
          for row in 0..height as usize {
            let src_start = row * y_row_bytes;
            let dst_start = row * linesize0;
            y_plane[dst_start..dst_start + y_row_bytes]
              .copy_from_slice(&data[src_start..src_start + y_row_bytes]);
          }
        }

        {
          let u_plane = frame
            .plane_data_mut(1)
            .ok_or_else(|| WebCodecsError::operation("Failed to get U plane"))?;
          for row in 0..height as usize {
            let src_start = y_size + row * uv_row_bytes;
            let dst_start = row * linesize1;
            u_plane[dst_start..dst_start + uv_row_bytes]
              .copy_from_slice(&data[src_start..src_start + uv_row_bytes]);
          }
        }

        {
          let v_plane = frame
            .plane_data_mut(2)
            .ok_or_else(|| WebCodecsError::operation("Failed to get V plane"))?;
          for row in 0..height as usize {
            let src_start = v_offset + row * uv_row_bytes;
            let dst_start = row * linesize2;
            v_plane[dst_start..dst_start + uv_row_bytes]
              .copy_from_slice(&data[src_start..src_start + uv_row_bytes]);
          }
        }

        if format == VideoPixelFormat::I422AP10 {
          let a_offset = v_offset + uv_size;
          let a_plane = frame
            .plane_data_mut(3)
            .ok_or_else(|| WebCodecsError::operation("Failed to get A plane"))?;
          for row in 0..height as usize {
            let src_start = a_offset + row * y_row_bytes;
            let dst_start = row * linesize3;
            a_plane[dst_start..dst_start + y_row_bytes]
              .copy_from_slice(&data[src_start..src_start + y_row_bytes]);
          }
        }
      }
      VideoPixelFormat::I444P10 | VideoPixelFormat::I444P12 | VideoPixelFormat::I444AP10 => {
        let bps = 2usize;
        let plane_row_bytes = width as usize * bps;
        let plane_size = plane_row_bytes * height as usize;
        let u_offset = plane_size;
        let v_offset = plane_size * 2;

        {
          let y_plane = frame
            .plane_data_mut(0)
            .ok_or_else(|| WebCodecsError::operation("Failed to get Y plane"))?;
          for row in 0..height as usize {
            let src_start = row * plane_row_bytes;
            let dst_start = row * linesize0;
            y_plane[dst_start..dst_start + plane_row_bytes]
              .copy_from_slice(&data[src_start..src_start + plane_row_bytes]);
          }
        }

        {
          let u_plane = frame
            .plane_data_mut(1)
            .ok_or_else(|| WebCodecsError::operation("Failed to get U plane"))?;
          for row in 0..height as usize {
            let src_start = u_offset + row * plane_row_bytes;
            let dst_start = row * linesize1;
            u_plane[dst_start..dst_start + plane_row_bytes]
              .copy_from_slice(&data[src_start..src_start + plane_row_bytes]);
          }
        }

        {
          let v_plane = frame
            .plane_data_mut(2)
            .ok_or_else(|| WebCodecsError::operation("Failed to get V plane"))?;
          for row in 0..height as usize {
            let src_start = v_offset + row * plane_row_bytes;
            let dst_start = row * linesize2;
            v_plane[dst_start..dst_start + plane_row_bytes]
              .copy_from_slice(&data[src_start..src_start + plane_row_bytes]);
          }
        }

        if format == VideoPixelFormat::I444AP10 {
          let a_offset = plane_size * 3;
          let a_plane = frame
            .plane_data_mut(3)
            .ok_or_else(|| WebCodecsError::operation("Failed to get A plane"))?;
          for row in 0..height as usize {
            let src_start = a_offset + row * plane_row_bytes;
            let dst_start = row * linesize3;
            a_plane[dst_start..dst_start + plane_row_bytes]
              .copy_from_slice(&data[src_start..src_start + plane_row_bytes]);
          }
        }
      }
    }

    Ok(())
  }
}

impl Drop for VideoFrame {
  fn drop(&mut self) {
    self.close();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn make_i420(width: u32, height: u32, timestamp: i64) -> VideoFrame {
    let size = (width * height + (width / 2) * (height / 2) * 2) as usize;
    let data = vec![0u8; size];
    VideoFrame::new(
      &data,
      VideoFrameBufferInit {
        format: VideoPixelFormat::I420,
        coded_width: width,
        coded_height: height,
        timestamp,
        duration: Some(33_333),
        layout: None,
        visible_rect: None,
        rotation: None,
        flip: None,
        display_width: None,
        display_height: None,
        color_space: None,
        metadata: None,
      },
    )
    .expect("valid frame")
  }

  #[test]
  fn zero_dimensions_rejected() {
    let err = VideoFrame::new(
      &[],
      VideoFrameBufferInit {
        format: VideoPixelFormat::I420,
        coded_width: 0,
        coded_height: 16,
        timestamp: 0,
        duration: None,
        layout: None,
        visible_rect: None,
        rotation: None,
        flip: None,
        display_width: None,
        display_height: None,
        color_space: None,
        metadata: None,
      },
    )
    .unwrap_err();
    assert_eq!(err.kind, crate::error::ErrorKind::TypeError);
  }

  #[test]
  fn close_fails_every_accessor() {
    let frame = make_i420(16, 16, 1000);
    frame.close();
    assert!(frame.closed());
    assert_eq!(frame.coded_width(), 0);
    assert_eq!(frame.timestamp(), 0);
    assert!(frame.duration().is_none());
    assert!(frame.coded_rect().is_err());
    assert!(frame.clone_frame().is_err());
  }

  #[test]
  fn close_is_idempotent() {
    let frame = make_i420(16, 16, 0);
    frame.close();
    frame.close();
    assert!(frame.closed());
  }

  #[test]
  fn clone_is_independent_handle() {
    let frame = make_i420(16, 16, 500);
    let cloned = frame.clone_frame().expect("clone");
    frame.close();
    assert!(frame.closed());
    assert!(!cloned.closed());
    assert_eq!(cloned.timestamp(), 500);
  }

  #[test]
  fn rotation_normalizes_and_swaps_display_dims() {
    let data = vec![0u8; (32 * 16 + 16 * 8 * 2) as usize];
    let frame = VideoFrame::new(
      &data,
      VideoFrameBufferInit {
        format: VideoPixelFormat::I420,
        coded_width: 32,
        coded_height: 16,
        timestamp: 0,
        duration: None,
        layout: None,
        visible_rect: None,
        rotation: Some(450.0),
        flip: None,
        display_width: None,
        display_height: None,
        color_space: None,
        metadata: None,
      },
    )
    .expect("valid frame");
    assert_eq!(frame.rotation().unwrap(), 90.0);
    assert_eq!(frame.display_width(), 16);
    assert_eq!(frame.display_height(), 32);
  }
}
