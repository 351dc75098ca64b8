// Real capture devices via nokhwa.
// Each worker thread opens its own CameraCapture, so the nokhwa handle never
// crosses threads. Frames come out as RGBA8 at the configured size.

use crate::error::{Error, Result};
use crate::lifecycle::{Facing, FrameSource, SourceOpener, SourceRequest};
use crate::types::FrameBuffer;

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
        Resolution,
    },
};

use image::{DynamicImage, RgbImage, imageops::FilterType};
use tracing::{debug, info};

/// List attached cameras as "index: name" lines.
/// No camera at all is fatal: there is nothing to switch to.
pub fn probe_devices() -> Result<Vec<String>> {
    let cameras = nokhwa::query(ApiBackend::Auto)
        .map_err(|e| Error::SourceUnavailable(format!("Query cameras: {e}")))?;
    if cameras.is_empty() {
        return Err(Error::SourceUnavailable("no camera devices found".into()));
    }
    Ok(cameras
        .iter()
        .map(|c| format!("{}: {}", c.index(), c.human_name()))
        .collect())
}

/// Maps a facing to a device index. Desktop cameras have no facing of their own.
pub struct DeviceOpener {
    pub front_index: u32,
    pub back_index: u32,
}

impl SourceOpener for DeviceOpener {
    type Source = CameraCapture;

    fn open(&self, request: &SourceRequest) -> Result<CameraCapture> {
        let index = match request.facing {
            Facing::Front => self.front_index,
            Facing::Back => self.back_index,
        };
        CameraCapture::open(index, request)
    }
}

// A small wrapper around nokhwa::Camera that always hands out frames of one size.
pub struct CameraCapture {
    cam: Camera,
    target_width: u32,
    target_height: u32,
    exact: bool,
}

impl CameraCapture {
    /// Open device `index` near the requested resolution and start streaming.
    /// With `exact`, a device that settles on another resolution is refused.
    pub fn open(index: u32, request: &SourceRequest) -> Result<Self> {
        let fmt = CameraFormat::new(
            Resolution::new(request.width, request.height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,
        );
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(CameraIndex::Index(index), req)
            .map_err(|e| Error::SourceRequestFailed(format!("Create camera {index}: {e}")))?;
        cam.open_stream()
            .map_err(|e| Error::SourceRequestFailed(format!("Open stream {index}: {e}")))?;

        // The stream might choose a slightly different resolution.
        let actual = cam.resolution();
        if request.exact && (actual.width(), actual.height()) != (request.width, request.height) {
            return Err(Error::SourceRequestFailed(format!(
                "camera {index} delivers {}x{}, {}x{} required",
                actual.width(),
                actual.height(),
                request.width,
                request.height
            )));
        }
        info!(
            index,
            facing = ?request.facing,
            width = actual.width(),
            height = actual.height(),
            "camera stream open"
        );

        Ok(Self {
            cam,
            target_width: request.width,
            target_height: request.height,
            exact: request.exact,
        })
    }
}

impl FrameSource for CameraCapture {
    /// Grab one frame (blocks until the camera has one) and convert it to RGBA8.
    fn next_frame(&mut self) -> Result<FrameBuffer> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;
        let (w, h) = decoded.dimensions();
        let rgb = RgbImage::from_raw(w, h, decoded.into_raw())
            .ok_or_else(|| Error::MalformedFrame(format!("{w}x{h} RGB buffer too short")))?;

        let rgb = if (w, h) == (self.target_width, self.target_height) {
            rgb
        } else if self.exact {
            return Err(Error::CameraFrame(format!(
                "frame is {w}x{h}, expected {}x{}",
                self.target_width, self.target_height
            )));
        } else {
            debug!(w, h, "resizing frame");
            image::imageops::resize(&rgb, self.target_width, self.target_height, FilterType::Triangle)
        };

        let rgba = DynamicImage::ImageRgb8(rgb).into_rgba8();
        let (w, h) = rgba.dimensions();
        FrameBuffer::from_rgba(w as usize, h as usize, rgba.into_raw())
    }
}
