use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

/// Grabs live frames from a camera via ffmpeg-next (libavdevice).
///
/// `/dev/video*` paths are opened through the v4l2 demuxer; anything else is
/// handed to libavformat as a regular file or URL, so a recording can be
/// replayed as if it were a camera.
pub struct FfmpegCameraSource {
    device: String,
    capture: Option<Capture>,
}

struct Capture {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    stream_index: usize,
    frame_index: usize,
}

// Safety: FfmpegCameraSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCameraSource {}

impl FfmpegCameraSource {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            capture: None,
        }
    }
}

fn is_v4l2_device(device: &str) -> bool {
    device.starts_with("/dev/video")
}

fn open_input(
    device: &str,
) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
    if !is_v4l2_device(device) {
        return Ok(ffmpeg_next::format::input(&device)?);
    }

    ffmpeg_next::device::register_all();
    let demuxer = ffmpeg_next::device::input::video()
        .find(|fmt| fmt.name().contains("v4l2") || fmt.name().contains("video4linux2"))
        .ok_or("ffmpeg was built without the v4l2 input device")?;
    let ctx = ffmpeg_next::format::open_with(
        &device,
        &ffmpeg_next::format::format::Format::Input(demuxer),
        ffmpeg_next::Dictionary::new(),
    )?;
    Ok(ctx.input())
}

fn extract_rgb_pixels(rgb_frame: &ffmpeg_next::util::frame::video::Video) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = rgb_frame.width() as usize;
    let h = rgb_frame.height() as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

impl Capture {
    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let (width, height) = (decoded.width(), decoded.height());
        // Cameras may only settle on a pixel format once the first frame arrives.
        if self.scaler.is_none() {
            self.scaler = Some(ffmpeg_next::software::scaling::Context::get(
                decoded.format(),
                width,
                height,
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?);
        }
        let scaler = self.scaler.as_mut().ok_or("scaler not initialised")?;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&decoded, &mut rgb_frame)?;
        let frame = Frame::new(
            extract_rgb_pixels(&rgb_frame),
            width,
            height,
            3,
            self.frame_index,
        );
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }
        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                return self.try_receive();
            };
            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }
}

impl FrameSource for FfmpegCameraSource {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = open_input(&self.device)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
        log::debug!(
            "Opened {} ({}x{})",
            self.device,
            decoder.width(),
            decoder.height()
        );

        self.capture = Some(Capture {
            ictx,
            decoder,
            scaler: None,
            stream_index,
            frame_index: 0,
        });
        Ok(())
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let capture = self.capture.as_mut()?;
        match capture.grab() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Failed to grab frame from {}: {e}", self.device);
                None
            }
        }
    }

    fn describe(&self) -> String {
        self.device.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/dev/video0", true)]
    #[case("/dev/video12", true)]
    #[case("recording.mp4", false)]
    #[case("rtsp://camera.local/stream", false)]
    fn test_is_v4l2_device(#[case] device: &str, #[case] expected: bool) {
        assert_eq!(is_v4l2_device(device), expected);
    }

    #[test]
    fn test_next_frame_before_open_is_none() {
        let mut source = FfmpegCameraSource::new("/dev/video0");
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let mut source = FfmpegCameraSource::new("/nonexistent/recording.mp4");
        assert!(source.open().is_err());
    }

    #[test]
    fn test_describe_names_device() {
        assert_eq!(FfmpegCameraSource::new("/dev/video2").describe(), "/dev/video2");
    }
}
