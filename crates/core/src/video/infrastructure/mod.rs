pub mod ffmpeg_camera_source;
pub mod headless_display;
#[cfg(feature = "highgui")]
pub mod highgui_display;
pub mod image_file_reader;
pub mod image_file_writer;
