//! Graphics backend used when the build carries no image decoders.

use gfx_comms::{GfxProcessor, GfxTask, SupportedFormats};

/// Reports no supported formats and fails every task.
///
/// Keeps the worker usable as a protocol endpoint (hello, shutdown, format
/// query) on builds without a decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGraphicsBackend;

impl GfxProcessor for NoGraphicsBackend {
    fn supported_formats(&self) -> SupportedFormats {
        SupportedFormats::default()
    }

    fn process(&self, task: &GfxTask) -> Result<Vec<Vec<u8>>, String> {
        Err(format!("no graphics backend available for {}", task.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gfx_comms::GfxSize;

    #[test]
    fn test_no_formats() {
        let formats = NoGraphicsBackend.supported_formats();
        assert!(formats.formats.is_empty());
        assert!(formats.video_formats.is_empty());
    }

    #[test]
    fn test_tasks_fail_with_path() {
        let task = GfxTask {
            path: "/tmp/a.jpg".to_string(),
            sizes: vec![GfxSize::new(10, 10)],
        };
        assert_eq!(
            NoGraphicsBackend.process(&task),
            Err("no graphics backend available for /tmp/a.jpg".to_string())
        );
    }
}
