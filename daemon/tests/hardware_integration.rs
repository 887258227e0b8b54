mod common;

#[cfg(test)]
mod tests {
    use crate::common::{confirm_action, print_error, print_header, print_info, print_success};
    use seerd::config::{OcrConfig, SpeechConfig};
    use seerd::speech::{EspeakSpeaker, Speaker, VoiceParams};
    use seerd::vision::{TesseractReader, TextRecognizer};

    #[test]
    #[ignore = "Requires espeak-ng and an audio output device"]
    fn test_speaker_says_hello() {
        print_header("Speech Engine Test");
        print_info("This test speaks a short sentence through espeak-ng.");

        if !confirm_action("Ready to listen? (y/n)") {
            return;
        }

        let mut speaker = EspeakSpeaker::new(&SpeechConfig::default())
            .expect("espeak-ng not available. Install it and retry.");

        match speaker.speak("Hello, I am ready to describe what I see") {
            Ok(()) => print_success("Sentence spoken"),
            Err(e) => {
                print_error(&format!("Speech failed: {}", e));
                panic!("speech failed");
            }
        }

        let slow = VoiceParams {
            rate: Some(90),
            volume: Some(0.5),
            voice: None,
        };
        speaker
            .speak_with("This one is slower and quieter", &slow)
            .expect("speech with overrides failed");
        print_success("Override parameters applied");
    }

    #[test]
    #[ignore = "Requires the tesseract OCR engine"]
    fn test_tesseract_reads_rendered_text() {
        print_header("OCR Engine Test");

        let reader = TesseractReader::new(&OcrConfig::default());
        let mut reader = match reader {
            Ok(reader) => reader,
            Err(e) => {
                print_error(&format!("tesseract not available: {}", e));
                panic!("tesseract not available");
            }
        };

        // A blank page has nothing to read.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        image::RgbImage::from_pixel(400, 200, image::Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let text = reader.read_text(&path).expect("OCR run failed");
        print_info(&format!("Read {:?}", text));
        assert!(text.trim().is_empty());
        print_success("Blank page produced no text");
    }

    #[cfg(feature = "camera")]
    #[test]
    #[ignore = "Requires a camera at /dev/video0"]
    fn test_camera_grabs_frame() {
        use seerd::camera::{Camera, CaptureStore, FrameSource};
        use seerd::config::CameraConfig;

        print_header("Camera Capture Test");
        print_info("Opens the default camera, grabs one frame and saves it.");

        let mut camera =
            Camera::open(&CameraConfig::default()).expect("Failed to open the default camera");
        let frame = camera.grab().expect("Failed to read a frame");
        print_info(&format!("Frame {}x{}", frame.width, frame.height));
        assert!(frame.width > 0 && frame.height > 0);

        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::open(dir.path()).unwrap();
        let stored = store.persist(&frame).expect("Failed to save frame");
        let path = stored.path().to_path_buf();
        assert!(path.exists());

        drop(stored);
        assert!(!path.exists());
        print_success("Frame captured, saved and removed");
    }
}
