//! Text recognition: the [`PageRecognizer`] capability and its Tesseract backend.
//!
//! [`TesseractRecognizer`] runs one `tesseract` child process per page. A
//! crash, hang or memory blow-up inside the engine stays inside that process
//! and is reported as a failure for that page only.
//!
//! The rendered page is handed over as a lossless PNG in a temp file, which is
//! removed when the call returns.

use crate::config::OcrConfig;
use crate::error::CapabilityError;
use image::DynamicImage;
use std::io::{Cursor, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Extracts text from one rendered page image.
///
/// `languages` is a `+`-joined list of script codes such as `"kan+eng"`.
pub trait PageRecognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage, languages: &str) -> Result<String, CapabilityError>;
}

/// [`PageRecognizer`] that shells out to the Tesseract CLI.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    command: String,
    dpi: Option<u32>,
    timeout: Duration,
}

const POLL_INTERVAL: Duration = Duration::from_millis(25);

impl TesseractRecognizer {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            dpi: None,
            timeout,
        }
    }

    /// Recognizer matching the command, render DPI and timeout in `config`.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            config.tesseract_cmd.clone(),
            Duration::from_secs(config.page_timeout_secs),
        )
        .with_dpi(config.dpi)
    }

    /// Tell tesseract the resolution the page was rendered at.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    /// True if the executable can be started (`tesseract --version` succeeds).
    pub fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn build_command(&self, image_path: &std::path::Path, languages: &str) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg(image_path).arg("stdout").arg("-l").arg(languages);
        if let Some(dpi) = self.dpi {
            cmd.arg("--dpi").arg(dpi.to_string());
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl PageRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &DynamicImage, languages: &str) -> Result<String, CapabilityError> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;

        let mut tmp = tempfile::Builder::new()
            .prefix("pdf2corpus-page-")
            .suffix(".png")
            .tempfile()?;
        tmp.write_all(&png)?;
        tmp.flush()?;

        let mut child = self.build_command(tmp.path(), languages).spawn().map_err(|e| {
            CapabilityError::msg(format!("failed to start '{}': {}", self.command, e))
        })?;

        // Drain both pipes on their own threads so a chatty engine cannot
        // block on a full pipe while we wait for it to exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_with_deadline(&mut child, self.timeout)?;
        let stdout = join_drain(stdout)?;
        let stderr = join_drain(stderr)?;

        if !status.success() {
            let detail = String::from_utf8_lossy(&stderr);
            return Err(CapabilityError::msg(format!(
                "tesseract exited with {}: {}",
                status,
                detail.trim()
            )));
        }

        let text = String::from_utf8_lossy(&stdout).into_owned();
        debug!("tesseract returned {} bytes", text.len());
        Ok(text)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<std::io::Result<Vec<u8>>>> {
    pipe.map(|mut p| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            p.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join_drain(
    handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
) -> Result<Vec<u8>, CapabilityError> {
    match handle {
        None => Ok(Vec::new()),
        Some(h) => h
            .join()
            .map_err(|_| CapabilityError::msg("pipe reader thread panicked"))?
            .map_err(CapabilityError::from),
    }
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<ExitStatus, CapabilityError> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if start.elapsed() >= timeout {
            warn!("tesseract exceeded {}s, killing pid {}", timeout.as_secs(), child.id());
            let _ = child.kill();
            let _ = child.wait();
            return Err(CapabilityError::Timeout {
                secs: timeout.as_secs(),
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
