//! Print strategies
//!
//! Each strategy is one independent way of handing an image to the OS print
//! subsystem. A strategy decides on its own whether it succeeded: a non-zero
//! exit status or a failed API call is a strategy failure.
//!
//! Supports:
//! - CUPS command line (`lpr`, `lp`)
//! - Windows GDI page printing (via Win32 API)
//! - Windows shell "print" verb and `mspaint /pt`

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::error::{PrintError, PrintResult};

/// Media options passed to CUPS for the 80 x 180 mm receipt
const CUPS_MEDIA: &str = "media=Custom.80x180mm";

/// One way of delivering an image to a printer
#[async_trait]
pub trait PrintStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Try to print the image once
    async fn attempt(&self, image: &Path) -> PrintResult<()>;
}

type ArgBuilder = Box<dyn Fn(&Path) -> Vec<OsString> + Send + Sync>;

/// Strategy backed by an external command
///
/// Success is a zero exit status.
pub struct CommandStrategy {
    name: String,
    program: String,
    args: ArgBuilder,
}

impl std::fmt::Debug for CommandStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandStrategy")
            .field("name", &self.name)
            .field("program", &self.program)
            .finish()
    }
}

impl CommandStrategy {
    pub fn new<F>(name: &str, program: &str, args: F) -> Self
    where
        F: Fn(&Path) -> Vec<OsString> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: Box::new(args),
        }
    }

    /// `lpr [-P printer] <image> -o media=... -o fit-to-page -o margin-top=0 -o margin-bottom=0`
    pub fn lpr(printer: Option<&str>) -> Self {
        let printer = printer.map(str::to_string);
        Self::new("lpr", "lpr", move |image| {
            let mut args: Vec<OsString> = Vec::new();
            if let Some(p) = &printer {
                args.push("-P".into());
                args.push(p.into());
            }
            args.push(image.into());
            for opt in [CUPS_MEDIA, "fit-to-page", "margin-top=0", "margin-bottom=0"] {
                args.push("-o".into());
                args.push(opt.into());
            }
            args
        })
    }

    /// `lp [-d printer] <image> -o media=... -o fit-to-page -o margin-top=0`
    pub fn lp(printer: Option<&str>) -> Self {
        let printer = printer.map(str::to_string);
        Self::new("lp", "lp", move |image| {
            let mut args: Vec<OsString> = Vec::new();
            if let Some(p) = &printer {
                args.push("-d".into());
                args.push(p.into());
            }
            args.push(image.into());
            for opt in [CUPS_MEDIA, "fit-to-page", "margin-top=0"] {
                args.push("-o".into());
                args.push(opt.into());
            }
            args
        })
    }

    /// Shell "print" verb of the application associated with the file
    pub fn shell_print(printer: Option<&str>) -> Self {
        let printer = printer.map(str::to_string);
        Self::new("shell-print", "powershell", move |image| {
            let path = image.display().to_string().replace('\'', "''");
            let command = match &printer {
                Some(p) => format!(
                    "Start-Process -FilePath '{}' -Verb PrintTo -ArgumentList '\"{}\"' -Wait",
                    path,
                    p.replace('\'', "''")
                ),
                None => format!("Start-Process -FilePath '{}' -Verb Print -Wait", path),
            };
            vec![
                "-NoProfile".into(),
                "-NonInteractive".into(),
                "-Command".into(),
                command.into(),
            ]
        })
    }

    /// `mspaint /pt <image> [printer]`
    pub fn mspaint(printer: Option<&str>) -> Self {
        let printer = printer.map(str::to_string);
        Self::new("mspaint", "mspaint", move |image| {
            let mut args: Vec<OsString> = vec!["/pt".into(), image.into()];
            if let Some(p) = &printer {
                args.push(p.into());
            }
            args
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for a given image
    pub fn command_args(&self, image: &Path) -> Vec<OsString> {
        (self.args)(image)
    }
}

#[async_trait]
impl PrintStrategy for CommandStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(strategy = %self.name, image = %image.display()))]
    async fn attempt(&self, image: &Path) -> PrintResult<()> {
        let args = self.command_args(image);
        debug!(program = %self.program, ?args, "Spawning print command");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if output.status.success() {
            info!("Print command accepted the job");
            return Ok(());
        }

        Err(PrintError::Command {
            program: self.program.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// GDI page printing through the printer driver
///
/// The image is scaled into the printable area with a 5% margin and centred.
#[cfg(windows)]
pub struct GdiStrategy {
    printer: Option<String>,
}

#[cfg(windows)]
impl GdiStrategy {
    pub fn new(printer: Option<&str>) -> Self {
        Self {
            printer: printer.map(str::to_string),
        }
    }

    /// Get the default printer name
    pub fn default_printer() -> PrintResult<Option<String>> {
        use windows::Win32::Graphics::Printing::GetDefaultPrinterW;
        use windows::core::PWSTR;

        unsafe {
            let mut needed: u32 = 0;
            let _ = GetDefaultPrinterW(None, &mut needed);

            if needed == 0 {
                return Ok(None);
            }

            let mut buf: Vec<u16> = vec![0; needed as usize];
            let ok = GetDefaultPrinterW(Some(PWSTR(buf.as_mut_ptr())), &mut needed);

            if !ok.as_bool() {
                return Ok(None);
            }

            let name = PWSTR(buf.as_mut_ptr())
                .to_string()
                .map_err(|e| PrintError::WindowsPrinter(format!("UTF-16 decode failed: {}", e)))?;

            Ok(Some(name))
        }
    }

    fn print_blocking(printer: &str, image: &Path) -> PrintResult<()> {
        use windows::Win32::Graphics::Gdi::{
            BI_RGB, BITMAPINFO, BITMAPINFOHEADER, CreateDCW, DIB_RGB_COLORS, DeleteDC,
            GetDeviceCaps, HORZRES, SRCCOPY, StretchDIBits, VERTRES,
        };
        use windows::Win32::Storage::Xps::{DOCINFOW, EndDoc, EndPage, StartDocW, StartPage};
        use windows::core::{PCWSTR, w};

        fn to_wide(s: &str) -> Vec<u16> {
            s.encode_utf16().chain(std::iter::once(0)).collect()
        }

        let rgb = image::open(image)?.to_rgb8();
        let (width, height) = rgb.dimensions();

        // 32-bit BGRX, top-down
        let mut bits: Vec<u8> = Vec::with_capacity((width * height * 4) as usize);
        for p in rgb.pixels() {
            bits.extend_from_slice(&[p[2], p[1], p[0], 0]);
        }

        unsafe {
            let name_w = to_wide(printer);
            let hdc = CreateDCW(
                w!("WINSPOOL"),
                PCWSTR::from_raw(name_w.as_ptr()),
                PCWSTR::null(),
                None,
            );
            if hdc.is_invalid() {
                return Err(PrintError::WindowsPrinter("CreateDCW failed".to_string()));
            }

            let page_w = GetDeviceCaps(Some(hdc), HORZRES);
            let page_h = GetDeviceCaps(Some(hdc), VERTRES);
            let scale = (page_w as f64 / width as f64).min(page_h as f64 / height as f64) * 0.95;
            let dest_w = (width as f64 * scale) as i32;
            let dest_h = (height as f64 * scale) as i32;
            let x = (page_w - dest_w) / 2;
            let y = (page_h - dest_h) / 2;

            let doc_name_w = to_wide("Shot Receipt");
            let doc_info = DOCINFOW {
                cbSize: std::mem::size_of::<DOCINFOW>() as i32,
                lpszDocName: PCWSTR::from_raw(doc_name_w.as_ptr()),
                lpszOutput: PCWSTR::null(),
                lpszDatatype: PCWSTR::null(),
                fwType: 0,
            };

            if StartDocW(hdc, &doc_info) <= 0 {
                let _ = DeleteDC(hdc);
                return Err(PrintError::WindowsPrinter("StartDoc failed".to_string()));
            }
            if StartPage(hdc) <= 0 {
                let _ = EndDoc(hdc);
                let _ = DeleteDC(hdc);
                return Err(PrintError::WindowsPrinter("StartPage failed".to_string()));
            }

            let info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width as i32,
                    biHeight: -(height as i32),
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };

            let copied = StretchDIBits(
                hdc,
                x,
                y,
                dest_w,
                dest_h,
                0,
                0,
                width as i32,
                height as i32,
                Some(bits.as_ptr() as *const _),
                &info,
                DIB_RGB_COLORS,
                SRCCOPY,
            );

            let _ = EndPage(hdc);
            let _ = EndDoc(hdc);
            let _ = DeleteDC(hdc);

            if copied <= 0 {
                return Err(PrintError::WindowsPrinter("StretchDIBits failed".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(windows)]
#[async_trait]
impl PrintStrategy for GdiStrategy {
    fn name(&self) -> &str {
        "gdi"
    }

    #[instrument(skip(self), fields(image = %image.display()))]
    async fn attempt(&self, image: &Path) -> PrintResult<()> {
        let printer = match &self.printer {
            Some(p) => p.clone(),
            None => Self::default_printer()?
                .ok_or_else(|| PrintError::WindowsPrinter("No default printer".to_string()))?,
        };
        let image = image.to_path_buf();

        info!(printer = %printer, "Printing through GDI");
        tokio::task::spawn_blocking(move || Self::print_blocking(&printer, &image))
            .await
            .map_err(|e| PrintError::Strategy {
                strategy: "gdi".to_string(),
                reason: e.to_string(),
            })?
    }
}

/// Ordered strategy chain for the current platform
pub fn platform_chain(printer: Option<&str>) -> Vec<Box<dyn PrintStrategy>> {
    #[cfg(windows)]
    {
        vec![
            Box::new(GdiStrategy::new(printer)) as Box<dyn PrintStrategy>,
            Box::new(CommandStrategy::shell_print(printer)),
            Box::new(CommandStrategy::mspaint(printer)),
        ]
    }

    #[cfg(not(windows))]
    {
        vec![
            Box::new(CommandStrategy::lpr(printer)) as Box<dyn PrintStrategy>,
            Box::new(CommandStrategy::lp(printer)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_lpr_arguments() {
        let s = CommandStrategy::lpr(Some("Receipt80"));
        let args = strings(s.command_args(Path::new("/img/shot_print.bmp")));
        assert_eq!(
            args,
            vec![
                "-P",
                "Receipt80",
                "/img/shot_print.bmp",
                "-o",
                "media=Custom.80x180mm",
                "-o",
                "fit-to-page",
                "-o",
                "margin-top=0",
                "-o",
                "margin-bottom=0",
            ]
        );
    }

    #[test]
    fn test_lp_arguments_default_printer() {
        let s = CommandStrategy::lp(None);
        let args = strings(s.command_args(Path::new("a.bmp")));
        assert_eq!(args[0], "a.bmp");
        assert!(!args.contains(&"-d".to_string()));
        assert!(!args.contains(&"margin-bottom=0".to_string()));
        assert_eq!(s.program(), "lp");
    }

    #[test]
    fn test_mspaint_arguments() {
        let s = CommandStrategy::mspaint(Some("POS-80"));
        let args = strings(s.command_args(Path::new("C:\\shots\\a.bmp")));
        assert_eq!(args, vec!["/pt", "C:\\shots\\a.bmp", "POS-80"]);
    }

    #[test]
    fn test_shell_print_quotes_path() {
        let s = CommandStrategy::shell_print(None);
        let args = strings(s.command_args(Path::new("C:\\it's\\a.bmp")));
        assert_eq!(args.last().unwrap(), "Start-Process -FilePath 'C:\\it''s\\a.bmp' -Verb Print -Wait");
    }

    #[test]
    fn test_platform_chain_order() {
        let names: Vec<String> = platform_chain(None)
            .iter()
            .map(|s| s.name().to_string())
            .collect();

        #[cfg(not(windows))]
        assert_eq!(names, vec!["lpr", "lp"]);
        #[cfg(windows)]
        assert_eq!(names, vec!["gdi", "shell-print", "mspaint"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_decides_success() {
        let ok = CommandStrategy::new("true", "true", |_| Vec::new());
        assert!(ok.attempt(Path::new("x")).await.is_ok());

        let failing = CommandStrategy::new("false", "false", |_| Vec::new());
        assert!(matches!(
            failing.attempt(Path::new("x")).await,
            Err(PrintError::Command { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let s = CommandStrategy::new("ghost", "definitely-not-a-print-command", |_| Vec::new());
        assert!(matches!(
            s.attempt(Path::new("x")).await,
            Err(PrintError::Io(_))
        ));
    }
}
