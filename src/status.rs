// Status lines written to the console.
//
// These are the program's actual output rather than diagnostics: one ASCII line
// per lifecycle milestone, CRLF terminated and flushed immediately so lines from
// the control handler thread and the window procedure never sit in a buffer.

use std::fmt;
use std::io::Write;

/// Capacity of the status writer's buffer.  More means potential waste, less
/// means more risk of interleaved lines under heavy output.
pub const OUTPUT_BUFFER_SIZE: usize = 64 * 1024;

/// Write a single status line.  Failures are ignored; there may simply be no
/// console to write to.
pub fn line<W: Write + ?Sized>(out: &mut W, args: fmt::Arguments<'_>) {
    log::debug!("status: {}", args);

    let _ = out
        .write_fmt(args)
        .and_then(|_| out.write_all(b"\r\n"))
        .and_then(|_| out.flush());
}

macro_rules! status {
    ($out:expr, $($arg:tt)*) => {
        $crate::status::line($out, format_args!($($arg)*))
    };
}

#[test]
fn test_status_line() {
    let mut out = Vec::new();
    status!(&mut out, "WM_SIZE {} {}", 640, 480);
    status!(&mut out, "Exiting...");

    assert_eq!(out, b"WM_SIZE 640 480\r\nExiting...\r\n");
}
