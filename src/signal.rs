// Console control signals (Ctrl-C, Ctrl-Break, console close, logoff, shutdown).
//
// The handler runs on a thread the system creates for the purpose, so all it
// may do is print and flip the run flag.

use std::io::{self, Write};

use crate::event_loop::RunFlag;

#[cfg(windows)]
use winapi::shared::minwindef::{BOOL, DWORD, FALSE, TRUE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Interrupt,
    Break,
    Close,
    Logoff,
    Shutdown,
    Unknown(u32),
}

impl ControlSignal {
    /// Map a `CTRL_*_EVENT` code from wincon.h.
    pub fn from_raw(code: u32) -> Self {
        match code {
            0 => ControlSignal::Interrupt,
            1 => ControlSignal::Break,
            2 => ControlSignal::Close,
            5 => ControlSignal::Logoff,
            6 => ControlSignal::Shutdown,
            other => ControlSignal::Unknown(other),
        }
    }
}

/// React to a control signal.  Returns true if the signal was handled, false to
/// let the next handler (ultimately the default, which exits) have it.
///
/// Ctrl-C is only reported; Ctrl-Break is what stops the loop.
pub fn handle<W: Write + ?Sized>(signal: ControlSignal, flag: &RunFlag, out: &mut W) -> bool {
    match signal {
        ControlSignal::Interrupt => {
            status!(out, "Caught CTRL_C_EVENT, ignoring");
            true
        }
        ControlSignal::Break => {
            status!(out, "Caught CTRL_BREAK_EVENT, quitting");
            flag.stop();
            true
        }
        other => {
            log::debug!("Passing on control signal {:?}", other);
            false
        }
    }
}

#[cfg(windows)]
pub fn install() -> io::Result<()> {
    use winapi::um::consoleapi::SetConsoleCtrlHandler;

    if unsafe { SetConsoleCtrlHandler(Some(ctrl_handler), TRUE) } == 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

#[cfg(not(windows))]
pub fn install() -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Other,
        "console control handlers require Windows",
    ))
}

#[cfg(windows)]
unsafe extern "system" fn ctrl_handler(ctrl_type: DWORD) -> BOOL {
    use crate::event_loop::RUNNING;

    if handle(ControlSignal::from_raw(ctrl_type), &RUNNING, &mut io::stdout()) {
        TRUE
    } else {
        FALSE
    }
}
