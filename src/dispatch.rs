// Window message handling, independent of the window system itself.

use std::fmt;
use std::io::Write;

use crate::event_loop::RunFlag;

// Message identifiers, as in winuser.h.
pub const WM_DESTROY: u32 = 0x0002;
pub const WM_SIZE: u32 = 0x0005;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_QUERYENDSESSION: u32 = 0x0011;
pub const WM_QUIT: u32 = 0x0012;
pub const WM_ENDSESSION: u32 = 0x0016;

/// Why the session is ending, from the lParam of WM_QUERYENDSESSION and
/// WM_ENDSESSION.  No bits set means the system is shutting down or restarting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndSessionReason(u32);

impl EndSessionReason {
    pub const CLOSEAPP: u32 = 0x0000_0001;
    pub const CRITICAL: u32 = 0x4000_0000;
    pub const LOGOFF: u32 = 0x8000_0000;

    pub fn from_lparam(lparam: isize) -> Self {
        Self(lparam as u32)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_close_app(self) -> bool {
        self.0 & Self::CLOSEAPP != 0
    }

    pub fn is_critical(self) -> bool {
        self.0 & Self::CRITICAL != 0
    }

    pub fn is_logoff(self) -> bool {
        self.0 & Self::LOGOFF != 0
    }
}

impl fmt::Display for EndSessionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = vec![];
        if self.is_close_app() {
            names.push("closeapp");
        }
        if self.is_critical() {
            names.push("critical");
        }
        if self.is_logoff() {
            names.push("logoff");
        }

        if names.is_empty() {
            f.write_str("shutdown")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMessage {
    Resize { width: u16, height: u16 },
    Close,
    Destroy,
    QueryEndSession { reason: EndSessionReason },
    EndSession { ending: bool, reason: EndSessionReason },
    Other { id: u32 },
}

/// Low-order word of a packed parameter.
pub fn loword(lparam: isize) -> u16 {
    ((lparam as usize) & 0xffff) as u16
}

/// High-order word of the low 32 bits of a packed parameter.
pub fn hiword(lparam: isize) -> u16 {
    (((lparam as usize) >> 16) & 0xffff) as u16
}

impl WindowMessage {
    pub fn decode(msg: u32, wparam: usize, lparam: isize) -> Self {
        match msg {
            WM_SIZE => WindowMessage::Resize {
                width: loword(lparam),
                height: hiword(lparam),
            },
            WM_CLOSE => WindowMessage::Close,
            WM_DESTROY => WindowMessage::Destroy,
            WM_QUERYENDSESSION => WindowMessage::QueryEndSession {
                reason: EndSessionReason::from_lparam(lparam),
            },
            WM_ENDSESSION => WindowMessage::EndSession {
                ending: wparam != 0,
                reason: EndSessionReason::from_lparam(lparam),
            },
            id => WindowMessage::Other { id },
        }
    }
}

/// What the window procedure should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Handled(isize),
    /// Hand the message on to the default window procedure.
    Default,
}

/// Handle one message for the main window.
pub fn handle<W: Write + ?Sized>(message: WindowMessage, flag: &RunFlag, out: &mut W) -> Reply {
    match message {
        WindowMessage::Resize { width, height } => {
            status!(out, "WM_SIZE {} {}", width, height);
            Reply::Handled(0)
        }
        WindowMessage::Close => {
            status!(out, "WM_CLOSE");
            flag.stop();
            Reply::Default
        }
        WindowMessage::Destroy => {
            status!(out, "WM_DESTROY");
            flag.stop();
            Reply::Default
        }
        WindowMessage::QueryEndSession { reason } => {
            status!(out, "WM_QUERYENDSESSION");
            log::debug!("Session ending ({}), allowing", reason);
            flag.stop();
            Reply::Handled(1)
        }
        WindowMessage::EndSession { ending, reason } => {
            status!(out, "WM_ENDSESSION");
            log::debug!("Session end confirmed: ending={} ({})", ending, reason);
            flag.stop();
            Reply::Handled(0)
        }
        WindowMessage::Other { .. } => Reply::Default,
    }
}
