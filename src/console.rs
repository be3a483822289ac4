// Helper functions for handling the Windows console from a GUI context.
//
// Windows subsystem applications must explicitly attach to an existing console
// before stdio works, and if not available, create their own if they wish to
// print anything.  Even once attached, the standard handles still point nowhere
// until they're reopened against the console device.

use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Output,
    Error,
}

#[derive(Debug)]
pub enum AttachError {
    /// We already have a console.
    AccessDenied,
    /// The parent has no usable console; most likely it's gone (eg: crashed).
    ParentGone,
    Other(io::Error),
}

/// The console operations stdio routing needs.
pub trait ConsoleHost {
    /// Does `stream` resolve to a live OS handle?  A handle slot alone isn't
    /// enough, since an ID that was never inherited may have been reused.
    fn stream_valid(&self, stream: StdStream) -> bool;

    fn attach_parent(&mut self) -> Result<(), AttachError>;

    fn alloc(&mut self) -> io::Result<()>;

    /// Point `stream`, at every level, at the console device.
    fn reopen(&mut self, stream: StdStream) -> io::Result<()>;

    /// Bring buffered writers back in line with the underlying handles.
    fn sync(&mut self);

    /// The handle status lines will be written to, if any.
    fn output_handle(&self) -> io::Result<()>;

    fn free(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// stdout or stderr was already usable, so nothing was touched.
    Inherited,
    AlreadyAttached,
    ParentGone,
    /// No console to attach to, and we weren't asked to make one.
    NoConsole,
    /// No console to attach to, and making one failed.
    AllocFailed,
    Redirected { allocated: bool },
}

/// Make sure stdout and stderr go somewhere, attaching to the parent process's
/// console or, if permitted, allocating a fresh one.
///
/// If either stream is already valid (a pipe under a CI runner, say, or a
/// mintty terminal) it's left alone: opening CONOUT$ there would send output
/// nowhere.
pub fn route_stdio_to_console<H: ConsoleHost + ?Sized>(
    host: &mut H,
    create_console_if_not_found: bool,
) -> Routing {
    if host.stream_valid(StdStream::Output) || host.stream_valid(StdStream::Error) {
        log::debug!("Standard streams already valid, leaving them alone");
        return Routing::Inherited;
    }

    let allocated = match host.attach_parent() {
        Ok(()) => {
            log::debug!("Attached to parent console");
            false
        }
        Err(AttachError::AccessDenied) => {
            log::debug!("Already attached to a console");
            return Routing::AlreadyAttached;
        }
        Err(AttachError::ParentGone) => {
            log::debug!("Parent console unavailable");
            return Routing::ParentGone;
        }
        Err(AttachError::Other(e)) if create_console_if_not_found => {
            // Normally ERROR_INVALID_HANDLE: we weren't started from a console.
            log::debug!("Attach failed ({}), allocating a console", e);
            if let Err(e) = host.alloc() {
                log::warn!("AllocConsole: {}", e);
                return Routing::AllocFailed;
            }
            true
        }
        Err(AttachError::Other(e)) => {
            log::debug!("Attach failed ({}), continuing without a console", e);
            return Routing::NoConsole;
        }
    };

    for &stream in &[StdStream::Output, StdStream::Error] {
        if let Err(e) = host.reopen(stream) {
            log::warn!("Reopening {:?} on the console: {}", stream, e);
        }
    }

    host.sync();

    Routing::Redirected { allocated }
}

// ERROR_INVALID_HANDLE, as in winerror.h.
const ERROR_INVALID_HANDLE: i32 = 6;

/// The error for a standard handle that was never set.  Fetching it doesn't
/// touch the last error, so that still holds whatever attaching or allocating
/// failed with; with nothing recorded it's ERROR_INVALID_HANDLE.
pub fn missing_handle_error(last_error: u32) -> io::Error {
    match last_error {
        0 => io::Error::from_raw_os_error(ERROR_INVALID_HANDLE),
        code => io::Error::from_raw_os_error(code as i32),
    }
}

#[cfg(windows)]
pub use self::win32::Win32Console;

#[cfg(windows)]
mod win32 {
    use std::io::{self, Write};
    use std::os::raw::c_int;
    use std::ptr;

    use winapi::shared::minwindef::DWORD;
    use winapi::shared::winerror::{ERROR_ACCESS_DENIED, ERROR_GEN_FAILURE, NO_ERROR};
    use winapi::um::consoleapi::AllocConsole;
    use winapi::um::errhandlingapi::{GetLastError, SetLastError};
    use winapi::um::fileapi::{CreateFileW, GetFileType, OPEN_EXISTING};
    use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
    use winapi::um::processenv::{GetStdHandle, SetStdHandle};
    use winapi::um::winbase::{FILE_TYPE_UNKNOWN, STD_ERROR_HANDLE, STD_OUTPUT_HANDLE};
    use winapi::um::wincon::{AttachConsole, FreeConsole, ATTACH_PARENT_PROCESS};
    use winapi::um::winnt::{FILE_SHARE_READ, FILE_SHARE_WRITE, GENERIC_READ, GENERIC_WRITE, HANDLE};

    use super::{AttachError, ConsoleHost, StdStream};
    use crate::window::wide;

    // The C runtime keeps its own descriptor table on top of the std handles.
    extern "C" {
        fn _open_osfhandle(osfhandle: isize, flags: c_int) -> c_int;
        fn _dup2(fd1: c_int, fd2: c_int) -> c_int;
        fn _close(fd: c_int) -> c_int;
    }

    fn std_handle_id(stream: StdStream) -> DWORD {
        match stream {
            StdStream::Output => STD_OUTPUT_HANDLE,
            StdStream::Error => STD_ERROR_HANDLE,
        }
    }

    fn crt_fd(stream: StdStream) -> c_int {
        match stream {
            StdStream::Output => 1,
            StdStream::Error => 2,
        }
    }

    fn check_handle(handle: HANDLE) -> io::Result<HANDLE> {
        if handle == INVALID_HANDLE_VALUE {
            return Err(io::Error::last_os_error());
        }
        if handle.is_null() {
            return Err(super::missing_handle_error(unsafe { GetLastError() }));
        }

        // GetFileType is the cheapest call that fails on a stale handle.
        unsafe {
            SetLastError(NO_ERROR);
            if GetFileType(handle) == FILE_TYPE_UNKNOWN && GetLastError() != NO_ERROR {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(handle)
    }

    fn open_conout() -> io::Result<HANDLE> {
        let name = wide("CONOUT$");
        let handle = unsafe {
            CreateFileW(
                name.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                ptr::null_mut(),
                OPEN_EXISTING,
                0,
                ptr::null_mut(),
            )
        };

        if handle == INVALID_HANDLE_VALUE {
            Err(io::Error::last_os_error())
        } else {
            Ok(handle)
        }
    }

    #[derive(Debug, Default)]
    pub struct Win32Console;

    impl Win32Console {
        pub fn new() -> Self {
            Self
        }

        // Overwrite the CRT's descriptor for the benefit of anything writing to
        // it directly.  The CRT allocates 0, 1 and 2 at startup even without
        // valid handles, so this never clobbers a descriptor opened later.
        fn rebind_crt(&self, stream: StdStream) -> io::Result<()> {
            let handle = open_conout()?;
            unsafe {
                let fd = _open_osfhandle(handle as isize, 0);
                if fd < 0 {
                    CloseHandle(handle);
                    return Err(io::Error::new(io::ErrorKind::Other, "_open_osfhandle failed"));
                }

                let ret = _dup2(fd, crt_fd(stream));
                _close(fd);
                if ret != 0 {
                    return Err(io::Error::new(io::ErrorKind::Other, "_dup2 failed"));
                }
            }

            Ok(())
        }
    }

    impl ConsoleHost for Win32Console {
        fn stream_valid(&self, stream: StdStream) -> bool {
            check_handle(unsafe { GetStdHandle(std_handle_id(stream)) }).is_ok()
        }

        fn attach_parent(&mut self) -> Result<(), AttachError> {
            if unsafe { AttachConsole(ATTACH_PARENT_PROCESS) } != 0 {
                return Ok(());
            }

            match unsafe { GetLastError() } {
                ERROR_ACCESS_DENIED => Err(AttachError::AccessDenied),
                ERROR_GEN_FAILURE => Err(AttachError::ParentGone),
                code => Err(AttachError::Other(io::Error::from_raw_os_error(code as i32))),
            }
        }

        fn alloc(&mut self) -> io::Result<()> {
            if unsafe { AllocConsole() } == 0 {
                return Err(io::Error::last_os_error());
            }

            Ok(())
        }

        fn reopen(&mut self, stream: StdStream) -> io::Result<()> {
            match stream {
                StdStream::Output => io::stdout().flush()?,
                StdStream::Error => io::stderr().flush()?,
            }

            let handle = open_conout()?;
            if unsafe { SetStdHandle(std_handle_id(stream), handle) } == 0 {
                let err = io::Error::last_os_error();
                unsafe { CloseHandle(handle) };
                return Err(err);
            }

            if let Err(e) = self.rebind_crt(stream) {
                log::debug!("CRT descriptor {} left alone: {}", crt_fd(stream), e);
            }

            Ok(())
        }

        fn sync(&mut self) {
            let _ = io::stdout().flush();
            let _ = io::stderr().flush();
        }

        fn output_handle(&self) -> io::Result<()> {
            check_handle(unsafe { GetStdHandle(STD_OUTPUT_HANDLE) }).map(|_| ())
        }

        fn free(&mut self) {
            unsafe { FreeConsole() };
        }
    }
}
