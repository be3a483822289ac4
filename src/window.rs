// The top-level window and its message queue.

use std::ffi::OsStr;
use std::io;
use std::iter::once;
use std::mem;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use std::time::Duration;

use winapi::shared::minwindef::{FALSE, LPARAM, LRESULT, UINT, WPARAM};
use winapi::shared::windef::HWND;
use winapi::um::libloaderapi::GetModuleHandleW;
use winapi::um::winuser::{
    CreateWindowExW, DefWindowProcW, DispatchMessageW, LoadCursorW, MessageBoxW,
    MsgWaitForMultipleObjects, PeekMessageW, RegisterClassW, ShowWindow, TranslateMessage,
    CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, IDC_ARROW, MB_ICONERROR, MB_OK, MSG, PM_REMOVE,
    QS_ALLINPUT, SW_SHOWDEFAULT, WM_QUIT, WNDCLASSW, WS_OVERLAPPEDWINDOW, WS_VISIBLE,
};

use crate::config::WindowConfig;
use crate::dispatch::{self, Reply, WindowMessage};
use crate::event_loop::{MessagePump, RUNNING};

/// Encode a string as a nul-terminated UTF-16 buffer.
pub fn wide<S: AsRef<OsStr>>(s: S) -> Vec<u16> {
    s.as_ref().encode_wide().chain(once(0)).collect()
}

/// Best-effort message box, for when there may be no console to complain to.
pub fn message_box(title: &str, text: &str) {
    let title = wide(title);
    let text = wide(text);
    unsafe {
        MessageBoxW(ptr::null_mut(), text.as_ptr(), title.as_ptr(), MB_OK | MB_ICONERROR);
    }
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: UINT,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let message = WindowMessage::decode(msg, wparam, lparam);

    match dispatch::handle(message, &RUNNING, &mut io::stdout()) {
        Reply::Handled(result) => result,
        Reply::Default => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

/// The main window.  Its messages are pumped on the creating thread, and it
/// goes with the process rather than being destroyed explicitly.
#[derive(Debug)]
pub struct Window {
    #[allow(dead_code)]
    hwnd: HWND,
}

impl Window {
    pub fn create(config: &WindowConfig) -> io::Result<Self> {
        let class_name = wide(&config.class_name);
        let title = wide(&config.title);

        unsafe {
            let instance = GetModuleHandleW(ptr::null());

            let class = WNDCLASSW {
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(window_proc),
                hInstance: instance,
                hCursor: LoadCursorW(ptr::null_mut(), IDC_ARROW),
                lpszClassName: class_name.as_ptr(),
                ..mem::zeroed()
            };

            if RegisterClassW(&class) == 0 {
                return Err(io::Error::last_os_error());
            }

            let hwnd = CreateWindowExW(
                0,
                class_name.as_ptr(),
                title.as_ptr(),
                WS_OVERLAPPEDWINDOW | WS_VISIBLE,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                config.width.unwrap_or(CW_USEDEFAULT),
                config.height.unwrap_or(CW_USEDEFAULT),
                ptr::null_mut(),
                ptr::null_mut(),
                instance,
                ptr::null_mut(),
            );

            if hwnd.is_null() {
                return Err(io::Error::last_os_error());
            }

            ShowWindow(hwnd, SW_SHOWDEFAULT);
            log::debug!("Created window {:?} ({:?})", hwnd, config.title);

            Ok(Self { hwnd })
        }
    }
}

impl MessagePump for Window {
    type Message = MSG;

    fn peek(&mut self) -> Option<MSG> {
        let mut msg: MSG = unsafe { mem::zeroed() };

        // Thread-wide, not just self.hwnd, so thread messages like WM_QUIT arrive.
        if unsafe { PeekMessageW(&mut msg, ptr::null_mut(), 0, 0, PM_REMOVE) } != 0 {
            Some(msg)
        } else {
            None
        }
    }

    fn is_quit(&self, message: &MSG) -> bool {
        message.message == WM_QUIT
    }

    fn dispatch(&mut self, message: MSG) {
        unsafe {
            TranslateMessage(&message);
            DispatchMessageW(&message);
        }
    }

    fn wait(&mut self, timeout: Duration) {
        let millis = timeout.as_millis().min(u128::from(u32::MAX - 1)) as u32;
        unsafe {
            MsgWaitForMultipleObjects(0, ptr::null(), FALSE, millis, QS_ALLINPUT);
        }
    }
}
