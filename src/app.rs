// Startup sequencing: console, window, control handler, then the loop.

use std::io::{self, Write};

use crate::config::{Config, WindowConfig};
use crate::console::{self, ConsoleHost};
use crate::error::StartupError;
use crate::event_loop::{self, LoopStats, MessagePump, RunFlag};

/// Everything the program needs from the operating system.
pub trait Platform {
    type Console: ConsoleHost;
    type Window: MessagePump;

    fn console(&mut self) -> &mut Self::Console;

    /// Create and show the main window.
    fn create_window(&mut self, config: &WindowConfig) -> io::Result<Self::Window>;

    fn install_ctrl_handler(&mut self) -> io::Result<()>;

    /// Tell the user something went wrong when there may be no console.
    fn alert(&mut self, title: &str, text: &str);
}

/// Run the program to completion, writing status lines to `out`.
pub fn run<P, W>(
    platform: &mut P,
    config: &Config,
    flag: &RunFlag,
    out: &mut W,
) -> Result<LoopStats, StartupError>
where
    P: Platform,
    W: Write,
{
    let routing = console::route_stdio_to_console(platform.console(), config.create_console);
    log::info!("Console routing: {:?}", routing);

    if let Err(e) = platform.console().output_handle() {
        platform.alert("Console Error", "GetStdHandle");
        return Err(StartupError::StdHandle(e));
    }

    status!(out, "Redirected STDIO");

    let mut window = platform
        .create_window(&config.window)
        .map_err(StartupError::Window)?;
    status!(out, "Displayed Win32 GUI");

    if let Err(e) = platform.install_ctrl_handler() {
        status!(out, "ERROR: Could not set control handler");
        return Err(StartupError::CtrlHandler(e));
    }
    status!(out, "Assigned SetConsoleCtrlHandler callback");

    let stats = event_loop::run(flag, &mut window, config.poll);

    status!(out, "Exiting...");
    platform.console().free();

    Ok(stats)
}

#[cfg(windows)]
pub use self::win32::Win32Platform;

#[cfg(windows)]
mod win32 {
    use std::io;

    use super::Platform;
    use crate::config::WindowConfig;
    use crate::console::Win32Console;
    use crate::signal;
    use crate::window::{self, Window};

    #[derive(Debug, Default)]
    pub struct Win32Platform {
        console: Win32Console,
    }

    impl Win32Platform {
        pub fn new() -> Self {
            Self {
                console: Win32Console::new(),
            }
        }
    }

    impl Platform for Win32Platform {
        type Console = Win32Console;
        type Window = Window;

        fn console(&mut self) -> &mut Win32Console {
            &mut self.console
        }

        fn create_window(&mut self, config: &WindowConfig) -> io::Result<Window> {
            Window::create(config)
        }

        fn install_ctrl_handler(&mut self) -> io::Result<()> {
            signal::install()
        }

        fn alert(&mut self, title: &str, text: &str) {
            window::message_box(title, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    use crate::console::tests::{FakeAttach, FakeConsole};
    use crate::dispatch::{self, WindowMessage, WM_CLOSE, WM_DESTROY, WM_QUIT, WM_SIZE};
    use crate::event_loop::PollMode;

    /// One transcript shared by the app and the fake window procedure.
    #[derive(Clone, Default)]
    struct Transcript(Rc<RefCell<Vec<u8>>>);

    impl Transcript {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    impl Write for Transcript {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FakeWindow<'a> {
        flag: &'a RunFlag,
        queue: VecDeque<(u32, usize, isize)>,
        out: Transcript,
    }

    impl MessagePump for FakeWindow<'_> {
        type Message = (u32, usize, isize);

        fn peek(&mut self) -> Option<Self::Message> {
            self.queue.pop_front()
        }

        fn is_quit(&self, message: &Self::Message) -> bool {
            message.0 == WM_QUIT
        }

        fn dispatch(&mut self, (msg, wparam, lparam): Self::Message) {
            dispatch::handle(WindowMessage::decode(msg, wparam, lparam), self.flag, &mut self.out);
        }

        fn wait(&mut self, _timeout: Duration) {}
    }

    struct FakePlatform<'a> {
        console: FakeConsole,
        flag: &'a RunFlag,
        messages: Vec<(u32, usize, isize)>,
        out: Transcript,
        window_error: Option<i32>,
        handler_ok: bool,
        alerts: Vec<String>,
    }

    impl<'a> FakePlatform<'a> {
        fn new(flag: &'a RunFlag, messages: &[(u32, usize, isize)]) -> Self {
            Self {
                console: FakeConsole {
                    attach: Some(FakeAttach::InvalidHandle),
                    ..FakeConsole::default()
                },
                flag,
                messages: messages.to_vec(),
                out: Transcript::default(),
                window_error: None,
                handler_ok: true,
                alerts: vec![],
            }
        }
    }

    impl<'a> Platform for FakePlatform<'a> {
        type Console = FakeConsole;
        type Window = FakeWindow<'a>;

        fn console(&mut self) -> &mut FakeConsole {
            &mut self.console
        }

        fn create_window(&mut self, _config: &WindowConfig) -> io::Result<FakeWindow<'a>> {
            if let Some(code) = self.window_error {
                return Err(io::Error::from_raw_os_error(code));
            }

            Ok(FakeWindow {
                flag: self.flag,
                queue: self.messages.drain(..).collect(),
                out: self.out.clone(),
            })
        }

        fn install_ctrl_handler(&mut self) -> io::Result<()> {
            if self.handler_ok {
                Ok(())
            } else {
                Err(io::Error::from_raw_os_error(87))
            }
        }

        fn alert(&mut self, title: &str, text: &str) {
            self.alerts.push(format!("{}: {}", title, text));
        }
    }

    fn busy() -> Config {
        Config {
            poll: PollMode::Busy,
            ..Config::default()
        }
    }

    #[test]
    fn close_shuts_down_cleanly() {
        let flag = RunFlag::new();
        let mut platform = FakePlatform::new(&flag, &[(WM_SIZE, 0, 480 << 16 | 640), (WM_CLOSE, 0, 0), (WM_DESTROY, 0, 0)]);
        let mut out = platform.out.clone();

        let stats = run(&mut platform, &busy(), &flag, &mut out).unwrap();

        assert_eq!(
            platform.out.text(),
            "Redirected STDIO\r\n\
             Displayed Win32 GUI\r\n\
             Assigned SetConsoleCtrlHandler callback\r\n\
             WM_SIZE 640 480\r\n\
             WM_CLOSE\r\n\
             Exiting...\r\n"
        );
        assert_eq!(
            platform.console.calls,
            vec!["attach", "alloc", "reopen stdout", "reopen stderr", "sync", "free"]
        );
        assert_eq!(stats.dispatched, 2);
        assert!(!stats.quit);
        assert!(!flag.is_running());
        assert!(platform.alerts.is_empty());
    }

    #[test]
    fn quit_message_ends_loop() {
        let flag = RunFlag::new();
        let mut platform = FakePlatform::new(&flag, &[(WM_QUIT, 0, 0), (WM_CLOSE, 0, 0)]);
        let mut out = platform.out.clone();

        let stats = run(&mut platform, &busy(), &flag, &mut out).unwrap();

        assert!(stats.quit);
        assert!(!platform.out.text().contains("WM_CLOSE"));
        assert!(platform.out.text().ends_with("Exiting...\r\n"));
    }

    #[test]
    fn no_console_is_fatal() {
        let flag = RunFlag::new();
        let mut platform = FakePlatform::new(&flag, &[]);
        let mut out = platform.out.clone();
        let config = Config {
            create_console: false,
            ..busy()
        };

        let err = run(&mut platform, &config, &flag, &mut out).unwrap_err();

        assert!(matches!(err, StartupError::StdHandle(_)));
        assert_eq!(err.exit_code(), 6);
        assert_eq!(platform.alerts, vec!["Console Error: GetStdHandle"]);
        assert!(platform.out.text().is_empty());
        assert_eq!(platform.console.calls, vec!["attach"]);
    }

    #[test]
    fn unusable_parent_console_exits_with_attach_error() {
        for &(attach, code) in &[(FakeAttach::ParentGone, 31), (FakeAttach::AccessDenied, 5)] {
            let flag = RunFlag::new();
            let mut platform = FakePlatform::new(&flag, &[(WM_CLOSE, 0, 0)]);
            platform.console.attach = Some(attach);
            let mut out = platform.out.clone();

            let err = run(&mut platform, &busy(), &flag, &mut out).unwrap_err();

            assert!(matches!(err, StartupError::StdHandle(_)));
            assert_eq!(err.exit_code(), code);
            assert_eq!(platform.console.calls, vec!["attach"]);
            assert!(platform.out.text().is_empty());
        }
    }

    #[test]
    fn failed_alloc_exits_with_alloc_error() {
        let flag = RunFlag::new();
        let mut platform = FakePlatform::new(&flag, &[]);
        platform.console.alloc_error = Some(8);
        let mut out = platform.out.clone();

        let err = run(&mut platform, &busy(), &flag, &mut out).unwrap_err();

        assert_eq!(err.exit_code(), 8);
        assert_eq!(platform.console.calls, vec!["attach", "alloc"]);
    }

    #[test]
    fn handler_failure_exits_with_one() {
        let flag = RunFlag::new();
        let mut platform = FakePlatform::new(&flag, &[(WM_CLOSE, 0, 0)]);
        platform.handler_ok = false;
        let mut out = platform.out.clone();

        let err = run(&mut platform, &busy(), &flag, &mut out).unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert!(platform
            .out
            .text()
            .ends_with("Displayed Win32 GUI\r\nERROR: Could not set control handler\r\n"));
        assert!(flag.is_running());
        assert!(!platform.console.calls.contains(&"free"));
    }

    #[test]
    fn window_failure_reports_os_error() {
        let flag = RunFlag::new();
        let mut platform = FakePlatform::new(&flag, &[]);
        platform.window_error = Some(1407);
        let mut out = platform.out.clone();

        let err = run(&mut platform, &busy(), &flag, &mut out).unwrap_err();

        assert!(matches!(err, StartupError::Window(_)));
        assert_eq!(err.exit_code(), 1407);
        assert_eq!(platform.out.text(), "Redirected STDIO\r\n");
    }

    #[test]
    fn inherited_streams_skip_console_setup() {
        let flag = RunFlag::new();
        let mut platform = FakePlatform::new(&flag, &[(WM_CLOSE, 0, 0)]);
        platform.console.output_valid = true;
        let mut out = platform.out.clone();

        run(&mut platform, &busy(), &flag, &mut out).unwrap();

        assert_eq!(platform.console.calls, vec!["free"]);
    }
}
