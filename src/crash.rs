// Make panics visible.  A GUI subsystem process has nowhere to print them
// unless a console has been attached, so also pop up a box on Windows.

use std::panic;

use backtrace::Backtrace;

pub fn install() {
    panic::set_hook(Box::new(|info| {
        let bt = Backtrace::new();
        eprintln!("{}\r\n{:?}", info, bt);
        log::error!("{}", info);

        #[cfg(windows)]
        crate::window::message_box("CtrlWin panicked", &info.to_string());
    }));
}
