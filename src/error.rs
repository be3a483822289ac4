use std::io;

use thiserror::Error;

/// Failures that stop the program before the message loop starts.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no usable stdout handle: {0}")]
    StdHandle(#[source] io::Error),

    #[error("could not create the main window: {0}")]
    Window(#[source] io::Error),

    #[error("could not set control handler: {0}")]
    CtrlHandler(#[source] io::Error),
}

impl StartupError {
    /// Process exit code: the OS error where there is one, except for the
    /// control handler, which always exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::StdHandle(e) | StartupError::Window(e) => {
                e.raw_os_error().filter(|&code| code != 0).unwrap_or(1)
            }
            StartupError::CtrlHandler(_) => 1,
        }
    }
}

#[test]
fn test_exit_codes() {
    let e = StartupError::StdHandle(io::Error::from_raw_os_error(6));
    assert_eq!(e.exit_code(), 6);

    let e = StartupError::StdHandle(io::Error::new(io::ErrorKind::NotFound, "none"));
    assert_eq!(e.exit_code(), 1);

    let e = StartupError::Window(io::Error::from_raw_os_error(1410));
    assert_eq!(e.exit_code(), 1410);

    let e = StartupError::CtrlHandler(io::Error::from_raw_os_error(5));
    assert_eq!(e.exit_code(), 1);
    assert!(e.to_string().starts_with("could not set control handler"));
}
