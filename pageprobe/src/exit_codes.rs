#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// URLs were queued but no device is connected.
    NoDevice = 10,

    /// Invalid CLI input (bad flags, unreadable URL file).
    InvalidInput = 30,

    /// Internal/runtime error (output directory creation, corrupt result
    /// sets, cancelled analysis, IO errors).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
