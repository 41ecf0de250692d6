/// Logs `$err` at `$level`, or returns it when `$level` is at or above the
/// state's fail level.
#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err.into());
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum ContainerError {
    #[error("Failed to grow page buffer to {0} bytes")]
    Allocation(usize),

    #[error("Payload of {0} bytes does not fit a single page (max {max})", max = crate::container::MAX_PAYLOAD_LEN)]
    PayloadTooLarge(usize),

    #[error("Write to output failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("Output accepted zero bytes")]
    WriteZero,
}

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("No codec identification header found for track {0}")]
    MissingIdentification(u32),

    #[error("Voice-activity preamble on track {serial} claims {skip} bytes, packet has {len}")]
    PreambleTooLong { serial: u32, skip: usize, len: usize },

    #[error("Input ended before any data page (header region only)")]
    NoDataPages,
}

#[derive(thiserror::Error, Debug)]
pub enum EmitError {
    #[error("Second copy has more pages for track {serial} than the first ({records} records)")]
    RecordsExhausted { serial: u32, records: usize },

    #[error("Data page on track {serial} is {len} bytes, too short for its {skip}-byte prefix")]
    PacketTooShort { serial: u32, len: usize, skip: usize },

    #[error("Second copy of the input is missing; emitted headers only")]
    MissingSecondCopy,
}
