//! Driver construction errors

use treadmill_hal::CellError;

/// Errors raised while acquiring hardware resources
///
/// All of these are configuration errors: the firmware reports them and
/// never enters its run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// PIO instruction memory has no room for the program
    ProgramSpace,
    /// Pins that must be consecutive are not
    PinsNotContiguous { first: u8, second: u8 },
    /// Destination sample buffer could not be claimed
    Cell(CellError),
    /// A DMA stream is already armed on this driver
    StreamActive,
    /// GPIO has no on-chip ADC input
    NotAnAdcPin(u8),
    /// On-chip ADC channel already in use
    AdcChannelInUse(u8),
    /// On-chip ADC conversion failed
    Conversion,
}

impl From<CellError> for DriverError {
    fn from(err: CellError) -> Self {
        DriverError::Cell(err)
    }
}
