/// Failures raised by the shared helpers.
///
/// Not a `#[contracterror]`: contracts map these onto their own error enum
/// so that every failure a caller sees has a single, stable discriminant.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CoreError {
    NotInitialized,
    Unauthorized,
    Paused,
    LastAdmin,
    InvalidFeeRate,
    InvalidBatchSize,
    ArithmeticOverflow,
    InvalidToken,
    InvalidVersion,
    Reentrancy,
}
