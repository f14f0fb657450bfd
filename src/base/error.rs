use std::fmt;

/// Defines the error type used throughout the crate
///
/// The three variants split failures by the reaction they call for:
///
/// * `Config` -- invalid or missing input detected while allocating models
///   or elements; the run cannot start;
/// * `Convergence` -- a local iterative solve failed (iteration cap, NaN, or
///   an iterate left the admissible range); the outer solver may retry with
///   a smaller increment;
/// * `Consistency` -- a physical invariant was violated after an otherwise
///   successful operation; indicates a model or programming error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// Holds an error message regarding invalid or missing input data
    Config(&'static str),

    /// Holds an error message regarding a failed local iterative solution
    Convergence(&'static str),

    /// Holds an error message regarding a violated physical invariant
    Consistency(&'static str),
}

impl Error {
    /// Returns the message carried by this error
    pub fn msg(&self) -> &'static str {
        match self {
            Error::Config(m) => m,
            Error::Convergence(m) => m,
            Error::Consistency(m) => m,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(m) => write!(f, "config error: {}", m),
            Error::Convergence(m) => write!(f, "convergence error: {}", m),
            Error::Consistency(m) => write!(f, "consistency error: {}", m),
        }
    }
}

impl std::error::Error for Error {}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn display_and_msg_work() {
        let e = Error::Config("parameter nf0 is missing");
        assert_eq!(e.msg(), "parameter nf0 is missing");
        assert_eq!(format!("{}", e), "config error: parameter nf0 is missing");
        let e = Error::Convergence("max number of iterations reached");
        assert_eq!(format!("{}", e), "convergence error: max number of iterations reached");
        let e = Error::Consistency("sl is out of bounds");
        assert_eq!(format!("{}", e), "consistency error: sl is out of bounds");
    }

    #[test]
    fn derive_methods_work() {
        let e = Error::Config("no data");
        let clone = e;
        assert_eq!(e, clone);
        assert_eq!(format!("{:?}", e), "Config(\"no data\")");
    }
}
