use anyhow::Error;
use std::io;

/// Returns `true` if the error originated from a broken pipe.
#[inline]
pub fn is_broken_pipe(err: &Error) -> bool {
    err.root_cause()
        .downcast_ref::<io::Error>()
        .map(|io_err| io_err.kind() == io::ErrorKind::BrokenPipe)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_broken_pipe_through_context() {
        let err = Error::new(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            .context("writing stats");
        assert!(is_broken_pipe(&err));
    }

    #[test]
    fn ignores_other_io_errors() {
        let err = Error::new(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert!(!is_broken_pipe(&err));
    }
}
