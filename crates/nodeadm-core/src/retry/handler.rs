//! Error classification hooks for the retry loop.

/// Classifier run after every attempt with that attempt's error, if any.
///
/// `Ok(())` lets the loop carry on. `Err(reason)` stops it: the reason is
/// attached as context to the attempt's error, or returned alone when the
/// attempt had none. The handler only borrows the error, so the loop always
/// keeps the last operation failure for itself.
pub type HandleError = Box<dyn FnMut(Option<&anyhow::Error>) -> anyhow::Result<()> + Send>;

/// Stops a retry loop after too many failures in a row.
///
/// The counter is private to one instance; build a new handler for every
/// retry sequence.
#[derive(Debug)]
pub struct MaxConsecutiveErrorHandler {
    max_attempts: usize,
    consecutive: usize,
}

impl MaxConsecutiveErrorHandler {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            consecutive: 0,
        }
    }

    pub fn consecutive_errors(&self) -> usize {
        self.consecutive
    }

    /// A success resets the count. The failure that pushes the count past
    /// `max_attempts` stops the loop with `max attempts N reached`.
    pub fn handle(&mut self, err: Option<&anyhow::Error>) -> anyhow::Result<()> {
        if err.is_none() {
            self.consecutive = 0;
            return Ok(());
        }

        self.consecutive += 1;
        if self.consecutive > self.max_attempts {
            anyhow::bail!("max attempts {} reached", self.max_attempts);
        }
        Ok(())
    }

    pub fn into_handle_error(mut self) -> HandleError {
        Box::new(move |err: Option<&anyhow::Error>| self.handle(err))
    }
}

/// Fresh [`MaxConsecutiveErrorHandler`] boxed as a [`HandleError`].
pub fn max_consecutive_error_handler(max_attempts: usize) -> HandleError {
    MaxConsecutiveErrorHandler::new(max_attempts).into_handle_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct Refused;

    fn refused() -> anyhow::Error {
        Refused.into()
    }

    #[test]
    fn test_permits_up_to_max_consecutive_errors() {
        let mut handler = MaxConsecutiveErrorHandler::new(3);
        for _ in 0..3 {
            handler.handle(Some(&refused())).expect("should permit retry");
        }

        let reason = handler
            .handle(Some(&refused()))
            .expect_err("fourth error should be terminal");
        assert_eq!(reason.to_string(), "max attempts 3 reached");
    }

    #[test]
    fn test_success_resets_counter() {
        let mut handler = MaxConsecutiveErrorHandler::new(2);
        handler.handle(Some(&refused())).unwrap();
        handler.handle(Some(&refused())).unwrap();
        assert_eq!(handler.consecutive_errors(), 2);

        assert!(handler.handle(None).is_ok());
        assert_eq!(handler.consecutive_errors(), 0);

        handler.handle(Some(&refused())).unwrap();
        handler.handle(Some(&refused())).unwrap();
        assert!(handler.handle(Some(&refused())).is_err());
    }

    #[test]
    fn test_zero_max_makes_first_error_terminal() {
        let mut handler = MaxConsecutiveErrorHandler::new(0);
        assert!(handler.handle(None).is_ok());
        let reason = handler.handle(Some(&refused())).unwrap_err();
        assert_eq!(reason.to_string(), "max attempts 0 reached");
    }

    #[test]
    fn test_boxed_handlers_do_not_share_state() {
        let mut first = max_consecutive_error_handler(1);
        let mut second = max_consecutive_error_handler(1);

        first(Some(&refused())).unwrap();
        second(Some(&refused())).unwrap();
        assert!(first(Some(&refused())).is_err());
        assert!(second(None).is_ok());
    }
}
