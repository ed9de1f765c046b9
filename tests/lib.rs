use codebuddy::logger;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_initializes_once() {
        assert!(logger::init().is_ok());
        assert!(logger::init().is_ok());
        logger::disable_logging();
    }
}
