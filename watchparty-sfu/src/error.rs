use thiserror::Error;

#[derive(Error, Debug)]
pub enum SfuError {
    #[error("worker error: {0}")]
    Worker(String),

    #[error("router error: {0}")]
    Router(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("produce error: {0}")]
    Produce(String),

    #[error("consume error: {0}")]
    Consume(String),

    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    #[error("unknown transport: {0}")]
    UnknownTransport(String),

    #[error("unknown producer: {0}")]
    UnknownProducer(String),

    #[error("unknown consumer: {0}")]
    UnknownConsumer(String),

    #[error("cannot consume producer {0} with the given capabilities")]
    CannotConsume(String),

    #[error("no send transport for peer {0}")]
    NoSendTransport(String),

    #[error("no recv transport for peer {0}")]
    NoRecvTransport(String),

    #[error("no producer for peer {0}")]
    NoProducer(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SfuError::CannotConsume("abc".to_string());
        assert!(err.to_string().contains("abc"));
        let err = SfuError::NoSendTransport("conn1".to_string());
        assert!(err.to_string().contains("conn1"));
    }
}
