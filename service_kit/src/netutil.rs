//! Helpers for waiting on network dependencies

use crate::error::{KitError, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Polls `address` until it accepts a TCP connection, trying at most
/// `max_retries` times with `retry_interval` between attempts.
pub async fn wait_for(address: &str, retry_interval: Duration, max_retries: u32) -> Result<()> {
    let mut attempts = 0;

    loop {
        attempts += 1;

        match TcpStream::connect(address).await {
            Ok(_) => {
                debug!(address, attempts, "Address is accepting connections");
                return Ok(());
            }
            Err(e) => {
                warn!(address, attempt = attempts, "Failed to connect to {}: {}", address, e);
            }
        }

        if attempts >= max_retries {
            return Err(KitError::WaitTimeout(address.to_string()));
        }

        tokio::time::sleep(retry_interval).await;
    }
}

/// Asks the OS for an unused port on localhost.
pub fn free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_for_listening_address() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let result = wait_for(&address, Duration::from_millis(10), 3).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let port = free_port().unwrap();
        let address = format!("127.0.0.1:{}", port);

        let result = wait_for(&address, Duration::from_millis(10), 2).await;
        assert!(matches!(result, Err(KitError::WaitTimeout(ref a)) if a == &address));
    }

    #[tokio::test]
    async fn test_wait_for_address_that_comes_up_later() {
        let port = free_port().unwrap();
        let address = format!("127.0.0.1:{}", port);

        let bind_address = address.clone();
        let server = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let listener = tokio::net::TcpListener::bind(&bind_address).await.unwrap();
            let _ = listener.accept().await;
        });

        let result = wait_for(&address, Duration::from_millis(25), 40).await;
        assert!(result.is_ok());
        server.abort();
    }

    #[test]
    fn test_free_port_is_bindable() {
        let port = free_port().unwrap();
        assert!(port > 0);
        assert!(std::net::TcpListener::bind(("127.0.0.1", port)).is_ok());
    }
}
