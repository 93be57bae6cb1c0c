use crate::backend::{validate_asin, SearchBackend};
use crate::error::UnfluffedError;
use crate::model::{CountryCode, Product};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone)]
pub struct PriceTick {
    pub asin: String,
    /// 1-based refresh counter.
    pub sequence: u64,
    pub result: Result<Product, String>,
}

/// Repeating live-price refresh for one product. The timer task lives exactly
/// as long as this handle.
pub struct PriceWatch {
    handle: JoinHandle<()>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl PriceWatch {
    /// Fetch immediately, then once per `interval`, until stopped or until the
    /// receiver is dropped.
    pub fn spawn<B: SearchBackend + 'static>(
        backend: Arc<B>,
        asin: &str,
        country: CountryCode,
        interval: Duration,
    ) -> Result<(Self, mpsc::Receiver<PriceTick>), UnfluffedError> {
        validate_asin(asin)?;
        if interval.is_zero() {
            return Err(UnfluffedError::Config(
                "price refresh interval must be greater than zero".to_string(),
            ));
        }

        let asin = asin.to_string();
        let (tx, rx) = mpsc::channel(16);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut sequence = 0u64;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Price watch for {} stopped", asin);
                        break;
                    }
                    _ = ticker.tick() => {
                        sequence += 1;
                        let result = backend.product(&asin, country).await.map_err(|e| {
                            tracing::warn!("Price refresh for {} failed: {}", asin, e);
                            e.to_string()
                        });
                        let tick = PriceTick {
                            asin: asin.clone(),
                            sequence,
                            result,
                        };
                        if tx.send(tick).await.is_err() {
                            tracing::debug!("Price watch receiver dropped for {}", asin);
                            break;
                        }
                    }
                }
            }
        });

        Ok((
            Self {
                handle,
                shutdown: Some(shutdown_tx),
            },
            rx,
        ))
    }

    /// Ask the task to finish and wait for it.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            if !e.is_cancelled() {
                tracing::warn!("Price watch task failed: {}", e);
            }
        }
    }
}

impl Drop for PriceWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
