//! Order admission loop.

use tokio::sync::{broadcast, mpsc};

use crate::gateway::error::GatewayError;
use crate::gateway::filters::FilterChain;
use crate::gateway::order::{Order, OrderState};
use crate::observability::metrics;

/// Counters returned when the admission loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    pub received: u64,
    pub accepted: u64,
    pub rejected: u64,
}

/// Runs each inbound order through the filter chain and publishes the accepted ones.
#[derive(Debug)]
pub struct Gateway {
    filters: FilterChain,
    accepted_tx: mpsc::UnboundedSender<OrderState>,
}

impl Gateway {
    pub fn new(filters: FilterChain, accepted_tx: mpsc::UnboundedSender<OrderState>) -> Self {
        Self { filters, accepted_tx }
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Admit one order: assign hash and price, filter, publish.
    ///
    /// A hash supplied by the client is kept and must match the order fields.
    ///
    /// Publishes exactly one `OrderState` on success and nothing on rejection.
    pub fn handle_order(&self, mut order: Order) -> Result<(), GatewayError> {
        order.normalize();

        if let Err(e) = self.filters.check(&order) {
            if let GatewayError::Rejected { filter, reason } = &e {
                metrics::record_order_rejected(*filter);
                tracing::warn!(
                    order_hash = ?order.hash,
                    owner = %order.owner,
                    filter = *filter,
                    reason = %reason,
                    "Order rejected"
                );
            }
            return Err(e);
        }

        tracing::debug!(
            order_hash = ?order.hash,
            owner = %order.owner,
            token_s = %order.token_s,
            token_b = %order.token_b,
            price = %order.price.map(|p| p.to_string()).unwrap_or_default(),
            "Order accepted"
        );
        self.accepted_tx
            .send(OrderState::accepted(order))
            .map_err(|_| GatewayError::PublishClosed)?;
        metrics::record_order_accepted();
        Ok(())
    }

    /// Consume orders one at a time until the inbound channel closes, the
    /// accepted-order receiver goes away, or shutdown is signalled.
    pub async fn run(
        self,
        mut inbound: mpsc::Receiver<Order>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> GatewayStats {
        tracing::info!(filters = ?self.filters.names(), "Gateway started");
        let mut stats = GatewayStats::default();

        loop {
            let order = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Gateway received shutdown signal");
                    break;
                }
                order = inbound.recv() => match order {
                    Some(order) => order,
                    None => {
                        tracing::info!("Inbound order channel closed");
                        break;
                    }
                },
            };

            stats.received += 1;
            match self.handle_order(order) {
                Ok(()) => stats.accepted += 1,
                Err(GatewayError::Rejected { .. }) => stats.rejected += 1,
                Err(GatewayError::PublishClosed) => {
                    tracing::error!("Accepted-order receiver dropped, stopping gateway");
                    break;
                }
            }
        }

        tracing::info!(
            received = stats.received,
            accepted = stats.accepted,
            rejected = stats.rejected,
            "Gateway stopped"
        );
        stats
    }
}
