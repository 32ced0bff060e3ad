//! Inventory reservation engine.
//!
//! Reservations run under the caller's transaction. There is no release
//! call: a reservation is undone only by rolling that transaction back.

use domain::{CommerceError, ReservationRequest, ReservationResult};
use persistence::InventoryRepository;

use crate::error::ResultExt;

/// Reserves each request in order against `tx`.
///
/// The whole batch is rejected up front if any quantity is not positive.
/// Otherwise every request yields one result, and later requests see the
/// stock already taken by earlier ones.
#[tracing::instrument(skip(tx, requests), fields(count = requests.len()))]
pub async fn reserve_inventory<T>(
    tx: &mut T,
    requests: &[ReservationRequest],
) -> Result<Vec<ReservationResult>, CommerceError>
where
    T: InventoryRepository + ?Sized,
{
    let mut quantities = Vec::with_capacity(requests.len());
    for request in requests {
        let qty = u32::try_from(request.quantity)
            .ok()
            .filter(|qty| *qty > 0)
            .ok_or_else(|| {
                CommerceError::Validation(format!(
                    "invalid reservation quantity {} for product {}",
                    request.quantity, request.product_id
                ))
            })?;
        quantities.push(qty);
    }

    let mut results = Vec::with_capacity(requests.len());
    for (request, qty) in requests.iter().zip(quantities) {
        let reserved = tx
            .try_reserve(request.product_id, qty)
            .await
            .context("reserve inventory")?;

        if reserved {
            metrics::counter!("inventory_reservations_total", "outcome" => "reserved").increment(1);
            results.push(ReservationResult::reserved(request));
        } else {
            metrics::counter!("inventory_reservations_total", "outcome" => "insufficient")
                .increment(1);
            tracing::info!(product_id = %request.product_id, qty, "reservation shortfall");
            results.push(ReservationResult::insufficient(request));
        }
    }

    Ok(results)
}
