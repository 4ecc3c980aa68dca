//----------------------------------------   Scheduling webhook  -----------------------------------------------------

use actix_web::{web, HttpRequest, HttpResponse};
use booking_engine::{traits::ReconciliationDatabase, BookingOutcome, CancellationOutcome, ReconciliationApi};
use log::{debug, error, info, trace, warn};
use serde_json::Value;

use crate::{
    cal_event::{parse_cal_event, BookingEventKind},
    errors::ServerError,
    route,
};

route!(cal_webhook => Post "" impl ReconciliationDatabase);
/// Booking lifecycle events from the scheduling provider. The surrounding scope carries the HMAC middleware, so by
/// the time this handler runs the body is authenticated (or checks are explicitly disabled).
pub async fn cal_webhook<B>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReconciliationDatabase,
{
    trace!("📅️ Received scheduling webhook request: {}", req.uri());
    let json = serde_json::from_slice::<Value>(&body).map_err(|e| {
        warn!("📅️ Webhook body is not valid JSON. {e}");
        ServerError::CouldNotDeserializePayload
    })?;
    let event = parse_cal_event(&json);
    debug!("📅️ Event normalized to '{}' (label: {})", event.kind, event.label);
    match event.kind {
        BookingEventKind::Created => {
            let outcome = api.process_booking_created(event.facts).await.map_err(|e| {
                error!("📅️ Could not process booking creation. {e}");
                ServerError::BackendError(e.to_string())
            })?;
            match outcome {
                BookingOutcome::Updated { order, rule } => {
                    info!("📅️ Booking attached to existing order #{} via {rule}", order.id);
                },
                BookingOutcome::Created(order) => info!("📅️ Booking created new order #{}", order.id),
            }
            Ok(HttpResponse::Ok().body("ok"))
        },
        BookingEventKind::Rescheduled => {
            let Some(reservation_id) = event.facts.reservation_id.as_deref() else {
                warn!("📅️ Reschedule event without a reservation id. Rejecting.");
                return Err(ServerError::MissingReservationId);
            };
            let updated = api
                .process_booking_rescheduled(reservation_id, event.facts.start_at, event.facts.end_at)
                .await
                .map_err(|e| {
                    error!("📅️ Could not process reschedule. {e}");
                    ServerError::BackendError(e.to_string())
                })?;
            if updated.is_none() {
                debug!("📅️ Reschedule for unknown reservation {reservation_id} acknowledged without effect");
            }
            Ok(HttpResponse::Ok().body("ok"))
        },
        BookingEventKind::Cancelled => {
            let Some(reservation_id) = event.facts.reservation_id.as_deref() else {
                warn!("📅️ Cancellation event without a reservation id. Rejecting.");
                return Err(ServerError::MissingReservationId);
            };
            let outcome = api.process_booking_cancelled(reservation_id).await.map_err(|e| {
                error!("📅️ Could not process cancellation. {e}");
                ServerError::BackendError(e.to_string())
            })?;
            match outcome {
                CancellationOutcome::Cancelled(order) => info!("📅️ Order #{} cancelled", order.id),
                CancellationOutcome::AlreadyPaid(order) => {
                    info!("📅️ Order #{} is already paid; cancellation left it untouched", order.id)
                },
                CancellationOutcome::NotFound => {
                    debug!("📅️ Cancellation for unknown reservation {reservation_id} acknowledged")
                },
            }
            Ok(HttpResponse::Ok().body("ok"))
        },
        BookingEventKind::Unknown => {
            debug!("📅️ Ignoring event with unrecognized label '{}'", event.label);
            Ok(HttpResponse::Ok().body("ignored"))
        },
    }
}
